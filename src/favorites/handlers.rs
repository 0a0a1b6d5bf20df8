use axum::{
    extract::{Path, State},
    routing::{delete, get},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::extractors::CurrentUser,
    error::ApiError,
    favorites::{
        dto::{AddFavoriteRequest, FavoritesResponse},
        repo,
    },
    state::AppState,
};

pub fn favorite_routes() -> Router<AppState> {
    Router::new()
        .route("/favorites", get(list_favorites).post(add_favorite))
        .route("/favorites/:id", delete(remove_favorite))
}

#[instrument(skip(state, user))]
pub async fn list_favorites(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<FavoritesResponse>, ApiError> {
    let favorites = repo::list(&state.db, user.id).await?;
    Ok(Json(FavoritesResponse {
        success: true,
        message: None,
        favorites,
    }))
}

#[instrument(skip(state, user, payload))]
pub async fn add_favorite(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<AddFavoriteRequest>,
) -> Result<Json<FavoritesResponse>, ApiError> {
    let favorite = payload.into_favorite()?;

    let inserted = repo::add(&state.db, user.id, &favorite).await?;
    let favorites = repo::list(&state.db, user.id).await?;

    let message = if inserted {
        info!(user_id = %user.id, movie_id = favorite.movie_id, "favorite added");
        "Movie added to favorites"
    } else {
        warn!(user_id = %user.id, movie_id = favorite.movie_id, "movie already in favorites");
        "Movie is already in favorites"
    };

    Ok(Json(FavoritesResponse {
        success: true,
        message: Some(message.into()),
        favorites,
    }))
}

#[instrument(skip(state, user))]
pub async fn remove_favorite(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(movie_id): Path<i64>,
) -> Result<Json<FavoritesResponse>, ApiError> {
    let removed = repo::remove(&state.db, user.id, movie_id).await?;
    if !removed {
        warn!(user_id = %user.id, movie_id, "movie not in favorites");
        return Err(ApiError::NotFound("Movie not found in favorites".into()));
    }

    let favorites = repo::list(&state.db, user.id).await?;
    info!(user_id = %user.id, movie_id, "favorite removed");
    Ok(Json(FavoritesResponse {
        success: true,
        message: Some("Movie removed from favorites".into()),
        favorites,
    }))
}
