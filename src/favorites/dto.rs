use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::ApiError;

/// Embedded movie reference. Serialized with `id` for the movie id, the
/// shape the catalog client already sends and expects back.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Favorite {
    #[serde(rename = "id")]
    pub movie_id: i64,
    pub title: String,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: Option<f64>,
    pub overview: Option<String>,
}

/// Add-favorite body. `id` and `title` are validated by hand so their
/// absence maps to a 400 rather than a deserialization rejection.
#[derive(Debug, Deserialize)]
pub struct AddFavoriteRequest {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: Option<f64>,
    pub overview: Option<String>,
}

impl AddFavoriteRequest {
    pub fn into_favorite(self) -> Result<Favorite, ApiError> {
        let (movie_id, title) = match (self.id, self.title.filter(|t| !t.is_empty())) {
            (Some(id), Some(title)) => (id, title),
            _ => return Err(ApiError::validation("Movie ID and title are required")),
        };
        Ok(Favorite {
            movie_id,
            title,
            poster_path: self.poster_path,
            release_date: self.release_date,
            vote_average: self.vote_average,
            overview: self.overview,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct FavoritesResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub favorites: Vec<Favorite>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn favorite_serializes_movie_id_as_id() {
        let fav = Favorite {
            movie_id: 603,
            title: "The Matrix".into(),
            poster_path: Some("/matrix.jpg".into()),
            release_date: Some("1999-03-31".into()),
            vote_average: Some(8.2),
            overview: None,
        };
        let json = serde_json::to_value(&fav).unwrap();
        assert_eq!(json["id"], 603);
        assert_eq!(json["title"], "The Matrix");
        assert_eq!(json["poster_path"], "/matrix.jpg");
        assert!(json.get("movie_id").is_none());
    }

    #[test]
    fn add_request_requires_id_and_title() {
        let missing_id: AddFavoriteRequest =
            serde_json::from_str(r#"{"title": "The Matrix"}"#).unwrap();
        assert!(missing_id.into_favorite().is_err());

        let missing_title: AddFavoriteRequest = serde_json::from_str(r#"{"id": 603}"#).unwrap();
        assert!(missing_title.into_favorite().is_err());

        let empty_title: AddFavoriteRequest =
            serde_json::from_str(r#"{"id": 603, "title": ""}"#).unwrap();
        assert!(empty_title.into_favorite().is_err());
    }

    #[test]
    fn add_request_with_required_fields_converts() {
        let req: AddFavoriteRequest =
            serde_json::from_str(r#"{"id": 603, "title": "The Matrix", "vote_average": 8.2}"#)
                .unwrap();
        let fav = req.into_favorite().unwrap();
        assert_eq!(fav.movie_id, 603);
        assert_eq!(fav.vote_average, Some(8.2));
        assert!(fav.poster_path.is_none());
    }
}
