use sqlx::PgPool;
use uuid::Uuid;

use crate::favorites::dto::Favorite;

/// Favorites in insertion order.
pub async fn list(db: &PgPool, user_id: Uuid) -> sqlx::Result<Vec<Favorite>> {
    sqlx::query_as::<_, Favorite>(
        r#"
        SELECT movie_id, title, poster_path, release_date, vote_average, overview
        FROM favorites
        WHERE user_id = $1
        ORDER BY position ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

/// Append a favorite unless the movie is already present. Returns whether
/// a row was actually inserted; re-adding is a no-op, not an error.
pub async fn add(db: &PgPool, user_id: Uuid, fav: &Favorite) -> sqlx::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO favorites (user_id, movie_id, title, poster_path, release_date,
                               vote_average, overview)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (user_id, movie_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(fav.movie_id)
    .bind(&fav.title)
    .bind(fav.poster_path.as_deref())
    .bind(fav.release_date.as_deref())
    .bind(fav.vote_average)
    .bind(fav.overview.as_deref())
    .execute(db)
    .await?;

    let inserted = result.rows_affected() > 0;
    if inserted {
        touch_user(db, user_id).await?;
    }
    Ok(inserted)
}

/// Remove a favorite by movie id. Returns whether a row existed.
pub async fn remove(db: &PgPool, user_id: Uuid, movie_id: i64) -> sqlx::Result<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM favorites
        WHERE user_id = $1 AND movie_id = $2
        "#,
    )
    .bind(user_id)
    .bind(movie_id)
    .execute(db)
    .await?;

    let removed = result.rows_affected() > 0;
    if removed {
        touch_user(db, user_id).await?;
    }
    Ok(removed)
}

// Favorites are part of the user's profile, so mutations bump its
// updated_at as well.
async fn touch_user(db: &PgPool, user_id: Uuid) -> sqlx::Result<()> {
    sqlx::query("UPDATE users SET updated_at = now() WHERE id = $1")
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(())
}
