use axum::{
    extract::{DefaultBodyLimit, FromRef, Multipart, State},
    http::StatusCode,
    routing::{post, put},
    Json, Router,
};
use bytes::Bytes;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        extractors::CurrentUser,
        jwt::JwtKeys,
        password::{hash_password, verify_password},
    },
    error::ApiError,
    state::AppState,
    users::{
        dto::{
            is_valid_email, AuthResponse, LoginRequest, ProfileResponse, RegisterRequest,
            RegisterResponse, RegisteredUser, UpdateProfileRequest, UserProfile,
        },
        repo::{ProfileChanges, User},
    },
};

const MAX_PICTURE_BYTES: usize = 5 * 1024 * 1024;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users/refresh-token", post(refresh_token))
        .route("/users/update", put(update_profile))
        .merge(
            Router::new()
                .route("/users/profile-picture", post(upload_profile_picture))
                .layer(DefaultBodyLimit::max(MAX_PICTURE_BYTES)),
        )
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    payload.validate()?;

    // Pre-check so the common case gets a clean 409; the unique index
    // still catches a concurrent duplicate.
    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let hash = hash_password(&state.config.argon2, &payload.password)?;
    let user = User::create(&state.db, &payload.full_name, &payload.email, &hash).await?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id, &user.email)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: "Registration successful".into(),
            user: RegisteredUser {
                id: user.id,
                full_name: user.full_name,
                email: user.email,
            },
            token,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    // Unknown email and wrong password answer identically.
    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %payload.email, "login unknown email");
            ApiError::invalid_credentials()
        })?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::invalid_credentials());
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id, &user.email)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        success: true,
        message: "Login successful".into(),
        token,
        user: UserProfile::from(user),
    }))
}

#[instrument(skip(state, user))]
pub async fn refresh_token(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<AuthResponse>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id, &user.email)?;

    info!(user_id = %user.id, "token refreshed");
    Ok(Json(AuthResponse {
        success: true,
        message: "Token refreshed".into(),
        token,
        user: UserProfile::from(user),
    }))
}

#[instrument(skip(state, user, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let mut changes = ProfileChanges {
        name: payload.name,
        email: payload.email,
        phone: payload.phone,
        date_of_birth: payload.date_of_birth,
        address: payload.address,
        username: payload.username,
    };

    if let Some(email) = changes.email.take() {
        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(ApiError::validation("Please provide a valid email address"));
        }
        if email != user.email {
            if let Some(other) = User::find_by_email(&state.db, &email).await? {
                if other.id != user.id {
                    warn!(user_id = %user.id, "email update collides");
                    return Err(ApiError::Conflict("Email already in use".into()));
                }
            }
        }
        changes.email = Some(email);
    }

    // A concurrent email change can still trip the unique index; that
    // race reports the update-specific conflict message.
    let updated = User::update_profile(&state.db, user.id, &changes)
        .await
        .map_err(|e| ApiError::from(e).conflict_message("Email already in use"))?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    info!(user_id = %updated.id, "user details updated");
    Ok(Json(ProfileResponse {
        success: true,
        message: "User details updated successfully".into(),
        user: UserProfile::from(updated),
    }))
}

#[instrument(skip(state, user, multipart))]
pub async fn upload_profile_picture(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> Result<Json<ProfileResponse>, ApiError> {
    let mut upload: Option<(Bytes, String, &'static str)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Invalid multipart payload: {}", e)))?
    {
        if field.file_name().is_none() {
            continue;
        }
        let content_type = field.content_type().map(|s| s.to_string());
        let file_name = field.file_name().map(|s| s.to_string());
        let ext = image_ext(content_type.as_deref(), file_name.as_deref())
            .ok_or_else(|| ApiError::validation("Only image files are allowed"))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::validation(format!("Failed to read uploaded file: {}", e)))?;
        upload = Some((
            data,
            content_type.unwrap_or_else(|| "application/octet-stream".into()),
            ext,
        ));
        break;
    }

    let (body, content_type, ext) =
        upload.ok_or_else(|| ApiError::validation("No file uploaded"))?;

    let key = format!(
        "profile-pictures/profile-{}-{}.{}",
        user.id,
        Uuid::new_v4(),
        ext
    );
    state
        .storage
        .put_object(&key, body, &content_type)
        .await
        .map_err(|e| ApiError::upstream("Failed to upload profile picture", e))?;

    let url = state.storage.public_url(&key);
    let updated = match User::set_profile_picture(&state.db, user.id, &url).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            cleanup_object(&state, &key).await;
            return Err(ApiError::NotFound("User not found".into()));
        }
        Err(e) => {
            cleanup_object(&state, &key).await;
            return Err(e.into());
        }
    };

    // The replaced picture is orphaned now; removal is best-effort.
    if let Some(old_key) = user
        .profile_picture_url
        .as_deref()
        .and_then(|old| old.strip_prefix(&state.storage.public_url("")))
    {
        cleanup_object(&state, old_key).await;
    }

    info!(user_id = %updated.id, key = %key, "profile picture updated");
    Ok(Json(ProfileResponse {
        success: true,
        message: "Profile picture updated successfully".into(),
        user: UserProfile::from(updated),
    }))
}

async fn cleanup_object(state: &AppState, key: &str) {
    if let Err(e) = state.storage.delete_object(key).await {
        warn!(error = %e, key = %key, "failed to clean up stored object");
    }
}

fn image_ext(content_type: Option<&str>, file_name: Option<&str>) -> Option<&'static str> {
    match content_type {
        Some("image/jpeg") | Some("image/jpg") => return Some("jpg"),
        Some("image/png") => return Some("png"),
        Some("image/gif") => return Some("gif"),
        Some("image/webp") => return Some("webp"),
        Some("image/bmp") => return Some("bmp"),
        _ => {}
    }
    let name = file_name?;
    let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("jpg"),
        "png" => Some("png"),
        "gif" => Some("gif"),
        "webp" => Some("webp"),
        "bmp" => Some("bmp"),
        _ => None,
    }
}
