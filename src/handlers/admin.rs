// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{AdminCreateUserRequest, NewUser, UpdateUserRequest},
    store::users,
    utils::{hash::hash_password, jwt::Claims},
};

/// Lists all users in the system, newest first.
/// Admin only.
pub async fn list_users(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let users = users::list(&pool).await?;
    Ok(Json(users))
}

/// Creates an account directly, bypassing email verification.
/// Admin only.
pub async fn create_user(
    State(pool): State<SqlitePool>,
    Json(payload): Json<AdminCreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let hashed_password = hash_password(&payload.password)?;

    let user = users::create(
        &pool,
        &NewUser {
            email: payload.email.trim().to_string(),
            password_hash: hashed_password,
            first_name: payload.first_name.trim().to_string(),
            last_name: payload.last_name.trim().to_string(),
            phone_number: payload.phone_number,
            role: payload.role,
            subscription_tier: payload.subscription_tier,
            is_active: payload.is_active,
            is_verified: payload.is_verified,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, role = user.role.as_str(), "user created by admin");
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = users::get(&pool, id).await?;
    Ok(Json(user))
}

/// Updates user information. Absent fields are left untouched.
/// Admin only.
pub async fn update_user(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let password_hash = match payload.password.as_deref() {
        Some(password) => Some(hash_password(password)?),
        None => None,
    };

    let user = users::update(&pool, id, &payload, password_hash).await?;
    Ok(Json(user))
}

/// Deletes a user by ID.
/// Admin only. Prevents deleting self.
pub async fn delete_user(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if id == claims.user_id()? {
        return Err(AppError::Validation("Cannot delete yourself".to_string()));
    }

    users::delete(&pool, id).await?;

    Ok(StatusCode::NO_CONTENT)
}
