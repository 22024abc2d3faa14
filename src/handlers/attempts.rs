// src/handlers/attempts.rs

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
    models::attempt::{ExamAttempt, GradeAttemptRequest, RecordResponseRequest, StartAttemptRequest},
    store::attempts,
    utils::{access::Capability, jwt::Claims},
};

/// Loads the attempt and checks that the caller owns it.
async fn owned_attempt(pool: &SqlitePool, claims: &Claims, id: i64) -> Result<ExamAttempt, AppError> {
    let attempt = attempts::get(pool, id).await?;
    if attempt.user_id != claims.user_id()? {
        return Err(AppError::PermissionDenied);
    }
    Ok(attempt)
}

/// Starts a new attempt on an active exam for the caller.
pub async fn start_attempt(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<StartAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !claims.role.grants(Capability::TakeExams) {
        return Err(AppError::PermissionDenied);
    }

    let attempt = attempts::start(&pool, claims.user_id()?, payload.exam_id).await?;
    Ok((StatusCode::CREATED, Json(attempt)))
}

/// The caller's own attempts, most recent first.
pub async fn list_my_attempts(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let attempts = attempts::list_for_user(&pool, claims.user_id()?).await?;
    Ok(Json(attempts))
}

pub async fn get_attempt(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    owned_attempt(&pool, &claims, id).await?;
    let detail = attempts::detail(&pool, id).await?;
    Ok(Json(detail))
}

/// Records the answer to one question of an open attempt.
pub async fn record_response(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<RecordResponseRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let attempt = owned_attempt(&pool, &claims, id).await?;
    let response = attempts::record_response(&pool, &attempt, &payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn submit_attempt(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    owned_attempt(&pool, &claims, id).await?;
    let attempt = attempts::submit(&pool, id).await?;
    Ok(Json(attempt))
}

/// Stores the external grader's result on a submitted attempt.
/// Admin only.
pub async fn grade_attempt(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<GradeAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let attempt = attempts::grade(&pool, id, payload.score, payload.passed).await?;
    Ok(Json(attempt))
}
