// src/handlers/questions.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::question::{
        CreateQuestionRequest, QuestionListParams, ReplaceOptionsRequest, UpdateQuestionRequest,
    },
    store::questions,
};

/// Lists questions with their options, answers included.
/// Admin only.
pub async fn list_questions(
    State(pool): State<SqlitePool>,
    Query(params): Query<QuestionListParams>,
) -> Result<impl IntoResponse, AppError> {
    let questions = questions::list(&pool, &params).await?;
    Ok(Json(questions))
}

/// Creates a question together with its options.
/// Admin only.
pub async fn create_question(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let question = questions::create(&pool, &payload).await?;
    Ok((StatusCode::CREATED, Json(question)))
}

pub async fn get_question(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let question = questions::get(&pool, id).await?;
    Ok(Json(question))
}

pub async fn update_question(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let question = questions::update(&pool, id, &payload).await?;
    Ok(Json(question))
}

/// Replaces every option of the question at once.
pub async fn replace_options(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<ReplaceOptionsRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let question = questions::replace_options(&pool, id, &payload.options).await?;
    Ok(Json(question))
}

/// Retires the question. It stays attached to past attempts.
pub async fn delete_question(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    questions::retire(&pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
