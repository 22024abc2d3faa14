// src/handlers/exams.rs

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::exam::{
        AddExamQuestionRequest, CreateExamRequest, ExamListParams, UpdateExamQuestionRequest,
        UpdateExamRequest,
    },
    store::exams,
    utils::jwt::Claims,
};

/// Exams open to takers.
pub async fn list_public_exams(
    State(pool): State<SqlitePool>,
) -> Result<impl IntoResponse, AppError> {
    let exams = exams::list(&pool, &ExamListParams { active_only: true }).await?;
    Ok(Json(exams))
}

/// An active exam with its ordered questions. Correct answers are hidden.
pub async fn get_public_exam(
    State(pool): State<SqlitePool>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let exam = exams::public_view(&pool, &slug).await?;
    Ok(Json(exam))
}

pub async fn list_exams(
    State(pool): State<SqlitePool>,
    Query(params): Query<ExamListParams>,
) -> Result<impl IntoResponse, AppError> {
    let exams = exams::list(&pool, &params).await?;
    Ok(Json(exams))
}

/// Creates an exam owned by the caller.
/// Admin only.
pub async fn create_exam(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let exam = exams::create(&pool, claims.user_id()?, &payload).await?;
    Ok((StatusCode::CREATED, Json(exam)))
}

pub async fn get_exam(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = exams::get(&pool, id).await?;
    Ok(Json(exam))
}

pub async fn update_exam(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let exam = exams::update(&pool, id, &payload).await?;
    Ok(Json(exam))
}

/// Retires the exam instead of deleting it.
pub async fn delete_exam(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    exams::retire(&pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_exam_questions(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    exams::get(&pool, id).await?;
    let rows = exams::list_questions(&pool, id).await?;
    Ok(Json(rows))
}

pub async fn add_exam_question(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<AddExamQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let row = exams::add_question(&pool, id, &payload).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn update_exam_question(
    State(pool): State<SqlitePool>,
    Path((id, question_id)): Path<(i64, i64)>,
    Json(payload): Json<UpdateExamQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let row = exams::update_question(&pool, id, question_id, &payload).await?;
    Ok(Json(row))
}

pub async fn remove_exam_question(
    State(pool): State<SqlitePool>,
    Path((id, question_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    exams::remove_question(&pool, id, question_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
