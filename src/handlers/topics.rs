// src/handlers/topics.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::topic::{CreateTopicRequest, UpdateTopicRequest},
    store::topics,
};

/// Public topic hierarchy, roots first.
pub async fn topic_tree(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let tree = topics::tree(&pool).await?;
    Ok(Json(tree))
}

/// Flat listing for admin screens.
pub async fn list_topics(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let topics = topics::list(&pool).await?;
    Ok(Json(topics))
}

pub async fn create_topic(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateTopicRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let topic = topics::create(&pool, &payload).await?;
    Ok((StatusCode::CREATED, Json(topic)))
}

pub async fn get_topic(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let topic = topics::get(&pool, id).await?;
    Ok(Json(topic))
}

/// Renames or moves a topic. Moving it under one of its own descendants is
/// rejected.
pub async fn update_topic(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateTopicRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let topic = topics::update(&pool, id, &payload).await?;
    Ok(Json(topic))
}

/// Deletes the topic with its whole subtree.
pub async fn delete_topic(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    topics::delete(&pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
