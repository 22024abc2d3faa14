// src/store/exams.rs

use std::collections::HashMap;

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::{
    error::{AppError, AppResult},
    models::{
        exam::{
            AddExamQuestionRequest, CreateExamRequest, Exam, ExamListParams, ExamQuestion,
            PublicExam, PublicExamQuestion, UpdateExamQuestionRequest, UpdateExamRequest,
        },
        question::{ContentStatus, Question},
    },
    store::{SlugTable, questions, resolve_slug},
};

const EXAM_COLUMNS: &str =
    "id, creator_id, title, slug, description, duration_minutes, status, created_at";

const EXAM_QUESTION_COLUMNS: &str = "id, exam_id, question_id, marks, position";

pub async fn create(pool: &SqlitePool, creator_id: i64, req: &CreateExamRequest) -> AppResult<Exam> {
    let slug = resolve_slug(pool, SlugTable::Exams, req.slug.as_deref(), &req.title, None).await?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO exams
        (creator_id, title, slug, description, duration_minutes, status, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(creator_id)
    .bind(req.title.trim())
    .bind(&slug)
    .bind(&req.description)
    .bind(req.duration_minutes)
    .bind(ContentStatus::Active)
    .bind(chrono::Utc::now())
    .fetch_one(pool)
    .await
    .map_err(|e| AppError::unique_or_internal(e, format!("Slug '{}' is already in use.", slug)))?;

    tracing::info!(exam_id = id, creator_id, "exam created");
    get(pool, id).await
}

pub async fn get(pool: &SqlitePool, id: i64) -> AppResult<Exam> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {EXAM_COLUMNS} FROM exams WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Exam not found".to_string()))
}

pub async fn get_by_slug(pool: &SqlitePool, slug: &str) -> AppResult<Exam> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {EXAM_COLUMNS} FROM exams WHERE slug = ?"))
        .bind(slug)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Exam not found".to_string()))
}

/// Newest exams first.
pub async fn list(pool: &SqlitePool, params: &ExamListParams) -> AppResult<Vec<Exam>> {
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {EXAM_COLUMNS} FROM exams"));
    if params.active_only {
        builder.push(" WHERE status = ");
        builder.push_bind(ContentStatus::Active);
    }
    builder.push(" ORDER BY created_at DESC, id DESC");

    let exams = builder.build_query_as().fetch_all(pool).await?;
    Ok(exams)
}

pub async fn update(pool: &SqlitePool, id: i64, req: &UpdateExamRequest) -> AppResult<Exam> {
    let current = get(pool, id).await?;

    let slug = match req.slug.as_deref() {
        Some(requested) => Some(
            resolve_slug(pool, SlugTable::Exams, Some(requested), &current.title, Some(id)).await?,
        ),
        None => None,
    };

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE exams SET ");
    let mut separated = builder.separated(", ");
    let mut touched = false;

    if let Some(title) = &req.title {
        separated.push("title = ");
        separated.push_bind_unseparated(title.trim().to_string());
        touched = true;
    }

    if let Some(slug) = slug {
        separated.push("slug = ");
        separated.push_bind_unseparated(slug);
        touched = true;
    }

    if let Some(description) = &req.description {
        separated.push("description = ");
        separated.push_bind_unseparated(description.clone());
        touched = true;
    }

    if let Some(duration) = req.duration_minutes {
        separated.push("duration_minutes = ");
        separated.push_bind_unseparated(duration);
        touched = true;
    }

    if let Some(status) = req.status {
        separated.push("status = ");
        separated.push_bind_unseparated(status);
        touched = true;
    }

    if !touched {
        return Ok(current);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder
        .build()
        .execute(pool)
        .await
        .map_err(|e| AppError::unique_or_internal(e, "Slug is already in use."))?;

    get(pool, id).await
}

/// Soft delete. Past attempts keep pointing at the exam.
pub async fn retire(pool: &SqlitePool, id: i64) -> AppResult<()> {
    let result = sqlx::query("UPDATE exams SET status = ? WHERE id = ?")
        .bind(ContentStatus::Retired)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Exam not found".to_string()));
    }
    Ok(())
}

/// Adds a question to an exam. Retired questions are refused, and a question
/// can appear in a given exam only once.
pub async fn add_question(
    pool: &SqlitePool,
    exam_id: i64,
    req: &AddExamQuestionRequest,
) -> AppResult<ExamQuestion> {
    get(pool, exam_id).await?;

    let question = questions::find(pool, req.question_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;
    if !question.status.is_active() {
        return Err(AppError::Validation(
            "Retired questions cannot be added to an exam.".to_string(),
        ));
    }

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO exam_questions (exam_id, question_id, marks, position) VALUES (?, ?, ?, ?) RETURNING id",
    )
    .bind(exam_id)
    .bind(req.question_id)
    .bind(req.marks)
    .bind(req.position)
    .fetch_one(pool)
    .await
    .map_err(|e| AppError::unique_or_internal(e, "This question is already part of the exam."))?;

    let row = sqlx::query_as::<_, ExamQuestion>(&format!(
        "SELECT {EXAM_QUESTION_COLUMNS} FROM exam_questions WHERE id = ?"
    ))
    .bind(id)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Rows for an exam, ascending by position; equal positions keep insertion
/// order.
pub async fn list_questions(pool: &SqlitePool, exam_id: i64) -> AppResult<Vec<ExamQuestion>> {
    let rows = sqlx::query_as::<_, ExamQuestion>(&format!(
        "SELECT {EXAM_QUESTION_COLUMNS} FROM exam_questions WHERE exam_id = ? ORDER BY position ASC, id ASC"
    ))
    .bind(exam_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn find_question(
    pool: &SqlitePool,
    exam_id: i64,
    question_id: i64,
) -> AppResult<Option<ExamQuestion>> {
    let row = sqlx::query_as::<_, ExamQuestion>(&format!(
        "SELECT {EXAM_QUESTION_COLUMNS} FROM exam_questions WHERE exam_id = ? AND question_id = ?"
    ))
    .bind(exam_id)
    .bind(question_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn update_question(
    pool: &SqlitePool,
    exam_id: i64,
    question_id: i64,
    req: &UpdateExamQuestionRequest,
) -> AppResult<ExamQuestion> {
    let current = find_question(pool, exam_id, question_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Question is not part of this exam".to_string()))?;

    sqlx::query("UPDATE exam_questions SET marks = ?, position = ? WHERE id = ?")
        .bind(req.marks.unwrap_or(current.marks))
        .bind(req.position.unwrap_or(current.position))
        .bind(current.id)
        .execute(pool)
        .await?;

    find_question(pool, exam_id, question_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Question is not part of this exam".to_string()))
}

pub async fn remove_question(pool: &SqlitePool, exam_id: i64, question_id: i64) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM exam_questions WHERE exam_id = ? AND question_id = ?")
        .bind(exam_id)
        .bind(question_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question is not part of this exam".to_string()));
    }
    Ok(())
}

/// The taker's view of an active exam: ordered questions, retired ones left
/// out, answers hidden.
pub async fn public_view(pool: &SqlitePool, slug: &str) -> AppResult<PublicExam> {
    let exam = get_by_slug(pool, slug).await?;
    if !exam.status.is_active() {
        return Err(AppError::NotFound("Exam not found".to_string()));
    }

    let rows = list_questions(pool, exam.id).await?;

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT id, topic_id, text, question_type, difficulty, explanation, status, created_at \
         FROM questions WHERE status = ",
    );
    builder.push_bind(ContentStatus::Active);
    builder.push(" AND id IN (SELECT question_id FROM exam_questions WHERE exam_id = ");
    builder.push_bind(exam.id);
    builder.push(")");
    let active: Vec<Question> = builder.build_query_as().fetch_all(pool).await?;

    let mut details: HashMap<i64, _> = questions::details_for(pool, active)
        .await?
        .into_iter()
        .map(|d| (d.question.id, d))
        .collect();

    let questions: Vec<PublicExamQuestion> = rows
        .into_iter()
        .filter_map(|row| {
            details.remove(&row.question_id).map(|detail| PublicExamQuestion {
                marks: row.marks,
                position: row.position,
                question: detail.into(),
            })
        })
        .collect();

    Ok(PublicExam {
        id: exam.id,
        title: exam.title,
        slug: exam.slug,
        description: exam.description,
        duration_minutes: exam.duration_minutes,
        total_marks: questions.iter().map(|q| q.marks).sum(),
        questions,
    })
}
