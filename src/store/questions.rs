// src/store/questions.rs

use std::collections::HashMap;

use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::{
    error::{AppError, AppResult},
    models::question::{
        ContentStatus, CreateQuestionRequest, OptionInput, Question, QuestionDetail,
        QuestionListParams, QuestionOption, UpdateQuestionRequest, check_options,
    },
    store::topics,
    utils::html::{clean_html, clean_optional},
};

const QUESTION_COLUMNS: &str =
    "id, topic_id, text, question_type, difficulty, explanation, status, created_at";

/// Creates the question and its options in one transaction after checking
/// the correct-option count against the type.
pub async fn create(pool: &SqlitePool, req: &CreateQuestionRequest) -> AppResult<QuestionDetail> {
    let flags: Vec<bool> = req.options.iter().map(|o| o.is_correct).collect();
    check_options(req.question_type, &flags)?;

    if let Some(topic_id) = req.topic_id {
        topics::ensure_exists(pool, topic_id, "Topic not found").await?;
    }

    let mut tx = pool.begin().await?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO questions
        (topic_id, text, question_type, difficulty, explanation, status, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(req.topic_id)
    .bind(clean_html(&req.text))
    .bind(req.question_type)
    .bind(req.difficulty)
    .bind(clean_optional(req.explanation.as_deref()))
    .bind(ContentStatus::Active)
    .bind(chrono::Utc::now())
    .fetch_one(&mut *tx)
    .await?;

    insert_options(&mut *tx, id, &req.options).await?;

    tx.commit().await?;

    tracing::info!(question_id = id, "question created");
    get(pool, id).await
}

async fn insert_options(
    conn: &mut SqliteConnection,
    question_id: i64,
    options: &[OptionInput],
) -> AppResult<()> {
    for option in options {
        sqlx::query("INSERT INTO options (question_id, text, is_correct) VALUES (?, ?, ?)")
            .bind(question_id)
            .bind(clean_html(&option.text))
            .bind(option.is_correct)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

pub async fn find(pool: &SqlitePool, id: i64) -> AppResult<Option<Question>> {
    let question = sqlx::query_as::<_, Question>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(question)
}

pub async fn options_for(pool: &SqlitePool, question_id: i64) -> AppResult<Vec<QuestionOption>> {
    let options = sqlx::query_as::<_, QuestionOption>(
        "SELECT id, question_id, text, is_correct FROM options WHERE question_id = ? ORDER BY id",
    )
    .bind(question_id)
    .fetch_all(pool)
    .await?;
    Ok(options)
}

pub async fn get(pool: &SqlitePool, id: i64) -> AppResult<QuestionDetail> {
    let question = find(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;
    let options = options_for(pool, id).await?;
    Ok(QuestionDetail { question, options })
}

/// Lists questions with their options, optionally narrowed by topic and
/// status.
pub async fn list(pool: &SqlitePool, params: &QuestionListParams) -> AppResult<Vec<QuestionDetail>> {
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE 1 = 1"));

    if let Some(topic_id) = params.topic_id {
        builder.push(" AND topic_id = ");
        builder.push_bind(topic_id);
    }
    if let Some(status) = params.status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }
    builder.push(" ORDER BY id DESC");

    let questions: Vec<Question> = builder.build_query_as().fetch_all(pool).await?;
    details_for(pool, questions).await
}

/// Attaches options to each question with a single extra query.
pub(crate) async fn details_for(
    pool: &SqlitePool,
    questions: Vec<Question>,
) -> AppResult<Vec<QuestionDetail>> {
    if questions.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT id, question_id, text, is_correct FROM options WHERE question_id IN (",
    );
    let mut separated = builder.separated(", ");
    for question in &questions {
        separated.push_bind(question.id);
    }
    separated.push_unseparated(") ORDER BY id");

    let options: Vec<QuestionOption> = builder.build_query_as().fetch_all(pool).await?;

    let mut by_question: HashMap<i64, Vec<QuestionOption>> = HashMap::new();
    for option in options {
        by_question.entry(option.question_id).or_default().push(option);
    }

    Ok(questions
        .into_iter()
        .map(|question| {
            let options = by_question.remove(&question.id).unwrap_or_default();
            QuestionDetail { question, options }
        })
        .collect())
}

/// Updates question fields. Changing the type re-checks the existing
/// options against the new type.
pub async fn update(
    pool: &SqlitePool,
    id: i64,
    req: &UpdateQuestionRequest,
) -> AppResult<QuestionDetail> {
    let current = get(pool, id).await?;

    if let Some(new_type) = req.question_type {
        if new_type != current.question.question_type {
            let flags: Vec<bool> = current.options.iter().map(|o| o.is_correct).collect();
            check_options(new_type, &flags)?;
        }
    }

    if let Some(Some(topic_id)) = req.topic_id {
        topics::ensure_exists(pool, topic_id, "Topic not found").await?;
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE questions SET ");
    let mut separated = builder.separated(", ");
    let mut touched = false;

    if let Some(topic_id) = req.topic_id {
        separated.push("topic_id = ");
        separated.push_bind_unseparated(topic_id);
        touched = true;
    }

    if let Some(text) = &req.text {
        separated.push("text = ");
        separated.push_bind_unseparated(clean_html(text));
        touched = true;
    }

    if let Some(question_type) = req.question_type {
        separated.push("question_type = ");
        separated.push_bind_unseparated(question_type);
        touched = true;
    }

    if let Some(difficulty) = req.difficulty {
        separated.push("difficulty = ");
        separated.push_bind_unseparated(difficulty);
        touched = true;
    }

    if let Some(explanation) = &req.explanation {
        separated.push("explanation = ");
        separated.push_bind_unseparated(clean_optional(explanation.as_deref()));
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
    builder.build().execute(pool).await?;

    get(pool, id).await
}

/// Swaps the whole option set. Refused once any response references the
/// question, so recorded selections keep pointing at the options they chose.
pub async fn replace_options(
    pool: &SqlitePool,
    id: i64,
    options: &[OptionInput],
) -> AppResult<QuestionDetail> {
    let question = find(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;

    let flags: Vec<bool> = options.iter().map(|o| o.is_correct).collect();
    check_options(question.question_type, &flags)?;

    let answered: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM question_attempts WHERE question_id = ?")
            .bind(id)
            .fetch_one(pool)
            .await?;
    if answered > 0 {
        return Err(AppError::Validation(
            "This question already has recorded responses; retire it and create a new one."
                .to_string(),
        ));
    }

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM options WHERE question_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    insert_options(&mut *tx, id, options).await?;
    tx.commit().await?;

    get(pool, id).await
}

/// Soft delete: the row stays for history.
pub async fn retire(pool: &SqlitePool, id: i64) -> AppResult<()> {
    let result = sqlx::query("UPDATE questions SET status = ? WHERE id = ?")
        .bind(ContentStatus::Retired)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }
    Ok(())
}
