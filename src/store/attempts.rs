// src/store/attempts.rs

//! Attempt recorder. Attempts are append-mostly: responses are added while
//! the attempt is open, and nothing is added once `end_time` is set.

use std::collections::{BTreeSet, HashMap};

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::{
    error::{AppError, AppResult},
    models::attempt::{
        AttemptDetail, ExamAttempt, QuestionAttempt, QuestionAttemptDetail, RecordResponseRequest,
    },
    store::{exams, questions},
};

const ATTEMPT_COLUMNS: &str = "id, user_id, exam_id, score, passed, start_time, end_time";

const RESPONSE_COLUMNS: &str = "id, exam_attempt_id, question_id, is_correct, time_taken_seconds";

/// Opens a new attempt on an active exam. `start_time` is fixed here.
pub async fn start(pool: &SqlitePool, user_id: i64, exam_id: i64) -> AppResult<ExamAttempt> {
    let exam = exams::get(pool, exam_id).await?;
    if !exam.status.is_active() {
        return Err(AppError::Validation(
            "This exam is no longer available.".to_string(),
        ));
    }

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO exam_attempts (user_id, exam_id, start_time) VALUES (?, ?, ?) RETURNING id",
    )
    .bind(user_id)
    .bind(exam_id)
    .bind(chrono::Utc::now())
    .fetch_one(pool)
    .await?;

    tracing::info!(attempt_id = id, user_id, exam_id, "attempt started");
    get(pool, id).await
}

pub async fn get(pool: &SqlitePool, id: i64) -> AppResult<ExamAttempt> {
    sqlx::query_as::<_, ExamAttempt>(&format!(
        "SELECT {ATTEMPT_COLUMNS} FROM exam_attempts WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Attempt not found".to_string()))
}

/// The user's attempts, most recent first.
pub async fn list_for_user(pool: &SqlitePool, user_id: i64) -> AppResult<Vec<ExamAttempt>> {
    let attempts = sqlx::query_as::<_, ExamAttempt>(&format!(
        "SELECT {ATTEMPT_COLUMNS} FROM exam_attempts WHERE user_id = ? ORDER BY start_time DESC, id DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(attempts)
}

pub async fn detail(pool: &SqlitePool, id: i64) -> AppResult<AttemptDetail> {
    let attempt = get(pool, id).await?;

    let responses = sqlx::query_as::<_, QuestionAttempt>(&format!(
        "SELECT {RESPONSE_COLUMNS} FROM question_attempts WHERE exam_attempt_id = ? ORDER BY id"
    ))
    .bind(id)
    .fetch_all(pool)
    .await?;

    let selections: Vec<(i64, i64)> = sqlx::query_as(
        r#"
        SELECT qao.question_attempt_id, qao.option_id
        FROM question_attempt_options qao
        JOIN question_attempts qa ON qa.id = qao.question_attempt_id
        WHERE qa.exam_attempt_id = ?
        ORDER BY qao.option_id
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    let mut selected: HashMap<i64, Vec<i64>> = HashMap::new();
    for (response_id, option_id) in selections {
        selected.entry(response_id).or_default().push(option_id);
    }

    let responses = responses
        .into_iter()
        .map(|response| {
            let selected_options = selected.remove(&response.id).unwrap_or_default();
            QuestionAttemptDetail {
                response,
                selected_options,
            }
        })
        .collect();

    Ok(AttemptDetail { attempt, responses })
}

/// Records the answer to one question of an open attempt.
///
/// The question must belong to the attempt's exam and still be active, and
/// every selected option must belong to that question. `is_correct` holds
/// when the selection equals the set of correct options exactly. Each
/// question is answered at most once per attempt; a second answer is a
/// `DuplicateKey`.
pub async fn record_response(
    pool: &SqlitePool,
    attempt: &ExamAttempt,
    req: &RecordResponseRequest,
) -> AppResult<QuestionAttemptDetail> {
    if attempt.is_closed() {
        return Err(AppError::Validation(
            "This attempt has already been submitted.".to_string(),
        ));
    }

    if exams::find_question(pool, attempt.exam_id, req.question_id)
        .await?
        .is_none()
    {
        return Err(AppError::Validation(
            "Question is not part of this exam.".to_string(),
        ));
    }

    let question = questions::get(pool, req.question_id).await?;
    if !question.question.status.is_active() {
        return Err(AppError::Validation(
            "This question has been retired.".to_string(),
        ));
    }

    let selected: BTreeSet<i64> = req.selected_options.iter().copied().collect();
    let own: BTreeSet<i64> = question.options.iter().map(|o| o.id).collect();
    if !selected.is_subset(&own) {
        return Err(AppError::Validation(
            "Selected options must belong to the question.".to_string(),
        ));
    }

    let correct: BTreeSet<i64> = question
        .options
        .iter()
        .filter(|o| o.is_correct)
        .map(|o| o.id)
        .collect();
    let is_correct = selected == correct;

    let mut tx = pool.begin().await?;

    let response: QuestionAttempt = sqlx::query_as(&format!(
        r#"
        INSERT INTO question_attempts (exam_attempt_id, question_id, is_correct, time_taken_seconds)
        SELECT ?, ?, ?, ? WHERE EXISTS (
            SELECT 1 FROM exam_attempts WHERE id = ? AND end_time IS NULL
        )
        RETURNING {RESPONSE_COLUMNS}
        "#
    ))
    .bind(attempt.id)
    .bind(req.question_id)
    .bind(is_correct)
    .bind(req.time_taken_seconds)
    .bind(attempt.id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| {
        AppError::unique_or_internal(e, "This question has already been answered in this attempt.")
    })?
    // Submitted between our read and this insert.
    .ok_or_else(|| AppError::Validation("This attempt has already been submitted.".to_string()))?;

    if !selected.is_empty() {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO question_attempt_options (question_attempt_id, option_id) ",
        );
        builder.push_values(&selected, |mut row, option_id| {
            row.push_bind(response.id).push_bind(*option_id);
        });
        builder.build().execute(&mut *tx).await?;
    }

    tx.commit().await?;

    Ok(QuestionAttemptDetail {
        response,
        selected_options: selected.into_iter().collect(),
    })
}

/// Closes the attempt by setting `end_time`. Submitting twice is refused.
pub async fn submit(pool: &SqlitePool, id: i64) -> AppResult<ExamAttempt> {
    let result =
        sqlx::query("UPDATE exam_attempts SET end_time = ? WHERE id = ? AND end_time IS NULL")
            .bind(chrono::Utc::now())
            .bind(id)
            .execute(pool)
            .await?;

    if result.rows_affected() == 0 {
        // Either missing or already closed.
        get(pool, id).await?;
        return Err(AppError::Validation(
            "This attempt has already been submitted.".to_string(),
        ));
    }

    tracing::info!(attempt_id = id, "attempt submitted");
    get(pool, id).await
}

/// Stores the outcome computed by an external grader on a submitted attempt.
pub async fn grade(pool: &SqlitePool, id: i64, score: f64, passed: bool) -> AppResult<ExamAttempt> {
    let attempt = get(pool, id).await?;
    if !attempt.is_closed() {
        return Err(AppError::Validation(
            "Only submitted attempts can be graded.".to_string(),
        ));
    }

    sqlx::query("UPDATE exam_attempts SET score = ?, passed = ? WHERE id = ?")
        .bind(score)
        .bind(passed)
        .bind(id)
        .execute(pool)
        .await?;

    get(pool, id).await
}
