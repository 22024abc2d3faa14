// src/models/attempt.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'exam_attempts' table: one sitting of an exam by a user.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExamAttempt {
    pub id: i64,
    pub user_id: i64,
    pub exam_id: i64,
    /// Unset until graded.
    pub score: Option<f64>,
    /// Unset until graded.
    pub passed: Option<bool>,
    pub start_time: chrono::DateTime<chrono::Utc>,
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
}

impl ExamAttempt {
    /// A submitted attempt accepts no further responses.
    pub fn is_closed(&self) -> bool {
        self.end_time.is_some()
    }
}

/// Represents the 'question_attempts' table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QuestionAttempt {
    pub id: i64,
    pub exam_attempt_id: i64,
    pub question_id: i64,
    pub is_correct: bool,
    pub time_taken_seconds: i64,
}

#[derive(Debug, Serialize)]
pub struct QuestionAttemptDetail {
    #[serde(flatten)]
    pub response: QuestionAttempt,
    pub selected_options: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct AttemptDetail {
    #[serde(flatten)]
    pub attempt: ExamAttempt,
    pub responses: Vec<QuestionAttemptDetail>,
}

#[derive(Debug, Deserialize)]
pub struct StartAttemptRequest {
    pub exam_id: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RecordResponseRequest {
    pub question_id: i64,
    #[serde(default)]
    pub selected_options: Vec<i64>,
    #[validate(range(min = 0, message = "Time taken cannot be negative."))]
    pub time_taken_seconds: i64,
}

/// Result recorded by an external grader.
#[derive(Debug, Deserialize, Validate)]
pub struct GradeAttemptRequest {
    #[validate(range(min = 0.0, message = "Score cannot be negative."))]
    pub score: f64,
    pub passed: bool,
}
