// src/models/exam.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::question::{ContentStatus, PublicQuestion};

/// Represents the 'exams' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Exam {
    pub id: i64,
    pub creator_id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub duration_minutes: i64,
    pub status: ContentStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'exam_questions' join table.
/// `position` is the question's place in the exam; rows are always read in
/// ascending position, ties in insertion order.
#[derive(Debug, Clone, FromRow, Serialize, PartialEq)]
pub struct ExamQuestion {
    pub id: i64,
    pub exam_id: i64,
    pub question_id: i64,
    pub marks: f64,
    #[serde(rename = "order")]
    pub position: i64,
}

/// Exam as shown to takers: ordered questions without answers.
#[derive(Debug, Serialize)]
pub struct PublicExam {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub duration_minutes: i64,
    pub total_marks: f64,
    pub questions: Vec<PublicExamQuestion>,
}

#[derive(Debug, Serialize)]
pub struct PublicExamQuestion {
    pub marks: f64,
    #[serde(rename = "order")]
    pub position: i64,
    pub question: PublicQuestion,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateExamRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(min = 1, max = 50))]
    pub slug: Option<String>,
    #[serde(default)]
    #[validate(length(max = 10000))]
    pub description: String,
    #[validate(range(min = 1, max = 1440, message = "Duration must be a positive number of minutes."))]
    pub duration_minutes: i64,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateExamRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub slug: Option<String>,
    #[validate(length(max = 10000))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 1440, message = "Duration must be a positive number of minutes."))]
    pub duration_minutes: Option<i64>,
    pub status: Option<ContentStatus>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddExamQuestionRequest {
    pub question_id: i64,
    #[serde(default = "default_marks")]
    #[validate(range(min = 0.0, message = "Marks cannot be negative."))]
    pub marks: f64,
    #[serde(default, rename = "order")]
    #[validate(range(min = 0, message = "Order cannot be negative."))]
    pub position: i64,
}

fn default_marks() -> f64 {
    1.0
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateExamQuestionRequest {
    #[validate(range(min = 0.0, message = "Marks cannot be negative."))]
    pub marks: Option<f64>,
    #[serde(rename = "order")]
    #[validate(range(min = 0, message = "Order cannot be negative."))]
    pub position: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ExamListParams {
    /// Only list exams still open to takers.
    #[serde(default)]
    pub active_only: bool,
}
