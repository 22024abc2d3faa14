// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::error::AppError;
use crate::models::user::double_option;

/// Question kind. `TF` is a true/false question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum QuestionType {
    #[serde(rename = "SINGLE")]
    #[sqlx(rename = "SINGLE")]
    Single,
    #[serde(rename = "MULTI")]
    #[sqlx(rename = "MULTI")]
    Multi,
    #[serde(rename = "TF")]
    #[sqlx(rename = "TF")]
    TrueFalse,
}

/// Soft-delete marker shared by questions and exams.
/// Retired rows stay for history but are excluded from new exams and attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum ContentStatus {
    Active,
    Retired,
}

impl ContentStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, ContentStatus::Active)
    }
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Question {
    pub id: i64,
    pub topic_id: Option<i64>,
    pub text: String,
    pub question_type: QuestionType,
    pub difficulty: i64,
    pub explanation: Option<String>,
    pub status: ContentStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'options' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QuestionOption {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
    pub is_correct: bool,
}

/// Question with its options, for administrators.
#[derive(Debug, Serialize)]
pub struct QuestionDetail {
    #[serde(flatten)]
    pub question: Question,
    pub options: Vec<QuestionOption>,
}

/// DTO for sending an option to exam takers (no correctness flag).
#[derive(Debug, Serialize)]
pub struct PublicOption {
    pub id: i64,
    pub text: String,
}

/// DTO for sending a question to exam takers (excludes answers and explanation).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub text: String,
    pub question_type: QuestionType,
    pub difficulty: i64,
    pub options: Vec<PublicOption>,
}

impl From<QuestionDetail> for PublicQuestion {
    fn from(detail: QuestionDetail) -> Self {
        Self {
            id: detail.question.id,
            text: detail.question.text,
            question_type: detail.question.question_type,
            difficulty: detail.question.difficulty,
            options: detail
                .options
                .into_iter()
                .map(|o| PublicOption { id: o.id, text: o.text })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OptionInput {
    #[validate(length(min = 1, max = 500))]
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    pub topic_id: Option<i64>,
    #[validate(length(min = 1, max = 5000))]
    pub text: String,
    pub question_type: QuestionType,
    #[validate(range(min = 1, max = 5, message = "Difficulty must be between 1 and 5."))]
    pub difficulty: i64,
    #[validate(length(max = 5000))]
    pub explanation: Option<String>,
    #[validate(nested)]
    pub options: Vec<OptionInput>,
}

/// DTO for updating a question. Fields are optional.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub topic_id: Option<Option<i64>>,
    #[validate(length(min = 1, max = 5000))]
    pub text: Option<String>,
    pub question_type: Option<QuestionType>,
    #[validate(range(min = 1, max = 5, message = "Difficulty must be between 1 and 5."))]
    pub difficulty: Option<i64>,
    #[serde(default, deserialize_with = "double_option")]
    pub explanation: Option<Option<String>>,
    pub status: Option<ContentStatus>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReplaceOptionsRequest {
    #[validate(nested)]
    pub options: Vec<OptionInput>,
}

#[derive(Debug, Deserialize)]
pub struct QuestionListParams {
    pub topic_id: Option<i64>,
    pub status: Option<ContentStatus>,
}

/// Checks the correct-answer count against the question type.
/// SINGLE and TF need exactly one correct option, MULTI at least one.
pub fn check_options(question_type: QuestionType, correct_flags: &[bool]) -> Result<(), AppError> {
    if correct_flags.len() < 2 {
        return Err(AppError::Validation(
            "A question needs at least two options.".to_string(),
        ));
    }
    if question_type == QuestionType::TrueFalse && correct_flags.len() != 2 {
        return Err(AppError::Validation(
            "A true/false question has exactly two options.".to_string(),
        ));
    }

    let correct = correct_flags.iter().filter(|c| **c).count();
    match question_type {
        QuestionType::Single | QuestionType::TrueFalse if correct != 1 => Err(AppError::Validation(
            "Single choice and true/false questions need exactly one correct option.".to_string(),
        )),
        QuestionType::Multi if correct == 0 => Err(AppError::Validation(
            "Multiple choice questions need at least one correct option.".to_string(),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_choice_needs_exactly_one_correct() {
        assert!(check_options(QuestionType::Single, &[true, false, false]).is_ok());
        assert!(check_options(QuestionType::Single, &[true, true, false]).is_err());
        assert!(check_options(QuestionType::Single, &[false, false]).is_err());
    }

    #[test]
    fn multi_choice_accepts_several_correct() {
        assert!(check_options(QuestionType::Multi, &[true, true, false]).is_ok());
        assert!(check_options(QuestionType::Multi, &[false, false, false]).is_err());
    }

    #[test]
    fn true_false_has_two_options_one_correct() {
        assert!(check_options(QuestionType::TrueFalse, &[false, true]).is_ok());
        assert!(check_options(QuestionType::TrueFalse, &[true, true]).is_err());
        assert!(check_options(QuestionType::TrueFalse, &[true, false, false]).is_err());
    }

    #[test]
    fn question_type_uses_wire_names() {
        assert_eq!(serde_json::to_value(QuestionType::TrueFalse).unwrap(), "TF");
        let parsed: QuestionType = serde_json::from_str("\"MULTI\"").unwrap();
        assert_eq!(parsed, QuestionType::Multi);
    }
}
