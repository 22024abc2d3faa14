// src/models/topic.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::user::double_option;

/// Represents the 'topics' table: one node of the subject taxonomy.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Topic {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<i64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A topic together with its subtopics, as returned by the tree endpoint.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TopicNode {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub children: Vec<TopicNode>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTopicRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    /// Derived from `name` when absent.
    #[validate(length(min = 1, max = 50))]
    pub slug: Option<String>,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTopicRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub slug: Option<String>,
    /// `Some(None)` detaches the topic and makes it a root.
    #[serde(default, deserialize_with = "double_option")]
    pub parent_id: Option<Option<i64>>,
}
