// src/store/mod.rs

//! SQL access, one module per aggregate. Handlers and the verification
//! workflow call into these; nothing else touches the pool directly.

pub mod attempts;
pub mod exams;
pub mod questions;
pub mod topics;
pub mod users;

use sqlx::SqlitePool;

use crate::{
    error::{AppError, AppResult},
    utils::slug::{next_free_slug, require_slug},
};

/// Tables carrying a unique `slug` column.
#[derive(Debug, Clone, Copy)]
pub(crate) enum SlugTable {
    Topics,
    Exams,
}

impl SlugTable {
    fn as_str(&self) -> &'static str {
        match self {
            SlugTable::Topics => "topics",
            SlugTable::Exams => "exams",
        }
    }
}

/// Chooses the slug for a row being created or renamed.
///
/// An explicit slug is normalized and must be free, or the call fails with
/// `DuplicateKey`. A slug derived from `source` takes the first free
/// `-2`, `-3`, ... suffix instead. `exclude_id` is the row itself on update.
pub(crate) async fn resolve_slug(
    pool: &SqlitePool,
    table: SlugTable,
    explicit: Option<&str>,
    source: &str,
    exclude_id: Option<i64>,
) -> AppResult<String> {
    if let Some(requested) = explicit {
        let slug = require_slug(requested)?;
        let taken: Option<i64> = sqlx::query_scalar(&format!(
            "SELECT id FROM {} WHERE slug = ? AND id IS NOT ?",
            table.as_str()
        ))
        .bind(&slug)
        .bind(exclude_id)
        .fetch_optional(pool)
        .await?;

        if taken.is_some() {
            return Err(AppError::DuplicateKey(format!(
                "Slug '{}' is already in use.",
                slug
            )));
        }
        return Ok(slug);
    }

    let base = require_slug(source)?;
    let taken: Vec<String> = sqlx::query_scalar(&format!(
        "SELECT slug FROM {} WHERE (slug = ? OR slug LIKE ?) AND id IS NOT ?",
        table.as_str()
    ))
    .bind(&base)
    .bind(format!("{}-%", base))
    .bind(exclude_id)
    .fetch_all(pool)
    .await?;

    Ok(next_free_slug(&base, taken.iter().map(String::as_str)))
}
