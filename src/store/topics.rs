// src/store/topics.rs

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::{
    error::{AppError, AppResult},
    models::topic::{CreateTopicRequest, Topic, TopicNode, UpdateTopicRequest},
    store::{SlugTable, resolve_slug},
    utils::topic_forest::TopicForest,
};

const TOPIC_COLUMNS: &str = "id, name, slug, parent_id, created_at";

pub async fn create(pool: &SqlitePool, req: &CreateTopicRequest) -> AppResult<Topic> {
    if let Some(parent_id) = req.parent_id {
        ensure_exists(pool, parent_id, "Parent topic not found").await?;
    }

    let slug = resolve_slug(pool, SlugTable::Topics, req.slug.as_deref(), &req.name, None).await?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO topics (name, slug, parent_id, created_at) VALUES (?, ?, ?, ?) RETURNING id",
    )
    .bind(req.name.trim())
    .bind(&slug)
    .bind(req.parent_id)
    .bind(chrono::Utc::now())
    .fetch_one(pool)
    .await
    .map_err(|e| AppError::unique_or_internal(e, format!("Slug '{}' is already in use.", slug)))?;

    get(pool, id).await
}

pub async fn get(pool: &SqlitePool, id: i64) -> AppResult<Topic> {
    sqlx::query_as::<_, Topic>(&format!("SELECT {TOPIC_COLUMNS} FROM topics WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Topic not found".to_string()))
}

pub async fn list(pool: &SqlitePool) -> AppResult<Vec<Topic>> {
    let topics = sqlx::query_as::<_, Topic>(&format!("SELECT {TOPIC_COLUMNS} FROM topics ORDER BY id"))
        .fetch_all(pool)
        .await?;
    Ok(topics)
}

pub async fn forest(pool: &SqlitePool) -> AppResult<TopicForest> {
    Ok(TopicForest::new(list(pool).await?))
}

pub async fn tree(pool: &SqlitePool) -> AppResult<Vec<TopicNode>> {
    Ok(forest(pool).await?.tree())
}

/// Renames, re-slugs or moves a topic. A move that would place the topic
/// under itself or one of its descendants is rejected.
pub async fn update(pool: &SqlitePool, id: i64, req: &UpdateTopicRequest) -> AppResult<Topic> {
    let current = get(pool, id).await?;

    if let Some(Some(parent_id)) = req.parent_id {
        let forest = forest(pool).await?;
        if !forest.contains(parent_id) {
            return Err(AppError::NotFound("Parent topic not found".to_string()));
        }
        if forest.would_create_cycle(id, parent_id) {
            return Err(cycle_error());
        }
    }

    let slug = match req.slug.as_deref() {
        Some(requested) => Some(
            resolve_slug(pool, SlugTable::Topics, Some(requested), &current.name, Some(id)).await?,
        ),
        None => None,
    };

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE topics SET ");
    let mut separated = builder.separated(", ");
    let mut touched = false;

    if let Some(name) = &req.name {
        separated.push("name = ");
        separated.push_bind_unseparated(name.trim().to_string());
        touched = true;
    }

    if let Some(slug) = slug {
        separated.push("slug = ");
        separated.push_bind_unseparated(slug);
        touched = true;
    }

    if let Some(parent_id) = req.parent_id {
        separated.push("parent_id = ");
        separated.push_bind_unseparated(parent_id);
        touched = true;
    }

    if !touched {
        return Ok(current);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);
    if let Some(Some(parent_id)) = req.parent_id {
        // The forest check above can race a concurrent move; this re-check
        // runs inside the write itself.
        push_acyclic_guard(&mut builder, id, parent_id);
    }

    let result = builder
        .build()
        .execute(pool)
        .await
        .map_err(|e| AppError::unique_or_internal(e, "Slug is already in use."))?;

    if result.rows_affected() == 0 {
        get(pool, id).await?;
        return Err(cycle_error());
    }

    get(pool, id).await
}

fn cycle_error() -> AppError {
    AppError::Validation("A topic cannot be moved under itself or one of its subtopics.".to_string())
}

/// Appends `AND NOT EXISTS (...)`, true only when `topic_id` is not
/// `new_parent` or any ancestor of it as currently stored.
fn push_acyclic_guard(builder: &mut QueryBuilder<'_, Sqlite>, topic_id: i64, new_parent: i64) {
    builder.push(
        " AND NOT EXISTS (WITH RECURSIVE lineage(id) AS (SELECT ",
    );
    builder.push_bind(new_parent);
    builder.push(
        " UNION SELECT t.parent_id FROM topics t JOIN lineage l ON t.id = l.id \
         WHERE t.parent_id IS NOT NULL) SELECT 1 FROM lineage WHERE lineage.id = ",
    );
    builder.push_bind(topic_id);
    builder.push(")");
}

/// Deletes the topic and, through the foreign keys, every descendant topic.
/// Questions filed under any of them keep existing with no topic.
pub async fn delete(pool: &SqlitePool, id: i64) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM topics WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Topic not found".to_string()));
    }
    Ok(())
}

pub(crate) async fn ensure_exists(pool: &SqlitePool, id: i64, message: &str) -> AppResult<()> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM topics WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    found
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound(message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn pool_with_chain() -> SqlitePool {
        let pool = db::connect("sqlite::memory:").await.unwrap();
        db::migrate(&pool).await.unwrap();
        let now = chrono::Utc::now();
        for (id, parent) in [(1, None), (2, Some(1)), (3, Some(2)), (4, None)] {
            sqlx::query("INSERT INTO topics (id, name, slug, parent_id, created_at) VALUES (?, ?, ?, ?, ?)")
                .bind(id)
                .bind(format!("t{id}"))
                .bind(format!("t{id}"))
                .bind(parent)
                .bind(now)
                .execute(&pool)
                .await
                .unwrap();
        }
        pool
    }

    async fn guarded_move(pool: &SqlitePool, id: i64, parent: i64) -> u64 {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE topics SET parent_id = ");
        builder.push_bind(parent);
        builder.push(" WHERE id = ");
        builder.push_bind(id);
        push_acyclic_guard(&mut builder, id, parent);
        builder.build().execute(pool).await.unwrap().rows_affected()
    }

    #[tokio::test]
    async fn guarded_write_refuses_a_loop_the_caller_missed() {
        let pool = pool_with_chain().await;

        // 1 -> 2 -> 3: putting 1 under 3 or under itself closes a loop.
        assert_eq!(guarded_move(&pool, 1, 3).await, 0);
        assert_eq!(guarded_move(&pool, 1, 1).await, 0);
        assert_eq!(get(&pool, 1).await.unwrap().parent_id, None);

        assert_eq!(guarded_move(&pool, 3, 4).await, 1);
        assert_eq!(get(&pool, 3).await.unwrap().parent_id, Some(4));
    }

    #[tokio::test]
    async fn second_of_two_crossing_moves_is_refused() {
        let pool = pool_with_chain().await;

        // Both moves pass a check made against the same snapshot.
        let snapshot = forest(&pool).await.unwrap();
        assert!(!snapshot.would_create_cycle(4, 3));
        assert!(!snapshot.would_create_cycle(1, 4));

        assert_eq!(guarded_move(&pool, 4, 3).await, 1);
        assert_eq!(guarded_move(&pool, 1, 4).await, 0);
        assert_eq!(get(&pool, 1).await.unwrap().parent_id, None);
    }
}
