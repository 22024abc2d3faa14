// src/store/users.rs

//! Identity store: user rows, verification codes and credential checks.

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::{
    error::{AppError, AppResult, is_unique_violation},
    models::user::{NewUser, UpdateUserRequest, User},
    utils::hash::verify_password,
};

const USER_COLUMNS: &str = "id, email, password, first_name, last_name, phone_number, role, \
    subscription_tier, is_2fa_enabled, verification_code, is_verified, is_active, date_joined";

fn duplicate_user(err: sqlx::Error) -> AppError {
    if !is_unique_violation(&err) {
        return AppError::from(err);
    }
    if err.to_string().contains("phone_number") {
        AppError::DuplicateKey("A user with this phone number already exists.".to_string())
    } else {
        AppError::DuplicateKey("A user with this email already exists.".to_string())
    }
}

/// Inserts a user. Fails with `DuplicateKey` when the email or phone number
/// is already registered.
pub async fn create(pool: &SqlitePool, new_user: &NewUser) -> AppResult<User> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO users
        (email, password, first_name, last_name, phone_number, role, subscription_tier,
         is_active, is_verified, date_joined)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(&new_user.email)
    .bind(&new_user.password_hash)
    .bind(&new_user.first_name)
    .bind(&new_user.last_name)
    .bind(&new_user.phone_number)
    .bind(new_user.role)
    .bind(new_user.subscription_tier)
    .bind(new_user.is_active)
    .bind(new_user.is_verified)
    .bind(chrono::Utc::now())
    .fetch_one(pool)
    .await
    .map_err(duplicate_user)?;

    get(pool, id).await
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> AppResult<Option<User>> {
    let user =
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(email.trim())
            .fetch_optional(pool)
            .await?;
    Ok(user)
}

pub async fn get(pool: &SqlitePool, id: i64) -> AppResult<User> {
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// Newest accounts first.
pub async fn list(pool: &SqlitePool) -> AppResult<Vec<User>> {
    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY date_joined DESC, id DESC"
    ))
    .fetch_all(pool)
    .await?;
    Ok(users)
}

pub async fn set_verification_code(pool: &SqlitePool, id: i64, code: &str) -> AppResult<()> {
    let result = sqlx::query("UPDATE users SET verification_code = ? WHERE id = ?")
        .bind(code)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    Ok(())
}

/// Activates the account owning `email` if `code` equals its stored code.
///
/// The code is cleared in the same statement, so a second call with the same
/// code fails with `CodeMismatch`.
pub async fn confirm(pool: &SqlitePool, email: &str, code: &str) -> AppResult<User> {
    let user = find_by_email(pool, email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let stored = user.verification_code.as_deref().filter(|c| !c.is_empty());
    if stored != Some(code) {
        return Err(AppError::CodeMismatch);
    }

    // Guarded on the code so that two concurrent confirmations cannot both win.
    let result = sqlx::query(
        r#"
        UPDATE users
        SET is_active = TRUE, is_verified = TRUE, verification_code = NULL
        WHERE id = ? AND verification_code = ?
        "#,
    )
    .bind(user.id)
    .bind(code)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::CodeMismatch);
    }

    get(pool, user.id).await
}

/// Checks an email/password pair. Unknown email and wrong password are
/// indistinguishable to the caller.
pub async fn authenticate(pool: &SqlitePool, email: &str, password: &str) -> AppResult<User> {
    let user = find_by_email(pool, email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(password, &user.password)? {
        return Err(AppError::InvalidCredentials);
    }

    Ok(user)
}

/// Applies the present fields of `changes`. `password_hash` replaces the
/// stored hash when given.
pub async fn update(
    pool: &SqlitePool,
    id: i64,
    changes: &UpdateUserRequest,
    password_hash: Option<String>,
) -> AppResult<User> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE users SET ");
    let mut separated = builder.separated(", ");
    let mut touched = false;

    if let Some(email) = &changes.email {
        separated.push("email = ");
        separated.push_bind_unseparated(email.trim().to_string());
        touched = true;
    }

    if let Some(first_name) = &changes.first_name {
        separated.push("first_name = ");
        separated.push_bind_unseparated(first_name.clone());
        touched = true;
    }

    if let Some(last_name) = &changes.last_name {
        separated.push("last_name = ");
        separated.push_bind_unseparated(last_name.clone());
        touched = true;
    }

    if let Some(phone_number) = &changes.phone_number {
        separated.push("phone_number = ");
        separated.push_bind_unseparated(phone_number.clone());
        touched = true;
    }

    if let Some(role) = changes.role {
        separated.push("role = ");
        separated.push_bind_unseparated(role);
        touched = true;
    }

    if let Some(tier) = changes.subscription_tier {
        separated.push("subscription_tier = ");
        separated.push_bind_unseparated(tier);
        touched = true;
    }

    if let Some(enabled) = changes.is_2fa_enabled {
        separated.push("is_2fa_enabled = ");
        separated.push_bind_unseparated(enabled);
        touched = true;
    }

    if let Some(active) = changes.is_active {
        separated.push("is_active = ");
        separated.push_bind_unseparated(active);
        touched = true;
    }

    if let Some(verified) = changes.is_verified {
        separated.push("is_verified = ");
        separated.push_bind_unseparated(verified);
        touched = true;
    }

    if let Some(hash) = password_hash {
        separated.push("password = ");
        separated.push_bind_unseparated(hash);
        touched = true;
    }

    if !touched {
        return get(pool, id).await;
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(pool).await.map_err(duplicate_user)?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    get(pool, id).await
}

/// Removes the user. Returns `NotFound` when nothing was deleted.
pub async fn delete(pool: &SqlitePool, id: i64) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    Ok(())
}
