// src/services/verification.rs

//! Registration and email verification.
//!
//! A user moves UNVERIFIED_NO_CODE -> CODE_SENT on `register` and
//! CODE_SENT -> VERIFIED on `confirm`. There is no way back, and codes do not
//! expire.

use sqlx::SqlitePool;
use url::Url;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::user::{NewUser, RegisterRequest, User},
    services::mailer::{MailMessage, Mailer},
    store::users,
    utils::{hash::hash_password, otp::generate_code},
};

pub const VERIFICATION_SUBJECT: &str = "Your ExamSim Verification Code";

/// Link that confirms the account when opened.
pub fn activation_link(public_base_url: &str, email: &str, code: &str) -> AppResult<Url> {
    Url::parse_with_params(
        &format!("{}/api/users/activate", public_base_url.trim_end_matches('/')),
        &[("email", email), ("code", code)],
    )
    .map_err(|e| AppError::InternalServerError(format!("bad activation link: {}", e)))
}

pub fn verification_message(public_base_url: &str, email: &str, code: &str) -> AppResult<MailMessage> {
    let link = activation_link(public_base_url, email, code)?;
    Ok(MailMessage {
        to: email.to_string(),
        subject: VERIFICATION_SUBJECT.to_string(),
        body: format!(
            "Welcome to ExamSim AI! Your verification code is: {}\nOr click to activate: {}",
            code, link
        ),
    })
}

/// Creates an inactive account, stores a fresh code and mails it.
///
/// If anything after the insert fails, mail delivery included, the new row
/// is deleted again so the email can be registered on a later try.
pub async fn register(
    pool: &SqlitePool,
    mailer: &dyn Mailer,
    public_base_url: &str,
    req: &RegisterRequest,
) -> AppResult<User> {
    req.validate()?;

    let hashed_password = hash_password(&req.password)?;
    let user = users::create(
        pool,
        &NewUser::registration(&req.email, hashed_password, &req.first_name, &req.last_name),
    )
    .await?;

    match issue_code(pool, mailer, public_base_url, &user).await {
        Ok(()) => {
            tracing::info!(user_id = user.id, "registered; verification code sent");
            users::get(pool, user.id).await
        }
        Err(err) => {
            tracing::warn!(user_id = user.id, "registration rolled back: {}", err);
            if let Err(cleanup) = users::delete(pool, user.id).await {
                tracing::error!(user_id = user.id, "failed to roll back registration: {}", cleanup);
            }
            Err(err)
        }
    }
}

async fn issue_code(
    pool: &SqlitePool,
    mailer: &dyn Mailer,
    public_base_url: &str,
    user: &User,
) -> AppResult<()> {
    let code = generate_code();
    users::set_verification_code(pool, user.id, &code).await?;

    let message = verification_message(public_base_url, &user.email, &code)?;
    mailer
        .send(&message)
        .await
        .map_err(|e| AppError::MailDelivery(e.to_string()))
}

/// Shared by the code form and the activation link.
pub async fn confirm(pool: &SqlitePool, email: &str, code: &str) -> AppResult<User> {
    let user = users::confirm(pool, email, code).await?;
    tracing::info!(user_id = user.id, "account verified");
    Ok(user)
}

/// Valid credentials are not enough: the account must also be active and
/// verified.
pub async fn login(pool: &SqlitePool, email: &str, password: &str) -> AppResult<User> {
    let user = users::authenticate(pool, email, password).await?;
    if !user.can_login() {
        return Err(AppError::NotActivated);
    }
    Ok(user)
}
