// src/handlers/auth.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{ActivationParams, LoginRequest, RegisterRequest, User, VerifyEmailRequest},
    services::{mailer::Mailer, verification},
    utils::jwt::sign_jwt,
};

/// Registers a new, inactive account and mails it a verification code.
///
/// Returns 201 Created. When the mail cannot be sent the account is removed
/// again and 500 is returned.
pub async fn register(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    State(mailer): State<Arc<dyn Mailer>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user =
        verification::register(&pool, mailer.as_ref(), &config.public_base_url, &payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Registration successful. Check your email for the verification code.",
            "email": user.email,
        })),
    ))
}

/// Confirms an account with the emailed code.
pub async fn verify(
    State(pool): State<SqlitePool>,
    Json(payload): Json<VerifyEmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    verification::confirm(&pool, &payload.email, &payload.code).await?;

    Ok(Json(json!({ "message": "Account verified successfully!" })))
}

/// Target of the link in the verification mail. Answers with a small HTML
/// page instead of JSON since it is opened in a browser.
pub async fn activate(
    State(pool): State<SqlitePool>,
    Query(params): Query<ActivationParams>,
) -> impl IntoResponse {
    let email = params.email.as_deref().filter(|v| !v.is_empty());
    let code = params.code.as_deref().filter(|v| !v.is_empty());
    let (Some(email), Some(code)) = (email, code) else {
        return (
            StatusCode::BAD_REQUEST,
            Html(activation_page("Activation failed", "Missing email or code.")),
        );
    };

    match verification::confirm(&pool, email, code).await {
        Ok(_) => (
            StatusCode::OK,
            Html(activation_page(
                "Account activated",
                "Your account is verified. You can now log in.",
            )),
        ),
        Err(AppError::NotFound(_)) => (
            StatusCode::NOT_FOUND,
            Html(activation_page("Activation failed", "No account matches this link.")),
        ),
        Err(AppError::CodeMismatch) => (
            StatusCode::BAD_REQUEST,
            Html(activation_page(
                "Activation failed",
                "This activation link is invalid or has already been used.",
            )),
        ),
        Err(e) => {
            tracing::error!("Activation failed: {}", e);
            (
                e.status(),
                Html(activation_page("Activation failed", "Please try again later.")),
            )
        }
    }
}

fn activation_page(title: &str, message: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{title}</title></head>\
         <body><h1>{title}</h1><p>{message}</p></body></html>"
    )
}

/// Authenticates a user and returns a JWT token.
///
/// The account must be active and verified.
pub async fn login(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = verification::login(&pool, &payload.email, &payload.password).await?;

    let token = sign_jwt(
        user.id,
        user.role,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
    })))
}

/// Profile of the authenticated caller, as loaded by the auth middleware.
pub async fn me(Extension(user): Extension<User>) -> impl IntoResponse {
    Json(user)
}

/// Issues a fresh token for a caller whose current token is still valid.
/// The new token carries the role stored now, not the one in the old token.
pub async fn refresh_token(
    State(config): State<Config>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, AppError> {
    let token = sign_jwt(
        user.id,
        user.role,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
    })))
}
