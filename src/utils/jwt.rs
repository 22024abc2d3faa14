// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError, models::user::Role, state::AppState, store::users, utils::access::is_admin,
};

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - Stores the User ID (as string).
    pub sub: String,
    pub role: Role,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64, AppError> {
        self.sub
            .parse::<i64>()
            .map_err(|_| AppError::Unauthorized("Invalid token subject".to_string()))
    }
}

/// Signs a new JWT for the user.
pub fn sign_jwt(
    id: i64,
    role: Role,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    // Calculate expiration: current time + expiration_seconds
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as usize
        + expiration_seconds as usize;

    let claims = Claims {
        sub: id.to_string(),
        role,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a JWT string.
///
/// Returns the `Claims` if valid, otherwise returns an `AppError`.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

/// Axum Middleware: Authentication.
///
/// Intercepts requests, validates the 'Authorization: Bearer <token>' header,
/// then reloads the user. A user that no longer exists, or is no longer both
/// active and verified, gets 401 even with an unexpired token.
/// On success the stored `User` and `Claims` carrying its current role are
/// injected into the request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) => token,
        None => {
            return AppError::Unauthorized("Authentication credentials were not provided.".to_string())
                .into_response();
        }
    };

    let claims = match verify_jwt(token, &state.config.jwt_secret) {
        Ok(claims) => claims,
        Err(e) => return e.into_response(),
    };

    let user_id = match claims.user_id() {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    let user = match users::find_by_id(&state.pool, user_id).await {
        Ok(Some(user)) if user.can_login() => user,
        Ok(_) => {
            return AppError::Unauthorized("User not found or inactive.".to_string())
                .into_response();
        }
        Err(e) => return e.into_response(),
    };

    req.extensions_mut().insert(Claims {
        role: user.role,
        ..claims
    });
    req.extensions_mut().insert(user);
    next.run(req).await
}

/// Axum Middleware: Admin Authorization.
///
/// Must be used AFTER `auth_middleware`, which refreshes the role from the
/// stored user. Rejects with 403 whenever the caller is not an admin, before
/// any handler looks up the target resource.
pub async fn admin_middleware(req: Request<Body>, next: Next) -> Response {
    if !is_admin(req.extensions().get::<Claims>()) {
        return AppError::PermissionDenied.into_response();
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_token_round_trips_claims() {
        let token = sign_jwt(42, Role::Creator, "secret", 60).unwrap();
        let claims = verify_jwt(&token, "secret").unwrap();
        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.role, Role::Creator);
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let token = sign_jwt(1, Role::Admin, "secret", 60).unwrap();
        assert!(matches!(
            verify_jwt(&token, "other"),
            Err(AppError::Unauthorized(_))
        ));
    }
}
