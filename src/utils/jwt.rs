// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, models::user::User, report::Viewer, state::AppState};

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - the user id.
    pub sub: String,
    /// User's role ('user' or 'admin').
    pub role: String,
    /// Session id; the token dies with the session on logout.
    pub sid: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }

    pub fn viewer(&self) -> Viewer {
        Viewer {
            user_id: self.sub.clone(),
            is_admin: self.is_admin(),
        }
    }
}

/// Signs a new JWT for a user's session.
pub fn sign_jwt(
    user: &User,
    session_id: &str,
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
        sub: user.id.clone(),
        role: user.role().to_owned(),
        sid: session_id.to_owned(),
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
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// Resolves the caller's claims from the `Authorization` header.
///
/// Returns `Ok(None)` when no bearer token is present. A token that fails
/// verification or whose session has been logged out is an error.
pub async fn claims_from_headers(
    headers: &HeaderMap,
    state: &AppState,
) -> Result<Option<Claims>, AppError> {
    let Some(token) = bearer_token(headers) else {
        return Ok(None);
    };

    let claims = verify_jwt(token, &state.config.jwt_secret)?;

    if !state.stores.session_exists(&claims.sid).await? {
        return Err(AppError::AuthError("Session has ended".to_string()));
    }

    Ok(Some(claims))
}

/// Axum Middleware: Authentication.
///
/// Validates the 'Authorization: Bearer <token>' header and the session behind it.
/// If valid, injects `Claims` into the request extensions for handlers to use.
/// If invalid, returns 401 Unauthorized.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let claims = claims_from_headers(req.headers(), &state)
        .await?
        .ok_or_else(|| AppError::AuthError("Missing token".to_string()))?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
