// src/handlers/auth.rs

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::{
        quiz::Quiz,
        result::QuizResult,
        user::{CreateUserRequest, LoginRequest, LoginResponse, MeResponse, Session, User},
    },
    storage::StorageError,
    store::{Stores, keys},
    utils::{
        hash::{hash_password, verify_password},
        jwt::{Claims, sign_jwt},
    },
};

/// Creates a session for `user` and signs a token bound to it.
async fn open_session(stores: &Stores, config: &Config, user: User) -> Result<LoginResponse, AppError> {
    let session = Session {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user.id.clone(),
        created_at: chrono::Utc::now(),
    };
    let session_id = session.id.clone();

    stores
        .update(keys::SESSIONS, |sessions: &mut Vec<Session>| {
            sessions.push(session);
            Ok::<_, StorageError>(())
        })
        .await?;

    let token = sign_jwt(&user, &session_id, &config.jwt_secret, config.jwt_expiration)?;

    Ok(LoginResponse {
        token,
        token_type: "Bearer",
        user,
    })
}

/// Inserts a user unless the email is already registered.
async fn insert_user(stores: &Stores, user: User) -> Result<User, AppError> {
    stores
        .update(keys::USERS, |users: &mut Vec<User>| {
            if users.iter().any(|u| u.email == user.email) {
                return Err(AppError::Conflict("Email is already in use".to_string()));
            }
            users.push(user.clone());
            Ok(user)
        })
        .await
}

/// Inserts a user together with their password hash.
///
/// If the hash cannot be stored the user record is removed again, so the
/// email stays free for another try.
async fn create_account(stores: &Stores, user: User, hashed_password: &str) -> Result<User, AppError> {
    let user = insert_user(stores, user).await?;

    if let Err(e) = stores.set_password_hash(&user.id, hashed_password).await {
        tracing::error!("Failed to store password for {}, rolling back: {:?}", user.id, e);
        if let Err(rollback) = stores.remove_user(&user.id).await {
            tracing::error!("Rollback of user {} failed: {:?}", user.id, rollback);
        }
        return Err(e.into());
    }

    Ok(user)
}

/// Registers a new user and logs them in.
///
/// Hashes the password using Argon2 before storing it in the sidecar entry.
/// Returns 201 Created with a token and the user object.
pub async fn register(
    State(stores): State<Stores>,
    State(config): State<Config>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let hashed_password = hash_password(&payload.password)?;

    let user = create_account(
        &stores,
        User {
            id: uuid::Uuid::new_v4().to_string(),
            name: payload.name.trim().to_string(),
            email: payload.email.trim().to_string(),
            is_admin: false,
            created_at: chrono::Utc::now(),
        },
        &hashed_password,
    )
    .await?;
    tracing::info!("Registered user {}", user.id);

    let response = open_session(&stores, &config, user).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Authenticates a user and returns a JWT token.
pub async fn login(
    State(stores): State<Stores>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = stores
        .find_user_by_email(payload.email.trim())
        .await?
        .ok_or(AppError::AuthError("User not found".to_string()))?;

    let stored_hash = stores
        .password_hash(&user.id)
        .await?
        .ok_or(AppError::AuthError("Invalid password".to_string()))?;

    if !verify_password(&payload.password, &stored_hash)? {
        return Err(AppError::AuthError("Invalid password".to_string()));
    }

    let response = open_session(&stores, &config, user).await?;
    Ok(Json(response))
}

/// Ends the caller's session. The token stops working immediately.
pub async fn logout(
    State(stores): State<Stores>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    stores
        .update(keys::SESSIONS, |sessions: &mut Vec<Session>| {
            sessions.retain(|s| s.id != claims.sid);
            Ok::<_, StorageError>(())
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Returns the current user with counts of authored quizzes and taken results.
pub async fn me(
    State(stores): State<Stores>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = stores
        .find_user(&claims.sub)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let quizzes: Vec<Quiz> = stores.quizzes().await?;
    let results: Vec<QuizResult> = stores.results().await?;

    Ok(Json(MeResponse {
        quizzes_count: quizzes.iter().filter(|q| q.creator_id == user.id).count(),
        results_count: results.iter().filter(|r| r.user_id == user.id).count(),
        user,
    }))
}

/// Creates the configured administrator account if it does not exist yet.
pub async fn seed_admin_user(stores: &Stores, config: &Config) -> Result<(), AppError> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(());
    };

    if stores.find_user_by_email(email).await?.is_some() {
        return Ok(());
    }

    tracing::info!("Seeding admin user: {}", email);
    let hashed_password = hash_password(password)?;

    create_account(
        stores,
        User {
            id: uuid::Uuid::new_v4().to_string(),
            name: config.admin_name.clone(),
            email: email.clone(),
            is_admin: true,
            created_at: chrono::Utc::now(),
        },
        &hashed_password,
    )
    .await?;
    tracing::info!("Admin user created successfully.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::testing::FlakyStorage;

    fn user(email: &str) -> User {
        User {
            id: uuid::Uuid::new_v4().to_string(),
            name: "Alice".to_string(),
            email: email.to_string(),
            is_admin: false,
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_failed_password_write_frees_the_email() {
        let storage = FlakyStorage::new("password-");
        let stores = Stores::new(Arc::new(storage.clone()));

        let err = create_account(&stores, user("alice@example.com"), "hash")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InternalServerError(_)));
        assert!(stores.find_user_by_email("alice@example.com").await.unwrap().is_none());

        storage.set_failing(false);
        let created = create_account(&stores, user("alice@example.com"), "hash")
            .await
            .unwrap();
        assert_eq!(
            stores.password_hash(&created.id).await.unwrap().as_deref(),
            Some("hash")
        );
    }

    #[tokio::test]
    async fn test_duplicate_email_is_a_conflict() {
        let stores = Stores::new(Arc::new(crate::storage::MemoryStorage::new()));
        create_account(&stores, user("bob@example.com"), "hash").await.unwrap();
        let err = create_account(&stores, user("bob@example.com"), "hash")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
