// src/models/user.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::not_blank;

/// A registered account, stored in the `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,

    pub name: String,

    /// Expected to be unique; checked at registration.
    pub email: String,

    pub is_admin: bool,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl User {
    pub fn role(&self) -> &'static str {
        if self.is_admin { "admin" } else { "user" }
    }
}

/// Aggregated profile data for the current user.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: User,
    pub quizzes_count: usize,
    pub results_count: usize,
}

/// Response for a successful login or registration.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(rename = "type")]
    pub token_type: &'static str,
    pub user: User,
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(custom(function = not_blank, message = "All fields are required"))]
    pub name: String,
    #[validate(
        custom(function = not_blank, message = "All fields are required"),
        email(message = "Email address is not valid")
    )]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 254))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// An active login. Removing it from the `sessions` collection logs the user out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ThemePreference {
    pub theme: Theme,
}
