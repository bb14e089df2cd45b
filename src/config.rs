// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Options every authored question must carry.
pub const OPTIONS_PER_QUESTION: usize = 4;

/// Percentage at or above which a result is shown in the trophy tier.
pub const TROPHY_PERCENTAGE: u32 = 80;

/// Percentage at or above which a result is shown in the second-place tier.
pub const SECOND_PLACE_PERCENTAGE: u32 = 60;

/// Title rendered for results whose quiz no longer exists.
pub const DELETED_QUIZ_TITLE: &str = "Deleted quiz";

/// User id recorded for participants without an account.
pub const GUEST_USER_ID: &str = "guest";

/// Period of both countdown timers, in milliseconds.
pub const TICK_MILLIS: u64 = 1000;

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. Without it the service keeps everything in memory.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub admin_name: String,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    /// Base URL used when building share links.
    pub public_base_url: String,
    pub bind_addr: String,
    /// Seconds without any request after which a live attempt is dropped.
    pub attempt_idle_timeout: u64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86_400);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let admin_name = env::var("ADMIN_NAME").unwrap_or_else(|_| "Administrator".to_string());

        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let attempt_idle_timeout = env::var("ATTEMPT_IDLE_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(7_200);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            admin_name,
            admin_email: env::var("ADMIN_EMAIL").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            public_base_url,
            bind_addr,
            attempt_idle_timeout,
        }
    }
}
