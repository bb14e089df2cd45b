// src/main.rs

use std::{sync::Arc, time::Duration};

use clinker::config::{Config, TICK_MILLIS};
use clinker::handlers::auth::seed_admin_user;
use clinker::player::PlayerRegistry;
use clinker::routes;
use clinker::state::AppState;
use clinker::storage::{MemoryStorage, PgStorage, Storage};
use clinker::store::Stores;
use dotenvy::dotenv;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let storage: Arc<dyn Storage> = match &config.database_url {
        Some(database_url) => {
            let pool = connect_with_retry(database_url).await;

            // Run Migrations Automatically
            tracing::info!("Running migrations...");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Migrations applied successfully.");

            Arc::new(PgStorage::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, keeping all data in memory");
            Arc::new(MemoryStorage::new())
        }
    };

    let stores = Stores::new(storage);

    // Seed Admin User
    if let Err(e) = seed_admin_user(&stores, &config).await {
        tracing::error!("Failed to seed admin user: {:?}", e);
    }

    let state = AppState {
        stores,
        players: PlayerRegistry::new(
            Duration::from_millis(TICK_MILLIS),
            Duration::from_secs(config.attempt_idle_timeout),
        ),
        config: config.clone(),
    };

    // Create the Axum application router
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind listening address");
    tracing::info!("Listening on {}", config.bind_addr);

    // Start the server
    axum::serve(listener, app).await.expect("Server error");
}

/// Initialize Database Pool with Retry
async fn connect_with_retry(database_url: &str) -> PgPool {
    let mut retry_count = 0;
    loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await
        {
            Ok(pool) => {
                tracing::info!("Database connected...");
                break pool;
            }
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    panic!("Failed to connect to database after 5 retries: {}", e);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    }
}
