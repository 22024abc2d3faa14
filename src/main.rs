// src/main.rs

use std::time::Duration;

use examsim::config::Config;
use examsim::db;
use examsim::error::AppError;
use examsim::models::user::{NewUser, Role, SubscriptionTier};
use examsim::routes;
use examsim::services::mailer;
use examsim::state::AppState;
use examsim::store::users;
use examsim::utils::hash::hash_password;
use sqlx::SqlitePool;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load configuration from environment (and .env, if present)
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

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

    // Initialize Database Pool with Retry
    let mut retry_count = 0;
    let pool = loop {
        match db::connect(&config.database_url).await {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    tracing::error!("Failed to connect to database after 5 retries: {}", e);
                    std::process::exit(1);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database connected...");

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    if let Err(e) = db::migrate(&pool).await {
        tracing::error!("Failed to run database migrations: {}", e);
        std::process::exit(1);
    }
    tracing::info!("Migrations applied successfully.");

    // Seed Admin User
    if let Err(e) = seed_admin_user(&pool, &config).await {
        tracing::error!("Failed to seed admin user: {}", e);
    }

    let state = AppState {
        pool,
        mailer: mailer::from_config(&config),
        config: config.clone(),
    };

    let app = routes::create_router(state);

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = match tokio::net::TcpListener::bind(config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", config.bind_addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}

/// Creates the configured admin account once. It is active and verified so
/// it can log in right away.
async fn seed_admin_user(pool: &SqlitePool, config: &Config) -> Result<(), AppError> {
    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        if users::find_by_email(pool, email).await?.is_none() {
            tracing::info!("Seeding admin user: {}", email);
            let hashed_password = hash_password(password)?;

            users::create(
                pool,
                &NewUser {
                    email: email.trim().to_string(),
                    password_hash: hashed_password,
                    first_name: String::new(),
                    last_name: String::new(),
                    phone_number: None,
                    role: Role::Admin,
                    subscription_tier: SubscriptionTier::Free,
                    is_active: true,
                    is_verified: true,
                },
            )
            .await?;
            tracing::info!("Admin user created successfully.");
        }
    }
    Ok(())
}
