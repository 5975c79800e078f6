//! shop_backend - account, role and permission service
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────────┐    ┌────────────┐
//! │  Config  │───▶│ Gateway  │───▶│ Auth + Gate  │───▶│  Services  │──▶ PostgreSQL
//! │  (YAML)  │    │  (axum)  │    │ (JWT, RBAC)  │    │ (accounts) │
//! └──────────┘    └──────────┘    └──────────────┘    └────────────┘
//! ```
//!
//! Usage:
//!   shop_backend [--env <name>] [--port <n>]   serve HTTP
//!   shop_backend [--env <name>] --seed         migrate, seed, exit

use std::sync::Arc;

use anyhow::Context;

use shop_backend::account::{AccountService, PgStore, RoleService};
use shop_backend::config::{AppConfig, MIN_RECOMMENDED_SECRET_LEN};
use shop_backend::db::{self, Database};
use shop_backend::gateway::{self, state::AppState};
use shop_backend::rbac::TokenService;

fn arg_value(flags: &[&str]) -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if flags.contains(&args[i].as_str()) && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

fn get_env() -> String {
    arg_value(&["--env", "-e"]).unwrap_or_else(|| "dev".to_string())
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    arg_value(&["--port"]).and_then(|p| p.parse().ok())
}

fn use_seed_mode() -> bool {
    std::env::args().any(|a| a == "--seed")
}

fn main() {
    let env = get_env();
    let app_config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            // logging is not up yet
            eprintln!("FATAL: {}", e);
            std::process::exit(1);
        }
    };
    let _log_guard = shop_backend::logging::init_logging(&app_config);

    tracing::info!(
        "Starting shop_backend {} in {} mode",
        env!("BUILD_REV"),
        env
    );

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(run(app_config)) {
        tracing::error!("FATAL: {:#}", e);
        eprintln!("FATAL: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(mut app_config: AppConfig) -> anyhow::Result<()> {
    let database_url = app_config.database_url()?.to_string();
    let db = Arc::new(
        Database::from_config(&database_url, &app_config.database)
            .await
            .context("connect to PostgreSQL")?,
    );

    if use_seed_mode() {
        db.migrate().await.context("apply migrations")?;
        db::seed::run(db.pool(), &app_config.bootstrap).await?;
        db.close().await;
        return Ok(());
    }

    if app_config.database.run_migrations {
        db.migrate().await.context("apply migrations")?;
    }

    let secret = app_config.jwt_secret()?;
    if secret.len() < MIN_RECOMMENDED_SECRET_LEN {
        tracing::warn!(
            "JWT secret is shorter than {} bytes; use a longer random value",
            MIN_RECOMMENDED_SECRET_LEN
        );
    }
    let tokens = Arc::new(TokenService::new(secret.as_bytes(), app_config.token_ttl()));

    let deadlines = app_config.database.deadlines();
    let store = Arc::new(PgStore::new(db.pool().clone()));
    let accounts = Arc::new(AccountService::new(
        store.clone(),
        store.clone(),
        tokens.clone(),
        deadlines,
    ));
    let roles = Arc::new(RoleService::new(store, deadlines));
    let state = Arc::new(AppState::new(accounts, roles, tokens, Some(db.clone())));

    if let Some(port) = get_port_override() {
        app_config.server.port = port;
    }

    gateway::run_server(&app_config.server.host, app_config.server.port, state)
        .await
        .context("gateway server")?;

    db.close().await;
    Ok(())
}
