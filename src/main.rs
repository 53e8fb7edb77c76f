use std::net::SocketAddr;
use std::sync::Arc;

mod app;
mod auth;
mod clock;
mod config;
mod db;
mod error;
mod handlers;
mod response;
mod timesheets;

use app::{AppState, build_router};
use clock::SystemClock;
use config::Config;
use db::Store;
use timesheet_portal_api::RegisterRequest;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // Si RUST_LOG n'est pas défini, utiliser ces règles par défaut
        tracing_subscriber::EnvFilter::new(
            "info,timesheet_portal=debug,hyper_util=warn,tower_http=info",
        )
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn open_store(config: &Config) -> anyhow::Result<Store> {
    match &config.database_url {
        Some(url) => {
            let pool = db::connection::create_pool(url, config.db_pool_size)?;
            Ok(Store::postgres(&pool))
        }
        None => Ok(Store::in_memory()),
    }
}

/// Comptes de démonstration (manager + employé) pour le store en mémoire.
fn seed_demo_accounts(state: &AppState) -> anyhow::Result<()> {
    let manager = state.auth.register(RegisterRequest {
        email: "manager@example.com".to_string(),
        username: "manager".to_string(),
        password: "Manager123".to_string(),
        manager_id: None,
    })?;
    let employee = state.auth.register(RegisterRequest {
        email: "employee@example.com".to_string(),
        username: "employee".to_string(),
        password: "Employee123".to_string(),
        manager_id: Some(manager.id),
    })?;

    tracing::info!(manager_id = %manager.id, employee_id = %employee.id, "Demo accounts created");
    Ok(())
}

// ----------------- Main -----------------

#[tokio::main]
async fn main() -> Result<(), lambda_http::Error> {
    setup_logging();
    tracing::info!("Starting timesheet-portal...");

    let config = Config::from_env()?;
    let store = open_store(&config)?;
    let state = AppState::new(&config, store, Arc::new(SystemClock))?;

    if config.seed_demo_data {
        if config.database_url.is_none() {
            seed_demo_accounts(&state)?;
        } else {
            tracing::warn!("SEED_DEMO_DATA ignored: only the in-memory store is seeded");
        }
    }

    let app = build_router(state, &config.frontend_url);
    tracing::debug!(environment = config.environment.as_str(), "Router ready");

    if std::env::var("AWS_LAMBDA_FUNCTION_NAME").is_ok() {
        tracing::info!("Running in Lambda mode");
        lambda_http::run(app).await
    } else {
        tracing::info!("Running in local HTTP server mode");
        let addr = format!("{}:{}", config.server_host, config.server_port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!("🚀 Server running at http://{}", addr);
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;

        Ok(())
    }
}
