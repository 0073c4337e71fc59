mod config;
mod db;
mod errors;
mod llm_client;
mod matching;
mod models;
mod routes;
mod sources;
mod state;
mod store;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::{create_pool, ensure_schema};
use crate::llm_client::LlmClient;
use crate::matching::pipeline::MatchPipeline;
use crate::matching::scheduler::{Scheduler, SchedulerConfig};
use crate::routes::build_router;
use crate::sources::AdzunaSource;
use crate::state::AppState;
use crate::store::{MemoryProfileStore, PgProfileStore, ProfileStore};

const SCHEDULER_STOP_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting matcher v{}", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn ProfileStore> = if config.store_backend == "memory" {
        info!("Using in-memory profile store (data is lost on restart)");
        Arc::new(MemoryProfileStore::new())
    } else {
        let pool = create_pool(&config.database_url).await?;
        ensure_schema(&pool).await?;
        Arc::new(PgProfileStore::new(pool))
    };

    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let source = AdzunaSource::new(
        config.adzuna_app_id.clone(),
        config.adzuna_app_key.clone(),
        config.adzuna_country.clone(),
    )?;
    info!("Adzuna posting source initialized ({})", config.adzuna_country);

    let pipeline = MatchPipeline::new(
        store.clone(),
        Arc::new(source),
        Arc::new(llm),
        config.matching.clone(),
    );
    info!(
        "Match pipeline ready (threshold {}, fallback {})",
        config.matching.threshold, config.matching.fallback_score
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (scheduler_handle, scheduler_state) = if config.scheduler_enabled {
        let scheduler = Scheduler::new(
            pipeline.clone(),
            SchedulerConfig {
                interval: config.sweep_interval,
                run_timeout: config.run_timeout,
            },
        );
        let scheduler_state = scheduler.subscribe();
        (Some(scheduler.spawn(shutdown_rx)), Some(scheduler_state))
    } else {
        info!("Scheduler disabled");
        (None, None)
    };

    let state = AppState {
        store,
        pipeline,
        scheduler: scheduler_state,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    shutdown_tx.send_replace(true);
    if let Some(handle) = scheduler_handle {
        match tokio::time::timeout(SCHEDULER_STOP_GRACE, handle).await {
            Ok(joined) => joined?,
            Err(_) => warn!("Scheduler did not stop within {SCHEDULER_STOP_GRACE:?}; exiting anyway"),
        }
    }

    Ok(())
}
