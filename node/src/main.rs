// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::RwLock;

use wipecert_node::config::NodeConfig;
use wipecert_node::engine::Engine;
use wipecert_node::errors::EngineError;
use wipecert_node::server::{build_router, SharedEngine};
use wipecert_node::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> Result<(), EngineError> {
    init_telemetry();

    let cfg = NodeConfig::from_env()?;
    tracing::info!("Initializing WipeCert Node with config: {:?}", cfg);

    let engine = Engine::new(&cfg)?;
    let shared_state: SharedEngine = Arc::new(RwLock::new(engine));

    // Spawn Persistence Task
    if let (Some(_), Some(secs)) = (cfg.snapshot_path(), cfg.auto_snapshot_interval_secs) {
        let state_clone = shared_state.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(secs.max(1)));
            // The first tick completes immediately; there is nothing new to save at startup.
            interval.tick().await;
            loop {
                interval.tick().await;
                tracing::debug!("Auto-snapshotting...");
                let mut engine = state_clone.write().await;
                if let Err(e) = engine.save_snapshot() {
                    tracing::error!("Snapshot failed: {}", e);
                }
            }
        });
    }

    let app = build_router(shared_state, cfg.auth_token.clone());

    let addr = cfg.bind_addr;
    tracing::info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
