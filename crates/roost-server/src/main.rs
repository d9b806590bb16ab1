use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use roost_api::{AppState, AppStateInner, router, standup};
use roost_store::Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roost=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let host = std::env::var("ROOST_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("ROOST_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let data_path = std::env::var("ROOST_DATA_PATH").unwrap_or_else(|_| "roost.json".into());
    let snapshot_secs: u64 = std::env::var("ROOST_SNAPSHOT_SECS")
        .unwrap_or_else(|_| "60".into())
        .parse()?;

    let store = Store::open(PathBuf::from(&data_path))?;
    let state: AppState = Arc::new(AppStateInner { store });

    // Standups interrupted by a restart pick their timers back up.
    standup::rearm_standups(&state);

    // Periodic snapshots to the data file.
    let snapshot_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(snapshot_secs));
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Err(err) = snapshot_state.store.snapshot() {
                error!(%err, "snapshot failed");
            }
        }
    });

    let app = router(state.clone())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Roost server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    // One last snapshot on the way out. Best effort, like the periodic one.
    if let Err(err) = state.store.snapshot() {
        error!(%err, "final snapshot failed");
    }

    Ok(())
}
