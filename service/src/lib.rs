mod driver;
mod notifier;
mod server;

use std::sync::Arc;

use abi::Config;
use reservation::ReservationManager;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use driver::{BatchReport, HandlerResponse, ReconciliationDriver, RecordOutcome, RecordReport};
pub use notifier::{conflict_alert, Alert, AlertChannel, Notifier, WebhookChannel};
pub use server::{build_router, AppState};

pub async fn start_server(config: &Config) -> anyhow::Result<()> {
    let store = ReservationManager::from_config(&config.db).await?;
    let notifier = Notifier::from_config(&config.notifier)?;
    if !notifier.is_configured() {
        tracing::warn!("no alert topic configured, conflict alerts will be dropped");
    }

    let driver =
        ReconciliationDriver::new(Arc::new(store), notifier).with_config(&config.reconciler);
    let state = Arc::new(AppState::new(driver, config.rooms.clone()));
    let app = build_router(state).layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("listening on {}", addr);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
