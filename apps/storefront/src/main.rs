//! # eSalesOne Storefront
//!
//! HTTP server for the storefront client.
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Storefront Server                                │
//! │                                                                         │
//! │  config ──► Database::new (migrations) ──► OrderService                 │
//! │                                               │                         │
//! │  NotificationRelay ◄── spawn ─────────────────┤                         │
//! │                                               ▼                         │
//! │  Browser ───► HTTP (5000) ───► axum Router ───► SQLite                  │
//! │                                                                         │
//! │  Ctrl+C / SIGTERM ──► drain HTTP ──► stop relay ──► close pool          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use esales_db::{Database, DbConfig};
use storefront::config::{PaymentMode, StorefrontConfig};
use storefront::notification::{HttpMailSender, LogNotificationSender, NotificationSender};
use storefront::payment::{FixedOutcomeProcessor, PaymentProcessor, SimulatedPaymentProcessor};
use storefront::services::outbox_relay::DEFAULT_GRACE_PERIOD;
use storefront::services::{NotificationRelay, OrderService};
use storefront::{build_router, AppState};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("storefront=info,esales_db=info,tower_http=debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!("Starting eSalesOne storefront...");

    // Load configuration
    let config = StorefrontConfig::load()?;
    info!(
        port = config.port,
        database = %config.database_path.display(),
        payment_mode = ?config.payment_mode,
        "Configuration loaded"
    );

    // Connect to database (runs migrations)
    let db = Database::new(
        DbConfig::new(&config.database_path).max_connections(config.db_max_connections),
    )
    .await?;

    let payments: Arc<dyn PaymentProcessor> = match config.payment_mode {
        PaymentMode::Simulated => {
            Arc::new(SimulatedPaymentProcessor::new(config.payment_success_rate))
        }
        PaymentMode::ApproveAll => Arc::new(FixedOutcomeProcessor::approve_all()),
        PaymentMode::DeclineAll => Arc::new(FixedOutcomeProcessor::decline_all()),
    };

    let notifier: Arc<dyn NotificationSender> =
        match (&config.mail_api_url, &config.mail_api_token) {
            (Some(url), Some(token)) => {
                info!(url = %url, "Sending email through mail API");
                Arc::new(HttpMailSender::new(
                    url.clone(),
                    token.clone(),
                    config.email_from.clone(),
                    config.support_email.clone(),
                    config.mail_timeout(),
                )?)
            }
            _ => {
                warn!("MAIL_API_URL not set, notifications will only be logged");
                Arc::new(LogNotificationSender)
            }
        };

    // Background notification retries
    let (relay, relay_handle) = NotificationRelay::new(
        db.clone(),
        notifier.clone(),
        config.outbox_poll_interval(),
        DEFAULT_GRACE_PERIOD,
    );
    let relay_task = tokio::spawn(relay.run());

    let orders = OrderService::new(db.clone(), payments, notifier);
    let addr = config.listen_addr();
    let state = AppState::new(db.clone(), orders);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr.as_str()).await?;
    info!(%addr, "Storefront listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    relay_handle.shutdown().await;
    if let Err(e) = relay_task.await {
        error!(?e, "Notification relay task failed");
    }

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(?e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(?e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
