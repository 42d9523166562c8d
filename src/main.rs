use std::{net::SocketAddr, sync::Arc};

use mongodb::Client;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use tradejournal::{
    config, routes,
    services::{
        alert_monitor, alert_store::MongoAlertStore, db_init, notifier::SnsGateway,
    },
    AppState,
};

async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
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

    tracing::info!("shutdown requested");
    token.cancel();
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = config::load();

    // Mongo connection
    let client = Client::with_uri_str(&settings.mongodb_uri)
        .await
        .expect("Failed to connect to MongoDB");
    let db = client.database(&settings.mongodb_db);

    if let Err(e) = db_init::ensure_indexes(&db).await {
        tracing::warn!(error = %e, "failed to ensure indexes");
    }

    let notifier = Arc::new(SnsGateway::from_settings(&settings).await);

    let state = AppState {
        db: db.clone(),
        settings: settings.clone(),
        notifier: notifier.clone(),
    };

    let shutdown = CancellationToken::new();

    let monitor = alert_monitor::spawn_price_alert_monitor(
        Arc::new(MongoAlertStore::new(db)),
        notifier,
        settings.alert_check_interval,
        shutdown.clone(),
    );

    let app = routes::app(state);

    let ip = settings
        .host
        .parse::<std::net::IpAddr>()
        .expect("HOST must be an IP address");
    let addr = SocketAddr::from((ip, settings.port));
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.expect("bind listener");
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
    {
        tracing::error!(error = %e, "server error");
    }

    shutdown.cancel();
    if let Err(e) = monitor.await {
        tracing::error!(error = %e, "price alert monitor task failed");
    }
}
