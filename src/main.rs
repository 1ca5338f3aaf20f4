use std::sync::Arc;

use anyhow::Context;
use cert_courier::config::AppConfig;
use cert_courier::fulfillment::{Fulfillment, SmtpMailer};
use cert_courier::server::{AppState, routes};
use cert_courier::sheet::{GoogleSheetsStore, SubmissionStore};
use cert_courier::watcher::{Watcher, WatcherState, spawn_watcher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // Fail fast on missing configuration: the watch loop never starts without it.
    let config = AppConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Configuration error — not starting");
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    eprintln!("📜 Cert Courier v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Sheet: {}", config.sheet_id);
    eprintln!("   Poll interval: {}s", config.poll_interval.as_secs());
    eprintln!("   SMTP: {}:{}", config.smtp.host, config.smtp.port);
    eprintln!("   Sender: {}", config.smtp.from_address);
    eprintln!("   Status page: http://0.0.0.0:{}/status", config.port);
    eprintln!("   Health: http://0.0.0.0:{}/health\n", config.port);

    let AppConfig {
        sheet_id,
        credentials,
        smtp,
        port,
        poll_interval,
    } = config;

    let store: Arc<dyn SubmissionStore> =
        Arc::new(GoogleSheetsStore::new(sheet_id, credentials));
    let mailer: Arc<dyn Fulfillment> = Arc::new(SmtpMailer::new(smtp));
    let watcher_state = Arc::new(WatcherState::new());

    let watcher = Watcher::new(
        Arc::clone(&store),
        mailer,
        Arc::clone(&watcher_state),
        poll_interval,
    );
    let (_watch_handle, _shutdown) = spawn_watcher(watcher);

    let app = routes(AppState {
        store,
        watcher: watcher_state,
    });
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .with_context(|| format!("failed to bind port {port}"))?;
    tracing::info!(port, "HTTP server started");
    axum::serve(listener, app).await?;

    Ok(())
}
