use clap::Parser;
use comunicazap_server::billing::{BillingProvider, StripeClient};
use comunicazap_server::db::schema;
use comunicazap_server::db::services::{DbInstanceStore, DbSubscriptionStore};
use comunicazap_server::gateway::EvolutionClient;
use comunicazap_server::server::config::ServerConfig;
use comunicazap_server::services::{InstanceService, SubscriptionService};
use comunicazap_server::web::{self, AppState};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging(log_dir: &str) -> WorkerGuard {
    // Log to a file: JSON format, daily rotation
    let (file_writer, guard) = tracing_appender::non_blocking(rolling::daily(log_dir, "server.log"));
    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false) // No ANSI colors in file
        .json(); // Log as JSON

    // Log to stdout: human-readable format
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    // Default to `info,sea_orm=warn` level if RUST_LOG is not set.
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sea_orm=warn,sqlx::query=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    guard
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal.");
        return;
    }
    info!("Shutdown signal received.");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    // --- Server Config Setup ---
    let server_config = Arc::new(ServerConfig::load(args.config.as_deref())?);

    let _log_guard = init_logging(&server_config.log_dir);
    info!("Starting server, version: {}", env!("CARGO_PKG_VERSION"));

    // --- Database Pool Setup ---
    let mut opt = ConnectOptions::new(server_config.database_url.to_owned());
    opt.max_connections(10).sqlx_logging(false);

    let db_pool: DatabaseConnection = match Database::connect(opt).await {
        Ok(db) => db,
        Err(e) => {
            error!(error = %e, "Failed to create database connection.");
            return Err(e.into());
        }
    };
    schema::ensure_schema(&db_pool).await?;

    // --- Services ---
    let gateway = Arc::new(EvolutionClient::new(&server_config.evolution_api_url));
    let instance_service = Arc::new(InstanceService::new(
        Arc::new(DbInstanceStore::new(db_pool.clone())),
        gateway,
        server_config.evolution_api_key.clone(),
    ));

    let billing: Option<Arc<dyn BillingProvider>> = match server_config.stripe_secret_key.as_deref() {
        Some(key) => Some(Arc::new(StripeClient::with_api_url(&server_config.stripe_api_url, key))),
        None => {
            warn!("STRIPE_SECRET_KEY is not set; subscription checks will fail.");
            None
        }
    };
    let subscription_service = Arc::new(SubscriptionService::new(
        Arc::new(DbSubscriptionStore::new(db_pool.clone())),
        billing,
        server_config.trial_days,
    ));

    // --- Reconciliation Sweep Task ---
    if server_config.reconcile_interval_secs > 0 {
        let service = instance_service.clone();
        let period = server_config.reconcile_interval_secs;
        tokio::spawn(async move {
            service.run_periodic_reconciliation(period).await;
        });
    }

    // --- Axum HTTP Server Setup ---
    let app = web::create_axum_router(AppState {
        config: server_config.clone(),
        instance_service,
        subscription_service,
    });

    let addr: SocketAddr = server_config.listen_addr.parse()?;
    let socket = if addr.is_ipv4() {
        tokio::net::TcpSocket::new_v4()?
    } else {
        tokio::net::TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.set_keepalive(true)?;
    socket.bind(addr)?;
    let listener = socket.listen(1024)?;
    info!(address = %addr, "HTTP server listening with TCP Keepalive");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(Box::new)?;

    Ok(())
}
