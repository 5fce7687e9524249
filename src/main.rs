use roomchat::{server, ServerConfig};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roomchat=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(2);
        }
    };

    info!(
        bind_addr = %config.bind_addr,
        history_limit = config.history_limit,
        "Starting roomchat server"
    );

    let listener = match TcpListener::bind(config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(bind_addr = %config.bind_addr, error = %e, "Failed to bind");
            std::process::exit(1);
        }
    };

    let state = server::in_memory_state(&config);
    if let Err(e) = server::serve(listener, state).await {
        error!(error = %e, "Server stopped");
        std::process::exit(1);
    }
}
