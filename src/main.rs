//! Waddle Game Server
//!
//! A world server for a penguin-themed virtual world speaking the XT protocol
//! over TCP.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use waddle_server::cache::{DerivedCache, MemoryCache, RedisCache};
use waddle_server::config::ServerConfig;
use waddle_server::game::audit::TracingAuditLog;
use waddle_server::game::item::Catalog;
use waddle_server::game::persistence::{MemoryStore, PgPlayerStore, PlayerStore};
use waddle_server::game::room::RoomRegistry;
use waddle_server::net::handler::ConnectionHandler;
use waddle_server::state::{AppState, Backends};
use waddle_server::VERSION;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let config = ServerConfig::load().await?;

    // Initialize logging
    init_logging(config.log_filter());

    info!("╔══════════════════════════════════════════════╗");
    info!("║          Waddle Game Server v{}           ║", VERSION);
    info!("╚══════════════════════════════════════════════╝");

    if config.config_path.exists() {
        info!(
            "Configuration loaded from: {}",
            config.config_path.display()
        );
    } else {
        warn!(
            "Config file not found at {}, using defaults",
            config.config_path.display()
        );
    }

    let catalog = Catalog::load(&config.catalog_path).await?;

    // Create shutdown channel
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let backends = Backends {
        store: create_store(&config).await?,
        cache: create_cache(&config).await,
        rooms: Arc::new(RoomRegistry::new()),
        audit: Arc::new(TracingAuditLog),
    };

    let state = Arc::new(AppState::new(
        config.clone(),
        catalog,
        backends,
        shutdown_tx.clone(),
    ));
    info!("Application state initialized");

    // Start TCP listener for game connections
    let game_addr: SocketAddr = format!("0.0.0.0:{}", config.game_port).parse()?;
    let game_listener = TcpListener::bind(game_addr).await?;
    info!("Game server listening on: {}", game_addr);

    let game_state = state.clone();
    let mut game_shutdown_rx = shutdown_tx.subscribe();
    let game_handle = tokio::spawn(async move {
        accept_game_connections(game_listener, game_state, &mut game_shutdown_rx).await;
    });

    info!("Server startup complete!");
    info!("{} is ready for connections", config.server_name);

    // Wait for shutdown signal
    wait_for_shutdown(shutdown_tx.clone()).await;

    info!("Shutting down server...");
    let _ = game_handle.await;

    info!(
        sessions = state.session_manager.count(),
        players = state.players.count(),
        "Server shutdown complete. Goodbye!"
    );
    Ok(())
}

/// Initialize the logging/tracing system
fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .init();
}

/// Accept incoming game (TCP) connections
async fn accept_game_connections(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown_rx: &mut broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        info!("New game connection from: {}", addr);
                        let handler = ConnectionHandler::new(state.clone());
                        tokio::spawn(async move {
                            if let Err(e) = handler.handle_tcp(stream, addr).await {
                                warn!("Game connection error from {}: {}", addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept game connection: {}", e);
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Game connection acceptor shutting down");
                break;
            }
        }
    }
}

/// Pick the player store: in-memory in dev mode, PostgreSQL otherwise
async fn create_store(config: &ServerConfig) -> Result<Arc<dyn PlayerStore>> {
    if config.dev_mode {
        warn!("Development mode: players are kept in memory only");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let store = PgPlayerStore::connect(&config.database_url(), &config.database).await?;
    Ok(Arc::new(store))
}

/// Connect the derived cache, falling back to a process-local one
async fn create_cache(config: &ServerConfig) -> Arc<dyn DerivedCache> {
    if config.dev_mode {
        return Arc::new(MemoryCache::new());
    }

    match RedisCache::connect(&config.redis.url).await {
        Ok(cache) => Arc::new(cache),
        Err(e) => {
            warn!(
                "Failed to connect to Redis: {}. Using an in-process cache.",
                e
            );
            Arc::new(MemoryCache::new())
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn wait_for_shutdown(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    // Signal all tasks to shut down
    let _ = shutdown_tx.send(());
}
