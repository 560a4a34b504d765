// ./api/src/main.rs
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use application::{PostRepository, PostService, StatsService};
use infrastructure::InMemoryPostRepository;

mod config;
mod error;
mod routes;

use config::ServerConfig;
use routes::{AppState, create_router};

// Application entry point
#[tokio::main]
async fn main() {
    // --- Logger Initialization ---
    let filter: EnvFilter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
    info!("Logger initialized successfully.");

    let config = ServerConfig::from_env();

    // --- Dependency Injection ---
    // 1. Create the store, seeded unless disabled
    let repository: Arc<dyn PostRepository> = if config.seed_posts {
        Arc::new(InMemoryPostRepository::seeded())
    } else {
        Arc::new(InMemoryPostRepository::new())
    };
    info!(seeded = config.seed_posts, "In-memory post store initialized.");

    // 2. Create application services, injecting the store
    let app_state = AppState {
        post_service: Arc::new(PostService::new(repository.clone())),
        stats_service: Arc::new(StatsService::new(repository)),
    };
    info!("Application services initialized.");

    // --- API Router Definition ---
    let app = create_router(app_state);
    info!("API routes configured.");

    // --- Server Startup ---
    let addr = config.socket_addr();
    info!("Server starting on {}", addr);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => {
            info!("Server listening on {}", addr);
            listener
        }
        Err(e) => {
            error!("Failed to bind to address {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app.into_make_service()).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
