use std::net::SocketAddr;
use std::sync::Arc;

use interview_backend::{
    build_router,
    config::{get_config, init_config},
    database::pool::connect_and_migrate,
    middleware::cors::api_cors,
    store::{InMemoryStore, PgStore, Store},
    AppState,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    init_config()?;
    let config = get_config()?;

    let (store, store_kind): (Arc<dyn Store>, &'static str) = match &config.database_url {
        Some(url) => {
            let pool = connect_and_migrate(url).await?;
            info!("Connected to Postgres, migrations applied");
            (Arc::new(PgStore::new(pool)), "postgres")
        }
        None => {
            warn!("DATABASE_URL is not set, using the in-memory store; data is lost on restart");
            (Arc::new(InMemoryStore::new()), "memory")
        }
    };

    if config.gemini_api_key.is_none() {
        warn!("GEMINI_API_KEY is not set, code analysis returns inconclusive verdicts");
    }
    info!(policy = ?config.decision_policy, "Vote decision policy");

    let state = AppState::new(store, store_kind, config)?;
    let app = build_router(state, config.api_rps)
        .layer(api_cors())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
