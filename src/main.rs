use lead_scoring_api::app;
use lead_scoring_api::config::Config;
use lead_scoring_api::db::Database;
use lead_scoring_api::store::{LeadStore, PgLeadStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the application.
///
/// Initializes tracing, configuration, the database pool (running
/// migrations), the lead change listener and the scoring client, then
/// serves the HTTP API.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lead_scoring_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize database connection pool
    let db = Database::new(&config.database_url).await?;
    tracing::info!("Database connection pool established, migrations applied");

    let store: Arc<dyn LeadStore> = Arc::new(
        PgLeadStore::connect(db.pool.clone()).await?,
    );

    let state = app::build_state(store, &config);
    tracing::info!("Scoring service: {}", config.scoring_service_url);

    // Configure per-IP rate limiting for the API routes
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(config.rate_limit_per_second)
            .burst_size(config.rate_limit_burst)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limit configuration"))?,
    );

    let api = app::api_routes().layer(GovernorLayer {
        config: governor_conf,
    });

    // Health check bypasses rate limiting
    let router = app::build_router(state, api);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
