// src/lib.rs
use std::sync::Arc;

pub mod cache;
pub mod commands;
pub mod config;
pub mod drivers;
pub mod inventory;
pub mod models;
pub mod remediation;
pub mod resolver;
pub mod routes;
pub mod snapshot;
pub mod threat;
pub mod versions;

// Re-export Config and AppState so integration tests can build routers easily.
pub use config::Config;
use reqwest::Client;

use resolver::ExecutableResolver;
use snapshot::SnapshotStore;
use threat::{ReputationClient, ThreatClassifier};
use versions::{PackageIndexFeed, VersionService, WingetFeed};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub client: Client,
    pub resolver: Arc<ExecutableResolver>,
    pub protection: Arc<ThreatClassifier>,
    pub versions: Arc<VersionService>,
    pub snapshots: Arc<SnapshotStore>,
}

impl AppState {
    /// Wire every service up once at startup; handlers only borrow.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let client = Client::builder().build()?;

        let reputation = ReputationClient::new(
            client.clone(),
            config.reputation_api_base.clone(),
            config.reputation_key_env.clone(),
            config.reputation_key_file.clone(),
        );

        let table = VersionService::load_table(&config.latest_versions_path());
        let versions = VersionService::new(
            table,
            Arc::new(WingetFeed),
            Arc::new(PackageIndexFeed::new(
                client.clone(),
                config.package_index_base.clone(),
            )),
        );

        let snapshots = SnapshotStore::new(config.snapshot_path.clone());

        Ok(Self {
            config,
            client,
            resolver: Arc::new(ExecutableResolver::new()),
            protection: Arc::new(ThreatClassifier::new(reputation)),
            versions: Arc::new(versions),
            snapshots: Arc::new(snapshots),
        })
    }
}

/// Router over the full HTTP surface; extracted from `run_server` so tests
/// can drive it with `tower::ServiceExt::oneshot`.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use axum::http::{Method, header};
    use axum::routing::{get, post};
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health_check))
        .route("/scan", get(routes::scan::scan_system))
        .route(
            "/generate-offline-package",
            get(routes::scan::generate_offline_package),
        )
        .route(
            "/generate-remediation-script",
            post(routes::scan::generate_remediation_script),
        )
        .route("/protection/scan", post(routes::protection::protection_scan))
        .route(
            "/protection/debug-key",
            get(routes::protection::debug_key_state),
        )
        .route("/check-versions", post(routes::versions::check_versions))
        .route("/drivers", get(routes::drivers::list_drivers))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub mod server {
    use dotenvy::dotenv;
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    pub async fn run_server(port_override: Option<u16>) -> anyhow::Result<()> {
        dotenv().ok();
        let config = crate::Config::from_env()?;
        let port = port_override.unwrap_or(config.port);

        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "revamp=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer())
            .init();

        let state = crate::AppState::from_config(config)?;
        let app = crate::build_router(state);

        let listener = tokio::net::TcpListener::bind(&format!("0.0.0.0:{}", port)).await?;
        tracing::info!("Server starting on port {}", port);

        axum::serve(listener, app).await?;
        Ok(())
    }
}
