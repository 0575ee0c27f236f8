//! API server initialization

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::http::{Method, header};
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::routes::calls::{self, CallsApiState};
use super::routes::{health, pricing};
use crate::core::CoreApp;
use crate::data::CallRepository;

pub struct ApiServer {
    app: CoreApp,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        Self { app }
    }

    /// Returns CoreApp for graceful shutdown
    pub async fn start(self) -> Result<CoreApp> {
        let Self { app } = self;

        // Clone shutdown before moving app
        let shutdown = app.shutdown.clone();

        let host = app.config.server.host.clone();
        let port = app.config.server.port;
        let addr = SocketAddr::new(host.parse()?, port);

        let router = build_router(&app);

        let listener = TcpListener::bind(addr).await?;
        tracing::debug!(%addr, "HTTP server listening");
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown.wait())
        .await?;

        Ok(app)
    }
}

/// Full application router
pub fn build_router(app: &CoreApp) -> Router {
    let repository: Arc<dyn CallRepository> = app.database.clone();
    let calls_routes = calls::routes(
        CallsApiState {
            pipeline: app.pipeline.clone(),
            repository,
            traces: app.config.traces.clone(),
        },
        app.config.ingest.max_body_bytes,
    );

    Router::new()
        .route("/api/v1/health", get(health::health))
        .nest("/api/v1/calls", calls_routes)
        .nest("/api/v1/pricing", pricing::routes(app.pricing.clone()))
        .layer(CompressionLayer::new())
        .layer(cors())
        .layer(TraceLayer::new_for_http())
}

/// Open CORS: no credentials are ever accepted
fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::CONTENT_ENCODING,
            header::ACCEPT,
            header::ORIGIN,
        ])
}
