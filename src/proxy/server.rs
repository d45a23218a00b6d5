// Gateway Server - Route assembly, middleware stack, and server lifecycle

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{oneshot, RwLock};
use tracing::{debug, error, info, warn};

use axum::{
    extract::{DefaultBodyLimit, State},
    response::{IntoResponse, Json, Response},
    routing::{any, get},
    Router,
};

use crate::models::GatewayConfig;
use crate::proxy::error::UpstreamError;
use crate::proxy::handlers::AppState;
use crate::proxy::middleware::{cors_layer, monitor_middleware};
use crate::proxy::upstream::UpstreamClient;

pub const GEMINI_ROUTE: &str = "/api/gemini";

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to set up upstream client: {0}")]
    Upstream(#[from] UpstreamError),
}

// ============================================================================
// Health check handler
// ============================================================================

async fn health_check_handler(State(state): State<AppState>) -> Response {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "credential_configured": state.has_credential(),
    }))
    .into_response()
}

// ============================================================================
// Route builders
// ============================================================================

/// Gateway routes. The relay route takes every method so that non-POST
/// requests get the JSON 405 body instead of axum's empty one.
pub fn gateway_routes(state: AppState) -> Router {
    use crate::proxy::handlers;

    Router::new()
        .route("/health", get(health_check_handler))
        .route("/healthz", get(health_check_handler))
        .route(GEMINI_ROUTE, any(handlers::gemini::handle_generate))
        .layer(axum::middleware::from_fn(monitor_middleware))
        .with_state(state)
}

/// Full application: routes, CORS, body limit, optional static frontend.
pub fn build_app(state: AppState, config: &GatewayConfig) -> Router {
    let app = gateway_routes(state)
        .layer(cors_layer())
        .layer(DefaultBodyLimit::max(config.max_body_size));

    // Serve the frontend build with SPA fallback when it is present
    let dist_path = &config.dist_path;
    if std::path::Path::new(dist_path).is_dir() {
        info!("Serving static assets from: {}", dist_path);
        app.fallback_service(
            tower_http::services::ServeDir::new(dist_path).fallback(
                tower_http::services::ServeFile::new(format!("{}/index.html", dist_path)),
            ),
        )
    } else {
        app
    }
}

// ============================================================================
// GatewayServer - Server lifecycle management
// ============================================================================

#[derive(Clone)]
pub struct GatewayServer {
    shutdown_tx: Arc<tokio::sync::Mutex<Option<oneshot::Sender<()>>>>,
    local_addr: SocketAddr,
    pub is_running: Arc<RwLock<bool>>,
}

impl GatewayServer {
    /// Bind and start serving. Port 0 picks a free port; see `local_addr`.
    pub async fn start(
        config: &GatewayConfig,
    ) -> Result<(Self, tokio::task::JoinHandle<()>), ServerError> {
        let upstream = Arc::new(UpstreamClient::new(&config.upstream)?);

        if config.credential.is_none() {
            warn!("GEMINI_API_KEY is not set; /api/gemini will answer 500 until it is");
        }
        info!(
            "Upstream endpoint: {} (credential via {:?})",
            upstream.endpoint(),
            config.upstream.credential_mode
        );

        let state = AppState::new(upstream, config.credential.clone());
        let app = build_app(state, config);

        let addr = config.bind_address();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;

        info!("Backend server running on http://{}", local_addr);

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let is_running = Arc::new(RwLock::new(true));

        let server_instance = Self {
            shutdown_tx: Arc::new(tokio::sync::Mutex::new(Some(shutdown_tx))),
            local_addr,
            is_running: is_running.clone(),
        };

        let handle = tokio::spawn(async move {
            use hyper::server::conn::http1;
            use hyper_util::rt::TokioIo;
            use hyper_util::service::TowerToHyperService;

            let app_service = app.into_service();

            loop {
                tokio::select! {
                    res = listener.accept() => {
                        match res {
                            Ok((stream, remote_addr)) => {
                                let io = TokioIo::new(stream);

                                use tower::ServiceExt;
                                use hyper::body::Incoming;
                                let svc = app_service.clone().map_request(
                                    move |mut req: axum::http::Request<Incoming>| {
                                        req.extensions_mut().insert(
                                            axum::extract::ConnectInfo(remote_addr),
                                        );
                                        req
                                    },
                                );

                                let hyper_svc = TowerToHyperService::new(svc);

                                tokio::task::spawn(async move {
                                    if let Err(err) = http1::Builder::new()
                                        .serve_connection(io, hyper_svc)
                                        .await
                                    {
                                        debug!("Connection ended: {:?}", err);
                                    }
                                });
                            }
                            Err(e) => {
                                error!("Accept connection failed: {:?}", e);
                            }
                        }
                    }
                    _ = &mut shutdown_rx => {
                        info!("Gateway server shutting down");
                        break;
                    }
                }
            }

            *is_running.write().await = false;
        });

        Ok((server_instance, handle))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections. In-flight requests finish on their own tasks.
    pub async fn stop(&self) {
        let mut lock = self.shutdown_tx.lock().await;
        if let Some(tx) = lock.take() {
            let _ = tx.send(());
            info!("Gateway server stop signal sent");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
