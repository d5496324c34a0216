//! Application startup and lifecycle management.

use crate::config::ClassifierConfig;
use crate::handlers;
use crate::services::{get_metrics, Classifier};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    create_ip_rate_limiter, ip_rate_limit_middleware, metrics_middleware, request_id_middleware,
    security_headers_middleware, REQUEST_ID_HEADER,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ClassifierConfig,
    /// `None` when the model or labels failed to load; stays that way until restart.
    pub classifier: Option<Arc<Classifier>>,
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application, loading the model named in the configuration.
    ///
    /// A model that fails to load is logged and leaves the classify endpoint
    /// answering with an error; the server still starts.
    pub async fn build(config: ClassifierConfig) -> Result<Self, AppError> {
        let model_config = config.model.clone();
        let classifier = tokio::task::spawn_blocking(move || Classifier::load(&model_config))
            .await
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("model loader panicked: {}", e)))?;

        let classifier = match classifier {
            Ok(classifier) => Some(classifier),
            Err(e) => {
                tracing::error!(
                    error = %format!("{:#}", e),
                    model_path = %config.model.model_path,
                    labels_path = %config.model.labels_path,
                    "Failed to load model or labels"
                );
                None
            }
        };

        Self::build_with_classifier(config, classifier).await
    }

    /// Build the application around an already constructed classifier.
    pub async fn build_with_classifier(
        config: ClassifierConfig,
        classifier: Option<Classifier>,
    ) -> Result<Self, AppError> {
        let state = AppState {
            config: config.clone(),
            classifier: classifier.map(Arc::new),
        };

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            port,
            model_loaded = state.classifier.is_some(),
            "Classifier service listening"
        );

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve until Ctrl+C or SIGTERM.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let app = build_router(self.state);
        axum::serve(
            self.listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
    }
}

pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    let mut api = Router::new()
        .route("/classify", post(handlers::classify_image))
        .layer(DefaultBodyLimit::max(
            config.upload.max_bytes.saturating_add(MULTIPART_OVERHEAD),
        ));

    if let Some(limiter) = create_ip_rate_limiter(config.rate_limit.per_minute) {
        api = api.layer(from_fn_with_state(limiter, ip_rate_limit_middleware));
    }

    let api = api.layer(cors_layer(&config.cors.frontend_url));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(metrics_endpoint))
        .nest("/api", api)
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .with_state(state)
}

fn cors_layer(frontend_url: &str) -> CorsLayer {
    let origin = if frontend_url == "*" {
        AllowOrigin::any()
    } else {
        match frontend_url.parse::<HeaderValue>() {
            Ok(origin) => AllowOrigin::exact(origin),
            Err(e) => {
                tracing::error!(
                    "Invalid CORS origin '{}': {}. Cross-origin requests will be refused.",
                    frontend_url,
                    e
                );
                AllowOrigin::list(Vec::<HeaderValue>::new())
            }
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
