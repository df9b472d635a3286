//! Axum router configuration with middleware.
//!
//! Gateway routes are under `/api/v1/ai/`.
//! Middleware: CORS (restricted to `FRONTEND_URL` when set), tracing.

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(allowed_origin(state.config.server.frontend_url.as_deref()))
        .allow_methods(Any)
        .allow_headers(Any);

    let ai_routes = Router::new()
        .route("/process", post(handlers::ai::process))
        .route("/models", get(handlers::ai::models))
        .route("/costs", get(handlers::ai::costs))
        .route("/health", get(handlers::ai::health));

    Router::new()
        .nest("/api/v1/ai", ai_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS origin policy: the configured frontend, or any origin.
fn allowed_origin(frontend_url: Option<&str>) -> AllowOrigin {
    match frontend_url.map(|url| HeaderValue::from_str(url.trim_end_matches('/'))) {
        Some(Ok(origin)) => AllowOrigin::exact(origin),
        Some(Err(_)) => {
            tracing::warn!("Ignoring invalid FRONTEND_URL, allowing any origin");
            AllowOrigin::any()
        }
        None => AllowOrigin::any(),
    }
}

/// GET /health - Simple liveness endpoint.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    use owpro_types::config::GatewayConfig;

    /// Serve the full router on an ephemeral port and return its base URL.
    async fn serve(frontend_url: Option<&str>) -> String {
        let mut config = GatewayConfig::default();
        config.server.frontend_url = frontend_url.map(str::to_string);
        let state = AppState::from_config(config, None, std::env::temp_dir()).unwrap();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, build_router(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn preflight(base: &str, origin: &str) -> Option<String> {
        let response = reqwest::Client::new()
            .request(reqwest::Method::OPTIONS, format!("{base}/api/v1/ai/process"))
            .header("origin", origin)
            .header("access-control-request-method", "POST")
            .send()
            .await
            .unwrap();
        response
            .headers()
            .get("access-control-allow-origin")
            .map(|v| v.to_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin_by_default() {
        let base = serve(None).await;
        let allowed = preflight(&base, "http://elsewhere.test").await;
        assert_eq!(allowed.as_deref(), Some("*"));
    }

    #[tokio::test]
    async fn test_cors_restricted_to_frontend_url() {
        let base = serve(Some("http://localhost:3000/")).await;

        let allowed = preflight(&base, "http://localhost:3000").await;
        assert_eq!(allowed.as_deref(), Some("http://localhost:3000"));

        assert!(preflight(&base, "http://evil.test").await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_frontend_url_allows_any_origin() {
        let base = serve(Some("bad\norigin")).await;
        let allowed = preflight(&base, "http://elsewhere.test").await;
        assert_eq!(allowed.as_deref(), Some("*"));
    }

    #[tokio::test]
    async fn test_health_check_body() {
        let axum::Json(body) = health_check().await;
        assert_eq!(body["status"], "ok");
    }
}
