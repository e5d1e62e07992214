use crate::{
    logger::{self, LogTag},
    webserver::state::AppState,
};
use axum::{
    http::{HeaderValue, Method},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

pub mod status;
pub mod ws;

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);

    Router::new()
        .merge(ws::routes())
        .nest("/api", api_routes())
        .layer(cors)
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new().merge(status::routes())
}

/// CORS for the configured dashboard origins; unparsable entries are skipped
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                logger::warning(
                    LogTag::Webserver,
                    &format!("Ignoring invalid CORS origin '{}'", origin),
                );
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PollerConfig, WebserverConfig};
    use crate::poller::PollerStats;
    use crate::reconciler::TokenReconciler;
    use crate::webserver::ws::WsHub;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    fn test_router() -> Router {
        let mut config = WebserverConfig::default();
        config.allowed_origins = vec![
            "http://localhost:3000".to_string(),
            "bad\norigin".to_string(),
        ];
        create_router(Arc::new(AppState::new(
            config,
            PollerConfig::default(),
            WsHub::new(4),
            Arc::new(Mutex::new(TokenReconciler::new())),
            PollerStats::new(),
        )))
    }

    async fn status_from(origin: &str) -> axum::response::Response {
        test_router()
            .oneshot(
                Request::builder()
                    .uri("/api/status")
                    .header(header::ORIGIN, origin)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_cors_allows_configured_origin() {
        let response = status_from("http://localhost:3000").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            Some(&HeaderValue::from_static("http://localhost:3000"))
        );
    }

    #[tokio::test]
    async fn test_cors_ignores_other_origins() {
        let response = status_from("http://evil.example").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }

    #[tokio::test]
    async fn test_status_body_shape() {
        let response = status_from("http://localhost:3000").await;
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let status: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(status["record_count"], 0);
        assert_eq!(status["active_connections"], 0);
        assert_eq!(status["poll_interval_ms"], 2000);
    }
}
