//! HTTP route definitions

use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use tracing::info;

use crate::app::AppState;
use crate::dialogue::CharacterBio;
use crate::game::roster;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;
use crate::ws::protocol::CharacterInfo;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - support multiple origins (comma-separated in CLIENT_ORIGIN)
    let allowed_origins: Vec<header::HeaderValue> = state
        .config
        .client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .route("/roster", get(roster_handler))
        .route("/roster/:index/bio", get(bio_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(cors),
        )
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_sessions: usize,
    dialogue_enabled: bool,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_sessions: state.match_registry.active_matches(),
        dialogue_enabled: state.config.gemini_api_key.is_some(),
    })
}

// ============================================================================
// Roster endpoints
// ============================================================================

async fn roster_handler() -> Json<Vec<CharacterInfo>> {
    Json(CharacterInfo::roster())
}

async fn bio_handler(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<CharacterBio>, AppError> {
    let character = roster::character(index)
        .ok_or_else(|| AppError::NotFound(format!("No character at index {}", index)))?;

    if let Some(bio) = state.cached_bio(index) {
        return Ok(Json(bio));
    }

    let bio = state
        .dialogue
        .generate_bio(character.name, character.color)
        .await;

    // Fallback bios are not cached so a later request can still get a real one
    if bio != CharacterBio::fallback() {
        info!(character = character.name, "Cached generated bio");
        state.cache_bio(index, bio.clone());
    }

    Ok(Json(bio))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dialogue::{DialogueEvent, DialogueGenerator};
    use crate::game::roster::ROSTER;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tower::ServiceExt;

    /// Counts bio requests so caching is observable
    #[derive(Default)]
    struct CountingBios {
        calls: AtomicUsize,
    }

    impl DialogueGenerator for CountingBios {
        fn generate<'a>(
            &'a self,
            _: &'a str,
            _: &'a str,
            _: DialogueEvent,
        ) -> BoxFuture<'a, String> {
            async { "line".to_string() }.boxed()
        }

        fn generate_bio<'a>(&'a self, name: &'a str, _: &'a str) -> BoxFuture<'a, CharacterBio> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            async move {
                CharacterBio {
                    bio: format!("{name} was poured, not born."),
                    catchphrase: "Jiggle jiggle!".to_string(),
                }
            }
            .boxed()
        }
    }

    fn test_config() -> Config {
        Config {
            server_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "debug".to_string(),
            client_origin: "http://localhost:5173".to_string(),
            frame_rate: 60,
            snapshot_every: 1,
            hit_dialogue_interval: 180,
            gemini_api_key: None,
            dialogue_api_url: "http://127.0.0.1:9".to_string(),
            dialogue_model: "test-model".to_string(),
            dialogue_timeout: Duration::from_millis(100),
        }
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_reports_sessions() {
        let state = AppState::with_dialogue(test_config(), Arc::new(CountingBios::default()));
        let (status, body) = get_json(build_router(state), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["active_sessions"], 0);
        assert_eq!(body["dialogue_enabled"], false);
    }

    #[tokio::test]
    async fn roster_lists_every_character() {
        let state = AppState::with_dialogue(test_config(), Arc::new(CountingBios::default()));
        let (status, body) = get_json(build_router(state), "/roster").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().map(Vec::len), Some(ROSTER.len()));
        assert_eq!(body[0]["name"], "Bean-o");
    }

    #[tokio::test]
    async fn bio_is_generated_once_then_cached() {
        let bios = Arc::new(CountingBios::default());
        let state = AppState::with_dialogue(test_config(), bios.clone());
        let router = build_router(state);

        let (status, body) = get_json(router.clone(), "/roster/4/bio").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["bio"], "Pudding was poured, not born.");

        get_json(router, "/roster/4/bio").await;
        assert_eq!(bios.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_bio_index_is_not_found() {
        let state = AppState::with_dialogue(test_config(), Arc::new(CountingBios::default()));
        let (status, body) = get_json(build_router(state), "/roster/99/bio").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("99"));
    }
}
