//! HTTP boundary for the Telegram User Search bridge (axum).
//!
//! Route semantics, preserved for compatibility with the service's existing
//! callers: input-validation failures use real HTTP error codes (403/400), but
//! completed-yet-failed exchanges (timeout, mismatch, transport trouble) are
//! 200 responses with an `{status:"error"}` envelope. The one deliberate
//! departure: when the Telegram session never came up, `/search` fails fast
//! with 503 instead of attempting a doomed exchange.

use std::sync::Arc;

use axum::{
    extract::{Query as QueryParams, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::info;

use tus_core::{
    config::Config,
    domain::{ExchangeResult, ExtractedRecord, Query},
    engine::CorrelationEngine,
    transport::BotTransport,
};

/// Engine plus transport handle; present only when startup connected.
pub struct Bridge {
    pub transport: Arc<dyn BotTransport>,
    pub engine: Arc<CorrelationEngine>,
}

pub struct AppState {
    pub cfg: Arc<Config>,
    pub bridge: Option<Bridge>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/status", get(status))
        .route("/search", get(search))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until the process is terminated.
pub async fn serve(state: AppState) -> tus_core::Result<()> {
    let addr = state.cfg.bind_addr;
    let app = router(Arc::new(state));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Deserialize)]
struct SearchParams {
    id: Option<String>,
    key: Option<String>,
}

#[derive(Serialize)]
struct SuccessBody {
    status: &'static str,
    phone_number: String,
    country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    country_code: Option<String>,
    telegram_id: Option<String>,
    query_id: String,
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parsed_data: Option<ExtractedRecord>,
}

async fn home() -> Json<serde_json::Value> {
    Json(json!({
        "service": "Telegram User Search API",
        "usage": "GET /search?id=USER_ID&key=API_KEY",
    }))
}

async fn status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let online = state
        .bridge
        .as_ref()
        .is_some_and(|b| b.transport.is_connected());
    Json(json!({
        "status": if online { "online" } else { "offline" },
        "bot": state.cfg.bot_username,
    }))
}

async fn search(
    State(state): State<Arc<AppState>>,
    QueryParams(params): QueryParams<SearchParams>,
) -> Response {
    // Key first, then id: same precedence the service has always had.
    if params.key.as_deref() != Some(state.cfg.api_key.as_str()) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"error": "Invalid or missing API key"})),
        )
            .into_response();
    }

    let Some(query) = params.id.as_deref().and_then(Query::parse) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Invalid user ID"})),
        )
            .into_response();
    };

    let Some(bridge) = &state.bridge else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorBody {
                status: "error",
                message: "telegram session unavailable".to_string(),
                parsed_data: None,
            }),
        )
            .into_response();
    };

    match bridge.engine.exchange(&query).await {
        ExchangeResult::Success { record, query } => Json(SuccessBody {
            status: "success",
            phone_number: record.phone_number.unwrap_or_default(),
            country: record.country,
            country_code: record.country_code,
            telegram_id: record.telegram_id,
            query_id: query.as_str().to_string(),
        })
        .into_response(),
        ExchangeResult::Failure { reason, partial } => Json(ErrorBody {
            status: "error",
            message: reason.message(partial.as_ref()),
            parsed_data: partial,
        })
        .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::Utc;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use tus_core::domain::BotReply;
    use tus_core::engine::ExchangeOptions;

    const MARKER: &str = "User Information Lookup";

    struct FakeTransport {
        reply_text: Option<String>,
        connected: bool,
    }

    #[async_trait]
    impl BotTransport for FakeTransport {
        async fn send_text(&self, _text: &str) -> tus_core::Result<chrono::DateTime<Utc>> {
            Ok(Utc::now())
        }

        async fn recent_messages(&self, _limit: usize) -> tus_core::Result<Vec<BotReply>> {
            Ok(self
                .reply_text
                .iter()
                .map(|text| BotReply {
                    text: text.clone(),
                    received_at: Utc::now(),
                })
                .collect())
        }

        fn is_connected(&self) -> bool {
            self.connected
        }
    }

    fn test_config() -> Config {
        Config {
            api_id: 1,
            api_hash: "hash".to_string(),
            session_string: "session".to_string(),
            bot_username: "lookup_bot".to_string(),
            api_key: "secret".to_string(),
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            trigger_phrase: "Usᴇʀɴᴀᴍᴇ ᴛᴏ ɴᴜᴍ".to_string(),
            reply_marker: MARKER.to_string(),
            settle_delay: Duration::from_millis(0),
            poll_interval: Duration::from_millis(10),
            poll_budget: Duration::from_millis(100),
            fetch_limit: 3,
        }
    }

    fn app(reply_text: Option<String>, connected: bool) -> Router {
        let cfg = Arc::new(test_config());
        let transport: Arc<dyn BotTransport> = Arc::new(FakeTransport {
            reply_text,
            connected,
        });
        let engine = Arc::new(CorrelationEngine::new(
            Arc::clone(&transport),
            ExchangeOptions::from_config(&cfg),
        ));
        router(Arc::new(AppState {
            cfg,
            bridge: Some(Bridge { transport, engine }),
        }))
    }

    fn unready_app() -> Router {
        router(Arc::new(AppState {
            cfg: Arc::new(test_config()),
            bridge: None,
        }))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn lookup_reply(phone: &str) -> String {
        format!("🔍 {MARKER}\n📞 Phone Number: `{phone}`\n├ Country: Testland")
    }

    #[tokio::test]
    async fn home_describes_the_service() {
        let (status, body) = get_json(app(None, true), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["usage"], "GET /search?id=USER_ID&key=API_KEY");
    }

    #[tokio::test]
    async fn status_reports_online_with_live_transport() {
        let (_, body) = get_json(app(None, true), "/status").await;
        assert_eq!(body["status"], "online");
        assert_eq!(body["bot"], "lookup_bot");
    }

    #[tokio::test]
    async fn status_reports_offline_without_bridge() {
        let (_, body) = get_json(unready_app(), "/status").await;
        assert_eq!(body["status"], "offline");
    }

    #[tokio::test]
    async fn search_rejects_wrong_key() {
        let (status, body) = get_json(app(None, true), "/search?id=123&key=wrong").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Invalid or missing API key");
    }

    #[tokio::test]
    async fn search_rejects_missing_key() {
        let (status, _) = get_json(app(None, true), "/search?id=123").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn search_rejects_non_digit_id() {
        let (status, body) = get_json(app(None, true), "/search?id=abc&key=secret").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid user ID");
    }

    #[tokio::test]
    async fn search_fails_fast_when_unready() {
        let (status, body) = get_json(unready_app(), "/search?id=123&key=secret").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn search_success_envelope() {
        let app = app(Some(lookup_reply("15551234567")), true);
        let (status, body) = get_json(app, "/search?id=123&key=secret").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["phone_number"], "15551234567");
        assert_eq!(body["country"], "Testland");
        assert_eq!(body["query_id"], "123");
        // telegram_id was absent from the reply: present as null, not omitted.
        assert!(body["telegram_id"].is_null());
        // country_code is the one field omitted when absent.
        assert!(body.get("country_code").is_none());
    }

    #[tokio::test]
    async fn search_timeout_is_200_with_error_envelope() {
        let app = app(None, true);
        let (status, body) = get_json(app, "/search?id=123&key=secret").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "no data found this number");
    }

    #[tokio::test]
    async fn search_echoed_phone_carries_partial_record() {
        let app = app(Some(lookup_reply("123")), true);
        let (status, body) = get_json(app, "/search?id=123&key=secret").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "error");
        assert_eq!(body["parsed_data"]["phone_number"], "123");
    }
}
