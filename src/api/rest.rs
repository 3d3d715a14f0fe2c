// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
//   GET  /        fixed liveness string
//   GET  /health  JSON status with the number of active Watching loops
//   POST /auto    buy `ca`, watch until TP / SL / timeout, answer once done
//
// `/auto` answers synchronously after the whole cycle. The flow itself runs
// on its own task while the handler holds a drop guard on the flow's token:
// if the client disconnects, the handler future is dropped, the guard cancels
// the token, and the task still reports the open position before exiting.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, Instrument, Span};

use crate::app_state::AppState;
use crate::error::TradeError;
use crate::types::AutoTradeRequest;

// =============================================================================
// Router construction
// =============================================================================

/// Build the router with CORS + request tracing and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(liveness))
        .route("/health", get(health))
        .route("/auto", post(auto_trade))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Liveness / health
// =============================================================================

async fn liveness() -> &'static str {
    "OK"
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    active_monitors: u64,
    started_at: String,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        active_monitors: state.trader.active_monitors(),
        started_at: state.started_at.to_rfc3339(),
        server_time: chrono::Utc::now().timestamp_millis(),
    })
}

// =============================================================================
// Auto trade
// =============================================================================

async fn auto_trade(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AutoTradeRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return error_response(&TradeError::Validation(rejection.body_text()));
        }
    };

    let cancel = state.request_token();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let flow = {
        let state = state.clone();
        tokio::spawn(
            async move { state.trader.execute(&request, cancel).await }
                .instrument(Span::current()),
        )
    };

    match flow.await {
        Ok(Ok(outcome)) => Json(serde_json::json!({
            "ok": true,
            "outcome": outcome.reason,
            "entry": outcome.entry.to_string(),
            "exit_quote": outcome.exit_quote.map(|q| q.to_string()),
        }))
        .into_response(),
        Ok(Err(e)) => error_response(&e),
        Err(join_err) => {
            error!(error = %join_err, "auto trade task aborted");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "ok": false,
                    "error": "auto trade task aborted",
                    "kind": "internal",
                })),
            )
                .into_response()
        }
    }
}

fn error_response(err: &TradeError) -> Response {
    let status = match err {
        TradeError::Validation(_) => StatusCode::BAD_REQUEST,
        e if e.is_cancellation() => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = serde_json::json!({
        "ok": false,
        "error": err.to_string(),
        "kind": err.kind(),
    });
    (status, Json(body)).into_response()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BotConfig;
    use crate::exchange::mock::{MockConnector, MockExchange};
    use crate::notifier::RecordingNotifier;
    use axum::body::Body;
    use axum::http::Request;
    use std::time::Duration;
    use tower::ServiceExt;

    const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
    const CA: &str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";

    fn app(var: &str, key: &str, exchange: MockExchange) -> (Arc<AppState>, Arc<MockConnector>) {
        let (state, connector, _) = app_with_notifier(var, key, exchange);
        (state, connector)
    }

    fn app_with_notifier(
        var: &str,
        key: &str,
        exchange: MockExchange,
    ) -> (Arc<AppState>, Arc<MockConnector>, Arc<RecordingNotifier>) {
        std::env::set_var(var, key);
        let config = BotConfig {
            credential_env: var.to_string(),
            ..BotConfig::default()
        };
        let connector = Arc::new(MockConnector::new(exchange));
        let notifier = Arc::new(RecordingNotifier::new());
        let state = AppState::new(&config, connector.clone(), notifier.clone()).unwrap();
        (Arc::new(state), connector, notifier)
    }

    async fn send(state: Arc<AppState>, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let resp = router(state).oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    fn post_auto(body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/auto")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn liveness_returns_ok() {
        let (state, _) = app("AUTOTRADER_API_KEY_LIVENESS", KEY, MockExchange::default());
        let resp = router(state)
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"OK");
    }

    #[tokio::test]
    async fn health_reports_idle() {
        let (state, _) = app("AUTOTRADER_API_KEY_HEALTH", KEY, MockExchange::default());
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(state, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["active_monitors"], 0);
    }

    #[tokio::test(start_paused = true)]
    async fn auto_take_profit_round() {
        let (state, connector) = app(
            "AUTOTRADER_API_KEY_TP",
            KEY,
            MockExchange::with_quotes([Ok(1_000_000), Ok(1_250_000)]),
        );
        let (status, body) = send(
            state,
            post_auto(format!(r#"{{ "ca": "{CA}", "buyUsd": 1, "tp": 25, "sl": -20 }}"#)),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["outcome"], "take_profit");
        assert_eq!(body["entry"], "1000000");
        assert_eq!(body["exit_quote"], "1250000");
        assert_eq!(connector.exchange.sell_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn auto_timeout_is_still_ok() {
        let (state, connector) = app(
            "AUTOTRADER_API_KEY_TIMEOUT",
            KEY,
            MockExchange::with_quotes([Ok(1_000_000)]),
        );
        let (status, body) = send(state, post_auto(format!(r#"{{ "ca": "{CA}" }}"#))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["outcome"], "timed_out");
        assert!(body["exit_quote"].is_null());
        assert_eq!(connector.exchange.sell_count(), 0);
    }

    #[tokio::test]
    async fn auto_malformed_key_is_rejected() {
        let (state, connector) = app(
            "AUTOTRADER_API_KEY_MALFORMED",
            "0xdeadbeef",
            MockExchange::with_quotes([Ok(1_000_000)]),
        );
        let (status, body) = send(state, post_auto(format!(r#"{{ "ca": "{CA}" }}"#))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
        assert_eq!(body["kind"], "validation");
        assert_eq!(body["error"], "PRIVATE_KEY invalid format");
        assert_eq!(connector.exchange.quote_count(), 0);
        assert_eq!(connector.exchange.buy_count(), 0);
        assert_eq!(connector.exchange.sell_count(), 0);
    }

    #[tokio::test]
    async fn auto_bad_json_is_rejected() {
        let (state, connector) = app("AUTOTRADER_API_KEY_BAD_JSON", KEY, MockExchange::default());
        let (status, body) = send(state, post_auto("{ not json".to_string())).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
        assert_eq!(body["kind"], "validation");
        assert_eq!(connector.connect_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn auto_quote_failure_reports_open_position() {
        let (state, connector) = app(
            "AUTOTRADER_API_KEY_QUOTE_FAIL",
            KEY,
            MockExchange::with_quotes([Ok(1_000_000), Err("upstream 502")]),
        );
        let (status, body) = send(state, post_auto(format!(r#"{{ "ca": "{CA}" }}"#))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["ok"], false);
        assert_eq!(body["kind"], "position_open");
        assert!(body["error"].as_str().unwrap().contains("upstream 502"));
        assert_eq!(connector.exchange.sell_count(), 0);
    }

    #[tokio::test]
    async fn auto_after_shutdown_is_cancelled() {
        let (state, connector) = app(
            "AUTOTRADER_API_KEY_SHUTDOWN",
            KEY,
            MockExchange::with_quotes([Ok(1_000_000)]),
        );
        state.shutdown.cancel();
        let (status, body) = send(state, post_auto(format!(r#"{{ "ca": "{CA}" }}"#))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["kind"], "cancelled");
        assert_eq!(connector.exchange.buy_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_while_watching_reports_open_position() {
        let (state, connector) = app(
            "AUTOTRADER_API_KEY_SHUTDOWN_WATCHING",
            KEY,
            MockExchange::with_quotes([Ok(1_000_000)]),
        );
        let request = tokio::spawn(send(
            state.clone(),
            post_auto(format!(r#"{{ "ca": "{CA}" }}"#)),
        ));
        tokio::time::sleep(Duration::from_secs(20)).await;
        state.shutdown.cancel();

        let (status, body) = request.await.unwrap();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["ok"], false);
        assert_eq!(body["kind"], "position_open");
        assert_eq!(connector.exchange.buy_count(), 1);
        assert_eq!(connector.exchange.sell_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn client_disconnect_while_watching_is_announced() {
        let (state, connector, notifier) = app_with_notifier(
            "AUTOTRADER_API_KEY_DISCONNECT",
            KEY,
            MockExchange::with_quotes([Ok(1_000_000)]),
        );

        // Dropping the response future is what axum does when the client goes away.
        let req = post_auto(format!(r#"{{ "ca": "{CA}" }}"#));
        let dropped = tokio::time::timeout(Duration::from_secs(20), router(state.clone()).oneshot(req)).await;
        assert!(dropped.is_err());
        assert_eq!(connector.exchange.buy_count(), 1);

        for _ in 0..50 {
            if state.trader.active_monitors() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let messages = notifier.messages();
        let last = messages.last().unwrap();
        assert!(last.starts_with("❌ ERROR"), "got {messages:?}");
        assert!(last.contains("left open"));
        assert_eq!(connector.exchange.sell_count(), 0);
        assert_eq!(state.trader.active_monitors(), 0);
    }
}
