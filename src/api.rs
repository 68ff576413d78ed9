use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use error_stack::Report;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::ReportError;
use crate::render::{render_report, render_snapshot};
use crate::report::{ReportBuilder, validate_coins};

pub struct ApiState {
    builder: ReportBuilder,
    default_coins: Vec<String>,
}

impl ApiState {
    /// The default coin list is normalized once here, the same way request
    /// lists are.
    pub fn new(
        builder: ReportBuilder,
        default_coins: &[String],
    ) -> Result<Self, Report<ReportError>> {
        Ok(Self {
            builder,
            default_coins: validate_coins(default_coins)?,
        })
    }
}

/// Build the prompt API router.
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/prompt", get(default_prompt))
        .route("/api/prompt/custom", post(custom_prompt))
        .route("/api/coin/:symbol", get(coin_prompt))
        .with_state(state)
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

fn error_response(status: StatusCode, error: &'static str, message: String) -> Response {
    (status, Json(ErrorBody { error, message })).into_response()
}

fn text_response(body: String) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}

async fn index() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "message": "coin-prompt API is running",
        "endpoints": {
            "/api/prompt": "Generate full prompt for default coins",
            "/api/prompt/custom": "Generate prompt for custom coins (POST with JSON body: {\"coins\": [\"BTC\", \"ETH\"]})",
            "/api/coin/:symbol": "Get data for a single coin",
        }
    }))
}

async fn prompt_response(state: &ApiState, coins: &[String]) -> Response {
    match state.builder.build_report(coins).await {
        Ok(snapshots) => text_response(render_report(
            &snapshots,
            state.builder.settings().intraday_timeframe,
        )),
        Err(report) => {
            error!(error = ?report, "prompt generation failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to generate prompt",
                report.current_context().to_string(),
            )
        }
    }
}

async fn default_prompt(State(state): State<Arc<ApiState>>) -> Response {
    prompt_response(&state, &state.default_coins).await
}

#[derive(Deserialize)]
struct CustomPromptRequest {
    #[serde(default)]
    coins: Vec<String>,
}

async fn custom_prompt(
    State(state): State<Arc<ApiState>>,
    body: Result<Json<CustomPromptRequest>, JsonRejection>,
) -> Response {
    let requested = body.map(|Json(req)| req.coins).unwrap_or_default();
    match validate_coins(&requested) {
        Ok(coins) => {
            info!(coins = ?coins, "custom prompt requested");
            prompt_response(&state, &coins).await
        }
        Err(_) => error_response(
            StatusCode::BAD_REQUEST,
            "Invalid request",
            "Please provide a \"coins\" array in the request body".into(),
        ),
    }
}

async fn coin_prompt(
    State(state): State<Arc<ApiState>>,
    Path(symbol): Path<String>,
) -> Response {
    let Ok(coins) = validate_coins(&[symbol]) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Invalid request",
            "Please provide a coin symbol".into(),
        );
    };
    let coin = &coins[0];
    match state.builder.fetch_snapshot(coin).await {
        Some(snapshot) => text_response(render_snapshot(&snapshot)),
        None => error_response(
            StatusCode::NOT_FOUND,
            "Coin not found",
            format!("Unable to fetch data for {coin}"),
        ),
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::exchange::fixture::{FixtureMarket, FixtureMarketData};
    use crate::report::ReportSettings;

    fn app() -> Router {
        let source = FixtureMarketData::new()
            .with_market("BTCUSDT", FixtureMarket::complete(100))
            .with_market("ETHUSDT", FixtureMarket::complete(100));
        let builder = ReportBuilder::new(Arc::new(source), ReportSettings::default());
        let default_coins = vec!["btc".into(), "SOL".into(), " eth".into()];
        router(Arc::new(ApiState::new(builder, &default_coins).unwrap()))
    }

    async fn send(request: Request<Body>) -> (StatusCode, String) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    #[tokio::test]
    async fn index_describes_endpoints() {
        let (status, body) = send(get("/")).await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert!(json["endpoints"]["/api/prompt"].is_string());
    }

    #[tokio::test]
    async fn default_prompt_normalizes_coins_and_skips_failures() {
        let (status, body) = send(get("/api/prompt")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with("ALL OF THE PRICE OR SIGNAL DATA BELOW IS ORDERED"));
        let btc = body.find("ALL BTC DATA").unwrap();
        let eth = body.find("ALL ETH DATA").unwrap();
        assert!(btc < eth);
        assert!(!body.contains("ALL SOL DATA"));
    }

    #[tokio::test]
    async fn custom_prompt_uses_requested_coins() {
        let (status, body) = send(post_json("/api/prompt/custom", r#"{"coins": ["eth"]}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("ALL ETH DATA"));
        assert!(!body.contains("ALL BTC DATA"));
    }

    #[tokio::test]
    async fn custom_prompt_rejects_missing_or_empty_coins() {
        for body in [r#"{"coins": []}"#, r#"{}"#, r#"{"coins": "BTC"}"#, "not json"] {
            let (status, response) = send(post_json("/api/prompt/custom", body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
            let json: serde_json::Value = serde_json::from_str(&response).unwrap();
            assert_eq!(json["error"], "Invalid request");
        }
    }

    #[tokio::test]
    async fn coin_prompt_uppercases_symbol() {
        let (status, body) = send(get("/api/coin/btc")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with("ALL BTC DATA\n"));
    }

    #[tokio::test]
    async fn blank_coin_symbol_is_rejected() {
        let (status, body) = send(get("/api/coin/%20")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["error"], "Invalid request");
    }

    #[test]
    fn state_rejects_empty_default_coins() {
        let builder = ReportBuilder::new(
            Arc::new(FixtureMarketData::new()),
            ReportSettings::default(),
        );
        assert!(ApiState::new(builder, &[]).is_err());
    }

    #[tokio::test]
    async fn unknown_coin_is_not_found() {
        let (status, body) = send(get("/api/coin/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["error"], "Coin not found");
        assert_eq!(json["message"], "Unable to fetch data for NOPE");
    }
}
