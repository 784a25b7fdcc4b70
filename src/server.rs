//! HTTP front end
//!
//! `POST /ask` runs the pipeline; `GET /health` reports the model state.

use crate::config::ServerConfig;
use crate::error::{AskError, Result};
use crate::execution::{QueryResult, ResultTable};
use crate::inference::InferenceHandle;
use crate::pipeline::{AskOutcome, Assistant};
use axum::{
    extract::State,
    http::HeaderValue,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// API State - Shared between handlers
#[derive(Clone)]
pub struct ApiState {
    pub assistant: Arc<Assistant>,
    pub model: Arc<InferenceHandle>,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

/// Either the full answer or a top-level error, never both.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AskResponse {
    Answer {
        sql: String,
        result: QueryResult,
        answer: String,
    },
    Error {
        error: String,
    },
}

impl From<AskOutcome> for AskResponse {
    fn from(outcome: AskOutcome) -> Self {
        match outcome {
            AskOutcome::Answered { sql, result, answer } => AskResponse::Answer {
                sql: sql.into_inner(),
                result,
                answer,
            },
            no_sql @ AskOutcome::NoSqlPossible { .. } => AskResponse::Answer {
                sql: no_sql.sql().to_string(),
                result: QueryResult::Table(ResultTable::default()),
                answer: no_sql.answer().to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
}

async fn health_check(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model: state.model.state().to_string(),
    })
}

async fn ask(State(state): State<ApiState>, Json(request): Json<AskRequest>) -> Json<AskResponse> {
    match state.assistant.ask(&request.question).await {
        Ok(outcome) => Json(outcome.into()),
        Err(e) => {
            error!(kind = e.kind(), "Request failed: {}", e);
            Json(AskResponse::Error {
                error: e.to_string(),
            })
        }
    }
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|o| {
            HeaderValue::from_str(o.trim())
                .map_err(|e| AskError::Config(format!("Invalid CORS origin '{}': {}", o, e)))
        })
        .collect::<Result<Vec<_>>>()?;

    // Credentials rule out wildcards, so methods and headers mirror the request.
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request()))
}

/// Create the API router
pub fn create_router(state: ApiState, cors_origins: &[String]) -> Result<Router> {
    Ok(Router::new()
        .route("/health", get(health_check))
        .route("/ask", post(ask))
        .layer(cors_layer(cors_origins)?)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Start the API server and serve until `shutdown` resolves.
pub async fn start_server(
    config: &ServerConfig,
    state: ApiState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = create_router(state, &config.cors_origins)?;
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;

    info!("API server listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
