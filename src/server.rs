/*!
The HTTP surface: `POST /api/predict` and `GET /health`
*/
use crate::data::fake::FakeSource;
use crate::data::yahoo::{YahooSource, YAHOO_CHART_URL};
use crate::data::DataSource;
use crate::pipeline::{Engine, PredictRequest, PredictResponse};
use crate::Error;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Where the server gets its prices from
#[derive(Debug, Clone, PartialEq)]
pub enum SourceConfig {
    /// The Yahoo Finance chart API at a base URL
    Yahoo(String),
    /// Generated data
    Fake(FakeSource),
}

impl Default for SourceConfig {
    fn default() -> SourceConfig {
        SourceConfig::Yahoo(YAHOO_CHART_URL.to_string())
    }
}

impl SourceConfig {
    /// Open a data source for one request. Must be called off the async runtime.
    pub fn open(&self) -> crate::Result<Box<dyn DataSource>> {
        Ok(match self {
            SourceConfig::Yahoo(url) => Box::new(YahooSource::with_base_url(url)?),
            SourceConfig::Fake(fake) => Box::new(*fake),
        })
    }
}

/// Shared, read-only server state
#[derive(Debug, Clone)]
pub struct AppState {
    /// The forecaster and its configuration
    pub engine: Arc<Engine>,
    /// The data source
    pub source: Arc<SourceConfig>,
}

impl AppState {
    /// Create server state
    pub fn new(engine: Engine, source: SourceConfig) -> AppState {
        AppState {
            engine: Arc::new(engine),
            source: Arc::new(source),
        }
    }
}

/// The body of an error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// A description of what went wrong
    pub detail: String,
}

/// A pipeline error on its way to becoming an HTTP response
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> ApiError {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            warn!("Rejected request: {}", self.0);
            StatusCode::BAD_REQUEST
        } else {
            error!("Request failed: {}", self.0);
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let body = ErrorBody {
            detail: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/predict", post(predict))
        .route("/health", get(health))
        .with_state(state)
}

/// Serve the application on an address until the process is stopped
pub async fn serve(bind: &str, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// POST /api/predict - fetch, train, forecast and simulate for one ticker
async fn predict(
    State(state): State<AppState>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<PredictResponse>, ApiError> {
    // Reject bad parameters before spending a blocking thread on them
    request.validate()?;
    let AppState { engine, source } = state;
    let response = tokio::task::spawn_blocking(move || {
        let source = source.open()?;
        engine.run(&*source, &request, &mut |report| {
            debug!(
                "{}: epoch {}/{}, loss = {:.6}",
                request.ticker,
                report.epoch + 1,
                report.epochs,
                report.loss
            )
        })
    })
    .await
    .map_err(|err| Error::Training(format!("Forecast task failed: {}", err)))??;
    Ok(Json(response))
}
