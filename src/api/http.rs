use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast::Sender as BroadcastSender;
use tracing::{info, warn};

use crate::api::ApiError;
use crate::service::Window;
use crate::storage::Record;

/// Body of every listing route.
#[derive(Debug, Serialize)]
pub struct RecordsResponse {
    pub num_records: usize,
    pub records: Vec<Record>,
}

impl From<Vec<Record>> for RecordsResponse {
    fn from(records: Vec<Record>) -> Self {
        Self {
            num_records: records.len(),
            records,
        }
    }
}

pub fn router(state: Arc<crate::AppState>) -> Router {
    Router::new()
        .route("/", get(all_handler))
        .route("/data", post(ingest_handler))
        .route("/data/:segment", get(data_handler))
        .route("/flush", get(flush_handler))
        .route("/health", get(health_handler))
        .layer(Extension(state))
}

pub async fn run(
    state: Arc<crate::AppState>,
    addr: SocketAddr,
    shutdown: BroadcastSender<()>,
) -> anyhow::Result<()> {
    let app = router(state);
    let listener = TcpListener::bind(addr).await?;
    info!("listening on http://{}", addr);
    let mut shutdown_sub = shutdown.subscribe();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_sub.recv().await;
        })
        .await?;
    Ok(())
}

async fn all_handler(
    Extension(state): Extension<Arc<crate::AppState>>,
) -> Result<Json<RecordsResponse>, ApiError> {
    let records = state.query.get_all().await?;
    Ok(Json(records.into()))
}

/// `/data/hour` .. `/data/year` select a window; anything else is an id.
async fn data_handler(
    Extension(state): Extension<Arc<crate::AppState>>,
    Path(segment): Path<String>,
) -> Result<Json<RecordsResponse>, ApiError> {
    let records = match segment.parse::<Window>() {
        Ok(window) => state.query.get_by_window(window).await?,
        Err(_) => state.query.get_by_id(&segment).await?.into_iter().collect(),
    };
    Ok(Json(records.into()))
}

async fn ingest_handler(
    Extension(state): Extension<Arc<crate::AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Record>, ApiError> {
    let Json(payload) = payload.map_err(|rejection| ApiError::InvalidJson(rejection.body_text()))?;
    let record = state.ingest.ingest(&payload).await?;
    Ok(Json(record))
}

async fn flush_handler(
    Extension(state): Extension<Arc<crate::AppState>>,
) -> Result<Json<Value>, ApiError> {
    state.ingest.flush_all().await?;
    Ok(Json(json!({"message": "DB flush successfully."})))
}

async fn health_handler(Extension(state): Extension<Arc<crate::AppState>>) -> Response {
    match state.query.store_health().await {
        Ok(()) => Json(json!({"status": "ok"})).into_response(),
        Err(err) => {
            warn!(error = %err, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "degraded", "store": "unreachable"})),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, FixedClock};
    use crate::service::testing::{memory, DownStore};
    use crate::service::window::parse_timestamp;
    use crate::service::{IngestService, QueryService};
    use crate::storage::{MemoryStore, RecordStore};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request};
    use chrono_tz::Europe::Paris;
    use std::time::Duration;
    use tower::ServiceExt;

    const TIMEOUT: Duration = Duration::from_secs(2);

    fn state_for(store: Arc<dyn RecordStore>) -> Arc<crate::AppState> {
        let now = parse_timestamp("01-01-2024 12:30:00", Paris).unwrap();
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(now));
        Arc::new(crate::AppState {
            ingest: IngestService::spawn(store.clone(), TIMEOUT),
            query: QueryService::new(store, clock, TIMEOUT),
        })
    }

    fn memory_state() -> (MemoryStore, Arc<crate::AppState>) {
        let (store, shared) = memory();
        (store, state_for(shared))
    }

    async fn send(app: Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(text) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(text.to_string())
            }
            None => Body::empty(),
        };
        let request = builder
            .body(body)
            .unwrap_or_else(|err| panic!("failed to build request: {err}"));
        let response = match app.oneshot(request).await {
            Ok(response) => response,
            Err(err) => panic!("router request failed: {err}"),
        };
        let status = response.status();
        let bytes = match to_bytes(response.into_body(), 1024 * 1024).await {
            Ok(bytes) => bytes,
            Err(err) => panic!("failed to read response body: {err}"),
        };
        let value = match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(err) => panic!("response body is not JSON: {err}"),
        };
        (status, value)
    }

    const READING: &str = r#"{"temperature":"20.0","humidity":"40.0","luminosity":"30.0","timestamp":"01-01-2024 12:00:00"}"#;

    #[tokio::test]
    async fn post_then_fetch_by_id() {
        let (_store, state) = memory_state();

        let (status, posted) = send(router(state.clone()), Method::POST, "/data", Some(READING)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(posted["id"], "1");
        assert_eq!(posted["timestamp"], "01-01-2024 12:00:00");

        let (status, found) = send(router(state), Method::GET, "/data/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found["num_records"], 1);
        assert_eq!(found["records"][0], posted);
    }

    #[tokio::test]
    async fn unknown_id_is_an_empty_listing() {
        let (_store, state) = memory_state();
        let (status, found) = send(router(state), Method::GET, "/data/99", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found, json!({"num_records": 0, "records": []}));
    }

    #[tokio::test]
    async fn window_routes_filter_by_clock() {
        let (_store, state) = memory_state();
        send(router(state.clone()), Method::POST, "/data", Some(READING)).await;
        let old = READING.replace("01-01-2024 12:00:00", "25-12-2023 12:00:00");
        send(router(state.clone()), Method::POST, "/data", Some(&old)).await;

        let (_, hour) = send(router(state.clone()), Method::GET, "/data/hour", None).await;
        assert_eq!(hour["num_records"], 1);
        assert_eq!(hour["records"][0]["id"], "1");

        let (_, month) = send(router(state.clone()), Method::GET, "/data/month", None).await;
        assert_eq!(month["num_records"], 2);
        assert_eq!(month["records"][0]["id"], "2");

        let (_, all) = send(router(state), Method::GET, "/", None).await;
        assert_eq!(all["num_records"], 2);
    }

    #[tokio::test]
    async fn missing_field_is_bad_request() {
        let (store, state) = memory_state();
        let body = r#"{"temperature":"20.0","humidity":"40.0","timestamp":"01-01-2024 12:00:00"}"#;
        let (status, value) = send(router(state), Method::POST, "/data", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["status"], "error");
        assert_eq!(value["message"], "invalid payload: missing field `luminosity`");
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let (_store, state) = memory_state();
        let (status, value) = send(router(state), Method::POST, "/data", Some("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["status"], "error");
    }

    #[tokio::test]
    async fn flush_empties_the_store() {
        let (store, state) = memory_state();
        send(router(state.clone()), Method::POST, "/data", Some(READING)).await;

        let (status, value) = send(router(state.clone()), Method::GET, "/flush", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["message"], "DB flush successfully.");
        assert!(store.is_empty().await);

        let (_, all) = send(router(state), Method::GET, "/", None).await;
        assert_eq!(all["num_records"], 0);
    }

    #[tokio::test]
    async fn store_outage_maps_to_503() {
        let state = state_for(Arc::new(DownStore));

        let (status, value) = send(router(state.clone()), Method::GET, "/", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(value["status"], "error");

        let (status, _) = send(router(state.clone()), Method::GET, "/flush", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, health) = send(router(state), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(health["status"], "degraded");
    }

    #[tokio::test]
    async fn store_errors_stay_out_of_responses() {
        let state = state_for(Arc::new(DownStore));

        let (_, listing) = send(router(state.clone()), Method::GET, "/", None).await;
        assert_eq!(listing["message"], "store unavailable");

        let (_, health) = send(router(state), Method::GET, "/health", None).await;
        assert_eq!(health, json!({"status": "degraded", "store": "unreachable"}));
        assert!(!health.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (_store, state) = memory_state();
        let (status, health) = send(router(state), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health, json!({"status": "ok"}));
    }
}
