//! HTTP ingest surface.
//!
//! The eventing system posts raw envelopes to `/events` (or a list of records to
//! `/events/batch`); the front end calls `/rooms/availability` before creating a booking.

use std::sync::Arc;

use abi::{batch_records, DateRange};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use reservation::available_rooms;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::{HandlerResponse, ReconciliationDriver};

pub struct AppState {
    pub driver: ReconciliationDriver,
    /// Room inventory for the availability check.
    pub rooms: Vec<String>,
}

impl AppState {
    pub fn new(driver: ReconciliationDriver, rooms: Vec<String>) -> Self {
        Self { driver, rooms }
    }
}

/// Middleware is attached by the caller so tests can drive the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/events", post(ingest_event))
        .route("/events/batch", post(ingest_batch))
        .route("/rooms/availability", get(check_availability))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({"ok": true, "service": env!("CARGO_PKG_NAME")}))
}

/// Unparseable bodies still answer with a `HandlerResponse`.
fn parse_body(body: &Bytes) -> Result<Value, Response> {
    serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "request body is not JSON");
        let resp = HandlerResponse::bad_request(format!("malformed event: body is not JSON: {e}"));
        (StatusCode::BAD_REQUEST, Json(resp)).into_response()
    })
}

async fn ingest_event(State(st): State<Arc<AppState>>, body: Bytes) -> Response {
    let raw = match parse_body(&body) {
        Ok(raw) => raw,
        Err(rejection) => return rejection,
    };
    let resp = st.driver.handle(&raw).await;
    let status = StatusCode::from_u16(resp.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(resp)).into_response()
}

async fn ingest_batch(State(st): State<Arc<AppState>>, body: Bytes) -> Response {
    let raw = match parse_body(&body) {
        Ok(raw) => raw,
        Err(rejection) => return rejection,
    };
    let records = match &raw {
        Value::Array(records) => records,
        other => match batch_records(other) {
            Some(records) => records,
            None => {
                let resp = HandlerResponse::bad_request(
                    "expected a list of records or an object with a Records list",
                );
                return (StatusCode::BAD_REQUEST, Json(resp)).into_response();
            }
        },
    };
    Json(st.driver.handle_batch(records).await).into_response()
}

#[derive(Debug, Deserialize)]
struct AvailabilityQuery {
    check_in: Option<String>,
    check_out: Option<String>,
}

async fn check_availability(
    State(st): State<Arc<AppState>>,
    Query(query): Query<AvailabilityQuery>,
) -> Response {
    let (Some(check_in), Some(check_out)) = (query.check_in, query.check_out) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "check_in and check_out are required"})),
        )
            .into_response();
    };
    let stay = match DateRange::parse(&check_in, &check_out) {
        Ok(stay) => stay,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, Json(json!({"error": e.to_string()}))).into_response()
        }
    };

    match available_rooms(st.driver.store(), &st.rooms, &stay).await {
        Ok(rooms) => Json(json!({"available_rooms": rooms})).into_response(),
        Err(e) => {
            error!(error = %e, "availability check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}
