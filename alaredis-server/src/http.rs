//! # HTTP Front Door
//!
//! Translates the URL/method/body contract from the specification's
//! external interfaces section into calls against [`Dispatcher::call`], and
//! maps the three-kind error taxonomy onto HTTP status codes.
//!
//! Grounded on `http-handler.go`'s `OPERATIONS` table, `createInnerRequest`,
//! and `HandleRequest` — re-expressed with `axum` extractors instead of
//! manual `strings.Split` path parsing, and with the NOT_FOUND/BAD_REQUEST
//! split the Go source collapses into a single 500 (this front door follows
//! the specification's 404/400/500 mapping instead).

use std::collections::HashMap;
use std::sync::Arc;

use alaredis_codec::{BinaryCodec, BodyCodec, JsonCodec};
use alaredis_common::{EngineError, Op, Value};
use alaredis_engine::Dispatcher;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use tracing::warn;

use crate::metrics::Metrics;

const BINARY_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub metrics: Arc<Metrics>,
}

/// Builds the router covering every operation, with and without a trailing
/// index segment, per `/<op>/<key>[/<idx>][?ttl=<seconds>]`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/:op/:key", get(handle_no_idx).post(handle_no_idx))
        .route("/:op/:key/:idx", get(handle_with_idx).post(handle_with_idx))
        .with_state(state)
}

async fn handle_no_idx(
    state: State<AppState>,
    method: Method,
    Path((op, key)): Path<(String, String)>,
    query: Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle(state, method, op, key, None, query, headers, body).await
}

async fn handle_with_idx(
    state: State<AppState>,
    method: Method,
    Path((op, key, idx)): Path<(String, String, String)>,
    query: Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle(state, method, op, key, Some(idx), query, headers, body).await
}

async fn handle(
    State(state): State<AppState>,
    method: Method,
    op_segment: String,
    key: String,
    idx: Option<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.metrics.record_request_start();
    let start = std::time::Instant::now();
    let response = dispatch(&state, method, &op_segment, key, idx, query, headers, body).await;
    state.metrics.record_request_end(start.elapsed());
    if response.status().is_server_error() || response.status().is_client_error() {
        state.metrics.record_error();
    }
    response
}

async fn dispatch(
    state: &AppState,
    method: Method,
    op_segment: &str,
    key: String,
    idx: Option<String>,
    query: HashMap<String, String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(op) = Op::parse(op_segment) else {
        return bad_request("Operation is not supported or defined");
    };
    if key.is_empty() {
        return bad_request("Key is not set or is empty");
    }
    if op.requires_index() && idx.as_deref().map_or(true, str::is_empty) {
        return bad_request("Index param is not set");
    }

    let expected_method = if op.is_getter() { Method::GET } else { Method::POST };
    if method != expected_method {
        return bad_request(&format!(
            "{op} must be called with {expected_method}, not {method}"
        ));
    }

    let ttl = match query.get("ttl") {
        None => 0,
        Some(s) => match s.parse::<u64>() {
            Ok(ttl) => ttl,
            Err(e) => return bad_request(&format!("Non integer ttl: {e}")),
        },
    };

    let codec = pick_codec(&headers);
    let val = match decode_body(op, &*codec, &body) {
        Ok(val) => val,
        Err(message) => return bad_request(&message),
    };

    match state.dispatcher.call(op, key, idx, val, ttl).await {
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Ok(Some(value)) => {
            let encoded = codec.encode(&value);
            let content_type = content_type_for(&headers);
            ([(header::CONTENT_TYPE, content_type)], encoded).into_response()
        }
        Err(err) => engine_error_response(err),
    }
}

fn decode_body(op: Op, codec: &dyn BodyCodec, body: &Bytes) -> Result<Option<Value>, String> {
    match op {
        Op::Set | Op::LSetI | Op::DSetI => codec
            .decode_str(body)
            .map(Some)
            .map_err(|e| e.to_string()),
        Op::LSet => codec
            .decode_list(body)
            .map(Some)
            .map_err(|e| e.to_string()),
        Op::DSet => codec
            .decode_dict(body)
            .map(Some)
            .map_err(|e| e.to_string()),
        _ => Ok(None),
    }
}

fn pick_codec(headers: &HeaderMap) -> Box<dyn BodyCodec + Send + Sync> {
    match headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
        Some(ct) if ct == BINARY_CONTENT_TYPE => Box::new(BinaryCodec),
        _ => Box::new(JsonCodec),
    }
}

fn content_type_for(headers: &HeaderMap) -> &'static str {
    match headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
        Some(ct) if ct == BINARY_CONTENT_TYPE => BINARY_CONTENT_TYPE,
        _ => "application/json",
    }
}

fn engine_error_response(err: EngineError) -> Response {
    let status = match &err {
        EngineError::NotFound { .. } => StatusCode::NOT_FOUND,
        EngineError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        EngineError::Internal { message } => {
            warn!(message, "internal error serving request");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string()).into_response()
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, message.to_string()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alaredis_engine::Storage;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let storage = Storage::new(1);
        storage.run();
        router(AppState {
            dispatcher: storage.dispatcher().clone(),
            metrics: Arc::new(Metrics::new()),
        })
    }

    #[tokio::test]
    async fn scenario_a_over_http() {
        let app = test_app();

        let resp = app
            .clone()
            .oneshot(
                Request::post("/set/test%20key")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("\"test value\""))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = app
            .clone()
            .oneshot(Request::get("/get/test%20key").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"\"test value\"");

        let resp = app
            .clone()
            .oneshot(Request::post("/delete/test%20key").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = app
            .oneshot(Request::get("/get/test%20key").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Object not found for key 'test key'");
    }

    #[tokio::test]
    async fn unknown_op_is_bad_request() {
        let app = test_app();
        let resp = app
            .oneshot(Request::get("/frobnicate/k").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn wrong_method_is_bad_request() {
        let app = test_app();
        let resp = app
            .oneshot(Request::post("/get/k").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
