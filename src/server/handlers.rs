//! Endpoint handlers
//!
//! Error bodies are plain text; success bodies are JSON.

use super::multipart::{parse_form, MultipartForm};
use super::AppState;
use crate::metrics;
use crate::router::{Route, RouterError};
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::{ALLOW, CONTENT_TYPE};
use hyper::{Request, Response, StatusCode};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Multipart field for single-file endpoints
pub const SINGLE_FIELD: &str = "file";

/// Multipart field for multi-file endpoints
pub const MULTI_FIELD: &str = "upload[]";

type HttpResponse = Response<Full<Bytes>>;

fn text(status: StatusCode, body: impl Into<String>) -> HttpResponse {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from(body.into())))
        .expect("Failed to build text response")
}

fn json_response(status: StatusCode, value: serde_json::Value) -> HttpResponse {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json; charset=utf-8")
        .body(Full::new(Bytes::from(value.to_string())))
        .expect("Failed to build JSON response")
}

fn bad_request() -> HttpResponse {
    text(StatusCode::BAD_REQUEST, "Bad request")
}

/// Route and handle one request
pub async fn handle_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<HttpResponse, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let route = match Route::resolve(&method, &path) {
        Ok(route) => route,
        Err(RouterError::NotFound(_)) => {
            info!("No route for {} {}", method, path);
            return Ok(text(StatusCode::NOT_FOUND, "Not Found"));
        }
        Err(RouterError::MethodNotAllowed { allow, .. }) => {
            return Ok(Response::builder()
                .status(StatusCode::METHOD_NOT_ALLOWED)
                .header(ALLOW, allow)
                .header(CONTENT_TYPE, "text/plain; charset=utf-8")
                .body(Full::new(Bytes::from("Method Not Allowed")))
                .expect("Failed to build 405 response"));
        }
    };

    info!(route = route.name(), "Handling {} {}", method, path);

    let response = match route {
        Route::Ping => json_response(StatusCode::OK, json!({"message": "pong"})),
        Route::Health => health(&state).await,
        Route::Metrics => metrics_endpoint(&state),
        Route::Single => single(req, &state).await,
        Route::Multi => multi(req, &state).await,
        Route::SingleS3 => single_s3(req, &state).await,
        Route::MultiS3 => multi_s3(req, &state).await,
    };
    Ok(response)
}

async fn read_form(req: Request<Incoming>, state: &AppState) -> Option<MultipartForm> {
    let (parts, body) = req.into_parts();
    match parse_form(&parts.headers, body, state.max_memory_bytes).await {
        Ok(form) => Some(form),
        Err(e) => {
            warn!(error = %e, "Rejected multipart request");
            metrics::record_error("bad_form");
            None
        }
    }
}

async fn health(state: &AppState) -> HttpResponse {
    match state.gateway.health_check().await {
        Ok(()) => json_response(StatusCode::OK, json!({"status": "ok"})),
        Err(e) => {
            warn!(error = %e, "Store health check failed");
            json_response(
                StatusCode::SERVICE_UNAVAILABLE,
                json!({"status": "unavailable", "error": e.to_string()}),
            )
        }
    }
}

fn metrics_endpoint(state: &AppState) -> HttpResponse {
    if !state.metrics_enabled {
        return text(StatusCode::NOT_FOUND, "Not Found");
    }

    match metrics::render() {
        Ok((content_type, buffer)) => Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, content_type)
            .body(Full::new(Bytes::from(buffer)))
            .expect("Failed to build metrics response"),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            text(StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics")
        }
    }
}

/// Open and discard a single file
async fn single(req: Request<Incoming>, state: &AppState) -> HttpResponse {
    let Some(mut form) = read_form(req, state).await else {
        return bad_request();
    };
    let Some(file) = form.take_file(SINGLE_FIELD) else {
        return bad_request();
    };
    info!(filename = %file.filename, bytes = file.size(), "Received file");

    match file.open().await {
        Ok(_stream) => json_response(StatusCode::OK, json!({"message": "OK"})),
        Err(e) => {
            error!(filename = %file.filename, error = %e, "Failed to open file");
            text(StatusCode::INTERNAL_SERVER_ERROR, "Failed to open file")
        }
    }
}

/// Open and discard every file
async fn multi(req: Request<Incoming>, state: &AppState) -> HttpResponse {
    let Some(mut form) = read_form(req, state).await else {
        return bad_request();
    };

    for file in form.take_files(MULTI_FIELD) {
        if let Err(e) = file.open().await {
            error!(filename = %file.filename, error = %e, "Failed to open file");
            return text(StatusCode::INTERNAL_SERVER_ERROR, "Failed to open file");
        }
    }
    json_response(StatusCode::OK, json!({"message": "OK"}))
}

/// Upload one file, verify it landed, then remove it
async fn single_s3(req: Request<Incoming>, state: &AppState) -> HttpResponse {
    let Some(mut form) = read_form(req, state).await else {
        return bad_request();
    };
    let Some(file) = form.take_file(SINGLE_FIELD) else {
        return bad_request();
    };

    let result = state.gateway.upload(&file, &state.key_prefix).await;
    if result.is_error {
        return text(StatusCode::INTERNAL_SERVER_ERROR, result.error_message);
    }
    info!(key = %result.key, "Upload to store succeeded");

    if let Err(e) = state.gateway.file_exists(&result.key).await {
        return text(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
    }
    info!(key = %result.key, "Existence check succeeded");

    if let Err(e) = state.gateway.remove(&result.key).await {
        return text(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
    }
    info!(key = %result.key, "Removal succeeded");

    json_response(
        StatusCode::OK,
        json!({"message": "OK", "url": result.url}),
    )
}

/// Upload every file concurrently; per-file failures stay inside the list
async fn multi_s3(req: Request<Incoming>, state: &AppState) -> HttpResponse {
    let Some(mut form) = read_form(req, state).await else {
        return bad_request();
    };

    let files = form.take_files(MULTI_FIELD);
    let report = state.uploader.upload_all(files, &state.key_prefix).await;

    json_response(
        StatusCode::OK,
        json!({"message": "OK", "lists": report}),
    )
}
