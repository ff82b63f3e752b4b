//! HTTP streaming endpoint
//!
//! Translates `GET /dl/:id` into a chunked range stream, `GET /watch/:id`
//! into a viewer page around it, and `GET /status` into the operator
//! document. The response body is wired directly to the reader's lazy
//! stream; memory stays constant regardless of file size.

use crate::config::GateConfig;
use crate::error::GateError;
use crate::metrics::{GateMetrics, MetricsSnapshot};
use crate::models::{ByteRange, FileHandle};
use crate::planner::ChunkPlanner;
use crate::pool::ClientPool;
use crate::reader::range_stream;
use crate::resolver::FileResolver;
use crate::secure_link::{parse_route_id, verify_hash};
use axum::body::Body;
use axum::extract::{Path as AxumPath, Query, State};
use axum::http::header::{
    ACCEPT_RANGES, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, RANGE,
};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Shared state for all request handlers
pub struct AppState {
    pub config: GateConfig,
    pub pool: ClientPool,
    pub resolver: FileResolver,
    pub planner: ChunkPlanner,
    pub metrics: Arc<GateMetrics>,
    pub started_at: Instant,
}

impl AppState {
    /// Assemble the state from a validated config and a built pool
    pub fn new(config: GateConfig, pool: ClientPool) -> Self {
        let planner = ChunkPlanner::new(config.chunk_floor_bytes, config.chunk_ceiling_bytes);
        AppState {
            config,
            pool,
            resolver: FileResolver::new(),
            planner,
            metrics: Arc::new(GateMetrics::new()),
            started_at: Instant::now(),
        }
    }
}

/// Build the gateway router
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/dl/:id", get(dl_get).head(dl_head))
        .route("/watch/:id", get(watch_get))
        .route("/status", get(status_get))
        .with_state(state)
}

#[derive(Deserialize)]
struct HashQuery {
    hash: Option<String>,
}

/// Outcome of the shared validate-and-resolve path
struct ResolvedRequest {
    handle: Arc<FileHandle>,
    client: Arc<crate::pool::BackingClient>,
}

/// Parse the route id, pick a client, resolve the handle and run the
/// hash gate. Shared by GET, HEAD and the viewer page.
async fn validate_and_resolve(
    state: &AppState,
    raw_id: &str,
    query_hash: Option<&str>,
) -> Result<ResolvedRequest, GateError> {
    let route = parse_route_id(raw_id, state.config.hash_length)?;

    let client = state.pool.pick_least_loaded();
    let handle = state
        .resolver
        .resolve(&client, state.config.channel_id, route.message_id)
        .await?;

    let supplied = route.embedded_hash.as_deref().or(query_hash);
    verify_hash(supplied, &handle, state.config.hash_length)?;

    Ok(ResolvedRequest { handle, client })
}

/// Resolve the response content type: stored mime type, then a guess
/// from the file name, then the octet-stream fallback
fn content_type_for(handle: &FileHandle) -> String {
    if let Some(mime) = &handle.meta.mime_type {
        return mime.clone();
    }
    handle
        .meta
        .file_name
        .as_deref()
        .and_then(|name| mime_guess::from_path(name).first())
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

/// Download file name: the stored name, or a random token with an
/// extension guessed from the mime type
fn disposition_name(handle: &FileHandle, content_type: &str) -> String {
    if let Some(name) = &handle.meta.file_name {
        return name.replace('"', "");
    }

    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    let ext = mime_guess::get_mime_extensions_str(content_type)
        .and_then(|exts| exts.first())
        .copied()
        .unwrap_or("bin");
    format!("{}.{}", token, ext)
}

/// Interpret the request's `Range` header against the file size
///
/// `None` means whole-file 200 semantics; malformed headers (and
/// multi-range, which is unsupported) fall back to that permissively. A
/// syntactically valid range beyond EOF is the one hard range error.
fn effective_range(
    headers: &HeaderMap,
    file_size: u64,
) -> Result<Option<ByteRange>, GateError> {
    let Some(raw) = headers.get(RANGE).and_then(|v| v.to_str().ok()) else {
        return Ok(None);
    };

    match ByteRange::from_header(raw, file_size) {
        Ok(range) => Ok(Some(range)),
        Err(GateError::MalformedRange(reason)) => {
            debug!("Tolerating malformed Range header ({}); serving whole file", reason);
            Ok(None)
        }
        Err(other) => Err(other),
    }
}

/// Build the common response headers for a (possibly partial) file
fn file_headers(handle: &FileHandle, range: Option<ByteRange>) -> (StatusCode, HeaderMap) {
    let file_size = handle.file_size();
    let mut headers = HeaderMap::new();

    let status = if range.is_some() {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };

    let content_length = range.map_or(file_size, |r| r.size());
    headers.insert(CONTENT_LENGTH, HeaderValue::from(content_length));
    if let Some(range) = range {
        if let Ok(value) = HeaderValue::from_str(&range.to_content_range(file_size)) {
            headers.insert(CONTENT_RANGE, value);
        }
    }

    headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));

    let content_type = content_type_for(handle);
    if let Ok(value) = HeaderValue::from_str(&content_type) {
        headers.insert(CONTENT_TYPE, value);
    }

    let name = disposition_name(handle, &content_type);
    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", name)) {
        headers.insert(CONTENT_DISPOSITION, value);
    }

    (status, headers)
}

/// Map a gateway error to its HTTP response
///
/// 403 bodies stay empty; 404/500 carry the message for operators.
fn error_response(err: &GateError, metrics: &GateMetrics) -> Response {
    let status =
        StatusCode::from_u16(err.to_http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    match err {
        GateError::InvalidHash | GateError::InvalidRoute(_) => metrics.record_invalid_hash(),
        GateError::FileNotFound(_) => metrics.record_not_found(),
        _ => {}
    }

    let body = if err.expose_message() {
        err.to_string()
    } else {
        String::new()
    };
    (status, body).into_response()
}

/// 416 advertising the file's valid extent; the header says it all, so
/// the body stays empty like the other rejection paths
fn range_not_satisfiable(file_size: u64) -> Response {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&format!("bytes */{}", file_size)) {
        headers.insert(CONTENT_RANGE, value);
    }
    (StatusCode::RANGE_NOT_SATISFIABLE, headers).into_response()
}

async fn dl_get(
    State(state): State<Arc<AppState>>,
    AxumPath(raw_id): AxumPath<String>,
    Query(query): Query<HashQuery>,
    headers: HeaderMap,
) -> Response {
    state.metrics.record_request();

    let resolved = match validate_and_resolve(&state, &raw_id, query.hash.as_deref()).await {
        Ok(resolved) => resolved,
        Err(err) => {
            warn!("Rejected /dl/{}: {}", raw_id, err);
            return error_response(&err, &state.metrics);
        }
    };

    let range = match effective_range(&headers, resolved.handle.file_size()) {
        Ok(range) => range,
        Err(GateError::InvalidRange(_)) => {
            return range_not_satisfiable(resolved.handle.file_size())
        }
        Err(err) => return error_response(&err, &state.metrics),
    };

    let effective = range.unwrap_or_else(|| ByteRange::full(resolved.handle.file_size()));
    let (status, response_headers) = file_headers(&resolved.handle, range);

    let plan = state.planner.plan(effective);
    debug!(
        "Streaming message {} bytes {}-{} via client {} ({} part(s))",
        resolved.handle.message_id,
        effective.start,
        effective.end,
        resolved.client.id(),
        plan.part_count
    );

    let guard = resolved.client.begin_transfer();
    state.metrics.record_streamed();
    let body = Body::from_stream(range_stream(
        resolved.handle,
        plan,
        guard,
        Arc::clone(&state.metrics),
    ));

    (status, response_headers, body).into_response()
}

async fn dl_head(
    State(state): State<Arc<AppState>>,
    AxumPath(raw_id): AxumPath<String>,
    Query(query): Query<HashQuery>,
    headers: HeaderMap,
) -> Response {
    state.metrics.record_request();

    let resolved = match validate_and_resolve(&state, &raw_id, query.hash.as_deref()).await {
        Ok(resolved) => resolved,
        Err(err) => return error_response(&err, &state.metrics),
    };

    let range = match effective_range(&headers, resolved.handle.file_size()) {
        Ok(range) => range,
        Err(GateError::InvalidRange(_)) => {
            return range_not_satisfiable(resolved.handle.file_size())
        }
        Err(err) => return error_response(&err, &state.metrics),
    };

    let (status, response_headers) = file_headers(&resolved.handle, range);
    (status, response_headers).into_response()
}

async fn watch_get(
    State(state): State<Arc<AppState>>,
    AxumPath(raw_id): AxumPath<String>,
    Query(query): Query<HashQuery>,
) -> Response {
    state.metrics.record_request();

    let resolved = match validate_and_resolve(&state, &raw_id, query.hash.as_deref()).await {
        Ok(resolved) => resolved,
        Err(err) => return error_response(&err, &state.metrics),
    };

    let dl_url = match &query.hash {
        Some(hash) => format!("/dl/{}?hash={}", raw_id, hash),
        None => format!("/dl/{}", raw_id),
    };
    let title = resolved
        .handle
        .meta
        .file_name
        .clone()
        .unwrap_or_else(|| format!("message {}", resolved.handle.message_id));

    let page = viewer_page(&title, &dl_url, &content_type_for(&resolved.handle));
    Html(page).into_response()
}

/// Minimal viewer page wrapping the download URL in a media element
fn viewer_page(title: &str, dl_url: &str, content_type: &str) -> String {
    let media = if content_type.starts_with("video/") {
        format!(r#"<video controls preload="metadata" src="{}"></video>"#, dl_url)
    } else if content_type.starts_with("audio/") {
        format!(r#"<audio controls src="{}"></audio>"#, dl_url)
    } else {
        String::new()
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{title}</title>
    <style>
        body {{ font-family: Arial, sans-serif; margin: 40px; background: #111; color: #eee; }}
        video, audio {{ width: 100%; max-width: 960px; }}
        a {{ color: #6af; }}
    </style>
</head>
<body>
    <h1>{title}</h1>
    {media}
    <p><a href="{dl_url}">Download</a></p>
</body>
</html>"#
    )
}

/// Operator status document
#[derive(Serialize)]
struct StatusDocument {
    uptime_seconds: u64,
    clients: Vec<ClientStatus>,
    total_workload: u64,
    cached_handles: usize,
    metrics: MetricsSnapshot,
}

#[derive(Serialize)]
struct ClientStatus {
    id: usize,
    workload: u64,
}

async fn status_get(State(state): State<Arc<AppState>>) -> Response {
    let clients = state
        .pool
        .workloads()
        .into_iter()
        .enumerate()
        .map(|(id, workload)| ClientStatus { id, workload })
        .collect();

    let doc = StatusDocument {
        uptime_seconds: state.started_at.elapsed().as_secs(),
        clients,
        total_workload: state.pool.total_workload(),
        cached_handles: state.resolver.cached_handles(),
        metrics: state.metrics.snapshot(),
    };

    axum::Json(doc).into_response()
}

/// Serve the app on the configured bind address until shutdown
pub async fn serve(state: Arc<AppState>) -> anyhow::Result<()> {
    let bind = state.config.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("Listening on http://{}", bind);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
