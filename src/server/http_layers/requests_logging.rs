//! Request logging middleware

use super::super::state::ServerState;
use crate::server::metrics::record_http_request;
use axum::extract::State;
use axum::{
    body::Body,
    http::{header::HeaderMap, Request, Response, StatusCode, Uri},
    middleware::Next,
    response::IntoResponse,
};
use std::time::Instant;
use tracing::{error, info};

#[derive(PartialEq, PartialOrd, Clone, Debug, clap::ValueEnum)]
pub enum RequestsLoggingLevel {
    None,
    Path,
    Headers,
    Body,
}

impl Default for RequestsLoggingLevel {
    fn default() -> Self {
        Self::Path
    }
}

impl std::fmt::Display for RequestsLoggingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

const MAX_LOGGABLE_BODY_LENGTH: usize = 1024;

/// Query parameters whose values never reach the logs.
const REDACTED_QUERY_KEYS: &[&str] = &["api_key"];

enum ContentLengthParseResult {
    Ok(usize),
    No(&'static str),
}

fn parse_content_length(headers: &HeaderMap) -> ContentLengthParseResult {
    let value = match headers.get("content-length") {
        Some(x) => x,
        None => return ContentLengthParseResult::No("Content-length not set."),
    };

    let str_value = match value.to_str() {
        Ok(x) => x,
        Err(_) => {
            return ContentLengthParseResult::No("Could not get Content-length string value.")
        }
    };

    match str_value.parse::<usize>() {
        Ok(x) => ContentLengthParseResult::Ok(x),
        Err(_) => ContentLengthParseResult::No("Could not parse Content-length numeric value."),
    }
}

/// Keys are compared after percent-decoding, the way the `Query` extractor sees them.
/// A key that does not decode to UTF-8 is treated as secret.
fn is_redacted_key(raw_key: &str) -> bool {
    match urlencoding::decode(raw_key) {
        Ok(key) => REDACTED_QUERY_KEYS.contains(&key.as_ref()),
        Err(_) => true,
    }
}

/// Renders `uri` for logging with secret query values replaced by `***`.
pub fn redacted_uri(uri: &Uri) -> String {
    let Some(query) = uri.query() else {
        return uri.to_string();
    };
    let query = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if is_redacted_key(key) => format!("{}=***", key),
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&");
    format!("{}?{}", uri.path(), query)
}

fn internal_error() -> Response<Body> {
    let mut response = Response::new(Body::from("Internal Server Error"));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

async fn log_body(label: &str, headers: &HeaderMap, body: Body) -> Result<Body, axum::Error> {
    match parse_content_length(headers) {
        ContentLengthParseResult::No(reason) => {
            info!("  {}: {}", label, reason);
            Ok(body)
        }
        ContentLengthParseResult::Ok(size) if size < MAX_LOGGABLE_BODY_LENGTH => {
            let bytes = axum::body::to_bytes(body, size).await?;
            info!("  {}:\n{}", label, String::from_utf8_lossy(&bytes));
            Ok(Body::from(bytes))
        }
        ContentLengthParseResult::Ok(size) => {
            info!(
                "  {}: Too big to log ({:#})",
                label,
                byte_unit::Byte::from(size)
            );
            Ok(body)
        }
    }
}

pub async fn log_requests(
    State(state): State<ServerState>,
    mut request: Request<Body>,
    next: Next,
) -> impl IntoResponse {
    let level = state.config.requests_logging_level.clone();

    let start = Instant::now();

    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    if level > RequestsLoggingLevel::None {
        info!(">>> {} {}", method, redacted_uri(request.uri()));
    }

    if level >= RequestsLoggingLevel::Headers {
        info!("  Req Headers:");
        for header in request.headers().iter() {
            info!("    {:?}: {:?}", header.0, header.1);
        }
    }

    if level >= RequestsLoggingLevel::Body {
        let (parts, body) = request.into_parts();
        let body = match log_body("Req Body", &parts.headers, body).await {
            Ok(body) => body,
            Err(err) => {
                error!("Failed to read request body: {:?}", err);
                return internal_error();
            }
        };
        request = Request::from_parts(parts, body);
    }

    let mut response = next.run(request).await;

    if level >= RequestsLoggingLevel::Headers {
        info!("  Resp Headers:");
        for header in response.headers().iter() {
            info!("    {:?}: {:?}", header.0, header.1);
        }
    }

    if level >= RequestsLoggingLevel::Body {
        let (parts, body) = response.into_parts();
        let body = match log_body("Resp Body", &parts.headers, body).await {
            Ok(body) => body,
            Err(err) => {
                error!("Failed to read response body: {:?}", err);
                return internal_error();
            }
        };
        response = Response::from_parts(parts, body);
    }

    let status = response.status().as_u16();
    let duration = start.elapsed();

    if level > RequestsLoggingLevel::None {
        info!("<<< {} ({}ms)", status, duration.as_millis());
    }

    record_http_request(&method, &path, status, duration);

    response
}
