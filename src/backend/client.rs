//! HTTP client for the backend service.

use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use reqwest::{
    StatusCode,
    header::{ACCEPT, AUTHORIZATION},
    multipart::{Form, Part},
};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use super::request::{ForwardBody, ForwardRequest, FormPart};
use super::response::BackendResponse;

/// Failures that prevent a usable backend response from being obtained.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("backend request timed out")]
    Timeout(#[source] reqwest::Error),
    #[error("backend is unreachable")]
    Connect(#[source] reqwest::Error),
    #[error("backend request failed")]
    Request(#[source] reqwest::Error),
    #[error("backend returned a non-JSON body with status {status}")]
    MalformedBody {
        status: StatusCode,
        #[source]
        source: serde_json::Error,
    },
}

impl TransportError {
    fn classify(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TransportError::Timeout(error)
        } else if error.is_connect() {
            TransportError::Connect(error)
        } else {
            TransportError::Request(error)
        }
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Timeout(_) => "timeout",
            TransportError::Connect(_) => "connect",
            TransportError::Request(_) => "request",
            TransportError::MalformedBody { .. } => "malformed_body",
        }
    }
}

/// Client for the backend service; one pooled connection set shared by all requests.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    origin: Url,
}

impl BackendClient {
    /// Creates a client rooted at `origin` with a per-call `timeout`.
    ///
    /// No retry or redirect policy is applied: each forward is exactly one
    /// outbound call, and a 3xx is relayed like any other non-2xx status.
    pub fn new(origin: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("console-gateway/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, origin })
    }

    /// Backend origin every path is resolved against.
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Absolute URL for `request`: origin path, then the encoded segments, then the query.
    pub fn url_for(&self, request: &ForwardRequest) -> Url {
        let mut url = self.origin.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            segments.extend(request.segments());
        }

        url.set_query(None);
        if !request.query().is_empty() {
            url.query_pairs_mut().extend_pairs(request.query());
        }
        url.set_fragment(None);
        url
    }

    /// Issues exactly one outbound call for `request`.
    pub async fn forward(&self, request: ForwardRequest) -> Result<BackendResponse, TransportError> {
        let url = self.url_for(&request);
        let method = request.method().clone();
        let method_label = method.as_str().to_string();

        let mut builder = self
            .http
            .request(method, url.clone())
            .header(ACCEPT, "application/json");

        if let Some(token) = request.auth_token() {
            builder = builder.header(AUTHORIZATION, token.bearer_header());
        }

        builder = match request.into_body() {
            ForwardBody::None => builder,
            ForwardBody::Json(value) => builder.json(&value),
            ForwardBody::Multipart(parts) => builder.multipart(build_form(parts)),
        };

        let started = Instant::now();
        let outcome = send(builder).await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        histogram!("backend_call_latency_ms", "method" => method_label.clone()).record(elapsed_ms);

        match &outcome {
            Ok(response) => {
                counter!(
                    "backend_calls_total",
                    "method" => method_label,
                    "status" => response.status.as_u16().to_string()
                )
                .increment(1);
                debug!(
                    path = url.path(),
                    status = response.status.as_u16(),
                    elapsed_ms,
                    "Backend call completed"
                );
            }
            Err(error) => {
                counter!(
                    "backend_transport_failures_total",
                    "method" => method_label,
                    "kind" => error.kind()
                )
                .increment(1);
                warn!(
                    path = url.path(),
                    kind = error.kind(),
                    error = ?error,
                    elapsed_ms,
                    "Backend call failed"
                );
            }
        }

        outcome
    }
}

async fn send(builder: reqwest::RequestBuilder) -> Result<BackendResponse, TransportError> {
    let response = builder.send().await.map_err(TransportError::classify)?;
    let status = response.status();
    let bytes = response.bytes().await.map_err(TransportError::classify)?;

    // Empty bodies (204 and friends) are relayed as JSON null.
    let body = if bytes.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .map_err(|source| TransportError::MalformedBody { status, source })?
    };

    Ok(BackendResponse { status, body })
}

/// Rebuilds the buffered fields as an outbound form; reqwest picks a fresh boundary.
fn build_form(parts: Vec<FormPart>) -> Form {
    parts.into_iter().fold(Form::new(), |form, field| {
        let FormPart {
            name,
            file_name,
            content_type,
            data,
        } = field;

        let mut part = match content_type {
            Some(content_type) => match Part::bytes(data.to_vec()).mime_str(&content_type) {
                Ok(typed) => typed,
                Err(_) => {
                    debug!(field = %name, content_type, "Dropping unparseable part content type");
                    Part::bytes(data.to_vec())
                }
            },
            None => Part::bytes(data.to_vec()),
        };
        if let Some(file_name) = file_name {
            part = part.file_name(file_name);
        }

        form.part(name, part)
    })
}
