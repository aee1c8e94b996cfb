//! Outbound request description.

use axum::body::Bytes;
use reqwest::Method;
use serde_json::Value;
use thiserror::Error;

use crate::session::BackendToken;

/// Placeholder for the single path parameter a backend path may carry.
pub const PATH_PARAM: &str = "{id}";

/// Body of a forwarded call.
#[derive(Debug, Clone, Default)]
pub enum ForwardBody {
    #[default]
    None,
    Json(Value),
    Multipart(Vec<FormPart>),
}

/// One field of a multipart form, buffered from the inbound request.
#[derive(Debug, Clone)]
pub struct FormPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathTemplateError {
    #[error("path template '{template}' requires a path parameter")]
    MissingParam { template: String },
    #[error("path template '{template}' takes no path parameter")]
    UnexpectedParam { template: String },
    #[error("path parameter '{param}' is not a valid resource identifier")]
    InvalidParam { param: String },
}

impl PathTemplateError {
    /// Whether the caller supplied the bad value, as opposed to a catalog mismatch.
    pub fn is_invalid_param(&self) -> bool {
        matches!(self, Self::InvalidParam { .. })
    }
}

/// Rejects parameters that would not survive as their own path segment.
///
/// Empty values and the dot segments `.`/`..` are resolved away by URL
/// normalization and would address a different backend path.
pub fn check_path_param(param: &str) -> Result<(), PathTemplateError> {
    if param.is_empty() || param == "." || param == ".." {
        return Err(PathTemplateError::InvalidParam {
            param: param.to_string(),
        });
    }
    Ok(())
}

/// A single call to the backend. Immutable once built.
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    method: Method,
    segments: Vec<String>,
    query: Vec<(String, String)>,
    body: ForwardBody,
    auth_token: Option<BackendToken>,
}

impl ForwardRequest {
    /// Renders `template` (e.g. `/kelas/{id}/siswa`) with the optional path parameter.
    pub fn new(
        method: Method,
        template: &str,
        path_param: Option<&str>,
    ) -> Result<Self, PathTemplateError> {
        let has_placeholder = template.split('/').any(|segment| segment == PATH_PARAM);

        let segments = match (has_placeholder, path_param) {
            (true, Some(param)) => {
                check_path_param(param)?;
                template
                    .split('/')
                    .filter(|segment| !segment.is_empty())
                    .map(|segment| {
                        if segment == PATH_PARAM {
                            param.to_string()
                        } else {
                            segment.to_string()
                        }
                    })
                    .collect()
            }
            (false, None) => template
                .split('/')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
            (true, None) => {
                return Err(PathTemplateError::MissingParam {
                    template: template.to_string(),
                });
            }
            (false, Some(_)) => {
                return Err(PathTemplateError::UnexpectedParam {
                    template: template.to_string(),
                });
            }
        };

        Ok(Self {
            method,
            segments,
            query: Vec::new(),
            body: ForwardBody::None,
            auth_token: None,
        })
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: ForwardBody) -> Self {
        self.body = body;
        self
    }

    pub fn with_token(mut self, token: Option<BackendToken>) -> Self {
        self.auth_token = token;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path segments after parameter substitution, not yet percent-encoded.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body(&self) -> &ForwardBody {
        &self.body
    }

    pub fn auth_token(&self) -> Option<&BackendToken> {
        self.auth_token.as_ref()
    }

    pub(crate) fn into_body(self) -> ForwardBody {
        self.body
    }
}
