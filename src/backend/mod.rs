//! Backend relay
//!
//! The outbound half of the gateway:
//! - [`ForwardRequest`] describes one call to the backend service
//! - [`BackendClient`] issues it, attaching the bearer credential
//! - [`normalize`] turns the outcome into either a verbatim success or a [`GatewayError`]
//!
//! [`GatewayError`]: crate::error::GatewayError

pub mod client;
pub mod request;
pub mod response;

pub use client::{BackendClient, TransportError};
pub use request::{ForwardBody, ForwardRequest, FormPart, PathTemplateError, check_path_param};
pub use response::{BackendResponse, extract_message, normalize};
