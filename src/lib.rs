//! # Console Gateway Library
//!
//! Authenticated forwarding layer between the school platform admin console
//! and its backend service: session resolution, backend credential
//! extraction, request forwarding and response normalization.
//!
//! The router built by [`server::create_app`] serves the console over HTTP.
//! Server-side page renderers embedding the crate call
//! [`resources::fetch_page`] directly: it fetches one page of a paginated
//! family and degrades to an empty page when the backend fails, while
//! [`resources::try_fetch_page`] surfaces the [`error::GatewayError`].

pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod pagination;
pub mod resources;
pub mod server;
pub mod session;
pub mod telemetry;
