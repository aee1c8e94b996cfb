//! # Resource catalog
//!
//! Every forwarded family is described by a [`ResourceDescriptor`]: the public
//! routes it exposes, how request bodies are encoded, whether its list is
//! paginated and which fields need rewriting on the way out. One generic
//! forwarding handler is mounted per route.

use std::sync::Arc;

use reqwest::Method;

use crate::backend::request::PATH_PARAM;

pub mod catalog;
pub mod client;
pub mod projection;

pub use catalog::default_catalog;
pub use client::{fetch_page, try_fetch_page};
pub(crate) use client::template_failure;
pub use projection::{Projection, absolutize_asset_url};

/// Operation a route performs on its family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Detail,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn method(self) -> Method {
        match self {
            Operation::List | Operation::Detail => Method::GET,
            Operation::Create => Method::POST,
            Operation::Update => Method::PUT,
            Operation::Delete => Method::DELETE,
        }
    }

    /// Verb used in fallback messages.
    pub fn verb(self) -> &'static str {
        match self {
            Operation::List | Operation::Detail => "fetch",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Detail => "detail",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    /// Whether the route carries a request body to forward.
    pub fn has_body(self) -> bool {
        matches!(self, Operation::Create | Operation::Update)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyEncoding {
    Json,
    Multipart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListShape {
    /// `{data, meta}` built from the canonical `page`/`limit`/`search` query.
    Paginated,
    /// Caller query forwarded as-is, body relayed verbatim.
    Passthrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Session,
    Public,
}

/// One public route. The backend path mirrors the public path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceRoute {
    pub operation: Operation,
    pub path: &'static str,
    pub access: Access,
}

impl ResourceRoute {
    pub fn has_path_param(&self) -> bool {
        self.path.split('/').any(|segment| segment == PATH_PARAM)
    }
}

#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    pub family: &'static str,
    pub label: &'static str,
    pub body: BodyEncoding,
    pub list_shape: ListShape,
    pub projection: Projection,
    pub routes: Vec<ResourceRoute>,
}

impl ResourceDescriptor {
    fn with_routes(family: &'static str, label: &'static str, routes: Vec<ResourceRoute>) -> Self {
        Self {
            family,
            label,
            body: BodyEncoding::Json,
            list_shape: ListShape::Passthrough,
            projection: Projection::None,
            routes,
        }
    }

    /// Full list/detail/create/update/delete family rooted at `collection`.
    pub fn crud(family: &'static str, label: &'static str, collection: &'static str, item: &'static str) -> Self {
        let route = |operation, path| ResourceRoute {
            operation,
            path,
            access: Access::Session,
        };

        Self::with_routes(
            family,
            label,
            vec![
                route(Operation::List, collection),
                route(Operation::Detail, item),
                route(Operation::Create, collection),
                route(Operation::Update, item),
                route(Operation::Delete, item),
            ],
        )
    }

    /// Family exposing a single authenticated list route.
    pub fn list_only(family: &'static str, label: &'static str, path: &'static str) -> Self {
        Self::with_routes(
            family,
            label,
            vec![ResourceRoute {
                operation: Operation::List,
                path,
                access: Access::Session,
            }],
        )
    }

    /// Family exposing a single unauthenticated detail route.
    pub fn public_detail(family: &'static str, label: &'static str, path: &'static str) -> Self {
        Self::with_routes(
            family,
            label,
            vec![ResourceRoute {
                operation: Operation::Detail,
                path,
                access: Access::Public,
            }],
        )
    }

    pub fn multipart(mut self) -> Self {
        self.body = BodyEncoding::Multipart;
        self
    }

    pub fn paginated(mut self) -> Self {
        self.list_shape = ListShape::Paginated;
        self
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    /// Message used when the backend gives nothing better, e.g. "Failed to fetch guru".
    pub fn fallback_message(&self, operation: Operation) -> String {
        format!("Failed to {} {}", operation.verb(), self.label)
    }

    pub fn route(&self, operation: Operation) -> Option<&ResourceRoute> {
        self.routes.iter().find(|route| route.operation == operation)
    }
}

/// The set of families the gateway forwards.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    descriptors: Vec<Arc<ResourceDescriptor>>,
}

impl Catalog {
    pub fn new(descriptors: Vec<ResourceDescriptor>) -> Self {
        Self {
            descriptors: descriptors.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn find(&self, family: &str) -> Option<Arc<ResourceDescriptor>> {
        self.descriptors
            .iter()
            .find(|descriptor| descriptor.family == family)
            .cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ResourceDescriptor>> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
