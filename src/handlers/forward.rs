//! Generic forwarding handler.
//!
//! Each catalog route is mounted with its own [`RouteContext`]; the handler
//! authenticates, reads the inbound request according to the descriptor,
//! issues one backend call and normalizes the outcome.

use std::{collections::BTreeMap, sync::Arc, time::Instant};

use axum::{
    Json, Router,
    extract::{FromRequest, FromRequestParts, Multipart, Path, Query, Request, State},
    response::{IntoResponse, Response},
    routing::{MethodFilter, MethodRouter},
};
use metrics::{counter, histogram};
use serde_json::Value;
use tracing::info;

use crate::auth::BackendAuth;
use crate::backend::{ForwardBody, ForwardRequest, FormPart, check_path_param, normalize};
use crate::error::GatewayError;
use crate::pagination::{PageEnvelope, PageQuery};
use crate::resources::{
    Access, BodyEncoding, Catalog, ListShape, Operation, ResourceDescriptor, ResourceRoute,
    template_failure, try_fetch_page,
};
use crate::server::AppState;

/// The descriptor and route a mounted handler serves.
#[derive(Debug, Clone)]
pub struct RouteContext {
    pub descriptor: Arc<ResourceDescriptor>,
    pub route: ResourceRoute,
}

/// Builds one router holding every route of `catalog`.
pub fn resource_router(catalog: &Catalog) -> Router<AppState> {
    let mut by_path: BTreeMap<&'static str, MethodRouter<AppState>> = BTreeMap::new();

    for descriptor in catalog.iter() {
        for route in &descriptor.routes {
            let context = RouteContext {
                descriptor: Arc::clone(descriptor),
                route: *route,
            };
            let handler = move |State(state): State<AppState>, request: Request| {
                let context = context.clone();
                async move { forward_route(state, context, request).await }
            };

            let method_router = by_path
                .remove(route.path)
                .unwrap_or_else(MethodRouter::new);
            by_path.insert(
                route.path,
                method_router.on(method_filter(route.operation), handler),
            );
        }
    }

    by_path
        .into_iter()
        .fold(Router::new(), |router, (path, method_router)| {
            router.route(path, method_router)
        })
}

fn method_filter(operation: Operation) -> MethodFilter {
    match operation {
        Operation::List | Operation::Detail => MethodFilter::GET,
        Operation::Create => MethodFilter::POST,
        Operation::Update => MethodFilter::PUT,
        Operation::Delete => MethodFilter::DELETE,
    }
}

async fn forward_route(state: AppState, context: RouteContext, request: Request) -> Response {
    let started = Instant::now();
    let family = context.descriptor.family;
    let operation = context.route.operation.as_str();

    let response = match relay(&state, &context, request).await {
        Ok(response) => response,
        Err(failure) => failure.into_response(),
    };

    let status = response.status().as_u16();
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

    counter!(
        "gateway_forward_requests_total",
        "family" => family,
        "operation" => operation,
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_forward_latency_ms", "family" => family, "operation" => operation)
        .record(elapsed_ms);
    info!(
        family,
        operation,
        method = %context.route.operation.method(),
        status,
        elapsed_ms,
        "Forwarded request"
    );

    response
}

async fn relay(
    state: &AppState,
    context: &RouteContext,
    request: Request,
) -> Result<Response, GatewayError> {
    let RouteContext { descriptor, route } = context;
    let (mut parts, body) = request.into_parts();

    // Credentials are checked before anything else is read.
    let token = match route.access {
        Access::Session => Some(BackendAuth::from_request_parts(&mut parts, state).await?.token),
        Access::Public => None,
    };

    let path_param = if route.has_path_param() {
        let Path(param) = Path::<String>::from_request_parts(&mut parts, state)
            .await
            .map_err(|rejection| GatewayError::InvalidRequest(rejection.body_text()))?;
        check_path_param(&param)
            .map_err(|invalid| GatewayError::InvalidRequest(invalid.to_string()))?;
        Some(param)
    } else {
        None
    };

    let Query(query) = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
        .map_err(|rejection| GatewayError::InvalidRequest(rejection.body_text()))?;

    if route.operation == Operation::List && descriptor.list_shape == ListShape::Paginated {
        let page_query = PageQuery::from_pairs(&query);
        let page = try_fetch_page(
            &state.backend,
            descriptor,
            route,
            token.as_ref(),
            path_param.as_deref(),
            &page_query,
        )
        .await?;
        return Ok(Json(PageEnvelope::from(page)).into_response());
    }

    let body = if route.operation.has_body() {
        let request = Request::from_parts(parts, body);
        match descriptor.body {
            BodyEncoding::Json => {
                let Json(value) = Json::<Value>::from_request(request, state).await?;
                ForwardBody::Json(value)
            }
            BodyEncoding::Multipart => {
                let multipart = Multipart::from_request(request, state)
                    .await
                    .map_err(|rejection| GatewayError::InvalidRequest(rejection.body_text()))?;
                ForwardBody::Multipart(read_form(multipart).await?)
            }
        }
    } else {
        ForwardBody::None
    };

    let fallback = descriptor.fallback_message(route.operation);
    let forward = ForwardRequest::new(route.operation.method(), route.path, path_param.as_deref())
        .map_err(|template_error| template_failure(descriptor, template_error, &fallback))?
        .with_query(query)
        .with_body(body)
        .with_token(token);

    let response = normalize(state.backend.forward(forward).await, &fallback)?;
    Ok(response.into_response())
}

/// Buffers every named field of the inbound form.
async fn read_form(mut multipart: Multipart) -> Result<Vec<FormPart>, GatewayError> {
    let mut parts = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;

        parts.push(FormPart {
            name,
            file_name,
            content_type,
            data,
        });
    }

    Ok(parts)
}
