//! Page fetching for paginated families.

use serde_json::Value;
use tracing::{error, warn};

use super::{Access, ResourceDescriptor, ResourceRoute};
use crate::backend::{BackendClient, ForwardRequest, PathTemplateError, normalize};
use crate::error::GatewayError;
use crate::pagination::{PageQuery, PageResult};
use crate::session::BackendToken;

/// Fetches one page of `route`, applying the family's projection to each item.
///
/// The backend receives the canonical `page`/`limit`/`search` query; its
/// `{data, meta}` body is mapped with derived fields recomputed.
pub async fn try_fetch_page(
    backend: &BackendClient,
    descriptor: &ResourceDescriptor,
    route: &ResourceRoute,
    token: Option<&BackendToken>,
    path_param: Option<&str>,
    query: &PageQuery,
) -> Result<PageResult<Value>, GatewayError> {
    let fallback = descriptor.fallback_message(route.operation);

    if route.access == Access::Session && token.is_none() {
        return Err(GatewayError::Unauthorized);
    }

    let request = ForwardRequest::new(route.operation.method(), route.path, path_param)
        .map_err(|template_error| template_failure(descriptor, template_error, &fallback))?
        .with_query(query.to_backend_query())
        .with_token(token.cloned());

    let response = normalize(backend.forward(request).await, &fallback)?;

    let origin = backend.origin();
    Ok(PageResult::from_backend(&response.body, query)
        .map(|item| descriptor.projection.apply(item, origin)))
}

/// Maps a path rendering failure: a bad caller value is a 400, a catalog mismatch a 500.
pub(crate) fn template_failure(
    descriptor: &ResourceDescriptor,
    template_error: PathTemplateError,
    fallback: &str,
) -> GatewayError {
    if template_error.is_invalid_param() {
        return GatewayError::InvalidRequest(template_error.to_string());
    }

    error!(family = descriptor.family, error = %template_error, "Route template mismatch");
    GatewayError::Transport {
        message: fallback.to_string(),
    }
}

/// Like [`try_fetch_page`], but any failure yields the empty page for `query`.
pub async fn fetch_page(
    backend: &BackendClient,
    descriptor: &ResourceDescriptor,
    route: &ResourceRoute,
    token: Option<&BackendToken>,
    path_param: Option<&str>,
    query: &PageQuery,
) -> PageResult<Value> {
    match try_fetch_page(backend, descriptor, route, token, path_param, query).await {
        Ok(page) => page,
        Err(failure) => {
            warn!(
                family = descriptor.family,
                code = failure.error_code(),
                status = failure.status_code().as_u16(),
                "Falling back to an empty page"
            );
            PageResult::empty(query)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::resources::{Operation, default_catalog};
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend_for(server: &MockServer) -> BackendClient {
        BackendClient::new(Url::parse(&server.uri()).unwrap(), Duration::from_secs(5)).unwrap()
    }

    fn query(page_index: u64, page_size: u64, search: Option<&str>) -> PageQuery {
        PageQuery {
            page_index,
            page_size,
            query: search.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn fetches_and_projects_teacher_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/guru"))
            .and(query_param("page", "3"))
            .and(query_param("limit", "5"))
            .and(query_param("search", "budi"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": 1, "foto": "uploads/budi.png"}],
                "meta": {"total": 23, "page": 3, "limit": 5}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let teachers = default_catalog().find("teachers").unwrap();
        let route = *teachers.route(Operation::List).unwrap();
        let token = BackendToken::new("tok");

        let page = try_fetch_page(
            &backend,
            &teachers,
            &route,
            Some(&token),
            None,
            &query(3, 5, Some("budi")),
        )
        .await
        .unwrap();

        assert_eq!(page.total_pages, 5);
        assert!(page.has_next_page);
        assert!(page.has_prev_page);
        assert_eq!(
            page.items[0]["foto"],
            format!("{}/uploads/budi.png", server.uri())
        );
    }

    #[tokio::test]
    async fn missing_token_is_rejected_before_forwarding() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let classes = default_catalog().find("classes").unwrap();
        let route = *classes.route(Operation::List).unwrap();

        let error = try_fetch_page(&backend, &classes, &route, None, None, &PageQuery::default())
            .await
            .unwrap_err();
        assert!(matches!(error, GatewayError::Unauthorized));
    }

    #[tokio::test]
    async fn dot_segment_class_id_is_a_bad_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let students = default_catalog().find("students-by-class").unwrap();
        let route = *students.route(Operation::List).unwrap();
        let token = BackendToken::new("tok");

        let error = try_fetch_page(
            &backend,
            &students,
            &route,
            Some(&token),
            Some("."),
            &PageQuery::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(error, GatewayError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn fetch_page_falls_back_to_empty_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/kelas/9/siswa"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({"message": "database down"})),
            )
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let students = default_catalog().find("students-by-class").unwrap();
        let route = *students.route(Operation::List).unwrap();
        let token = BackendToken::new("tok");

        let page = fetch_page(
            &backend,
            &students,
            &route,
            Some(&token),
            Some("9"),
            &query(2, 20, None),
        )
        .await;

        assert!(page.items.is_empty());
        assert_eq!(page.total, 0);
        assert_eq!(page.page_index, 2);
        assert_eq!(page.page_size, 20);
        assert!(!page.has_next_page);
    }
}
