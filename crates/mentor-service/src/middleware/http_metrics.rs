//! HTTP metrics middleware.
//!
//! Records every response, including the ones produced before a handler
//! runs: unknown routes, wrong methods, malformed path ids and timeouts.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::observability::metrics::record_http_request;

/// Record method, normalized path, status and duration of a request.
///
/// Applied as the outermost layer.
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    record_http_request(&method, &path, response.status().as_u16(), start.elapsed());
    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        extract::Path,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::{get, post},
        Router,
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn meeting(Path(_id): Path<Uuid>) -> &'static str {
        "meeting"
    }

    async fn conflict() -> (StatusCode, &'static str) {
        (StatusCode::CONFLICT, "taken")
    }

    fn test_app() -> Router {
        Router::new()
            .route("/api/v1/meetings/:meeting_id", get(meeting))
            .route("/api/v1/meetings", post(conflict))
            .layer(middleware::from_fn(http_metrics_middleware))
    }

    async fn send(method: &str, uri: &str) -> StatusCode {
        let request = HttpRequest::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .expect("request builder should succeed");

        test_app()
            .oneshot(request)
            .await
            .expect("request should succeed")
            .status()
    }

    #[tokio::test]
    async fn test_middleware_passes_handler_responses_through() {
        let id = Uuid::new_v4();
        assert_eq!(
            send("GET", &format!("/api/v1/meetings/{id}")).await,
            StatusCode::OK
        );
        assert_eq!(send("POST", "/api/v1/meetings").await, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_middleware_sees_framework_rejections() {
        assert_eq!(
            send("GET", "/api/v1/meetings/not-a-uuid").await,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            send("DELETE", "/api/v1/meetings").await,
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(send("GET", "/nowhere").await, StatusCode::NOT_FOUND);
    }
}
