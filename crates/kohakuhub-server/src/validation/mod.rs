//! Request body size limiting, applied as an outer tower layer before a
//! request ever reaches the router (name/ref/path validation live in
//! `kohakuhub-api`, which owns the routes that need them).

use axum::{body::Body, extract::Request, http::StatusCode, response::Response};

/// Rejects any request whose `Content-Length` exceeds a generous ceiling,
/// before the body is even read. The NDJSON commit protocol's own limits
/// (spec §4.1) are enforced downstream in `kohakuhub-commit`; this is
/// just a cheap first line of defense against an obviously-too-large
/// request.
const MAX_BODY_SIZE: usize = 50 * 1024 * 1024;

pub async fn body_size_limit_middleware(request: Request, next: axum::middleware::Next) -> Response {
    if let Some(content_length) = request
        .headers()
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<usize>().ok())
    {
        if content_length > MAX_BODY_SIZE {
            return Response::builder()
                .status(StatusCode::PAYLOAD_TOO_LARGE)
                .body(Body::from(r#"{"error":"payload_too_large","message":"request body exceeds maximum size"}"#))
                .unwrap_or_else(|_| {
                    Response::builder().status(StatusCode::INTERNAL_SERVER_ERROR).body(Body::empty()).expect("valid response")
                });
        }
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use axum::middleware;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    async fn ok_handler() -> &'static str {
        "ok"
    }

    fn app() -> Router {
        Router::new().route("/", get(ok_handler)).layer(middleware::from_fn(body_size_limit_middleware))
    }

    #[tokio::test]
    async fn allows_requests_under_the_limit() {
        let req = HttpRequest::builder().uri("/").header("content-length", "1024").body(Body::empty()).unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn rejects_requests_over_the_limit() {
        let req = HttpRequest::builder()
            .uri("/")
            .header("content-length", (MAX_BODY_SIZE + 1).to_string())
            .body(Body::empty())
            .unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
