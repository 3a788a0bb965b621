/*
 * Responsibility
 * - ANY <prefix>/{*path}: forward the authenticated request to the document backend
 * - Relay status / headers / body back unchanged (minus hop-by-hop headers)
 */
use axum::{
    extract::{Request, State},
    response::Response,
};

use crate::api::extractors::AuthCtxExtractor;
use crate::error::AppError;
use crate::state::AppState;

pub async fn proxy(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
    req: Request,
) -> Result<Response, AppError> {
    let (parts, body) = req.into_parts();
    let path = backend_path(&state.config.url_prefix, parts.uri.path());

    tracing::info!(
        user = %ctx.user.name,
        admin = ctx.user.admin,
        method = %parts.method,
        path = %path,
        "proxying request"
    );

    state
        .proxy
        .forward(parts.method, path, parts.uri.query(), &parts.headers, body)
        .await
        .map_err(|err| {
            tracing::warn!(error = %err, "backend request failed");
            AppError::Upstream(err)
        })
}

/// Request path relative to the backend root: prefix and leading '/' removed.
fn backend_path<'a>(prefix: &str, path: &'a str) -> &'a str {
    path.strip_prefix(prefix)
        .unwrap_or(path)
        .trim_start_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::StatusCode,
    };
    use std::sync::atomic::Ordering;
    use tower::ServiceExt;

    use crate::app::build_router;
    use crate::test_support::{spawn_counting_backend, test_config, test_state};

    #[test]
    fn prefix_is_removed_from_backend_path() {
        assert_eq!(backend_path("", "/reports/q1.pdf"), "reports/q1.pdf");
        assert_eq!(
            backend_path("/services/docservice", "/services/docservice/reports/q1.pdf"),
            "reports/q1.pdf"
        );
        assert_eq!(backend_path("/services/docservice", "/services/docservice"), "");
        assert_eq!(backend_path("/services/docservice", "/services/docservice/"), "");
    }

    #[tokio::test]
    async fn routes_are_mounted_under_prefix() {
        let backend = spawn_counting_backend().await;
        let mut config = test_config(&backend.url);
        config.disable_all_auth = true;
        config.url_prefix = "/services/docservice".into();
        let router = build_router(test_state(config, None));

        for uri in [
            "/services/docservice",
            "/services/docservice/",
            "/services/docservice/reports/q1.pdf",
        ] {
            let req = axum::http::Request::builder().uri(uri).body(Body::empty()).unwrap();
            let res = router.clone().oneshot(req).await.unwrap();
            assert_eq!(res.status(), StatusCode::OK, "{uri}");
        }

        let req = axum::http::Request::builder().uri("/reports/q1.pdf").body(Body::empty()).unwrap();
        let res = router.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn post_body_reaches_backend() {
        let backend = spawn_counting_backend().await;
        let mut config = test_config(&backend.url);
        config.disable_all_auth = true;
        config.chunk_size = 8;
        let router = build_router(test_state(config, None));

        let req = axum::http::Request::builder()
            .method("POST")
            .uri("/upload?token=secret&name=a")
            .body(Body::from("0123456789abcdefghij"))
            .unwrap();
        let res = router.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"POST /upload?name=a 0123456789abcdefghij");
    }

    #[tokio::test]
    async fn unreachable_backend_is_bad_gateway() {
        let mut config = test_config("http://127.0.0.1:9");
        config.disable_all_auth = true;
        let router = build_router(test_state(config, None));

        let req = axum::http::Request::builder().uri("/reports/q1.pdf").body(Body::empty()).unwrap();
        let res = router.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    }
}
