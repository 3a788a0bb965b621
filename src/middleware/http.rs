//! HTTP-level middleware (cross-cutting concerns).
//!
//! Responsibility:
//! - Access logging / request tracing (TraceLayer)
//!
//! Notes:
//! - No body size limit and no global timeout: uploads are streamed to the
//!   backend in bounded chunks and the backend's own timing is passed through.
//! - Nothing here may add or rewrite request headers; the proxy forwards what
//!   the caller sent.

use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Apply HTTP-level middleware to the given Router.
pub fn apply(router: Router) -> Router {
    let layers = ServiceBuilder::new().layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    router.layer(layers)
}
