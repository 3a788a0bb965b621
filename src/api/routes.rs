/*
 * Responsibility
 * - URL layout, everything mounted under the configured prefix
 *   - <prefix>/oauth_callback : OAuth return leg (not gated)
 *   - <prefix>, <prefix>/, <prefix>/{*path} : auth gate -> proxy (any method)
 */
use axum::{
    Router,
    routing::{any, get},
};

use crate::api::handlers::{callback::oauth_callback, proxy::proxy};
use crate::middleware;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let prefix = state.config.url_prefix.clone();

    let mut proxied = Router::new()
        .route(&format!("{}/", prefix), any(proxy))
        .route(&format!("{}/{{*path}}", prefix), any(proxy));
    if !prefix.is_empty() {
        proxied = proxied.route(&prefix, any(proxy));
    }
    let proxied = middleware::auth::access::apply(proxied, state);

    Router::new()
        .route(&format!("{}/oauth_callback", prefix), get(oauth_callback))
        .merge(proxied)
}
