/*
 * Responsibility
 * - Load config -> build dependencies -> assemble the Router
 * - Apply middleware (auth gate inside api::routes, CORS, tracing)
 * - Start with axum::serve()
 */
use std::{panic, process, sync::Arc};

use anyhow::{Context, Result};
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::services::{authority::build_authority, proxy::ForwardingProxy, session::SessionStore};
use crate::state::AppState;
use crate::{api, middleware};

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,docservice=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    // Keep the default hook as a fallback (prints to stderr with location/payload).
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // Always surface panics via tracing so they don't get "lost"
        tracing::error!(?info, "panic");

        // In development, fail fast so we notice immediately.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    let abort_on_panic = !config.app_env.is_production();
    init_panic_hook(abort_on_panic);

    tracing::info!(
        "starting docservice in {:?} mode on {} (backend {}, prefix {:?})",
        config.app_env,
        config.addr,
        config.doc_url,
        config.url_prefix
    );
    if config.disable_all_auth {
        tracing::warn!("authentication is DISABLED; every request is forwarded as an anonymous admin");
    }

    let addr = config.addr;
    let state = build_state(config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build process-level services and inject them into the shared state.
pub fn build_state(config: Config) -> Result<AppState> {
    let authority = build_authority(&config).context("failed to build identity broker client")?;

    let sessions = SessionStore::new(&config.session_secret, config.app_env.is_production())
        .context("failed to build session store")?;

    let proxy = ForwardingProxy::new(config.doc_url.clone(), config.chunk_size)
        .context("failed to build backend client")?;

    Ok(AppState::new(Arc::new(config), authority, sessions, proxy))
}

pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();

    let router = api::routes(state.clone()).with_state(state);
    let router = middleware::cors::apply(router, &config);
    middleware::http::apply(router)
}
