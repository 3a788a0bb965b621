/*
 * Responsibility
 * - Shared context attached to the Router (AppState)
 *   - config, identity broker handle, session store, forwarding proxy
 * - Cloned per request (everything inside is Arc / cheap Clone)
 */
use std::sync::Arc;

use crate::config::Config;
use crate::services::{authority::AuthorityClient, proxy::ForwardingProxy, session::SessionStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    // None when the broker is not configured; protected routes then answer 500
    pub authority: Option<Arc<dyn AuthorityClient>>,
    pub sessions: SessionStore,
    pub proxy: ForwardingProxy,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        authority: Option<Arc<dyn AuthorityClient>>,
        sessions: SessionStore,
        proxy: ForwardingProxy,
    ) -> Self {
        Self {
            config,
            authority,
            sessions,
            proxy,
        }
    }
}
