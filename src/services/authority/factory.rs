//! Factory: build the identity broker client from application `Config`.
use std::sync::Arc;

use crate::config::Config;
use crate::services::authority::{AuthorityClient, AuthorityError, HubAuthority};

/// `Ok(None)` means "not configured"; callers must not treat that as an error.
pub fn build_authority(config: &Config) -> Result<Option<Arc<dyn AuthorityClient>>, AuthorityError> {
    let Some(hub) = config.hub.clone() else {
        return Ok(None);
    };

    tracing::info!(api_url = %hub.api_url, client_id = %hub.client_id, "using jupyterhub for auth");
    let authority: Arc<dyn AuthorityClient> = Arc::new(HubAuthority::new(hub)?);
    Ok(Some(authority))
}
