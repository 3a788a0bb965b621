/*
 * Responsibility
 * - The "authenticated context" type handlers see
 * - The auth gate resolves the identity and stores it in request extensions;
 *   handlers only ever receive this type
 */
use crate::services::authority::UserIdentity;

/// Context attached to every request that passed the auth gate.
///
/// With auth disabled this carries the anonymous admin identity.
#[derive(Debug, Clone)]
pub struct AuthCtx {
    pub user: UserIdentity,
}

impl AuthCtx {
    pub fn new(user: UserIdentity) -> Self {
        Self { user }
    }
}
