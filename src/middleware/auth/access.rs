//! Auth gate: every proxied request passes through here first.
//!
//! Per request:
//! - auth globally disabled -> anonymous admin, straight through
//! - broker not configured -> 500 (configuration fault)
//! - no credential, or the broker cannot resolve it -> login redirect + state cookie
//! - resolved but missing the required scope -> 403, never proxied
//! - resolved and scoped -> `AuthCtx` in request extensions, handler runs

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Request, Uri, header},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
};

use crate::api::extractors::AuthCtx;
use crate::error::AppError;
use crate::middleware::auth::credential;
use crate::services::authority::{AuthorityClient, UserIdentity};
use crate::state::AppState;

/// Put the auth gate in front of every route of `router`.
///
/// ```ignore
/// let proxied = Router::new().route("/{*path}", any(proxy));
/// let proxied = middleware::auth::access::apply(proxied, state.clone());
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.route_layer(middleware::from_fn_with_state(state, access_middleware))
}

/// Outcome of the gate for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    Disabled(UserIdentity),
    Unauthenticated,
    CredentialPresentNoScope(UserIdentity),
    Authorized(UserIdentity),
}

/// Decide what happens to a request without producing a response yet.
pub async fn evaluate(
    state: &AppState,
    headers: &HeaderMap,
    uri: &Uri,
) -> Result<GateState, AppError> {
    if state.config.disable_all_auth {
        return Ok(GateState::Disabled(UserIdentity::anonymous_admin()));
    }

    let authority = state.authority.as_deref().ok_or(AppError::AuthUnavailable)?;

    let Some((token, source)) = credential::extract(&state.sessions, headers, uri) else {
        return Ok(GateState::Unauthenticated);
    };

    let Some(user) = authority.resolve(&token).await else {
        tracing::debug!(?source, "credential could not be resolved");
        return Ok(GateState::Unauthenticated);
    };

    if !authority.has_scope(&user, &state.config.required_scope) {
        return Ok(GateState::CredentialPresentNoScope(user));
    }

    tracing::debug!(user = %user.name, ?source, "request authorized");
    Ok(GateState::Authorized(user))
}

async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let user = match evaluate(&state, req.headers(), req.uri()).await? {
        GateState::Disabled(user) | GateState::Authorized(user) => user,
        GateState::CredentialPresentNoScope(user) => {
            tracing::warn!(user = %user.name, scope = %state.config.required_scope, "access denied");
            return Err(AppError::InsufficientScope);
        }
        GateState::Unauthenticated => {
            let authority = state.authority.as_deref().ok_or(AppError::AuthUnavailable)?;
            return login_redirect(&state, authority, req.uri().path());
        }
    };

    // middleware -> extractor hand-off
    req.extensions_mut().insert(AuthCtx::new(user));

    Ok(next.run(req).await)
}

/// Redirect to the broker's login page, remembering `path` in a state nonce.
fn login_redirect(
    state: &AppState,
    authority: &dyn AuthorityClient,
    path: &str,
) -> Result<Response, AppError> {
    let nonce = authority.generate_state(path);
    let cookie = state
        .sessions
        .state_cookie(authority.state_cookie_name(), &nonce)
        .map_err(|_| AppError::Internal)?;

    tracing::info!(next_url = %path, "redirecting to login");

    let mut res = Redirect::to(&authority.login_url(&nonce)).into_response();
    res.headers_mut().append(header::SET_COOKIE, cookie);
    Ok(res)
}
