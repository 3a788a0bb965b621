/*
 * Responsibility
 * - GET <prefix>/oauth_callback (return leg of the OAuth login)
 * - Check the returned state against the state cookie, exchange the code,
 *   store the token in the session, send the user back where they started
 */
use axum::{
    extract::{Query, State},
    http::{HeaderMap, header},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::error::AppError;
use crate::services::session::find_cookie;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
}

pub async fn oauth_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let code = params.code.ok_or(AppError::MissingCode)?;

    let authority = state.authority.as_deref().ok_or(AppError::AuthUnavailable)?;

    // Exact comparison with the cookie value is the only CSRF defence here
    let cookie_state = find_cookie(&headers, authority.state_cookie_name());
    let cookie_state = match (params.state.as_deref(), cookie_state) {
        (Some(arg), Some(cookie)) if !arg.is_empty() && arg == cookie => cookie,
        _ => {
            tracing::warn!("oauth callback state mismatch");
            return Err(AppError::InvalidState);
        }
    };

    let token = authority.exchange_code(&code).await.map_err(|err| {
        tracing::warn!(error = %err, "oauth code exchange failed");
        AppError::Authority(err)
    })?;

    let session_cookie = state.sessions.set(&token).map_err(|_| AppError::Internal)?;
    let cleared_state = state
        .sessions
        .expire_cookie(authority.state_cookie_name())
        .map_err(|_| AppError::Internal)?;

    let next_url = authority
        .next_url_for_state(&cookie_state)
        .unwrap_or_else(|| state.config.root_path());

    tracing::info!(next_url = %next_url, "login completed");

    Ok((
        AppendHeaders([
            (header::SET_COOKIE, session_cookie),
            (header::SET_COOKIE, cleared_state),
        ]),
        Redirect::to(&next_url),
    )
        .into_response())
}
