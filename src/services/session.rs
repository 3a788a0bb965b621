//! Signed client-side session holding the broker token.
//!
//! Cookie value: `base64url(json payload) "." base64url(hmac-sha256(payload))`.
//! The server keeps nothing; integrity rests entirely on the signing secret,
//! so changing the secret invalidates every session at once.
use axum::http::{HeaderMap, HeaderValue, header};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use cookie::{Cookie, SameSite};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::services::authority::{Credential, StateNonce};

pub const SESSION_COOKIE_NAME: &str = "docservice-session";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid session signing key")]
    InvalidKey,
    #[error("session cookie is not a valid header value")]
    InvalidHeader,
}

#[derive(Serialize, Deserialize)]
struct SessionPayload {
    token: String,
}

/// Reads and writes the session cookie. Cheap to clone; holds no per-request state.
#[derive(Clone)]
pub struct SessionStore {
    mac: HmacSha256,
    secure: bool,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("SessionStore")
            .field("secure", &self.secure)
            .finish()
    }
}

impl SessionStore {
    pub fn new(secret: &[u8], secure: bool) -> Result<Self, SessionError> {
        if secret.is_empty() {
            return Err(SessionError::InvalidKey);
        }
        let mac = HmacSha256::new_from_slice(secret).map_err(|_| SessionError::InvalidKey)?;
        Ok(Self { mac, secure })
    }

    /// Token stored in the request's session cookie, if present and untampered.
    pub fn get(&self, headers: &HeaderMap) -> Option<Credential> {
        let value = find_cookie(headers, SESSION_COOKIE_NAME)?;
        self.decode(&value)
    }

    /// `Set-Cookie` header value storing `credential` in the session.
    pub fn set(&self, credential: &Credential) -> Result<HeaderValue, SessionError> {
        let cookie = Cookie::build((SESSION_COOKIE_NAME, self.encode(credential)))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .build();

        HeaderValue::from_str(&cookie.to_string()).map_err(|_| SessionError::InvalidHeader)
    }

    /// `Set-Cookie` header value carrying a login state nonce.
    pub fn state_cookie(&self, name: &str, state: &StateNonce) -> Result<HeaderValue, SessionError> {
        let cookie = Cookie::build((name, state.as_str()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .build();

        HeaderValue::from_str(&cookie.to_string()).map_err(|_| SessionError::InvalidHeader)
    }

    /// `Set-Cookie` header value expiring the named cookie immediately.
    pub fn expire_cookie(&self, name: &str) -> Result<HeaderValue, SessionError> {
        let cookie = Cookie::build((name, ""))
            .path("/")
            .max_age(cookie::time::Duration::seconds(0))
            .build();

        HeaderValue::from_str(&cookie.to_string()).map_err(|_| SessionError::InvalidHeader)
    }

    fn encode(&self, credential: &Credential) -> String {
        let payload = SessionPayload {
            token: credential.as_str().to_string(),
        };
        let json = serde_json::to_vec(&payload).unwrap_or_default();
        let body = URL_SAFE_NO_PAD.encode(json);
        let signature = URL_SAFE_NO_PAD.encode(self.sign(body.as_bytes()));
        format!("{}.{}", body, signature)
    }

    fn decode(&self, value: &str) -> Option<Credential> {
        let (body, signature) = value.split_once('.')?;
        let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;

        let mut mac = self.mac.clone();
        mac.update(body.as_bytes());
        if mac.verify_slice(&signature).is_err() {
            tracing::debug!("session cookie signature mismatch");
            return None;
        }

        let json = URL_SAFE_NO_PAD.decode(body).ok()?;
        let payload: SessionPayload = serde_json::from_slice(&json).ok()?;
        if payload.token.is_empty() {
            return None;
        }
        Some(Credential::new(payload.token))
    }

    fn sign(&self, data: &[u8]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(data);
        mac.finalize().into_bytes().to_vec()
    }
}

/// Value of the named cookie from the request's `Cookie` headers.
///
/// Malformed cookie pairs are skipped, never fatal.
pub fn find_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == name)
        .map(|c| c.value().to_string())
}
