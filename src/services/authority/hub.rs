//! JupyterHub-backed `AuthorityClient`.
//!
//! Token lookup and the authorization-code exchange go over the Hub REST API.
//! State nonces are self-describing (base64url JSON carrying the next url), so
//! the Hub side needs no storage for them.
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;
use uuid::Uuid;

use crate::config::HubConfig;
use crate::services::authority::client::{
    AuthorityClient, AuthorityError, Credential, StateNonce, UserIdentity,
};

#[derive(Debug, Serialize, Deserialize)]
struct EncodedState {
    uuid: String,
    next_url: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

pub struct HubAuthority {
    http: reqwest::Client,
    config: HubConfig,
    state_cookie_name: String,
}

impl HubAuthority {
    pub fn new(config: HubConfig) -> Result<Self, AuthorityError> {
        let http = reqwest::Client::builder().build()?;
        let state_cookie_name = format!("{}-oauth-state", config.client_id);

        Ok(Self {
            http,
            config,
            state_cookie_name,
        })
    }

    fn authorize_url(&self) -> String {
        format!(
            "{}{}hub/api/oauth2/authorize",
            self.config.host, self.config.base_url
        )
    }
}

#[async_trait]
impl AuthorityClient for HubAuthority {
    async fn resolve(&self, credential: &Credential) -> Option<UserIdentity> {
        let res = self
            .http
            .get(format!("{}/user", self.config.api_url))
            .header(
                reqwest::header::AUTHORIZATION,
                format!("token {}", credential.as_str()),
            )
            .send()
            .await;

        let res = match res {
            Ok(res) => res,
            Err(err) => {
                tracing::warn!(error = %err, "hub user lookup failed");
                return None;
            }
        };

        match res.status() {
            StatusCode::OK => match res.json::<UserIdentity>().await {
                Ok(user) => Some(user),
                Err(err) => {
                    tracing::warn!(error = %err, "hub user lookup returned an invalid payload");
                    None
                }
            },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                tracing::debug!(status = %res.status(), "hub rejected token");
                None
            }
            status => {
                tracing::warn!(status = %status, "unexpected hub response for user lookup");
                None
            }
        }
    }

    async fn exchange_code(&self, code: &str) -> Result<Credential, AuthorityError> {
        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.api_token.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        let res = self
            .http
            .post(format!("{}/oauth2/token", self.config.api_url))
            .form(&form)
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(AuthorityError::Rejected(res.status().as_u16()));
        }

        let body: TokenResponse = res
            .json()
            .await
            .map_err(|_| AuthorityError::InvalidResponse)?;

        Ok(Credential::new(body.access_token))
    }

    fn generate_state(&self, next_url: &str) -> StateNonce {
        let state = EncodedState {
            uuid: Uuid::new_v4().simple().to_string(),
            next_url: next_url.to_string(),
        };
        // Serializing two strings cannot fail
        let json = serde_json::to_vec(&state).unwrap_or_default();
        StateNonce::new(URL_SAFE_NO_PAD.encode(json))
    }

    fn next_url_for_state(&self, state: &str) -> Option<String> {
        let raw = URL_SAFE_NO_PAD.decode(state.trim_end_matches('=')).ok()?;
        let decoded: EncodedState = serde_json::from_slice(&raw).ok()?;

        // Only local absolute paths; anything else could be an open redirect
        let next_url = decoded.next_url;
        if next_url.starts_with('/') && !next_url.starts_with("//") {
            Some(next_url)
        } else {
            tracing::warn!("discarding non-local next url from oauth state");
            None
        }
    }

    fn login_url(&self, state: &StateNonce) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("state", state.as_str())
            .finish();

        format!("{}?{}", self.authorize_url(), query)
    }

    fn state_cookie_name(&self) -> &str {
        &self.state_cookie_name
    }
}
