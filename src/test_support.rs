//! Shared fixtures for unit tests: in-process servers, a fake broker, configs.
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::{
    Router,
    body::to_bytes,
    extract::Request,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use uuid::Uuid;

use crate::app::build_state;
use crate::config::{AppEnv, Config, DEFAULT_REQUIRED_SCOPE};
use crate::services::authority::{
    AuthorityClient, AuthorityError, Credential, StateNonce, UserIdentity,
};
use crate::state::AppState;

pub const STATE_COOKIE: &str = "service-docservice-oauth-state";

/// Serve `router` on an ephemeral local port for the rest of the test.
pub async fn spawn_server(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    addr
}

/// Stub document backend that counts the requests reaching it.
pub struct CountingBackend {
    pub url: String,
    pub calls: Arc<AtomicUsize>,
}

/// `/reports/q1.pdf` answers with a PDF; anything else answers
/// `"<METHOD> <path?query> <body>"` as plain text.
pub async fn spawn_counting_backend() -> CountingBackend {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let router = Router::new().fallback(move |req: Request| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            backend_reply(req).await
        }
    });

    let addr = spawn_server(router).await;
    CountingBackend {
        url: format!("http://{}", addr),
        calls,
    }
}

async fn backend_reply(req: Request) -> Response {
    let (parts, body) = req.into_parts();
    if parts.uri.path() == "/reports/q1.pdf" {
        return ([(header::CONTENT_TYPE, "application/pdf")], "%PDF-1.4...").into_response();
    }

    let body = to_bytes(body, usize::MAX).await.unwrap();
    let text = format!(
        "{} {} {}",
        parts.method,
        parts.uri,
        String::from_utf8_lossy(&body)
    );
    (StatusCode::OK, text.trim_end().to_string()).into_response()
}

/// In-memory `AuthorityClient` with fixed tokens and codes.
#[derive(Default)]
pub struct FakeAuthority {
    users: HashMap<String, UserIdentity>,
    codes: HashMap<String, String>,
}

impl FakeAuthority {
    pub const LOGIN_URL: &'static str = "https://hub.test/hub/api/oauth2/authorize";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, token: &str, name: &str, scopes: &[&str]) -> Self {
        self.users.insert(
            token.to_string(),
            UserIdentity {
                name: name.to_string(),
                admin: false,
                scopes: scopes.iter().map(|s| s.to_string()).collect(),
            },
        );
        self
    }

    pub fn with_code(mut self, code: &str, token: &str) -> Self {
        self.codes.insert(code.to_string(), token.to_string());
        self
    }
}

#[async_trait]
impl AuthorityClient for FakeAuthority {
    async fn resolve(&self, credential: &Credential) -> Option<UserIdentity> {
        self.users.get(credential.as_str()).cloned()
    }

    async fn exchange_code(&self, code: &str) -> Result<Credential, AuthorityError> {
        self.codes
            .get(code)
            .map(Credential::new)
            .ok_or(AuthorityError::Rejected(400))
    }

    fn generate_state(&self, next_url: &str) -> StateNonce {
        StateNonce::new(format!(
            "{}.{}",
            Uuid::new_v4().simple(),
            URL_SAFE_NO_PAD.encode(next_url)
        ))
    }

    fn next_url_for_state(&self, state: &str) -> Option<String> {
        let (_, encoded) = state.split_once('.')?;
        let raw = URL_SAFE_NO_PAD.decode(encoded).ok()?;
        String::from_utf8(raw).ok()
    }

    fn login_url(&self, state: &StateNonce) -> String {
        format!("{}?state={}", Self::LOGIN_URL, state.as_str())
    }

    fn state_cookie_name(&self) -> &str {
        STATE_COOKIE
    }
}

/// Auth enabled, no prefix, backend at `doc_url`.
pub fn test_config(doc_url: &str) -> Config {
    Config {
        addr: "127.0.0.1:0".parse().unwrap(),
        app_env: AppEnv::Development,
        cors_allowed_origins: Vec::new(),
        doc_url: doc_url.trim_end_matches('/').to_string(),
        disable_all_auth: false,
        session_secret: b"test-session-secret".to_vec(),
        url_prefix: String::new(),
        required_scope: DEFAULT_REQUIRED_SCOPE.to_string(),
        chunk_size: 1024,
        hub: None,
    }
}

/// State for `config`, with `authority` injected in place of a real broker.
pub fn test_state(config: Config, authority: Option<FakeAuthority>) -> AppState {
    let mut state = build_state(config).unwrap();
    state.authority = authority.map(|a| Arc::new(a) as Arc<dyn AuthorityClient>);
    state
}
