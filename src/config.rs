/*
 * Responsibility
 * - Read process-wide settings from the environment (backend URL, auth bypass,
 *   session secret, route prefix, identity broker settings)
 * - Validate values at startup (fail to boot on anything malformed)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use rand::RngCore;
use url::Url;

/// Scope an identity must hold to reach the document backend.
pub const DEFAULT_REQUIRED_SCOPE: &str = "access:docservice!service=docservice";

/// Upper bound for a single body chunk forwarded to the backend.
pub const DEFAULT_CHUNK_SIZE: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Connection settings for the JupyterHub identity broker.
///
/// Present only when `JUPYTERHUB_API_TOKEN` is set; without it every
/// protected request answers with the configuration-fault response.
#[derive(Clone)]
pub struct HubConfig {
    pub api_url: String,
    pub api_token: String,
    pub host: String,
    pub base_url: String,
    pub client_id: String,
    pub redirect_uri: String,
}

impl fmt::Debug for HubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print the API token
        f.debug_struct("HubConfig")
            .field("api_url", &self.api_url)
            .field("host", &self.host)
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

#[derive(Clone)]
pub struct Config {
    pub addr: SocketAddr,

    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,

    // Backend base URL, without trailing slash
    pub doc_url: String,
    pub disable_all_auth: bool,
    pub session_secret: Vec<u8>,
    // Route prefix, empty or starting with '/', never ending with '/'
    pub url_prefix: String,
    pub required_scope: String,
    pub chunk_size: usize,

    pub hub: Option<HubConfig>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print the session secret
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("app_env", &self.app_env)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("doc_url", &self.doc_url)
            .field("disable_all_auth", &self.disable_all_auth)
            .field("url_prefix", &self.url_prefix)
            .field("required_scope", &self.required_scope)
            .field("chunk_size", &self.chunk_size)
            .field("hub", &self.hub)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5002);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::from_env();

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let doc_url = normalize_doc_url(
            &std::env::var("DOC_URL").unwrap_or_else(|_| "http://lst-doc:80".to_string()),
        )?;

        let disable_all_auth = std::env::var("CTADS_DISABLE_ALL_AUTH")
            .map(|v| parse_flag(&v))
            .unwrap_or(false);

        let session_secret = match std::env::var("SESSION_SECRET") {
            Ok(secret) if !secret.is_empty() => secret.into_bytes(),
            Ok(_) => return Err(ConfigError::Invalid("SESSION_SECRET")),
            Err(_) => {
                tracing::warn!(
                    "SESSION_SECRET not set; using a random secret, sessions will not survive a restart"
                );
                random_secret()
            }
        };

        let url_prefix = normalize_prefix(
            &std::env::var("JUPYTERHUB_SERVICE_PREFIX").unwrap_or_default(),
        );

        let required_scope = std::env::var("DOCSERVICE_REQUIRED_SCOPE")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REQUIRED_SCOPE.to_string());

        let hub = hub_from_env(&url_prefix)?;
        if hub.is_none() && !disable_all_auth {
            tracing::warn!("auth system not configured (JUPYTERHUB_API_TOKEN missing)");
        }

        Ok(Self {
            addr,
            app_env,
            cors_allowed_origins,
            doc_url,
            disable_all_auth,
            session_secret,
            url_prefix,
            required_scope,
            chunk_size: DEFAULT_CHUNK_SIZE,
            hub,
        })
    }

    /// Root path of the service, used as the fallback redirect target.
    pub fn root_path(&self) -> String {
        format!("{}/", self.url_prefix)
    }
}

fn hub_from_env(url_prefix: &str) -> Result<Option<HubConfig>, ConfigError> {
    let api_token = match std::env::var("JUPYTERHUB_API_TOKEN") {
        Ok(token) if !token.trim().is_empty() => token,
        _ => return Ok(None),
    };

    let api_url = std::env::var("JUPYTERHUB_API_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:8081/hub/api".to_string())
        .trim_end_matches('/')
        .to_string();
    Url::parse(&api_url).map_err(|_| ConfigError::Invalid("JUPYTERHUB_API_URL"))?;

    let host = std::env::var("JUPYTERHUB_HOST")
        .unwrap_or_default()
        .trim_end_matches('/')
        .to_string();

    let mut base_url = std::env::var("JUPYTERHUB_BASE_URL").unwrap_or_else(|_| "/".to_string());
    if !base_url.ends_with('/') {
        base_url.push('/');
    }

    let client_id = std::env::var("JUPYTERHUB_CLIENT_ID")
        .unwrap_or_else(|_| "service-docservice".to_string());

    let redirect_uri = std::env::var("JUPYTERHUB_OAUTH_CALLBACK_URL")
        .unwrap_or_else(|_| format!("{}/oauth_callback", url_prefix));

    Ok(Some(HubConfig {
        api_url,
        api_token,
        host,
        base_url,
        client_id,
        redirect_uri,
    }))
}

fn normalize_doc_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_matches('/');
    Url::parse(trimmed).map_err(|_| ConfigError::Invalid("DOC_URL"))?;
    Ok(trimmed.to_string())
}

fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() || trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1")
}

fn random_secret() -> Vec<u8> {
    let mut secret = vec![0u8; 32];
    rand::rng().fill_bytes(&mut secret);
    secret
}
