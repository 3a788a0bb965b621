//! Credential lookup: session cookie, then `?token=`, then `Authorization: Bearer`.
use axum::http::{HeaderMap, Uri, header};
use url::form_urlencoded;

use crate::services::{authority::Credential, session::SessionStore};

/// Where a credential was found. Used for logging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Session,
    Query,
    Header,
}

/// First credential found in precedence order, if any.
///
/// Never fails: an unreadable or non-`Bearer` authorization header counts as
/// no credential at all.
pub fn extract(
    sessions: &SessionStore,
    headers: &HeaderMap,
    uri: &Uri,
) -> Option<(Credential, CredentialSource)> {
    if let Some(token) = sessions.get(headers) {
        return Some((token, CredentialSource::Session));
    }
    if let Some(token) = query_token(uri) {
        return Some((token, CredentialSource::Query));
    }
    bearer_token(headers).map(|token| (token, CredentialSource::Header))
}

fn query_token(uri: &Uri) -> Option<Credential> {
    let query = uri.query()?;
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
        .map(Credential::new)
}

fn bearer_token(headers: &HeaderMap) -> Option<Credential> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(Credential::new(token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    use crate::services::session::SESSION_COOKIE_NAME;

    fn sessions() -> SessionStore {
        SessionStore::new(b"test-secret", false).unwrap()
    }

    fn session_cookie(store: &SessionStore, token: &str) -> HeaderValue {
        let set_cookie = store.set(&Credential::new(token)).unwrap();
        let value = set_cookie.to_str().unwrap();
        let pair = value.split(';').next().unwrap();
        assert!(pair.starts_with(SESSION_COOKIE_NAME));
        HeaderValue::from_str(pair).unwrap()
    }

    #[test]
    fn session_wins_over_query_and_header() {
        let store = sessions();
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, session_cookie(&store, "from-session"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        let uri: Uri = "/doc?token=from-query".parse().unwrap();

        let (token, source) = extract(&store, &headers, &uri).unwrap();
        assert_eq!(token.as_str(), "from-session");
        assert_eq!(source, CredentialSource::Session);
    }

    #[test]
    fn query_wins_over_header() {
        let store = sessions();
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        let uri: Uri = "/doc?page=1&token=from%20query".parse().unwrap();

        let (token, source) = extract(&store, &headers, &uri).unwrap();
        assert_eq!(token.as_str(), "from query");
        assert_eq!(source, CredentialSource::Query);
    }

    #[test]
    fn bearer_header_is_last_resort() {
        let store = sessions();
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        let uri: Uri = "/doc".parse().unwrap();

        let (token, source) = extract(&store, &headers, &uri).unwrap();
        assert_eq!(token.as_str(), "abc123");
        assert_eq!(source, CredentialSource::Header);
    }

    #[test]
    fn malformed_authorization_is_treated_as_absent() {
        let store = sessions();
        let uri: Uri = "/doc?token=".parse().unwrap();

        for value in ["Basic dXNlcjpwYXNz", "Bearer", "Bearer   ", "bearer abc", "abc123"] {
            let mut headers = HeaderMap::new();
            headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
            assert!(extract(&store, &headers, &uri).is_none(), "{value}");
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_bytes(b"Bearer \xff\xfe").unwrap(),
        );
        assert!(extract(&store, &headers, &uri).is_none());
    }

    #[test]
    fn forged_session_falls_through_to_next_source() {
        let store = sessions();
        let other = SessionStore::new(b"other-secret", false).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, session_cookie(&other, "forged"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer real"));
        let uri: Uri = "/doc".parse().unwrap();

        let (token, source) = extract(&store, &headers, &uri).unwrap();
        assert_eq!(token.as_str(), "real");
        assert_eq!(source, CredentialSource::Header);
    }
}
