//! Byte-transparent forwarding to the document backend.
//!
//! Request bodies are streamed in bounded chunks and responses are streamed
//! back; neither direction is buffered whole. Redirects from the backend are
//! relayed to the caller, never followed.
pub mod headers;

use axum::{
    body::{Body, Bytes, HttpBody},
    http::{HeaderMap, Method},
    response::Response,
};
use futures_util::{Stream, StreamExt, stream};
use url::form_urlencoded;

use self::headers::{filter_request_headers, filter_response_headers};

/// Query parameter that may carry the caller's credential.
const TOKEN_PARAM: &str = "token";

#[derive(Clone, Debug)]
pub struct ForwardingProxy {
    http: reqwest::Client,
    base_url: String,
    chunk_size: usize,
}

impl ForwardingProxy {
    pub fn new(base_url: impl Into<String>, chunk_size: usize) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            chunk_size: chunk_size.max(1),
        })
    }

    /// Backend URL for `path` (relative to the backend root) and the caller's
    /// raw query string minus any `token` parameter.
    pub fn target_url(&self, path: &str, query: Option<&str>) -> String {
        let mut url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        if let Some(query) = query.map(strip_token_param).filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(&query);
        }
        url
    }

    /// Send one request to the backend and turn its reply into a response for
    /// the caller.
    ///
    /// The target is `<base>/<path>`, plus the caller's query string with the
    /// `token` parameter removed; a bare `<base>/<path>` would drop query
    /// arguments the backend may need.
    ///
    /// Transport failures are returned as-is; there are no retries. Dropping
    /// the returned future (caller went away) drops the backend request too.
    pub async fn forward(
        &self,
        method: Method,
        path: &str,
        query: Option<&str>,
        headers: &HeaderMap,
        body: Body,
    ) -> Result<Response, reqwest::Error> {
        let url = self.target_url(path, query);
        tracing::debug!(%method, %url, "forwarding request");

        let mut upstream = self
            .http
            .request(method, url)
            .headers(filter_request_headers(headers));

        if body.size_hint().exact() != Some(0) {
            let chunks = bounded_chunks(body, self.chunk_size);
            upstream = upstream.body(reqwest::Body::wrap_stream(chunks));
        }

        let upstream = upstream.send().await?;

        let status = upstream.status();
        let headers = filter_response_headers(upstream.headers());

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

/// Data frames of `body`, split so that no chunk exceeds `max` bytes.
pub fn bounded_chunks(
    body: Body,
    max: usize,
) -> impl Stream<Item = Result<Bytes, axum::Error>> + Send + 'static {
    body.into_data_stream().flat_map(move |frame| {
        let pieces = match frame {
            Ok(mut bytes) => {
                let mut pieces = Vec::with_capacity(bytes.len() / max + 1);
                while bytes.len() > max {
                    pieces.push(Ok(bytes.split_to(max)));
                }
                if !bytes.is_empty() {
                    pieces.push(Ok(bytes));
                }
                pieces
            }
            Err(err) => vec![Err(err)],
        };
        stream::iter(pieces)
    })
}

fn strip_token_param(query: &str) -> String {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            form_urlencoded::parse(pair.as_bytes())
                .next()
                .is_none_or(|(key, _)| key != TOKEN_PARAM)
        })
        .collect::<Vec<_>>()
        .join("&")
}
