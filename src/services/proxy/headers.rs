//! Header filtering for the forwarding leg.
use axum::http::{HeaderMap, HeaderName, header};

/// Hop-by-hop headers (RFC 2616 section 13.5.1) plus the framing headers the
/// transport recomputes. Stripped in both directions.
pub const HOP_BY_HOP: [HeaderName; 10] = [
    header::CONTENT_ENCODING,
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    HeaderName::from_static("trailers"),
    header::UPGRADE,
];

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(name)
}

/// Headers to send to the backend: hop-by-hop headers, `host` and the
/// caller's `authorization` are dropped, everything else passes unchanged.
pub fn filter_request_headers(headers: &HeaderMap) -> HeaderMap {
    copy_except(headers, |name| {
        *name == header::HOST || *name == header::AUTHORIZATION || is_hop_by_hop(name)
    })
}

/// Headers to relay to the caller: only hop-by-hop headers are dropped.
pub fn filter_response_headers(headers: &HeaderMap) -> HeaderMap {
    copy_except(headers, is_hop_by_hop)
}

fn copy_except(headers: &HeaderMap, skip: impl Fn(&HeaderName) -> bool) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if !skip(name) {
            // append keeps repeated headers such as set-cookie
            out.append(name.clone(), value.clone());
        }
    }
    out
}
