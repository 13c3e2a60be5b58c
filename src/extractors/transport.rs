//! Whether a request arrived over TLS.

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

/// TLS terminates at a proxy, which reports the original scheme here.
/// Clients can send it too, so it only counts when the proxy is trusted.
pub const FORWARDED_PROTO_HEADER: &str = "X-Forwarded-Proto";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transport {
    pub forwarded_https: bool,
    pub scheme_https: bool,
}

impl Transport {
    pub fn is_secure(&self, trust_proxy: bool) -> bool {
        self.scheme_https || (trust_proxy && self.forwarded_https)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Transport
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded_https = parts
            .headers
            .get(FORWARDED_PROTO_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim().eq_ignore_ascii_case("https"))
            .unwrap_or(false);
        Ok(Transport {
            forwarded_https,
            scheme_https: parts.uri.scheme_str() == Some("https"),
        })
    }
}
