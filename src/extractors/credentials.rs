//! Decode `Authorization: Basic|Bearer <base64(user:secret)>`.

use crate::service::Secret;
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Fields from an `Authorization` header. All `None` unless the header parsed cleanly.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Credentials {
    pub user: Option<String>,
    pub pass: Option<Secret>,
    pub auth_token: Option<Secret>,
}

/// Basic yields `{user, pass}`, Bearer yields `{user, auth_token}`. The scheme
/// is case-insensitive. Never fails: a missing marker, bad base64 or a missing
/// colon give empty credentials.
pub fn decipher_credentials(header: &str) -> Credentials {
    let Some((scheme, encoded)) = header.split_once(' ') else {
        return Credentials::default();
    };
    let bearer = if scheme.eq_ignore_ascii_case("Basic") {
        false
    } else if scheme.eq_ignore_ascii_case("Bearer") {
        true
    } else {
        return Credentials::default();
    };
    if encoded.is_empty() {
        return Credentials::default();
    }
    let Some(decoded) = STANDARD
        .decode(encoded.trim())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
    else {
        return Credentials::default();
    };
    let Some((user, secret)) = decoded.split_once(':') else {
        return Credentials::default();
    };
    let secret = Some(Secret::new(secret));
    let user = Some(user.to_string());
    if bearer {
        Credentials {
            user,
            auth_token: secret,
            pass: None,
        }
    } else {
        Credentials {
            user,
            pass: secret,
            auth_token: None,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Credentials
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(decipher_credentials)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(s: &str) -> String {
        STANDARD.encode(s)
    }

    #[test]
    fn basic_gives_user_and_pass() {
        let c = decipher_credentials(&format!("Basic {}", encode("master:open sesame")));
        assert_eq!(c.user.as_deref(), Some("master"));
        assert_eq!(c.pass.as_ref().map(Secret::expose), Some("open sesame"));
        assert_eq!(c.auth_token, None);
    }

    #[test]
    fn bearer_gives_user_and_token() {
        let c = decipher_credentials(&format!("Bearer {}", encode("master:abc:def")));
        assert_eq!(c.user.as_deref(), Some("master"));
        assert_eq!(c.auth_token.as_ref().map(Secret::expose), Some("abc:def"));
        assert_eq!(c.pass, None);
    }

    #[test]
    fn scheme_is_case_insensitive() {
        let c = decipher_credentials(&format!("basic {}", encode("master:pw")));
        assert_eq!(c.user.as_deref(), Some("master"));
        assert_eq!(c.pass.as_ref().map(Secret::expose), Some("pw"));
        let c = decipher_credentials(&format!("BEARER {}", encode("master:tok")));
        assert_eq!(c.auth_token.as_ref().map(Secret::expose), Some("tok"));
    }

    #[test]
    fn malformed_headers_give_nothing() {
        let cases = [
            String::new(),
            "Basic ".to_string(),
            "Basic".to_string(),
            "Digest abc".to_string(),
            "Basic !!!not-base64!!!".to_string(),
            format!("Basic {}", encode("no-colon-here")),
            format!("Basicx {}", encode("a:b")),
        ];
        for header in cases {
            assert_eq!(decipher_credentials(&header), Credentials::default(), "{header}");
        }
    }
}
