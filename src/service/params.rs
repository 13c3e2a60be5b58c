//! Request parameters handed to a service method.

use serde_json::Value;
use std::fmt;

/// A credential that must never reach a log line or a response body.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Route params merged with body and header params.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Params {
    pub id: Option<i64>,
    pub start: Option<i64>,
    pub end: Option<i64>,
    /// Request body, expected to be an array of records.
    pub records: Option<Value>,
    pub user_id: Option<String>,
    pub auth_token: Option<Secret>,
    pub plainword: Option<Secret>,
}

impl Params {
    /// Copy with every secret stripped; the only form an Outcome keeps.
    pub fn redacted(&self) -> Self {
        Self {
            auth_token: None,
            plainword: None,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_stripped_and_hidden() {
        let params = Params {
            id: Some(3),
            user_id: Some("master".into()),
            auth_token: Some(Secret::new("tok")),
            plainword: Some(Secret::new("pw")),
            ..Params::default()
        };
        assert!(!format!("{:?}", params).contains("pw"));
        let clean = params.redacted();
        assert_eq!(clean.auth_token, None);
        assert_eq!(clean.plainword, None);
        assert_eq!(clean.id, Some(3));
        assert_eq!(clean.user_id.as_deref(), Some("master"));
    }
}
