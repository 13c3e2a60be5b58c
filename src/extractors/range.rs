//! `Range: ids=<start>-<end>` header.

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::RANGE, request::Parts},
};
use regex::Regex;
use std::sync::OnceLock;

/// Requested id bounds; either may be absent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RangeIds {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

fn pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)=(\d*)[-–](\d*)$").ok()).as_ref()
}

impl RangeIds {
    /// Empty or unparsable bounds become `None`.
    pub fn parse(header: &str) -> Self {
        let Some(caps) = pattern().and_then(|re| re.captures(header)) else {
            return Self::default();
        };
        let bound = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<i64>().ok());
        Self {
            start: bound(1),
            end: bound(2),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RangeIds
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .headers
            .get(RANGE)
            .and_then(|v| v.to_str().ok())
            .map(RangeIds::parse)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds() {
        assert_eq!(RangeIds::parse("ids=2-3"), RangeIds { start: Some(2), end: Some(3) });
        assert_eq!(RangeIds::parse("ids=4-"), RangeIds { start: Some(4), end: None });
        assert_eq!(RangeIds::parse("ids=-9"), RangeIds { start: None, end: Some(9) });
        assert_eq!(RangeIds::parse("ids=5–7"), RangeIds { start: Some(5), end: Some(7) });
    }

    #[test]
    fn garbage_is_unbounded() {
        assert_eq!(RangeIds::parse("bytes"), RangeIds::default());
        assert_eq!(RangeIds::parse("ids=a-b"), RangeIds::default());
    }
}
