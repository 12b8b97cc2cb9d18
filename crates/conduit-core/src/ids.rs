use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

const REQUEST_PREFIX: &str = "req";

/// Tags one request's origin, relay and consumer logs.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    pub fn new() -> Self {
        Self(format!("{REQUEST_PREFIX}_{}", Uuid::now_v7()))
    }

    /// Adopt an id minted elsewhere, e.g. taken from an inbound header.
    pub fn from_raw(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_id_has_prefix() {
        let id = RequestId::new();
        assert!(id.as_str().starts_with("req_"), "got: {id}");
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(RequestId::new(), RequestId::new());
    }

    #[test]
    fn from_raw_keeps_text() {
        let id = RequestId::from_raw("req_custom");
        assert_eq!(id.to_string(), "req_custom");
    }

    #[test]
    fn serde_is_transparent() {
        let id = RequestId::from_raw("req_1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"req_1\"");
    }
}
