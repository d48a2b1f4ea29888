//! Peer identity.
//!
//! An opaque string, either supplied at session construction or assigned by
//! the transport when it reaches its signaling service. Reused verbatim on
//! reconnect.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Opaque peer identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PeerId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for PeerId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PeerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_roundtrip() {
        let id = PeerId::new("c89114fc-c0c4-4578-b9ef-7f77ca8d3773");
        let id2: PeerId = id.to_string().parse().unwrap();
        assert_eq!(id, id2);
    }

    #[test]
    fn serde_transparent() {
        let id = PeerId::new("mario");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"mario\"");
    }
}
