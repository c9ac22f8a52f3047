//! Validated peer-swarm content identifiers

use std::fmt;

use super::SourceError;

/// Magnet-style identifier for swarm-delivered content.
///
/// Validated at construction so a malformed identifier is rejected when
/// sources are configured, not when a swarm add fails mid-playback. Keeps
/// the display name (when present) for logging.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerContentId {
    uri: String,
    display_name: Option<String>,
}

impl PeerContentId {
    /// Parses and validates a magnet-style URI.
    ///
    /// # Errors
    /// - `SourceError::InvalidPeerIdentifier` - Malformed magnet URI
    pub fn parse(uri: &str) -> Result<Self, SourceError> {
        let magnet =
            magnet_url::Magnet::new(uri).map_err(|e| SourceError::InvalidPeerIdentifier {
                reason: format!("invalid magnet link: {e}"),
            })?;

        Ok(Self {
            uri: uri.to_string(),
            display_name: magnet.display_name().map(|name| name.to_string()),
        })
    }

    /// Returns the raw URI handed to the peer transport.
    pub fn as_str(&self) -> &str {
        &self.uri
    }

    /// Returns the display name embedded in the identifier, if any.
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }
}

impl fmt::Display for PeerContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.display_name {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "{}", self.uri),
        }
    }
}
