//! Source data model: qualities, delivery candidates and container policy

pub mod peer_id;

use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use url::Url;

pub use peer_id::PeerContentId;

/// Errors in caller-supplied source configuration.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Invalid server URL {url}: {reason}")]
    InvalidServerUrl { url: String, reason: String },

    #[error("Invalid peer identifier: {reason}")]
    InvalidPeerIdentifier { reason: String },

    #[error("Malformed candidate for quality {quality}: {reason}")]
    MalformedCandidate { quality: String, reason: String },
}

/// Named playback tier mapped to an ordered list of delivery candidates.
///
/// Labels compare case-insensitively. Stored normalized to lowercase;
/// the display form handed to playback surfaces is uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Quality(String);

impl Quality {
    /// Creates a quality label, normalizing case.
    pub fn new(label: &str) -> Self {
        Self(label.to_lowercase())
    }

    /// Returns the normalized (lowercase) label.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the uppercase form used in surface source lists.
    pub fn display_label(&self) -> String {
        self.0.to_uppercase()
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_label())
    }
}

/// Media container format, derived from a candidate's media type.
///
/// Drives the member-file policy for peer delivery: the first swarm file
/// whose name matches the target container is the one rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    Mp4,
    WebM,
    Mkv,
    Avi,
    Mov,
    Unknown,
}

impl ContainerFormat {
    /// Detects the container format from a MIME media type.
    pub fn from_media_type(media_type: &str) -> Self {
        match media_type
            .split(';')
            .next()
            .unwrap_or(media_type)
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "video/mp4" => ContainerFormat::Mp4,
            "video/webm" => ContainerFormat::WebM,
            "video/x-matroska" => ContainerFormat::Mkv,
            "video/x-msvideo" => ContainerFormat::Avi,
            "video/quicktime" => ContainerFormat::Mov,
            _ => ContainerFormat::Unknown,
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ContainerFormat::Mp4 => "video/mp4",
            ContainerFormat::WebM => "video/webm",
            ContainerFormat::Mkv => "video/x-matroska",
            ContainerFormat::Avi => "video/x-msvideo",
            ContainerFormat::Mov => "video/quicktime",
            ContainerFormat::Unknown => "video/mp4", // Fallback
        }
    }

    /// Returns the file extension expected for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ContainerFormat::Mp4 => "mp4",
            ContainerFormat::WebM => "webm",
            ContainerFormat::Mkv => "mkv",
            ContainerFormat::Avi => "avi",
            ContainerFormat::Mov => "mov",
            ContainerFormat::Unknown => "mp4", // Fallback
        }
    }

    /// Checks whether a swarm member file name matches this container.
    pub fn matches_file_name(&self, name: &str) -> bool {
        let lowered = name.to_ascii_lowercase();
        lowered.ends_with(&format!(".{}", self.extension()))
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// One concrete delivery option for a quality.
///
/// A candidate with no peer identifier is server-only and is never routed
/// through the peer transport.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceCandidate {
    /// Conventional server delivery URL
    pub server_url: Url,
    /// MIME media type of the content
    pub media_type: String,
    /// Swarm identifier for peer delivery, when available
    pub peer_content: Option<PeerContentId>,
}

impl SourceCandidate {
    /// Creates a server-only candidate.
    pub fn server_only(server_url: Url, media_type: &str) -> Self {
        Self {
            server_url,
            media_type: media_type.to_string(),
            peer_content: None,
        }
    }

    /// Creates a candidate with both peer and server delivery paths.
    pub fn with_peer(server_url: Url, media_type: &str, peer_content: PeerContentId) -> Self {
        Self {
            server_url,
            media_type: media_type.to_string(),
            peer_content: Some(peer_content),
        }
    }

    /// Returns the container format implied by the media type.
    pub fn container_format(&self) -> ContainerFormat {
        ContainerFormat::from_media_type(&self.media_type)
    }
}

/// One entry of the flattened source list handed to the surface at creation.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceListing {
    /// Uppercase display label
    pub label: String,
    pub url: Url,
    pub media_type: String,
}

/// Raw candidate shape accepted from caller options.
#[derive(Debug, Deserialize)]
struct CandidateSpec {
    src: String,
    #[serde(rename = "type")]
    media_type: String,
    #[serde(default)]
    magnet: Option<String>,
}

/// Ordered mapping from quality labels to their candidate lists.
///
/// Order is caller-supplied and encodes nothing beyond presentation; the
/// fallback priority lives in each quality's candidate list.
#[derive(Debug, Clone, Default)]
pub struct SourceSet {
    entries: Vec<(Quality, Vec<SourceCandidate>)>,
}

impl SourceSet {
    /// Builds a source set from the raw `sources` option map.
    ///
    /// Each label maps to either a single candidate object or an array of
    /// them (fallback priority order). A candidate whose magnet fails to
    /// parse degrades to server-only with a warning rather than failing
    /// the whole configuration.
    ///
    /// # Errors
    /// - `SourceError::MalformedCandidate` - Candidate is not the expected shape
    /// - `SourceError::InvalidServerUrl` - Server URL does not parse
    pub fn from_options(raw: &serde_json::Map<String, Value>) -> Result<Self, SourceError> {
        let mut entries = Vec::with_capacity(raw.len());

        for (label, value) in raw {
            let quality = Quality::new(label);
            let specs: Vec<CandidateSpec> = match value {
                Value::Array(_) => serde_json::from_value(value.clone()).map_err(|e| {
                    SourceError::MalformedCandidate {
                        quality: label.clone(),
                        reason: e.to_string(),
                    }
                })?,
                _ => {
                    let spec = serde_json::from_value(value.clone()).map_err(|e| {
                        SourceError::MalformedCandidate {
                            quality: label.clone(),
                            reason: e.to_string(),
                        }
                    })?;
                    vec![spec]
                }
            };

            if specs.is_empty() {
                return Err(SourceError::MalformedCandidate {
                    quality: label.clone(),
                    reason: "empty candidate list".to_string(),
                });
            }

            let mut candidates = Vec::with_capacity(specs.len());
            for spec in specs {
                candidates.push(Self::candidate_from_spec(&quality, spec)?);
            }

            entries.push((quality, candidates));
        }

        Ok(Self { entries })
    }

    fn candidate_from_spec(
        quality: &Quality,
        spec: CandidateSpec,
    ) -> Result<SourceCandidate, SourceError> {
        let server_url = Url::parse(&spec.src).map_err(|e| SourceError::InvalidServerUrl {
            url: spec.src.clone(),
            reason: e.to_string(),
        })?;

        let peer_content = match spec.magnet.as_deref() {
            Some(uri) => match PeerContentId::parse(uri) {
                Ok(id) => Some(id),
                Err(error) => {
                    tracing::warn!(
                        quality = %quality,
                        %error,
                        "Invalid peer identifier, candidate degraded to server-only"
                    );
                    None
                }
            },
            None => None,
        };

        Ok(SourceCandidate {
            server_url,
            media_type: spec.media_type,
            peer_content,
        })
    }

    /// Returns the candidate list for a quality, if configured.
    pub fn candidates(&self, quality: &Quality) -> Option<&[SourceCandidate]> {
        self.entries
            .iter()
            .find(|(q, _)| q == quality)
            .map(|(_, candidates)| candidates.as_slice())
    }

    /// Returns the first configured quality, in caller order.
    pub fn first_quality(&self) -> Option<&Quality> {
        self.entries.first().map(|(quality, _)| quality)
    }

    /// Resolves a preferred label to a configured quality.
    ///
    /// Unknown labels fall back to the first configured quality with a
    /// warning, tolerating arbitrary preference strings.
    pub fn resolve_preferred(&self, label: &str) -> Option<&Quality> {
        let wanted = Quality::new(label);
        if let Some((quality, _)) = self.entries.iter().find(|(q, _)| *q == wanted) {
            return Some(quality);
        }

        if let Some(first) = self.first_quality() {
            tracing::warn!(
                preferred = label,
                fallback = %first,
                "Preferred quality not configured, using first configured quality"
            );
            return Some(first);
        }

        None
    }

    /// Flattened initial source list: first candidate per quality.
    pub fn initial_listing(&self) -> Vec<SourceListing> {
        self.entries
            .iter()
            .filter_map(|(quality, candidates)| {
                candidates.first().map(|candidate| SourceListing {
                    label: quality.display_label(),
                    url: candidate.server_url.clone(),
                    media_type: candidate.media_type.clone(),
                })
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
