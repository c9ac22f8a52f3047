//! Breakwater Core - Media playback orchestration with peer-swarm fallback
//!
//! This crate provides the building blocks for resilient browser-style media
//! playback: a capability gate for optional/required external scripts, a
//! peer-swarm session manager, and the source resolution engine that walks
//! a quality's candidate list when playback fails.

pub mod ads;
pub mod capability;
pub mod config;
pub mod peer;
pub mod player;
pub mod resolve;
pub mod source;
pub mod surface;

// Re-export main types for convenient access
pub use capability::{CapabilityGate, DependencyError, ScriptLoader, ScriptRequirement};
pub use config::{BreakwaterConfig, PlayerOptions};
pub use peer::{PeerSession, PeerSessionError, PeerSessionManager, PeerTransport, SwarmFile};
pub use player::Player;
pub use resolve::{SelectionPhase, SourceResolver};
pub use source::{Quality, SourceCandidate, SourceError, SourceSet};
pub use surface::{ElementId, PlaybackErrorKind, PlaybackSurface, SurfaceError, SurfaceFactory};

/// Core errors that can bubble up from any Breakwater subsystem.
///
/// High-level error types representing failures in player construction
/// and orchestration. Peer-path failures never appear here; they are
/// recovered internally by degrading to server delivery.
#[derive(Debug, thiserror::Error)]
pub enum BreakwaterError {
    #[error("Dependency error: {0}")]
    Dependency(#[from] DependencyError),

    #[error("Surface error: {0}")]
    Surface(#[from] SurfaceError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Peer session error: {0}")]
    PeerSession(#[from] PeerSessionError),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("Unknown quality: {label}")]
    UnknownQuality { label: String },

    #[error("No sources configured")]
    NoSourcesConfigured,
}

impl BreakwaterError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            BreakwaterError::Dependency(e) => match e {
                DependencyError::RequiredScriptFailed { url, .. } => {
                    format!("A required player component failed to load: {url}")
                }
            },
            BreakwaterError::Surface(_) => "The player could not be created".to_string(),
            BreakwaterError::Source(e) => format!("Invalid source configuration: {e}"),
            BreakwaterError::PeerSession(_) => "Peer delivery error occurred".to_string(),
            BreakwaterError::Configuration { reason } => {
                format!("Configuration error: {reason}")
            }
            BreakwaterError::UnknownQuality { label } => {
                format!("Quality {label} is not configured for this player")
            }
            BreakwaterError::NoSourcesConfigured => {
                "No playback sources were configured".to_string()
            }
        }
    }

    /// Checks if this error is due to user input validation.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            BreakwaterError::Source(_)
                | BreakwaterError::Configuration { .. }
                | BreakwaterError::UnknownQuality { .. }
                | BreakwaterError::NoSourcesConfigured
        )
    }
}

pub type Result<T> = std::result::Result<T, BreakwaterError>;
