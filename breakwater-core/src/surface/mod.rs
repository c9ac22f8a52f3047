//! Consumed playback-surface contract.
//!
//! Breakwater does not implement a media element; it drives one through the
//! narrow traits defined here. Implementations wrap whatever surface the
//! embedding environment provides (a media-element abstraction in a browser
//! runtime, a scripted stand-in under test).

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::source::{SourceCandidate, SourceListing};

/// Errors surfaced by playback-surface implementations.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("Surface creation failed: {reason}")]
    CreationFailed { reason: String },
}

/// Identifier of the attachment point a surface or swarm file renders into.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementId(String);

impl ElementId {
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Options for rendering swarm-delivered media into a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub autoplay: bool,
}

/// A server-delivery source assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerSource {
    pub url: Url,
    pub media_type: String,
}

/// Raw error code reported by the surface after a playback error event.
///
/// Uses the HTML media error numbering the original surfaces report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceErrorCode(pub u32);

/// Classification of a playback error into the closed set the fallback
/// walk understands. Only `Network` and `Decode` trigger fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackErrorKind {
    Network,
    Decode,
    Other,
}

impl PlaybackErrorKind {
    /// Classifies a surface error code.
    pub fn classify(code: SurfaceErrorCode) -> Self {
        match code.0 {
            2 => PlaybackErrorKind::Network,
            3 => PlaybackErrorKind::Decode,
            _ => PlaybackErrorKind::Other,
        }
    }

    /// Whether this error class drives the fallback walk.
    pub fn triggers_fallback(&self) -> bool {
        matches!(self, PlaybackErrorKind::Network | PlaybackErrorKind::Decode)
    }
}

/// The surface's view of the currently selected quality.
///
/// Surfaces that track per-quality alternates report their own candidate
/// list here; the fallback walk trusts this list over the one originally
/// supplied to `select`.
#[derive(Debug, Clone, PartialEq)]
pub struct QualitySelection {
    /// Display label of the selected quality
    pub label: String,
    /// The surface's candidate list for that quality, in fallback order
    pub candidates: Vec<SourceCandidate>,
}

/// One-shot surface events a caller can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceEvent {
    /// First viewer interaction with the surface (click/touch)
    FirstInteraction,
}

/// An ad overlay request handed to the surface's ads extension.
#[derive(Debug, Clone, PartialEq)]
pub struct AdRequest {
    pub element: ElementId,
    pub tag_url: String,
    pub label: String,
}

/// Capability extensions registered on the surface factory by the
/// capability gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceExtension {
    Ads,
    QualitySwitch,
}

/// Configuration for surface creation.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceConfig {
    pub autoplay: bool,
    pub controls: bool,
    /// Display label preselected in the surface's quality menu
    pub preferred_quality: String,
}

/// Handler invoked by the surface when a playback error event fires.
pub type PlaybackErrorHandler = Box<dyn Fn() + Send + Sync>;

/// Callback for one-shot surface events.
pub type SurfaceCallback = Box<dyn FnOnce() + Send>;

/// The playback surface consumed by the resolution engine.
///
/// All mutation is in place on a shared surface; methods are synchronous
/// from the engine's point of view even when the underlying implementation
/// defers work internally.
pub trait PlaybackSurface: Send + Sync + 'static {
    /// Assigns a server source directly, replacing the current one.
    fn assign_source(&self, source: &ServerSource);

    /// Hands the surface its quality menu (flattened initial source list).
    fn set_sources(&self, sources: &[SourceListing]);

    /// Installs the playback-error handler, replacing any prior one.
    fn install_error_handler(&self, handler: PlaybackErrorHandler);

    /// Removes the installed playback-error handler, if any.
    fn clear_error_handler(&self);

    /// Returns the error code of the most recent playback error.
    fn last_error(&self) -> Option<SurfaceErrorCode>;

    /// Returns the surface's view of the current quality selection.
    fn current_selection(&self) -> Option<QualitySelection>;

    /// Subscribes a one-shot callback to a surface event.
    fn once(&self, event: SurfaceEvent, callback: SurfaceCallback);

    /// Whether the surface is currently set to play automatically.
    fn is_autoplaying(&self) -> bool;

    /// Requests the ad overlay through the registered ads extension.
    fn request_ads(&self, request: &AdRequest);

    /// Starts playback (used when autoplay is deferred to interaction).
    fn begin_playback(&self);
}

/// Factory for playback surfaces.
///
/// `create_surface` resolves once the surface reports ready, wrapping the
/// legacy ready callback as a future.
#[async_trait]
pub trait SurfaceFactory: Send + Sync {
    type Surface: PlaybackSurface;

    /// Creates a surface attached to the given element.
    ///
    /// # Errors
    /// - `SurfaceError::CreationFailed` - The surface could not be created
    async fn create_surface(
        &self,
        element: &ElementId,
        config: SurfaceConfig,
    ) -> Result<Arc<Self::Surface>, SurfaceError>;

    /// Registers a capability extension. Returns `false` when the
    /// extension was already registered.
    fn register_extension(&self, extension: SurfaceExtension) -> bool;
}
