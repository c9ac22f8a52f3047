//! Peer session lifecycle management.
//!
//! The manager owns at most one live peer-swarm session. Switching to a new
//! identifier tears the prior session down completely before the next one
//! is created; the internal lock is held across the whole switch so the two
//! operations can never interleave.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::source::PeerContentId;
use crate::surface::{ElementId, RenderOptions};

/// Errors from peer session operations.
///
/// These are always recovered by degrading to server delivery; none of
/// them is fatal for playback.
#[derive(Debug, thiserror::Error)]
pub enum PeerSessionError {
    #[error("Peer transport unavailable: {reason}")]
    TransportUnavailable { reason: String },

    #[error("Session creation failed: {reason}")]
    CreateFailed { reason: String },

    #[error("Adding content {content} failed: {reason}")]
    AddFailed { content: String, reason: String },

    #[error("Session teardown failed: {reason}")]
    TeardownFailed { reason: String },

    #[error("No playable {format} file in swarm content")]
    NoPlayableFile { format: String },

    #[error("Rendering to {target} failed: {reason}")]
    RenderFailed { target: String, reason: String },
}

/// A member file of swarm-delivered content.
pub trait SwarmFile: Send + Sync + Clone {
    /// File name within the swarm content, used for container matching.
    fn name(&self) -> &str;

    /// Attaches decoded media output to a render target.
    ///
    /// # Errors
    /// - `PeerSessionError::RenderFailed` - The target rejected the attachment
    fn render_to(&self, target: &ElementId, options: RenderOptions)
    -> Result<(), PeerSessionError>;
}

/// An active swarm download session.
#[async_trait]
pub trait PeerSession: Send + Sync {
    type File: SwarmFile;

    /// Adds content by identifier, resolving with the member files.
    ///
    /// # Errors
    /// - `PeerSessionError::AddFailed` - The swarm add did not complete
    async fn add(&mut self, content: &PeerContentId) -> Result<Vec<Self::File>, PeerSessionError>;

    /// Destroys the session, releasing all swarm resources.
    ///
    /// # Errors
    /// - `PeerSessionError::TeardownFailed` - Teardown did not complete
    async fn destroy(&mut self) -> Result<(), PeerSessionError>;
}

/// The peer transport consumed by the session manager.
pub trait PeerTransport: Send + Sync + 'static {
    type Session: PeerSession + Send + 'static;

    /// Environment capability probe. Pure, no side effects.
    fn realtime_support(&self) -> bool;

    /// Creates a fresh, empty session.
    ///
    /// # Errors
    /// - `PeerSessionError::CreateFailed` - The transport refused a session
    fn create_session(&self) -> Result<Self::Session, PeerSessionError>;
}

/// Owner of the single live peer session.
///
/// Callers are expected to serialize their switches; concurrent calls are
/// serialized by the internal lock but their completion order is the lock
/// acquisition order, which the manager does not define.
pub struct PeerSessionManager<T: PeerTransport> {
    transport: T,
    active: Mutex<Option<T::Session>>,
}

impl<T: PeerTransport> PeerSessionManager<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            active: Mutex::new(None),
        }
    }

    /// Whether peer delivery is supported in this environment.
    pub fn is_supported(&self) -> bool {
        self.transport.realtime_support()
    }

    /// Whether a session is currently alive.
    pub async fn has_active_session(&self) -> bool {
        self.active.lock().await.is_some()
    }

    /// Replaces the live session with one for the given content.
    ///
    /// Teardown of any prior session strictly precedes the next create.
    /// With no prior session, teardown is a no-op. A failed teardown
    /// aborts the switch and leaves the old session owned, so a later
    /// switch retries destruction.
    ///
    /// # Errors
    /// - `PeerSessionError::TeardownFailed` - Prior session would not die
    /// - `PeerSessionError::CreateFailed` - Transport refused a session
    /// - `PeerSessionError::AddFailed` - Content could not be added
    pub async fn switch_to(
        &self,
        content: &PeerContentId,
    ) -> Result<Vec<<T::Session as PeerSession>::File>, PeerSessionError> {
        let mut active = self.active.lock().await;

        if let Some(session) = active.as_mut() {
            tracing::debug!(%content, "Destroying prior peer session before switch");
            session.destroy().await?;
            *active = None;
        }

        let mut session = self.transport.create_session()?;
        let files = session.add(content).await?;
        *active = Some(session);

        tracing::info!(%content, files = files.len(), "Peer session switched");
        Ok(files)
    }

    /// Destroys any live session. Used at player teardown.
    ///
    /// # Errors
    /// - `PeerSessionError::TeardownFailed` - Teardown did not complete
    pub async fn shutdown(&self) -> Result<(), PeerSessionError> {
        let mut active = self.active.lock().await;

        if let Some(session) = active.as_mut() {
            session.destroy().await?;
            *active = None;
            tracing::info!("Peer session shut down");
        }

        Ok(())
    }
}
