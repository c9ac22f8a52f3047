//! Source resolution engine: peer-vs-server activation and fallback walk.
//!
//! For one quality selection the engine owns a single resolution state:
//! the candidate list, the current index, and the selection phase. Peer
//! delivery failures degrade to the same candidate's server URL without
//! advancing the index; server playback errors of class Network/Decode
//! advance the index until the list is exhausted. Every selection carries
//! a generation counter so handlers and in-flight peer switches from a
//! superseded selection can never mutate the surface.

#[cfg(test)]
pub mod test_mocks;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::BreakwaterConfig;
use crate::peer::{PeerSession, PeerSessionError, PeerSessionManager, PeerTransport, SwarmFile};
use crate::source::{PeerContentId, Quality, SourceCandidate};
use crate::surface::{
    ElementId, PlaybackErrorKind, PlaybackSurface, RenderOptions, ServerSource,
};

/// Phase of the active quality selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPhase {
    /// No selection has been made yet
    Idle,
    /// Candidate at the index is being activated
    Attempting(usize),
    /// Peer delivery is rendering the candidate at the index
    PeerActive(usize),
    /// Server delivery is active for the candidate at the index
    ServerActive(usize),
    /// The fallback walk ran out of candidates; terminal for this selection
    Exhausted,
}

/// Immutable delivery policy for one engine instance.
#[derive(Debug, Clone)]
pub struct DeliveryPolicy {
    /// Attempt peer delivery at all
    pub use_peer_delivery: bool,
    /// Autoplay flag for initial selections
    pub autoplay: bool,
    /// Whether candidates reached by the fallback walk get a peer attempt
    pub peer_retry_on_fallback: bool,
}

impl DeliveryPolicy {
    pub fn from_config(config: &BreakwaterConfig) -> Self {
        Self {
            use_peer_delivery: config.delivery.use_peer_delivery,
            autoplay: config.playback.autoplay,
            peer_retry_on_fallback: config.delivery.peer_retry_on_fallback,
        }
    }
}

/// Delivery path chosen for one candidate by the selection policy.
#[derive(Debug, Clone)]
enum DeliveryDecision {
    Peer(PeerContentId),
    Server,
}

/// State of one quality selection, replaced wholesale by the next select.
#[derive(Debug)]
struct ResolutionState {
    quality: Quality,
    candidates: Vec<SourceCandidate>,
    index: usize,
    phase: SelectionPhase,
}

#[derive(Debug, Default)]
struct EngineState {
    /// Monotonically increasing selection counter
    generation: u64,
    selection: Option<ResolutionState>,
}

struct Inner<S, T: PeerTransport> {
    surface: Arc<S>,
    sessions: PeerSessionManager<T>,
    target: ElementId,
    policy: DeliveryPolicy,
    state: Mutex<EngineState>,
}

/// The source resolution engine.
///
/// Cheap to clone; clones share the same resolution state and peer
/// session manager. `select` must be called within a Tokio runtime since
/// peer attempts run on spawned tasks.
pub struct SourceResolver<S, T: PeerTransport> {
    inner: Arc<Inner<S, T>>,
}

impl<S, T: PeerTransport> Clone for SourceResolver<S, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: PlaybackSurface, T: PeerTransport> SourceResolver<S, T> {
    pub fn new(
        surface: Arc<S>,
        sessions: PeerSessionManager<T>,
        target: ElementId,
        policy: DeliveryPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                surface,
                sessions,
                target,
                policy,
                state: Mutex::new(EngineState::default()),
            }),
        }
    }

    /// Selects a quality, activating its first candidate.
    ///
    /// Returns the shared surface immediately; peer attempts complete on a
    /// spawned task. Any prior selection is superseded: its state is
    /// replaced and its error handler retired.
    pub fn select(
        &self,
        quality: Quality,
        candidates: Vec<SourceCandidate>,
        is_initial: bool,
    ) -> Arc<S> {
        let generation = {
            let mut state = self.inner.state.lock();
            state.generation += 1;
            state.selection = Some(ResolutionState {
                quality: quality.clone(),
                candidates,
                index: 0,
                phase: SelectionPhase::Attempting(0),
            });
            state.generation
        };

        // Retire the superseded selection's handler before arming a new one
        self.inner.surface.clear_error_handler();

        tracing::info!(%quality, generation, is_initial, "Selecting quality");

        let autoplay = if is_initial {
            self.inner.policy.autoplay
        } else {
            self.inner.surface.is_autoplaying()
        };

        self.attempt(generation, 0, autoplay, true);
        Arc::clone(&self.inner.surface)
    }

    /// Phase of the active selection.
    pub fn phase(&self) -> SelectionPhase {
        self.inner
            .state
            .lock()
            .selection
            .as_ref()
            .map(|selection| selection.phase)
            .unwrap_or(SelectionPhase::Idle)
    }

    /// Quality of the active selection.
    pub fn current_quality(&self) -> Option<Quality> {
        self.inner
            .state
            .lock()
            .selection
            .as_ref()
            .map(|selection| selection.quality.clone())
    }

    /// The peer session manager driven by this engine.
    pub fn sessions(&self) -> &PeerSessionManager<T> {
        &self.inner.sessions
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.state.lock().generation == generation
    }

    /// Activates the candidate at the index for the given selection.
    fn attempt(&self, generation: u64, index: usize, autoplay: bool, allow_peer: bool) {
        let candidate = {
            let mut state = self.inner.state.lock();
            if state.generation != generation {
                return;
            }
            let Some(selection) = state.selection.as_mut() else {
                return;
            };
            match selection.candidates.get(index) {
                Some(candidate) => {
                    selection.index = index;
                    selection.phase = SelectionPhase::Attempting(index);
                    candidate.clone()
                }
                None => {
                    selection.phase = SelectionPhase::Exhausted;
                    tracing::error!(
                        quality = %selection.quality,
                        index,
                        "No candidate to attempt, selection exhausted"
                    );
                    return;
                }
            }
        };

        match self.delivery_decision(&candidate, allow_peer) {
            DeliveryDecision::Server => self.activate_server(generation, index, &candidate),
            DeliveryDecision::Peer(content) => {
                tracing::debug!(%content, index, "Attempting peer delivery");
                let resolver = self.clone();
                tokio::spawn(async move {
                    resolver
                        .attempt_peer(generation, index, candidate, content, autoplay)
                        .await;
                });
            }
        }
    }

    /// Fast local policy checks deciding the delivery path, in order.
    fn delivery_decision(&self, candidate: &SourceCandidate, allow_peer: bool) -> DeliveryDecision {
        if !allow_peer || !self.inner.policy.use_peer_delivery {
            return DeliveryDecision::Server;
        }
        if !self.inner.sessions.is_supported() {
            return DeliveryDecision::Server;
        }
        match &candidate.peer_content {
            Some(content) => DeliveryDecision::Peer(content.clone()),
            None => DeliveryDecision::Server,
        }
    }

    async fn attempt_peer(
        &self,
        generation: u64,
        index: usize,
        candidate: SourceCandidate,
        content: PeerContentId,
        autoplay: bool,
    ) {
        match self
            .deliver_via_peer(generation, index, &candidate, &content, autoplay)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(%content, generation, "Peer switch superseded, skipping render");
            }
            Err(error) => {
                // Peer failure degrades the same candidate to its server URL
                tracing::warn!(
                    %content,
                    index,
                    %error,
                    "Peer delivery failed, degrading to server path"
                );
                if self.is_current(generation) {
                    self.activate_server(generation, index, &candidate);
                }
            }
        }
    }

    /// Switches the peer session and renders the matching member file.
    ///
    /// Returns `Ok(false)` when the selection was superseded while the
    /// switch was in flight; no surface mutation happens in that case.
    async fn deliver_via_peer(
        &self,
        generation: u64,
        index: usize,
        candidate: &SourceCandidate,
        content: &PeerContentId,
        autoplay: bool,
    ) -> Result<bool, PeerSessionError> {
        let files = self.inner.sessions.switch_to(content).await?;

        if !self.is_current(generation) {
            return Ok(false);
        }

        let format = candidate.container_format();
        let file = files
            .iter()
            .find(|file| format.matches_file_name(file.name()))
            .ok_or_else(|| PeerSessionError::NoPlayableFile {
                format: format.to_string(),
            })?;

        file.render_to(&self.inner.target, RenderOptions { autoplay })?;

        let mut state = self.inner.state.lock();
        if state.generation == generation
            && let Some(selection) = state.selection.as_mut()
        {
            selection.phase = SelectionPhase::PeerActive(index);
            tracing::info!(
                quality = %selection.quality,
                index,
                file = file.name(),
                "Peer delivery active"
            );
        }
        Ok(true)
    }

    /// Assigns the candidate's server URL and arms the error handler.
    ///
    /// The handler is installed strictly after the assignment it covers
    /// and replaces any previously installed handler.
    fn activate_server(&self, generation: u64, index: usize, candidate: &SourceCandidate) {
        if !self.is_current(generation) {
            return;
        }

        let source = ServerSource {
            url: candidate.server_url.clone(),
            media_type: candidate.media_type.clone(),
        };
        tracing::info!(url = %source.url, index, "Activating server delivery");
        self.inner.surface.assign_source(&source);

        let resolver = self.clone();
        let failed_url = candidate.server_url.clone();
        self.inner
            .surface
            .install_error_handler(Box::new(move || {
                resolver.handle_playback_error(generation, &failed_url);
            }));

        let mut state = self.inner.state.lock();
        if state.generation == generation
            && let Some(selection) = state.selection.as_mut()
        {
            selection.index = index;
            selection.phase = SelectionPhase::ServerActive(index);
        }
    }

    /// Walks to the next candidate on a Network/Decode playback error.
    fn handle_playback_error(&self, generation: u64, failed_url: &url::Url) {
        if !self.is_current(generation) {
            return;
        }

        let Some(code) = self.inner.surface.last_error() else {
            return;
        };
        let kind = PlaybackErrorKind::classify(code);
        if !kind.triggers_fallback() {
            tracing::debug!(?kind, "Playback error class does not trigger fallback");
            return;
        }

        // The surface's own candidate list is authoritative for the walk
        let Some(current) = self.inner.surface.current_selection() else {
            return;
        };
        let Some(position) = current
            .candidates
            .iter()
            .position(|candidate| candidate.server_url == *failed_url)
        else {
            tracing::debug!(
                url = %failed_url,
                "Failed URL not in current selection, ignoring error"
            );
            return;
        };

        let next = position + 1;
        if next >= current.candidates.len() {
            let mut state = self.inner.state.lock();
            if state.generation == generation
                && let Some(selection) = state.selection.as_mut()
            {
                selection.phase = SelectionPhase::Exhausted;
                tracing::error!(
                    quality = %selection.quality,
                    candidates = current.candidates.len(),
                    "All candidates exhausted for quality selection"
                );
            }
            return;
        }

        {
            let mut state = self.inner.state.lock();
            if state.generation != generation {
                return;
            }
            let Some(selection) = state.selection.as_mut() else {
                return;
            };
            selection.candidates = current.candidates.clone();
            selection.index = next;
            selection.phase = SelectionPhase::Attempting(next);
            tracing::warn!(
                quality = %selection.quality,
                ?kind,
                from = position,
                to = next,
                "Playback error, advancing fallback walk"
            );
        }

        let autoplay = self.inner.surface.is_autoplaying();
        self.attempt(
            generation,
            next,
            autoplay,
            self.inner.policy.peer_retry_on_fallback,
        );
    }
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::test_mocks::{
        MockPeerTransport, MockSurface, SwarmEvent, settle, test_content_id,
    };
    use super::*;
    use crate::surface::{QualitySelection, SurfaceErrorCode};

    const NETWORK: SurfaceErrorCode = SurfaceErrorCode(2);
    const DECODE: SurfaceErrorCode = SurfaceErrorCode(3);
    const ABORTED: SurfaceErrorCode = SurfaceErrorCode(1);

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn server_candidate(s: &str) -> SourceCandidate {
        SourceCandidate::server_only(url(s), "video/mp4")
    }

    fn peer_candidate(s: &str, content: &str) -> SourceCandidate {
        SourceCandidate::with_peer(url(s), "video/mp4", test_content_id(content))
    }

    fn policy(use_peer: bool) -> DeliveryPolicy {
        DeliveryPolicy {
            use_peer_delivery: use_peer,
            autoplay: true,
            peer_retry_on_fallback: true,
        }
    }

    fn resolver(
        surface: &Arc<MockSurface>,
        transport: &MockPeerTransport,
        policy: DeliveryPolicy,
    ) -> SourceResolver<MockSurface, MockPeerTransport> {
        SourceResolver::new(
            Arc::clone(surface),
            PeerSessionManager::new(transport.clone()),
            ElementId::new("player"),
            policy,
        )
    }

    fn set_surface_selection(
        surface: &MockSurface,
        label: &str,
        candidates: &[SourceCandidate],
    ) {
        surface.set_current_selection(QualitySelection {
            label: label.to_string(),
            candidates: candidates.to_vec(),
        });
    }

    #[tokio::test]
    async fn test_server_chain_walk_then_exhaustion() {
        let surface = Arc::new(MockSurface::new());
        let transport = MockPeerTransport::supported();
        let engine = resolver(&surface, &transport, policy(false));

        let candidates = vec![
            server_candidate("https://cdn.example.com/a.mp4"),
            server_candidate("https://cdn.example.com/b.mp4"),
        ];
        set_surface_selection(&surface, "LOW", &candidates);

        engine.select(Quality::new("low"), candidates, true);
        assert_eq!(
            surface.assigned_urls(),
            vec!["https://cdn.example.com/a.mp4"]
        );
        assert_eq!(engine.phase(), SelectionPhase::ServerActive(0));

        surface.inject_playback_error(NETWORK);
        assert_eq!(
            surface.assigned_urls(),
            vec![
                "https://cdn.example.com/a.mp4",
                "https://cdn.example.com/b.mp4"
            ]
        );
        assert_eq!(engine.phase(), SelectionPhase::ServerActive(1));

        surface.inject_playback_error(NETWORK);
        assert_eq!(engine.phase(), SelectionPhase::Exhausted);
        // Terminal: no further source assignment
        assert_eq!(surface.assigned_urls().len(), 2);

        // A further error stays terminal
        surface.inject_playback_error(NETWORK);
        assert_eq!(surface.assigned_urls().len(), 2);
    }

    #[tokio::test]
    async fn test_decode_error_also_walks() {
        let surface = Arc::new(MockSurface::new());
        let transport = MockPeerTransport::supported();
        let engine = resolver(&surface, &transport, policy(false));

        let candidates = vec![
            server_candidate("https://cdn.example.com/a.mp4"),
            server_candidate("https://cdn.example.com/b.mp4"),
        ];
        set_surface_selection(&surface, "LOW", &candidates);
        engine.select(Quality::new("low"), candidates, true);

        surface.inject_playback_error(DECODE);
        assert_eq!(engine.phase(), SelectionPhase::ServerActive(1));
    }

    #[tokio::test]
    async fn test_other_error_class_is_inert() {
        let surface = Arc::new(MockSurface::new());
        let transport = MockPeerTransport::supported();
        let engine = resolver(&surface, &transport, policy(false));

        let candidates = vec![
            server_candidate("https://cdn.example.com/a.mp4"),
            server_candidate("https://cdn.example.com/b.mp4"),
        ];
        set_surface_selection(&surface, "LOW", &candidates);
        engine.select(Quality::new("low"), candidates, true);

        surface.inject_playback_error(ABORTED);
        assert_eq!(engine.phase(), SelectionPhase::ServerActive(0));
        assert_eq!(surface.assigned_urls().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_failing_url_is_inert() {
        let surface = Arc::new(MockSurface::new());
        let transport = MockPeerTransport::supported();
        let engine = resolver(&surface, &transport, policy(false));

        let candidates = vec![server_candidate("https://cdn.example.com/a.mp4")];
        // Surface reports a selection list that does not contain the
        // failing URL at all
        set_surface_selection(
            &surface,
            "LOW",
            &[server_candidate("https://cdn.example.com/other.mp4")],
        );
        engine.select(Quality::new("low"), candidates, true);

        surface.inject_playback_error(NETWORK);
        assert_eq!(engine.phase(), SelectionPhase::ServerActive(0));
        assert_eq!(surface.assigned_urls().len(), 1);
    }

    #[tokio::test]
    async fn test_peer_failure_degrades_same_candidate() {
        let surface = Arc::new(MockSurface::new());
        let transport = MockPeerTransport::supported();
        transport.fail_add(&test_content_id("1"), "no seeders");
        let engine = resolver(&surface, &transport, policy(true));

        let candidates = vec![peer_candidate("https://cdn.example.com/x.mp4", "1")];
        engine.select(Quality::new("high"), candidates, true);
        settle().await;

        // Server path for the same candidate, index not advanced
        assert_eq!(
            surface.assigned_urls(),
            vec!["https://cdn.example.com/x.mp4"]
        );
        assert_eq!(engine.phase(), SelectionPhase::ServerActive(0));
    }

    #[tokio::test]
    async fn test_peer_success_renders_matching_file() {
        let surface = Arc::new(MockSurface::new());
        let transport = MockPeerTransport::supported();
        transport.succeed_with_files(&test_content_id("1"), &["subs.srt", "Movie.MP4"]);
        let engine = resolver(&surface, &transport, policy(true));

        let candidates = vec![peer_candidate("https://cdn.example.com/x.mp4", "1")];
        engine.select(Quality::new("high"), candidates, true);
        settle().await;

        assert_eq!(engine.phase(), SelectionPhase::PeerActive(0));
        assert!(surface.assigned_urls().is_empty());

        let renders = transport.renders();
        assert_eq!(renders.len(), 1);
        assert_eq!(renders[0].0, "Movie.MP4");
        assert_eq!(renders[0].1, ElementId::new("player"));
        assert!(renders[0].2.autoplay);
    }

    #[tokio::test]
    async fn test_no_matching_member_file_degrades() {
        let surface = Arc::new(MockSurface::new());
        let transport = MockPeerTransport::supported();
        transport.succeed_with_files(&test_content_id("1"), &["movie.mkv"]);
        let engine = resolver(&surface, &transport, policy(true));

        let candidates = vec![peer_candidate("https://cdn.example.com/x.mp4", "1")];
        engine.select(Quality::new("high"), candidates, true);
        settle().await;

        assert_eq!(
            surface.assigned_urls(),
            vec!["https://cdn.example.com/x.mp4"]
        );
        assert_eq!(engine.phase(), SelectionPhase::ServerActive(0));
    }

    #[tokio::test]
    async fn test_render_failure_degrades() {
        let surface = Arc::new(MockSurface::new());
        let transport = MockPeerTransport::supported();
        transport.succeed_with_files(&test_content_id("1"), &["movie.mp4"]);
        transport.fail_renders();
        let engine = resolver(&surface, &transport, policy(true));

        let candidates = vec![peer_candidate("https://cdn.example.com/x.mp4", "1")];
        engine.select(Quality::new("high"), candidates, true);
        settle().await;

        assert_eq!(
            surface.assigned_urls(),
            vec!["https://cdn.example.com/x.mp4"]
        );
    }

    #[tokio::test]
    async fn test_server_only_candidate_never_touches_transport() {
        let surface = Arc::new(MockSurface::new());
        let transport = MockPeerTransport::supported();
        let engine = resolver(&surface, &transport, policy(true));

        let candidates = vec![server_candidate("https://cdn.example.com/a.mp4")];
        engine.select(Quality::new("low"), candidates, true);
        settle().await;

        assert!(transport.events().is_empty());
        assert_eq!(engine.phase(), SelectionPhase::ServerActive(0));
    }

    #[tokio::test]
    async fn test_unsupported_transport_skips_peer_path() {
        let surface = Arc::new(MockSurface::new());
        let transport = MockPeerTransport::unsupported();
        let engine = resolver(&surface, &transport, policy(true));

        let candidates = vec![peer_candidate("https://cdn.example.com/a.mp4", "1")];
        engine.select(Quality::new("low"), candidates, true);
        settle().await;

        assert!(transport.events().is_empty());
        assert_eq!(
            surface.assigned_urls(),
            vec!["https://cdn.example.com/a.mp4"]
        );
    }

    #[tokio::test]
    async fn test_peer_disabled_by_config_skips_peer_path() {
        let surface = Arc::new(MockSurface::new());
        let transport = MockPeerTransport::supported();
        let engine = resolver(&surface, &transport, policy(false));

        let candidates = vec![peer_candidate("https://cdn.example.com/a.mp4", "1")];
        engine.select(Quality::new("low"), candidates, true);
        settle().await;

        assert!(transport.events().is_empty());
    }

    #[tokio::test]
    async fn test_superseded_selection_handler_never_fires() {
        let surface = Arc::new(MockSurface::new());
        let transport = MockPeerTransport::supported();
        let engine = resolver(&surface, &transport, policy(false));

        let low = vec![
            server_candidate("https://cdn.example.com/low-a.mp4"),
            server_candidate("https://cdn.example.com/low-b.mp4"),
        ];
        set_surface_selection(&surface, "LOW", &low);
        engine.select(Quality::new("low"), low.clone(), true);

        // Capture the armed handler, then supersede the selection
        let stale_handler = surface.take_error_handler().unwrap();
        let high = vec![server_candidate("https://cdn.example.com/high.mp4")];
        set_surface_selection(&surface, "HIGH", &high);
        engine.select(Quality::new("high"), high, false);

        // The stale handler reacting to an error must do nothing
        surface.set_last_error(NETWORK);
        (*stale_handler)();

        assert_eq!(engine.phase(), SelectionPhase::ServerActive(0));
        assert_eq!(engine.current_quality(), Some(Quality::new("high")));
        assert_eq!(
            surface.assigned_urls().last().map(String::as_str),
            Some("https://cdn.example.com/high.mp4")
        );
    }

    #[tokio::test]
    async fn test_stale_peer_switch_does_not_render() {
        let surface = Arc::new(MockSurface::new());
        let transport = MockPeerTransport::supported();
        let gate = transport.stall_add(&test_content_id("1"), &["movie.mp4"]);
        let engine = resolver(&surface, &transport, policy(true));

        let peer_quality = vec![peer_candidate("https://cdn.example.com/x.mp4", "1")];
        engine.select(Quality::new("high"), peer_quality, true);
        settle().await;

        // Supersede while the swarm add is still in flight
        let low = vec![server_candidate("https://cdn.example.com/low.mp4")];
        engine.select(Quality::new("low"), low, false);

        gate.add_permits(1);
        settle().await;

        assert!(transport.renders().is_empty());
        assert_eq!(engine.phase(), SelectionPhase::ServerActive(0));
        assert_eq!(engine.current_quality(), Some(Quality::new("low")));
    }

    #[tokio::test]
    async fn test_fallback_candidate_gets_peer_attempt_when_configured() {
        let surface = Arc::new(MockSurface::new());
        let transport = MockPeerTransport::supported();
        transport.succeed_with_files(&test_content_id("2"), &["alt.mp4"]);
        let engine = resolver(&surface, &transport, policy(true));

        let candidates = vec![
            server_candidate("https://cdn.example.com/a.mp4"),
            peer_candidate("https://cdn.example.com/b.mp4", "2"),
        ];
        set_surface_selection(&surface, "LOW", &candidates);
        engine.select(Quality::new("low"), candidates, true);

        surface.inject_playback_error(NETWORK);
        settle().await;

        assert_eq!(engine.phase(), SelectionPhase::PeerActive(1));
        assert!(
            transport
                .events()
                .contains(&SwarmEvent::ContentAdded(test_content_id("2")))
        );
    }

    #[tokio::test]
    async fn test_fallback_candidate_forced_to_server_when_retry_disabled() {
        let surface = Arc::new(MockSurface::new());
        let transport = MockPeerTransport::supported();
        transport.succeed_with_files(&test_content_id("2"), &["alt.mp4"]);
        let engine = resolver(
            &surface,
            &transport,
            DeliveryPolicy {
                use_peer_delivery: true,
                autoplay: true,
                peer_retry_on_fallback: false,
            },
        );

        let candidates = vec![
            server_candidate("https://cdn.example.com/a.mp4"),
            peer_candidate("https://cdn.example.com/b.mp4", "2"),
        ];
        set_surface_selection(&surface, "LOW", &candidates);
        engine.select(Quality::new("low"), candidates, true);

        surface.inject_playback_error(NETWORK);
        settle().await;

        assert!(transport.events().is_empty());
        assert_eq!(
            surface.assigned_urls().last().map(String::as_str),
            Some("https://cdn.example.com/b.mp4")
        );
    }

    #[tokio::test]
    async fn test_walk_adopts_surface_candidate_list() {
        let surface = Arc::new(MockSurface::new());
        let transport = MockPeerTransport::supported();
        let engine = resolver(&surface, &transport, policy(false));

        // Engine is handed one candidate, but the surface tracks an
        // alternate list for the quality
        let supplied = vec![server_candidate("https://cdn.example.com/a.mp4")];
        set_surface_selection(
            &surface,
            "LOW",
            &[
                server_candidate("https://cdn.example.com/a.mp4"),
                server_candidate("https://cdn.example.com/mirror.mp4"),
            ],
        );
        engine.select(Quality::new("low"), supplied, true);

        surface.inject_playback_error(NETWORK);
        assert_eq!(
            surface.assigned_urls().last().map(String::as_str),
            Some("https://cdn.example.com/mirror.mp4")
        );
    }

    #[test]
    fn test_walk_terminates_within_candidate_count() {
        use proptest::prelude::*;

        proptest!(|(count in 1usize..8)| {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                let surface = Arc::new(MockSurface::new());
                let transport = MockPeerTransport::supported();
                let engine = resolver(&surface, &transport, policy(false));

                let candidates: Vec<SourceCandidate> = (0..count)
                    .map(|i| {
                        server_candidate(&format!("https://cdn.example.com/{i}.mp4"))
                    })
                    .collect();
                set_surface_selection(&surface, "Q", &candidates);
                engine.select(Quality::new("q"), candidates, true);

                for _ in 0..count {
                    surface.inject_playback_error(NETWORK);
                }

                prop_assert_eq!(engine.phase(), SelectionPhase::Exhausted);
                // One assignment per candidate, never more
                prop_assert_eq!(surface.assigned_urls().len(), count);
                Ok(())
            })?;
        });
    }
}
