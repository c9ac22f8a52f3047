//! Mock collaborators for testing the resolution engine and its callers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use url::Url;

use crate::capability::{ScriptLoadError, ScriptLoader};
use crate::peer::{PeerSession, PeerSessionError, PeerTransport, SwarmFile};
use crate::source::{PeerContentId, SourceListing};
use crate::surface::{
    AdRequest, ElementId, PlaybackErrorHandler, PlaybackSurface, QualitySelection, RenderOptions,
    ServerSource, SurfaceCallback, SurfaceConfig, SurfaceError, SurfaceErrorCode, SurfaceEvent,
    SurfaceExtension, SurfaceFactory,
};

/// Magnet identifier for tests, distinguished by display name.
pub fn test_content_id(tag: &str) -> PeerContentId {
    let uri = format!(
        "magnet:?xt=urn:btih:08ada5a7a6183aae1e09d831df6748d566095a10&dn=content-{tag}"
    );
    PeerContentId::parse(&uri).unwrap()
}

/// Lets spawned engine work settle on a current-thread runtime.
///
/// The mocks have no real I/O, so a bounded number of yields is enough
/// for every spawned task to run to completion.
pub async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}

/// Observable swarm lifecycle events, in global order.
#[derive(Debug, Clone, PartialEq)]
pub enum SwarmEvent {
    SessionCreated,
    ContentAdded(PeerContentId),
    SessionDestroyed,
}

#[derive(Debug, Clone)]
enum AddOutcome {
    Succeed(Vec<String>),
    Fail(String),
}

#[derive(Default)]
struct TransportState {
    outcomes: HashMap<String, AddOutcome>,
    gates: HashMap<String, Arc<Semaphore>>,
    events: Vec<SwarmEvent>,
    renders: Vec<(String, ElementId, RenderOptions)>,
    live_sessions: usize,
    fail_create: bool,
    fail_destroy_once: bool,
    fail_renders: bool,
}

/// Scripted peer transport with a global event log for ordering asserts.
#[derive(Clone)]
pub struct MockPeerTransport {
    supported: bool,
    state: Arc<Mutex<TransportState>>,
}

impl MockPeerTransport {
    pub fn supported() -> Self {
        Self {
            supported: true,
            state: Arc::new(Mutex::new(TransportState::default())),
        }
    }

    pub fn unsupported() -> Self {
        Self {
            supported: false,
            state: Arc::new(Mutex::new(TransportState::default())),
        }
    }

    /// Scripts a successful add for the content, yielding the file names.
    pub fn succeed_with_files(&self, content: &PeerContentId, names: &[&str]) {
        self.state.lock().outcomes.insert(
            content.as_str().to_string(),
            AddOutcome::Succeed(names.iter().map(|n| n.to_string()).collect()),
        );
    }

    /// Scripts a failing add for the content.
    pub fn fail_add(&self, content: &PeerContentId, reason: &str) {
        self.state.lock().outcomes.insert(
            content.as_str().to_string(),
            AddOutcome::Fail(reason.to_string()),
        );
    }

    /// Scripts a successful add that blocks until the returned semaphore
    /// receives a permit.
    pub fn stall_add(&self, content: &PeerContentId, names: &[&str]) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        let mut state = self.state.lock();
        state.outcomes.insert(
            content.as_str().to_string(),
            AddOutcome::Succeed(names.iter().map(|n| n.to_string()).collect()),
        );
        state
            .gates
            .insert(content.as_str().to_string(), Arc::clone(&gate));
        gate
    }

    /// Makes the next session creation fail.
    pub fn fail_create(&self) {
        self.state.lock().fail_create = true;
    }

    /// Makes the next session destroy fail, once.
    pub fn fail_destroy_once(&self) {
        self.state.lock().fail_destroy_once = true;
    }

    /// Makes every file render fail.
    pub fn fail_renders(&self) {
        self.state.lock().fail_renders = true;
    }

    pub fn events(&self) -> Vec<SwarmEvent> {
        self.state.lock().events.clone()
    }

    /// Render log: (file name, target, options) in order.
    pub fn renders(&self) -> Vec<(String, ElementId, RenderOptions)> {
        self.state.lock().renders.clone()
    }

    pub fn live_session_count(&self) -> usize {
        self.state.lock().live_sessions
    }
}

impl PeerTransport for MockPeerTransport {
    type Session = MockPeerSession;

    fn realtime_support(&self) -> bool {
        self.supported
    }

    fn create_session(&self) -> Result<Self::Session, PeerSessionError> {
        let mut state = self.state.lock();
        if state.fail_create {
            state.fail_create = false;
            return Err(PeerSessionError::CreateFailed {
                reason: "scripted create failure".to_string(),
            });
        }
        state.events.push(SwarmEvent::SessionCreated);
        state.live_sessions += 1;
        Ok(MockPeerSession {
            state: Arc::clone(&self.state),
            alive: true,
        })
    }
}

/// Session handle produced by [`MockPeerTransport`].
pub struct MockPeerSession {
    state: Arc<Mutex<TransportState>>,
    alive: bool,
}

#[async_trait]
impl PeerSession for MockPeerSession {
    type File = MockSwarmFile;

    async fn add(&mut self, content: &PeerContentId) -> Result<Vec<MockSwarmFile>, PeerSessionError> {
        let gate = self.state.lock().gates.get(content.as_str()).cloned();
        if let Some(gate) = gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| PeerSessionError::AddFailed {
                    content: content.to_string(),
                    reason: "gate closed".to_string(),
                })?;
            permit.forget();
        }

        let mut state = self.state.lock();
        let outcome = state
            .outcomes
            .get(content.as_str())
            .cloned()
            .unwrap_or_else(|| AddOutcome::Fail("no scripted outcome".to_string()));

        match outcome {
            AddOutcome::Succeed(names) => {
                state.events.push(SwarmEvent::ContentAdded(content.clone()));
                let files = names
                    .into_iter()
                    .map(|name| MockSwarmFile {
                        name,
                        state: Arc::clone(&self.state),
                    })
                    .collect();
                Ok(files)
            }
            AddOutcome::Fail(reason) => Err(PeerSessionError::AddFailed {
                content: content.to_string(),
                reason,
            }),
        }
    }

    async fn destroy(&mut self) -> Result<(), PeerSessionError> {
        let mut state = self.state.lock();
        if state.fail_destroy_once {
            state.fail_destroy_once = false;
            return Err(PeerSessionError::TeardownFailed {
                reason: "scripted teardown failure".to_string(),
            });
        }
        if self.alive {
            self.alive = false;
            state.live_sessions -= 1;
            state.events.push(SwarmEvent::SessionDestroyed);
        }
        Ok(())
    }
}

/// Member file handle produced by [`MockPeerSession`].
#[derive(Clone)]
pub struct MockSwarmFile {
    name: String,
    state: Arc<Mutex<TransportState>>,
}

impl SwarmFile for MockSwarmFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn render_to(
        &self,
        target: &ElementId,
        options: RenderOptions,
    ) -> Result<(), PeerSessionError> {
        let mut state = self.state.lock();
        if state.fail_renders {
            return Err(PeerSessionError::RenderFailed {
                target: target.to_string(),
                reason: "scripted render failure".to_string(),
            });
        }
        state
            .renders
            .push((self.name.clone(), target.clone(), options));
        Ok(())
    }
}

#[derive(Default)]
struct SurfaceState {
    assigned: Vec<ServerSource>,
    sources: Vec<SourceListing>,
    handler: Option<Arc<PlaybackErrorHandler>>,
    last_error: Option<SurfaceErrorCode>,
    selection: Option<QualitySelection>,
    autoplaying: bool,
    interaction_callbacks: Vec<SurfaceCallback>,
    ad_requests: Vec<AdRequest>,
    play_count: usize,
}

/// Scripted playback surface recording every mutation.
pub struct MockSurface {
    state: Mutex<SurfaceState>,
}

impl MockSurface {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SurfaceState {
                autoplaying: true,
                ..SurfaceState::default()
            }),
        }
    }

    pub fn with_autoplay(autoplaying: bool) -> Self {
        Self {
            state: Mutex::new(SurfaceState {
                autoplaying,
                ..SurfaceState::default()
            }),
        }
    }

    /// Scripts the surface's view of the current quality selection.
    pub fn set_current_selection(&self, selection: QualitySelection) {
        self.state.lock().selection = Some(selection);
    }

    pub fn set_last_error(&self, code: SurfaceErrorCode) {
        self.state.lock().last_error = Some(code);
    }

    /// Records an error code and fires the installed handler, the way a
    /// playback error event would.
    pub fn inject_playback_error(&self, code: SurfaceErrorCode) {
        let handler = {
            let mut state = self.state.lock();
            state.last_error = Some(code);
            state.handler.clone()
        };
        if let Some(handler) = handler {
            (*handler)();
        }
    }

    /// Removes and returns the installed handler.
    pub fn take_error_handler(&self) -> Option<Arc<PlaybackErrorHandler>> {
        self.state.lock().handler.take()
    }

    pub fn has_error_handler(&self) -> bool {
        self.state.lock().handler.is_some()
    }

    /// Assigned server sources, in order.
    pub fn assigned_sources(&self) -> Vec<ServerSource> {
        self.state.lock().assigned.clone()
    }

    /// Assigned server URLs, in order.
    pub fn assigned_urls(&self) -> Vec<String> {
        self.state
            .lock()
            .assigned
            .iter()
            .map(|source| source.url.to_string())
            .collect()
    }

    /// The quality menu handed over via `set_sources`.
    pub fn source_listing(&self) -> Vec<SourceListing> {
        self.state.lock().sources.clone()
    }

    pub fn ad_requests(&self) -> Vec<AdRequest> {
        self.state.lock().ad_requests.clone()
    }

    pub fn play_count(&self) -> usize {
        self.state.lock().play_count
    }

    /// Fires the first-interaction event, draining one-shot callbacks.
    pub fn fire_first_interaction(&self) {
        let callbacks = std::mem::take(&mut self.state.lock().interaction_callbacks);
        for callback in callbacks {
            callback();
        }
    }

    pub fn pending_interaction_callbacks(&self) -> usize {
        self.state.lock().interaction_callbacks.len()
    }
}

impl Default for MockSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackSurface for MockSurface {
    fn assign_source(&self, source: &ServerSource) {
        self.state.lock().assigned.push(source.clone());
    }

    fn set_sources(&self, sources: &[SourceListing]) {
        self.state.lock().sources = sources.to_vec();
    }

    fn install_error_handler(&self, handler: PlaybackErrorHandler) {
        self.state.lock().handler = Some(Arc::new(handler));
    }

    fn clear_error_handler(&self) {
        self.state.lock().handler = None;
    }

    fn last_error(&self) -> Option<SurfaceErrorCode> {
        self.state.lock().last_error
    }

    fn current_selection(&self) -> Option<QualitySelection> {
        self.state.lock().selection.clone()
    }

    fn once(&self, event: SurfaceEvent, callback: SurfaceCallback) {
        match event {
            SurfaceEvent::FirstInteraction => {
                self.state.lock().interaction_callbacks.push(callback);
            }
        }
    }

    fn is_autoplaying(&self) -> bool {
        self.state.lock().autoplaying
    }

    fn request_ads(&self, request: &AdRequest) {
        self.state.lock().ad_requests.push(request.clone());
    }

    fn begin_playback(&self) {
        self.state.lock().play_count += 1;
    }
}

/// Factory producing [`MockSurface`] instances.
pub struct MockSurfaceFactory {
    extensions: Mutex<Vec<SurfaceExtension>>,
    created_configs: Mutex<Vec<SurfaceConfig>>,
    surface: Arc<MockSurface>,
    fail_creation: Mutex<bool>,
}

impl MockSurfaceFactory {
    pub fn new() -> Self {
        Self {
            extensions: Mutex::new(Vec::new()),
            created_configs: Mutex::new(Vec::new()),
            surface: Arc::new(MockSurface::new()),
            fail_creation: Mutex::new(false),
        }
    }

    /// Factory that hands out the given surface.
    pub fn with_surface(surface: Arc<MockSurface>) -> Self {
        Self {
            extensions: Mutex::new(Vec::new()),
            created_configs: Mutex::new(Vec::new()),
            surface,
            fail_creation: Mutex::new(false),
        }
    }

    pub fn fail_creation(&self) {
        *self.fail_creation.lock() = true;
    }

    pub fn registered_extensions(&self) -> Vec<SurfaceExtension> {
        self.extensions.lock().clone()
    }

    pub fn created_configs(&self) -> Vec<SurfaceConfig> {
        self.created_configs.lock().clone()
    }

    pub fn surface(&self) -> Arc<MockSurface> {
        Arc::clone(&self.surface)
    }
}

impl Default for MockSurfaceFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SurfaceFactory for MockSurfaceFactory {
    type Surface = MockSurface;

    async fn create_surface(
        &self,
        _element: &ElementId,
        config: SurfaceConfig,
    ) -> Result<Arc<MockSurface>, SurfaceError> {
        if *self.fail_creation.lock() {
            return Err(SurfaceError::CreationFailed {
                reason: "scripted creation failure".to_string(),
            });
        }
        self.created_configs.lock().push(config);
        Ok(Arc::clone(&self.surface))
    }

    fn register_extension(&self, extension: SurfaceExtension) -> bool {
        let mut extensions = self.extensions.lock();
        if extensions.contains(&extension) {
            return false;
        }
        extensions.push(extension);
        true
    }
}

#[derive(Default)]
struct LoaderState {
    failing: Vec<String>,
    attempted: Vec<String>,
}

/// Script loader with per-URL scripted outcomes.
#[derive(Clone, Default)]
pub struct MockScriptLoader {
    state: Arc<Mutex<LoaderState>>,
}

impl MockScriptLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_url(&self, url: &str) {
        self.state.lock().failing.push(url.to_string());
    }

    pub fn attempted_urls(&self) -> Vec<String> {
        self.state.lock().attempted.clone()
    }
}

#[async_trait]
impl ScriptLoader for MockScriptLoader {
    async fn load(&self, url: &Url) -> Result<(), ScriptLoadError> {
        let mut state = self.state.lock();
        state.attempted.push(url.to_string());
        if state.failing.iter().any(|failing| failing == url.as_str()) {
            return Err(ScriptLoadError::new("scripted load failure"));
        }
        Ok(())
    }
}
