//! Simulated playback surface recording every mutation.
//!
//! The surface mimics a media-element abstraction with a quality-switch
//! extension: it keeps a per-quality candidate list that the resolution
//! engine reads during the fallback walk, and playback errors are
//! injected by tests the way a real error event would fire.

use std::sync::Arc;

use async_trait::async_trait;
use breakwater_core::source::{SourceCandidate, SourceListing};
use breakwater_core::surface::{
    AdRequest, ElementId, PlaybackErrorHandler, PlaybackSurface, QualitySelection, RenderOptions,
    ServerSource, SurfaceCallback, SurfaceConfig, SurfaceError, SurfaceErrorCode, SurfaceEvent,
    SurfaceExtension, SurfaceFactory,
};
use parking_lot::Mutex;

// HTML media error numbering
pub const NETWORK_ERROR: SurfaceErrorCode = SurfaceErrorCode(2);
pub const DECODE_ERROR: SurfaceErrorCode = SurfaceErrorCode(3);

#[derive(Default)]
struct SurfaceState {
    assigned: Vec<ServerSource>,
    sources: Vec<SourceListing>,
    handler: Option<Arc<PlaybackErrorHandler>>,
    handler_installs: usize,
    last_error: Option<SurfaceErrorCode>,
    selection: Option<QualitySelection>,
    autoplaying: bool,
    interaction_callbacks: Vec<SurfaceCallback>,
    ad_requests: Vec<AdRequest>,
    play_count: usize,
}

/// Scripted playback surface.
pub struct SimPlaybackSurface {
    state: Mutex<SurfaceState>,
}

impl SimPlaybackSurface {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SurfaceState {
                autoplaying: true,
                ..SurfaceState::default()
            }),
        }
    }

    pub fn set_autoplaying(&self, autoplaying: bool) {
        self.state.lock().autoplaying = autoplaying;
    }

    /// Scripts the quality-switch extension's view of the current
    /// selection: the label plus its full candidate list.
    pub fn script_selection(&self, label: &str, candidates: &[SourceCandidate]) {
        self.state.lock().selection = Some(QualitySelection {
            label: label.to_uppercase(),
            candidates: candidates.to_vec(),
        });
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

    /// Fires the first-interaction event, draining one-shot callbacks.
    pub fn fire_first_interaction(&self) {
        let callbacks = std::mem::take(&mut self.state.lock().interaction_callbacks);
        for callback in callbacks {
            callback();
        }
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

    /// How many times a handler has been installed. Paired with
    /// `has_error_handler` this distinguishes replaced from stacked.
    pub fn handler_install_count(&self) -> usize {
        self.state.lock().handler_installs
    }

    pub fn has_error_handler(&self) -> bool {
        self.state.lock().handler.is_some()
    }

    pub fn ad_requests(&self) -> Vec<AdRequest> {
        self.state.lock().ad_requests.clone()
    }

    pub fn play_count(&self) -> usize {
        self.state.lock().play_count
    }
}

impl Default for SimPlaybackSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackSurface for SimPlaybackSurface {
    fn assign_source(&self, source: &ServerSource) {
        tracing::debug!(url = %source.url, "Sim surface source assigned");
        self.state.lock().assigned.push(source.clone());
    }

    fn set_sources(&self, sources: &[SourceListing]) {
        self.state.lock().sources = sources.to_vec();
    }

    fn install_error_handler(&self, handler: PlaybackErrorHandler) {
        let mut state = self.state.lock();
        state.handler = Some(Arc::new(handler));
        state.handler_installs += 1;
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

/// Factory handing out one shared [`SimPlaybackSurface`].
pub struct SimSurfaceFactory {
    surface: Arc<SimPlaybackSurface>,
    extensions: Mutex<Vec<SurfaceExtension>>,
    created_configs: Mutex<Vec<SurfaceConfig>>,
    fail_creation: Mutex<bool>,
}

impl SimSurfaceFactory {
    pub fn new() -> Self {
        Self {
            surface: Arc::new(SimPlaybackSurface::new()),
            extensions: Mutex::new(Vec::new()),
            created_configs: Mutex::new(Vec::new()),
            fail_creation: Mutex::new(false),
        }
    }

    /// The surface every `create_surface` call resolves with.
    pub fn surface(&self) -> Arc<SimPlaybackSurface> {
        Arc::clone(&self.surface)
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
}

impl Default for SimSurfaceFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SurfaceFactory for SimSurfaceFactory {
    type Surface = SimPlaybackSurface;

    async fn create_surface(
        &self,
        element: &ElementId,
        config: SurfaceConfig,
    ) -> Result<Arc<SimPlaybackSurface>, SurfaceError> {
        if *self.fail_creation.lock() {
            return Err(SurfaceError::CreationFailed {
                reason: "simulated creation failure".to_string(),
            });
        }
        tracing::debug!(%element, "Sim surface created");
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
