//! Simulated external script loader.

use std::sync::Arc;

use async_trait::async_trait;
use breakwater_core::capability::{ScriptLoadError, ScriptLoader};
use parking_lot::Mutex;
use url::Url;

#[derive(Default)]
struct LoaderState {
    failing: Vec<String>,
    attempted: Vec<String>,
}

/// Script loader with per-URL scripted outcomes and an attempt log.
#[derive(Clone, Default)]
pub struct SimScriptLoader {
    state: Arc<Mutex<LoaderState>>,
}

impl SimScriptLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes loads of the given URL fail.
    pub fn fail_url(&self, url: &str) {
        self.state.lock().failing.push(url.to_string());
    }

    /// Every URL a load was attempted for, in order.
    pub fn attempted_urls(&self) -> Vec<String> {
        self.state.lock().attempted.clone()
    }
}

#[async_trait]
impl ScriptLoader for SimScriptLoader {
    async fn load(&self, url: &Url) -> Result<(), ScriptLoadError> {
        let mut state = self.state.lock();
        state.attempted.push(url.to_string());
        if state.failing.iter().any(|failing| failing == url.as_str()) {
            tracing::debug!(%url, "Sim script load failed");
            return Err(ScriptLoadError::new("simulated load failure"));
        }
        tracing::debug!(%url, "Sim script loaded");
        Ok(())
    }
}
