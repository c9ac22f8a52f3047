//! Capability gate: startup barrier for external script dependencies.
//!
//! All script loads are issued concurrently and the gate completes only
//! after every attempt has settled. A failed required script fails the
//! gate; failed optional scripts are logged and tolerated. On success the
//! gate registers the capability extensions on the surface factory through
//! a one-shot registry, so re-running the gate never double-registers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use futures::future;
use url::Url;

use crate::surface::{SurfaceExtension, SurfaceFactory};

/// A required capability failed to load. Fatal for player construction.
#[derive(Debug, thiserror::Error)]
pub enum DependencyError {
    #[error("Required script failed to load: {url}: {reason}")]
    RequiredScriptFailed { url: String, reason: String },
}

/// Failure reported by a [`ScriptLoader`] for one load attempt.
#[derive(Debug, thiserror::Error)]
#[error("Script load failed: {reason}")]
pub struct ScriptLoadError {
    pub reason: String,
}

impl ScriptLoadError {
    pub fn new(reason: &str) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

/// One external script the player depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRequirement {
    pub url: Url,
    pub required: bool,
}

impl ScriptRequirement {
    pub fn required(url: Url) -> Self {
        Self {
            url,
            required: true,
        }
    }

    pub fn optional(url: Url) -> Self {
        Self {
            url,
            required: false,
        }
    }
}

/// Loads external scripts into the embedding environment.
///
/// Wraps the environment's load/error callbacks as a future; resolution
/// means the script is installed and usable.
#[async_trait]
pub trait ScriptLoader: Send + Sync {
    /// Loads one script.
    ///
    /// # Errors
    /// - `ScriptLoadError` - The script could not be fetched or evaluated
    async fn load(&self, url: &Url) -> Result<(), ScriptLoadError>;
}

/// One-shot registry for capability extensions.
///
/// Extension registration on the shared surface factory must happen at
/// most once per process; the registry makes that explicit instead of
/// relying on load-order side effects.
#[derive(Debug, Default)]
pub struct ExtensionRegistry {
    registered: AtomicBool,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self {
            registered: AtomicBool::new(false),
        }
    }

    /// Returns the process-wide registry instance.
    pub fn global() -> Arc<ExtensionRegistry> {
        static GLOBAL: OnceLock<Arc<ExtensionRegistry>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| Arc::new(ExtensionRegistry::new()))
            .clone()
    }

    /// Registers the capability extensions on the factory, once.
    ///
    /// Returns `true` when this call performed the registration, `false`
    /// when a prior call already had.
    pub fn register_once<F: SurfaceFactory>(&self, factory: &F) -> bool {
        if self.registered.swap(true, Ordering::SeqCst) {
            return false;
        }

        factory.register_extension(SurfaceExtension::Ads);
        factory.register_extension(SurfaceExtension::QualitySwitch);
        true
    }
}

/// Startup barrier that settles all script loads before player creation.
pub struct CapabilityGate<L> {
    loader: L,
    scripts: Vec<ScriptRequirement>,
    registry: Arc<ExtensionRegistry>,
}

impl<L: ScriptLoader> CapabilityGate<L> {
    /// Creates a gate using the process-wide extension registry.
    pub fn new(loader: L, scripts: Vec<ScriptRequirement>) -> Self {
        Self::with_registry(loader, scripts, ExtensionRegistry::global())
    }

    /// Creates a gate with an explicit registry (isolated registration).
    pub fn with_registry(
        loader: L,
        scripts: Vec<ScriptRequirement>,
        registry: Arc<ExtensionRegistry>,
    ) -> Self {
        Self {
            loader,
            scripts,
            registry,
        }
    }

    /// Waits for every script load to settle, then registers extensions.
    ///
    /// All loads run concurrently; the gate never short-circuits, so every
    /// attempt is started regardless of early failures.
    ///
    /// # Errors
    /// - `DependencyError::RequiredScriptFailed` - A required script failed
    pub async fn prepare<F: SurfaceFactory>(&self, factory: &F) -> Result<(), DependencyError> {
        let attempts = self.scripts.iter().map(|script| async move {
            let outcome = self.loader.load(&script.url).await;
            (script, outcome)
        });

        let settled = future::join_all(attempts).await;

        let mut first_required_failure: Option<(&ScriptRequirement, ScriptLoadError)> = None;
        for (script, outcome) in settled {
            match outcome {
                Ok(()) => {
                    tracing::debug!(url = %script.url, "Capability script loaded");
                }
                Err(error) if script.required => {
                    tracing::error!(url = %script.url, %error, "Required capability script failed");
                    if first_required_failure.is_none() {
                        first_required_failure = Some((script, error));
                    }
                }
                Err(error) => {
                    tracing::warn!(url = %script.url, %error, "Optional capability script failed");
                }
            }
        }

        if let Some((script, error)) = first_required_failure {
            return Err(DependencyError::RequiredScriptFailed {
                url: script.url.to_string(),
                reason: error.to_string(),
            });
        }

        if self.registry.register_once(factory) {
            tracing::info!("Capability extensions registered on surface factory");
        }

        Ok(())
    }
}
