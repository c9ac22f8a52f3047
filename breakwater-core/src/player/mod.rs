//! Player orchestration: capability gate, surface creation, initial
//! selection and ad overlay activation.
//!
//! Deliberately thin. Every quality change after construction is
//! delegated to the resolution engine.

use std::sync::Arc;

use url::Url;

use crate::capability::{CapabilityGate, ScriptLoader, ScriptRequirement};
use crate::config::{BreakwaterConfig, PlayerOptions};
use crate::peer::{PeerSessionManager, PeerTransport};
use crate::resolve::{DeliveryPolicy, SelectionPhase, SourceResolver};
use crate::source::{Quality, SourceSet};
use crate::surface::{ElementId, PlaybackSurface, SurfaceConfig, SurfaceFactory};
use crate::{BreakwaterError, ads};

/// A constructed player: one surface, one resolution engine, one source set.
pub struct Player<F: SurfaceFactory, T: PeerTransport> {
    element: ElementId,
    config: BreakwaterConfig,
    sources: SourceSet,
    surface: Arc<F::Surface>,
    resolver: SourceResolver<F::Surface, T>,
}

impl<F: SurfaceFactory, T: PeerTransport> Player<F, T> {
    /// Creates a player: options over defaults, capability gate, surface
    /// creation, flattened initial sources, initial selection, ad overlay.
    ///
    /// # Errors
    /// - `BreakwaterError::NoSourcesConfigured` - Empty `sources` option
    /// - `BreakwaterError::Source` - Malformed source configuration
    /// - `BreakwaterError::Dependency` - A required capability script failed
    /// - `BreakwaterError::Surface` - Surface creation failed
    pub async fn create<L: ScriptLoader>(
        factory: &F,
        transport: T,
        loader: L,
        element: ElementId,
        options: PlayerOptions,
    ) -> Result<Self, BreakwaterError> {
        let mut config = BreakwaterConfig::default();
        options.apply(&mut config);

        let sources = SourceSet::from_options(&options.sources)?;
        if sources.is_empty() {
            return Err(BreakwaterError::NoSourcesConfigured);
        }

        let sdk_url = Url::parse(config.ads.sdk_script_url).map_err(|e| {
            BreakwaterError::Configuration {
                reason: format!("invalid ad SDK script URL: {e}"),
            }
        })?;
        let gate = CapabilityGate::new(loader, vec![ScriptRequirement::optional(sdk_url)]);
        gate.prepare(factory).await?;

        let surface = factory
            .create_surface(
                &element,
                SurfaceConfig {
                    autoplay: config.playback.autoplay,
                    controls: config.playback.controls,
                    preferred_quality: config.playback.preferred_quality.clone(),
                },
            )
            .await?;
        surface.set_sources(&sources.initial_listing());

        let resolver = SourceResolver::new(
            Arc::clone(&surface),
            PeerSessionManager::new(transport),
            element.clone(),
            DeliveryPolicy::from_config(&config),
        );

        let quality = sources
            .resolve_preferred(&config.playback.preferred_quality)
            .cloned()
            .ok_or(BreakwaterError::NoSourcesConfigured)?;
        let candidates = sources
            .candidates(&quality)
            .map(<[_]>::to_vec)
            .unwrap_or_default();
        resolver.select(quality, candidates, true);

        ads::activate(&surface, &config.ads, &element, config.playback.autoplay);

        tracing::info!(element = %element, qualities = sources.len(), "Player created");

        Ok(Self {
            element,
            config,
            sources,
            surface,
            resolver,
        })
    }

    /// Switches to another configured quality.
    ///
    /// # Errors
    /// - `BreakwaterError::UnknownQuality` - Label is not configured
    pub fn switch_quality(&self, label: &str) -> Result<Arc<F::Surface>, BreakwaterError> {
        let quality = Quality::new(label);
        let candidates = self
            .sources
            .candidates(&quality)
            .ok_or_else(|| BreakwaterError::UnknownQuality {
                label: label.to_string(),
            })?
            .to_vec();

        Ok(self.resolver.select(quality, candidates, false))
    }

    /// The shared playback surface.
    pub fn surface(&self) -> Arc<F::Surface> {
        Arc::clone(&self.surface)
    }

    /// Phase of the active quality selection.
    pub fn selection_phase(&self) -> SelectionPhase {
        self.resolver.phase()
    }

    /// Quality of the active selection.
    pub fn current_quality(&self) -> Option<Quality> {
        self.resolver.current_quality()
    }

    pub fn element(&self) -> &ElementId {
        &self.element
    }

    pub fn config(&self) -> &BreakwaterConfig {
        &self.config
    }

    /// Tears down any live peer session.
    ///
    /// # Errors
    /// - `BreakwaterError::PeerSession` - Session teardown failed
    pub async fn shutdown(&self) -> Result<(), BreakwaterError> {
        self.resolver.sessions().shutdown().await?;
        Ok(())
    }
}
