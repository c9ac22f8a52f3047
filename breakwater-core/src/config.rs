//! Centralized configuration for Breakwater.
//!
//! All tunable parameters and defaults are defined here to avoid
//! hard-coded values scattered throughout the codebase. Caller-supplied
//! `PlayerOptions` merge over these defaults at player construction.

use serde::Deserialize;
use serde_json::Value;

/// Central configuration for all Breakwater components.
///
/// Groups related configuration settings into logical sections.
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct BreakwaterConfig {
    pub playback: PlaybackConfig,
    pub delivery: DeliveryConfig,
    pub ads: AdsConfig,
}

/// Playback surface behavior configuration.
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Start playback automatically once a source is active
    pub autoplay: bool,
    /// Show the surface's transport controls
    pub controls: bool,
    /// Quality label selected for the initial render
    pub preferred_quality: String,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            autoplay: true,
            controls: true,
            preferred_quality: "high".to_string(),
        }
    }
}

/// Source delivery configuration.
///
/// Controls whether peer-swarm delivery is attempted at all and how the
/// fallback walk treats candidates it reaches after a playback error.
///
/// No timeouts are modeled here: a hung script load or peer-session switch
/// blocks that operation's future indefinitely. Embedders that need
/// deadlines must wrap the collaborator contracts themselves.
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// Attempt peer-swarm delivery when a candidate carries an identifier
    pub use_peer_delivery: bool,
    /// Whether candidates reached by the fallback walk get their own peer
    /// attempt, or are forced straight to their server URL
    pub peer_retry_on_fallback: bool,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            use_peer_delivery: true,
            peer_retry_on_fallback: true,
        }
    }
}

/// Advertising overlay configuration.
#[derive(Debug, Clone)]
pub struct AdsConfig {
    /// Ad tag URL for the overlay; `None` disables ad requests entirely
    pub ad_tag_url: Option<String>,
    /// Label shown while an ad is playing
    pub ad_label: String,
    /// External ad SDK script loaded by the capability gate (optional load)
    pub sdk_script_url: &'static str,
}

impl Default for AdsConfig {
    fn default() -> Self {
        Self {
            ad_tag_url: None,
            ad_label: "Advertising".to_string(),
            sdk_script_url: "https://imasdk.googleapis.com/js/sdkloader/ima3.js",
        }
    }
}

impl BreakwaterConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Allows runtime configuration via environment variables while
    /// maintaining sensible defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(autoplay) = std::env::var("BREAKWATER_AUTOPLAY") {
            config.playback.autoplay = autoplay.parse().unwrap_or(true);
        }

        if let Ok(quality) = std::env::var("BREAKWATER_PREFERRED_QUALITY") {
            config.playback.preferred_quality = quality;
        }

        if let Ok(enabled) = std::env::var("BREAKWATER_PEER_DELIVERY") {
            config.delivery.use_peer_delivery = enabled.parse().unwrap_or(true);
        }

        config
    }

    /// Creates a configuration preset for tests.
    ///
    /// Autoplay is disabled so tests control playback start explicitly.
    pub fn for_testing() -> Self {
        Self {
            playback: PlaybackConfig {
                autoplay: false,
                controls: false,
                preferred_quality: "high".to_string(),
            },
            delivery: DeliveryConfig::default(),
            ads: AdsConfig::default(),
        }
    }
}

/// Caller-facing player options, merged over [`BreakwaterConfig`] defaults.
///
/// Deserialized from JSON-shaped input. Unrecognized keys are collected in
/// `extra` and passed through unvalidated. Field aliases accept the legacy
/// option names (`prefer_quality`, `adTagUrl`, `adLabel`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlayerOptions {
    pub autoplay: Option<bool>,
    pub controls: Option<bool>,
    /// Quality label to ordered candidate list (object or array per label)
    pub sources: serde_json::Map<String, Value>,
    #[serde(alias = "prefer_quality")]
    pub preferred_quality: Option<String>,
    #[serde(alias = "adTagUrl")]
    pub ad_tag_url: Option<String>,
    #[serde(alias = "adLabel")]
    pub ad_label: Option<String>,
    pub use_peer_delivery: Option<bool>,
    /// Unrecognized keys, preserved for surface-specific extensions
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl PlayerOptions {
    /// Parses options from a JSON value.
    ///
    /// # Errors
    /// - `serde_json::Error` - Input is not an object of the expected shape
    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Merges these options over the given configuration, key by key.
    pub fn apply(&self, config: &mut BreakwaterConfig) {
        if let Some(autoplay) = self.autoplay {
            config.playback.autoplay = autoplay;
        }
        if let Some(controls) = self.controls {
            config.playback.controls = controls;
        }
        if let Some(quality) = &self.preferred_quality {
            config.playback.preferred_quality = quality.clone();
        }
        if let Some(tag) = &self.ad_tag_url {
            config.ads.ad_tag_url = Some(tag.clone());
        }
        if let Some(label) = &self.ad_label {
            config.ads.ad_label = label.clone();
        }
        if let Some(enabled) = self.use_peer_delivery {
            config.delivery.use_peer_delivery = enabled;
        }
    }
}
