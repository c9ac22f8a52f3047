//! Scenario builders for integration and end-to-end tests.
//!
//! Builds `PlayerOptions` the way an embedding page would supply them:
//! a JSON object per quality, a candidate object or array per label.

use breakwater_core::config::PlayerOptions;
use breakwater_core::source::{PeerContentId, SourceCandidate};
use serde_json::{Map, Value, json};
use url::Url;

/// Magnet URI for simulated swarm content, distinguished by tag.
pub fn sim_magnet(tag: &str) -> String {
    format!("magnet:?xt=urn:btih:08ada5a7a6183aae1e09d831df6748d566095a10&dn=content-{tag}")
}

/// Parsed [`PeerContentId`] for a simulated magnet tag.
///
/// # Panics
/// Never in practice; `sim_magnet` always produces a valid URI.
pub fn sim_content_id(tag: &str) -> PeerContentId {
    PeerContentId::parse(&sim_magnet(tag)).expect("sim magnet is valid")
}

/// Candidate list entry for [`ScenarioBuilder`] and surface scripting.
pub fn server_candidate(url: &str) -> SourceCandidate {
    SourceCandidate::server_only(Url::parse(url).expect("test URL is valid"), "video/mp4")
}

/// Peer-backed candidate for [`ScenarioBuilder`] and surface scripting.
pub fn peer_candidate(url: &str, magnet_tag: &str) -> SourceCandidate {
    SourceCandidate::with_peer(
        Url::parse(url).expect("test URL is valid"),
        "video/mp4",
        sim_content_id(magnet_tag),
    )
}

/// Builder for caller-shaped player options.
pub struct ScenarioBuilder {
    autoplay: Option<bool>,
    preferred_quality: Option<String>,
    ad_tag_url: Option<String>,
    use_peer_delivery: Option<bool>,
    sources: Map<String, Value>,
}

impl ScenarioBuilder {
    pub fn new() -> Self {
        Self {
            autoplay: None,
            preferred_quality: None,
            ad_tag_url: None,
            use_peer_delivery: None,
            sources: Map::new(),
        }
    }

    pub fn autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = Some(autoplay);
        self
    }

    pub fn preferred_quality(mut self, label: &str) -> Self {
        self.preferred_quality = Some(label.to_string());
        self
    }

    pub fn ad_tag(mut self, url: &str) -> Self {
        self.ad_tag_url = Some(url.to_string());
        self
    }

    pub fn use_peer_delivery(mut self, enabled: bool) -> Self {
        self.use_peer_delivery = Some(enabled);
        self
    }

    /// Adds a quality with a single server-only candidate.
    pub fn server_quality(mut self, label: &str, url: &str) -> Self {
        self.sources.insert(
            label.to_string(),
            json!({ "src": url, "type": "video/mp4" }),
        );
        self
    }

    /// Adds a quality with a single peer-backed candidate.
    pub fn peer_quality(mut self, label: &str, url: &str, magnet_tag: &str) -> Self {
        self.sources.insert(
            label.to_string(),
            json!({ "src": url, "type": "video/mp4", "magnet": sim_magnet(magnet_tag) }),
        );
        self
    }

    /// Adds a quality with an ordered candidate array (fallback priority).
    pub fn quality_chain(mut self, label: &str, candidates: &[SourceCandidate]) -> Self {
        let chain: Vec<Value> = candidates
            .iter()
            .map(|candidate| {
                let mut entry = json!({
                    "src": candidate.server_url.as_str(),
                    "type": candidate.media_type,
                });
                if let Some(content) = &candidate.peer_content {
                    entry["magnet"] = Value::String(content.as_str().to_string());
                }
                entry
            })
            .collect();
        self.sources.insert(label.to_string(), Value::Array(chain));
        self
    }

    /// Builds the options object the way an embedding caller would.
    ///
    /// # Panics
    /// Never in practice; the builder only assembles recognized shapes.
    pub fn build(self) -> PlayerOptions {
        let mut object = Map::new();
        if let Some(autoplay) = self.autoplay {
            object.insert("autoplay".to_string(), Value::Bool(autoplay));
        }
        if let Some(label) = self.preferred_quality {
            object.insert("preferred_quality".to_string(), Value::String(label));
        }
        if let Some(tag) = self.ad_tag_url {
            object.insert("adTagUrl".to_string(), Value::String(tag));
        }
        if let Some(enabled) = self.use_peer_delivery {
            object.insert("use_peer_delivery".to_string(), Value::Bool(enabled));
        }
        object.insert("sources".to_string(), Value::Object(self.sources));

        PlayerOptions::from_json(Value::Object(object)).expect("builder output is well-formed")
    }
}

impl Default for ScenarioBuilder {
    fn default() -> Self {
        Self::new()
    }
}
