//! Ad overlay activation.
//!
//! Runs once after the initial source assignment. With an ad tag
//! configured, the overlay is requested immediately when the surface is
//! autoplaying; otherwise the request is deferred to the first viewer
//! interaction, which also starts playback. Without an ad tag there is
//! nothing to request, but a non-autoplaying surface still gets its
//! playback start wired to the interaction event.

use std::sync::Arc;

use crate::config::AdsConfig;
use crate::surface::{AdRequest, ElementId, PlaybackSurface, SurfaceEvent};

/// Activates the ad overlay for a freshly created player.
pub fn activate<S: PlaybackSurface>(
    surface: &Arc<S>,
    config: &AdsConfig,
    element: &ElementId,
    autoplaying: bool,
) {
    match &config.ad_tag_url {
        Some(tag_url) => {
            let request = AdRequest {
                element: element.clone(),
                tag_url: tag_url.clone(),
                label: config.ad_label.clone(),
            };

            if autoplaying {
                tracing::info!(tag = %request.tag_url, "Requesting ad overlay");
                surface.request_ads(&request);
            } else {
                tracing::debug!(
                    tag = %request.tag_url,
                    "Deferring ad request to first interaction"
                );
                let deferred = Arc::clone(surface);
                surface.once(
                    SurfaceEvent::FirstInteraction,
                    Box::new(move || {
                        deferred.request_ads(&request);
                        deferred.begin_playback();
                    }),
                );
            }
        }
        None => {
            if !autoplaying {
                let deferred = Arc::clone(surface);
                surface.once(
                    SurfaceEvent::FirstInteraction,
                    Box::new(move || deferred.begin_playback()),
                );
            }
        }
    }
}
