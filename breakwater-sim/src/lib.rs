//! Breakwater Simulation Framework - Scripted collaborators for testing.
//!
//! This crate provides simulated implementations of every external
//! collaborator the playback orchestrator consumes: the playback surface,
//! the peer-swarm transport, and the script loader. Each one is fully
//! scripted, records every interaction, and supports deterministic
//! seeded latency so ordering bugs reproduce reliably.
//!
//! # Example
//!
//! ```rust,no_run
//! use breakwater_sim::{ScenarioBuilder, SimPeerTransport, SimScriptLoader, SimSurfaceFactory};
//! use breakwater_core::Player;
//! use breakwater_core::surface::ElementId;
//!
//! # async fn run() -> Result<(), breakwater_core::BreakwaterError> {
//! let options = ScenarioBuilder::new()
//!     .server_quality("high", "https://cdn.example.com/high.mp4")
//!     .server_quality("low", "https://cdn.example.com/low.mp4")
//!     .build();
//!
//! let factory = SimSurfaceFactory::new();
//! let player = Player::create(
//!     &factory,
//!     SimPeerTransport::supported(),
//!     SimScriptLoader::new(),
//!     ElementId::new("player"),
//!     options,
//! )
//! .await?;
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod scenarios;
pub mod surface;
pub mod transport;

pub use loader::SimScriptLoader;
pub use scenarios::{
    ScenarioBuilder, peer_candidate, server_candidate, sim_content_id, sim_magnet,
};
pub use surface::{SimPlaybackSurface, SimSurfaceFactory};
pub use transport::{SimLatency, SimPeerTransport, SwarmEvent};

/// Lets spawned engine work settle on a current-thread runtime.
///
/// The simulated collaborators suspend only at explicit latency points,
/// so advancing the cooperative scheduler a bounded number of steps is
/// enough for in-flight work to finish.
pub async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}
