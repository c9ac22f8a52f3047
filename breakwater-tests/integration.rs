//! Integration tests for Breakwater
//!
//! These tests verify the interaction between the capability gate, the
//! peer session manager, the source resolution engine and the player
//! orchestrator, running against the scripted collaborators from
//! `breakwater-sim`.

#[path = "integration/capability_gate.rs"]
mod capability_gate;

#[path = "integration/fallback_walk.rs"]
mod fallback_walk;

#[path = "integration/peer_lifecycle.rs"]
mod peer_lifecycle;

#[path = "integration/selection_isolation.rs"]
mod selection_isolation;
