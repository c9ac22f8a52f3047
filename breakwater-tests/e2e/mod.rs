//! End-to-end tests for Breakwater
//!
//! These tests drive complete viewer sessions from player construction
//! through quality switches, delivery degradation and teardown, against
//! the full set of simulated collaborators.

mod viewer_session;
