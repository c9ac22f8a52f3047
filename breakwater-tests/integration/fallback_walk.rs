//! Fallback walk behavior: candidate chains, degradation and exhaustion.

use breakwater_core::player::Player;
use breakwater_core::resolve::SelectionPhase;
use breakwater_core::surface::ElementId;
use breakwater_sim::surface::{DECODE_ERROR, NETWORK_ERROR};
use breakwater_sim::{
    ScenarioBuilder, SimPeerTransport, SimScriptLoader, SimSurfaceFactory, peer_candidate,
    server_candidate, settle, sim_content_id,
};

#[tokio::test]
async fn test_server_chain_walks_then_exhausts() {
    let chain = [
        server_candidate("https://cdn.example.com/a.mp4"),
        server_candidate("https://cdn.example.com/b.mp4"),
    ];

    let factory = SimSurfaceFactory::new();
    let player = Player::create(
        &factory,
        SimPeerTransport::supported(),
        SimScriptLoader::new(),
        ElementId::new("player"),
        ScenarioBuilder::new()
            .use_peer_delivery(false)
            .preferred_quality("low")
            .quality_chain("low", &chain)
            .build(),
    )
    .await
    .unwrap();

    let surface = factory.surface();
    surface.script_selection("LOW", &chain);
    assert_eq!(surface.assigned_urls(), vec!["https://cdn.example.com/a.mp4"]);

    surface.inject_playback_error(NETWORK_ERROR);
    assert_eq!(
        surface.assigned_urls(),
        vec![
            "https://cdn.example.com/a.mp4",
            "https://cdn.example.com/b.mp4"
        ]
    );

    surface.inject_playback_error(NETWORK_ERROR);
    assert_eq!(player.selection_phase(), SelectionPhase::Exhausted);
    // Terminal: no further source assignment after exhaustion
    assert_eq!(surface.assigned_urls().len(), 2);
}

#[tokio::test]
async fn test_peer_failure_degrades_to_server_without_advancing() {
    let transport = SimPeerTransport::supported();
    transport.fail_content(&sim_content_id("x"), "no seeders");

    let factory = SimSurfaceFactory::new();
    let player = Player::create(
        &factory,
        transport.clone(),
        SimScriptLoader::new(),
        ElementId::new("player"),
        ScenarioBuilder::new()
            .peer_quality("high", "https://cdn.example.com/x.mp4", "x")
            .build(),
    )
    .await
    .unwrap();
    settle().await;

    // Same candidate's server URL, index 0, not the next candidate
    assert_eq!(
        factory.surface().assigned_urls(),
        vec!["https://cdn.example.com/x.mp4"]
    );
    assert_eq!(player.selection_phase(), SelectionPhase::ServerActive(0));
}

#[tokio::test]
async fn test_decode_error_walks_to_peer_backed_alternate() {
    let transport = SimPeerTransport::supported();
    transport.seed_content(&sim_content_id("alt"), &["alt.mp4"]);

    let chain = [
        server_candidate("https://cdn.example.com/a.mp4"),
        peer_candidate("https://cdn.example.com/b.mp4", "alt"),
    ];

    let factory = SimSurfaceFactory::new();
    let player = Player::create(
        &factory,
        transport.clone(),
        SimScriptLoader::new(),
        ElementId::new("player"),
        ScenarioBuilder::new()
            .use_peer_delivery(true)
            .preferred_quality("low")
            .quality_chain("low", &chain)
            .build(),
    )
    .await
    .unwrap();
    settle().await;

    let surface = factory.surface();
    surface.script_selection("LOW", &chain);

    surface.inject_playback_error(DECODE_ERROR);
    settle().await;

    // The fallback candidate re-enters the full policy: peer delivery
    assert_eq!(player.selection_phase(), SelectionPhase::PeerActive(1));
    let renders = transport.renders();
    assert_eq!(renders.len(), 1);
    assert_eq!(renders[0].0, "alt.mp4");
}

#[tokio::test]
async fn test_ignored_error_class_leaves_walk_untouched() {
    let chain = [
        server_candidate("https://cdn.example.com/a.mp4"),
        server_candidate("https://cdn.example.com/b.mp4"),
    ];

    let factory = SimSurfaceFactory::new();
    let player = Player::create(
        &factory,
        SimPeerTransport::unsupported(),
        SimScriptLoader::new(),
        ElementId::new("player"),
        ScenarioBuilder::new()
            .preferred_quality("low")
            .quality_chain("low", &chain)
            .build(),
    )
    .await
    .unwrap();

    let surface = factory.surface();
    surface.script_selection("LOW", &chain);

    // MEDIA_ERR_ABORTED: inert for the walk
    surface.inject_playback_error(breakwater_core::surface::SurfaceErrorCode(1));
    assert_eq!(surface.assigned_urls().len(), 1);
    assert_eq!(player.selection_phase(), SelectionPhase::ServerActive(0));
}
