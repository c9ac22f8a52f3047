//! Isolation between successive quality selections.

use breakwater_core::player::Player;
use breakwater_core::resolve::SelectionPhase;
use breakwater_core::source::Quality;
use breakwater_core::surface::ElementId;
use breakwater_sim::surface::NETWORK_ERROR;
use breakwater_sim::{
    ScenarioBuilder, SimPeerTransport, SimScriptLoader, SimSurfaceFactory, server_candidate,
    settle, sim_content_id,
};

#[tokio::test]
async fn test_error_after_switch_walks_new_quality_only() {
    let low_chain = [
        server_candidate("https://cdn.example.com/low-a.mp4"),
        server_candidate("https://cdn.example.com/low-b.mp4"),
    ];
    let high_chain = [
        server_candidate("https://cdn.example.com/high-a.mp4"),
        server_candidate("https://cdn.example.com/high-b.mp4"),
    ];

    let factory = SimSurfaceFactory::new();
    let player = Player::create(
        &factory,
        SimPeerTransport::unsupported(),
        SimScriptLoader::new(),
        ElementId::new("player"),
        ScenarioBuilder::new()
            .preferred_quality("low")
            .quality_chain("low", &low_chain)
            .quality_chain("high", &high_chain)
            .build(),
    )
    .await
    .unwrap();

    let surface = factory.surface();
    surface.script_selection("LOW", &low_chain);

    player.switch_quality("high").unwrap();
    surface.script_selection("HIGH", &high_chain);

    surface.inject_playback_error(NETWORK_ERROR);

    // The walk advanced within the new quality's chain; the old
    // selection's candidates are never touched
    assert_eq!(player.current_quality(), Some(Quality::new("high")));
    assert_eq!(
        surface.assigned_urls(),
        vec![
            "https://cdn.example.com/low-a.mp4",
            "https://cdn.example.com/high-a.mp4",
            "https://cdn.example.com/high-b.mp4",
        ]
    );
}

#[tokio::test]
async fn test_handler_is_replaced_not_stacked() {
    let factory = SimSurfaceFactory::new();
    let player = Player::create(
        &factory,
        SimPeerTransport::unsupported(),
        SimScriptLoader::new(),
        ElementId::new("player"),
        ScenarioBuilder::new()
            .server_quality("high", "https://cdn.example.com/high.mp4")
            .server_quality("low", "https://cdn.example.com/low.mp4")
            .build(),
    )
    .await
    .unwrap();

    let surface = factory.surface();
    assert!(surface.has_error_handler());
    let installs_after_create = surface.handler_install_count();

    player.switch_quality("low").unwrap();
    // One fresh install for the new selection, still exactly one handler
    assert_eq!(surface.handler_install_count(), installs_after_create + 1);
    assert!(surface.has_error_handler());
}

#[tokio::test]
async fn test_stale_peer_switch_renders_nothing_over_new_selection() {
    let transport = SimPeerTransport::supported();
    let gate = transport.hold_content(&sim_content_id("slow"), &["slow.mp4"]);

    let factory = SimSurfaceFactory::new();
    let player = Player::create(
        &factory,
        transport.clone(),
        SimScriptLoader::new(),
        ElementId::new("player"),
        ScenarioBuilder::new()
            .preferred_quality("high")
            .peer_quality("high", "https://cdn.example.com/high.mp4", "slow")
            .server_quality("low", "https://cdn.example.com/low.mp4")
            .build(),
    )
    .await
    .unwrap();
    settle().await;

    // Supersede the selection while the swarm add is still in flight
    player.switch_quality("low").unwrap();
    gate.add_permits(1);
    settle().await;

    assert!(transport.renders().is_empty());
    assert_eq!(player.selection_phase(), SelectionPhase::ServerActive(0));
    assert_eq!(player.current_quality(), Some(Quality::new("low")));
    assert_eq!(
        factory.surface().assigned_urls(),
        vec!["https://cdn.example.com/low.mp4"]
    );
}
