//! Complete viewer session workflows.

use breakwater_core::player::Player;
use breakwater_core::resolve::SelectionPhase;
use breakwater_core::surface::ElementId;
use breakwater_sim::surface::NETWORK_ERROR;
use breakwater_sim::{
    ScenarioBuilder, SimPeerTransport, SimScriptLoader, SimSurfaceFactory, SwarmEvent,
    peer_candidate, server_candidate, settle, sim_content_id,
};

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A full session: peer-backed start, a viewer quality switch onto new
/// swarm content, and clean teardown.
#[tokio::test]
async fn test_viewer_session_with_quality_switch() {
    init_tracing();

    let transport = SimPeerTransport::supported();
    transport.seed_content(&sim_content_id("hd"), &["feature-hd.mp4", "notes.txt"]);
    transport.seed_content(&sim_content_id("sd"), &["feature-sd.mp4"]);

    let hd_chain = [
        peer_candidate("https://cdn.example.com/hd.mp4", "hd"),
        server_candidate("https://cdn.example.com/hd-mirror.mp4"),
    ];

    let factory = SimSurfaceFactory::new();
    let player = Player::create(
        &factory,
        transport.clone(),
        SimScriptLoader::new(),
        ElementId::new("feature"),
        ScenarioBuilder::new()
            .autoplay(true)
            .preferred_quality("hd")
            .ad_tag("https://ads.example.com/tag")
            .quality_chain("hd", &hd_chain)
            .peer_quality("sd", "https://cdn.example.com/sd.mp4", "sd")
            .build(),
    )
    .await
    .unwrap();
    settle().await;

    let surface = factory.surface();

    // Peer delivery is active; the mp4 member file was rendered
    assert_eq!(player.selection_phase(), SelectionPhase::PeerActive(0));
    assert_eq!(transport.renders().len(), 1);
    assert_eq!(transport.renders()[0].0, "feature-hd.mp4");
    assert!(transport.renders()[0].2.autoplay);

    // Autoplaying session requests the ad overlay immediately
    assert_eq!(surface.ad_requests().len(), 1);

    // Viewer switches to SD; the engine replaces the swarm session
    player.switch_quality("sd").unwrap();
    settle().await;

    assert_eq!(player.selection_phase(), SelectionPhase::PeerActive(0));
    assert_eq!(transport.live_session_count(), 1);
    assert_eq!(
        transport.events().last(),
        Some(&SwarmEvent::ContentAdded(sim_content_id("sd")))
    );

    player.shutdown().await.unwrap();
    assert_eq!(transport.live_session_count(), 0);
}

/// A server-only session that exhausts its fallback chain.
#[tokio::test]
async fn test_viewer_session_exhausts_server_chain() {
    init_tracing();

    let chain = [
        server_candidate("https://cdn.example.com/a.mp4"),
        server_candidate("https://cdn.example.com/b.mp4"),
        server_candidate("https://cdn.example.com/c.mp4"),
    ];

    let factory = SimSurfaceFactory::new();
    let player = Player::create(
        &factory,
        SimPeerTransport::unsupported(),
        SimScriptLoader::new(),
        ElementId::new("feature"),
        ScenarioBuilder::new()
            .preferred_quality("only")
            .quality_chain("only", &chain)
            .build(),
    )
    .await
    .unwrap();

    let surface = factory.surface();
    surface.script_selection("ONLY", &chain);

    surface.inject_playback_error(NETWORK_ERROR);
    surface.inject_playback_error(NETWORK_ERROR);
    assert_eq!(
        surface.assigned_urls(),
        vec![
            "https://cdn.example.com/a.mp4",
            "https://cdn.example.com/b.mp4",
            "https://cdn.example.com/c.mp4",
        ]
    );

    surface.inject_playback_error(NETWORK_ERROR);
    assert_eq!(player.selection_phase(), SelectionPhase::Exhausted);
    assert_eq!(surface.assigned_urls().len(), 3);
}

/// A paused (non-autoplay) session defers ads and playback start to the
/// first viewer interaction.
#[tokio::test]
async fn test_paused_session_defers_ads_to_interaction() {
    init_tracing();

    let factory = SimSurfaceFactory::new();
    let _player = Player::create(
        &factory,
        SimPeerTransport::unsupported(),
        SimScriptLoader::new(),
        ElementId::new("feature"),
        ScenarioBuilder::new()
            .autoplay(false)
            .ad_tag("https://ads.example.com/tag")
            .server_quality("high", "https://cdn.example.com/high.mp4")
            .build(),
    )
    .await
    .unwrap();

    let surface = factory.surface();
    assert!(surface.ad_requests().is_empty());

    surface.fire_first_interaction();
    assert_eq!(surface.ad_requests().len(), 1);
    assert_eq!(surface.play_count(), 1);
}
