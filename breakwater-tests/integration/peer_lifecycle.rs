//! Peer session lifecycle invariants driven through the player.

use breakwater_core::player::Player;
use breakwater_core::surface::ElementId;
use breakwater_sim::{
    ScenarioBuilder, SimPeerTransport, SimScriptLoader, SimSurfaceFactory, SwarmEvent, settle,
    sim_content_id,
};

#[tokio::test]
async fn test_switch_with_no_prior_session_creates_exactly_once() {
    let transport = SimPeerTransport::supported();
    transport.seed_content(&sim_content_id("high"), &["movie.mp4"]);

    let factory = SimSurfaceFactory::new();
    let _player = Player::create(
        &factory,
        transport.clone(),
        SimScriptLoader::new(),
        ElementId::new("player"),
        ScenarioBuilder::new()
            .peer_quality("high", "https://cdn.example.com/high.mp4", "high")
            .build(),
    )
    .await
    .unwrap();
    settle().await;

    assert_eq!(
        transport.events(),
        vec![
            SwarmEvent::SessionCreated,
            SwarmEvent::ContentAdded(sim_content_id("high")),
        ]
    );
    assert_eq!(transport.live_session_count(), 1);
}

#[tokio::test]
async fn test_quality_switch_destroys_before_next_create() {
    let transport = SimPeerTransport::supported();
    transport.seed_content(&sim_content_id("high"), &["high.mp4"]);
    transport.seed_content(&sim_content_id("low"), &["low.mp4"]);

    let factory = SimSurfaceFactory::new();
    let player = Player::create(
        &factory,
        transport.clone(),
        SimScriptLoader::new(),
        ElementId::new("player"),
        ScenarioBuilder::new()
            .peer_quality("high", "https://cdn.example.com/high.mp4", "high")
            .peer_quality("low", "https://cdn.example.com/low.mp4", "low")
            .build(),
    )
    .await
    .unwrap();
    settle().await;

    player.switch_quality("low").unwrap();
    settle().await;

    assert_eq!(
        transport.events(),
        vec![
            SwarmEvent::SessionCreated,
            SwarmEvent::ContentAdded(sim_content_id("high")),
            SwarmEvent::SessionDestroyed,
            SwarmEvent::SessionCreated,
            SwarmEvent::ContentAdded(sim_content_id("low")),
        ]
    );
    // The invariant, not just eventual state: never two live sessions
    assert_eq!(transport.live_session_count(), 1);
}

#[tokio::test]
async fn test_server_only_quality_never_touches_transport() {
    let transport = SimPeerTransport::supported();

    let factory = SimSurfaceFactory::new();
    let player = Player::create(
        &factory,
        transport.clone(),
        SimScriptLoader::new(),
        ElementId::new("player"),
        ScenarioBuilder::new()
            .server_quality("high", "https://cdn.example.com/high.mp4")
            .server_quality("low", "https://cdn.example.com/low.mp4")
            .build(),
    )
    .await
    .unwrap();
    settle().await;

    player.switch_quality("low").unwrap();
    settle().await;

    assert!(transport.events().is_empty());
}

#[tokio::test]
async fn test_failed_teardown_blocks_new_session_until_retry() {
    let transport = SimPeerTransport::supported();
    transport.seed_content(&sim_content_id("high"), &["high.mp4"]);
    transport.seed_content(&sim_content_id("low"), &["low.mp4"]);

    let factory = SimSurfaceFactory::new();
    let player = Player::create(
        &factory,
        transport.clone(),
        SimScriptLoader::new(),
        ElementId::new("player"),
        ScenarioBuilder::new()
            .peer_quality("high", "https://cdn.example.com/high.mp4", "high")
            .peer_quality("low", "https://cdn.example.com/low.mp4", "low")
            .build(),
    )
    .await
    .unwrap();
    settle().await;

    transport.fail_next_destroy();
    player.switch_quality("low").unwrap();
    settle().await;

    // Teardown failed: the engine degraded to the server path and no new
    // session was created on top of the old one
    assert_eq!(transport.live_session_count(), 1);
    assert_eq!(
        transport
            .events()
            .iter()
            .filter(|event| **event == SwarmEvent::SessionCreated)
            .count(),
        1
    );
    assert_eq!(
        factory.surface().assigned_urls(),
        vec!["https://cdn.example.com/low.mp4"]
    );

    // A later switch retries teardown and succeeds
    player.switch_quality("high").unwrap();
    settle().await;
    assert_eq!(transport.live_session_count(), 1);
    assert_eq!(
        transport.events().last(),
        Some(&SwarmEvent::ContentAdded(sim_content_id("high")))
    );
}

#[tokio::test]
async fn test_shutdown_destroys_live_session() {
    let transport = SimPeerTransport::supported();
    transport.seed_content(&sim_content_id("high"), &["high.mp4"]);

    let factory = SimSurfaceFactory::new();
    let player = Player::create(
        &factory,
        transport.clone(),
        SimScriptLoader::new(),
        ElementId::new("player"),
        ScenarioBuilder::new()
            .peer_quality("high", "https://cdn.example.com/high.mp4", "high")
            .build(),
    )
    .await
    .unwrap();
    settle().await;

    player.shutdown().await.unwrap();
    assert_eq!(transport.live_session_count(), 0);
    assert_eq!(transport.events().last(), Some(&SwarmEvent::SessionDestroyed));
}
