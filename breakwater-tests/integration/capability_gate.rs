//! Capability gate behavior against the simulated script loader.

use std::sync::Arc;

use breakwater_core::capability::{
    CapabilityGate, DependencyError, ExtensionRegistry, ScriptRequirement,
};
use breakwater_core::player::Player;
use breakwater_core::surface::{ElementId, SurfaceExtension};
use breakwater_sim::{ScenarioBuilder, SimPeerTransport, SimScriptLoader, SimSurfaceFactory};
use url::Url;

fn script(url: &str, required: bool) -> ScriptRequirement {
    ScriptRequirement {
        url: Url::parse(url).unwrap(),
        required,
    }
}

#[tokio::test]
async fn test_required_script_failure_rejects_with_dependency_error() {
    let loader = SimScriptLoader::new();
    loader.fail_url("https://sdk.example.com/switcher.js");

    let factory = SimSurfaceFactory::new();
    let gate = CapabilityGate::with_registry(
        loader,
        vec![
            script("https://sdk.example.com/ads.js", false),
            script("https://sdk.example.com/switcher.js", true),
        ],
        Arc::new(ExtensionRegistry::new()),
    );

    let result = gate.prepare(&factory).await;
    assert!(matches!(
        result,
        Err(DependencyError::RequiredScriptFailed { ref url, .. })
            if url == "https://sdk.example.com/switcher.js"
    ));
    assert!(factory.registered_extensions().is_empty());
}

#[tokio::test]
async fn test_optional_script_failure_still_registers_extensions() {
    let loader = SimScriptLoader::new();
    loader.fail_url("https://sdk.example.com/ads.js");

    let factory = SimSurfaceFactory::new();
    let gate = CapabilityGate::with_registry(
        loader,
        vec![script("https://sdk.example.com/ads.js", false)],
        Arc::new(ExtensionRegistry::new()),
    );

    gate.prepare(&factory).await.unwrap();

    let registered = factory.registered_extensions();
    assert!(registered.contains(&SurfaceExtension::Ads));
    assert!(registered.contains(&SurfaceExtension::QualitySwitch));
}

#[tokio::test]
async fn test_all_loads_issued_concurrently_before_settling() {
    let loader = SimScriptLoader::new();
    loader.fail_url("https://sdk.example.com/first.js");

    let factory = SimSurfaceFactory::new();
    let gate = CapabilityGate::with_registry(
        loader.clone(),
        vec![
            script("https://sdk.example.com/first.js", true),
            script("https://sdk.example.com/second.js", false),
            script("https://sdk.example.com/third.js", false),
        ],
        Arc::new(ExtensionRegistry::new()),
    );

    let _ = gate.prepare(&factory).await;
    // No short-circuit: every load was attempted despite the failure
    assert_eq!(loader.attempted_urls().len(), 3);
}

#[tokio::test]
async fn test_player_survives_optional_ad_sdk_failure() {
    let loader = SimScriptLoader::new();
    loader.fail_url("https://imasdk.googleapis.com/js/sdkloader/ima3.js");

    let factory = SimSurfaceFactory::new();
    let player = Player::create(
        &factory,
        SimPeerTransport::unsupported(),
        loader,
        ElementId::new("player"),
        ScenarioBuilder::new()
            .server_quality("high", "https://cdn.example.com/high.mp4")
            .build(),
    )
    .await
    .unwrap();

    assert_eq!(
        factory.surface().assigned_urls(),
        vec!["https://cdn.example.com/high.mp4"]
    );
    drop(player);
}
