//! Simulated peer-swarm transport with scripted outcomes.
//!
//! Every lifecycle operation is appended to a global event log so tests
//! can assert strict ordering (destroy-before-create) rather than just
//! eventual state. Optional seeded latency delays swarm adds to shake out
//! supersede races deterministically.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use breakwater_core::peer::{PeerSession, PeerSessionError, PeerTransport, SwarmFile};
use breakwater_core::source::PeerContentId;
use breakwater_core::surface::{ElementId, RenderOptions};
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::sync::Semaphore;

/// Seeded latency applied to swarm adds.
///
/// The same seed always produces the same delay sequence. Tests using
/// latency should run with paused Tokio time so delays auto-advance.
#[derive(Debug, Clone)]
pub struct SimLatency {
    pub seed: u64,
    pub max_add_delay: Duration,
}

impl SimLatency {
    pub fn new(seed: u64, max_add_delay: Duration) -> Self {
        Self {
            seed,
            max_add_delay,
        }
    }
}

/// Observable swarm lifecycle events, in global order.
#[derive(Debug, Clone, PartialEq)]
pub enum SwarmEvent {
    SessionCreated,
    ContentAdded(PeerContentId),
    SessionDestroyed,
}

#[derive(Debug, Clone)]
enum AddScript {
    Succeed(Vec<String>),
    Fail(String),
}

struct TransportState {
    scripts: HashMap<String, AddScript>,
    gates: HashMap<String, Arc<Semaphore>>,
    events: Vec<SwarmEvent>,
    renders: Vec<(String, ElementId, RenderOptions)>,
    live_sessions: usize,
    fail_create: bool,
    fail_destroy_once: bool,
    fail_renders: bool,
    rng: Option<ChaCha8Rng>,
    max_add_delay: Duration,
}

/// Scripted peer transport for simulation and integration tests.
#[derive(Clone)]
pub struct SimPeerTransport {
    supported: bool,
    state: Arc<Mutex<TransportState>>,
}

impl SimPeerTransport {
    /// Transport reporting realtime support, no latency.
    pub fn supported() -> Self {
        Self::build(true, None)
    }

    /// Transport reporting no realtime support.
    pub fn unsupported() -> Self {
        Self::build(false, None)
    }

    /// Supported transport with deterministic seeded add latency.
    pub fn with_latency(latency: SimLatency) -> Self {
        Self::build(true, Some(latency))
    }

    fn build(supported: bool, latency: Option<SimLatency>) -> Self {
        let (rng, max_add_delay) = match latency {
            Some(latency) => (
                Some(ChaCha8Rng::seed_from_u64(latency.seed)),
                latency.max_add_delay,
            ),
            None => (None, Duration::ZERO),
        };
        Self {
            supported,
            state: Arc::new(Mutex::new(TransportState {
                scripts: HashMap::new(),
                gates: HashMap::new(),
                events: Vec::new(),
                renders: Vec::new(),
                live_sessions: 0,
                fail_create: false,
                fail_destroy_once: false,
                fail_renders: false,
                rng,
                max_add_delay,
            })),
        }
    }

    /// Scripts a successful add yielding the given member file names.
    pub fn seed_content(&self, content: &PeerContentId, file_names: &[&str]) {
        self.state.lock().scripts.insert(
            content.as_str().to_string(),
            AddScript::Succeed(file_names.iter().map(|n| n.to_string()).collect()),
        );
    }

    /// Scripts a failing add for the given content.
    pub fn fail_content(&self, content: &PeerContentId, reason: &str) {
        self.state.lock().scripts.insert(
            content.as_str().to_string(),
            AddScript::Fail(reason.to_string()),
        );
    }

    /// Scripts a successful add that blocks until the returned semaphore
    /// receives a permit. Used to hold a switch in flight.
    pub fn hold_content(&self, content: &PeerContentId, file_names: &[&str]) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        let mut state = self.state.lock();
        state.scripts.insert(
            content.as_str().to_string(),
            AddScript::Succeed(file_names.iter().map(|n| n.to_string()).collect()),
        );
        state
            .gates
            .insert(content.as_str().to_string(), Arc::clone(&gate));
        gate
    }

    /// Makes the next session creation fail.
    pub fn fail_next_create(&self) {
        self.state.lock().fail_create = true;
    }

    /// Makes the next session destroy fail, once.
    pub fn fail_next_destroy(&self) {
        self.state.lock().fail_destroy_once = true;
    }

    /// Makes every render fail.
    pub fn fail_renders(&self) {
        self.state.lock().fail_renders = true;
    }

    /// Global lifecycle event log, in order.
    pub fn events(&self) -> Vec<SwarmEvent> {
        self.state.lock().events.clone()
    }

    /// Render log: (file name, target, options) in order.
    pub fn renders(&self) -> Vec<(String, ElementId, RenderOptions)> {
        self.state.lock().renders.clone()
    }

    /// Number of sessions currently alive. The engine invariant keeps
    /// this at most 1.
    pub fn live_session_count(&self) -> usize {
        self.state.lock().live_sessions
    }

    fn next_add_delay(&self) -> Duration {
        let mut state = self.state.lock();
        let max = state.max_add_delay;
        match state.rng.as_mut() {
            Some(rng) if !max.is_zero() => {
                Duration::from_millis(rng.random_range(0..=max.as_millis() as u64))
            }
            _ => Duration::ZERO,
        }
    }
}

impl PeerTransport for SimPeerTransport {
    type Session = SimPeerSession;

    fn realtime_support(&self) -> bool {
        self.supported
    }

    fn create_session(&self) -> Result<SimPeerSession, PeerSessionError> {
        let mut state = self.state.lock();
        if state.fail_create {
            state.fail_create = false;
            return Err(PeerSessionError::CreateFailed {
                reason: "simulated create failure".to_string(),
            });
        }
        state.events.push(SwarmEvent::SessionCreated);
        state.live_sessions += 1;
        tracing::debug!(live = state.live_sessions, "Simulated session created");
        Ok(SimPeerSession {
            transport: self.clone(),
            alive: true,
        })
    }
}

/// Session handle produced by [`SimPeerTransport`].
pub struct SimPeerSession {
    transport: SimPeerTransport,
    alive: bool,
}

#[async_trait]
impl PeerSession for SimPeerSession {
    type File = SimSwarmFile;

    async fn add(
        &mut self,
        content: &PeerContentId,
    ) -> Result<Vec<SimSwarmFile>, PeerSessionError> {
        let delay = self.transport.next_add_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let gate = self
            .transport
            .state
            .lock()
            .gates
            .get(content.as_str())
            .cloned();
        if let Some(gate) = gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| PeerSessionError::AddFailed {
                    content: content.to_string(),
                    reason: "gate closed".to_string(),
                })?;
            permit.forget();
        }

        let mut state = self.transport.state.lock();
        let script = state
            .scripts
            .get(content.as_str())
            .cloned()
            .unwrap_or_else(|| AddScript::Fail("content not seeded".to_string()));

        match script {
            AddScript::Succeed(names) => {
                state.events.push(SwarmEvent::ContentAdded(content.clone()));
                Ok(names
                    .into_iter()
                    .map(|name| SimSwarmFile {
                        name,
                        transport: self.transport.clone(),
                    })
                    .collect())
            }
            AddScript::Fail(reason) => Err(PeerSessionError::AddFailed {
                content: content.to_string(),
                reason,
            }),
        }
    }

    async fn destroy(&mut self) -> Result<(), PeerSessionError> {
        let mut state = self.transport.state.lock();
        if state.fail_destroy_once {
            state.fail_destroy_once = false;
            return Err(PeerSessionError::TeardownFailed {
                reason: "simulated teardown failure".to_string(),
            });
        }
        if self.alive {
            self.alive = false;
            state.live_sessions -= 1;
            state.events.push(SwarmEvent::SessionDestroyed);
        }
        Ok(())
    }
}

/// Member file handle produced by [`SimPeerSession`].
#[derive(Clone)]
pub struct SimSwarmFile {
    name: String,
    transport: SimPeerTransport,
}

impl SwarmFile for SimSwarmFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn render_to(
        &self,
        target: &ElementId,
        options: RenderOptions,
    ) -> Result<(), PeerSessionError> {
        let mut state = self.transport.state.lock();
        if state.fail_renders {
            return Err(PeerSessionError::RenderFailed {
                target: target.to_string(),
                reason: "simulated render failure".to_string(),
            });
        }
        state
            .renders
            .push((self.name.clone(), target.clone(), options));
        Ok(())
    }
}
