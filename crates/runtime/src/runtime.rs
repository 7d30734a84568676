//! High-level runtime orchestrator.
//!
//! The runtime spawns one worker per character, wires up command and event
//! channels, and routes requests between characters. Callers never hold a
//! reference to another character's attributes; they hold handles.

use std::collections::{BTreeMap, BTreeSet};
use std::env;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use vitals_core::{
    AttributeSet, ChangeEvents, Character, CharacterId, ModificationRequest, RescalePolicy, Tick,
    Ticket, TracingObserver, VitalsConfig,
};

use crate::api::{CharacterHandle, Result, RuntimeError};
use crate::events::{Event, EventBus, Topic};
use crate::observers::{BusObserver, ReplicaMirror};
use crate::workers::CharacterWorker;

/// Runtime configuration shared across the orchestrator and workers.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub vitals: VitalsConfig,
    pub event_buffer_size: usize,
    pub command_buffer_size: usize,
    /// Drive regen from a wall-clock timer (default: true). When disabled,
    /// time only moves through [`CharacterHandle::advance`].
    pub regen_enabled: bool,
    /// Attach a [`ReplicaMirror`] to every character (default: false).
    pub replicate: bool,
    /// Log every committed change at info level (default: false).
    pub trace_changes: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            vitals: VitalsConfig::default(),
            event_buffer_size: 256,
            command_buffer_size: 32,
            regen_enabled: true,
            replicate: false,
            trace_changes: false,
        }
    }
}

impl RuntimeConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `VITALS_COMMAND_BUFFER` - Per-character command queue size (default: 32)
    /// - `VITALS_EVENT_BUFFER` - Event bus capacity per topic (default: 256)
    /// - `VITALS_REGEN_INTERVAL_MS` - Regen tick interval (default: 1000)
    /// - `VITALS_RESCALE_POLICY` - `proportional` or `hard_clamp` (default: proportional)
    /// - `VITALS_REGEN_ENABLED` - Timer-driven regen (default: true)
    /// - `VITALS_REPLICATE` - Attach replica mirrors (default: false)
    /// - `VITALS_TRACE_CHANGES` - Log every change (default: false)
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Applies the variables read by [`from_env`](Self::from_env) on top of
    /// `self`, e.g. after loading the attribute config from a file.
    pub fn with_env_overrides(self) -> Self {
        let mut config = self;

        if let Some(capacity) = read_env::<usize>("VITALS_COMMAND_BUFFER") {
            config.command_buffer_size = capacity.max(1);
        }
        if let Some(capacity) = read_env::<usize>("VITALS_EVENT_BUFFER") {
            config.event_buffer_size = capacity.max(1);
        }
        if let Some(interval_ms) = read_env::<u64>("VITALS_REGEN_INTERVAL_MS") {
            config.vitals.regen_interval_ms = interval_ms;
        }
        if let Ok(raw) = env::var("VITALS_RESCALE_POLICY") {
            match raw.parse::<RescalePolicy>() {
                Ok(policy) => config.vitals.rescale_policy = policy,
                Err(_) => warn!("ignoring unknown VITALS_RESCALE_POLICY value {raw:?}"),
            }
        }
        if let Some(enable) = read_env::<bool>("VITALS_REGEN_ENABLED") {
            config.regen_enabled = enable;
        }
        if let Some(enable) = read_env::<bool>("VITALS_REPLICATE") {
            config.replicate = enable;
        }
        if let Some(enable) = read_env::<bool>("VITALS_TRACE_CHANGES") {
            config.trace_changes = enable;
        }

        config
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}

struct Worker {
    handle: CharacterHandle,
    mirror: Option<ReplicaMirror>,
    join: JoinHandle<()>,
}

/// Main runtime that owns every character worker
///
/// [`CharacterHandle`] provides a cloneable façade for clients.
pub struct Runtime {
    config: RuntimeConfig,
    event_bus: EventBus,
    workers: BTreeMap<CharacterId, Worker>,
}

impl Runtime {
    /// Create a new runtime builder
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Registered characters in id order.
    pub fn characters(&self) -> impl Iterator<Item = CharacterId> + '_ {
        self.workers.keys().copied()
    }

    /// Get a cloneable handle to one character
    pub fn handle(&self, id: CharacterId) -> Result<CharacterHandle> {
        self.worker(id).map(|worker| worker.handle.clone())
    }

    /// Replica attached to `id`, when replication is enabled.
    pub fn mirror(&self, id: CharacterId) -> Result<Option<ReplicaMirror>> {
        self.worker(id).map(|worker| worker.mirror.clone())
    }

    fn worker(&self, id: CharacterId) -> Result<&Worker> {
        self.workers.get(&id).ok_or(RuntimeError::UnknownCharacter(id))
    }

    /// Hands `request` to the target character's worker and waits for it to
    /// be applied there.
    ///
    /// This is how one character affects another: the caller's own worker is
    /// never involved and the target's set is only touched by its owner.
    pub async fn route(
        &self,
        target: CharacterId,
        request: ModificationRequest,
    ) -> Result<ChangeEvents> {
        let handle = &self.worker(target)?.handle;
        debug!(target: "runtime::route", %target, source = %request.source, "routing request");
        handle.submit(request).await
    }

    /// Queues `request` on the target character for its next flush.
    pub async fn route_queued(
        &self,
        target: CharacterId,
        request: ModificationRequest,
        arrival: Tick,
    ) -> Result<Ticket> {
        self.worker(target)?.handle.enqueue(request, arrival).await
    }

    /// Activates every registered character.
    pub async fn activate_all(&self) -> Result<()> {
        for worker in self.workers.values() {
            worker.handle.activate().await?;
        }
        Ok(())
    }

    /// Subscribe to events from one topic, across all characters
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Stops every worker and waits for all of them to finish.
    ///
    /// Every worker is told to stop before any is joined; the first join
    /// failure is reported once all joins complete. Handles still held by
    /// callers fail with [`RuntimeError::CommandChannelClosed`] afterwards.
    pub async fn shutdown(self) -> Result<()> {
        for (id, worker) in &self.workers {
            if !worker.handle.stop().await {
                debug!(target: "runtime::worker", %id, "worker already stopped");
            }
        }

        let mut first_error = None;
        for (id, worker) in self.workers {
            if let Err(error) = worker.join.await {
                warn!(target: "runtime::worker", %id, %error, "worker join failed");
                if first_error.is_none() {
                    first_error = Some(RuntimeError::WorkerJoin(error));
                }
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => {
                info!("runtime shut down");
                Ok(())
            }
        }
    }
}

/// Builder for [`Runtime`] with flexible configuration.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    characters: Vec<(CharacterId, Option<AttributeSet>)>,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            characters: Vec::new(),
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a character spawned from the configured defaults.
    pub fn character(mut self, id: CharacterId) -> Self {
        self.characters.push((id, None));
        self
    }

    /// Register a character with an explicit attribute set.
    pub fn character_with(mut self, id: CharacterId, attributes: AttributeSet) -> Self {
        self.characters.push((id, Some(attributes)));
        self
    }

    /// Enable or disable timer-driven regen
    pub fn regen_enabled(mut self, enable: bool) -> Self {
        self.config.regen_enabled = enable;
        self
    }

    /// Attach replica mirrors
    pub fn replicate(mut self, enable: bool) -> Self {
        self.config.replicate = enable;
        self
    }

    /// Spawn one worker per registered character.
    ///
    /// Must be called within a tokio runtime.
    pub async fn build(self) -> Result<Runtime> {
        let RuntimeBuilder { config, characters } = self;
        let event_bus = EventBus::with_capacity(config.event_buffer_size);
        let interval = config.vitals.regen_interval();
        let mut seen = BTreeSet::new();
        for (id, _) in &characters {
            if !seen.insert(*id) {
                return Err(RuntimeError::DuplicateCharacter(*id));
            }
        }

        let mut workers = BTreeMap::new();
        for (id, attributes) in characters {
            let mut character = match attributes {
                Some(attributes) => Character::new(id, attributes, interval),
                None => Character::from_config(id, &config.vitals),
            };

            let mirror = config.replicate.then(|| {
                let mirror = ReplicaMirror::new(id, character.snapshot());
                character.observe(mirror.clone());
                mirror
            });
            if config.trace_changes {
                character.observe(TracingObserver);
            }
            character.observe(BusObserver::new(id, event_bus.clone()));

            let (command_tx, command_rx) = mpsc::channel(config.command_buffer_size.max(1));
            let handle = CharacterHandle::new(id, command_tx, event_bus.clone());
            let worker = CharacterWorker::new(
                character,
                command_rx,
                event_bus.clone(),
                config.regen_enabled,
                interval,
            );
            let join = tokio::spawn(worker.run());

            debug!(target: "runtime::worker", %id, "spawned character worker");
            workers.insert(
                id,
                Worker {
                    handle,
                    mirror,
                    join,
                },
            );
        }

        info!(
            characters = workers.len(),
            regen_interval_ms = interval.as_millis() as u64,
            regen_enabled = config.regen_enabled,
            "runtime started"
        );

        Ok(Runtime {
            config,
            event_bus,
            workers,
        })
    }
}
