//! Cloneable façade for issuing commands to one character's worker.
//!
//! [`CharacterHandle`] hides channel plumbing. Every method is a round trip:
//! it returns once the worker has processed the command, so two awaited calls
//! from the same task are applied in call order.
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, oneshot};

use vitals_core::{
    AttributeSnapshot, BatchOutcome, ChangeEvent, ChangeEvents, CharacterId, ModificationRequest,
    Pending, RegenState, Tick, Ticket,
};

use super::errors::{Result, RuntimeError};
use crate::events::{Event, EventBus, Topic};
use crate::workers::Command;

/// Point-in-time view of a character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterStatus {
    pub id: CharacterId,
    pub active: bool,
    pub dead: bool,
    pub regen: RegenState,
    /// Requests waiting for the next flush.
    pub queued: usize,
    pub snapshot: AttributeSnapshot,
}

/// Client-facing handle to one character
#[derive(Clone)]
pub struct CharacterHandle {
    id: CharacterId,
    command_tx: mpsc::Sender<Command>,
    event_bus: EventBus,
}

impl CharacterHandle {
    pub(crate) fn new(id: CharacterId, command_tx: mpsc::Sender<Command>, event_bus: EventBus) -> Self {
        Self {
            id,
            command_tx,
            event_bus,
        }
    }

    pub fn id(&self) -> CharacterId {
        self.id
    }

    async fn call<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(command(reply_tx))
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    /// Apply a request now and return the changes it committed.
    pub async fn submit(&self, request: ModificationRequest) -> Result<ChangeEvents> {
        let changes = self
            .call(|reply| Command::Submit { request, reply })
            .await??;
        Ok(changes)
    }

    /// Queue a request; it is applied by the next [`flush`](Self::flush).
    pub async fn enqueue(&self, request: ModificationRequest, arrival: Tick) -> Result<Ticket> {
        let pending = Pending::new(request, arrival);
        self.call(|reply| Command::Enqueue { pending, reply }).await
    }

    /// Withdraw a queued request. `false` once it has been flushed.
    pub async fn withdraw(&self, ticket: Ticket) -> Result<bool> {
        self.call(|reply| Command::Withdraw { ticket, reply }).await
    }

    pub async fn flush(&self) -> Result<BatchOutcome> {
        self.call(|reply| Command::Flush { reply }).await
    }

    pub async fn activate(&self) -> Result<()> {
        self.call(|reply| Command::Activate { reply }).await
    }

    pub async fn deactivate(&self) -> Result<()> {
        self.call(|reply| Command::Deactivate { reply }).await
    }

    /// Re-arm regen after death. `false` while the character is still dead
    /// or inactive.
    pub async fn rearm(&self) -> Result<bool> {
        self.call(|reply| Command::Rearm { reply }).await
    }

    /// Advance simulated time, firing any due regen ticks.
    pub async fn advance(&self, elapsed: Duration) -> Result<Vec<ChangeEvent>> {
        self.call(|reply| Command::Advance { elapsed, reply }).await
    }

    pub async fn snapshot(&self) -> Result<AttributeSnapshot> {
        self.call(|reply| Command::Snapshot { reply }).await
    }

    pub async fn status(&self) -> Result<CharacterStatus> {
        self.call(|reply| Command::Status { reply }).await
    }

    /// Asks the worker to stop. `false` if it already has.
    pub(crate) async fn stop(&self) -> bool {
        self.command_tx.send(Command::Shutdown).await.is_ok()
    }

    /// Subscribe to events from a specific topic
    ///
    /// The bus is shared by every character; filter on
    /// [`Event::character`] to follow this one.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }
}

impl std::fmt::Debug for CharacterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CharacterHandle").field("id", &self.id).finish()
    }
}
