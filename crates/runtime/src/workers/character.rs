//! Worker that owns one [`Character`].
//!
//! Every request for the character, local or routed from another character,
//! arrives through the command channel and is applied here in arrival order.
//! Regen ticks come from a timer on the same loop, so they serialize with
//! requests.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::{debug, info};

use vitals_core::{
    AttributeSnapshot, BatchOutcome, ChangeEvent, ChangeEvents, Character, ModificationRequest,
    ModifyError, Pending, RequestQueue, Ticket, VitalsError,
};

use crate::api::CharacterStatus;
use crate::events::{Event, EventBus, LifecycleEvent};

/// Commands that can be sent to a character worker
pub enum Command {
    /// Apply one request immediately.
    Submit {
        request: ModificationRequest,
        reply: oneshot::Sender<Result<ChangeEvents, ModifyError>>,
    },
    /// Queue a request for the next flush.
    Enqueue {
        pending: Pending,
        reply: oneshot::Sender<Ticket>,
    },
    /// Withdraw a queued request.
    Withdraw {
        ticket: Ticket,
        reply: oneshot::Sender<bool>,
    },
    /// Apply every queued request in processing order.
    Flush {
        reply: oneshot::Sender<BatchOutcome>,
    },
    Activate {
        reply: oneshot::Sender<()>,
    },
    Deactivate {
        reply: oneshot::Sender<()>,
    },
    Rearm {
        reply: oneshot::Sender<bool>,
    },
    /// Advance simulated time by hand.
    Advance {
        elapsed: Duration,
        reply: oneshot::Sender<Vec<ChangeEvent>>,
    },
    Snapshot {
        reply: oneshot::Sender<AttributeSnapshot>,
    },
    Status {
        reply: oneshot::Sender<CharacterStatus>,
    },
    Shutdown,
}

pub struct CharacterWorker {
    character: Character,
    queue: RequestQueue,
    command_rx: mpsc::Receiver<Command>,
    event_bus: EventBus,
    regen_timer: Option<Interval>,
}

impl CharacterWorker {
    /// Creates a worker. With `regen_timer` set, the character's regen is
    /// driven by wall-clock ticks of its configured interval.
    pub fn new(
        character: Character,
        command_rx: mpsc::Receiver<Command>,
        event_bus: EventBus,
        regen_timer: bool,
        interval: Duration,
    ) -> Self {
        let regen_timer = regen_timer.then(|| {
            let mut timer = time::interval_at(time::Instant::now() + interval, interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Burst);
            timer
        });

        Self {
            character,
            queue: RequestQueue::new(),
            command_rx,
            event_bus,
            regen_timer,
        }
    }

    /// Main worker loop.
    pub async fn run(mut self) {
        let mut regen_timer = self.regen_timer.take();
        loop {
            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                interval = next_tick(&mut regen_timer) => {
                    self.advance(interval);
                }
            }
        }
        debug!(target: "runtime::worker", id = %self.character.id(), "worker stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Submit { request, reply } => {
                let result = self.submit(&request);
                if reply.send(result).is_err() {
                    debug!("Submit reply channel closed (caller dropped)");
                }
            }
            Command::Enqueue { pending, reply } => {
                let ticket = self.queue.enqueue(pending);
                if reply.send(ticket).is_err() {
                    debug!("Enqueue reply channel closed (caller dropped)");
                }
            }
            Command::Withdraw { ticket, reply } => {
                let withdrawn = self.queue.withdraw(ticket);
                if reply.send(withdrawn).is_err() {
                    debug!("Withdraw reply channel closed (caller dropped)");
                }
            }
            Command::Flush { reply } => {
                let outcome = self.flush();
                if reply.send(outcome).is_err() {
                    debug!("Flush reply channel closed (caller dropped)");
                }
            }
            Command::Activate { reply } => {
                self.character.activate();
                self.publish(LifecycleEvent::Activated {
                    character: self.character.id(),
                });
                let _ = reply.send(());
            }
            Command::Deactivate { reply } => {
                self.character.deactivate();
                self.publish(LifecycleEvent::Deactivated {
                    character: self.character.id(),
                });
                let _ = reply.send(());
            }
            Command::Rearm { reply } => {
                let armed = self.character.rearm();
                let _ = reply.send(armed);
            }
            Command::Advance { elapsed, reply } => {
                let events = self.advance(elapsed);
                if reply.send(events).is_err() {
                    debug!("Advance reply channel closed (caller dropped)");
                }
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.character.snapshot());
            }
            Command::Status { reply } => {
                let _ = reply.send(CharacterStatus {
                    id: self.character.id(),
                    active: self.character.is_active(),
                    dead: self.character.is_dead(),
                    regen: self.character.regen_state(),
                    queued: self.queue.len(),
                    snapshot: self.character.snapshot(),
                });
            }
            Command::Shutdown => {}
        }
    }

    fn submit(&mut self, request: &ModificationRequest) -> Result<ChangeEvents, ModifyError> {
        let was_dead = self.character.is_dead();
        let result = self.character.submit(request);
        match &result {
            Ok(_) => self.check_death(was_dead),
            Err(error) => self.reject(request, error),
        }
        result
    }

    fn flush(&mut self) -> BatchOutcome {
        let was_dead = self.character.is_dead();
        let outcome = self.character.submit_batch(&mut self.queue);
        for (request, error) in &outcome.rejected {
            self.reject(request, error);
        }
        self.check_death(was_dead);
        outcome
    }

    fn advance(&mut self, elapsed: Duration) -> Vec<ChangeEvent> {
        let was_dead = self.character.is_dead();
        let events = self.character.advance(elapsed);
        self.check_death(was_dead);
        events
    }

    fn check_death(&self, was_dead: bool) {
        if !was_dead && self.character.is_dead() {
            info!(target: "runtime::worker", id = %self.character.id(), "character died");
            self.publish(LifecycleEvent::Died {
                character: self.character.id(),
            });
        }
    }

    fn reject(&self, request: &ModificationRequest, error: &ModifyError) {
        debug!(
            target: "runtime::worker",
            id = %self.character.id(),
            source = %request.source,
            code = error.error_code(),
            "request rejected"
        );
        self.publish(LifecycleEvent::Rejected {
            character: self.character.id(),
            source: request.source,
            code: error.error_code().to_owned(),
            reason: error.to_string(),
        });
    }

    fn publish(&self, event: LifecycleEvent) {
        self.event_bus.publish(Event::Lifecycle(event));
    }
}

/// Resolves with the timer period on each tick; never resolves without a timer.
///
/// Missed ticks fire in a burst, so a stalled worker still accounts for the
/// full elapsed time.
async fn next_tick(timer: &mut Option<Interval>) -> Duration {
    match timer {
        Some(timer) => {
            timer.tick().await;
            timer.period()
        }
        None => std::future::pending().await,
    }
}
