//! Arrival-ordered request queue with withdrawal.
//!
//! Requests wait here until the owning character processes a batch. Draining
//! orders them by `(arrival, source, enqueue sequence)`, so the outcome of a
//! batch never depends on how the queue stored them. A request can be
//! withdrawn only while it is still queued.

use super::{EffectHandle, ModificationRequest};

/// Simulation time at which a request arrived.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);
}

/// Receipt for a queued request, used to withdraw it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ticket(u64);

/// A request together with its arrival time.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pending {
    pub request: ModificationRequest,
    pub arrival: Tick,
}

impl Pending {
    pub const fn new(request: ModificationRequest, arrival: Tick) -> Self {
        Self { request, arrival }
    }

    fn order_key(&self) -> (Tick, EffectHandle) {
        (self.arrival, self.request.source)
    }
}

#[derive(Debug)]
struct Entry {
    ticket: Ticket,
    pending: Pending,
}

/// Queue of requests not yet handed to the pipeline.
#[derive(Debug, Default)]
pub struct RequestQueue {
    entries: Vec<Entry>,
    next_ticket: u64,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a request and returns its withdrawal ticket.
    pub fn enqueue(&mut self, pending: Pending) -> Ticket {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        self.entries.push(Entry { ticket, pending });
        ticket
    }

    /// Removes a queued request. Returns `false` if it was already drained
    /// or withdrawn.
    pub fn withdraw(&mut self, ticket: Ticket) -> bool {
        match self.entries.iter().position(|entry| entry.ticket == ticket) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Takes every queued request in processing order.
    ///
    /// Tickets are issued in enqueue order, so a stable sort on
    /// `(arrival, source)` keeps enqueue order as the final tie-break.
    pub fn drain(&mut self) -> Vec<ModificationRequest> {
        let mut entries = core::mem::take(&mut self.entries);
        entries.sort_by_key(|entry| entry.pending.order_key());
        entries
            .into_iter()
            .map(|entry| entry.pending.request)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
