//! Runtime-side change observers.
//!
//! Both run inline on the owning character's worker.

mod bus;
mod replica;

pub use bus::BusObserver;
pub use replica::{MirrorStats, ReplicaMirror};
