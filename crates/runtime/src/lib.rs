//! Async orchestration for character attribute pipelines.
//!
//! This crate gives every character its own worker task, so each attribute
//! set has exactly one owner, and exposes a runtime API for submitting,
//! queueing and routing modification requests between characters.
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the orchestrator and builder
//! - [`api`] exposes the types downstream clients interact with
//! - [`events`] provides topic-based event bus for flexible event routing
//! - [`observers`] bridges committed changes to the bus and to replicas
//! - `workers` keeps background tasks internal to the crate
pub mod api;
pub mod events;
pub mod observers;
pub mod runtime;

mod workers;

pub use api::{CharacterHandle, CharacterStatus, Result, RuntimeError};
pub use events::{AttributeChanged, Event, EventBus, LifecycleEvent, Topic};
pub use observers::{BusObserver, MirrorStats, ReplicaMirror};
pub use runtime::{Runtime, RuntimeBuilder, RuntimeConfig};
