//! Character attribute logic shared by the runtime and offline tools.
//!
//! `vitals-core` defines the canonical attribute rules (clamping, max-change
//! rescaling, regeneration) and exposes pure, synchronous APIs. All attribute
//! mutation flows through [`AttributeSet::apply`]; a [`Character`] owns one
//! set together with its regen scheduler and observers.
pub mod attribute;
pub mod character;
pub mod config;
pub mod error;
pub mod event;
pub mod notifier;
pub mod pipeline;
pub mod regen;
pub mod request;

pub use attribute::{
    Attribute, AttributeKind, AttributeRole, AttributeSet, AttributeSetBuilder, AttributeSnapshot,
    ChangeEvents, SnapshotEntry, StatFamilies, StatFamily,
};
pub use character::{BatchOutcome, Character, CharacterId};
pub use config::{AttributeDefaults, FamilyDefaults, VitalsConfig};
pub use error::{ErrorSeverity, InvariantViolation, ModifyError, VitalsError};
pub use event::ChangeEvent;
pub use notifier::{ChangeNotifier, ChangeObserver, ObserverError, TracingObserver};
pub use pipeline::{AttributeRule, ClampRule, ModificationPipeline, RescalePolicy};
pub use regen::{RegenOutcome, RegenScheduler, RegenState};
pub use request::{
    EffectHandle, ModOp, ModificationRequest, Pending, RequestQueue, Tick, Ticket,
};
