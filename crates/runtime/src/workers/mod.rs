//! Worker tasks that back the runtime orchestration.
//!
//! One character worker per character; it is the only code that touches that
//! character's attributes.

mod character;

pub use character::{CharacterWorker, Command};
