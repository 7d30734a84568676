//! Composition root for the `vitals` binary.
//!
//! # Architecture
//!
//! ```text
//! vitals (binary)
//!   ├─→ config    .env + TOML attribute config → RuntimeConfig
//!   ├─→ logging   tracing subscriber (stderr, optional file)
//!   └─→ scenario  TOML script played against a vitals Runtime
//! ```

pub mod config;
pub mod logging;
pub mod scenario;

pub use config::ClientConfig;
pub use scenario::{Scenario, ScenarioReport};
