//! dbe-migrate - Migration engine for dbevolve
//!
//! Validates the version history against the scripts directory, frames each
//! pending script into batches, and applies them in version order with one
//! transaction per script.

pub mod engine;
pub mod error;
pub mod framing;
pub mod observer;
pub mod report;
pub(crate) mod transaction;

pub use engine::{EngineOptions, EngineState, MigrationEngine};
pub use error::{MigrateError, MigrateResult};
pub use framing::{FramedScript, BATCH_SEPARATOR, NO_TRANSACTION_MARKER};
pub use observer::{LogObserver, MigrationObserver};
pub use report::{
    AppliedScript, RunReport, ScriptState, ScriptStatus, SkipReason, SkippedScript,
};
