//! odyo_supervisor
//!
//! Session layer around `odyo_core`.
//!
//! Responsibilities:
//! - own per-session case, settings, trial log and marked points
//! - translate operator actions into settings changes and tone presentations
//! - keep many independent sessions, with snapshot/restore
//!
//! Non-goals:
//! - no IO
//! - no async
//! - no response rules (those live in core)

pub mod adapter;
pub mod session;
pub mod supervisor;

pub use adapter::{apply_batch, ActionOutcome, OperatorAction};
pub use session::{Session, ToneOutcome};
pub use supervisor::{RestoreStats, SessionSupervisor, SupervisorSnapshot};
