//! nhd-runtime
//!
//! Wires transport, reconciliation, and ledgers into one session:
//! - [`ReconciliationEngine`]: synchronous owner of canonical state.
//! - [`DashboardSession`]: async loop feeding the engine in arrival order.
//! - [`DashboardSnapshot`]: what consumers get to read.

mod engine;
mod session;
mod snapshot;

pub use engine::{EngineSettings, Outcome, ReconciliationEngine};
pub use session::{
    transport_config, DashboardSession, SessionCommand, SessionControl, SessionParts, SnapshotRx,
};
pub use snapshot::{DashboardSnapshot, LinkStatus};
