//! nhd-reconcile
//!
//! Deterministic reconciliation of engine-reported symbol state into the
//! collections the dashboard renders and records.
//!
//! - [`merge`]: shallow, per-symbol last-write-wins fold of fragments
//! - [`classify`]: canonical state + prices → active positions / pending orders
//! - [`resolve_pnl`]: trust-ordered unrealized PnL per entry
//! - [`detect_transitions`]: previous vs current collections → history records
//! - [`history_stats`]: win rate, profit factor and friends over filled history
//!
//! Pure logic. No IO, no wall clock; callers pass `now` in.

mod classify;
mod clock;
mod lifecycle;
mod merge;
mod pnl;
mod stats;
mod summary;
mod transitions;

pub use classify::{classify, classify_with, is_pending, Classified, DEFAULT_REASON};
pub use clock::{entry_time_millis, DisplayClock};
pub use lifecycle::{lifecycle_stage, lifecycle_stages, LifecycleStage};
pub use merge::{merge, merge_into, merge_prices_into};
pub use pnl::{resolve_pnl, PNL_ESTIMATE_SCALE};
pub use stats::{history_stats, HistoryStats, UNBOUNDED_PROFIT_FACTOR};
pub use summary::{summarize, PortfolioSummary};
pub use transitions::{detect_transitions, Identity, TransitionContext, CANCELLED_REASON};
