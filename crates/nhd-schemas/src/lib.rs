//! nhd-schemas
//!
//! Wire and domain types shared by every dashboard crate. Inbound types decode
//! leniently (see [`lenient`]); derived types serialize with the camelCase
//! names rendering consumers and the bridge history endpoint expect.

mod account;
pub mod lenient;
mod positions;
mod symbol;
mod telemetry;

pub use account::AccountState;
pub use positions::{ActivePosition, ClosedTradeRecord, FinalStatus, PendingOrder};
pub use symbol::{
    HmaTrend, MarketPrices, SymbolState, SymbolStates, SymbolStatus, TradeEntry, TrendBias,
    SEED_HMA_PERIODS,
};
pub use telemetry::{LogEntry, LogLevel, EXECUTION_TRIGGERS};
