use std::collections::BTreeMap;

use nhd_schemas::{SymbolState, SymbolStates, SymbolStatus};
use serde::Serialize;

/// Where a symbol sits in the strategy's setup → scale-out progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleStage {
    WarmUp,
    Locked,
    Monitor,
    Scaling,
    Invalid,
}

impl LifecycleStage {
    /// 1-based step number for progress displays.
    pub fn step(&self) -> u8 {
        match self {
            LifecycleStage::WarmUp => 1,
            LifecycleStage::Locked => 2,
            LifecycleStage::Monitor => 3,
            LifecycleStage::Scaling => 4,
            LifecycleStage::Invalid => 5,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LifecycleStage::WarmUp => "WARM UP",
            LifecycleStage::Locked => "LOCKED",
            LifecycleStage::Monitor => "MONITOR",
            LifecycleStage::Scaling => "SCALING",
            LifecycleStage::Invalid => "INVALID",
        }
    }
}

/// `None` for MONITOR / IDLE symbols, which sit outside the progression.
pub fn lifecycle_stage(state: &SymbolState) -> Option<LifecycleStage> {
    let entries = state.entries.len();
    match state.status {
        SymbolStatus::Scanning => Some(LifecycleStage::WarmUp),
        SymbolStatus::Locked if entries == 0 => Some(LifecycleStage::Locked),
        SymbolStatus::Locked if entries == 1 => Some(LifecycleStage::Monitor),
        SymbolStatus::Locked | SymbolStatus::Scaling => Some(LifecycleStage::Scaling),
        SymbolStatus::Invalidated => Some(LifecycleStage::Invalid),
        SymbolStatus::Monitor | SymbolStatus::Idle => None,
    }
}

pub fn lifecycle_stages(states: &SymbolStates) -> BTreeMap<String, LifecycleStage> {
    states
        .iter()
        .filter_map(|(sym, st)| lifecycle_stage(st).map(|stage| (sym.clone(), stage)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nhd_schemas::TradeEntry;

    fn with(status: SymbolStatus, entries: usize) -> SymbolState {
        SymbolState {
            status,
            entries: vec![TradeEntry::default(); entries],
            ..SymbolState::seed()
        }
    }

    #[test]
    fn stage_table() {
        assert_eq!(lifecycle_stage(&with(SymbolStatus::Scanning, 0)), Some(LifecycleStage::WarmUp));
        assert_eq!(lifecycle_stage(&with(SymbolStatus::Locked, 0)), Some(LifecycleStage::Locked));
        assert_eq!(lifecycle_stage(&with(SymbolStatus::Locked, 1)), Some(LifecycleStage::Monitor));
        assert_eq!(lifecycle_stage(&with(SymbolStatus::Locked, 3)), Some(LifecycleStage::Scaling));
        assert_eq!(lifecycle_stage(&with(SymbolStatus::Scaling, 0)), Some(LifecycleStage::Scaling));
        assert_eq!(
            lifecycle_stage(&with(SymbolStatus::Invalidated, 2)),
            Some(LifecycleStage::Invalid)
        );
        assert_eq!(lifecycle_stage(&with(SymbolStatus::Idle, 0)), None);
        assert_eq!(LifecycleStage::Scaling.step(), 4);
    }
}
