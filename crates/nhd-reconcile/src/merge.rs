use nhd_schemas::{MarketPrices, SymbolStates};

/// Shallow per-symbol merge: symbols in `fragment` replace their entry in
/// `current` wholesale; symbols absent from `fragment` are untouched.
///
/// A fragment is a delta, not a world-state: a missing symbol never means the
/// symbol went away. Idempotent.
pub fn merge(mut current: SymbolStates, fragment: SymbolStates) -> SymbolStates {
    merge_into(&mut current, fragment);
    current
}

/// In-place [`merge`]. Returns how many symbols the fragment touched.
pub fn merge_into(current: &mut SymbolStates, fragment: SymbolStates) -> usize {
    let touched = fragment.len();
    current.extend(fragment);
    touched
}

/// Last-write-wins per symbol; symbols not in `fragment` keep their price.
pub fn merge_prices_into(current: &mut MarketPrices, fragment: MarketPrices) -> usize {
    let touched = fragment.len();
    current.extend(fragment.into_iter().filter(|(_, px)| px.is_finite()));
    touched
}

#[cfg(test)]
mod tests {
    use super::*;
    use nhd_schemas::{SymbolState, SymbolStatus, TradeEntry, TrendBias};

    fn state(status: SymbolStatus, entries: usize) -> SymbolState {
        SymbolState {
            status,
            trend_bias: TrendBias::Long,
            entries: (0..entries)
                .map(|i| TradeEntry {
                    price: 100.0 + i as f64,
                    ..TradeEntry::default()
                })
                .collect(),
            ..SymbolState::seed()
        }
    }

    fn states(pairs: &[(&str, SymbolState)]) -> SymbolStates {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn fragment_replaces_whole_symbol_and_leaves_others() {
        let base = states(&[
            ("BTCUSD", state(SymbolStatus::Scaling, 3)),
            ("ETHUSD", state(SymbolStatus::Locked, 1)),
        ]);
        let out = merge(base, states(&[("BTCUSD", state(SymbolStatus::Locked, 1))]));
        assert_eq!(out["BTCUSD"].entries.len(), 1);
        assert_eq!(out["BTCUSD"].status, SymbolStatus::Locked);
        assert_eq!(out["ETHUSD"].entries.len(), 1);
    }

    #[test]
    fn merge_is_idempotent() {
        let s = states(&[("XAUUSD", state(SymbolStatus::Scanning, 0))]);
        let f = states(&[
            ("XAUUSD", state(SymbolStatus::Scaling, 2)),
            ("NAS100", state(SymbolStatus::Locked, 0)),
        ]);
        let once = merge(s, f.clone());
        let twice = merge(once.clone(), f);
        assert_eq!(once, twice);
    }

    #[test]
    fn disjoint_fragments_fold_like_their_union() {
        let s = states(&[("BTCUSD", state(SymbolStatus::Scanning, 0))]);
        let f1 = states(&[("BTCUSD", state(SymbolStatus::Locked, 1))]);
        let f2 = states(&[("ETHUSD", state(SymbolStatus::Scaling, 2))]);
        let f3 = states(&[("TSLA", state(SymbolStatus::Invalidated, 0))]);

        let stepwise = merge(merge(merge(s.clone(), f1.clone()), f2.clone()), f3.clone());

        let mut combined = f1;
        combined.extend(f2);
        combined.extend(f3);
        assert_eq!(stepwise, merge(s, combined));
    }

    #[test]
    fn prices_never_roll_back_absent_symbols() {
        let mut px = MarketPrices::from([("BTCUSD".to_string(), 65000.0)]);
        merge_prices_into(&mut px, MarketPrices::from([("ETHUSD".to_string(), 2050.0)]));
        assert_eq!(px["BTCUSD"], 65000.0);
        assert_eq!(px["ETHUSD"], 2050.0);
    }
}
