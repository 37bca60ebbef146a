use nhd_schemas::{lenient, AccountState};
use serde_json::Value;

/// Decoded `account_update` event.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountUpdate {
    pub account: AccountState,
    /// Value appended to the session equity series: equity, else balance, else 0.
    pub equity_sample: f64,
    /// Bridge reported itself `ONLINE` / `CONNECTED`.
    pub link_online: bool,
}

/// `None` when the payload is not an object; every field is optional.
pub fn decode_account_event(raw: &Value) -> Option<AccountUpdate> {
    if !raw.is_object() {
        return None;
    }
    let account: AccountState = serde_json::from_value(raw.clone()).unwrap_or_default();

    let equity_sample = raw
        .get("equity")
        .and_then(lenient::number)
        .or_else(|| raw.get("balance").and_then(lenient::number))
        .unwrap_or(0.0);

    let link_online = raw
        .get("status")
        .and_then(Value::as_str)
        .map(|s| {
            let s = s.trim().to_ascii_uppercase();
            s == "ONLINE" || s == "CONNECTED"
        })
        .unwrap_or(false);

    Some(AccountUpdate {
        account,
        equity_sample,
        link_online,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn equity_sample_falls_back_to_balance_then_zero() {
        let a = decode_account_event(&json!({"equity": 10100.5, "balance": 10000})).unwrap();
        assert_eq!(a.equity_sample, 10100.5);

        let b = decode_account_event(&json!({"balance": 9800})).unwrap();
        assert_eq!(b.equity_sample, 9800.0);
        assert_eq!(b.account.equity, 0.0);

        let c = decode_account_event(&json!({"status": "ONLINE"})).unwrap();
        assert_eq!(c.equity_sample, 0.0);
        assert!(c.link_online);
    }

    #[test]
    fn camel_case_fields_and_non_objects() {
        let a = decode_account_event(&json!({"realizedPnl": 42, "winRate": "55.5", "status": "degraded"}))
            .unwrap();
        assert_eq!(a.account.realized_pnl, 42.0);
        assert_eq!(a.account.win_rate, 55.5);
        assert!(!a.link_online);
        assert!(decode_account_event(&json!([1, 2])).is_none());
    }
}
