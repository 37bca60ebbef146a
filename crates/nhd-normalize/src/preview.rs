use serde_json::Value;

const PREVIEW_CHARS: usize = 40;

/// One-line packet description for the inspector log:
/// `Packet: <name> (<size>KB) | Data: <first 40 chars>...`
pub fn describe_packet(name: &str, payload: &Value) -> String {
    let body = payload.to_string();
    let kb = body.len() as f64 / 1024.0;
    let head: String = body.chars().take(PREVIEW_CHARS).collect();
    format!("Packet: {name} ({kb:.1}KB) | Data: {head}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn preview_is_truncated() {
        let line = describe_packet("heartbeat", &json!({"k": "x".repeat(100)}));
        assert!(line.starts_with("Packet: heartbeat ("));
        let data = line.split("| Data: ").nth(1).unwrap();
        assert_eq!(data.chars().count(), PREVIEW_CHARS + 3);
    }

    #[test]
    fn size_has_one_decimal() {
        // {"k":"..."} wraps the string in 8 bytes.
        let line = describe_packet("orders", &json!({"k": "x".repeat(1016)}));
        assert!(line.starts_with("Packet: orders (1.0KB) | Data: "), "{line}");
        let small = describe_packet("ping", &json!({}));
        assert!(small.starts_with("Packet: ping (0.0KB)"), "{small}");
    }
}
