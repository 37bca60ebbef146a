use nhd_config::load_layered_yaml_from_strings;

#[test]
fn config_hash_ignores_key_order_but_tracks_values() {
    let a = r#"
bridge:
  api_url: "http://localhost:8000"
  reconnect_delay_ms: 2000
ledger:
  history_cap: 1000
"#;
    let b = r#"
ledger:
  history_cap: 1000
bridge:
  reconnect_delay_ms: 2000
  api_url: "http://localhost:8000"
"#;
    let c = r#"
bridge:
  api_url: "http://localhost:8000"
  reconnect_delay_ms: 2500
ledger:
  history_cap: 1000
"#;

    let ha = load_layered_yaml_from_strings(&[a]).unwrap().config_hash;
    let hb = load_layered_yaml_from_strings(&[b]).unwrap().config_hash;
    let hc = load_layered_yaml_from_strings(&[c]).unwrap().config_hash;

    assert_eq!(ha, hb);
    assert_ne!(ha, hc);
    assert_eq!(ha.len(), 64);
}

#[test]
fn later_layer_overrides_and_sequences_replace() {
    let base = "universe: [BTCUSD, ETHUSD, XAUUSD]\nbridge:\n  allow_upgrade: true\n";
    let local = "universe: [XAUUSD]\nbridge:\n  allow_upgrade: false\n";
    let loaded = load_layered_yaml_from_strings(&[base, local]).unwrap();
    assert_eq!(loaded.config_json["universe"], serde_json::json!(["XAUUSD"]));
    assert_eq!(loaded.config_json["bridge"]["allow_upgrade"], false);
}

#[test]
fn secret_literal_aborts_load() {
    let doc = "bridge:\n  extra_headers:\n    authorization: \"ghp_abcdefghijklmnop\"\n";
    let err = load_layered_yaml_from_strings(&[doc]).unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("CONFIG_SECRET_DETECTED"));
    assert!(msg.contains("/bridge/extra_headers/authorization"));
    assert!(!msg.contains("ghp_abcdefghijklmnop"));
}
