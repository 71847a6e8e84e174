use std::collections::HashMap;

use super::*;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
    move |key| map.get(key).cloned()
}

#[test]
fn from_lookup_defaults_when_unset() {
    let cfg = ClientConfig::from_lookup(lookup_from(&[])).unwrap();
    assert_eq!(cfg, ClientConfig::default());
    assert_eq!(cfg.api_base_url, DEFAULT_API_BASE_URL);
    assert!(cfg.identity_api_key.is_none());
}

#[test]
fn from_lookup_parses_overrides() {
    let cfg = ClientConfig::from_lookup(lookup_from(&[
        ("CINEFAV_API_BASE_URL", "https://api.example.test/api/"),
        ("CINEFAV_IDENTITY_API_KEY", " key-123 "),
        ("CINEFAV_SHARE_ORIGIN", "https://movies.example.test"),
        ("CINEFAV_REQUEST_TIMEOUT_SECS", "42"),
        ("CINEFAV_CONNECT_TIMEOUT_SECS", "7"),
    ]))
    .unwrap();

    assert_eq!(cfg.api_base_url, "https://api.example.test/api");
    assert_eq!(cfg.identity_api_key.as_deref(), Some("key-123"));
    assert_eq!(cfg.share_origin, "https://movies.example.test");
    assert_eq!(cfg.timeouts, Timeouts { request_secs: 42, connect_secs: 7 });
}

#[test]
fn from_lookup_ignores_unparsable_timeouts() {
    let cfg = ClientConfig::from_lookup(lookup_from(&[("CINEFAV_REQUEST_TIMEOUT_SECS", "soon")])).unwrap();
    assert_eq!(cfg.timeouts.request_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
}

#[test]
fn from_lookup_blank_values_use_defaults() {
    let cfg = ClientConfig::from_lookup(lookup_from(&[
        ("CINEFAV_API_BASE_URL", "   "),
        ("CINEFAV_IDENTITY_API_KEY", ""),
    ]))
    .unwrap();
    assert_eq!(cfg.api_base_url, DEFAULT_API_BASE_URL);
    assert!(cfg.identity_api_key.is_none());
}

#[test]
fn from_lookup_rejects_non_http_url() {
    let err = ClientConfig::from_lookup(lookup_from(&[("CINEFAV_API_BASE_URL", "ftp://files")])).unwrap_err();
    assert_eq!(err, ConfigError::InvalidUrl { var: "CINEFAV_API_BASE_URL", value: "ftp://files".into() });
    assert!(err.to_string().contains("CINEFAV_API_BASE_URL"));
}
