use std::collections::HashMap;
use std::time::Duration;

use avatar_voice::config::AppConfig;
use avatar_voice::error::ConfigError;
use avatar_voice::ReactorConfig;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn test_defaults() {
    let config = AppConfig::from_lookup(lookup(&[])).unwrap();
    assert_eq!(config.api_base_url, "http://localhost:3000");
    assert_eq!(config.http_timeout, Duration::from_secs(10));
    assert_eq!(config.timing.speech_settle, Duration::from_millis(300));
    assert_eq!(config.timing.resume_guard, Duration::from_millis(500));
    assert_eq!(config.history_limit, 20);
    assert_eq!(config.allowed_origins, vec!["http://localhost", "https://localhost"]);
}

#[test]
fn test_overrides() {
    let config = AppConfig::from_lookup(lookup(&[
        ("AVATAR_API_BASE_URL", "https://api.example.com/"),
        ("AVATAR_HTTP_TIMEOUT_MS", "2500"),
        ("AVATAR_SPEECH_SETTLE_MS", "150"),
        ("AVATAR_RESUME_GUARD_MS", " 800 "),
        ("AVATAR_HISTORY_LIMIT", "6"),
        ("AVATAR_ALLOWED_ORIGINS", "https://games.example.com, http://localhost:5173 ,"),
    ]))
    .unwrap();

    assert_eq!(config.api_base_url, "https://api.example.com");
    assert_eq!(config.http_timeout, Duration::from_millis(2500));
    assert_eq!(config.timing.speech_settle, Duration::from_millis(150));
    assert_eq!(config.timing.resume_guard, Duration::from_millis(800));
    assert_eq!(config.history_limit, 6);
    assert_eq!(
        config.allowed_origins,
        vec!["https://games.example.com", "http://localhost:5173"]
    );

    let reactor = ReactorConfig::from(&config);
    assert_eq!(reactor.timing, config.timing);
    assert_eq!(reactor.history_limit, 6);
}

#[test]
fn test_malformed_number_is_rejected() {
    let err = AppConfig::from_lookup(lookup(&[("AVATAR_RESUME_GUARD_MS", "soon")])).unwrap_err();
    assert_eq!(
        err,
        ConfigError::Invalid {
            key: "AVATAR_RESUME_GUARD_MS",
            value: "soon".to_string(),
        }
    );
}

#[test]
fn test_history_limit_below_one_exchange_is_rejected() {
    let err = AppConfig::from_lookup(lookup(&[("AVATAR_HISTORY_LIMIT", "1")])).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { key: "AVATAR_HISTORY_LIMIT", .. }));
}
