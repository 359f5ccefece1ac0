//! Integration tests for logging system

use bridge_traits::logging::LogLevel;
use core_runtime::logging::{init_logging, redact_if_sensitive, LogFormat, LoggingConfig};

#[test]
fn test_logging_initialization_is_once_per_process() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_spans(true);

    assert!(init_logging(config.clone()).is_ok());

    // A global subscriber is already installed
    let second = init_logging(config);
    assert!(second.is_err());
    assert!(second
        .unwrap_err()
        .to_string()
        .contains("Failed to initialize logging"));
}

#[test]
fn test_redaction_of_secrets() {
    assert_eq!(redact_if_sensitive("access_token", "abc"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("password", "hunter2"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("api_key", "k-123"), "[REDACTED]");
}

#[test]
fn test_redaction_keeps_source_host() {
    let redacted = redact_if_sensitive("src", "https://cdn.example.org/audio/42.webm?exp=1&sig=abc");
    assert_eq!(redacted, "https://cdn.example.org/[REDACTED]");
    assert!(!redacted.contains("sig="));
}

#[test]
fn test_redaction_normal_values() {
    assert_eq!(redact_if_sensitive("track_id", "12345"), "12345");
    assert_eq!(redact_if_sensitive("range", "bytes=0-262143"), "bytes=0-262143");
}

#[test]
fn test_default_directives_cover_engine_crates() {
    let directives = LoggingConfig::default()
        .with_level(LogLevel::Warn)
        .default_directives();

    assert!(directives.contains("core_playback=warn"));
    assert!(directives.contains("bridge_wasm=warn"));
    assert!(directives.contains("hyper=warn"));
}

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn)
        .with_filter("core_playback::session=trace")
        .with_spans(false)
        .with_target(false)
        .with_thread_info(true);

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Warn);
    assert_eq!(config.filter.as_deref(), Some("core_playback::session=trace"));
    assert!(!config.enable_spans);
    assert!(!config.display_target);
    assert!(config.display_thread_info);
}
