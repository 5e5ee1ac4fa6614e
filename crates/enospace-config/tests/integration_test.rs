//! Integration tests for enospace-config
//!
//! These tests go through the real process environment, so everything that
//! touches it lives in a single test function.

use enospace_config::{
    ConfigError, QuotaConfig, Threshold, ThresholdUnit, ENV_AVAIL, ENV_DEBUG, ENV_ERRNO, ENV_KEYS,
    ENV_OPT,
};

fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}

#[test]
fn test_load_from_process_environment() {
    clear_env();
    let (config, warnings) = QuotaConfig::from_env().unwrap();
    assert_eq!(config, QuotaConfig::default());
    assert!(warnings.is_empty());

    std::env::set_var(ENV_AVAIL, "1048576");
    std::env::set_var(ENV_OPT, "bytes");
    std::env::set_var(ENV_ERRNO, "122");
    std::env::set_var(ENV_DEBUG, "yes");
    let (config, warnings) = QuotaConfig::from_env().unwrap();
    assert_eq!(config.threshold, Threshold::Limit(1_048_576));
    assert_eq!(config.unit, ThresholdUnit::Bytes);
    assert_eq!(config.errno, 122);
    assert!(config.debug);
    assert!(warnings.is_empty());

    std::env::set_var(ENV_OPT, "blocks");
    let (config, warnings) = QuotaConfig::from_env().unwrap();
    assert_eq!(config.unit, ThresholdUnit::Percent);
    assert_eq!(config.threshold, Threshold::Limit(100));
    assert_eq!(warnings.len(), 1);

    std::env::set_var(ENV_ERRNO, "28.0");
    let err = QuotaConfig::from_env().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidErrno { .. }));
    assert_eq!(ConfigError::EXIT_STATUS, 111);

    clear_env();
}

#[test]
fn test_config_serializes_for_reports() {
    let config = QuotaConfig {
        threshold: Threshold::Limit(10),
        unit: ThresholdUnit::Percent,
        errno: 28,
        debug: false,
    };
    let json = serde_json::to_value(config).unwrap();
    assert_eq!(json["unit"], "percent");
    assert_eq!(json["threshold"]["limit"], 10);

    let unbounded = serde_json::to_value(QuotaConfig::default()).unwrap();
    assert_eq!(unbounded["threshold"], "unbounded");
}
