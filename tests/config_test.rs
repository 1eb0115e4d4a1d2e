//! Integration tests for runtime configuration.

use eventfold::runtime::config::TIMEZONE_ENV_VAR;
use eventfold::{ConfigError, RuntimeConfig, TimeZone};
use std::io::Write;

#[test]
fn test_invalid_timezone_rejected_before_running() {
    let err = RuntimeConfig::new(Some("Not/AZone")).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidArgument(_)));
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[runtime]\ntimezone = \"America/Chicago\"\n\n[logging]\nlevel = \"warn\"").unwrap();

    let loaded = RuntimeConfig::from_file(file.path()).unwrap();
    assert_eq!(
        loaded.runtime.timezone,
        TimeZone::Named(chrono_tz::America::Chicago)
    );
    assert_eq!(loaded.log_level.as_deref(), Some("warn"));
}

#[test]
fn test_file_with_bad_zone_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[runtime]\ntimezone = \"Atlantis/Capital\"").unwrap();
    assert!(matches!(
        RuntimeConfig::from_file(file.path()),
        Err(ConfigError::InvalidArgument(_))
    ));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = RuntimeConfig::from_file(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

// The only test in this binary that touches the environment variable.
#[test]
fn test_environment_override() {
    std::env::set_var(TIMEZONE_ENV_VAR, "Europe/Paris");
    let config = RuntimeConfig::from_env().unwrap();
    assert_eq!(config.timezone, TimeZone::Named(chrono_tz::Europe::Paris));

    std::env::set_var(TIMEZONE_ENV_VAR, "Nowhere/Special");
    assert!(RuntimeConfig::from_env().is_err());

    std::env::remove_var(TIMEZONE_ENV_VAR);
    assert_eq!(RuntimeConfig::from_env().unwrap().timezone, TimeZone::Local);
}
