//! Runtime configuration.
//!
//! The only setting that affects program semantics is the timezone used by
//! time built-ins. It is validated when the configuration is built, so an
//! invalid identifier is rejected before any program runs.

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, Offset, TimeZone as _, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Environment variable consulted by [`RuntimeConfig::from_env`].
pub const TIMEZONE_ENV_VAR: &str = "EVENTFOLD_TIMEZONE";

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A setting has an unacceptable value
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Timezone consulted by time-producing and time-formatting built-ins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeZone {
    /// The host's local zone
    #[default]
    Local,
    /// An IANA zone such as `Asia/Shanghai`
    Named(Tz),
}

impl TimeZone {
    /// Resolves a timezone identifier. Empty and `local` select the host zone.
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        let name = name.trim();
        if name.is_empty() || name.eq_ignore_ascii_case("local") {
            return Ok(TimeZone::Local);
        }
        name.parse::<Tz>().map(TimeZone::Named).map_err(|_| {
            ConfigError::InvalidArgument(format!("unknown timezone identifier {:?}", name))
        })
    }

    /// Expresses an instant in this zone with a fixed offset.
    pub fn from_utc(&self, utc: &DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            TimeZone::Local => {
                let local = utc.with_timezone(&Local);
                local.with_timezone(&local.offset().fix())
            }
            TimeZone::Named(tz) => {
                let zoned = utc.with_timezone(tz);
                zoned.with_timezone(&zoned.offset().fix())
            }
        }
    }

    /// Interprets a wall-clock time in this zone. Ambiguous times resolve to
    /// the earlier instant; times skipped by a DST jump yield `None`.
    pub fn from_local(&self, naive: &NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self {
            TimeZone::Local => Local
                .from_local_datetime(naive)
                .earliest()
                .map(|dt| dt.with_timezone(&dt.offset().fix())),
            TimeZone::Named(tz) => tz
                .from_local_datetime(naive)
                .earliest()
                .map(|dt| dt.with_timezone(&dt.offset().fix())),
        }
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        self.from_utc(&Utc::now())
    }
}

impl fmt::Display for TimeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeZone::Local => write!(f, "local"),
            TimeZone::Named(tz) => write!(f, "{}", tz.name()),
        }
    }
}

/// Settings applied to every program execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuntimeConfig {
    pub timezone: TimeZone,
}

/// On-disk form of the configuration.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    runtime: RuntimeSection,
    #[serde(default)]
    logging: LoggingSection,
}

#[derive(Debug, Default, Deserialize)]
struct RuntimeSection {
    timezone: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingSection {
    level: Option<String>,
}

/// A loaded configuration file: runtime settings plus the requested log level.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    pub runtime: RuntimeConfig,
    pub log_level: Option<String>,
}

impl RuntimeConfig {
    /// Builds a configuration, validating the timezone identifier.
    ///
    /// `None`, `""` and `"local"` select the host zone.
    pub fn new(timezone: Option<&str>) -> Result<Self, ConfigError> {
        let timezone = match timezone {
            Some(name) => TimeZone::parse(name)?,
            None => TimeZone::Local,
        };
        Ok(Self { timezone })
    }

    /// Reads the timezone from `EVENTFOLD_TIMEZONE`, defaulting to local.
    pub fn from_env() -> Result<Self, ConfigError> {
        let value = std::env::var(TIMEZONE_ENV_VAR).ok();
        Self::new(value.as_deref())
    }

    /// Parses a TOML document with optional `[runtime]` and `[logging]` tables.
    pub fn from_toml_str(input: &str) -> Result<LoadedConfig, ConfigError> {
        let file: ConfigFile = toml::from_str(input)?;
        let runtime = Self::new(file.runtime.timezone.as_deref())?;
        Ok(LoadedConfig {
            runtime,
            log_level: file.logging.level,
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<LoadedConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    #[test]
    fn test_local_aliases() {
        for name in [None, Some(""), Some("local"), Some("LOCAL")] {
            assert_eq!(RuntimeConfig::new(name).unwrap().timezone, TimeZone::Local);
        }
    }

    #[test]
    fn test_named_zone() {
        let config = RuntimeConfig::new(Some("Asia/Shanghai")).unwrap();
        assert_eq!(config.timezone, TimeZone::Named(chrono_tz::Asia::Shanghai));
        assert_eq!(config.timezone.to_string(), "Asia/Shanghai");
    }

    #[test]
    fn test_invalid_zone_is_rejected() {
        let err = RuntimeConfig::new(Some("Mars/Olympus_Mons")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidArgument(_)));
        assert!(err.to_string().contains("Mars/Olympus_Mons"));
    }

    #[test]
    fn test_from_utc_applies_offset() {
        let zone = TimeZone::parse("Asia/Tokyo").unwrap();
        let instant = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        let local = zone.from_utc(&instant);
        assert_eq!(local.offset().local_minus_utc(), 9 * 3600);
        assert_eq!(local.timestamp(), instant.timestamp());
    }

    #[test]
    fn test_toml_sections() {
        let loaded = RuntimeConfig::from_toml_str(
            "[runtime]\ntimezone = \"Europe/Berlin\"\n\n[logging]\nlevel = \"debug\"\n",
        )
        .unwrap();
        assert_eq!(
            loaded.runtime.timezone,
            TimeZone::Named(chrono_tz::Europe::Berlin)
        );
        assert_eq!(loaded.log_level.as_deref(), Some("debug"));

        let empty = RuntimeConfig::from_toml_str("").unwrap();
        assert_eq!(empty.runtime, RuntimeConfig::default());

        assert!(matches!(
            RuntimeConfig::from_toml_str("[runtime]\ntimezone = \"Nowhere\"\n"),
            Err(ConfigError::InvalidArgument(_))
        ));
        assert!(matches!(
            RuntimeConfig::from_toml_str("[runtime\n"),
            Err(ConfigError::Parse(_))
        ));
    }
}
