//! Runtime configuration.
//!
//! Built once at startup and passed by reference. Precedence, highest first:
//! environment variables (optionally from `.env`), the TOML file, built-in defaults.

use crate::error::{IpamError, Result};
use crate::processing::SortOrder;
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/ipam.toml";
pub const DEFAULT_DB_PATH: &str = "data/ipam.json";
pub const DEFAULT_SNAPSHOT_LIMIT: usize = 200;
pub const DEFAULT_RECENT_LIMIT: usize = 100;
pub const DEFAULT_LOG_LEVEL: &str = "INFO";
pub const DEFAULT_TIMEZONE: &str = "Etc/GMT";

const LOG_LEVELS: [&str; 4] = ["DEBUG", "INFO", "WARNING", "ERROR"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub display: DisplayConfig,
    pub snapshots: SnapshotConfig,
    pub audit: AuditConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// JSON database file (`DB_PATH`).
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DisplayConfig {
    /// Subnet ordering for every listing (`DEFAULT_SORT`).
    #[serde(deserialize_with = "lenient_sort")]
    pub default_sort: SortOrder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Most snapshots listed at once (`SNAPSHOT_LIMIT`).
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub recent_limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// DEBUG, INFO, WARNING or ERROR (`LOG_LEVEL`).
    pub level: String,
    /// IANA name or `UTC+N`/`UTC-N` (`TZ`).
    pub timezone: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            path: PathBuf::from(DEFAULT_DB_PATH),
        }
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        SnapshotConfig {
            limit: DEFAULT_SNAPSHOT_LIMIT,
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        AuditConfig {
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: DEFAULT_LOG_LEVEL.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
        }
    }
}

/// Unknown sort names fall back to the default instead of failing the load.
fn parse_sort(value: &str) -> SortOrder {
    value.parse().unwrap_or_else(|e| {
        log::warn!("{e}, using {}", SortOrder::default());
        SortOrder::default()
    })
}

fn lenient_sort<'de, D>(deserializer: D) -> std::result::Result<SortOrder, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Ok(parse_sort(&value))
}

/// Case-insensitive match against the known levels, default otherwise.
fn normalize_level(value: &str) -> String {
    LOG_LEVELS
        .iter()
        .find(|l| l.eq_ignore_ascii_case(value.trim()))
        .map(|l| l.to_string())
        .unwrap_or_else(|| {
            log::warn!("Unknown log level '{value}', using {DEFAULT_LOG_LEVEL}");
            DEFAULT_LOG_LEVEL.to_string()
        })
}

fn parse_limit(name: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|e| IpamError::Config(format!("{name}='{value}' is not a valid count: {e}")))
}

impl Config {
    /// Read the TOML file (missing file means defaults), then apply the environment.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
        let mut config = match std::fs::read_to_string(path) {
            Ok(text) => {
                log::debug!("Reading config file: {}", path.display());
                Config::from_toml_str(&text)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No config file at {}, using defaults", path.display());
                Config::default()
            }
            Err(e) => {
                let message = format!("Error reading {}: {e}", path.display());
                return Err(IpamError::Config(message));
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Config> {
        let mut config: Config =
            toml::from_str(text).map_err(|e| IpamError::Config(e.to_string()))?;
        config.logging.level = normalize_level(&config.logging.level);
        Ok(config)
    }

    /// Override fields from environment-style variables.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(path) = lookup("DB_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(sort) = lookup("DEFAULT_SORT") {
            self.display.default_sort = parse_sort(&sort);
        }
        if let Some(limit) = lookup("SNAPSHOT_LIMIT") {
            self.snapshots.limit = parse_limit("SNAPSHOT_LIMIT", &limit)?;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = normalize_level(&level);
        }
        if let Some(tz) = lookup("TZ") {
            self.logging.timezone = tz;
        }
        Ok(())
    }

    pub fn level_filter(&self) -> log::LevelFilter {
        match self.logging.level.as_str() {
            "DEBUG" => log::LevelFilter::Debug,
            "WARNING" => log::LevelFilter::Warn,
            "ERROR" => log::LevelFilter::Error,
            _ => log::LevelFilter::Info,
        }
    }

    /// Display timezone. Falls back to UTC when the setting cannot be resolved.
    pub fn timezone(&self) -> Tz {
        parse_timezone(&self.logging.timezone).unwrap_or_else(|| {
            log::warn!(
                "Unknown timezone '{}', falling back to UTC",
                self.logging.timezone
            );
            Tz::UTC
        })
    }
}

/// Resolve an IANA name, or `UTC+N`/`UTC-N` whole-hour offsets.
pub fn parse_timezone(value: &str) -> Option<Tz> {
    let value = value.trim();
    if let Some(offset) = value.strip_prefix("UTC") {
        if offset.is_empty() {
            return Some(Tz::UTC);
        }
        let hours: i32 = offset.parse().ok()?;
        // Etc/GMT signs are inverted: Etc/GMT-5 is five hours ahead of UTC
        let name = match hours {
            0 => "Etc/GMT".to_string(),
            h if h > 0 => format!("Etc/GMT-{h}"),
            h => format!("Etc/GMT+{}", -h),
        };
        return name.parse().ok();
    }
    value.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.display.default_sort, SortOrder::Vlan);
        assert_eq!(config.snapshots.limit, 200);
        assert_eq!(config.audit.recent_limit, 100);
        assert_eq!(config.logging.level, "INFO");
        assert_eq!(config.timezone(), Tz::Etc__GMT);
        assert_eq!(config.level_filter(), log::LevelFilter::Info);
    }

    #[test]
    fn test_from_toml() {
        let config = Config::from_toml_str(
            r#"
            [database]
            path = "/var/lib/ipam/db.json"

            [display]
            default_sort = "name"

            [logging]
            level = "warning"
            "#,
        )
        .unwrap();
        assert_eq!(config.database.path, PathBuf::from("/var/lib/ipam/db.json"));
        assert_eq!(config.display.default_sort, SortOrder::Name);
        assert_eq!(config.logging.level, "WARNING");
        assert_eq!(config.level_filter(), log::LevelFilter::Warn);
        assert_eq!(config.snapshots.limit, 200, "missing sections use defaults");
    }

    #[test]
    fn test_unknown_enum_values_fall_back() {
        let toml = "[display]\ndefault_sort = \"size\"\n[logging]\nlevel = \"loud\"";
        let config = Config::from_toml_str(toml).unwrap();
        assert_eq!(config.display.default_sort, SortOrder::Vlan);
        assert_eq!(config.logging.level, "INFO");
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = Config::from_toml_str("[snapshots]\nlimit = \"many\"").unwrap_err();
        assert!(matches!(err, IpamError::Config(_)));
    }

    #[test]
    fn test_env_overrides_file() {
        let env: HashMap<&str, &str> = [
            ("DB_PATH", "/tmp/x.json"),
            ("DEFAULT_SORT", "Network"),
            ("SNAPSHOT_LIMIT", "5"),
            ("TZ", "UTC-5"),
        ]
        .into_iter()
        .collect();
        let mut config = Config::from_toml_str("[display]\ndefault_sort = \"Name\"").unwrap();
        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.database.path, PathBuf::from("/tmp/x.json"));
        assert_eq!(config.display.default_sort, SortOrder::Network);
        assert_eq!(config.snapshots.limit, 5);
        assert_eq!(config.timezone(), Tz::Etc__GMTPlus5);

        let err = config
            .apply_env(|k| (k == "SNAPSHOT_LIMIT").then(|| "lots".to_string()))
            .unwrap_err();
        assert!(matches!(err, IpamError::Config(_)));
    }

    #[test]
    fn test_parse_timezone() {
        let chicago = parse_timezone("America/Chicago");
        assert_eq!(chicago, Some(Tz::America__Chicago));
        assert_eq!(parse_timezone("UTC"), Some(Tz::UTC));
        assert_eq!(parse_timezone("UTC+3"), Some(Tz::Etc__GMTMinus3));
        assert_eq!(parse_timezone("UTC0"), Some(Tz::Etc__GMT));
        assert_eq!(parse_timezone("UTC+99"), None);
        assert_eq!(parse_timezone("Mars/Olympus"), None);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.audit.recent_limit, DEFAULT_RECENT_LIMIT);
    }
}
