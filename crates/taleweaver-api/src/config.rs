//! Server configuration read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use taleweaver_narrative::KeywordTable;
use taleweaver_session::PipelineConfig;

use crate::error::AppError;

/// Runtime configuration of the API server.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// PostgreSQL URL. Sessions are kept in memory when unset.
    pub database_url: Option<String>,
    /// How often the idle scanner runs.
    pub idle_scan_interval: Duration,
    /// YAML keyword table replacing the built-in classifier fallback.
    pub keywords_path: Option<PathBuf>,
    /// Action pipeline tunables.
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` for values that do not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` for values that do not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let defaults = PipelineConfig::default();

        let intent_threshold = parse_or(
            &lookup,
            "INTENT_CONFIDENCE_THRESHOLD",
            defaults.intent_threshold,
        )?;
        let genre_threshold = parse_or(
            &lookup,
            "GENRE_CONFIDENCE_THRESHOLD",
            defaults.genre_threshold,
        )?;
        for (key, value) in [
            ("INTENT_CONFIDENCE_THRESHOLD", intent_threshold),
            ("GENRE_CONFIDENCE_THRESHOLD", genre_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AppError::Config(format!("{key} must be within 0.0..=1.0")));
            }
        }

        let idle_secs: u64 = parse_or(&lookup, "IDLE_SCAN_INTERVAL_SECS", 60)?;
        if idle_secs == 0 {
            return Err(AppError::Config(
                "IDLE_SCAN_INTERVAL_SECS must be positive".to_string(),
            ));
        }

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 3000)?,
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            idle_scan_interval: Duration::from_secs(idle_secs),
            keywords_path: lookup("KEYWORDS_PATH")
                .filter(|path| !path.trim().is_empty())
                .map(PathBuf::from),
            pipeline: PipelineConfig {
                intent_threshold,
                genre_threshold,
                commit_retry_limit: parse_or(
                    &lookup,
                    "COMMIT_RETRY_LIMIT",
                    defaults.commit_retry_limit,
                )?,
                rules: parse_or(&lookup, "RULES_ADAPTER", defaults.rules)?,
                show_mechanics: parse_or(&lookup, "SHOW_MECHANICS", defaults.show_mechanics)?,
            },
        })
    }

    /// Socket address to listen on.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when `HOST:PORT` is not an address.
    pub fn socket_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }

    /// Reads the keyword table named by `KEYWORDS_PATH`, if any.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when the file cannot be read or parsed.
    pub fn load_keywords(&self) -> Result<Option<KeywordTable>, AppError> {
        let Some(path) = &self.keywords_path else {
            return Ok(None);
        };
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("cannot read keyword table {}: {e}", path.display()))
        })?;
        KeywordTable::from_yaml(&yaml)
            .map(Some)
            .map_err(|e| AppError::Config(format!("invalid keyword table {}: {e}", path.display())))
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key} is invalid: {e}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use taleweaver_narrative::RulesAdapter;

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig, AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_without_environment() {
        // Act
        let config = config_from(&[]).unwrap();

        // Assert
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert!(config.database_url.is_none());
        assert_eq!(config.idle_scan_interval, Duration::from_secs(60));
        assert!(config.keywords_path.is_none());
        assert!(config.load_keywords().unwrap().is_none());
        assert_eq!(config.pipeline, PipelineConfig::default());
    }

    #[test]
    fn test_overrides_are_applied() {
        // Act
        let config = config_from(&[
            ("PORT", "8080"),
            ("DATABASE_URL", "postgres://localhost/taleweaver"),
            ("IDLE_SCAN_INTERVAL_SECS", "15"),
            ("INTENT_CONFIDENCE_THRESHOLD", "0.8"),
            ("COMMIT_RETRY_LIMIT", "5"),
            ("RULES_ADAPTER", "fate_accelerated"),
        ])
        .unwrap();

        // Assert
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/taleweaver")
        );
        assert_eq!(config.idle_scan_interval, Duration::from_secs(15));
        assert!((config.pipeline.intent_threshold - 0.8).abs() < f64::EPSILON);
        assert_eq!(config.pipeline.commit_retry_limit, 5);
        assert_eq!(config.pipeline.rules, RulesAdapter::FateAccelerated);
    }

    #[test]
    fn test_unknown_rules_adapter_is_config_error() {
        let result = config_from(&[("RULES_ADAPTER", "gurps")]);
        assert!(matches!(result, Err(AppError::Config(msg)) if msg.contains("RULES_ADAPTER")));
    }

    #[test]
    fn test_invalid_port_is_config_error() {
        let result = config_from(&[("PORT", "not-a-port")]);
        assert!(matches!(result, Err(AppError::Config(msg)) if msg.contains("PORT")));
    }

    #[test]
    fn test_threshold_out_of_range_is_config_error() {
        let result = config_from(&[("GENRE_CONFIDENCE_THRESHOLD", "1.5")]);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_zero_scan_interval_is_config_error() {
        let result = config_from(&[("IDLE_SCAN_INTERVAL_SECS", "0")]);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_keyword_table_is_read_from_path() {
        // Arrange
        let path = std::env::temp_dir().join(format!("keywords-{}.yaml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "intent:\n  question: [ponder]\n").unwrap();
        let config = config_from(&[("KEYWORDS_PATH", path.to_str().unwrap())]).unwrap();

        // Act
        let table = config.load_keywords();
        std::fs::remove_file(&path).unwrap();

        // Assert
        let table = table.unwrap().unwrap();
        assert_eq!(table.intent["question"], ["ponder"]);
    }

    #[test]
    fn test_missing_keyword_file_is_config_error() {
        let config = config_from(&[("KEYWORDS_PATH", "/nonexistent/keywords.yaml")]).unwrap();

        assert!(matches!(config.load_keywords(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_blank_database_url_means_in_memory() {
        let config = config_from(&[("DATABASE_URL", "  ")]).unwrap();
        assert!(config.database_url.is_none());
    }
}
