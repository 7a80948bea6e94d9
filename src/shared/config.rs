/// Runtime configuration for the loader
///
/// Values come from the process environment (optionally seeded from a `.env`
/// file). Every setting has a default, so an empty environment is valid.
use crate::shared::errors::{AppError, AppResult};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::time::Duration;

pub const ENV_SERVICE_URL: &str = "METALOAD_SERVICE_URL";
pub const ENV_ACCESS_TOKEN: &str = "METALOAD_ACCESS_TOKEN";
pub const ENV_MAX_BATCH_ROWS: &str = "METALOAD_MAX_BATCH_ROWS";
pub const ENV_POLL_INTERVAL_MS: &str = "METALOAD_POLL_INTERVAL_MS";
pub const ENV_POLL_TIMEOUT_SECS: &str = "METALOAD_POLL_TIMEOUT_SECS";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "METALOAD_REQUEST_TIMEOUT_SECS";
pub const ENV_PREVIEW_ROWS: &str = "METALOAD_PREVIEW_ROWS";
pub const ENV_REQUIRED_COLUMNS: &str = "METALOAD_REQUIRED_COLUMNS";
pub const ENV_UNIQUE_COLUMNS: &str = "METALOAD_UNIQUE_COLUMNS";

const DEFAULT_SERVICE_URL: &str = "http://localhost:8080/services/cmd-loader";
const DEFAULT_MAX_BATCH_ROWS: usize = 200;
const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
const DEFAULT_POLL_TIMEOUT_SECS: u64 = 600;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PREVIEW_ROWS: usize = 200;
const DEFAULT_KEY_COLUMN: &str = "DeveloperName";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub service_base_url: String,
    pub access_token: Option<String>,
    pub max_batch_rows: NonZeroUsize,
    pub poll_interval: Duration,
    /// `None` polls until the job reports done
    pub poll_timeout: Option<Duration>,
    pub request_timeout: Duration,
    pub preview_rows: usize,
    pub required_columns: Vec<String>,
    /// Subset of `required_columns` whose values must not repeat
    pub unique_columns: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_base_url: DEFAULT_SERVICE_URL.to_string(),
            access_token: None,
            max_batch_rows: NonZeroUsize::new(DEFAULT_MAX_BATCH_ROWS)
                .unwrap_or(NonZeroUsize::MIN),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            poll_timeout: Some(Duration::from_secs(DEFAULT_POLL_TIMEOUT_SECS)),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            preview_rows: DEFAULT_PREVIEW_ROWS,
            required_columns: vec![DEFAULT_KEY_COLUMN.to_string()],
            unique_columns: vec![DEFAULT_KEY_COLUMN.to_string()],
        }
    }
}

impl AppConfig {
    /// Load configuration from the environment, reading `.env` first if present
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars().collect())
    }

    /// Build configuration from an explicit variable map
    pub fn from_vars(vars: HashMap<String, String>) -> AppResult<Self> {
        let defaults = Self::default();
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let max_batch_rows = match get(ENV_MAX_BATCH_ROWS) {
            Some(raw) => {
                let rows = parse_number::<usize>(ENV_MAX_BATCH_ROWS, &raw)?;
                NonZeroUsize::new(rows).ok_or_else(|| {
                    AppError::ConfigError(format!("{} must be greater than zero", ENV_MAX_BATCH_ROWS))
                })?
            }
            None => defaults.max_batch_rows,
        };

        let poll_interval = match get(ENV_POLL_INTERVAL_MS) {
            Some(raw) => match parse_number::<u64>(ENV_POLL_INTERVAL_MS, &raw)? {
                0 => {
                    return Err(AppError::ConfigError(format!(
                        "{} must be greater than zero",
                        ENV_POLL_INTERVAL_MS
                    )))
                }
                ms => Duration::from_millis(ms),
            },
            None => defaults.poll_interval,
        };

        let poll_timeout = match get(ENV_POLL_TIMEOUT_SECS) {
            Some(raw) => match parse_number::<u64>(ENV_POLL_TIMEOUT_SECS, &raw)? {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            None => defaults.poll_timeout,
        };

        let request_timeout = match get(ENV_REQUEST_TIMEOUT_SECS) {
            Some(raw) => Duration::from_secs(parse_number::<u64>(ENV_REQUEST_TIMEOUT_SECS, &raw)?),
            None => defaults.request_timeout,
        };

        let preview_rows = match get(ENV_PREVIEW_ROWS) {
            Some(raw) => parse_number::<usize>(ENV_PREVIEW_ROWS, &raw)?,
            None => defaults.preview_rows,
        };

        let required_columns = get(ENV_REQUIRED_COLUMNS)
            .map(|raw| split_list(&raw))
            .unwrap_or(defaults.required_columns);
        let unique_columns = get(ENV_UNIQUE_COLUMNS)
            .map(|raw| split_list(&raw))
            .unwrap_or(defaults.unique_columns);

        if let Some(stray) = unique_columns
            .iter()
            .find(|u| !required_columns.iter().any(|r| r.eq_ignore_ascii_case(u)))
        {
            return Err(AppError::ConfigError(format!(
                "unique column '{}' must also be listed in {}",
                stray, ENV_REQUIRED_COLUMNS
            )));
        }

        Ok(Self {
            service_base_url: get(ENV_SERVICE_URL)
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.service_base_url),
            access_token: get(ENV_ACCESS_TOKEN),
            max_batch_rows,
            poll_interval,
            poll_timeout,
            request_timeout,
            preview_rows,
            required_columns,
            unique_columns,
        })
    }
}

fn parse_number<T>(key: &str, raw: &str) -> AppResult<T>
where
    T: std::str::FromStr<Err = std::num::ParseIntError>,
{
    raw.parse::<T>()
        .map_err(|e| AppError::ConfigError(format!("{} has invalid value '{}': {}", key, raw, e)))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_environment_uses_defaults() {
        let config = AppConfig::from_vars(HashMap::new()).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.max_batch_rows.get(), 200);
        assert_eq!(config.poll_interval, Duration::from_millis(2000));
        assert_eq!(config.required_columns, vec!["DeveloperName".to_string()]);
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = AppConfig::from_vars(vars(&[
            (ENV_SERVICE_URL, "https://example.test/api/"),
            (ENV_MAX_BATCH_ROWS, "250"),
            (ENV_POLL_INTERVAL_MS, "500"),
            (ENV_POLL_TIMEOUT_SECS, "0"),
            (ENV_REQUIRED_COLUMNS, "DeveloperName, Label"),
            (ENV_UNIQUE_COLUMNS, "developername"),
        ]))
        .unwrap();

        assert_eq!(config.service_base_url, "https://example.test/api");
        assert_eq!(config.max_batch_rows.get(), 250);
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.poll_timeout, None);
        assert_eq!(config.required_columns, vec!["DeveloperName", "Label"]);
        assert_eq!(config.unique_columns, vec!["developername"]);
    }

    #[test]
    fn test_zero_batch_rows_rejected() {
        let err = AppConfig::from_vars(vars(&[(ENV_MAX_BATCH_ROWS, "0")])).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn test_garbage_number_rejected() {
        let err = AppConfig::from_vars(vars(&[(ENV_POLL_INTERVAL_MS, "soon")])).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(msg) if msg.contains(ENV_POLL_INTERVAL_MS)));
    }

    #[test]
    fn test_unique_column_must_be_required() {
        let err = AppConfig::from_vars(vars(&[
            (ENV_REQUIRED_COLUMNS, "Label"),
            (ENV_UNIQUE_COLUMNS, "DeveloperName"),
        ]))
        .unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
