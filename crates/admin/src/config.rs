//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SUPABASE_URL` - Supabase project URL (e.g., `https://abc.supabase.co`)
//! - `SUPABASE_KEY` - Supabase API key (service role or anon key)
//!
//! ## Optional
//! - `BOLETOS_HOST` - Bind address (default: 127.0.0.1)
//! - `BOLETOS_PORT` - Listen port (default: 3002)
//! - `SUPABASE_CUSTOMERS_TABLE` - Customers table (default: customers)
//! - `SUPABASE_INVOICES_TABLE` - Invoices table (default: invoices)
//! - `SUPABASE_BUCKET` - Storage bucket for attachments (default: boletos)
//! - `HOLIDAY_CALENDAR` - `br` for Brazilian national holidays, `none` for weekends only (default: br)
//! - `HOLIDAYS_FILE` - YAML file with extra holiday dates
//! - `SETTLE_STATUS_ONLY_FALLBACK` - Retry settlements without `paid_at` on failure (default: true)
//! - `LOG_FORMAT` - `json` for structured logs, text otherwise
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Traces sample rate (default: 1.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use boletos_core::HolidayCalendar;
use chrono::{Datelike, Utc};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const MIN_KEY_LENGTH: usize = 20;

/// Years before and after the current one covered by the built-in calendar.
const HOLIDAY_YEARS_BACK: i32 = 2;
const HOLIDAY_YEARS_AHEAD: i32 = 12;

/// Blocklist of common placeholder patterns (case-insensitive).
///
/// Omits `secret`, since new Supabase keys start with `sb_secret_`.
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "your_",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Supabase project connection
    pub supabase: SupabaseConfig,
    /// Holiday calendar used for business-day adjustment
    pub holidays: HolidaySettings,
    /// Whether a failed settlement is retried with a status-only payload
    pub settle_status_only_fallback: bool,
    /// Emit JSON logs instead of text
    pub json_logs: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Supabase project configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct SupabaseConfig {
    /// Project URL, without trailing slash
    pub url: Url,
    /// API key sent as `apikey` and bearer token
    pub key: SecretString,
    pub customers_table: String,
    pub invoices_table: String,
    pub bucket: String,
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url.as_str())
            .field("key", &"[REDACTED]")
            .field("customers_table", &self.customers_table)
            .field("invoices_table", &self.invoices_table)
            .field("bucket", &self.bucket)
            .finish()
    }
}

/// Where holiday dates come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HolidaySource {
    /// Built-in Brazilian national holidays.
    Brazil,
    /// No holidays; only weekends are skipped.
    None,
}

impl std::str::FromStr for HolidaySource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "br" | "brazil" => Ok(Self::Brazil),
            "none" | "off" => Ok(Self::None),
            other => Err(format!("expected 'br' or 'none', got '{other}'")),
        }
    }
}

/// Holiday calendar settings.
#[derive(Debug, Clone)]
pub struct HolidaySettings {
    pub source: HolidaySource,
    /// Optional YAML file with extra dates
    pub extra_file: Option<PathBuf>,
}

impl HolidaySettings {
    /// Build the calendar, reading the extra file if configured.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the holiday file cannot be read
    /// or parsed.
    pub fn build_calendar(&self) -> Result<HolidayCalendar, ConfigError> {
        let this_year = Utc::now().year();
        let mut calendar = match self.source {
            HolidaySource::Brazil => HolidayCalendar::brazil(
                this_year - HOLIDAY_YEARS_BACK..=this_year + HOLIDAY_YEARS_AHEAD,
            ),
            HolidaySource::None => HolidayCalendar::none(),
        };

        if let Some(path) = &self.extra_file {
            let source = std::fs::read_to_string(path).map_err(|e| {
                ConfigError::InvalidEnvVar(
                    "HOLIDAYS_FILE".to_string(),
                    format!("{}: {e}", path.display()),
                )
            })?;
            let entries = HolidayCalendar::parse_yaml(&source).map_err(|e| {
                ConfigError::InvalidEnvVar("HOLIDAYS_FILE".to_string(), e.to_string())
            })?;
            tracing::info!(count = entries.len(), path = %path.display(), "Loaded extra holidays");
            calendar.extend(entries.into_iter().map(|entry| entry.date));
        }

        Ok(calendar)
    }
}

impl SupabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let url = parse_supabase_url(&get_required_env("SUPABASE_URL")?)?;
        let key = get_required_env("SUPABASE_KEY")?;
        validate_api_key(&key, "SUPABASE_KEY")?;

        Ok(Self {
            url,
            key: SecretString::from(key),
            customers_table: get_env_or_default("SUPABASE_CUSTOMERS_TABLE", "customers"),
            invoices_table: get_env_or_default("SUPABASE_INVOICES_TABLE", "invoices"),
            bucket: get_env_or_default("SUPABASE_BUCKET", "boletos"),
        })
    }

    /// The API key, for request headers only.
    #[must_use]
    pub fn expose_key(&self) -> &str {
        self.key.expose_secret()
    }
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the API key fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("BOLETOS_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("BOLETOS_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("BOLETOS_PORT", "3002")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("BOLETOS_PORT".to_string(), e.to_string()))?;

        let supabase = SupabaseConfig::from_env()?;

        let source = get_env_or_default("HOLIDAY_CALENDAR", "br")
            .parse::<HolidaySource>()
            .map_err(|e| ConfigError::InvalidEnvVar("HOLIDAY_CALENDAR".to_string(), e))?;
        let holidays = HolidaySettings {
            source,
            extra_file: get_optional_env("HOLIDAYS_FILE").map(PathBuf::from),
        };

        let settle_status_only_fallback = get_optional_env("SETTLE_STATUS_ONLY_FALLBACK")
            .map(|v| parse_bool(&v))
            .transpose()
            .map_err(|e| ConfigError::InvalidEnvVar("SETTLE_STATUS_ONLY_FALLBACK".to_string(), e))?
            .unwrap_or(true);

        let json_logs = get_optional_env("LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json"));

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            host,
            port,
            supabase,
            holidays,
            settle_status_only_fallback,
            json_logs,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse a boolean flag (`true/false`, `1/0`, `yes/no`, `on/off`).
fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(format!("expected a boolean, got '{other}'")),
    }
}

/// Parse and normalize the project URL.
fn parse_supabase_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim().trim_end_matches('/'))
        .map_err(|e| ConfigError::InvalidEnvVar("SUPABASE_URL".to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "SUPABASE_URL".to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    if url.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            "SUPABASE_URL".to_string(),
            "missing host".to_string(),
        ));
    }

    Ok(url)
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that an API key is not a placeholder and has sufficient entropy.
fn validate_api_key(key: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = key.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    if key.len() < MIN_KEY_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("must be at least {MIN_KEY_LENGTH} characters (got {})", key.len()),
        ));
    }

    let entropy = shannon_entropy(key);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Copy the key from the Supabase dashboard."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn supabase() -> SupabaseConfig {
        SupabaseConfig {
            url: Url::parse("https://abc.supabase.co").unwrap(),
            key: SecretString::from("sb_secret_9fK2mQ7xLp4Rt8Vw1Zc6"),
            customers_table: "customers".to_string(),
            invoices_table: "invoices".to_string(),
            bucket: "boletos".to_string(),
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_api_key_placeholder() {
        let result = validate_api_key("your-supabase-key-goes-here", "SUPABASE_KEY");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_api_key_too_short() {
        assert!(validate_api_key("aB3$xY9!", "SUPABASE_KEY").is_err());
    }

    #[test]
    fn test_validate_api_key_low_entropy() {
        let result = validate_api_key(&"a".repeat(40), "SUPABASE_KEY");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_api_key_accepts_secret_prefix() {
        assert!(validate_api_key("sb_secret_9fK2mQ7xLp4Rt8Vw1Zc6", "SUPABASE_KEY").is_ok());
    }

    #[test]
    fn test_parse_supabase_url() {
        let url = parse_supabase_url("https://abc.supabase.co/").unwrap();
        assert_eq!(url.host_str(), Some("abc.supabase.co"));
        assert!(parse_supabase_url("ftp://abc.supabase.co").is_err());
        assert!(parse_supabase_url("not a url").is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Ok(true));
        assert_eq!(parse_bool("off"), Ok(false));
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn test_holiday_source() {
        assert_eq!("BR".parse::<HolidaySource>(), Ok(HolidaySource::Brazil));
        assert_eq!("none".parse::<HolidaySource>(), Ok(HolidaySource::None));
        assert!("us".parse::<HolidaySource>().is_err());
    }

    #[test]
    fn test_build_calendar_without_holidays() {
        let settings = HolidaySettings {
            source: HolidaySource::None,
            extra_file: None,
        };
        assert!(settings.build_calendar().unwrap().is_empty());
    }

    #[test]
    fn test_build_calendar_missing_file() {
        let settings = HolidaySettings {
            source: HolidaySource::Brazil,
            extra_file: Some(PathBuf::from("/nonexistent/holidays.yaml")),
        };
        assert!(matches!(
            settings.build_calendar(),
            Err(ConfigError::InvalidEnvVar(var, _)) if var == "HOLIDAYS_FILE"
        ));
    }

    #[test]
    fn test_socket_addr() {
        let config = AdminConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3002,
            supabase: supabase(),
            holidays: HolidaySettings {
                source: HolidaySource::Brazil,
                extra_file: None,
            },
            settle_status_only_fallback: true,
            json_logs: false,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3002);
    }

    #[test]
    fn test_supabase_config_debug_redacts_key() {
        let debug_output = format!("{:?}", supabase());

        assert!(debug_output.contains("abc.supabase.co"));
        assert!(debug_output.contains("boletos"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("sb_secret_9fK2mQ7xLp4Rt8Vw1Zc6"));
    }
}
