use crate::trends::domain::{ParseYearMonthError, YearMonth};
use crate::trends::palette::{Palette, PaletteError};
use crate::trends::proration::ProRationPolicy;
use crate::trends::share::DEFAULT_MIN_SHARE_PCT;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

const DEFAULT_WINDOW_MONTHS: usize = 13;
const MAX_WINDOW_MONTHS: usize = 24;
const DEFAULT_EXCLUDED_SEGMENTS: &str = "Commercial,Land";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub trends: TrendsConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            trends: TrendsConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Knobs for the aggregation pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendsConfig {
    /// Number of months in the reporting window, newest last.
    pub window_months: usize,
    /// Minimum share of total transactions, in percentage points, for a segment to be shown.
    pub min_share_pct: f64,
    /// Segment labels removed before any totals are computed.
    pub excluded_segments: Vec<String>,
    pub proration: ProRationPolicy,
    pub palette: Palette,
}

impl Default for TrendsConfig {
    fn default() -> Self {
        Self {
            window_months: DEFAULT_WINDOW_MONTHS,
            min_share_pct: DEFAULT_MIN_SHARE_PCT,
            excluded_segments: split_list(DEFAULT_EXCLUDED_SEGMENTS),
            proration: ProRationPolicy::trailing(),
            palette: Palette::default(),
        }
    }
}

impl TrendsConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let window_months = match env::var("TRENDS_WINDOW_MONTHS") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|months| (2..=MAX_WINDOW_MONTHS).contains(months))
                .ok_or(ConfigError::InvalidWindowMonths(raw))?,
            Err(_) => defaults.window_months,
        };

        let min_share_pct = match env::var("TRENDS_MIN_SHARE_PCT") {
            Ok(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|pct| pct.is_finite() && (0.0..100.0).contains(pct))
                .ok_or(ConfigError::InvalidMinShare(raw))?,
            Err(_) => defaults.min_share_pct,
        };

        let excluded_segments = env::var("TRENDS_EXCLUDED_SEGMENTS")
            .map(|raw| split_list(&raw))
            .unwrap_or(defaults.excluded_segments);

        let cutover = env::var("TRENDS_PRORATION_CUTOVER")
            .ok()
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| raw.parse::<YearMonth>())
            .transpose()
            .map_err(|source| ConfigError::InvalidCutover { source })?;

        let pinned_index = match env::var("TRENDS_PRORATION_PINNED_INDEX") {
            Ok(raw) if raw.trim().is_empty() => None,
            Ok(raw) => Some(
                raw.trim()
                    .parse::<usize>()
                    .map_err(|_| ConfigError::InvalidPinnedIndex(raw))?,
            ),
            Err(_) => None,
        };

        let palette = match env::var("TRENDS_PALETTE") {
            Ok(raw) => Palette::new(split_list(&raw))
                .map_err(|source| ConfigError::InvalidPalette { source })?,
            Err(_) => defaults.palette,
        };

        Ok(Self {
            window_months,
            min_share_pct,
            excluded_segments,
            proration: ProRationPolicy {
                cutover,
                pinned_index,
            },
            palette,
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidWindowMonths(String),
    InvalidMinShare(String),
    InvalidCutover { source: ParseYearMonthError },
    InvalidPinnedIndex(String),
    InvalidPalette { source: PaletteError },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidWindowMonths(raw) => write!(
                f,
                "TRENDS_WINDOW_MONTHS must be between 2 and {MAX_WINDOW_MONTHS}, got '{raw}'"
            ),
            ConfigError::InvalidMinShare(raw) => write!(
                f,
                "TRENDS_MIN_SHARE_PCT must be a percentage below 100, got '{raw}'"
            ),
            ConfigError::InvalidCutover { .. } => {
                write!(f, "TRENDS_PRORATION_CUTOVER must be a YYYY-MM month")
            }
            ConfigError::InvalidPinnedIndex(raw) => write!(
                f,
                "TRENDS_PRORATION_PINNED_INDEX must be a window index, got '{raw}'"
            ),
            ConfigError::InvalidPalette { .. } => {
                write!(f, "TRENDS_PALETTE must list at least ten colors")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidCutover { source } => Some(source),
            ConfigError::InvalidPalette { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidWindowMonths(_)
            | ConfigError::InvalidMinShare(_)
            | ConfigError::InvalidPinnedIndex(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "TRENDS_WINDOW_MONTHS",
            "TRENDS_MIN_SHARE_PCT",
            "TRENDS_EXCLUDED_SEGMENTS",
            "TRENDS_PRORATION_CUTOVER",
            "TRENDS_PRORATION_PINNED_INDEX",
            "TRENDS_PALETTE",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.trends, TrendsConfig::default());
        assert_eq!(config.trends.excluded_segments, vec!["Commercial", "Land"]);
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn reads_trend_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("TRENDS_WINDOW_MONTHS", "24");
        env::set_var("TRENDS_MIN_SHARE_PCT", "0.5");
        env::set_var("TRENDS_EXCLUDED_SEGMENTS", "Farm, Commercial ,");
        env::set_var("TRENDS_PRORATION_CUTOVER", "2025-03");
        env::set_var("TRENDS_PRORATION_PINNED_INDEX", "10");

        let trends = TrendsConfig::from_env().expect("trend config loads");
        reset_env();

        assert_eq!(trends.window_months, 24);
        assert_eq!(trends.min_share_pct, 0.5);
        assert_eq!(trends.excluded_segments, vec!["Farm", "Commercial"]);
        assert_eq!(
            trends.proration,
            ProRationPolicy::with_cutover(YearMonth::new(2025, 3).unwrap(), 10)
        );
    }

    #[test]
    fn cutover_alone_derives_the_pinned_month() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("TRENDS_PRORATION_CUTOVER", "2025-03");

        let trends = TrendsConfig::from_env().expect("trend config loads");
        reset_env();

        let cutover = YearMonth::new(2025, 3).unwrap();
        assert_eq!(trends.proration, ProRationPolicy::from_cutover(cutover));
        assert_eq!(trends.proration.pinned_index, None);
    }

    #[test]
    fn rejects_invalid_trend_settings() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("TRENDS_WINDOW_MONTHS", "48");
        assert!(matches!(
            TrendsConfig::from_env(),
            Err(ConfigError::InvalidWindowMonths(_))
        ));

        reset_env();
        env::set_var("TRENDS_PRORATION_CUTOVER", "March");
        assert!(matches!(
            TrendsConfig::from_env(),
            Err(ConfigError::InvalidCutover { .. })
        ));

        reset_env();
        env::set_var("TRENDS_PALETTE", "#000,#fff");
        assert!(matches!(
            TrendsConfig::from_env(),
            Err(ConfigError::InvalidPalette { .. })
        ));
        reset_env();
    }
}
