//! Service configuration.
//!
//! All configuration is loaded from environment variables. Absent or blank
//! variables fall back to defaults; present but unusable values are a
//! [`ConfigError`] so a typo never silently changes behavior.

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;
use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use nmrih_api::ServerConfig;
use nmrih_ingest::DEFAULT_MAX_CONCURRENCY;
use nmrih_stats::config::DEFAULT_MIN_SESSION_MINUTES;

use crate::error::ConfigError;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_LOGS_FILE_PATTERN: &str = "logs/*.log";
const DEFAULT_CSV_STORAGE_DIRECTORY: &str = "data";
const DEFAULT_GAME_SERVER_PORT: u16 = 27015;
const DEFAULT_QUERY_TIMEOUT_MS: u64 = 3000;
const DEFAULT_IP_API_URL: &str = "http://ip-api.com";
const DEFAULT_GEO_TIMEOUT_MS: u64 = 5000;
const DEFAULT_INGEST_SINCE: &str = "2025-03-01 00:00:00";
const DEFAULT_GRAPH_CACHE_TTL_MINUTES: u64 = 5;
const DEFAULT_GRAPH_CACHE_TIMEOUT_SECONDS: u64 = 10;

/// Layout of `INGEST_DEFAULT_SINCE`.
const SINCE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The game server queried for the live roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameServer {
    /// Host name or IP address.
    pub host: String,
    /// UDP query port.
    pub port: u16,
}

/// Complete service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// HTTP listener.
    pub server: ServerConfig,
    /// Glob of raw log files.
    pub logs_file_pattern: String,
    /// Directory of canonical CSV snapshots.
    pub csv_storage_directory: PathBuf,
    /// Live roster target; the roster endpoint is disabled when `None`.
    pub game_server: Option<GameServer>,
    /// Deadline for one live roster query.
    pub query_timeout: Duration,
    /// Base URL of the ip-api.com compatible geolocation service.
    pub ip_api_url: String,
    /// Deadline for one geolocation lookup.
    pub geo_timeout: Duration,
    /// Bound on raw files scanned concurrently.
    pub ingest_max_concurrency: usize,
    /// Low-water-mark used before the first snapshot exists.
    pub ingest_default_since: DateTime<Utc>,
    /// Whether a `connected` line without an IP is a line error.
    pub require_connect_address: bool,
    /// Minimum session length counted by the online statistics.
    pub min_session: TimeDelta,
    /// Redis-compatible cache URL; in-memory cache when `None`.
    pub dragonfly_url: Option<String>,
    /// TTL of cached graph responses.
    pub graph_cache_ttl: Duration,
    /// Deadline for one cache round trip.
    pub graph_cache_timeout: Duration,
    /// The single origin allowed by CORS; any origin when `None`.
    pub cors_allow_origin: Option<HeaderValue>,
}

impl ServiceConfig {
    /// Load configuration from the process environment.
    ///
    /// Optional variables (defaults in parentheses):
    /// - `PORT` (8080), `HTTP_HOST` (`0.0.0.0`)
    /// - `LOGS_FILE_PATTERN` (`logs/*.log`), `CSV_STORAGE_DIRECTORY` (`data`)
    /// - `SERVER_ADDR` (unset), `SERVER_PORT` (27015), `QUERY_TIMEOUT_MS` (3000)
    /// - `IP_API_URL` (`http://ip-api.com`), `GEO_TIMEOUT_MS` (5000)
    /// - `INGEST_MAX_CONCURRENCY` (100), `INGEST_DEFAULT_SINCE` (`2025-03-01 00:00:00`)
    /// - `REQUIRE_CONNECT_ADDRESS` (false), `MIN_SESSION_MINUTES` (10)
    /// - `DRAGONFLY_URL` (unset), `GRAPH_CACHE_TTL_MINUTES` (5),
    ///   `GRAPH_CACHE_TIMEOUT_SECONDS` (10)
    /// - `CORS_ALLOW_ORIGIN` (unset)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let server = ServerConfig {
            host: env.string("HTTP_HOST").unwrap_or_else(|| DEFAULT_HOST.to_owned()),
            port: env.parsed("PORT", DEFAULT_PORT)?,
        };

        let game_server = match env.string("SERVER_ADDR") {
            Some(host) => Some(GameServer {
                host,
                port: env.parsed("SERVER_PORT", DEFAULT_GAME_SERVER_PORT)?,
            }),
            None => None,
        };

        let min_session_minutes: i64 =
            env.parsed("MIN_SESSION_MINUTES", DEFAULT_MIN_SESSION_MINUTES)?;
        let min_session = TimeDelta::try_minutes(min_session_minutes)
            .filter(|delta| *delta >= TimeDelta::zero())
            .ok_or_else(|| {
                ConfigError::invalid(
                    "MIN_SESSION_MINUTES",
                    &min_session_minutes.to_string(),
                    String::from("must be a non-negative number of minutes"),
                )
            })?;

        let since = env
            .string("INGEST_DEFAULT_SINCE")
            .unwrap_or_else(|| DEFAULT_INGEST_SINCE.to_owned());
        let ingest_default_since = NaiveDateTime::parse_from_str(&since, SINCE_FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(|e| ConfigError::invalid("INGEST_DEFAULT_SINCE", &since, e.to_string()))?;

        let cors_allow_origin = match env.string("CORS_ALLOW_ORIGIN") {
            Some(origin) => Some(
                HeaderValue::from_str(&origin)
                    .map_err(|e| ConfigError::invalid("CORS_ALLOW_ORIGIN", &origin, e.to_string()))?,
            ),
            None => None,
        };

        Ok(Self {
            server,
            logs_file_pattern: env
                .string("LOGS_FILE_PATTERN")
                .unwrap_or_else(|| DEFAULT_LOGS_FILE_PATTERN.to_owned()),
            csv_storage_directory: env
                .string("CSV_STORAGE_DIRECTORY")
                .map_or_else(|| PathBuf::from(DEFAULT_CSV_STORAGE_DIRECTORY), PathBuf::from),
            game_server,
            query_timeout: Duration::from_millis(
                env.positive("QUERY_TIMEOUT_MS", DEFAULT_QUERY_TIMEOUT_MS)?,
            ),
            ip_api_url: env
                .string("IP_API_URL")
                .unwrap_or_else(|| DEFAULT_IP_API_URL.to_owned()),
            geo_timeout: Duration::from_millis(
                env.positive("GEO_TIMEOUT_MS", DEFAULT_GEO_TIMEOUT_MS)?,
            ),
            ingest_max_concurrency: env.positive("INGEST_MAX_CONCURRENCY", DEFAULT_MAX_CONCURRENCY)?,
            ingest_default_since,
            require_connect_address: env.parsed("REQUIRE_CONNECT_ADDRESS", false)?,
            min_session,
            dragonfly_url: env.string("DRAGONFLY_URL"),
            graph_cache_ttl: Duration::from_secs(
                env.positive_or_default("GRAPH_CACHE_TTL_MINUTES", DEFAULT_GRAPH_CACHE_TTL_MINUTES)?
                    .saturating_mul(60),
            ),
            graph_cache_timeout: Duration::from_secs(env.positive_or_default(
                "GRAPH_CACHE_TIMEOUT_SECONDS",
                DEFAULT_GRAPH_CACHE_TIMEOUT_SECONDS,
            )?),
            cors_allow_origin,
        })
    }
}

/// Typed access to a variable lookup.
struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// The trimmed value, `None` when unset or blank.
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }

    fn parsed<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.string(name) {
            Some(value) => value
                .parse()
                .map_err(|e: T::Err| ConfigError::invalid(name, &value, e.to_string())),
            None => Ok(default),
        }
    }

    /// A strictly positive integer; zero is rejected.
    fn positive<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr + PartialOrd + Default + Display,
        T::Err: Display,
    {
        let value = self.parsed(name, default)?;
        if value > T::default() {
            Ok(value)
        } else {
            Err(ConfigError::invalid(
                name,
                &value.to_string(),
                String::from("must be greater than zero"),
            ))
        }
    }

    /// An integer where zero or a negative value selects the default.
    fn positive_or_default(&self, name: &'static str, default: u64) -> Result<u64, ConfigError> {
        let value: i64 = self.parsed(name, 0)?;
        Ok(u64::try_from(value)
            .ok()
            .filter(|value| *value > 0)
            .unwrap_or(default))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ServiceConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        ServiceConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logs_file_pattern, "logs/*.log");
        assert_eq!(config.csv_storage_directory, PathBuf::from("data"));
        assert_eq!(config.game_server, None);
        assert_eq!(config.query_timeout, Duration::from_secs(3));
        assert_eq!(config.ip_api_url, "http://ip-api.com");
        assert_eq!(config.geo_timeout, Duration::from_secs(5));
        assert_eq!(config.ingest_max_concurrency, 100);
        assert_eq!(
            config.ingest_default_since,
            Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
        );
        assert!(!config.require_connect_address);
        assert_eq!(config.min_session, TimeDelta::minutes(10));
        assert_eq!(config.dragonfly_url, None);
        assert_eq!(config.graph_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.graph_cache_timeout, Duration::from_secs(10));
        assert_eq!(config.cors_allow_origin, None);
    }

    #[test]
    fn overrides_are_read() {
        let config = load(&[
            ("PORT", "9000"),
            ("SERVER_ADDR", "nmrih.example.org"),
            ("SERVER_PORT", "27016"),
            ("REQUIRE_CONNECT_ADDRESS", "true"),
            ("INGEST_DEFAULT_SINCE", "2024-12-31 23:00:00"),
            ("DRAGONFLY_URL", "redis://cache:6379"),
            ("CORS_ALLOW_ORIGIN", "https://stats.example.org"),
        ])
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(
            config.game_server,
            Some(GameServer {
                host: String::from("nmrih.example.org"),
                port: 27016,
            })
        );
        assert!(config.require_connect_address);
        assert_eq!(
            config.ingest_default_since,
            Utc.with_ymd_and_hms(2024, 12, 31, 23, 0, 0).unwrap()
        );
        assert_eq!(config.dragonfly_url.as_deref(), Some("redis://cache:6379"));
        assert_eq!(
            config.cors_allow_origin,
            Some(HeaderValue::from_static("https://stats.example.org"))
        );
    }

    #[test]
    fn game_server_port_defaults_when_only_address_set() {
        let config = load(&[("SERVER_ADDR", "10.0.0.5")]).unwrap();
        assert_eq!(config.game_server.unwrap().port, 27015);
    }

    #[test]
    fn non_positive_cache_settings_fall_back() {
        let config = load(&[
            ("GRAPH_CACHE_TTL_MINUTES", "0"),
            ("GRAPH_CACHE_TIMEOUT_SECONDS", "-3"),
        ])
        .unwrap();
        assert_eq!(config.graph_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.graph_cache_timeout, Duration::from_secs(10));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = load(&[("PORT", "  "), ("DRAGONFLY_URL", "")]).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.dragonfly_url, None);
    }

    #[test]
    fn invalid_values_are_rejected() {
        for (name, value) in [
            ("PORT", "http"),
            ("QUERY_TIMEOUT_MS", "0"),
            ("INGEST_MAX_CONCURRENCY", "0"),
            ("REQUIRE_CONNECT_ADDRESS", "maybe"),
            ("MIN_SESSION_MINUTES", "-1"),
            ("INGEST_DEFAULT_SINCE", "yesterday"),
            ("GRAPH_CACHE_TTL_MINUTES", "five"),
        ] {
            let err = load(&[(name, value)]).unwrap_err();
            let ConfigError::Invalid { name: reported, .. } = err;
            assert_eq!(reported, name);
        }
    }
}
