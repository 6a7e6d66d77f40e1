//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, num::NonZeroU32, path::PathBuf, str::FromStr, time::Duration};

use clap::{Parser, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "snipbin";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 5;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_CACHE_TTL_SECS: u64 = 600;
const DEFAULT_CACHE_SWEEP_SECS: u64 = 60;
const DEFAULT_CLIENT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_CLIENT_MAX_TEXT_BYTES: usize = 10_000;
const DEFAULT_CLASSIFIER_URL: &str = "http://tagger-ml:8000";
const DEFAULT_SLUGGEN_URL: &str = "http://slug-generator:8001";

/// Command-line arguments for the snipbin binary.
#[derive(Debug, Parser, Default)]
#[command(name = "snipbin", version, about = "Short-lived paste service")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "SNIPBIN_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the cache entry TTL in seconds; zero disables expiry.
    #[arg(long = "cache-ttl-seconds", value_name = "SECONDS")]
    pub cache_ttl_seconds: Option<u64>,

    /// Override the cache sweep cadence.
    #[arg(long = "cache-sweep-seconds", value_name = "SECONDS")]
    pub cache_sweep_seconds: Option<u64>,

    /// Toggle sliding expiration (reads re-arm the entry TTL).
    #[arg(
        long = "cache-refresh-on-get",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_refresh_on_get: Option<bool>,

    /// Override the classifier base URL.
    #[arg(long = "classifier-url", value_name = "URL")]
    pub classifier_url: Option<String>,

    /// Override the slug generator base URL.
    #[arg(long = "sluggen-url", value_name = "URL")]
    pub sluggen_url: Option<String>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    pub classifier: ClientSettings,
    pub sluggen: ClientSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// `None` means cached entries never expire.
    pub default_ttl: Option<Duration>,
    pub sweep_interval: Duration,
    pub refresh_on_get: bool,
}

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub timeout: Duration,
    pub max_text_bytes: usize,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("SNIPBIN").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_cli_overrides(cli);

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    cache: RawCacheSettings,
    classifier: RawClientSettings,
    sluggen: RawClientSettings,
}

impl RawSettings {
    fn apply_cli_overrides(&mut self, cli: &CliArgs) {
        if let Some(host) = cli.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = cli.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = cli.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = cli.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = cli.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = cli.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(max) = cli.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(ttl) = cli.cache_ttl_seconds {
            self.cache.default_ttl_seconds = Some(ttl);
        }
        if let Some(sweep) = cli.cache_sweep_seconds {
            self.cache.sweep_seconds = Some(sweep);
        }
        if let Some(refresh) = cli.cache_refresh_on_get {
            self.cache.refresh_on_get = Some(refresh);
        }
        if let Some(url) = cli.classifier_url.as_ref() {
            self.classifier.base_url = Some(url.clone());
        }
        if let Some(url) = cli.sluggen_url.as_ref() {
            self.sluggen.base_url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            cache,
            classifier,
            sluggen,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            cache: build_cache_settings(cache)?,
            classifier: build_client_settings(
                classifier,
                DEFAULT_CLASSIFIER_URL,
                "classifier.base_url",
            )?,
            sluggen: build_client_settings(sluggen, DEFAULT_SLUGGEN_URL, "sluggen.base_url")?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database.url.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let max = database
        .max_connections
        .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);
    let max_connections = NonZeroU32::new(max)
        .ok_or_else(|| LoadError::invalid("database.max_connections", "must be greater than zero"))?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let ttl_secs = cache.default_ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL_SECS);
    let default_ttl = (ttl_secs > 0).then(|| Duration::from_secs(ttl_secs));

    let sweep_secs = cache.sweep_seconds.unwrap_or(DEFAULT_CACHE_SWEEP_SECS);
    if sweep_secs == 0 {
        return Err(LoadError::invalid(
            "cache.sweep_seconds",
            "must be greater than zero",
        ));
    }

    Ok(CacheSettings {
        default_ttl,
        sweep_interval: Duration::from_secs(sweep_secs),
        refresh_on_get: cache.refresh_on_get.unwrap_or(true),
    })
}

fn build_client_settings(
    client: RawClientSettings,
    default_url: &str,
    url_key: &'static str,
) -> Result<ClientSettings, LoadError> {
    let base_url = client
        .base_url
        .unwrap_or_else(|| default_url.to_string())
        .trim_end_matches('/')
        .to_string();
    if base_url.is_empty() {
        return Err(LoadError::invalid(url_key, "url must not be empty"));
    }

    let timeout_secs = client.timeout_seconds.unwrap_or(DEFAULT_CLIENT_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "client.timeout_seconds",
            "must be greater than zero",
        ));
    }

    let max_text_bytes = client
        .max_text_bytes
        .unwrap_or(DEFAULT_CLIENT_MAX_TEXT_BYTES);
    if max_text_bytes == 0 {
        return Err(LoadError::invalid(
            "client.max_text_bytes",
            "must be greater than zero",
        ));
    }

    Ok(ClientSettings {
        base_url,
        timeout: Duration::from_secs(timeout_secs),
        max_text_bytes,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    default_ttl_seconds: Option<u64>,
    sweep_seconds: Option<u64>,
    refresh_on_get: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawClientSettings {
    base_url: Option<String>,
    timeout_seconds: Option<u64>,
    max_text_bytes: Option<usize>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use serial_test::serial;

    use super::*;

    #[test]
    fn defaults_resolve() {
        let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

        assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
        assert_eq!(settings.cache.default_ttl, Some(Duration::from_secs(600)));
        assert_eq!(settings.cache.sweep_interval, Duration::from_secs(60));
        assert!(settings.cache.refresh_on_get);
        assert_eq!(settings.classifier.base_url, DEFAULT_CLASSIFIER_URL);
        assert_eq!(settings.classifier.max_text_bytes, 10_000);
        assert!(settings.database.url.is_none());
    }

    #[test]
    fn cli_overrides_take_highest_precedence() {
        let mut raw = RawSettings::default();
        raw.server.port = Some(4000);
        raw.logging.level = Some("info".to_string());

        let cli = CliArgs {
            server_port: Some(4321),
            log_level: Some("debug".to_string()),
            ..Default::default()
        };

        raw.apply_cli_overrides(&cli);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert_eq!(settings.server.addr.port(), 4321);
        assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    }

    #[test]
    fn zero_cache_ttl_disables_expiry() {
        let mut raw = RawSettings::default();
        raw.cache.default_ttl_seconds = Some(0);

        let settings = Settings::from_raw(raw).expect("valid settings");
        assert_eq!(settings.cache.default_ttl, None);
    }

    #[test]
    fn zero_sweep_cadence_is_rejected() {
        let mut raw = RawSettings::default();
        raw.cache.sweep_seconds = Some(0);

        assert!(matches!(
            Settings::from_raw(raw),
            Err(LoadError::Invalid { key, .. }) if key == "cache.sweep_seconds"
        ));
    }

    #[test]
    fn client_urls_are_normalized() {
        let mut raw = RawSettings::default();
        raw.classifier.base_url = Some("http://tagger.internal:9000/".to_string());

        let settings = Settings::from_raw(raw).expect("valid settings");
        assert_eq!(settings.classifier.base_url, "http://tagger.internal:9000");
    }

    #[test]
    fn parse_cli_overrides() {
        let cli = CliArgs::parse_from([
            "snipbin",
            "--server-host",
            "0.0.0.0",
            "--database-url",
            "postgres://override",
            "--cache-refresh-on-get",
            "false",
        ]);

        assert_eq!(cli.server_host.as_deref(), Some("0.0.0.0"));
        assert_eq!(cli.database_url.as_deref(), Some("postgres://override"));
        assert_eq!(cli.cache_refresh_on_get, Some(false));
    }

    #[test]
    #[serial]
    fn environment_layer_overrides_defaults() {
        // set_var is unsafe on edition 2024; the serial guard keeps this
        // test from racing other env readers.
        unsafe {
            std::env::set_var("SNIPBIN__CACHE__DEFAULT_TTL_SECONDS", "120");
        }

        let settings = load(&CliArgs::default()).expect("valid settings");
        assert_eq!(settings.cache.default_ttl, Some(Duration::from_secs(120)));

        unsafe {
            std::env::remove_var("SNIPBIN__CACHE__DEFAULT_TTL_SECONDS");
        }
    }
}
