//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::PipelineOptions;
use crate::cache::CacheConfig;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "brezza";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_SITE_DIR: &str = "site";
const DEFAULT_OUTPUT_CEILING_BYTES: u64 = 1024 * 1024;
const DEFAULT_NEWSFEED_TIMEOUT_SECS: u64 = 10;

fn default_page_models() -> Vec<String> {
    vec![
        "weblog".to_string(),
        "request".to_string(),
        "messages".to_string(),
    ]
}

fn default_search_models() -> Vec<String> {
    vec![
        "weblog".to_string(),
        "request".to_string(),
        "messages".to_string(),
        "search".to_string(),
    ]
}

/// Command-line arguments for the Brezza binary.
#[derive(Debug, Parser)]
#[command(name = "brezza", version, about = "Brezza weblog rendering server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "BREZZA_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
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

    /// Override the site data directory.
    #[arg(long = "site-dir", value_name = "PATH")]
    pub site_dir: Option<PathBuf>,

    /// Toggle development-mode theme reloading.
    #[arg(
        long = "themes-reload",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub themes_reload: Option<bool>,

    /// Override the handle of the site-wide front page weblog.
    #[arg(long = "themes-site-wide-weblog", value_name = "HANDLE")]
    pub site_wide_weblog: Option<String>,

    /// Override the rendered output ceiling in bytes.
    #[arg(long = "rendering-output-ceiling-bytes", value_name = "BYTES")]
    pub output_ceiling_bytes: Option<u64>,

    /// Override the remote newsfeed fetch timeout.
    #[arg(long = "newsfeed-timeout-seconds", value_name = "SECONDS")]
    pub newsfeed_timeout_seconds: Option<u64>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub cache: CacheConfig,
    pub rendering: RenderingSettings,
    pub themes: ThemeSettings,
    pub newsfeed: NewsfeedSettings,
    pub site_dir: PathBuf,
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
pub struct RenderingSettings {
    /// Loader names for ordinary weblog pages.
    pub page_models: Vec<String>,
    /// Loader names for pages of the site-wide weblog.
    pub site_models: Vec<String>,
    /// Loader names for search result pages.
    pub search_models: Vec<String>,
    pub output_ceiling_bytes: usize,
}

impl RenderingSettings {
    /// Resolve the pipeline knobs from rendering and theme settings.
    pub fn pipeline_options(&self, themes: &ThemeSettings) -> PipelineOptions {
        PipelineOptions {
            page_models: self.page_models.clone(),
            site_models: self.site_models.clone(),
            search_models: self.search_models.clone(),
            output_ceiling: self.output_ceiling_bytes,
            site_wide_handle: themes.site_wide_weblog.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ThemeSettings {
    /// Re-read disk themes before rendering; development deployments only.
    pub reload: bool,
    pub site_wide_weblog: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewsfeedSettings {
    pub timeout: Duration,
    pub cache_failures: bool,
    pub default_url: Option<String>,
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

    builder = builder.add_source(Environment::with_prefix("BREZZA").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);
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
    cache: CacheConfig,
    rendering: RawRenderingSettings,
    themes: RawThemeSettings,
    newsfeed: RawNewsfeedSettings,
    site_dir: Option<PathBuf>,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(dir) = overrides.site_dir.as_ref() {
            self.site_dir = Some(dir.clone());
        }
        if let Some(reload) = overrides.themes_reload {
            self.themes.reload = Some(reload);
        }
        if let Some(handle) = overrides.site_wide_weblog.as_ref() {
            self.themes.site_wide_weblog = Some(handle.clone());
        }
        if let Some(ceiling) = overrides.output_ceiling_bytes {
            self.rendering.output_ceiling_bytes = Some(ceiling);
        }
        if let Some(seconds) = overrides.newsfeed_timeout_seconds {
            self.newsfeed.timeout_seconds = Some(seconds);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            cache,
            rendering,
            themes,
            newsfeed,
            site_dir,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let rendering = build_rendering_settings(rendering)?;
        let themes = build_theme_settings(themes)?;
        let newsfeed = build_newsfeed_settings(newsfeed)?;
        let site_dir = site_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_SITE_DIR));
        if site_dir.as_os_str().is_empty() {
            return Err(LoadError::invalid("site_dir", "path must not be empty"));
        }

        Ok(Self {
            server,
            logging,
            cache,
            rendering,
            themes,
            newsfeed,
            site_dir,
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

fn build_rendering_settings(
    rendering: RawRenderingSettings,
) -> Result<RenderingSettings, LoadError> {
    let page_models = rendering.page_models.unwrap_or_else(default_page_models);
    let site_models = rendering
        .site_models
        .unwrap_or_else(|| page_models.clone());
    let search_models = rendering
        .search_models
        .unwrap_or_else(default_search_models);

    let ceiling_value = rendering
        .output_ceiling_bytes
        .unwrap_or(DEFAULT_OUTPUT_CEILING_BYTES);
    if ceiling_value == 0 {
        return Err(LoadError::invalid(
            "rendering.output_ceiling_bytes",
            "must be greater than zero",
        ));
    }
    let output_ceiling_bytes = usize::try_from(ceiling_value).map_err(|_| {
        LoadError::invalid(
            "rendering.output_ceiling_bytes",
            "value exceeds supported range for usize",
        )
    })?;

    Ok(RenderingSettings {
        page_models,
        site_models,
        search_models,
        output_ceiling_bytes,
    })
}

fn build_theme_settings(themes: RawThemeSettings) -> Result<ThemeSettings, LoadError> {
    let site_wide_weblog = themes.site_wide_weblog.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    Ok(ThemeSettings {
        reload: themes.reload.unwrap_or(false),
        site_wide_weblog,
    })
}

fn build_newsfeed_settings(newsfeed: RawNewsfeedSettings) -> Result<NewsfeedSettings, LoadError> {
    let timeout_secs = newsfeed
        .timeout_seconds
        .unwrap_or(DEFAULT_NEWSFEED_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "newsfeed.timeout_seconds",
            "must be greater than zero",
        ));
    }

    let default_url = newsfeed.default_url.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    Ok(NewsfeedSettings {
        timeout: Duration::from_secs(timeout_secs),
        cache_failures: newsfeed.cache_failures.unwrap_or(true),
        default_url,
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
struct RawRenderingSettings {
    page_models: Option<Vec<String>>,
    site_models: Option<Vec<String>>,
    search_models: Option<Vec<String>>,
    output_ceiling_bytes: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawThemeSettings {
    reload: Option<bool>,
    site_wide_weblog: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawNewsfeedSettings {
    timeout_seconds: Option<u64>,
    cache_failures: Option<bool>,
    default_url: Option<String>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve() {
        let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");
        assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
        assert_eq!(settings.site_dir, PathBuf::from(DEFAULT_SITE_DIR));
        assert!(!settings.themes.reload);
        assert!(settings.newsfeed.cache_failures);
        assert_eq!(settings.rendering.page_models, default_page_models());
        assert_eq!(settings.rendering.site_models, default_page_models());
    }

    #[test]
    fn cli_overrides_take_highest_precedence() {
        let mut raw = RawSettings::default();
        raw.server.port = Some(4000);
        raw.logging.level = Some("info".to_string());

        let overrides = ServeOverrides {
            server_port: Some(4321),
            log_level: Some("debug".to_string()),
            ..Default::default()
        };

        raw.apply_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert_eq!(settings.server.addr.port(), 4321);
        assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    }

    #[test]
    fn cli_json_logging_enforces_format() {
        let mut raw = RawSettings::default();
        let overrides = ServeOverrides {
            log_json: Some(true),
            ..Default::default()
        };

        raw.apply_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert!(matches!(settings.logging.format, LogFormat::Json));
    }

    #[test]
    fn zero_output_ceiling_is_rejected() {
        let mut raw = RawSettings::default();
        raw.rendering.output_ceiling_bytes = Some(0);
        let err = Settings::from_raw(raw).expect_err("invalid settings");
        assert!(matches!(
            err,
            LoadError::Invalid {
                key: "rendering.output_ceiling_bytes",
                ..
            }
        ));
    }

    #[test]
    fn blank_site_wide_weblog_is_normalized_away() {
        let mut raw = RawSettings::default();
        raw.themes.site_wide_weblog = Some("   ".to_string());
        let settings = Settings::from_raw(raw).expect("valid settings");
        assert!(settings.themes.site_wide_weblog.is_none());
    }

    #[test]
    fn pipeline_options_carry_site_wide_handle() {
        let mut raw = RawSettings::default();
        raw.themes.site_wide_weblog = Some("frontpage".to_string());
        let settings = Settings::from_raw(raw).expect("valid settings");
        let options = settings.rendering.pipeline_options(&settings.themes);
        assert_eq!(options.site_wide_handle.as_deref(), Some("frontpage"));
        assert_eq!(options.output_ceiling, DEFAULT_OUTPUT_CEILING_BYTES as usize);
    }

    #[test]
    fn parse_cli_overrides() {
        let args = CliArgs::parse_from([
            "brezza",
            "--server-host",
            "0.0.0.0",
            "--themes-reload",
            "true",
            "--site-dir",
            "/srv/brezza",
        ]);

        assert_eq!(args.overrides.server_host.as_deref(), Some("0.0.0.0"));
        assert_eq!(args.overrides.themes_reload, Some(true));
        assert_eq!(
            args.overrides.site_dir,
            Some(PathBuf::from("/srv/brezza"))
        );
    }
}
