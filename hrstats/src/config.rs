//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `HRSTATS_CONFIG`
//! environment variable. A missing file is not an error: every field has a default.
//!
//! ## Loading Priority
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `HRSTATS_` override YAML values
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `HRSTATS_ANALYTICS__TOKEN_AUTH=abc` sets the `analytics.token_auth` field.
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Override server port
//! HRSTATS_PORT=8080
//!
//! # Point at a self-hosted analytics instance
//! HRSTATS_ANALYTICS__BASE_URL=https://stats.example.org/
//! HRSTATS_ANALYTICS__TOKEN_AUTH=0123456789abcdef
//!
//! # Query more entities in parallel when summarizing a whole category
//! HRSTATS_SUMMARY__CONCURRENCY=8
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::cli::Command;
use crate::errors::Error;
use crate::summary::DEFAULT_CONCURRENCY;

pub const DEFAULT_DIRECTORY_URL: &str = "https://www.humanitarianresponse.info/api/v1.0/";

/// CLI args: config file location and an optional subcommand
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "HRSTATS_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,

    /// What to run. Defaults to `serve`.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Main application configuration.
///
/// All fields have defaults, so an empty file (or no file at all) gives a server on port 3002
/// talking to the public directory and an analytics instance on localhost.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Humanitarian response directory API
    pub directory: DirectoryConfig,
    /// Host analytics platform Reporting API
    pub analytics: AnalyticsConfig,
    /// Aggregation tuning
    pub summary: SummaryConfig,
    /// Export traces over OTLP, configured by the standard `OTEL_EXPORTER_OTLP_*` variables
    pub enable_otel_export: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DirectoryConfig {
    /// Base URL, entity type and id are appended as path segments
    pub base_url: Url,
    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyticsConfig {
    /// Base URL of the analytics instance, `index.php` is appended
    pub base_url: Url,
    /// API token, sent as `token_auth` when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_auth: Option<String>,
    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SummaryConfig {
    /// Entities summarized in parallel when summarizing a whole category
    pub concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3002,
            directory: DirectoryConfig::default(),
            analytics: AnalyticsConfig::default(),
            summary: SummaryConfig::default(),
            enable_otel_export: false,
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_DIRECTORY_URL).expect("Default directory URL is valid"),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("http://localhost/").expect("Default analytics URL is valid"),
            token_auth: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency
    pub fn validate(&self) -> Result<(), Error> {
        if self.summary.concurrency == 0 {
            return Err(Error::Internal {
                operation: "Config validation: summary.concurrency must be at least 1".to_string(),
            });
        }

        for (name, url, timeout) in [
            ("directory", &self.directory.base_url, self.directory.request_timeout),
            ("analytics", &self.analytics.base_url, self.analytics.request_timeout),
        ] {
            if !matches!(url.scheme(), "http" | "https") {
                return Err(Error::Internal {
                    operation: format!("Config validation: {name}.base_url must be an http(s) URL, got '{url}'"),
                });
            }
            if timeout.is_zero() {
                return Err(Error::Internal {
                    operation: format!("Config validation: {name}.request_timeout must be greater than zero"),
                });
            }
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // HRSTATS_CONFIG names the file itself, it is not a field
            .merge(Env::prefixed("HRSTATS_").ignore(&["config"]).split("__"))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
