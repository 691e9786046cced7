use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use log::LevelFilter;
use sitepeek_engine::{FetchConfig, TlsOverride};
use url::Url;

use crate::logging::LogDestination;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "sitepeek",
    version,
    about = "Fetch pages and print the title, description, keywords and icon found in their <head>"
)]
pub struct Cli {
    /// Absolute http(s) URLs. Each one is fetched independently.
    #[arg(value_name = "URL", required = true)]
    pub urls: Vec<String>,

    /// End-to-end deadline per request; 0 means the 5000 ms default.
    #[arg(long, value_name = "MS", default_value_t = 0)]
    pub timeout_ms: u64,

    /// Route requests through this proxy, e.g. http://127.0.0.1:7890.
    #[arg(long, value_name = "URL")]
    pub proxy: Option<String>,

    /// Skip certificate verification. Only applies together with --proxy.
    #[arg(long, default_value_t = false, requires = "proxy")]
    pub insecure: bool,

    /// Only extract title and description.
    #[arg(long, default_value_t = false)]
    pub basic: bool,

    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,

    /// Write logs to this file instead of stderr.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Pretty-print JSON instead of one object per line.
    #[arg(long, default_value_t = false)]
    pub pretty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

impl Cli {
    /// Core configuration for one validated URL.
    pub fn fetch_config(&self, url: &Url) -> FetchConfig {
        let mut config = FetchConfig::new(url.as_str())
            .with_timeout(Duration::from_millis(self.timeout_ms))
            .with_only_basic_info(self.basic);
        if let Some(proxy) = &self.proxy {
            config = config.with_proxy(proxy.clone());
        }
        if self.insecure {
            config = config.with_tls_override(TlsOverride::AcceptInvalidCerts);
        }
        config
    }

    pub fn log_destination(&self) -> LogDestination {
        match &self.log_file {
            Some(path) => LogDestination::File(path.clone()),
            None => LogDestination::Terminal,
        }
    }
}
