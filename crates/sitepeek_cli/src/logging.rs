//! Logger setup for the sitepeek binary.
//!
//! Results go to stdout, so terminal logging is pinned to stderr.

use std::fs::File;
use std::path::{Path, PathBuf};

use log::LevelFilter;
use simplelog::{ColorChoice, CombinedLogger, SharedLogger, TermLogger, TerminalMode, WriteLogger};

/// Destination for log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDestination {
    /// Write to stderr.
    Terminal,
    /// Append to the given file.
    File(PathBuf),
}

/// Installs the global logger. Fails if the log file cannot be created.
pub fn initialize(destination: LogDestination, level: LevelFilter) -> anyhow::Result<()> {
    let config = sitepeek_logging::build_config();

    let logger: Box<dyn SharedLogger> = match destination {
        LogDestination::Terminal => {
            TermLogger::new(level, config, TerminalMode::Stderr, ColorChoice::Auto)
        }
        LogDestination::File(path) => create_file_logger(&path, level, config)?,
    };

    CombinedLogger::init(vec![logger])?;
    Ok(())
}

fn create_file_logger(
    path: &Path,
    level: LevelFilter,
    config: simplelog::Config,
) -> anyhow::Result<Box<WriteLogger<File>>> {
    let file = File::options()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| anyhow::anyhow!("could not open log file {}: {err}", path.display()))?;
    Ok(WriteLogger::new(level, config, file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_logger_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sitepeek.log");
        assert!(create_file_logger(&path, LevelFilter::Info, sitepeek_logging::build_config()).is_ok());
        assert!(path.is_file());
    }

    #[test]
    fn file_logger_reports_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("sitepeek.log");
        let err = create_file_logger(&path, LevelFilter::Info, sitepeek_logging::build_config())
            .err()
            .unwrap();
        assert!(err.to_string().contains("could not open log file"));
    }
}
