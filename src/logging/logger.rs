use anyhow::{Context, Result};
use log::LevelFilter;

use crate::config::LoggingConfig;

/// Builds the dispatcher without installing it.
pub fn build_dispatch(config: &LoggingConfig) -> Result<fern::Dispatch> {
    let level: LevelFilter = config
        .level
        .parse()
        .with_context(|| format!("Invalid log level: {}", config.level))?;

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr());

    if let Some(path) = &config.file {
        let file = fern::log_file(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        dispatch = dispatch.chain(file);
    }

    Ok(dispatch)
}

/// Installs the global logger. Stdout stays free for snapshots.
pub fn setup_logging(config: &LoggingConfig) -> Result<()> {
    build_dispatch(config)?
        .apply()
        .context("Logger already initialized")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_level_rejected() {
        let config = LoggingConfig {
            level: String::from("chatty"),
            file: None,
        };
        assert!(build_dispatch(&config).is_err());
    }

    #[test]
    fn test_log_file_created() {
        let path = std::env::temp_dir().join(format!("netgraph-log-{}.log", std::process::id()));
        let config = LoggingConfig {
            level: String::from("warn"),
            file: Some(path.clone()),
        };
        assert!(build_dispatch(&config).is_ok());
        assert!(path.exists());
        let _ = std::fs::remove_file(path);
    }
}
