use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Build the filter: RUST_LOG wins when set, otherwise the configured level plus module levels.
pub fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if std::env::var("RUST_LOG").is_ok() {
        return Ok(EnvFilter::from_default_env());
    }

    let mut filter_str = config.level.clone();
    for (module, level) in &config.module_levels {
        filter_str.push_str(&format!(",{}={}", module, level));
    }
    EnvFilter::try_new(&filter_str)
        .with_context(|| format!("invalid log filter \"{}\"", filter_str))
}

/// Install a global fmt subscriber for a test run.
///
/// With a log directory configured, events go to a daily rotating `html-fixture.log` and the
/// returned guard must be held for the writer to flush. Otherwise they go through the test
/// writer so the harness captures them per test. Only the first call installs anything.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = build_env_filter(config)?;

    match config.log_directory.as_deref() {
        Some(log_dir) => {
            let file_appender = tracing_appender::rolling::daily(log_dir, "html-fixture.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            let installed = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(non_blocking)
                .with_ansi(false)
                .compact()
                .try_init()
                .is_ok();

            Ok(installed.then_some(guard))
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_test_writer()
                .compact()
                .try_init();
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_includes_module_levels() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let mut config = LoggingConfig::default();
        config
            .module_levels
            .insert("html_fixture::api".to_string(), "trace".to_string());

        let filter = build_env_filter(&config).unwrap();
        let rendered = filter.to_string();
        assert!(rendered.contains("html_fixture::api=trace"));
    }

    #[test]
    fn test_invalid_level_is_rejected() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = LoggingConfig {
            level: "html_fixture=notalevel".to_string(),
            ..LoggingConfig::default()
        };
        assert!(build_env_filter(&config).is_err());
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let config = LoggingConfig::default();
        assert!(init(&config).is_ok());
        assert!(init(&config).is_ok());
    }
}
