use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use tracing::subscriber::set_global_default;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, EnvFilter};

/// Defines the Logger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Sets the logger [`EnvFilter`].
    /// Valid values: trace, debug, info, warn, error
    /// Example of a valid filter: "warn,my_crate=info,my_crate::my_mod=debug,[my_span]=trace"
    pub level: String,

    /// Determines whether the Logger should print to standard error.
    /// The agent writes its events to standard output, so the log lines never go there.
    pub stderr_output: bool,

    // A file path in the file system; if provided, the Logger will append any output to it.
    pub file_output_path: Option<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        LoggerConfig { level: "info".to_owned(), stderr_output: true, file_output_path: None }
    }
}

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("LoggerConfigurationError: [{message}]")]
    LoggerConfigurationError { message: String },
}

/// Keeps the non-blocking writers alive.
/// Buffered log lines are flushed when this guard is dropped.
pub struct LogWorkerGuard {
    #[allow(dead_code)]
    file_guard: Option<WorkerGuard>,
    #[allow(dead_code)]
    stderr_guard: Option<WorkerGuard>,
}

/// Configures the underlying logger implementation and activates it.
pub fn setup_logger(logger_config: &LoggerConfig) -> Result<LogWorkerGuard, LoggerError> {
    let env_filter = parse_env_filter(&logger_config.level)?;

    let (file_subscriber, file_guard) = if let Some(file_output) = &logger_config.file_output_path {
        let (dir, filename) = path_to_dir_and_filename(file_output)?;
        let file_appender = tracing_appender::rolling::never(dir, filename);

        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        (Some(Layer::new().with_ansi(false).with_writer(non_blocking)), Some(guard))
    } else {
        (None, None)
    };

    let (stderr_subscriber, stderr_guard) = if logger_config.stderr_output {
        let (non_blocking, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());
        (Some(Layer::new().with_ansi(false).with_writer(non_blocking)), Some(stderr_guard))
    } else {
        (None, None)
    };

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_subscriber)
        .with(stderr_subscriber);

    set_global_logger(subscriber)?;

    Ok(LogWorkerGuard { file_guard, stderr_guard })
}

fn parse_env_filter(env_filter_str: &str) -> Result<EnvFilter, LoggerError> {
    EnvFilter::from_str(env_filter_str).map_err(|err| LoggerError::LoggerConfigurationError {
        message: format!("Cannot parse the logger level: [{}]. err: {:?}", env_filter_str, err),
    })
}

fn path_to_dir_and_filename(full_path: &str) -> Result<(String, String), LoggerError> {
    let full_path = full_path.replace('\\', "/");
    if let Some(last_separator_index) = full_path.rfind('/') {
        Ok((
            full_path[0..last_separator_index + 1].to_owned(),
            full_path[last_separator_index + 1..full_path.len()].to_owned(),
        ))
    } else {
        Err(LoggerError::LoggerConfigurationError {
            message: format!("Output file format [{}] is wrong", full_path),
        })
    }
}

fn set_global_logger<S>(subscriber: S) -> Result<(), LoggerError>
where
    S: Subscriber + Send + Sync + 'static,
{
    tracing_log::LogTracer::init().map_err(|err| LoggerError::LoggerConfigurationError {
        message: format!("Cannot start the logger LogTracer. err: {:?}", err),
    })?;
    set_global_default(subscriber).map_err(|err| LoggerError::LoggerConfigurationError {
        message: format!("Cannot start the logger. err: {:?}", err),
    })
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn should_split_the_file_path() {
        assert_eq!(
            ("/tmp/hello/".to_owned(), "filename".to_owned()),
            path_to_dir_and_filename("/tmp/hello/filename").unwrap()
        );
        assert_eq!(
            ("/".to_owned(), "log_output.log".to_owned()),
            path_to_dir_and_filename("/log_output.log").unwrap()
        );
        assert_eq!(
            (
                "/var/log/mixpanel_agent/".to_owned(),
                "mixpanel_agent.log".to_owned()
            ),
            path_to_dir_and_filename("/var/log/mixpanel_agent/mixpanel_agent.log").unwrap()
        );
        assert_eq!(
            ("/tmp/hello/".to_owned(), "filename".to_owned()),
            path_to_dir_and_filename(r#"/tmp\hello/filename"#).unwrap()
        );
        assert_eq!(
            ("c:/windows/some/".to_owned(), "filename.txt".to_owned()),
            path_to_dir_and_filename(r#"c:\windows\some\filename.txt"#).unwrap()
        );
    }

    #[test]
    fn split_the_file_path_should_fail_if_directory_is_not_present() {
        assert!(path_to_dir_and_filename("filename").is_err());
    }

    #[test]
    fn should_reject_an_invalid_level() {
        assert!(parse_env_filter("info,my_crate=notalevel").is_err());
    }

    #[test]
    fn default_config_should_log_info_to_stderr() {
        let config = LoggerConfig::default();
        assert_eq!("info", config.level);
        assert!(config.stderr_output);
        assert!(config.file_output_path.is_none());
    }
}
