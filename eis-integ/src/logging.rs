//! Process-wide log setup: `LEVEL - message` lines to the console and a file.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{Event, Level, Subscriber};
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// Default log file shared by all EIS integration tools.
pub const DEFAULT_LOG_PATH: &str = "/var/log/eis_integ.log";

/// Errors that can occur while installing the logger.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("log file path has no file name: {}", .0.display())]
    InvalidPath(PathBuf),

    #[error("failed to open log file: {0}")]
    InitAppender(#[from] InitError),

    #[error("failed to install global subscriber: {0}")]
    SetGlobalDefault(#[from] TryInitError),
}

/// Where and how verbosely to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub path: PathBuf,
    pub level: Level,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_LOG_PATH),
            level: Level::DEBUG,
        }
    }
}

/// Proof that logging has been configured for this process.
///
/// Created once at startup and held until exit.
#[derive(Debug)]
#[must_use]
pub struct LogHandle {
    path: PathBuf,
    level: Level,
}

impl LogHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn level(&self) -> Level {
        self.level
    }
}

/// Renders events as `LEVEL - message`, without timestamps or targets.
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelPrefixFormat;

impl<S, N> FormatEvent<S, N> for LevelPrefixFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(writer, "{} - ", event.metadata().level())?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Installs the global logger. Writes go to stderr and, synchronously, to
/// the configured file, which is appended to and never rotated.
pub fn init_logging(config: &LogConfig) -> Result<LogHandle, LoggingError> {
    let file_name = config
        .path
        .file_name()
        .ok_or_else(|| LoggingError::InvalidPath(config.path.clone()))?
        .to_string_lossy()
        .into_owned();
    let directory = match config.path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(directory)?;

    tracing_subscriber::registry()
        .with(LevelFilter::from_level(config.level))
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(LevelPrefixFormat)
                .with_ansi(false)
                .with_writer(std::io::stderr),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(LevelPrefixFormat)
                .with_ansi(false)
                .with_writer(file_appender),
        )
        .try_init()?;

    Ok(LogHandle {
        path: config.path.clone(),
        level: config.level,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn lines_are_level_dash_message() {
        let buffer = Buffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::registry().with(
            tracing_subscriber::fmt::layer()
                .event_format(LevelPrefixFormat)
                .with_ansi(false)
                .with_writer(move || writer.clone()),
        );

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("User {} has been created.", "camera1");
            tracing::error!("Variable ETCDCTL_KEY is not set");
        });

        let text = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert_eq!(
            text,
            "INFO - User camera1 has been created.\nERROR - Variable ETCDCTL_KEY is not set\n"
        );
    }

    #[test]
    fn default_config_is_debug_to_var_log() {
        let config = LogConfig::default();
        assert_eq!(config.path, PathBuf::from("/var/log/eis_integ.log"));
        assert_eq!(config.level, Level::DEBUG);
    }

    #[test]
    fn path_without_file_name_is_rejected() {
        let config = LogConfig {
            path: PathBuf::from("/"),
            level: Level::INFO,
        };
        assert!(matches!(
            init_logging(&config),
            Err(LoggingError::InvalidPath(_))
        ));
    }
}
