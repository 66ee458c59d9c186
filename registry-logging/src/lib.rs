//! Tracing subscriber setup shared by the registry binaries.
//!
//! Everything is driven by environment variables so the same binary can log
//! human-readable output on a laptop and JSON lines inside a container:
//!
//! - `RUST_LOG` / `LOG_LEVEL`: filter directives (`RUST_LOG` wins, default `info`)
//! - `LOG_FORMAT`: `human` (default) or `json`
//! - `LOG_OUTPUT`: `console` (default), `file` or `both`
//! - `LOG_FILE_PATH`: log file for the `file`/`both` outputs, rotated daily

use std::{
    env,
    path::{Path, PathBuf},
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::Directive,
    fmt::writer::{BoxMakeWriter, MakeWriterExt},
    prelude::*,
    registry, EnvFilter,
};

const DEFAULT_LOG_FILE: &str = "/tmp/registry-server.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Human,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Console,
    File,
    Both,
}

/// Resolved logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
    pub format: LogFormat,
    pub output: LogOutput,
    pub file_path: PathBuf,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Human,
            output: LogOutput::Console,
            file_path: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

impl LogSettings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup. Unknown values fall back
    /// to the defaults instead of failing startup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Human,
        };

        let output = match lookup("LOG_OUTPUT").as_deref().map(str::trim) {
            Some("file") => LogOutput::File,
            Some("both") => LogOutput::Both,
            _ => LogOutput::Console,
        };

        Self {
            level: lookup("LOG_LEVEL")
                .filter(|level| !level.trim().is_empty())
                .unwrap_or(defaults.level),
            format,
            output,
            file_path: lookup("LOG_FILE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.file_path),
        }
    }
}

/// Initializes the global tracing subscriber from the environment.
///
/// The returned guard must be kept alive for as long as file logging should
/// flush; dropping it stops the background writer.
pub fn init_subscriber() -> Option<WorkerGuard> {
    init_with(&LogSettings::from_env())
}

/// Initializes the global tracing subscriber with explicit settings.
///
/// Calling this twice is harmless: the second subscriber is discarded.
pub fn init_with(settings: &LogSettings) -> Option<WorkerGuard> {
    let mut env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));
    for noisy in ["hyper=warn", "reqwest=warn", "tokio=warn"] {
        if let Ok(directive) = noisy.parse::<Directive>() {
            env_filter = env_filter.add_directive(directive);
        }
    }

    let (writer, guard) = make_writer(settings);
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(true);

    let subscriber = registry().with(env_filter);
    let _ = match settings.format {
        LogFormat::Json => subscriber.with(fmt_layer.json()).try_init(),
        LogFormat::Human => subscriber.with(fmt_layer).try_init(),
    };

    guard
}

fn make_writer(settings: &LogSettings) -> (BoxMakeWriter, Option<WorkerGuard>) {
    if settings.output == LogOutput::Console {
        return (BoxMakeWriter::new(std::io::stdout), None);
    }

    let log_dir = settings
        .file_path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("/tmp"));
    let log_filename = settings
        .file_path
        .file_name()
        .unwrap_or("registry-server.log".as_ref());

    let file_appender = tracing_appender::rolling::daily(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let writer = match settings.output {
        LogOutput::Both => BoxMakeWriter::new(std::io::stdout.and(non_blocking)),
        _ => BoxMakeWriter::new(non_blocking),
    };

    (writer, Some(guard))
}
