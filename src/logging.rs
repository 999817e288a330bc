//! Structured logging utilities for mountkeeper
//!
//! This module provides consistent logging patterns across the codebase.
//! All logs use structured fields for easy parsing and analysis.
//!
//! # Log Format Conventions
//!
//! - `operation`: The operation being performed (e.g., "storage.create", "admin.set_password")
//! - `status`: The result status ("success", "error", "not_found")
//! - `mount_path`: External mount path of a storage
//! - `storage_id`: Registry-assigned storage identifier
//! - `username`: Account the operation acted on
//!
//! # Examples
//!
//! ```rust
//! use tracing::info;
//!
//! info!(
//!     operation = "storage.create",
//!     status = "success",
//!     mount_path = "/local",
//!     storage_id = 1,
//!     "mounted local storage"
//! );
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::fmt as std_fmt;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriter};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{
    fmt::{self, format::Writer},
    prelude::*,
    EnvFilter, Layer, Registry,
};

use crate::config::ProcessFlags;

/// Upper bound of the in-memory log buffer, in bytes
pub const LOG_BUFFER_CAPACITY: usize = 500_000;

const LOG_BUFFER_TRUNCATED: &str = "... [older log lines dropped] ...\n";

/// Custom formatter that shows "mountkeeper" instead of full module path
struct MountkeeperFormatter {
    with_ansi: bool,
}

impl<S, N> FormatEvent<S, N> for MountkeeperFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std_fmt::Result {
        let meta = event.metadata();

        write!(writer, "{} ", format_timestamp(Utc::now()))?;

        if self.with_ansi {
            let level_style = match *meta.level() {
                tracing::Level::ERROR => "\x1b[31m", // Red
                tracing::Level::WARN => "\x1b[33m",  // Yellow
                tracing::Level::INFO => "\x1b[32m",  // Green
                tracing::Level::DEBUG => "\x1b[34m", // Blue
                tracing::Level::TRACE => "\x1b[35m", // Magenta
            };
            write!(
                writer,
                "{}{:5}(mountkeeper)\x1b[0m: ",
                level_style,
                meta.level()
            )?;
        } else {
            write!(writer, "{:5}(mountkeeper): ", meta.level())?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

/// UTC timestamp with microseconds, as printed at the start of each line
fn format_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format (default for development)
    Pretty,
    /// Compact format (for CI/production)
    Compact,
    /// JSON format (for log aggregation systems)
    Json,
}

impl LogFormat {
    /// Parse from environment variable (MOUNTKEEPER_LOG_FORMAT)
    pub fn from_env() -> Self {
        Self::parse(
            &std::env::var("MOUNTKEEPER_LOG_FORMAT").unwrap_or_default(),
            std::env::var("CI").is_ok(),
        )
    }

    fn parse(value: &str, ci: bool) -> Self {
        match value.to_lowercase().as_str() {
            "json" => Self::Json,
            "compact" => Self::Compact,
            "pretty" => Self::Pretty,
            _ => {
                if ci {
                    Self::Compact
                } else {
                    Self::Pretty
                }
            }
        }
    }
}

/// Bounded in-memory copy of the log output
///
/// Embedders read it to show recent logs without touching the log file.
/// When an append would exceed the capacity, only the newest 80% is kept and
/// a truncation marker is put in front.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    inner: Arc<Mutex<String>>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::with_capacity(LOG_BUFFER_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(String::new())),
            capacity,
        }
    }

    pub fn append(&self, text: &str) {
        let mut buffer = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        buffer.push_str(text);

        if buffer.len() > self.capacity {
            let keep = (self.capacity * 4 / 5).saturating_sub(LOG_BUFFER_TRUNCATED.len());
            let mut cut = buffer.len() - keep;
            while !buffer.is_char_boundary(cut) {
                cut += 1;
            }
            buffer.replace_range(..cut, LOG_BUFFER_TRUNCATED);
        }
    }

    pub fn contents(&self) -> String {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Writer handed out by [`LogBuffer`] for each log event
pub struct LogBufferWriter {
    buffer: LogBuffer,
}

impl Write for LogBufferWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.append(&String::from_utf8_lossy(buf));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBufferWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogBufferWriter {
            buffer: self.clone(),
        }
    }
}

fn default_directive(flags: &ProcessFlags) -> &'static str {
    if flags.debug {
        "debug"
    } else {
        "info"
    }
}

fn output_layer(
    format: LogFormat,
    writer: BoxMakeWriter,
    with_ansi: bool,
) -> Box<dyn Layer<Registry> + Send + Sync> {
    match format {
        LogFormat::Pretty => fmt::layer()
            .event_format(MountkeeperFormatter { with_ansi })
            .with_writer(writer)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .event_format(MountkeeperFormatter { with_ansi: false })
            .with_writer(writer)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
            .with_ansi(false)
            .with_writer(writer)
            .json()
            .boxed(),
    }
}

/// Initialize the global tracing subscriber from the process flags
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (overrides the `debug` flag)
/// - `MOUNTKEEPER_LOG_FORMAT`: Set format ("pretty", "compact", "json")
/// - `CI`: If set, defaults to compact format
///
/// Output goes to stdout when `log_std` is set, otherwise it is appended to
/// `<data_dir>/log/mountkeeper.log`. Every event is also copied into the
/// returned [`LogBuffer`]. Calling this twice keeps the first subscriber.
pub fn init(flags: &ProcessFlags) -> Result<LogBuffer> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(default_directive(flags)),
    };

    let format = LogFormat::from_env();

    let (writer, with_ansi) = if flags.log_std {
        (BoxMakeWriter::new(io::stdout), true)
    } else {
        let log_file = flags.log_file();
        if let Some(parent) = log_file.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create log directory: {}", parent.display())
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .with_context(|| format!("Failed to open log file: {}", log_file.display()))?;
        (BoxMakeWriter::new(Mutex::new(file)), false)
    };

    let buffer = LogBuffer::new();
    let layers = vec![
        output_layer(format, writer, with_ansi),
        fmt::layer()
            .event_format(MountkeeperFormatter { with_ansi: false })
            .with_writer(buffer.clone())
            .boxed(),
    ];

    if tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .is_err()
    {
        tracing::debug!("Global subscriber already installed, keeping it");
    }

    Ok(buffer)
}

/// Operation names for consistent logging
pub mod operations {
    pub const STORAGE_CREATE: &str = "storage.create";
    pub const STORAGE_COUNT: &str = "storage.count";
    pub const ADMIN_GET: &str = "admin.get";
    pub const ADMIN_SET_PASSWORD: &str = "admin.set_password";
    pub const CACHE_INVALIDATE: &str = "cache.invalidate";
    pub const BOOTSTRAP: &str = "bootstrap";
}

/// Status values for consistent logging
pub mod status {
    pub const SUCCESS: &str = "success";
    pub const ERROR: &str = "error";
    pub const NOT_FOUND: &str = "not_found";
    pub const SKIPPED: &str = "skipped";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_is_utc() {
        use chrono::TimeZone;

        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(format_timestamp(at), "2024-01-02T03:04:05.000000Z");

        let parsed = DateTime::parse_from_rfc3339(&format_timestamp(Utc::now())).unwrap();
        assert_eq!(parsed.offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json", false), LogFormat::Json);
        assert_eq!(LogFormat::parse("COMPACT", false), LogFormat::Compact);
        assert_eq!(LogFormat::parse("", false), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("", true), LogFormat::Compact);
    }

    #[test]
    fn test_default_directive_follows_debug_flag() {
        let flags = ProcessFlags::default();
        assert_eq!(default_directive(&flags), "info");
        assert_eq!(default_directive(&flags.with_debug(true)), "debug");
    }

    #[test]
    fn test_log_buffer_keeps_newest_output() {
        let buffer = LogBuffer::with_capacity(100);
        for i in 0..30 {
            buffer.append(&format!("line {:02}\n", i));
        }

        let contents = buffer.contents();
        assert!(contents.starts_with(LOG_BUFFER_TRUNCATED));
        assert!(contents.ends_with("line 29\n"));
        assert!(!contents.contains("line 00"));
        assert!(buffer.len() <= 100);
    }

    #[test]
    fn test_log_buffer_writer_and_clear() {
        let buffer = LogBuffer::new();
        let mut writer = buffer.make_writer();
        writer.write_all(b"hello").unwrap();
        assert_eq!(buffer.contents(), "hello");

        buffer.clear();
        assert!(buffer.is_empty());
    }
}
