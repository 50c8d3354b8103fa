//! ASCII log writer
//!
//! Batch writer producing delimiter-separated text logs, TSV, or JSON
//! lines, optionally gzip-compressed. This is the reference plugin for the
//! batching contract: records are cached by the framework and arrive here
//! as whole batches.
//!
//! # Output
//!
//! In the default mode every file opens with meta lines
//! (`#separator`, `#writer`, ..., `#fields`, `#types`) and closes with a
//! `#close` timestamp. TSV mode reduces the header to a single
//! field-names line; JSON mode writes no header at all. A record line
//! that would itself begin with the meta prefix gets its first byte
//! hex-escaped so header parsers cannot be confused.
//!
//! # Rotation
//!
//! On rotation the current file is closed, renamed to
//! `<rotated_path>.<ext>[.<gz-ext>]`, reported for post-processing, and a
//! fresh live file is opened in its place. Special paths (under `/dev/`)
//! are never rotated.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;

use chrono::{Local, TimeZone};
use flate2::write::GzEncoder;
use flate2::Compression;

use vigil_logging::{
    BackendCore, BatchWriter, Result, WriteErrorInfo, WriterError, WriterPlugin,
    NOT_WRITTEN_DESCRIPTION,
};
use vigil_record::LogRecord;

use crate::format::ascii::escaped;
use crate::format::{AsciiFormatter, JsonFormatter, LogFormatter, SeparatorInfo, TimeFormat};

/// Environment variable overriding the log file extension
pub const LOG_SUFFIX_ENV: &str = "VIGIL_LOG_SUFFIX";

/// The open output stream, plain or gzip-wrapped
enum LogStream {
    Plain(File),
    Gzip(GzEncoder<File>),
}

impl LogStream {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        match self {
            Self::Plain(file) => file.write_all(data),
            Self::Gzip(encoder) => encoder.write_all(data),
        }
    }
}

/// Options resolved from defaults and per-writer config at init
struct Options {
    output_to_stdout: bool,
    include_meta: bool,
    tsv: bool,
    use_json: bool,
    enable_utf_8: bool,
    separator: String,
    set_separator: String,
    empty_field: String,
    unset_field: String,
    meta_prefix: String,
    gzip_level: u32,
    gzip_file_extension: String,
    json_timestamps: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            output_to_stdout: false,
            include_meta: true,
            tsv: false,
            use_json: false,
            enable_utf_8: false,
            separator: "\t".to_string(),
            set_separator: ",".to_string(),
            empty_field: "(empty)".to_string(),
            unset_field: "-".to_string(),
            meta_prefix: "#".to_string(),
            gzip_level: 0,
            gzip_file_extension: "gz".to_string(),
            json_timestamps: "JSON::TS_EPOCH".to_string(),
        }
    }
}

/// Delimiter-separated ASCII/TSV/JSON writer with optional gzip
pub struct AsciiWriter {
    stream: Option<LogStream>,

    /// Resolved output filename, extension included
    fname: String,

    /// Path value after the stdout override, used for the `#path` line
    stream_path: String,

    opts: Options,
    formatter: Option<Box<dyn LogFormatter>>,
    done: bool,
}

impl AsciiWriter {
    /// Create an uninitialized writer; options resolve at `do_init`
    pub fn new() -> Self {
        Self {
            stream: None,
            fname: String::new(),
            stream_path: String::new(),
            opts: Options::default(),
            formatter: None,
            done: false,
        }
    }

    /// The resolved output filename (empty before init)
    pub fn file_name(&self) -> &str {
        &self.fname
    }

    /// Log file extension: `VIGIL_LOG_SUFFIX` or `log`
    fn log_ext() -> String {
        std::env::var(LOG_SUFFIX_ENV).unwrap_or_else(|_| "log".to_string())
    }

    /// Paths under `/dev/` are used verbatim and never rotated
    fn is_special(path: &str) -> bool {
        path.starts_with("/dev/")
    }

    /// Apply per-writer config entries over the built-in defaults
    fn apply_config(&mut self, core: &BackendCore) -> Result<()> {
        let prefix = format!("{}:", core.backend_name());

        for (raw_key, value) in core.info().config.iter() {
            let key = raw_key.strip_prefix(prefix.as_str()).unwrap_or(raw_key);
            match key {
                "tsv" => self.opts.tsv = parse_bool("tsv", value)?,
                "use_json" => self.opts.use_json = parse_bool("use_json", value)?,
                "enable_utf_8" => self.opts.enable_utf_8 = parse_bool("enable_utf_8", value)?,
                "output_to_stdout" => {
                    self.opts.output_to_stdout = parse_bool("output_to_stdout", value)?;
                }
                "gzip_level" => {
                    let level = value.parse::<i64>().unwrap_or(-1);
                    if !(0..=9).contains(&level) {
                        return Err(WriterError::config(
                            "invalid value for 'gzip_level', must be a number between 0 and 9",
                        ));
                    }
                    self.opts.gzip_level = level as u32;
                }
                "separator" => self.opts.separator = value.to_string(),
                "set_separator" => self.opts.set_separator = value.to_string(),
                "empty_field" => self.opts.empty_field = value.to_string(),
                "unset_field" => self.opts.unset_field = value.to_string(),
                "meta_prefix" => self.opts.meta_prefix = value.to_string(),
                "json_timestamps" => self.opts.json_timestamps = value.to_string(),
                "gzip_file_extension" => self.opts.gzip_file_extension = value.to_string(),
                _ => {}
            }
        }
        Ok(())
    }

    /// Build the cached formatter from the resolved options
    fn init_formatter(&mut self) -> Result<()> {
        if self.opts.use_json {
            let timestamps = TimeFormat::from_config(&self.opts.json_timestamps).ok_or_else(|| {
                WriterError::config(format!(
                    "invalid JSON timestamp format: {}",
                    self.opts.json_timestamps
                ))
            })?;
            self.formatter = Some(Box::new(JsonFormatter::new(timestamps)));
            // JSON output carries its field names; no meta header.
            self.opts.include_meta = false;
        } else {
            let sep = SeparatorInfo {
                separator: self.opts.separator.clone(),
                set_separator: self.opts.set_separator.clone(),
                unset_field: self.opts.unset_field.clone(),
                empty_field: self.opts.empty_field.clone(),
            };
            self.formatter = Some(Box::new(AsciiFormatter::new(sep, self.opts.enable_utf_8)));
        }
        Ok(())
    }

    /// Open the output file (create + truncate, mode 0666) and write the
    /// header
    fn open_file(&mut self, core: &BackendCore) -> io::Result<()> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o666)
            .open(&self.fname)?;

        let stream = if self.opts.gzip_level > 0 {
            LogStream::Gzip(GzEncoder::new(
                file,
                Compression::new(self.opts.gzip_level),
            ))
        } else {
            LogStream::Plain(file)
        };
        self.stream = Some(stream);

        self.write_header(core)
    }

    fn write_header(&mut self, core: &BackendCore) -> io::Result<()> {
        if !self.opts.include_meta {
            return Ok(());
        }

        let mut names = String::new();
        let mut types = String::new();
        for (i, field) in core.fields().iter().enumerate() {
            if i > 0 {
                names.push_str(&self.opts.separator);
                types.push_str(&self.opts.separator);
            }
            names.push_str(&field.name);
            types.push_str(&field.type_name());
        }

        if self.opts.tsv {
            // A single TSV-style line is all we need.
            return self.write_bytes(format!("{names}\n").as_bytes());
        }

        // The separator line always uses a space before its value.
        let line = format!(
            "{}separator {}\n",
            self.opts.meta_prefix,
            escaped(&self.opts.separator)
        );
        self.write_bytes(line.as_bytes())?;

        let backend_name = core.backend_name().to_string();
        self.write_meta_line("writer", &backend_name)?;
        self.write_meta_line("set_separator", &escaped(&self.opts.set_separator))?;
        self.write_meta_line("empty_field", &escaped(&self.opts.empty_field))?;
        self.write_meta_line("unset_field", &escaped(&self.opts.unset_field))?;
        self.write_meta_line("path", &escaped(&self.stream_path))?;
        self.write_meta_line("open", &timestamp(0.0))?;
        self.write_meta_line("fields", &names)?;
        self.write_meta_line("types", &types)?;
        Ok(())
    }

    fn write_meta_line(&mut self, key: &str, value: &str) -> io::Result<()> {
        let line = format!(
            "{}{}{}{}\n",
            self.opts.meta_prefix, key, self.opts.separator, value
        );
        self.write_bytes(line.as_bytes())
    }

    /// Write one formatted record line, escaping a leading meta prefix
    fn write_record_line(&mut self, line: &[u8]) -> io::Result<()> {
        let prefix = self.opts.meta_prefix.as_bytes();
        if !prefix.is_empty() && line.starts_with(prefix) {
            let hex = format!("\\x{:02x}", line[0]);
            self.write_bytes(hex.as_bytes())?;
            return self.write_bytes(&line[1..]);
        }
        self.write_bytes(line)
    }

    fn write_bytes(&mut self, data: &[u8]) -> io::Result<()> {
        match &mut self.stream {
            Some(stream) => stream.write_all(data),
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "log file not open")),
        }
    }

    /// Flush buffered output and push it to disk
    fn sync(&mut self) -> io::Result<()> {
        match &mut self.stream {
            Some(LogStream::Plain(file)) => {
                file.flush()?;
                // fsync fails on special files such as /dev/stdout.
                let _ = file.sync_all();
                Ok(())
            }
            Some(LogStream::Gzip(encoder)) => {
                encoder.flush()?;
                let _ = encoder.get_ref().sync_all();
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Write the close meta line and shut the stream down
    fn close_file(&mut self, t: f64) -> io::Result<()> {
        if self.stream.is_none() {
            return Ok(());
        }

        if self.opts.include_meta && !self.opts.tsv {
            self.write_meta_line("close", &timestamp(t))?;
        }

        match self.stream.take() {
            Some(LogStream::Plain(mut file)) => file.flush(),
            Some(LogStream::Gzip(encoder)) => encoder.finish().map(|_| ()),
            None => Ok(()),
        }
    }

    /// Rotated-file name: `<rotated_path>.<ext>[.<gz-ext>]`
    fn suffixed_name(&self, stem: &str) -> String {
        let mut name = format!("{}.{}", stem, Self::log_ext());
        if self.opts.gzip_level > 0 {
            name.push('.');
            name.push_str(&self.opts.gzip_file_extension);
        }
        name
    }
}

impl Default for AsciiWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Header/rotation timestamp: local time, `%Y-%m-%d-%H-%M-%S`
///
/// A zero timestamp means "now".
fn timestamp(t: f64) -> String {
    let dt = if t > 0.0 {
        Local
            .timestamp_opt(t as i64, 0)
            .single()
            .unwrap_or_else(Local::now)
    } else {
        Local::now()
    };
    dt.format("%Y-%m-%d-%H-%M-%S").to_string()
}

/// Booleans are configured as the strings `T` and `F`
fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value {
        "T" => Ok(true),
        "F" => Ok(false),
        _ => Err(WriterError::config(format!(
            "invalid value for '{key}', must be a string and either \"T\" or \"F\""
        ))),
    }
}

impl WriterPlugin for AsciiWriter {
    fn do_init(&mut self, core: &mut BackendCore) -> Result<()> {
        self.apply_config(core)?;
        self.init_formatter()?;

        let mut path = core.info().path.clone();
        if self.opts.output_to_stdout {
            path = "/dev/stdout".to_string();
        }

        self.fname = if Self::is_special(&path) {
            path.clone()
        } else {
            self.suffixed_name(&path)
        };
        self.stream_path = path;

        self.open_file(core)
            .map_err(|e| WriterError::init(format!("cannot open {}: {e}", self.fname)))
    }

    fn do_flush(&mut self, _core: &mut BackendCore, _network_time: f64) -> Result<()> {
        self.sync()
            .map_err(|e| WriterError::Flush(format!("error flushing {}: {e}", self.fname)))
    }

    fn do_rotate(
        &mut self,
        core: &mut BackendCore,
        rotated_path: &str,
        open: f64,
        close: f64,
        terminating: bool,
    ) -> Result<()> {
        // Don't rotate special files or when nothing is open.
        if self.stream.is_none() || Self::is_special(&self.stream_path) {
            core.finished_rotation_aborted();
            return Ok(());
        }

        self.close_file(close)
            .map_err(|e| WriterError::rotate(format!("error closing {}: {e}", self.fname)))?;

        let new_name = self.suffixed_name(rotated_path);
        if let Err(e) = fs::rename(&self.fname, &new_name) {
            tracing::error!(
                writer = %core.full_name(),
                from = %self.fname,
                to = %new_name,
                error = %e,
                "rename failed during rotation"
            );
            core.finished_rotation_aborted();
            return Err(WriterError::rotate(format!(
                "failed to rename {} to {new_name}: {e}",
                self.fname
            )));
        }

        core.finished_rotation(new_name, self.fname.clone(), open, close, terminating);

        // A fresh live file takes the rotated one's place.
        self.open_file(core)
            .map_err(|e| WriterError::rotate(format!("cannot reopen {}: {e}", self.fname)))
    }

    fn do_finish(&mut self, _core: &mut BackendCore, network_time: f64) -> Result<()> {
        if self.done {
            return Err(WriterError::Internal("duplicate finish".to_string()));
        }
        self.done = true;

        let _ = self.sync();
        self.close_file(network_time)
            .map_err(|e| WriterError::Flush(format!("error closing {}: {e}", self.fname)))
    }
}

impl BatchWriter for AsciiWriter {
    fn write_batch(&mut self, core: &mut BackendCore, records: &[LogRecord]) -> Vec<WriteErrorInfo> {
        let total = records.len();
        let mut errors = Vec::new();

        // Rotation may have failed mid-way; reopen on demand.
        if self.stream.is_none() {
            if let Err(e) = self.open_file(core) {
                errors.push(WriteErrorInfo::new(
                    0,
                    total,
                    format!("cannot open {}: {e}", self.fname),
                    true,
                ));
                return errors;
            }
        }

        let mut line = String::with_capacity(512);
        for (i, record) in records.iter().enumerate() {
            line.clear();
            let formatter = self.formatter.as_ref().expect("formatter set at init");
            if let Err(e) = formatter.format(core.fields(), record, &mut line) {
                errors.push(WriteErrorInfo::new(i, 1, e.to_string(), false));
                continue;
            }
            line.push('\n');

            if let Err(e) = self.write_record_line(line.as_bytes()) {
                errors.push(WriteErrorInfo::new(
                    i,
                    1,
                    format!("error writing to {}: {e}", self.fname),
                    true,
                ));
                let next = i + 1;
                if next < total {
                    errors.push(WriteErrorInfo::new(
                        next,
                        total - next,
                        NOT_WRITTEN_DESCRIPTION,
                        false,
                    ));
                }
                break;
            }
        }

        if !core.is_buf() {
            if let Err(e) = self.sync() {
                tracing::warn!(writer = %core.full_name(), error = %e, "fsync failed");
            }
        }

        errors
    }
}

#[cfg(test)]
#[path = "ascii_test.rs"]
mod ascii_test;
