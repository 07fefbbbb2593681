//! Logger utility for application-wide logging
//!
//! Implements `log::Log` so the usual macros reach both the console and a
//! log file. Commands also hold a `Logger` of their own to append run
//! summaries to the same file.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;
use log::{Log, Record, Level, Metadata, LevelFilter};

/// Console and file logger
pub struct Logger {
    /// File handle for log output
    file: Mutex<Option<File>>,
    level: Level,
}

impl Logger {
    /// Creates a logger that truncates `log_file`
    ///
    /// # Arguments
    ///
    /// * `log_file` - Path to the log file
    ///
    /// # Returns
    ///
    /// A new Logger instance or an error if the file cannot be created
    pub fn new(log_file: &str) -> io::Result<Self> {
        let file = File::create(Path::new(log_file))?;
        Ok(Logger {
            file: Mutex::new(Some(file)),
            level: Level::Debug,
        })
    }

    /// Creates a logger that appends to `log_file`
    pub fn append(log_file: &str) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(Path::new(log_file))?;
        Ok(Logger {
            file: Mutex::new(Some(file)),
            level: Level::Debug,
        })
    }

    /// Logs a message to the log file
    ///
    /// # Arguments
    ///
    /// * `message` - The message to log
    pub fn log(&self, message: &str) -> io::Result<()> {
        let mut guard = self.file.lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))?;
        if let Some(file) = guard.as_mut() {
            writeln!(file, "{}", message)?;
            file.flush()?;
        }
        Ok(())
    }

    /// Writes a titled block of `key: value` lines
    pub fn log_summary(&self, title: &str, fields: &[(&str, String)]) -> io::Result<()> {
        self.log(&format!("{}:", title))?;
        for (key, value) in fields {
            self.log(&format!("  {}: {}", key, value))?;
        }
        Ok(())
    }

    /// Installs a file logger as the global `log` backend
    ///
    /// `verbose` lowers the console and file threshold from Info to Debug.
    pub fn init_global_logger(log_file: &str, verbose: bool) -> io::Result<()> {
        let mut global_logger = Logger::append(log_file)?;
        let filter = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
        global_logger.level = if verbose { Level::Debug } else { Level::Info };

        if log::set_boxed_logger(Box::new(global_logger)).is_err() {
            eprintln!("Warning: Global logger was already initialized");
        }

        log::set_max_level(filter);
        Ok(())
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let message = format!("[{}] {}", record.level(), record.args());
            let _ = Logger::log(self, &message);

            if record.level() <= Level::Warn {
                eprintln!("{}", message);
            } else {
                println!("{}", message);
            }
        }
    }

    fn flush(&self) {
        // Already flushing in the log method
    }
}
