/// File persistence for log lines
///
/// One plain-text file per day (`scanboard_YYYY-MM-DD.log`) in the configured
/// logs directory. The file is switched on the first line written after
/// midnight. Writes are buffered; [`flush_file_logging`] drains the buffer on
/// shutdown.
use chrono::{Local, NaiveDate};
use once_cell::sync::Lazy;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::config::get_logger_config;

struct DailyLog {
    directory: PathBuf,
    date: NaiveDate,
    writer: BufWriter<File>,
}

impl DailyLog {
    fn open(directory: &Path, date: NaiveDate) -> std::io::Result<Self> {
        fs::create_dir_all(directory)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path(directory, date))?;
        Ok(Self {
            directory: directory.to_path_buf(),
            date,
            writer: BufWriter::new(file),
        })
    }

    /// Switch to the file for `today` when the date changed
    fn roll_to(&mut self, today: NaiveDate) -> std::io::Result<()> {
        if today == self.date {
            return Ok(());
        }
        self.writer.flush()?;
        *self = Self::open(&self.directory, today)?;
        Ok(())
    }
}

static LOG_FILE: Lazy<Mutex<Option<DailyLog>>> = Lazy::new(|| Mutex::new(None));

fn log_path(directory: &Path, date: NaiveDate) -> PathBuf {
    directory.join(format!("scanboard_{}.log", date.format("%Y-%m-%d")))
}

/// Open today's log file if file logging is enabled
pub fn init_file_logging() {
    let config = get_logger_config();
    if !config.file_enabled {
        return;
    }

    let today = Local::now().date_naive();
    match DailyLog::open(&config.directory, today) {
        Ok(log) => {
            if let Ok(mut guard) = LOG_FILE.lock() {
                *guard = Some(log);
            }
        }
        Err(e) => {
            eprintln!(
                "Failed to open log file {}: {}",
                log_path(&config.directory, today).display(),
                e
            );
        }
    }
}

/// Append one line to the log file (no-op when file logging is off)
pub fn write_to_file(line: &str) {
    if let Ok(mut guard) = LOG_FILE.lock() {
        if let Some(log) = guard.as_mut() {
            if let Err(e) = log.roll_to(Local::now().date_naive()) {
                eprintln!("Failed to roll log file: {}", e);
                *guard = None;
                return;
            }
            let _ = writeln!(log.writer, "{}", line);
        }
    }
}

/// Flush buffered lines to disk
pub fn flush_file_logging() {
    if let Ok(mut guard) = LOG_FILE.lock() {
        if let Some(log) = guard.as_mut() {
            let _ = log.writer.flush();
        }
    }
}
