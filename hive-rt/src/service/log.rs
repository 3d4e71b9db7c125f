//! Per-service message log files (the LOGON/LOGOFF command surface).

// Layer 1: Standard library imports
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

// Layer 2: Third-party crate imports
use chrono::Utc;

// Layer 3: Internal module imports
use crate::message::Message;

/// An open log file recording every message dispatched to one service.
pub(crate) struct LogSink {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl LogSink {
    /// Open (or append to) `<dir>/<handle-hex>.log`.
    pub(crate) fn open(dir: &Path, handle_raw: u32) -> io::Result<Self> {
        let path = dir.join(format!("{handle_raw:08x}.log"));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "open time: {}", Utc::now().format("%Y-%m-%d %H:%M:%S"))?;
        Ok(LogSink { writer, path })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Record one dispatched message: header fields, then the payload as
    /// hex. Write failures are swallowed; logging never fails dispatch.
    pub(crate) fn record(&mut self, message: &Message) {
        let header = format!(
            "{} {} session:{} type:{} size:{}",
            Utc::now().timestamp_micros(),
            message.source,
            message.session,
            message.kind,
            message.size(),
        );
        let _ = write!(self.writer, "{header}\t");
        if let Some(payload) = &message.payload {
            for byte in payload.iter() {
                let _ = write!(self.writer, "{byte:02x}");
            }
        }
        let _ = writeln!(self.writer);
        let _ = self.writer.flush();
    }
}

impl Drop for LogSink {
    fn drop(&mut self) {
        let _ = writeln!(
            self.writer,
            "close time: {}",
            Utc::now().format("%Y-%m-%d %H:%M:%S")
        );
        let _ = self.writer.flush();
    }
}
