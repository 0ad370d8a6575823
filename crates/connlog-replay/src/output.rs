//! Delivered Record Output

use connlog::{LogRecord, LogSink};
use parking_lot::Mutex;
use std::io::Write;
use std::str::FromStr;
use tracing::warn;

/// Encoding for delivered records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// Postcard frames, each preceded by its length as a little-endian u32
    Postcard,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(OutputFormat::Json),
            "postcard" => Ok(OutputFormat::Postcard),
            other => Err(format!("unknown output format: {}", other)),
        }
    }
}

/// Sink writing each delivered record to `W`
pub struct RecordWriter<W> {
    out: Mutex<W>,
    format: OutputFormat,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self {
            out: Mutex::new(out),
            format,
        }
    }

    fn write_record(out: &mut W, format: OutputFormat, record: &LogRecord) -> std::io::Result<()> {
        match format {
            OutputFormat::Json => {
                serde_json::to_writer(&mut *out, record)?;
                out.write_all(b"\n")
            }
            OutputFormat::Postcard => {
                let bytes = record
                    .to_wire()
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
                out.write_all(&(bytes.len() as u32).to_le_bytes())?;
                out.write_all(&bytes)
            }
        }
    }
}

impl<W: Default> RecordWriter<W> {
    /// Take everything written so far
    pub fn take_output(&self) -> W {
        std::mem::take(&mut *self.out.lock())
    }
}

impl<W: Write + Send> LogSink for RecordWriter<W> {
    fn deliver(&self, records: &[LogRecord]) {
        let mut out = self.out.lock();
        for record in records {
            if let Err(e) = Self::write_record(&mut out, self.format, record) {
                warn!("Failed to write {:?} record: {}", record.log_subtype, e);
            }
        }
        if let Err(e) = out.flush() {
            warn!("Failed to flush record output: {}", e);
        }
    }
}
