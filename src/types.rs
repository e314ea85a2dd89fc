use std::{path::PathBuf, time::Instant};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("other: {0}")]
    Other(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
    /// Character device node (or any file standing in for one).
    Device,
    /// Caller supplied reader, see `TelemetryClient::from_reader`.
    Reader,
    Mock,
}

/// Largest value the sensor's 20-bit temperature ADC can report.
pub const RAW_TEMPERATURE_MAX: u32 = (1 << 20) - 1;

/// One line read from the device, kept verbatim.
#[derive(Clone, Debug)]
pub struct TelemetryLine {
    pub text: String,
    pub seq: usize,
    pub timestamp: Instant,
    pub source: Source,
}

impl TelemetryLine {
    /// Comma separated fields of the driver format (`"<raw>,\n"`), trailing empties dropped.
    pub fn fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = self.text.trim_end().split(',').map(str::trim).collect();
        while fields.last().is_some_and(|f| f.is_empty()) {
            fields.pop();
        }
        fields
    }

    /// Raw temperature ADC reading, if the line carries one.
    pub fn raw_temperature(&self) -> Option<u32> {
        let raw = self.fields().first()?.parse::<u32>().ok()?;
        (raw <= RAW_TEMPERATURE_MAX).then_some(raw)
    }

    pub fn ends_with_newline(&self) -> bool {
        self.text.ends_with('\n')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str) -> TelemetryLine {
        TelemetryLine {
            text: text.to_string(),
            seq: 0,
            timestamp: Instant::now(),
            source: Source::Device,
        }
    }

    #[test]
    fn driver_line_parses_raw_temperature() {
        let l = line("519888,\n");
        assert_eq!(l.fields(), vec!["519888"]);
        assert_eq!(l.raw_temperature(), Some(519_888));
    }

    #[test]
    fn raw_temperature_rejects_out_of_range_and_garbage() {
        assert_eq!(line("1048576,\n").raw_temperature(), None);
        assert_eq!(line("-12,\n").raw_temperature(), None);
        assert_eq!(line("hello\n").raw_temperature(), None);
        assert_eq!(line("\n").raw_temperature(), None);
        assert!(line("\n").fields().is_empty());
    }

    #[test]
    fn fields_keeps_inner_values() {
        let l = line("1, 2 ,3,,\r\n");
        assert_eq!(l.fields(), vec!["1", "2", "3"]);
        assert!(l.ends_with_newline());
        assert!(!line("7,").ends_with_newline());
    }
}
