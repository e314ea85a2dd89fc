use crate::{Error, Result, Source, TelemetryLine};
use std::{
    path::{Path, PathBuf},
    time::Instant,
};
use tokio::{
    fs::File,
    io::{AsyncBufRead, AsyncBufReadExt, BufReader},
};

pub(crate) type BoxReader = Box<dyn AsyncBufRead + Send + Unpin>;

/// Line reader over the device node. Dropping it closes the handle.
pub(crate) struct DeviceReader {
    reader: BoxReader,
    source: Source,
    path: Option<PathBuf>,
    seq: usize,
}

impl DeviceReader {
    pub async fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).await.map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "device opened");
        let mut dev = Self::new(Box::new(BufReader::new(file)), Source::Device);
        dev.path = Some(path.to_path_buf());
        Ok(dev)
    }

    pub fn new(reader: BoxReader, source: Source) -> Self {
        Self {
            reader,
            source,
            path: None,
            seq: 0,
        }
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Next line with its terminator, or `None` once the driver signals end-of-stream.
    pub async fn next_line(&mut self) -> Result<Option<TelemetryLine>> {
        let mut text = String::new();
        if self.reader.read_line(&mut text).await? == 0 {
            return Ok(None);
        }
        let line = TelemetryLine {
            text,
            seq: self.seq,
            timestamp: Instant::now(),
            source: self.source,
        };
        self.seq += 1;
        Ok(Some(line))
    }
}

impl Drop for DeviceReader {
    fn drop(&mut self) {
        tracing::trace!(source = ?self.source, lines = self.seq, "device handle released");
    }
}
