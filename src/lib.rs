//! Public API surface, backend selection, and blocking helpers.

mod backend_device;

#[cfg(feature = "mock")]
mod backend_mock;

pub mod logger;
pub mod types;
pub use crate::types::{Error, RAW_TEMPERATURE_MAX, Result, Source, TelemetryLine};

use backend_device::DeviceReader;
use futures_core::stream::BoxStream;
use futures_util::{StreamExt, stream};
use once_cell::sync::Lazy;
use std::{
    io::Write,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
use tokio::io::AsyncBufRead;

/// Node created by the bme280 misc driver.
pub const DEFAULT_DEVICE: &str = "/dev/bme280_misc";
/// Pause after every emitted record.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

pub type LineStream = BoxStream<'static, Result<TelemetryLine>>;

// ===== Device info =====

#[derive(Clone, Debug)]
pub struct DeviceInfo {
    pub source: Source,
    /// Path of the opened node; `None` for readers and the mock.
    pub path: Option<PathBuf>,
}

// ===== Client =====

/// Exclusive owner of an open telemetry stream.
///
/// The underlying handle is released when the client is dropped, which
/// [`poll`] and friends do as soon as the loop ends.
pub struct TelemetryClient {
    reader: DeviceReader,
    interval: Duration,
}

impl TelemetryClient {
    /// Wrap any buffered async reader, e.g. a pipe or an in-memory device image.
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncBufRead + Send + Unpin + 'static,
    {
        Self {
            reader: DeviceReader::new(Box::new(reader), Source::Reader),
            interval: DEFAULT_INTERVAL,
        }
    }

    /// Pause applied after each record by [`poll`].
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn info(&self) -> DeviceInfo {
        DeviceInfo {
            source: self.reader.source(),
            path: self.reader.path().map(Path::to_path_buf),
        }
    }

    /// Read one line; `Ok(None)` is end-of-stream.
    pub async fn next_line(&mut self) -> Result<Option<TelemetryLine>> {
        self.reader.next_line().await
    }

    /// Unpaced stream of lines. Ends after end-of-stream or the first error.
    pub fn into_stream(self) -> LineStream {
        stream::unfold(Some(self), |state| async move {
            let mut client = state?;
            match client.next_line().await {
                Ok(Some(line)) => Some((Ok(line), Some(client))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
        .boxed()
    }
}

// ===== Global Tokio runtime for blocking variants =====

static RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to init Tokio runtime")
});

// Blocking functions below drive the async core on a global single-threaded
// Tokio runtime. Avoid calling them from async contexts.

// ===== Options =====

#[derive(Clone, Debug)]
pub struct PollOptions {
    pub path: PathBuf,
    pub interval: Duration,
    /// Fall back to the synthetic driver when the node cannot be opened.
    /// Only honored with the `mock` feature.
    pub allow_mock: bool,
    /// Lines produced by the synthetic driver before end-of-stream.
    pub mock_records: usize,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self::new(DEFAULT_DEVICE)
    }
}

impl PollOptions {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            interval: DEFAULT_INTERVAL,
            allow_mock: false,
            mock_records: 10,
        }
    }
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
    pub fn allow_mock(mut self, ok: bool) -> Self {
        self.allow_mock = ok;
        self
    }
    pub fn mock_records(mut self, n: usize) -> Self {
        self.mock_records = n;
        self
    }
}

// ===== Reports =====

#[derive(Debug, Clone)]
pub struct SetupReport {
    pub chosen: Source,
    pub tried: Vec<Source>,
    pub used_mock: bool,
    pub duration: Duration,
}

#[derive(Debug, Clone)]
pub struct PollReport {
    pub source: Source,
    pub records: usize,
    pub duration: Duration,
}

// ===== Setup =====

fn log_setup(report: &SetupReport, opts: &PollOptions) {
    if cfg!(feature = "diagnostics") {
        tracing::info!(
            chosen = ?report.chosen,
            tried = ?report.tried,
            path = %opts.path.display(),
            interval = ?opts.interval,
            setup = ?report.duration,
            "telemetry source ready"
        );
    } else {
        tracing::debug!(
            chosen = ?report.chosen,
            tried = ?report.tried,
            path = %opts.path.display(),
            "telemetry source ready"
        );
    }
}

pub async fn init(opts: &PollOptions) -> Result<(TelemetryClient, SetupReport)> {
    let t0 = Instant::now();
    #[allow(unused_mut)]
    let mut tried = vec![Source::Device];

    let err = match DeviceReader::open(&opts.path).await {
        Ok(reader) => {
            let report = SetupReport {
                chosen: Source::Device,
                tried,
                used_mock: false,
                duration: t0.elapsed(),
            };
            log_setup(&report, opts);
            let client = TelemetryClient {
                reader,
                interval: opts.interval,
            };
            return Ok((client, report));
        }
        Err(e) => e,
    };

    // Optional mock (strictly opt-in)
    #[cfg(feature = "mock")]
    if opts.allow_mock {
        tracing::warn!(error = %err, "device unavailable; using mock driver");
        tried.push(Source::Mock);
        let report = SetupReport {
            chosen: Source::Mock,
            tried,
            used_mock: true,
            duration: t0.elapsed(),
        };
        log_setup(&report, opts);
        let client = TelemetryClient {
            reader: backend_mock::open(opts.mock_records),
            interval: opts.interval,
        };
        return Ok((client, report));
    }

    tracing::debug!(error = %err, tried = ?tried, "no telemetry source available");
    Err(err)
}

// ===== Public API (thin) =====

/// Async: open a device node.
pub async fn open(path: impl AsRef<Path>) -> Result<TelemetryClient> {
    let (client, _report) = init(&PollOptions::new(path.as_ref())).await?;
    Ok(client)
}

/// Async: open with options (interval, allow_mock, mock_records, ...).
pub async fn open_with(opts: PollOptions) -> Result<TelemetryClient> {
    let (client, _report) = init(&opts).await?;
    Ok(client)
}

/// Blocking: open a device node.
pub fn open_blocking(path: impl AsRef<Path>) -> Result<TelemetryClient> {
    RUNTIME.block_on(open(path))
}

/// Blocking: open with options.
pub fn open_blocking_with(opts: PollOptions) -> Result<TelemetryClient> {
    RUNTIME.block_on(open_with(opts))
}

// ===== Polling loop =====

/// Read lines until end-of-stream, handing each to `emit` and then sleeping
/// for the client's interval. The client is dropped before this returns, on
/// every path.
pub async fn poll_each<F>(mut client: TelemetryClient, mut emit: F) -> Result<PollReport>
where
    F: FnMut(&TelemetryLine) -> Result<()>,
{
    let t0 = Instant::now();
    let source = client.info().source;
    let interval = client.interval;
    let mut records = 0usize;

    while let Some(line) = client.next_line().await? {
        tracing::trace!(seq = line.seq, text = line.text.trim_end(), "record");
        emit(&line)?;
        records += 1;
        tokio::time::sleep(interval).await;
    }
    drop(client);

    tracing::debug!(records, "end of stream");
    Ok(PollReport {
        source,
        records,
        duration: t0.elapsed(),
    })
}

/// Write every line to `out` as read, newline-terminated, flushing per record.
pub async fn poll<W: Write>(client: TelemetryClient, out: &mut W) -> Result<PollReport> {
    poll_each(client, |line| {
        out.write_all(line.text.as_bytes())?;
        if !line.ends_with_newline() {
            out.write_all(b"\n")?;
        }
        out.flush()?;
        Ok(())
    })
    .await
}

/// Blocking: [`poll`] on the global runtime.
pub fn poll_blocking<W: Write>(client: TelemetryClient, out: &mut W) -> Result<PollReport> {
    RUNTIME.block_on(poll(client, out))
}
