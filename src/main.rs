use anyhow::Context;
use bme280_reader::{DEFAULT_DEVICE, logger, open_blocking, poll_blocking};

fn main() -> anyhow::Result<()> {
    logger::init_cli_logger();

    // A missing or unreadable node is fatal before the loop starts.
    let client = open_blocking(DEFAULT_DEVICE)
        .with_context(|| format!("opening telemetry device {DEFAULT_DEVICE}"))?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let report = poll_blocking(client, &mut out)
        .with_context(|| format!("reading telemetry from {DEFAULT_DEVICE}"))?;

    tracing::debug!(
        records = report.records,
        elapsed = ?report.duration,
        "telemetry stream finished"
    );
    Ok(())
}
