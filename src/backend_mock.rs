// src/backend_mock.rs
use crate::{RAW_TEMPERATURE_MAX, Source, backend_device::DeviceReader};
use std::{fmt::Write, io::Cursor};

/// Room temperature is roughly this raw ADC count on a freshly reset sensor.
const BASELINE: f32 = 519_888.0;

/// Builds a finite driver stream: one `"<raw>,\n"` line per record.
pub(crate) fn open(records: usize) -> DeviceReader {
    let mut text = String::with_capacity(records * 8);
    let mut t = 0.0f32;
    for _ in 0..records {
        t += 0.04;
        // Slow drift with a little ripple, like a room warming up
        let raw = BASELINE + 1500.0 * t.sin() + 40.0 * (3.7 * t).sin();
        let raw = (raw.max(0.0) as u32).min(RAW_TEMPERATURE_MAX);
        let _ = writeln!(text, "{raw},");
    }
    DeviceReader::new(Box::new(Cursor::new(text.into_bytes())), Source::Mock)
}
