#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Firmware-side telemetry: timestamps and log mirroring.
//!
//! Records live in the core's `TelemetryRecorder`; this module supplies the
//! Embassy-backed instant and mirrors each record to defmt on the target or
//! to stdout on host builds.

use core::time::Duration;

use embassy_time::Instant;
use sequencer_core::telemetry::{
    TelemetryEventKind, TelemetryInstant, TelemetryPayload, TelemetryRecord, TelemetryRecorder,
};

/// Ring capacity kept on the MCU.
pub const FIRMWARE_TELEMETRY_CAPACITY: usize = 32;

/// Recorder type used by the rotation task.
pub type FirmwareTelemetry = TelemetryRecorder<FirmwareInstant, FIRMWARE_TELEMETRY_CAPACITY>;

/// `embassy_time::Instant` wrapper implementing [`TelemetryInstant`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct FirmwareInstant(Instant);

impl FirmwareInstant {
    #[cfg(target_os = "none")]
    pub fn now() -> Self {
        Self::from_embassy(Instant::now())
    }

    pub const fn from_embassy(instant: Instant) -> Self {
        Self(instant)
    }

    pub fn as_micros(self) -> u64 {
        self.0.as_micros()
    }
}

impl TelemetryInstant for FirmwareInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        let micros = self.0.as_micros().saturating_sub(earlier.0.as_micros());
        Duration::from_micros(micros)
    }
}

/// Mirrors `record` to the log sink.
pub fn log_record(record: &TelemetryRecord<FirmwareInstant>) {
    let code = record.event.to_raw();
    let timestamp_us = record.timestamp.as_micros();
    match record.details {
        TelemetryPayload::Playback(active) => emit_started(
            record.event,
            code,
            timestamp_us,
            active.frames,
            active.base_period_ticks,
        ),
        TelemetryPayload::Stopped { played_for } => {
            emit_plain(record.event, code, timestamp_us);
            if let Some(elapsed) = played_for {
                emit_elapsed(elapsed);
            }
        }
        TelemetryPayload::Rejected(error) => emit_rejected(record.event, code, timestamp_us, error),
        TelemetryPayload::None => emit_plain(record.event, code, timestamp_us),
    }
}

#[cfg(target_os = "none")]
fn emit_started(event: TelemetryEventKind, code: u16, timestamp_us: u64, frames: usize, periods: u32) {
    defmt::info!(
        "telemetry:{=u16:#x} {} t={}us frames={} periods={}",
        code,
        defmt::Display2Format(&event),
        timestamp_us,
        frames,
        periods
    );
}

#[cfg(not(target_os = "none"))]
fn emit_started(event: TelemetryEventKind, code: u16, timestamp_us: u64, frames: usize, periods: u32) {
    println!("telemetry:{code:#06x} {event} t={timestamp_us}us frames={frames} periods={periods}");
}

#[cfg(target_os = "none")]
fn emit_rejected(
    event: TelemetryEventKind,
    code: u16,
    timestamp_us: u64,
    error: sequencer_core::playback::PlaybackError,
) {
    defmt::warn!(
        "telemetry:{=u16:#x} {} t={}us reason={}",
        code,
        defmt::Display2Format(&event),
        timestamp_us,
        defmt::Display2Format(&error)
    );
}

#[cfg(not(target_os = "none"))]
fn emit_rejected(
    event: TelemetryEventKind,
    code: u16,
    timestamp_us: u64,
    error: sequencer_core::playback::PlaybackError,
) {
    println!("telemetry:{code:#06x} {event} t={timestamp_us}us reason={error}");
}

#[cfg(target_os = "none")]
fn emit_plain(event: TelemetryEventKind, code: u16, timestamp_us: u64) {
    defmt::info!(
        "telemetry:{=u16:#x} {} t={}us",
        code,
        defmt::Display2Format(&event),
        timestamp_us
    );
}

#[cfg(not(target_os = "none"))]
fn emit_plain(event: TelemetryEventKind, code: u16, timestamp_us: u64) {
    println!("telemetry:{code:#06x} {event} t={timestamp_us}us");
}

#[cfg(target_os = "none")]
fn emit_elapsed(elapsed: Duration) {
    defmt::info!(
        "telemetry: played for {}ms",
        u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
    );
}

#[cfg(not(target_os = "none"))]
fn emit_elapsed(elapsed: Duration) {
    println!("telemetry: played for {}ms", elapsed.as_millis());
}

#[cfg(test)]
mod tests {
    use super::*;
    use sequencer_core::device::Bank;
    use sequencer_core::library::SequenceId;
    use sequencer_core::playback::{ActivePlayback, PlaybackError};

    fn micros(value: u64) -> FirmwareInstant {
        FirmwareInstant::from_embassy(Instant::from_micros(value))
    }

    #[test]
    fn instants_saturate() {
        assert_eq!(
            micros(250).saturating_duration_since(micros(100)),
            Duration::from_micros(150)
        );
        assert_eq!(
            micros(100).saturating_duration_since(micros(250)),
            Duration::ZERO
        );
    }

    #[test]
    fn records_mirror_without_panicking() {
        let mut telemetry = FirmwareTelemetry::new();
        let active = ActivePlayback {
            bank: Bank::A,
            frames: 4,
            base_period_ticks: 1,
            looping: true,
        };
        telemetry.record_started(SequenceId::new(0), active, micros(0));
        telemetry.record_rejected(SequenceId::new(1), PlaybackError::AlreadyPlaying, micros(50_000));
        telemetry.record_stopped(micros(100_000));

        for record in telemetry.oldest_first() {
            log_record(record);
        }
        assert_eq!(telemetry.len(), 3);
        assert_eq!(
            telemetry.latest().map(|record| record.details),
            Some(TelemetryPayload::Stopped {
                played_for: Some(Duration::from_millis(100))
            })
        );
    }
}
