#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Shared status storage for the firmware target.
//!
//! Lightweight atomics mirror the rotation task's view of the controller so
//! other tasks (or a debugger) can read a `StatusSnapshot` without borrowing
//! the controller itself.

use portable_atomic::{AtomicBool, AtomicU8, AtomicU16, AtomicU32, Ordering};
use sequencer_core::device::HwError;
use sequencer_core::library::SequenceId;
use sequencer_core::playback::PlaybackError;
use sequencer_core::rotation::TickOutcome;
use sequencer_core::telemetry::TelemetryEventKind;

const NO_SEQUENCE: u8 = u8::MAX;

/// Global status cells updated by the rotation task.
pub static STATUS: StatusCells = StatusCells::new();

/// Point-in-time copy of [`StatusCells`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StatusSnapshot {
    pub playing: bool,
    pub active: Option<SequenceId>,
    pub ticks: u32,
    pub rejections: u32,
    pub last_event: Option<TelemetryEventKind>,
}

/// Atomic status cells.
pub struct StatusCells {
    playing: AtomicBool,
    /// `NO_SEQUENCE` when nothing has started.
    active: AtomicU8,
    ticks: AtomicU32,
    rejections: AtomicU32,
    /// Raw event code; 0 when nothing was recorded.
    last_event: AtomicU16,
}

impl StatusCells {
    pub const fn new() -> Self {
        Self {
            playing: AtomicBool::new(false),
            active: AtomicU8::new(NO_SEQUENCE),
            ticks: AtomicU32::new(0),
            rejections: AtomicU32::new(0),
            last_event: AtomicU16::new(0),
        }
    }

    /// Folds one tick's outcome into the counters.
    pub fn record_outcome(&self, outcome: &TickOutcome) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        match *outcome {
            TickOutcome::Started(id) => {
                self.playing.store(true, Ordering::Relaxed);
                self.active.store(id.raw(), Ordering::Relaxed);
                self.last_event.store(
                    TelemetryEventKind::PlaybackStarted(id).to_raw(),
                    Ordering::Relaxed,
                );
            }
            TickOutcome::Retained { attempted, reason } => {
                self.rejections.fetch_add(1, Ordering::Relaxed);
                if reason == PlaybackError::Hardware(HwError::OutputStopped) {
                    self.playing.store(false, Ordering::Relaxed);
                    self.active.store(NO_SEQUENCE, Ordering::Relaxed);
                }
                let event = match reason {
                    PlaybackError::Hardware(_) => TelemetryEventKind::SubmitFailed(attempted),
                    _ => TelemetryEventKind::StartRejected(attempted),
                };
                self.last_event.store(event.to_raw(), Ordering::Relaxed);
            }
            TickOutcome::EmptyLibrary => {}
        }
    }

    /// Marks the device as halted.
    pub fn record_stopped(&self) {
        self.playing.store(false, Ordering::Relaxed);
        self.active.store(NO_SEQUENCE, Ordering::Relaxed);
        self.last_event.store(
            TelemetryEventKind::PlaybackStopped.to_raw(),
            Ordering::Relaxed,
        );
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let active = match self.active.load(Ordering::Relaxed) {
            NO_SEQUENCE => None,
            raw => Some(SequenceId::new(raw)),
        };
        let last_event = match self.last_event.load(Ordering::Relaxed) {
            0 => None,
            code => Some(TelemetryEventKind::from_raw(code)),
        };
        StatusSnapshot {
            playing: self.playing.load(Ordering::Relaxed),
            active,
            ticks: self.ticks.load(Ordering::Relaxed),
            rejections: self.rejections.load(Ordering::Relaxed),
            last_event,
        }
    }
}

impl Default for StatusCells {
    fn default() -> Self {
        Self::new()
    }
}
