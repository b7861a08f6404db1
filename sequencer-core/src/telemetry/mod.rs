//! Telemetry event catalog shared by firmware and host targets.
//!
//! Events serialize to compact numeric codes so they can be mirrored over a
//! log channel, and the recorder keeps the most recent ones in a fixed-size
//! ring for status queries.

use core::{fmt, time::Duration};

use heapless::{HistoryBuf, OldestOrdered};

use crate::library::SequenceId;
use crate::playback::{ActivePlayback, PlaybackError};

/// Monotonic identifier assigned to every recorded event.
pub type EventId = u32;

/// Discriminated telemetry events.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TelemetryEventKind {
    PlaybackStarted(SequenceId),
    PlaybackStopped,
    StartRejected(SequenceId),
    SubmitFailed(SequenceId),
    /// Caller-defined event. Only codes from [`TelemetryEventKind::CUSTOM_CODE_MIN`]
    /// up decode back to `Custom`; build it with [`TelemetryEventKind::custom`].
    Custom(u16),
}

impl fmt::Display for TelemetryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryEventKind::PlaybackStarted(id) => write!(f, "playback-started {id}"),
            TelemetryEventKind::PlaybackStopped => f.write_str("playback-stopped"),
            TelemetryEventKind::StartRejected(id) => write!(f, "start-rejected {id}"),
            TelemetryEventKind::SubmitFailed(id) => write!(f, "submit-failed {id}"),
            TelemetryEventKind::Custom(code) => write!(f, "custom({code})"),
        }
    }
}

impl TelemetryEventKind {
    const PLAYBACK_STOPPED_CODE: u16 = 0x0001;
    const PLAYBACK_STARTED_BASE: u16 = 0x0100;
    const START_REJECTED_BASE: u16 = 0x0200;
    const SUBMIT_FAILED_BASE: u16 = 0x0300;
    const BASE_MASK: u16 = 0xFF00;

    /// Lowest code outside the ranges reserved for built-in events.
    pub const CUSTOM_CODE_MIN: u16 = 0x1000;

    /// Custom event for `code`, or `None` when `code` is reserved.
    #[must_use]
    pub const fn custom(code: u16) -> Option<Self> {
        if code >= Self::CUSTOM_CODE_MIN {
            Some(TelemetryEventKind::Custom(code))
        } else {
            None
        }
    }

    /// Encodes the event into a compact discriminant.
    #[must_use]
    pub const fn to_raw(self) -> u16 {
        match self {
            TelemetryEventKind::PlaybackStarted(id) => Self::PLAYBACK_STARTED_BASE | id.raw() as u16,
            TelemetryEventKind::PlaybackStopped => Self::PLAYBACK_STOPPED_CODE,
            TelemetryEventKind::StartRejected(id) => Self::START_REJECTED_BASE | id.raw() as u16,
            TelemetryEventKind::SubmitFailed(id) => Self::SUBMIT_FAILED_BASE | id.raw() as u16,
            TelemetryEventKind::Custom(code) => code,
        }
    }

    /// Decodes a raw discriminant, falling back to [`TelemetryEventKind::Custom`].
    #[must_use]
    pub const fn from_raw(code: u16) -> Self {
        let id = SequenceId::new(code.to_le_bytes()[0]);
        match code & Self::BASE_MASK {
            _ if code == Self::PLAYBACK_STOPPED_CODE => TelemetryEventKind::PlaybackStopped,
            Self::PLAYBACK_STARTED_BASE => TelemetryEventKind::PlaybackStarted(id),
            Self::START_REJECTED_BASE => TelemetryEventKind::StartRejected(id),
            Self::SUBMIT_FAILED_BASE => TelemetryEventKind::SubmitFailed(id),
            _ => TelemetryEventKind::Custom(code),
        }
    }
}

/// Payloads carried alongside telemetry events.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TelemetryPayload {
    None,
    /// Parameters of the playback that just started.
    Playback(ActivePlayback),
    /// How long the stopped playback ran, when known.
    Stopped { played_for: Option<Duration> },
    /// Why a start or replace was refused.
    Rejected(PlaybackError),
}

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 32;

/// Monotonic instant wrapper used for telemetry timestamps.
pub trait TelemetryInstant: Copy {
    /// Returns the saturating duration from `earlier` to `self`.
    fn saturating_duration_since(&self, earlier: Self) -> Duration;
}

/// Telemetry record stored in the ring buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TelemetryRecord<TInstant>
where
    TInstant: Copy,
{
    pub id: EventId,
    pub timestamp: TInstant,
    pub event: TelemetryEventKind,
    pub details: TelemetryPayload,
}

/// Records telemetry events into a fixed-size ring buffer.
pub struct TelemetryRecorder<TInstant, const CAPACITY: usize = TELEMETRY_RING_CAPACITY>
where
    TInstant: Copy,
{
    ring: HistoryBuf<TelemetryRecord<TInstant>, CAPACITY>,
    playing_since: Option<TInstant>,
    next_event_id: EventId,
}

impl<TInstant, const CAPACITY: usize> TelemetryRecorder<TInstant, CAPACITY>
where
    TInstant: TelemetryInstant,
{
    /// Creates a recorder with an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            playing_since: None,
            next_event_id: 0,
        }
    }

    /// Records in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, TelemetryRecord<TInstant>> {
        self.ring.oldest_ordered()
    }

    /// Most recent record, if any.
    pub fn latest(&self) -> Option<&TelemetryRecord<TInstant>> {
        self.ring.recent()
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Records a successful start or replace of `sequence`.
    pub fn record_started(
        &mut self,
        sequence: SequenceId,
        playback: ActivePlayback,
        timestamp: TInstant,
    ) -> EventId {
        self.playing_since = Some(timestamp);
        self.record(
            TelemetryEventKind::PlaybackStarted(sequence),
            TelemetryPayload::Playback(playback),
            timestamp,
        )
    }

    /// Records a halt and how long the halted playback ran.
    pub fn record_stopped(&mut self, timestamp: TInstant) -> EventId {
        let played_for = self
            .playing_since
            .take()
            .map(|since| timestamp.saturating_duration_since(since));
        self.record(
            TelemetryEventKind::PlaybackStopped,
            TelemetryPayload::Stopped { played_for },
            timestamp,
        )
    }

    /// Records a refused start; device failures are filed as `SubmitFailed`.
    pub fn record_rejected(
        &mut self,
        sequence: SequenceId,
        error: PlaybackError,
        timestamp: TInstant,
    ) -> EventId {
        let event = match error {
            PlaybackError::Hardware(_) => TelemetryEventKind::SubmitFailed(sequence),
            _ => TelemetryEventKind::StartRejected(sequence),
        };
        self.record(event, TelemetryPayload::Rejected(error), timestamp)
    }

    /// Records an arbitrary event with the supplied payload.
    pub fn record(
        &mut self,
        event: TelemetryEventKind,
        payload: TelemetryPayload,
        timestamp: TInstant,
    ) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);

        self.ring.write(TelemetryRecord {
            id,
            timestamp,
            event,
            details: payload,
        });

        id
    }
}

impl<TInstant, const CAPACITY: usize> Default for TelemetryRecorder<TInstant, CAPACITY>
where
    TInstant: TelemetryInstant,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{Bank, HwError};

    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd)]
    struct MicrosInstant(u64);

    impl TelemetryInstant for MicrosInstant {
        fn saturating_duration_since(&self, earlier: Self) -> Duration {
            Duration::from_micros(self.0.saturating_sub(earlier.0))
        }
    }

    const ACTIVE: ActivePlayback = ActivePlayback {
        bank: Bank::A,
        frames: 4,
        base_period_ticks: 1,
        looping: true,
    };

    #[test]
    fn event_codes_decode_back() {
        let events = [
            (TelemetryEventKind::PlaybackStarted(SequenceId::new(3)), 0x0103),
            (TelemetryEventKind::PlaybackStopped, 0x0001),
            (TelemetryEventKind::StartRejected(SequenceId::new(0)), 0x0200),
            (TelemetryEventKind::SubmitFailed(SequenceId::new(7)), 0x0307),
            (TelemetryEventKind::Custom(0x7F00), 0x7F00),
        ];

        for (event, code) in events {
            assert_eq!(event.to_raw(), code);
            assert_eq!(TelemetryEventKind::from_raw(code), event);
        }
    }

    #[test]
    fn custom_codes_stay_clear_of_builtin_ranges() {
        assert_eq!(TelemetryEventKind::custom(0x0105), None);
        assert_eq!(TelemetryEventKind::custom(0x0001), None);

        let event = TelemetryEventKind::custom(0x1005).expect("outside reserved ranges");
        assert_eq!(TelemetryEventKind::from_raw(event.to_raw()), event);
        assert_eq!(
            TelemetryEventKind::from_raw(u16::MAX),
            TelemetryEventKind::Custom(u16::MAX)
        );
    }

    #[test]
    fn stop_reports_elapsed_playback() {
        let mut recorder: TelemetryRecorder<MicrosInstant, 8> = TelemetryRecorder::new();
        recorder.record_started(SequenceId::new(1), ACTIVE, MicrosInstant(1_000));
        recorder.record_stopped(MicrosInstant(51_000));

        let latest = recorder.latest().expect("stop recorded");
        assert_eq!(latest.event, TelemetryEventKind::PlaybackStopped);
        assert_eq!(
            latest.details,
            TelemetryPayload::Stopped {
                played_for: Some(Duration::from_millis(50))
            }
        );
    }

    #[test]
    fn hardware_errors_are_filed_as_submit_failures() {
        let mut recorder: TelemetryRecorder<MicrosInstant, 8> = TelemetryRecorder::new();
        recorder.record_rejected(
            SequenceId::new(2),
            PlaybackError::Hardware(HwError::Rejected),
            MicrosInstant(0),
        );
        recorder.record_rejected(
            SequenceId::new(2),
            PlaybackError::AlreadyPlaying,
            MicrosInstant(1),
        );

        let events: [TelemetryEventKind; 2] = {
            let mut iter = recorder.oldest_first().map(|record| record.event);
            [
                iter.next().expect("first"),
                iter.next().expect("second"),
            ]
        };
        assert_eq!(
            events,
            [
                TelemetryEventKind::SubmitFailed(SequenceId::new(2)),
                TelemetryEventKind::StartRejected(SequenceId::new(2)),
            ]
        );
    }

    #[test]
    fn ring_keeps_most_recent_entries() {
        let mut recorder: TelemetryRecorder<MicrosInstant, 2> = TelemetryRecorder::new();
        for tick in 0..5 {
            recorder.record(
                TelemetryEventKind::Custom(TelemetryEventKind::CUSTOM_CODE_MIN + tick),
                TelemetryPayload::None,
                MicrosInstant(u64::from(tick)),
            );
        }
        assert_eq!(recorder.len(), 2);
        assert_eq!(recorder.latest().map(|record| record.id), Some(4));
    }
}
