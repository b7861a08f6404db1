//! Rotation driver: walks the sequence library one entry per tick.
//!
//! The driver holds only a cursor. The controller, library and telemetry
//! recorder are passed in on every tick, and the wait between ticks belongs
//! to the caller (an Embassy timer on the firmware, a command in the
//! emulator). A refused start never advances the cursor, so the next tick
//! retries the same entry.

use core::time::Duration;

use crate::device::PwmDevice;
use crate::library::{SequenceId, SequenceLibrary};
use crate::playback::{PlaybackController, PlaybackError, PlaybackState};
use crate::telemetry::{TelemetryInstant, TelemetryRecorder};

/// Default delay between rotation ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(50);

/// How a tick hands the next sequence to a busy controller.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum StartPolicy {
    /// Use the strict `start`; a busy controller keeps its sequence.
    Reject,
    /// Swap the active sequence through the standby bank.
    #[default]
    Replace,
}

/// Rotation cadence and policy.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RotationConfig {
    pub tick_interval: Duration,
    pub base_period_ticks: u32,
    pub policy: StartPolicy,
}

impl RotationConfig {
    /// Default cadence: 50 ms ticks, one PWM period per frame, replace policy.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            base_period_ticks: 1,
            policy: StartPolicy::Replace,
        }
    }

    #[must_use]
    pub const fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    #[must_use]
    pub const fn with_base_period_ticks(mut self, base_period_ticks: u32) -> Self {
        self.base_period_ticks = base_period_ticks;
        self
    }

    #[must_use]
    pub const fn with_policy(mut self, policy: StartPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of one rotation tick.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TickOutcome {
    /// The entry is now playing.
    Started(SequenceId),
    /// The controller kept its previous state.
    Retained {
        attempted: SequenceId,
        reason: PlaybackError,
    },
    /// Nothing registered.
    EmptyLibrary,
}

/// Cyclic successor of `current` among `count` entries.
///
/// Returns 0 when `count` is 0.
#[must_use]
pub const fn next_index(current: usize, count: usize) -> usize {
    if count == 0 {
        0
    } else {
        (current + 1) % count
    }
}

/// Cursor over the library.
#[derive(Clone, Debug, Default)]
pub struct RotationDriver {
    config: RotationConfig,
    next: usize,
    active: Option<SequenceId>,
}

impl RotationDriver {
    #[must_use]
    pub const fn new(config: RotationConfig) -> Self {
        Self {
            config,
            next: 0,
            active: None,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &RotationConfig {
        &self.config
    }

    /// Changes the start policy for subsequent ticks.
    pub fn set_policy(&mut self, policy: StartPolicy) {
        self.config.policy = policy;
    }

    /// Last successfully started entry.
    #[must_use]
    pub const fn active(&self) -> Option<SequenceId> {
        self.active
    }

    /// Index the next tick will attempt.
    #[must_use]
    pub const fn pending_index(&self) -> usize {
        self.next
    }

    /// Forgets the active entry after an external stop.
    pub fn clear_active(&mut self) {
        self.active = None;
    }

    /// Attempts to play the next library entry.
    pub fn tick<D, TInstant, const ENTRIES: usize, const EVENTS: usize>(
        &mut self,
        controller: &mut PlaybackController<D>,
        library: &SequenceLibrary<ENTRIES>,
        telemetry: &mut TelemetryRecorder<TInstant, EVENTS>,
        now: TInstant,
    ) -> TickOutcome
    where
        D: PwmDevice,
        TInstant: TelemetryInstant,
    {
        let count = library.count();
        if count == 0 {
            return TickOutcome::EmptyLibrary;
        }
        if self.next >= count {
            self.next = 0;
        }

        let attempted = SequenceId::new(u8::try_from(self.next).unwrap_or(u8::MAX));
        self.play_entry(controller, library, telemetry, attempted, now)
    }

    /// Plays `id` right away under the current policy.
    ///
    /// Outcomes are recorded the same way a tick records them. On success the
    /// cursor moves past `id`, so the next tick continues after it.
    pub fn play_entry<D, TInstant, const ENTRIES: usize, const EVENTS: usize>(
        &mut self,
        controller: &mut PlaybackController<D>,
        library: &SequenceLibrary<ENTRIES>,
        telemetry: &mut TelemetryRecorder<TInstant, EVENTS>,
        id: SequenceId,
        now: TInstant,
    ) -> TickOutcome
    where
        D: PwmDevice,
        TInstant: TelemetryInstant,
    {
        match self.play(controller, library, id) {
            Ok(()) => {
                if let PlaybackState::Playing(active) = controller.state() {
                    telemetry.record_started(id, active, now);
                }
                self.active = Some(id);
                self.next = next_index(id.index(), library.count());
                TickOutcome::Started(id)
            }
            Err(reason) => {
                telemetry.record_rejected(id, reason, now);
                if !controller.is_playing() && self.active.take().is_some() {
                    telemetry.record_stopped(now);
                }
                TickOutcome::Retained {
                    attempted: id,
                    reason,
                }
            }
        }
    }

    fn play<D, const ENTRIES: usize>(
        &self,
        controller: &mut PlaybackController<D>,
        library: &SequenceLibrary<ENTRIES>,
        id: SequenceId,
    ) -> Result<(), PlaybackError>
    where
        D: PwmDevice,
    {
        let sequence = library.get(id)?;
        let looping = sequence.looping();
        match self.config.policy {
            StartPolicy::Reject => {
                controller.start(sequence, self.config.base_period_ticks, looping)
            }
            StartPolicy::Replace => {
                controller.replace(sequence, self.config.base_period_ticks, looping)
            }
        }
    }
}
