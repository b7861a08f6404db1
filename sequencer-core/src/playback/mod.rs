//! Playback controller: owns the device and its double-buffered frame arena.
//!
//! State machine: `Idle --start--> Playing --stop--> Idle`. A running
//! sequence is changed with [`PlaybackController::replace`], which commits
//! the next sequence into the bank the hardware is not reading before
//! handing it over. The playing bank is never written.

use core::fmt;

use heapless::Vec;

use crate::device::{
    Bank, ConfigError, DeviceConfig, HwError, LoadMode, MAX_BANK_WORDS, PlaybackRequest, PwmDevice,
};
use crate::library::LibraryError;
use crate::sequences::{Sequence, ValidationError};

/// Fewest PWM periods a frame can be held for.
pub const MIN_BASE_PERIOD_TICKS: u32 = 1;

/// Details of the sequence currently handed to the device.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ActivePlayback {
    pub bank: Bank,
    pub frames: usize,
    pub base_period_ticks: u32,
    pub looping: bool,
}

/// Device playback state.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing(ActivePlayback),
}

impl PlaybackState {
    /// Returns `true` while a sequence is handed to the device.
    #[must_use]
    pub const fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing(_))
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackState::Idle => f.write_str("idle"),
            PlaybackState::Playing(active) => write!(
                f,
                "playing {} frame(s) from bank {:?}, {} period(s) per frame{}",
                active.frames,
                active.bank,
                active.base_period_ticks,
                if active.looping { ", looping" } else { "" }
            ),
        }
    }
}

/// Errors surfaced by [`PlaybackController`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PlaybackError {
    AlreadyPlaying,
    NotPlaying,
    Incompatible {
        expected: LoadMode,
        found: LoadMode,
        channels: usize,
    },
    Encoding(ValidationError),
    Library(LibraryError),
    Hardware(HwError),
}

impl From<HwError> for PlaybackError {
    fn from(value: HwError) -> Self {
        PlaybackError::Hardware(value)
    }
}

impl From<LibraryError> for PlaybackError {
    fn from(value: LibraryError) -> Self {
        PlaybackError::Library(value)
    }
}

impl From<ValidationError> for PlaybackError {
    fn from(value: ValidationError) -> Self {
        PlaybackError::Encoding(value)
    }
}

impl fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackError::AlreadyPlaying => f.write_str("device is already playing"),
            PlaybackError::NotPlaying => f.write_str("device is not playing"),
            PlaybackError::Incompatible {
                expected,
                found,
                channels,
            } => write!(
                f,
                "sequence built for {found} with {channels} channel(s), device runs {expected}"
            ),
            PlaybackError::Encoding(error) => write!(f, "sequence layout failed: {error}"),
            PlaybackError::Library(error) => write!(f, "{error}"),
            PlaybackError::Hardware(error) => write!(f, "hardware error: {error}"),
        }
    }
}

impl core::error::Error for PlaybackError {}

/// Owns a [`PwmDevice`] and the memory its playback reads from.
pub struct PlaybackController<D>
where
    D: PwmDevice,
{
    device: D,
    config: DeviceConfig,
    banks: [Vec<u16, MAX_BANK_WORDS>; 2],
    last_bank: Bank,
    state: PlaybackState,
}

impl<D> PlaybackController<D>
where
    D: PwmDevice,
{
    /// Wraps `device` configured as `config`. Starts idle.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `config` is outside the peripheral's limits.
    pub fn new(device: D, config: DeviceConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            device,
            config,
            banks: [Vec::new(), Vec::new()],
            last_bank: Bank::B,
            state: PlaybackState::Idle,
        })
    }

    /// Starts `sequence` on an idle device.
    ///
    /// `base_period_ticks` is the number of PWM periods each frame is held
    /// for; values below one are raised to one.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::AlreadyPlaying`] when a sequence is active,
    /// [`PlaybackError::Incompatible`] when the sequence was built for another
    /// layout, and [`PlaybackError::Hardware`] when the device refuses it.
    pub fn start(
        &mut self,
        sequence: &Sequence,
        base_period_ticks: u32,
        looping: bool,
    ) -> Result<(), PlaybackError> {
        if self.state.is_playing() {
            return Err(PlaybackError::AlreadyPlaying);
        }
        self.commit_and_submit(sequence, base_period_ticks, looping)
    }

    /// Swaps the active sequence for `sequence`, or starts it when idle.
    ///
    /// The new frames go into the standby bank. If the device refuses them
    /// the previously active bank keeps playing and the state is unchanged,
    /// unless the device reports [`HwError::OutputStopped`], which leaves the
    /// controller idle.
    ///
    /// # Errors
    ///
    /// Same as [`PlaybackController::start`], minus `AlreadyPlaying`.
    pub fn replace(
        &mut self,
        sequence: &Sequence,
        base_period_ticks: u32,
        looping: bool,
    ) -> Result<(), PlaybackError> {
        self.commit_and_submit(sequence, base_period_ticks, looping)
    }

    /// Halts output.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::NotPlaying`] when idle. A failed halt leaves
    /// the controller in `Playing`.
    pub fn stop(&mut self) -> Result<(), PlaybackError> {
        if !self.state.is_playing() {
            return Err(PlaybackError::NotPlaying);
        }
        self.device.halt()?;
        self.state = PlaybackState::Idle;
        Ok(())
    }

    /// Returns `true` while a sequence is handed to the device.
    #[must_use]
    pub const fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> PlaybackState {
        self.state
    }

    /// Words of the bank the device is reading, if playing.
    #[must_use]
    pub fn active_words(&self) -> Option<&[u16]> {
        match self.state {
            PlaybackState::Playing(active) => Some(self.banks[active.bank.index()].as_slice()),
            PlaybackState::Idle => None,
        }
    }

    /// Configuration the device was brought up with.
    #[must_use]
    pub const fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Shared access to the device.
    #[must_use]
    pub const fn device(&self) -> &D {
        &self.device
    }

    /// Exclusive access to the device.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Releases the device.
    pub fn into_device(self) -> D {
        self.device
    }

    fn standby_bank(&self) -> Bank {
        match self.state {
            PlaybackState::Playing(active) => active.bank.other(),
            PlaybackState::Idle => self.last_bank.other(),
        }
    }

    fn commit_and_submit(
        &mut self,
        sequence: &Sequence,
        base_period_ticks: u32,
        looping: bool,
    ) -> Result<(), PlaybackError> {
        if !sequence.fits(&self.config) {
            return Err(PlaybackError::Incompatible {
                expected: self.config.load_mode,
                found: sequence.load_mode(),
                channels: sequence.channel_count(),
            });
        }

        let bank = self.standby_bank();
        let base_period_ticks = base_period_ticks.max(MIN_BASE_PERIOD_TICKS);
        let words = &mut self.banks[bank.index()];
        sequence.encode_into(&self.config, words)?;

        let request = PlaybackRequest {
            words: words.as_slice(),
            bank,
            load_mode: self.config.load_mode,
            refresh: base_period_ticks - 1,
            end_delay: sequence.end_delay(),
            looping,
        };
        if let Err(error) = self.device.submit_playback(&request) {
            if error == HwError::OutputStopped {
                self.state = PlaybackState::Idle;
            }
            return Err(error.into());
        }

        self.last_bank = bank;
        self.state = PlaybackState::Playing(ActivePlayback {
            bank,
            frames: sequence.frame_count(),
            base_period_ticks,
            looping,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::SimulatedPwm;
    use crate::sequences::{basic_sequence, marching_sequence};

    fn controller() -> PlaybackController<SimulatedPwm> {
        PlaybackController::new(SimulatedPwm::new(), DeviceConfig::default()).expect("valid config")
    }

    #[test]
    fn start_on_idle_submits_committed_bank() {
        let mut controller = controller();
        let sequence = basic_sequence(controller.config()).expect("preset builds");

        controller.start(&sequence, 1, true).expect("start");
        assert!(controller.is_playing());

        let submitted = controller.device().last_playback().expect("submitted");
        assert_eq!(submitted.words.as_slice(), &[0x83E8, 0x09C4, 0x1388, 0x03E8]);
        assert_eq!(submitted.refresh, 0);
        assert!(submitted.looping);
        assert_eq!(controller.active_words(), Some(submitted.words.as_slice()));
    }

    #[test]
    fn second_start_is_rejected() {
        let mut controller = controller();
        let sequence = basic_sequence(controller.config()).expect("preset builds");

        controller.start(&sequence, 1, true).expect("start");
        assert_eq!(
            controller.start(&sequence, 1, true),
            Err(PlaybackError::AlreadyPlaying)
        );
        assert_eq!(controller.device().submissions(), 1);
    }

    #[test]
    fn stop_twice_reports_not_playing() {
        let mut controller = controller();
        let sequence = basic_sequence(controller.config()).expect("preset builds");

        controller.start(&sequence, 1, true).expect("start");
        controller.stop().expect("stop");
        assert_eq!(controller.stop(), Err(PlaybackError::NotPlaying));
        assert_eq!(controller.state(), PlaybackState::Idle);
    }

    #[test]
    fn failed_halt_keeps_playing() {
        let mut controller = controller();
        let sequence = basic_sequence(controller.config()).expect("preset builds");

        controller.start(&sequence, 1, true).expect("start");
        controller.device_mut().fail_next_halt(HwError::Timeout);
        assert_eq!(
            controller.stop(),
            Err(PlaybackError::Hardware(HwError::Timeout))
        );
        assert!(controller.is_playing());
    }

    #[test]
    fn replace_alternates_banks() {
        let mut controller = controller();
        let basic = basic_sequence(controller.config()).expect("preset builds");
        let marching = marching_sequence(controller.config()).expect("preset builds");

        controller.replace(&basic, 2, true).expect("first");
        let PlaybackState::Playing(first) = controller.state() else {
            panic!("expected playing");
        };
        controller.replace(&marching, 2, true).expect("second");
        let PlaybackState::Playing(second) = controller.state() else {
            panic!("expected playing");
        };

        assert_eq!(second.bank, first.bank.other());
        assert_eq!(second.frames, 4);
        assert_eq!(
            controller.device().last_playback().map(|last| last.refresh),
            Some(1)
        );
    }

    #[test]
    fn zero_base_period_holds_each_frame_once() {
        let mut controller = controller();
        let sequence = basic_sequence(controller.config()).expect("preset builds");

        controller.start(&sequence, 0, false).expect("start");
        let PlaybackState::Playing(active) = controller.state() else {
            panic!("expected playing");
        };
        assert_eq!(active.base_period_ticks, 1);
        assert_eq!(
            controller.device().last_playback().map(|last| last.refresh),
            Some(0)
        );
    }

    #[test]
    fn invalid_config_is_refused() {
        let mut config = DeviceConfig::default();
        config.countertop = 0;
        assert_eq!(
            PlaybackController::new(SimulatedPwm::new(), config).err(),
            Some(ConfigError::CountertopOutOfRange(0))
        );
    }
}
