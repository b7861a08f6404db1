//! PWM device capability consumed by the playback controller.
//!
//! The core never touches peripheral registers. It hands a fully committed
//! bank of sequence words to a [`PwmDevice`] and trusts the hardware to free
//! run from there. Firmware provides the Embassy-backed implementation; the
//! [`SimulatedPwm`] here backs host tests and the emulator.

use core::fmt;

use heapless::Vec;

use crate::duty::MAX_COUNTERTOP;
use crate::sequences::MAX_SEQUENCE_FRAMES;

/// Number of output channels a PWM instance exposes.
pub const MAX_CHANNELS: usize = 4;

/// Waveform load mode spends the fourth cell of every frame on the countertop.
pub const MAX_WAVEFORM_CHANNELS: usize = 3;

/// Smallest countertop the peripheral accepts.
pub const MIN_COUNTERTOP: u16 = 3;

/// Countertop used by the demo configurations.
pub const DEFAULT_COUNTERTOP: u16 = 10_000;

/// Largest bank the controller ever commits, in 16-bit words.
pub const MAX_BANK_WORDS: usize = MAX_SEQUENCE_FRAMES * MAX_CHANNELS;

/// Output pins wired on the reference board (P0.28 to P0.31).
pub const DEFAULT_PINS: [OutputPin; MAX_CHANNELS] = [
    OutputPin::Connected(28),
    OutputPin::Connected(29),
    OutputPin::Connected(30),
    OutputPin::Connected(31),
];

/// GPIO routing for one channel.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutputPin {
    Connected(u8),
    NotConnected,
}

/// How the peripheral decodes the words of one frame.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum LoadMode {
    /// One word drives every channel.
    Common,
    /// Word 0 drives channels 0/1, word 1 drives channels 2/3.
    Grouped,
    /// One word per channel.
    #[default]
    Individual,
    /// Three channel words plus a per-frame countertop.
    Waveform,
}

impl LoadMode {
    /// Words the peripheral consumes per frame.
    #[must_use]
    pub const fn words_per_frame(self) -> usize {
        match self {
            LoadMode::Common => 1,
            LoadMode::Grouped => 2,
            LoadMode::Individual | LoadMode::Waveform => 4,
        }
    }

    /// Duty values a frame must carry for `channel_count` configured channels.
    #[must_use]
    pub const fn frame_arity(self, channel_count: usize) -> usize {
        match self {
            LoadMode::Common => 1,
            LoadMode::Grouped => 2,
            LoadMode::Individual | LoadMode::Waveform => channel_count,
        }
    }

    /// Returns `true` when frames may carry their own countertop.
    #[must_use]
    pub const fn has_frame_countertop(self) -> bool {
        matches!(self, LoadMode::Waveform)
    }
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadMode::Common => f.write_str("common"),
            LoadMode::Grouped => f.write_str("grouped"),
            LoadMode::Individual => f.write_str("individual"),
            LoadMode::Waveform => f.write_str("waveform"),
        }
    }
}

/// PWM base clock derived from the 16 MHz peripheral clock.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum BaseClock {
    Mhz16,
    Mhz8,
    Mhz4,
    Mhz2,
    #[default]
    Mhz1,
    Khz500,
    Khz250,
    Khz125,
}

impl BaseClock {
    /// Clock frequency in hertz.
    #[must_use]
    pub const fn hz(self) -> u32 {
        16_000_000 >> self.prescaler_shift()
    }

    /// Power-of-two prescaler applied to the 16 MHz source.
    #[must_use]
    pub const fn prescaler_shift(self) -> u32 {
        match self {
            BaseClock::Mhz16 => 0,
            BaseClock::Mhz8 => 1,
            BaseClock::Mhz4 => 2,
            BaseClock::Mhz2 => 3,
            BaseClock::Mhz1 => 4,
            BaseClock::Khz500 => 5,
            BaseClock::Khz250 => 6,
            BaseClock::Khz125 => 7,
        }
    }
}

/// Counter direction for the PWM period.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum CounterMode {
    /// Edge-aligned: count up to the countertop and wrap.
    #[default]
    Up,
    /// Center-aligned: count up then down, doubling the period.
    UpAndDown,
}

/// Static configuration applied once when the device is brought up.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DeviceConfig {
    pub pins: [OutputPin; MAX_CHANNELS],
    pub channel_count: usize,
    pub base_clock: BaseClock,
    pub counter_mode: CounterMode,
    pub countertop: u16,
    pub load_mode: LoadMode,
}

impl DeviceConfig {
    /// Four independent channels sharing one countertop.
    #[must_use]
    pub const fn individual(pins: [OutputPin; MAX_CHANNELS], countertop: u16) -> Self {
        Self {
            pins,
            channel_count: MAX_CHANNELS,
            base_clock: BaseClock::Mhz1,
            counter_mode: CounterMode::Up,
            countertop,
            load_mode: LoadMode::Individual,
        }
    }

    /// Three channels with a countertop carried by every frame.
    ///
    /// The fourth pin slot is forced to [`OutputPin::NotConnected`].
    #[must_use]
    pub const fn waveform(pins: [OutputPin; MAX_CHANNELS], countertop: u16) -> Self {
        Self {
            pins: [pins[0], pins[1], pins[2], OutputPin::NotConnected],
            channel_count: MAX_WAVEFORM_CHANNELS,
            base_clock: BaseClock::Mhz1,
            counter_mode: CounterMode::Up,
            countertop,
            load_mode: LoadMode::Waveform,
        }
    }

    /// Replaces the base clock.
    #[must_use]
    pub const fn with_base_clock(mut self, base_clock: BaseClock) -> Self {
        self.base_clock = base_clock;
        self
    }

    /// Replaces the counter mode.
    #[must_use]
    pub const fn with_counter_mode(mut self, counter_mode: CounterMode) -> Self {
        self.counter_mode = counter_mode;
        self
    }

    /// Replaces the load mode and channel count.
    #[must_use]
    pub const fn with_load_mode(mut self, load_mode: LoadMode, channel_count: usize) -> Self {
        self.load_mode = load_mode;
        self.channel_count = channel_count;
        self
    }

    /// Duty values each frame must carry under this configuration.
    #[must_use]
    pub const fn frame_arity(&self) -> usize {
        self.load_mode.frame_arity(self.channel_count)
    }

    /// Configured pins for the active channels.
    #[must_use]
    pub fn active_pins(&self) -> &[OutputPin] {
        self.pins.get(..self.channel_count).unwrap_or(&self.pins)
    }

    /// PWM output frequency in millihertz for the device countertop.
    #[must_use]
    pub fn period_frequency_millihertz(&self) -> u64 {
        let ticks = match self.counter_mode {
            CounterMode::Up => u64::from(self.countertop),
            CounterMode::UpAndDown => 2 * u64::from(self.countertop),
        };
        (u64::from(self.base_clock.hz()) * 1_000)
            .checked_div(ticks)
            .unwrap_or(0)
    }

    /// Checks the configuration against the peripheral's limits.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_count == 0 {
            return Err(ConfigError::NoChannels);
        }
        if self.channel_count > MAX_CHANNELS {
            return Err(ConfigError::TooManyChannels(self.channel_count));
        }
        if self.load_mode == LoadMode::Waveform && self.channel_count > MAX_WAVEFORM_CHANNELS {
            return Err(ConfigError::WaveformChannelLimit(self.channel_count));
        }
        if self.countertop < MIN_COUNTERTOP || self.countertop > MAX_COUNTERTOP {
            return Err(ConfigError::CountertopOutOfRange(self.countertop));
        }

        let pins = self.active_pins();
        for (index, pin) in pins.iter().enumerate() {
            if let OutputPin::Connected(number) = pin
                && pins
                    .iter()
                    .skip(index + 1)
                    .any(|other| *other == OutputPin::Connected(*number))
            {
                return Err(ConfigError::DuplicatePin(*number));
            }
        }

        Ok(())
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::individual(DEFAULT_PINS, DEFAULT_COUNTERTOP)
    }
}

/// Reasons a device configuration is refused.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    NoChannels,
    TooManyChannels(usize),
    WaveformChannelLimit(usize),
    CountertopOutOfRange(u16),
    DuplicatePin(u8),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoChannels => f.write_str("no output channels configured"),
            ConfigError::TooManyChannels(count) => {
                write!(f, "{count} channels requested, at most {MAX_CHANNELS} available")
            }
            ConfigError::WaveformChannelLimit(count) => write!(
                f,
                "waveform load mode supports {MAX_WAVEFORM_CHANNELS} channels, got {count}"
            ),
            ConfigError::CountertopOutOfRange(top) => write!(
                f,
                "countertop {top} outside {MIN_COUNTERTOP}..={MAX_COUNTERTOP}"
            ),
            ConfigError::DuplicatePin(pin) => write!(f, "pin {pin} routed to multiple channels"),
        }
    }
}

impl core::error::Error for ConfigError {}

/// Failures reported by the device while accepting a command.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum HwError {
    /// Peripheral refused the request.
    Rejected,
    /// Bank exceeds what the peripheral can address.
    BufferTooLong { words: usize },
    /// Bank is not in memory the peripheral can read.
    BufferNotInRam,
    /// Peripheral did not acknowledge the task in time.
    Timeout,
    /// The request failed after the previous playback was halted, and that
    /// playback could not be resumed. Output is stopped.
    OutputStopped,
}

impl fmt::Display for HwError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HwError::Rejected => f.write_str("device rejected the request"),
            HwError::BufferTooLong { words } => write!(f, "bank of {words} words is too long"),
            HwError::BufferNotInRam => f.write_str("bank not in DMA-capable RAM"),
            HwError::Timeout => f.write_str("device timed out"),
            HwError::OutputStopped => f.write_str("device stopped output while switching banks"),
        }
    }
}

impl core::error::Error for HwError {}

/// One half of the double-buffered arena.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Bank {
    A,
    B,
}

impl Bank {
    /// The other bank.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Bank::A => Bank::B,
            Bank::B => Bank::A,
        }
    }

    /// Stable index (0 or 1).
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Bank::A => 0,
            Bank::B => 1,
        }
    }
}

/// Everything the device needs to begin free-running playback.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PlaybackRequest<'a> {
    pub words: &'a [u16],
    pub bank: Bank,
    pub load_mode: LoadMode,
    /// Extra PWM periods each frame is held for.
    pub refresh: u32,
    /// PWM periods of idle appended after each traversal.
    pub end_delay: u32,
    pub looping: bool,
}

impl PlaybackRequest<'_> {
    /// Number of frames contained in the request.
    #[must_use]
    pub const fn frame_count(&self) -> usize {
        self.words.len() / self.load_mode.words_per_frame()
    }
}

/// Capability exposed by a configured PWM instance.
pub trait PwmDevice {
    /// Starts playback of a committed bank. Returns once the request is issued.
    ///
    /// A failed submission leaves the previous playback running, except when
    /// the error is [`HwError::OutputStopped`].
    ///
    /// # Errors
    ///
    /// Returns [`HwError`] when the peripheral refuses the request.
    fn submit_playback(&mut self, request: &PlaybackRequest<'_>) -> Result<(), HwError>;

    /// Halts output at the end of the current PWM period.
    ///
    /// # Errors
    ///
    /// Returns [`HwError`] when the peripheral fails to stop.
    fn halt(&mut self) -> Result<(), HwError>;
}

impl<T: PwmDevice + ?Sized> PwmDevice for &mut T {
    fn submit_playback(&mut self, request: &PlaybackRequest<'_>) -> Result<(), HwError> {
        (**self).submit_playback(request)
    }

    fn halt(&mut self) -> Result<(), HwError> {
        (**self).halt()
    }
}

/// Snapshot of the last request a [`SimulatedPwm`] accepted.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubmittedPlayback {
    pub words: Vec<u16, MAX_BANK_WORDS>,
    pub bank: Bank,
    pub load_mode: LoadMode,
    pub refresh: u32,
    pub end_delay: u32,
    pub looping: bool,
}

/// In-memory device that records requests and can inject failures.
#[derive(Clone, Debug, Default)]
pub struct SimulatedPwm {
    running: bool,
    last: Option<SubmittedPlayback>,
    submissions: u32,
    halts: u32,
    fail_next_submit: Option<HwError>,
    fail_next_halt: Option<HwError>,
}

impl SimulatedPwm {
    /// Creates an idle simulated device.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            running: false,
            last: None,
            submissions: 0,
            halts: 0,
            fail_next_submit: None,
            fail_next_halt: None,
        }
    }

    /// Returns `true` while the simulated output is free running.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Last accepted playback request, if any.
    #[must_use]
    pub const fn last_playback(&self) -> Option<&SubmittedPlayback> {
        self.last.as_ref()
    }

    /// Number of accepted submissions.
    #[must_use]
    pub const fn submissions(&self) -> u32 {
        self.submissions
    }

    /// Number of accepted halts.
    #[must_use]
    pub const fn halts(&self) -> u32 {
        self.halts
    }

    /// Makes the next submission fail with `error`.
    pub fn fail_next_submit(&mut self, error: HwError) {
        self.fail_next_submit = Some(error);
    }

    /// Makes the next halt fail with `error`.
    pub fn fail_next_halt(&mut self, error: HwError) {
        self.fail_next_halt = Some(error);
    }
}

impl PwmDevice for SimulatedPwm {
    fn submit_playback(&mut self, request: &PlaybackRequest<'_>) -> Result<(), HwError> {
        if let Some(error) = self.fail_next_submit.take() {
            if error == HwError::OutputStopped {
                self.running = false;
            }
            return Err(error);
        }

        let words = Vec::from_slice(request.words).map_err(|_| HwError::BufferTooLong {
            words: request.words.len(),
        })?;

        self.last = Some(SubmittedPlayback {
            words,
            bank: request.bank,
            load_mode: request.load_mode,
            refresh: request.refresh,
            end_delay: request.end_delay,
            looping: request.looping,
        });
        self.running = true;
        self.submissions = self.submissions.saturating_add(1);
        Ok(())
    }

    fn halt(&mut self) -> Result<(), HwError> {
        if let Some(error) = self.fail_next_halt.take() {
            return Err(error);
        }

        self.running = false;
        self.halts = self.halts.saturating_add(1);
        Ok(())
    }
}
