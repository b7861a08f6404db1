//! Frame and sequence model shared by firmware and host targets.
//!
//! A [`Frame`] is one row of per-channel duty values; a [`Sequence`] is a
//! validated, immutable list of frames plus the parameters the peripheral
//! needs to play it back. Sequences are validated against a
//! [`DeviceConfig`] once, when they are built, so the playback controller
//! only has to lay the frames out in device memory.
//!
//! Everything in this module is `no_std` friendly; preset tables live in the
//! submodules and can be built in `const` contexts.

use core::fmt;

use heapless::Vec;

use crate::device::{DeviceConfig, LoadMode, MAX_BANK_WORDS, MAX_CHANNELS};
use crate::duty::{DutyValue, MAX_COUNTERTOP};

pub mod basic;
pub mod dilating;
pub mod marching;
pub mod mixed;
pub mod sweep;

pub use basic::{BASIC_NAME, basic_frames, basic_sequence};
pub use dilating::{DILATING_NAME, dilating_frames, dilating_sequence};
pub use marching::{MARCHING_NAME, marching_frames, marching_sequence};
pub use mixed::{MIXED_NAME, mixed_frames, mixed_sequence};
pub use sweep::{SWEEP_NAME, sweep_frames, sweep_sequence};

/// Longest sequence the controller can commit in one bank.
pub const MAX_SEQUENCE_FRAMES: usize = 16;

/// One row of duty values applied for one refresh interval.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Frame {
    cells: [DutyValue; MAX_CHANNELS],
    len: usize,
    countertop: Option<u16>,
}

impl Frame {
    /// Creates a frame from one duty value per channel.
    #[must_use]
    pub const fn new<const N: usize>(duties: [DutyValue; N]) -> Self {
        const { assert!(N <= MAX_CHANNELS, "a frame holds at most four channels") };

        let mut cells = [DutyValue::ZERO; MAX_CHANNELS];
        let mut index = 0;
        while index < N {
            cells[index] = duties[index];
            index += 1;
        }

        Self {
            cells,
            len: N,
            countertop: None,
        }
    }

    /// Creates a frame from a runtime slice of duty values.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TooManyChannels`] when more than
    /// [`MAX_CHANNELS`] values are supplied.
    pub fn from_slice(duties: &[DutyValue]) -> Result<Self, ValidationError> {
        let mut cells = [DutyValue::ZERO; MAX_CHANNELS];
        let target = cells
            .get_mut(..duties.len())
            .ok_or(ValidationError::TooManyChannels {
                found: duties.len(),
            })?;
        target.copy_from_slice(duties);

        Ok(Self {
            cells,
            len: duties.len(),
            countertop: None,
        })
    }

    /// Frame with `channels` copies of the same duty value.
    #[must_use]
    pub const fn uniform(value: DutyValue, channels: usize) -> Self {
        let len = if channels > MAX_CHANNELS {
            MAX_CHANNELS
        } else {
            channels
        };
        let mut cells = [DutyValue::ZERO; MAX_CHANNELS];
        let mut index = 0;
        while index < len {
            cells[index] = value;
            index += 1;
        }

        Self {
            cells,
            len,
            countertop: None,
        }
    }

    /// Attaches a frame-local countertop (waveform load mode only).
    #[must_use]
    pub const fn with_countertop(mut self, countertop: u16) -> Self {
        self.countertop = Some(countertop);
        self
    }

    /// Number of channels the frame carries.
    #[must_use]
    pub const fn channel_count(&self) -> usize {
        self.len
    }

    /// Duty values in channel order.
    #[must_use]
    pub fn duties(&self) -> &[DutyValue] {
        self.cells.get(..self.len).unwrap_or(&self.cells)
    }

    /// Duty value for one channel.
    #[must_use]
    pub fn duty(&self, channel: usize) -> Option<DutyValue> {
        self.duties().get(channel).copied()
    }

    /// Frame-local countertop, if declared.
    #[must_use]
    pub const fn countertop(&self) -> Option<u16> {
        self.countertop
    }

    /// Countertop that bounds this frame on a device configured with `device_countertop`.
    #[must_use]
    pub const fn effective_countertop(&self, device_countertop: u16) -> u16 {
        match self.countertop {
            Some(top) => top,
            None => device_countertop,
        }
    }
}

/// Reasons a sequence fails validation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ValidationError {
    EmptySequence,
    TooManyFrames { count: usize },
    TooManyChannels { found: usize },
    ChannelCountMismatch {
        frame: usize,
        expected: usize,
        found: usize,
    },
    ZeroCountertop { frame: usize },
    CountertopOutOfRange { frame: usize, countertop: u16 },
    UnexpectedCountertop { frame: usize },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptySequence => f.write_str("sequence has no frames"),
            ValidationError::TooManyFrames { count } => write!(
                f,
                "sequence has {count} frames, at most {MAX_SEQUENCE_FRAMES} fit"
            ),
            ValidationError::TooManyChannels { found } => {
                write!(f, "frame has {found} channels, at most {MAX_CHANNELS} fit")
            }
            ValidationError::ChannelCountMismatch {
                frame,
                expected,
                found,
            } => write!(
                f,
                "frame {frame} has {found} channels, device expects {expected}"
            ),
            ValidationError::ZeroCountertop { frame } => {
                write!(f, "frame {frame} declares a zero countertop")
            }
            ValidationError::CountertopOutOfRange { frame, countertop } => write!(
                f,
                "frame {frame} countertop {countertop} exceeds {MAX_COUNTERTOP}"
            ),
            ValidationError::UnexpectedCountertop { frame } => write!(
                f,
                "frame {frame} declares a countertop outside waveform load mode"
            ),
        }
    }
}

impl core::error::Error for ValidationError {}

/// Validated, immutable list of frames plus playback parameters.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Sequence {
    frames: Vec<Frame, MAX_SEQUENCE_FRAMES>,
    load_mode: LoadMode,
    channel_count: usize,
    end_delay: u32,
    looping: bool,
}

impl Sequence {
    /// Validates `frames` against `config` and builds a sequence.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found, scanning frames in order.
    pub fn build(
        config: &DeviceConfig,
        frames: &[Frame],
        looping: bool,
    ) -> Result<Self, ValidationError> {
        if frames.is_empty() {
            return Err(ValidationError::EmptySequence);
        }

        let expected = config.frame_arity();
        for (index, frame) in frames.iter().enumerate() {
            validate_frame(index, frame, expected, config.load_mode)?;
        }

        let frames = Vec::from_slice(frames).map_err(|_| ValidationError::TooManyFrames {
            count: frames.len(),
        })?;

        Ok(Self {
            frames,
            load_mode: config.load_mode,
            channel_count: config.channel_count,
            end_delay: 0,
            looping,
        })
    }

    /// Appends `end_delay` idle PWM periods after each traversal.
    #[must_use]
    pub fn with_end_delay(mut self, end_delay: u32) -> Self {
        self.end_delay = end_delay;
        self
    }

    /// Number of frames in the sequence.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Frame at `index`, if present.
    #[must_use]
    pub fn frame_at(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    /// All frames in playback order.
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Whether playback wraps back to the first frame.
    #[must_use]
    pub const fn looping(&self) -> bool {
        self.looping
    }

    /// Idle PWM periods appended after each traversal.
    #[must_use]
    pub const fn end_delay(&self) -> u32 {
        self.end_delay
    }

    /// Load mode the sequence was validated against.
    #[must_use]
    pub const fn load_mode(&self) -> LoadMode {
        self.load_mode
    }

    /// Channel count the sequence was validated against.
    #[must_use]
    pub const fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// Returns `true` when the sequence can play on a device configured as `config`.
    #[must_use]
    pub fn fits(&self, config: &DeviceConfig) -> bool {
        self.load_mode == config.load_mode && self.channel_count == config.channel_count
    }

    /// Lays the frames out in the peripheral's sequence memory format.
    ///
    /// `words` is cleared first. Every magnitude is saturated to the frame's
    /// effective countertop and unused channel cells are written as zero.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TooManyFrames`] if the layout does not fit.
    pub fn encode_into(
        &self,
        config: &DeviceConfig,
        words: &mut Vec<u16, MAX_BANK_WORDS>,
    ) -> Result<(), ValidationError> {
        words.clear();
        let overflow = ValidationError::TooManyFrames {
            count: self.frames.len(),
        };

        for frame in &self.frames {
            let top = frame.effective_countertop(config.countertop);
            let cell = |channel: usize| {
                frame
                    .duty(channel)
                    .map_or(0, |duty| duty.clamped_to(top).raw())
            };

            match self.load_mode {
                LoadMode::Common => {
                    words.push(cell(0)).map_err(|_| overflow)?;
                }
                LoadMode::Grouped => {
                    for channel in 0..2 {
                        words.push(cell(channel)).map_err(|_| overflow)?;
                    }
                }
                LoadMode::Individual => {
                    for channel in 0..MAX_CHANNELS {
                        words.push(cell(channel)).map_err(|_| overflow)?;
                    }
                }
                LoadMode::Waveform => {
                    for channel in 0..MAX_CHANNELS - 1 {
                        words.push(cell(channel)).map_err(|_| overflow)?;
                    }
                    words.push(top & MAX_COUNTERTOP).map_err(|_| overflow)?;
                }
            }
        }

        Ok(())
    }
}

/// Validates `frames` against `config` and builds a sequence.
///
/// # Errors
///
/// See [`Sequence::build`].
pub fn build_sequence(
    config: &DeviceConfig,
    frames: &[Frame],
    looping: bool,
) -> Result<Sequence, ValidationError> {
    Sequence::build(config, frames, looping)
}

fn validate_frame(
    index: usize,
    frame: &Frame,
    expected: usize,
    load_mode: LoadMode,
) -> Result<(), ValidationError> {
    if frame.channel_count() != expected {
        return Err(ValidationError::ChannelCountMismatch {
            frame: index,
            expected,
            found: frame.channel_count(),
        });
    }

    match (load_mode.has_frame_countertop(), frame.countertop()) {
        (true, Some(0)) => Err(ValidationError::ZeroCountertop { frame: index }),
        (true, Some(top)) if top > MAX_COUNTERTOP => {
            Err(ValidationError::CountertopOutOfRange {
                frame: index,
                countertop: top,
            })
        }
        (false, Some(_)) => Err(ValidationError::UnexpectedCountertop { frame: index }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DEFAULT_PINS, DeviceConfig};
    use crate::duty::Polarity;

    const TOP: u16 = 1_000;

    fn config() -> DeviceConfig {
        DeviceConfig::individual(DEFAULT_PINS, TOP)
    }

    #[test]
    fn empty_sequence_is_rejected() {
        assert_eq!(
            build_sequence(&config(), &[], true),
            Err(ValidationError::EmptySequence)
        );
    }

    #[test]
    fn short_frame_is_rejected() {
        let frames = [
            Frame::uniform(DutyValue::normal(10, TOP), 4),
            Frame::new([DutyValue::normal(10, TOP); 3]),
        ];
        assert_eq!(
            build_sequence(&config(), &frames, true),
            Err(ValidationError::ChannelCountMismatch {
                frame: 1,
                expected: 4,
                found: 3
            })
        );
    }

    #[test]
    fn countertop_outside_waveform_is_rejected() {
        let frames = [Frame::uniform(DutyValue::ZERO, 4).with_countertop(500)];
        assert_eq!(
            build_sequence(&config(), &frames, false),
            Err(ValidationError::UnexpectedCountertop { frame: 0 })
        );
    }

    #[test]
    fn waveform_rejects_zero_countertop() {
        let config = DeviceConfig::waveform(DEFAULT_PINS, TOP);
        let frames = [
            Frame::uniform(DutyValue::ZERO, 3).with_countertop(500),
            Frame::uniform(DutyValue::ZERO, 3).with_countertop(0),
        ];
        assert_eq!(
            build_sequence(&config, &frames, true),
            Err(ValidationError::ZeroCountertop { frame: 1 })
        );
    }

    #[test]
    fn too_many_frames_are_rejected() {
        let frames = [Frame::uniform(DutyValue::ZERO, 4); MAX_SEQUENCE_FRAMES + 1];
        assert_eq!(
            build_sequence(&config(), &frames, true),
            Err(ValidationError::TooManyFrames {
                count: MAX_SEQUENCE_FRAMES + 1
            })
        );
    }

    #[test]
    fn from_slice_rejects_wide_frames() {
        let duties = [DutyValue::ZERO; MAX_CHANNELS + 1];
        assert_eq!(
            Frame::from_slice(&duties),
            Err(ValidationError::TooManyChannels { found: 5 })
        );
    }

    #[test]
    fn individual_layout_pads_missing_channels() {
        let config = config().with_load_mode(LoadMode::Individual, 3);
        let frames = [Frame::new([
            DutyValue::normal(1, TOP),
            DutyValue::inverted(2, TOP),
            DutyValue::normal(3, TOP),
        ])];
        let sequence = build_sequence(&config, &frames, true).expect("valid sequence");

        let mut words = Vec::new();
        sequence.encode_into(&config, &mut words).expect("fits");
        assert_eq!(words.as_slice(), &[1, 0x8002, 3, 0]);
    }

    #[test]
    fn waveform_layout_appends_frame_countertop() {
        let config = DeviceConfig::waveform(DEFAULT_PINS, TOP);
        let frames = [
            Frame::new([
                DutyValue::normal(400, TOP),
                DutyValue::inverted(900, TOP),
                DutyValue::normal(100, TOP),
            ])
            .with_countertop(500),
            Frame::uniform(DutyValue::normal(250, TOP), 3),
        ];
        let sequence = build_sequence(&config, &frames, true).expect("valid sequence");

        let mut words = Vec::new();
        sequence.encode_into(&config, &mut words).expect("fits");
        assert_eq!(
            words.as_slice(),
            &[400, 0x8000 | 500, 100, 500, 250, 250, 250, TOP]
        );
    }

    #[test]
    fn common_and_grouped_layouts_use_fewer_words() {
        let common = config().with_load_mode(LoadMode::Common, 4);
        let frames = [Frame::new([DutyValue::encode(
            2_000,
            Polarity::Normal,
            u16::MAX,
        )])];
        let sequence = build_sequence(&common, &frames, false).expect("valid sequence");
        let mut words = Vec::new();
        sequence.encode_into(&common, &mut words).expect("fits");
        assert_eq!(words.as_slice(), &[TOP]);

        let grouped = config().with_load_mode(LoadMode::Grouped, 4);
        let frames = [Frame::new([
            DutyValue::normal(10, TOP),
            DutyValue::inverted(20, TOP),
        ])];
        let sequence = build_sequence(&grouped, &frames, false).expect("valid sequence");
        sequence.encode_into(&grouped, &mut words).expect("fits");
        assert_eq!(words.as_slice(), &[10, 0x8014]);
    }

    #[test]
    fn sequence_reports_fit_and_parameters() {
        let frames = [Frame::uniform(DutyValue::normal(5, TOP), 4)];
        let sequence = build_sequence(&config(), &frames, true)
            .expect("valid sequence")
            .with_end_delay(3);

        assert_eq!(sequence.frame_count(), 1);
        assert!(sequence.looping());
        assert_eq!(sequence.end_delay(), 3);
        assert!(sequence.fits(&config()));
        assert!(!sequence.fits(&DeviceConfig::waveform(DEFAULT_PINS, TOP)));
        assert!(sequence.frame_at(1).is_none());
    }
}
