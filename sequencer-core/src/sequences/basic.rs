//! Single-frame preset holding four static duty fractions.
//!
//! A one-frame sequence is the steady-state case: the peripheral replays the
//! same row forever, so each channel settles at a fixed duty.

use crate::device::DeviceConfig;
use crate::duty::{DutyValue, Polarity};

use super::{Frame, Sequence, ValidationError, build_sequence};

/// Library name of the basic preset.
pub const BASIC_NAME: &str = "basic";

/// Frames of the basic preset for `countertop`.
#[must_use]
pub const fn basic_frames(countertop: u16) -> [Frame; 1] {
    [Frame::new([
        DutyValue::from_fraction(1, 10, Polarity::Inverted, countertop),
        DutyValue::from_fraction(1, 4, Polarity::Normal, countertop),
        DutyValue::from_fraction(1, 2, Polarity::Normal, countertop),
        DutyValue::from_fraction(1, 10, Polarity::Normal, countertop),
    ])]
}

/// Builds the basic preset against `config`.
///
/// # Errors
///
/// Fails when `config` is not a four-channel individual configuration.
pub fn basic_sequence(config: &DeviceConfig) -> Result<Sequence, ValidationError> {
    build_sequence(config, &basic_frames(config.countertop), true)
}
