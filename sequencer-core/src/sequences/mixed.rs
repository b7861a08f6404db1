//! Marching variant that drives a short and a long pulse in the same frame.

use crate::device::{DeviceConfig, MAX_CHANNELS};
use crate::duty::DutyValue;

use super::{Frame, Sequence, ValidationError, build_sequence};

/// Library name of the mixed pulse width preset.
pub const MIXED_NAME: &str = "mixed";

/// Frames of the mixed preset for `countertop`.
///
/// Frame `f` gives channel `f` a short pulse and channel `(f + 2) % 4` a long one.
#[must_use]
pub const fn mixed_frames(countertop: u16) -> [Frame; MAX_CHANNELS] {
    let full = DutyValue::normal(countertop as u32, countertop);
    let short = DutyValue::inverted((countertop / 10) as u32, countertop);
    let long = DutyValue::inverted((countertop / 2) as u32, countertop);

    let mut frames = [Frame::uniform(full, MAX_CHANNELS); MAX_CHANNELS];
    let mut index = 0;
    while index < MAX_CHANNELS {
        let mut duties = [full; MAX_CHANNELS];
        duties[index] = short;
        duties[(index + 2) % MAX_CHANNELS] = long;
        frames[index] = Frame::new(duties);
        index += 1;
    }
    frames
}

/// Builds the mixed preset against `config`.
///
/// # Errors
///
/// Fails when `config` is not a four-channel individual configuration.
pub fn mixed_sequence(config: &DeviceConfig) -> Result<Sequence, ValidationError> {
    build_sequence(config, &mixed_frames(config.countertop), true)
}
