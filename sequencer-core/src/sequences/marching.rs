//! One-hot rotation: a short inverted pulse marches across the channels.

use crate::device::{DeviceConfig, MAX_CHANNELS};
use crate::duty::DutyValue;

use super::{Frame, Sequence, ValidationError, build_sequence};

/// Library name of the marching preset.
pub const MARCHING_NAME: &str = "marching";

/// Frames of the marching preset for `countertop`.
#[must_use]
pub const fn marching_frames(countertop: u16) -> [Frame; MAX_CHANNELS] {
    let full = DutyValue::normal(countertop as u32, countertop);
    let short = DutyValue::inverted((countertop / 10) as u32, countertop);

    let mut frames = [Frame::uniform(full, MAX_CHANNELS); MAX_CHANNELS];
    let mut index = 0;
    while index < MAX_CHANNELS {
        let mut duties = [full; MAX_CHANNELS];
        duties[index] = short;
        frames[index] = Frame::new(duties);
        index += 1;
    }
    frames
}

/// Builds the marching preset against `config`.
///
/// # Errors
///
/// Fails when `config` is not a four-channel individual configuration.
pub fn marching_sequence(config: &DeviceConfig) -> Result<Sequence, ValidationError> {
    build_sequence(config, &marching_frames(config.countertop), true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duty::Polarity;

    #[test]
    fn frame_two_pulses_channel_two() {
        let frames = marching_frames(10_000);
        for (channel, duty) in frames[2].duties().iter().enumerate() {
            if channel == 2 {
                assert_eq!(duty.magnitude(), 1_000);
                assert_eq!(duty.polarity(), Polarity::Inverted);
            } else {
                assert_eq!(duty.magnitude(), 10_000);
                assert_eq!(duty.polarity(), Polarity::Normal);
            }
        }
    }
}
