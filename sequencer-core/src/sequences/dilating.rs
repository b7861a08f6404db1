//! Preset whose pulses widen frame over frame.
//!
//! Channels 0 and 1 pair on the full countertop, channels 2 and 3 on half of
//! it. Frame `k` places each channel's transition at `(k + 1) / 4` of its
//! cycle, and odd channels run inverted so each pair mirrors the other.

use crate::device::{DeviceConfig, MAX_CHANNELS};
use crate::duty::{DutyValue, Polarity};

use super::{Frame, Sequence, ValidationError, build_sequence};

/// Library name of the dilating preset.
pub const DILATING_NAME: &str = "dilating";

const STEPS: usize = 4;
const STEP_DIVISOR: u32 = 4;

/// Frames of the dilating preset for `countertop`.
#[must_use]
pub const fn dilating_frames(countertop: u16) -> [Frame; STEPS] {
    let cycle = [
        countertop as u32,
        countertop as u32,
        (countertop / 2) as u32,
        (countertop / 2) as u32,
    ];

    let mut frames = [Frame::uniform(DutyValue::ZERO, MAX_CHANNELS); STEPS];
    let mut step = 0;
    let mut numerator: u32 = 1;
    while step < STEPS {
        let mut duties = [DutyValue::ZERO; MAX_CHANNELS];
        let mut channel = 0;
        while channel < MAX_CHANNELS {
            let polarity = if channel % 2 == 1 {
                Polarity::Inverted
            } else {
                Polarity::Normal
            };
            duties[channel] = DutyValue::encode(
                cycle[channel] * numerator / STEP_DIVISOR,
                polarity,
                countertop,
            );
            channel += 1;
        }
        frames[step] = Frame::new(duties);
        step += 1;
        numerator += 1;
    }
    frames
}

/// Builds the dilating preset against `config`.
///
/// # Errors
///
/// Fails when `config` is not a four-channel individual configuration.
pub fn dilating_sequence(config: &DeviceConfig) -> Result<Sequence, ValidationError> {
    build_sequence(config, &dilating_frames(config.countertop), true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pulses_widen_every_frame() {
        let frames = dilating_frames(1_000);
        let channel0: [u16; STEPS] = [
            frames[0].duties()[0].magnitude(),
            frames[1].duties()[0].magnitude(),
            frames[2].duties()[0].magnitude(),
            frames[3].duties()[0].magnitude(),
        ];
        assert_eq!(channel0, [250, 500, 750, 1_000]);

        let last = frames[3].duties();
        assert_eq!(last[2].magnitude(), 500);
        assert!(last[1].polarity().is_inverted());
        assert!(!last[2].polarity().is_inverted());
        assert!(last[3].polarity().is_inverted());
    }
}
