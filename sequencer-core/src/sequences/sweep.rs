//! Waveform preset: the countertop shrinks frame over frame.
//!
//! Each frame carries its own countertop, so the PWM frequency rises across
//! the sequence while the duty fractions stay put.

use crate::device::{DeviceConfig, MAX_WAVEFORM_CHANNELS};
use crate::duty::{DutyValue, Polarity};

use super::{Frame, Sequence, ValidationError, build_sequence};

/// Library name of the sweep preset.
pub const SWEEP_NAME: &str = "sweep";

const STEPS: usize = 4;
const STEP_DIVISOR: u32 = 4;

/// Frames of the sweep preset starting at `countertop`.
#[must_use]
pub const fn sweep_frames(countertop: u16) -> [Frame; STEPS] {
    let mut frames = [Frame::uniform(DutyValue::ZERO, MAX_WAVEFORM_CHANNELS); STEPS];
    let mut step = 0;
    let mut remaining = STEP_DIVISOR;
    while step < STEPS {
        let top = sweep_countertop(countertop, remaining);
        frames[step] = Frame::new([
            DutyValue::from_fraction(1, 2, Polarity::Normal, top),
            DutyValue::from_fraction(1, 2, Polarity::Inverted, top),
            DutyValue::from_fraction(1, 4, Polarity::Normal, top),
        ])
        .with_countertop(top);
        step += 1;
        remaining -= 1;
    }
    frames
}

/// `remaining / STEP_DIVISOR` of `countertop`, never below 1.
const fn sweep_countertop(countertop: u16, remaining: u32) -> u16 {
    let scaled =
        DutyValue::from_fraction(remaining, STEP_DIVISOR, Polarity::Normal, countertop).magnitude();
    if scaled == 0 { 1 } else { scaled }
}

/// Builds the sweep preset against `config`.
///
/// # Errors
///
/// Fails when `config` is not a three-channel waveform configuration.
pub fn sweep_sequence(config: &DeviceConfig) -> Result<Sequence, ValidationError> {
    build_sequence(config, &sweep_frames(config.countertop), true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DEFAULT_PINS;

    #[test]
    fn countertop_shrinks_each_frame() {
        let frames = sweep_frames(1_000);
        let tops = [
            frames[0].countertop(),
            frames[1].countertop(),
            frames[2].countertop(),
            frames[3].countertop(),
        ];
        assert_eq!(tops, [Some(1_000), Some(750), Some(500), Some(250)]);
        assert_eq!(frames[3].duties()[0].magnitude(), 125);
        assert!(frames[3].duties()[1].polarity().is_inverted());
    }

    #[test]
    fn sweep_requires_waveform_config() {
        assert!(sweep_sequence(&DeviceConfig::waveform(DEFAULT_PINS, 1_000)).is_ok());
        assert!(sweep_sequence(&DeviceConfig::default()).is_err());
    }
}
