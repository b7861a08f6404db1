#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Compile-time configuration for the demo firmware.
//!
//! The board drives P0.28 to P0.31 from PWM0 at a 1 MHz base clock. Two
//! rotation cadences are available; the `slow-rotation` feature selects the
//! 2 s variant.

use core::time::Duration;

use sequencer_core::device::{DEFAULT_COUNTERTOP, DEFAULT_PINS, DeviceConfig};
use sequencer_core::rotation::{RotationConfig, StartPolicy};

/// Device layout used by both demo variants.
pub const DEVICE_CONFIG: DeviceConfig = DeviceConfig::individual(DEFAULT_PINS, DEFAULT_COUNTERTOP);

/// Rotation cadence presets.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DemoVariant {
    /// Advance every 50 ms, one PWM period per frame.
    Fast,
    /// Advance every 2 s, each frame held for 25 PWM periods.
    Slow,
}

impl DemoVariant {
    #[cfg(not(feature = "slow-rotation"))]
    pub const SELECTED: Self = DemoVariant::Fast;
    #[cfg(feature = "slow-rotation")]
    pub const SELECTED: Self = DemoVariant::Slow;

    pub const fn rotation(self) -> RotationConfig {
        match self {
            DemoVariant::Fast => RotationConfig::new()
                .with_tick_interval(Duration::from_millis(50))
                .with_base_period_ticks(1)
                .with_policy(StartPolicy::Replace),
            DemoVariant::Slow => RotationConfig::new()
                .with_tick_interval(Duration::from_secs(2))
                .with_base_period_ticks(25)
                .with_policy(StartPolicy::Replace),
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            DemoVariant::Fast => "fast",
            DemoVariant::Slow => "slow",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_config_is_valid() {
        assert_eq!(DEVICE_CONFIG.validate(), Ok(()));
        assert_eq!(DEVICE_CONFIG.period_frequency_millihertz(), 100_000);
    }

    #[test]
    fn variants_differ_only_in_cadence() {
        let fast = DemoVariant::Fast.rotation();
        let slow = DemoVariant::Slow.rotation();
        assert_eq!(fast.tick_interval, Duration::from_millis(50));
        assert_eq!(slow.tick_interval, Duration::from_secs(2));
        assert_eq!(fast.policy, slow.policy);
        assert!(slow.base_period_ticks > fast.base_period_ticks);
    }
}
