#![no_std]

// Portable core of the PWM sequencer.
//
// Everything here builds without the standard library so the firmware and the
// host emulator share one implementation of the codec, sequence model,
// playback controller and rotation driver.

pub mod device;
pub mod duty;
pub mod library;
pub mod playback;
pub mod rotation;
pub mod sequences;
pub mod telemetry;
