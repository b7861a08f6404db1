#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Rules for handing a new bank to the PWM peripheral.
//!
//! The running bank has to be halted before the HAL accepts another one, so
//! everything that can be checked up front is checked before that halt.

use sequencer_core::device::{Bank, HwError, LoadMode, MAX_BANK_WORDS, PlaybackRequest};

/// Validates `request` against the configured layout and the playing bank.
///
/// # Errors
///
/// Returns [`HwError::BufferTooLong`] for banks past the DMA buffer and
/// [`HwError::Rejected`] for empty banks, a foreign load mode, or a request
/// that targets the bank being played.
pub fn check_request(
    request: &PlaybackRequest<'_>,
    load_mode: LoadMode,
    playing: Option<Bank>,
) -> Result<(), HwError> {
    let words = request.words.len();
    if words > MAX_BANK_WORDS {
        return Err(HwError::BufferTooLong { words });
    }
    if words == 0 || request.load_mode != load_mode || playing == Some(request.bank) {
        return Err(HwError::Rejected);
    }
    Ok(())
}

/// Error reported when the HAL refused the new bank with `error`.
///
/// The caller already halted the previous bank and tried to restart it;
/// output is only known to be stopped when that restart failed.
pub fn failed_start(error: HwError, had_previous: bool, resumed: bool) -> HwError {
    if had_previous && !resumed {
        HwError::OutputStopped
    } else {
        error
    }
}
