use embassy_time::{Duration, Timer};
use sequencer_core::playback::PlaybackController;
use sequencer_core::rotation::{RotationDriver, TickOutcome};

use super::FirmwareLibrary;
use crate::device::NrfPwmDevice;
use crate::status::STATUS;
use crate::telemetry::{FirmwareInstant, FirmwareTelemetry, log_record};

#[embassy_executor::task]
pub async fn run(
    mut controller: PlaybackController<NrfPwmDevice>,
    library: &'static FirmwareLibrary,
    mut driver: RotationDriver,
    mut telemetry: FirmwareTelemetry,
) -> ! {
    let micros = driver.config().tick_interval.as_micros();
    let interval = Duration::from_micros(u64::try_from(micros).unwrap_or(u64::MAX));

    loop {
        let outcome = driver.tick(
            &mut controller,
            library,
            &mut telemetry,
            FirmwareInstant::now(),
        );
        STATUS.record_outcome(&outcome);
        match outcome {
            TickOutcome::EmptyLibrary => defmt::warn!("rotation: library is empty"),
            TickOutcome::Started(_) | TickOutcome::Retained { .. } => {
                if let Some(record) = telemetry.latest() {
                    log_record(record);
                }
            }
        }

        Timer::after(interval).await;
    }
}
