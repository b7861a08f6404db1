use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_nrf::pwm::SequencePwm;
use static_cell::StaticCell;

use crate::config::{DEVICE_CONFIG, DemoVariant};
use crate::device::{DmaBank, NrfPwmDevice, pwm_config};
use crate::telemetry::FirmwareTelemetry;
use sequencer_core::device::MAX_BANK_WORDS;
use sequencer_core::library::{SequenceLibrary, register_default_presets};
use sequencer_core::playback::PlaybackController;
use sequencer_core::rotation::RotationDriver;

mod rotation_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

pub(super) type FirmwareLibrary = SequenceLibrary;

static BANK_A: StaticCell<DmaBank> = StaticCell::new();
static BANK_B: StaticCell<DmaBank> = StaticCell::new();
static LIBRARY: StaticCell<FirmwareLibrary> = StaticCell::new();

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let p = embassy_nrf::init(Default::default());
    let variant = DemoVariant::SELECTED;
    defmt::info!(
        "nrf-pwm-sequencer: {} rotation, {} channel(s), load={}",
        variant.label(),
        DEVICE_CONFIG.channel_count,
        defmt::Display2Format(&DEVICE_CONFIG.load_mode)
    );

    let pwm = SequencePwm::new_4ch(
        p.PWM0,
        p.P0_28,
        p.P0_29,
        p.P0_30,
        p.P0_31,
        pwm_config(&DEVICE_CONFIG),
    )
    .expect("PWM0 configuration rejected");
    let banks = [
        BANK_A.init([0; MAX_BANK_WORDS]),
        BANK_B.init([0; MAX_BANK_WORDS]),
    ];
    let device = NrfPwmDevice::new(pwm, banks, DEVICE_CONFIG.load_mode);

    let controller =
        PlaybackController::new(device, DEVICE_CONFIG).expect("device configuration invalid");

    let library = LIBRARY.init(SequenceLibrary::new());
    let registered =
        register_default_presets(library, &DEVICE_CONFIG).expect("preset registration");
    defmt::info!("registered {} preset(s)", registered);

    spawner
        .spawn(rotation_task::run(
            controller,
            library,
            RotationDriver::new(variant.rotation()),
            FirmwareTelemetry::new(),
        ))
        .expect("failed to spawn rotation task");

    core::future::pending::<()>().await;
}
