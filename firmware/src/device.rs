//! `PwmDevice` backed by the nRF52840 PWM0 sequencer.
//!
//! Each bank is copied into a `'static` RAM buffer before EasyDMA is pointed
//! at it. The HAL's sequencer halts the peripheral when dropped, so a started
//! sequencer is forgotten and stopped explicitly on the next halt.
//!
//! Every request is checked before the running bank is halted. If the HAL
//! still refuses the new bank, the previous one is restarted; only when that
//! also fails does the device report [`HwError::OutputStopped`].

use embassy_nrf::pwm::{
    self, CounterMode as NrfCounterMode, Prescaler, SequenceConfig, SequenceLoad, SequencePwm,
    SingleSequenceMode, SingleSequencer,
};
use sequencer_core::device::{
    Bank, CounterMode, DeviceConfig, HwError, LoadMode, MAX_BANK_WORDS, PlaybackRequest,
    PwmDevice,
};

use crate::handover::{check_request, failed_start};

/// RAM buffer EasyDMA reads one bank from.
pub type DmaBank = [u16; MAX_BANK_WORDS];

/// Translates the device configuration into the HAL's PWM configuration.
#[allow(clippy::field_reassign_with_default)]
pub fn pwm_config(config: &DeviceConfig) -> pwm::Config {
    let mut pwm_config = pwm::Config::default();
    pwm_config.prescaler = match config.base_clock.prescaler_shift() {
        0 => Prescaler::Div1,
        1 => Prescaler::Div2,
        2 => Prescaler::Div4,
        3 => Prescaler::Div8,
        4 => Prescaler::Div16,
        5 => Prescaler::Div32,
        6 => Prescaler::Div64,
        _ => Prescaler::Div128,
    };
    pwm_config.counter_mode = match config.counter_mode {
        CounterMode::Up => NrfCounterMode::Up,
        CounterMode::UpAndDown => NrfCounterMode::UpAndDown,
    };
    pwm_config.sequence_load = sequence_load(config.load_mode);
    pwm_config.max_duty = config.countertop;
    pwm_config
}

fn sequence_load(mode: LoadMode) -> SequenceLoad {
    match mode {
        LoadMode::Common => SequenceLoad::Common,
        LoadMode::Grouped => SequenceLoad::Grouped,
        LoadMode::Individual => SequenceLoad::Individual,
        LoadMode::Waveform => SequenceLoad::Waveform,
    }
}

fn map_error(error: pwm::Error, words: usize) -> HwError {
    match error {
        pwm::Error::SequenceTooLong => HwError::BufferTooLong { words },
        pwm::Error::BufferNotInRAM => HwError::BufferNotInRam,
        _ => HwError::Rejected,
    }
}

/// Bank and playback parameters the peripheral was last started with.
#[derive(Copy, Clone)]
struct Loaded {
    bank: Bank,
    len: usize,
    refresh: u32,
    end_delay: u32,
    looping: bool,
}

/// PWM0 driven through the HAL's single-sequence player.
pub struct NrfPwmDevice {
    pwm: SequencePwm<'static>,
    banks: [&'static mut DmaBank; 2],
    load_mode: LoadMode,
    loaded: Option<Loaded>,
}

impl NrfPwmDevice {
    pub fn new(
        pwm: SequencePwm<'static>,
        banks: [&'static mut DmaBank; 2],
        load_mode: LoadMode,
    ) -> Self {
        Self {
            pwm,
            banks,
            load_mode,
            loaded: None,
        }
    }

    fn stop_running(&mut self) {
        if self.loaded.take().is_some() {
            SingleSequencer::new(&mut self.pwm, &[], SequenceConfig::default()).stop();
        }
    }

    #[allow(clippy::field_reassign_with_default)]
    fn play(&mut self, loaded: Loaded) -> Result<(), pwm::Error> {
        let mut seq_config = SequenceConfig::default();
        seq_config.refresh = loaded.refresh;
        seq_config.end_delay = loaded.end_delay;

        let mode = if loaded.looping {
            SingleSequenceMode::Infinite
        } else {
            SingleSequenceMode::Times(1)
        };
        let words = &self.banks[loaded.bank.index()][..loaded.len];
        let sequencer = SingleSequencer::new(&mut self.pwm, words, seq_config);
        sequencer.start(mode)?;
        core::mem::forget(sequencer);

        self.loaded = Some(loaded);
        Ok(())
    }
}

impl PwmDevice for NrfPwmDevice {
    fn submit_playback(&mut self, request: &PlaybackRequest<'_>) -> Result<(), HwError> {
        let previous = self.loaded;
        check_request(request, self.load_mode, previous.map(|loaded| loaded.bank))?;

        let len = request.words.len();
        self.stop_running();
        self.banks[request.bank.index()][..len].copy_from_slice(request.words);

        let next = Loaded {
            bank: request.bank,
            len,
            refresh: request.refresh,
            end_delay: request.end_delay,
            looping: request.looping,
        };
        let Err(error) = self.play(next) else {
            return Ok(());
        };
        let resumed = previous.is_some_and(|previous| self.play(previous).is_ok());
        Err(failed_start(map_error(error, len), previous.is_some(), resumed))
    }

    fn halt(&mut self) -> Result<(), HwError> {
        self.stop_running();
        Ok(())
    }
}
