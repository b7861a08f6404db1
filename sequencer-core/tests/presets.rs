use sequencer_core::device::{DEFAULT_PINS, DeviceConfig, LoadMode, MAX_BANK_WORDS};
use sequencer_core::duty::Polarity;
use sequencer_core::library::{SequenceId, SequenceLibrary, register_default_presets};
use sequencer_core::sequences::{
    BASIC_NAME, DILATING_NAME, MARCHING_NAME, MIXED_NAME, ValidationError, marching_sequence,
    mixed_sequence, sweep_sequence,
};

#[test]
fn default_presets_register_in_rotation_order() {
    let config = DeviceConfig::default();
    let mut library: SequenceLibrary = SequenceLibrary::new();
    register_default_presets(&mut library, &config).expect("presets fit");

    let names: Vec<&str> = library.iter().map(|(_, entry)| entry.name).collect();
    assert_eq!(names, [BASIC_NAME, DILATING_NAME, MARCHING_NAME, MIXED_NAME]);
    for (id, entry) in library.iter() {
        assert_eq!(entry.sequence.load_mode(), LoadMode::Individual);
        assert_eq!(entry.sequence.channel_count(), 4);
        assert!(entry.sequence.looping(), "{} should loop", entry.name);
        assert_eq!(library.name(id), Some(entry.name));
    }
}

#[test]
fn marching_frame_two_sits_on_channel_two() {
    let config = DeviceConfig::default();
    let sequence = marching_sequence(&config).expect("preset builds");
    let frame = sequence.frame_at(2).expect("four frames");

    let expected: Vec<(u16, Polarity)> = (0..4)
        .map(|channel| {
            if channel == 2 {
                (1_000, Polarity::Inverted)
            } else {
                (10_000, Polarity::Normal)
            }
        })
        .collect();
    let actual: Vec<(u16, Polarity)> = frame
        .duties()
        .iter()
        .map(|duty| (duty.magnitude(), duty.polarity()))
        .collect();
    assert_eq!(actual, expected);
}

#[test]
fn mixed_preset_lays_out_sixteen_words() {
    let config = DeviceConfig::default();
    let sequence = mixed_sequence(&config).expect("preset builds");
    let mut words = heapless::Vec::<u16, MAX_BANK_WORDS>::new();
    sequence.encode_into(&config, &mut words).expect("fits");

    assert_eq!(words.len(), 16);
    assert_eq!(&words[4..8], &[10_000, 0x8000 | 1_000, 10_000, 0x8000 | 5_000]);
}

#[test]
fn presets_refuse_mismatched_layouts() {
    let individual = DeviceConfig::default();
    assert_eq!(
        sweep_sequence(&individual).err(),
        Some(ValidationError::ChannelCountMismatch {
            frame: 0,
            expected: 4,
            found: 3
        })
    );

    let waveform = DeviceConfig::waveform(DEFAULT_PINS, 1_000);
    assert!(marching_sequence(&waveform).is_err());
}

#[test]
fn waveform_library_plays_sweep_words() {
    let config = DeviceConfig::waveform(DEFAULT_PINS, 1_000);
    let mut library: SequenceLibrary = SequenceLibrary::new();
    register_default_presets(&mut library, &config).expect("sweep fits");

    let sequence = library.get(SequenceId::new(0)).expect("registered");
    let mut words = heapless::Vec::<u16, MAX_BANK_WORDS>::new();
    sequence.encode_into(&config, &mut words).expect("fits");
    assert_eq!(&words[..4], &[500, 0x8000 | 500, 250, 1_000]);
    assert_eq!(&words[12..], &[125, 0x8000 | 125, 62, 250]);
}
