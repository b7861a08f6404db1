use sequencer_core::duty::{DutyValue, MAX_COUNTERTOP, Polarity, decode, encode};

#[test]
fn decode_inverts_encode_within_countertop() {
    for top in [3u16, 100, 10_000, MAX_COUNTERTOP] {
        for magnitude in [0, 1, u32::from(top) / 3, u32::from(top) - 1, u32::from(top)] {
            for polarity in [Polarity::Normal, Polarity::Inverted] {
                let value = encode(magnitude, polarity, top);
                assert_eq!(
                    decode(value.raw()),
                    (magnitude as u16, polarity),
                    "top={top} magnitude={magnitude}"
                );
            }
        }
    }
}

#[test]
fn magnitudes_above_countertop_saturate() {
    for top in [3u16, 100, 10_000] {
        let value = encode(u32::from(top) + 1, Polarity::Inverted, top);
        assert_eq!(value.magnitude(), top);
        assert!(value.polarity().is_inverted());
    }
}

#[test]
fn reference_basic_patterns() {
    let top = 10_000;
    assert_eq!(DutyValue::inverted(1_000, top).raw(), 0x83E8);
    assert_eq!(DutyValue::normal(2_500, top).raw(), 0x09C4);
    assert_eq!(DutyValue::normal(5_000, top).raw(), 0x1388);
    assert_eq!(DutyValue::normal(1_000, top).raw(), 0x03E8);
}
