use core::time::Duration;

use sequencer_core::device::{DeviceConfig, SimulatedPwm};
use sequencer_core::library::{SequenceLibrary, register_default_presets};
use sequencer_core::playback::PlaybackController;
use sequencer_core::rotation::{RotationConfig, RotationDriver, StartPolicy, TickOutcome};
use sequencer_core::telemetry::{TelemetryEventKind, TelemetryInstant, TelemetryRecorder};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
struct Millis(u64);

impl TelemetryInstant for Millis {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

fn run(policy: StartPolicy, ticks: u64) -> (Vec<TickOutcome>, TelemetryRecorder<Millis, 32>) {
    let config = DeviceConfig::default();
    let mut library: SequenceLibrary = SequenceLibrary::new();
    register_default_presets(&mut library, &config).expect("presets fit");

    let mut controller =
        PlaybackController::new(SimulatedPwm::new(), config).expect("valid config");
    let mut telemetry = TelemetryRecorder::new();
    let rotation = RotationConfig::default().with_policy(policy);
    let mut driver = RotationDriver::new(rotation);

    let step = u64::try_from(rotation.tick_interval.as_millis()).expect("fits");
    let outcomes = (0..ticks)
        .map(|tick| driver.tick(&mut controller, &library, &mut telemetry, Millis(tick * step)))
        .collect();
    (outcomes, telemetry)
}

#[test]
fn four_entries_rotate_through_index_three() {
    let (outcomes, _) = run(StartPolicy::Replace, 9);
    let indices: Vec<usize> = outcomes
        .iter()
        .map(|outcome| match outcome {
            TickOutcome::Started(id) => id.index(),
            other => panic!("unexpected outcome {other:?}"),
        })
        .collect();
    assert_eq!(indices, [0, 1, 2, 3, 0, 1, 2, 3, 0]);
}

#[test]
fn reject_policy_logs_every_refusal() {
    let (outcomes, telemetry) = run(StartPolicy::Reject, 4);
    assert!(matches!(outcomes[0], TickOutcome::Started(_)));
    assert!(
        outcomes[1..]
            .iter()
            .all(|outcome| matches!(outcome, TickOutcome::Retained { .. }))
    );

    let events: Vec<u16> = telemetry
        .oldest_first()
        .map(|record| record.event.to_raw())
        .collect();
    assert_eq!(events, [0x0100, 0x0201, 0x0201, 0x0201]);
    assert!(matches!(
        telemetry.latest().map(|record| record.event),
        Some(TelemetryEventKind::StartRejected(_))
    ));
}

#[test]
fn default_cadence_matches_demo_loop() {
    let config = RotationConfig::default();
    assert_eq!(config.tick_interval, Duration::from_millis(50));
    assert_eq!(config.base_period_ticks, 1);
    assert_eq!(config.policy, StartPolicy::Replace);
}
