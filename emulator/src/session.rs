use std::time::Duration;

use sequencer_core::device::{
    DEFAULT_COUNTERTOP, DEFAULT_PINS, DeviceConfig, HwError, SimulatedPwm,
};
use sequencer_core::duty::DutyValue;
use sequencer_core::library::{
    LibraryError, PresetError, SequenceId, SequenceLibrary, register_default_presets,
};
use sequencer_core::playback::PlaybackController;
use sequencer_core::rotation::{RotationConfig, RotationDriver, StartPolicy, TickOutcome};
use sequencer_core::sequences::Sequence;
use sequencer_core::telemetry::{EventId, TelemetryInstant, TelemetryRecorder};

use crate::grammar::{Command, FaultTarget, Target, parse_command};

/// Columns drawn per frame by `render`.
const RENDER_COLUMNS: usize = 16;

/// Countertop used by the waveform profile.
const WAVEFORM_COUNTERTOP: u16 = 1_000;

pub const HELP_TOPICS: &[(&str, &str)] = &[
    ("list", "list                      - show registered sequences"),
    ("play", "play <name|id>            - start a sequence under the current policy"),
    ("stop", "stop                      - halt output"),
    ("status", "status                    - show playback and rotation state"),
    ("tick", "tick [count]              - advance the rotation by one or more ticks"),
    ("policy", "policy <reject|replace>   - choose how rotation treats a busy device"),
    ("dump", "dump                      - print the bank the device is reading"),
    ("events", "events                    - print the telemetry history"),
    ("fault", "fault [submit|halt]       - make the next device call fail"),
    ("render", "render [name|id]          - draw one PWM period per frame"),
    ("help", "help [topic]              - show help for a command"),
];

/// Device layout the session is brought up with.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Profile {
    Individual,
    Waveform,
}

impl Profile {
    pub fn from_tag(tag: &str) -> Result<Self, String> {
        if tag.eq_ignore_ascii_case("individual") {
            Ok(Self::Individual)
        } else if tag.eq_ignore_ascii_case("waveform") {
            Ok(Self::Waveform)
        } else {
            Err(format!("Unknown profile `{tag}`"))
        }
    }

    pub fn device_config(self) -> DeviceConfig {
        match self {
            Profile::Individual => DeviceConfig::individual(DEFAULT_PINS, DEFAULT_COUNTERTOP),
            Profile::Waveform => DeviceConfig::waveform(DEFAULT_PINS, WAVEFORM_COUNTERTOP),
        }
    }
}

/// Virtual time since session start; advanced only by `tick`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd)]
pub struct SessionInstant(Duration);

impl SessionInstant {
    pub fn elapsed(self) -> Duration {
        self.0
    }
}

impl TelemetryInstant for SessionInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

/// Startup failures.
#[derive(Debug)]
pub enum SessionError {
    Config(sequencer_core::device::ConfigError),
    Presets(PresetError),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Config(error) => write!(f, "device configuration rejected: {error}"),
            SessionError::Presets(error) => write!(f, "{error}"),
        }
    }
}

impl std::error::Error for SessionError {}

pub struct Session {
    profile: Profile,
    controller: PlaybackController<SimulatedPwm>,
    library: SequenceLibrary,
    driver: RotationDriver,
    telemetry: TelemetryRecorder<SessionInstant>,
    now: SessionInstant,
    next_unseen_event: EventId,
}

impl Session {
    pub fn new(profile: Profile) -> Result<Self, SessionError> {
        let config = profile.device_config();
        let controller =
            PlaybackController::new(SimulatedPwm::new(), config).map_err(SessionError::Config)?;
        let mut library = SequenceLibrary::new();
        register_default_presets(&mut library, &config).map_err(SessionError::Presets)?;

        Ok(Self {
            profile,
            controller,
            library,
            driver: RotationDriver::new(RotationConfig::default()),
            telemetry: TelemetryRecorder::new(),
            now: SessionInstant::default(),
            next_unseen_event: 0,
        })
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    pub fn handle_command(&mut self, line: &str) -> Vec<String> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }

        let mut lines = match parse_command(trimmed) {
            Ok(command) => self.dispatch(command),
            Err(error) => vec![format!("ERR syntax {error}")],
        };
        self.drain_events(&mut lines);
        lines
    }

    fn dispatch(&mut self, command: Command<'_>) -> Vec<String> {
        match command {
            Command::Help(topic) => help_lines(topic),
            Command::List => self.list_lines(),
            Command::Play(target) => self.play(target),
            Command::Stop => self.stop(),
            Command::Status => self.status_lines(),
            Command::Tick(count) => self.tick(count),
            Command::Policy(policy) => {
                self.driver.set_policy(policy);
                vec![format!("OK policy {}", policy_label(policy))]
            }
            Command::Dump => self.dump_lines(),
            Command::Events => self.event_lines(),
            Command::Fault(target) => self.inject_fault(target),
            Command::Render(target) => self.render(target),
        }
    }

    fn resolve(&self, target: Target<'_>) -> Result<SequenceId, LibraryError> {
        let id = match target {
            Target::Id(index) => SequenceId::new(index),
            Target::Name(name) => self
                .library
                .find(name)
                .ok_or(LibraryError::NotFound(SequenceId::new(u8::MAX)))?,
        };
        self.library.get(id).map(|_| id)
    }

    fn play(&mut self, target: Target<'_>) -> Vec<String> {
        let Ok(id) = self.resolve(target) else {
            return vec![format!("ERR play unknown sequence `{}`", target_label(target))];
        };

        match self.driver.play_entry(
            &mut self.controller,
            &self.library,
            &mut self.telemetry,
            id,
            self.now,
        ) {
            TickOutcome::Started(id) => vec![format!("OK play {}", self.describe(id))],
            TickOutcome::Retained { attempted, reason } => {
                vec![format!("ERR play {}: {reason}", self.describe(attempted))]
            }
            TickOutcome::EmptyLibrary => vec!["ERR play: library is empty".to_string()],
        }
    }

    fn stop(&mut self) -> Vec<String> {
        match self.controller.stop() {
            Ok(()) => {
                self.telemetry.record_stopped(self.now);
                self.driver.clear_active();
                vec!["OK stop".to_string()]
            }
            Err(error) => vec![format!("ERR stop: {error}")],
        }
    }

    fn tick(&mut self, count: u32) -> Vec<String> {
        let interval = self.driver.config().tick_interval;
        let mut lines = Vec::new();
        for _ in 0..count {
            self.now = SessionInstant(self.now.0 + interval);
            let outcome = self.driver.tick(
                &mut self.controller,
                &self.library,
                &mut self.telemetry,
                self.now,
            );
            let at = self.now.elapsed().as_millis();
            match outcome {
                TickOutcome::Started(id) => {
                    lines.push(format!("[+{at:>6} ms] started {}", self.describe(id)));
                }
                TickOutcome::Retained { attempted, reason } => lines.push(format!(
                    "[+{at:>6} ms] retained, {} refused: {reason}",
                    self.describe(attempted)
                )),
                TickOutcome::EmptyLibrary => {
                    lines.push(format!("[+{at:>6} ms] library is empty"));
                    break;
                }
            }
        }
        lines
    }

    fn inject_fault(&mut self, target: FaultTarget) -> Vec<String> {
        match target {
            FaultTarget::Submit => {
                self.controller
                    .device_mut()
                    .fail_next_submit(HwError::Rejected);
                vec!["OK fault armed: next submit will be rejected".to_string()]
            }
            FaultTarget::Halt => {
                self.controller.device_mut().fail_next_halt(HwError::Timeout);
                vec!["OK fault armed: next halt will time out".to_string()]
            }
        }
    }

    fn list_lines(&self) -> Vec<String> {
        self.library
            .iter()
            .map(|(id, entry)| {
                let marker = if self.driver.active() == Some(id) { '*' } else { ' ' };
                format!(
                    "{marker} {id} {name:<10} frames={frames} {looping}",
                    name = entry.name,
                    frames = entry.sequence.frame_count(),
                    looping = if entry.sequence.looping() {
                        "loop"
                    } else {
                        "once"
                    },
                )
            })
            .collect()
    }

    fn status_lines(&self) -> Vec<String> {
        let config = self.controller.config();
        let device = self.controller.device();
        let mut lines = vec![
            format!(
                "profile={:?} load-mode={} channels={} countertop={} clock={}Hz",
                self.profile,
                config.load_mode,
                config.channel_count,
                config.countertop,
                config.base_clock.hz()
            ),
            format!("state: {}", self.controller.state()),
        ];

        let active = self
            .driver
            .active()
            .map_or_else(|| "none".to_string(), |id| self.describe(id));
        lines.push(format!(
            "active={active} policy={} next-index={} at=+{}ms",
            policy_label(self.driver.config().policy),
            self.driver.pending_index(),
            self.now.elapsed().as_millis()
        ));
        lines.push(format!(
            "device running={} submissions={} halts={}",
            device.is_running(),
            device.submissions(),
            device.halts()
        ));
        lines
    }

    fn dump_lines(&self) -> Vec<String> {
        let Some(words) = self.controller.active_words() else {
            return vec!["ERR dump: device is not playing".to_string()];
        };
        let per_frame = self.controller.config().load_mode.words_per_frame();
        words
            .chunks(per_frame)
            .enumerate()
            .map(|(index, frame)| {
                let mut line = format!("frame {index:>2}:");
                for word in frame {
                    line.push_str(&format!(" {word:04X}"));
                }
                line
            })
            .collect()
    }

    fn event_lines(&self) -> Vec<String> {
        let lines: Vec<String> = self
            .telemetry
            .oldest_first()
            .map(|record| {
                format!(
                    "[+{:>6} ms] #{:<3} {} (0x{:04X})",
                    record.timestamp.elapsed().as_millis(),
                    record.id,
                    record.event,
                    record.event.to_raw()
                )
            })
            .collect();
        if lines.is_empty() {
            vec!["no events recorded".to_string()]
        } else {
            lines
        }
    }

    fn render(&self, target: Option<Target<'_>>) -> Vec<String> {
        let id = match target {
            Some(target) => match self.resolve(target) {
                Ok(id) => id,
                Err(_) => {
                    return vec![format!(
                        "ERR render unknown sequence `{}`",
                        target_label(target)
                    )];
                }
            },
            None => match self.driver.active() {
                Some(id) => id,
                None => return vec!["ERR render: nothing is playing".to_string()],
            },
        };

        match self.library.get(id) {
            Ok(sequence) => {
                let mut lines = vec![self.describe(id)];
                lines.extend(render_sequence(sequence, self.controller.config().countertop));
                lines
            }
            Err(error) => vec![format!("ERR render: {error}")],
        }
    }

    fn describe(&self, id: SequenceId) -> String {
        self.library
            .name(id)
            .map_or_else(|| id.to_string(), |name| format!("{id} {name}"))
    }

    fn drain_events(&mut self, lines: &mut Vec<String>) {
        for record in self.telemetry.oldest_first() {
            if record.id >= self.next_unseen_event {
                lines.push(format!("  log: {}", record.event));
            }
        }
        if let Some(latest) = self.telemetry.latest() {
            self.next_unseen_event = latest.id.wrapping_add(1);
        }
    }
}

/// Output level of `duty` at `position` counts into a period of `countertop`.
///
/// Normal polarity holds the output high until the compare value; inverted
/// polarity holds it low.
pub fn level_at(duty: DutyValue, countertop: u16, position: u16) -> bool {
    let before_compare = position < duty.clamped_to(countertop).magnitude();
    before_compare != duty.polarity().is_inverted()
}

/// Draws one PWM period per frame for every channel of `sequence`.
pub fn render_sequence(sequence: &Sequence, device_countertop: u16) -> Vec<String> {
    let columns = u32::try_from(RENDER_COLUMNS).unwrap_or(u32::MAX);
    let mut rows = vec![String::new(); sequence.channel_count()];

    for frame in sequence.frames() {
        let top = frame.effective_countertop(device_countertop);
        for (channel, row) in rows.iter_mut().enumerate() {
            row.push('|');
            let Some(duty) = frame.duty(channel) else {
                row.push_str(&" ".repeat(RENDER_COLUMNS));
                continue;
            };
            for column in 0..columns {
                let position = u32::from(top) * column / columns;
                let position = u16::try_from(position).unwrap_or(top);
                row.push(if level_at(duty, top, position) { '#' } else { '_' });
            }
        }
    }

    rows.into_iter()
        .enumerate()
        .map(|(channel, row)| format!("ch{channel} {row}|"))
        .collect()
}

fn help_lines(topic: Option<&str>) -> Vec<String> {
    let Some(target) = topic else {
        let mut lines = vec!["Available commands:".to_string()];
        lines.extend(HELP_TOPICS.iter().map(|(_, detail)| format!("  {detail}")));
        lines.push("Type `help <topic>` for a specific command.".to_string());
        return lines;
    };

    if let Some((_, detail)) = HELP_TOPICS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(target))
    {
        return vec![(*detail).to_string()];
    }

    vec![
        format!("No help available for `{target}`."),
        format!(
            "Available topics: {}",
            HELP_TOPICS
                .iter()
                .map(|(name, _)| *name)
                .collect::<Vec<_>>()
                .join(", ")
        ),
    ]
}

fn policy_label(policy: StartPolicy) -> &'static str {
    match policy {
        StartPolicy::Reject => "reject",
        StartPolicy::Replace => "replace",
    }
}

fn target_label(target: Target<'_>) -> String {
    match target {
        Target::Id(index) => format!("#{index}"),
        Target::Name(name) => name.to_string(),
    }
}
