//! Host console for the PWM sequencer.
//!
//! Runs the shared core against a simulated PWM peripheral so sequences,
//! rotation and fault handling can be exercised without a board.

mod grammar;
mod session;

use std::env;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use session::{Profile, Session};

const USAGE: &str = "usage: sequencer-emulator [individual|waveform | --profile <individual|waveform>]";

fn main() -> io::Result<ExitCode> {
    let profile = match profile_from_args(env::args().skip(1)) {
        Ok(profile) => profile,
        Err(message) => {
            eprintln!("sequencer-emulator: {message}");
            eprintln!("{USAGE}");
            return Ok(ExitCode::from(2));
        }
    };

    let mut session = match Session::new(profile) {
        Ok(session) => session,
        Err(error) => {
            eprintln!("sequencer-emulator: cannot bring up the simulated PWM: {error}");
            return Ok(ExitCode::FAILURE);
        }
    };

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();

    let config = profile.device_config();
    writeln!(
        writer,
        "sequencer-emulator: {} load mode, {} channel(s), countertop {}. `help` lists commands, `quit` leaves.",
        config.load_mode, config.channel_count, config.countertop
    )?;

    let mut line = String::new();
    loop {
        line.clear();
        write!(writer, "pwm> ")?;
        writer.flush()?;

        if reader.read_line(&mut line)? == 0 {
            writeln!(writer)?;
            break;
        }

        let command = line.trim();
        if command.is_empty() {
            continue;
        }
        if is_exit(command) {
            break;
        }

        for response in session.handle_command(command) {
            writeln!(writer, "{response}")?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn is_exit(command: &str) -> bool {
    matches!(command, "exit" | "quit")
}

fn profile_from_args(mut args: impl Iterator<Item = String>) -> Result<Profile, String> {
    let Some(arg) = args.next() else {
        return Ok(Profile::Individual);
    };
    let tag = if let Some(value) = arg.strip_prefix("--profile=") {
        value.to_string()
    } else if arg == "--profile" {
        args.next()
            .ok_or_else(|| "`--profile` needs a value".to_string())?
    } else {
        arg
    };
    if let Some(extra) = args.next() {
        return Err(format!("unexpected argument `{extra}`"));
    }
    Profile::from_tag(&tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> impl Iterator<Item = String> {
        values
            .iter()
            .map(|value| (*value).to_string())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn profile_defaults_to_individual() {
        assert_eq!(profile_from_args(args(&[])), Ok(Profile::Individual));
    }

    #[test]
    fn profile_accepts_every_spelling() {
        assert_eq!(profile_from_args(args(&["waveform"])), Ok(Profile::Waveform));
        assert_eq!(
            profile_from_args(args(&["--profile", "waveform"])),
            Ok(Profile::Waveform)
        );
        assert_eq!(
            profile_from_args(args(&["--profile=individual"])),
            Ok(Profile::Individual)
        );
    }

    #[test]
    fn bad_arguments_are_reported() {
        assert!(profile_from_args(args(&["--profile"])).is_err());
        assert!(profile_from_args(args(&["sawtooth"])).is_err());
        assert!(profile_from_args(args(&["waveform", "extra"])).is_err());
    }
}
