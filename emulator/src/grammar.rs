//! Command grammar for the emulator console.
//!
//! Every line starts with a keyword followed by at most one argument.
//! Parsing is done with `winnow` directly on the trimmed line; the caller
//! handles `exit`/`quit` before a line reaches the parser.

use std::fmt;

use sequencer_core::rotation::StartPolicy;
use winnow::ascii::{dec_uint, space0, space1};
use winnow::combinator::{alt, eof, opt, peek, preceded, terminated};
use winnow::error::ContextError;
use winnow::prelude::*;
use winnow::token::take_while;

/// Most ticks a single `tick` command may request.
pub const MAX_TICKS_PER_COMMAND: u32 = 1_000;

/// Library entry named on the command line.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Target<'a> {
    Id(u8),
    Name(&'a str),
}

/// Which device call the next injected fault applies to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FaultTarget {
    Submit,
    Halt,
}

/// Parsed console command.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Command<'a> {
    Help(Option<&'a str>),
    List,
    Play(Target<'a>),
    Stop,
    Status,
    Tick(u32),
    Policy(StartPolicy),
    Dump,
    Events,
    Fault(FaultTarget),
    Render(Option<Target<'a>>),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Keyword {
    Help,
    List,
    Play,
    Stop,
    Status,
    Tick,
    Policy,
    Dump,
    Events,
    Fault,
    Render,
}

/// Error returned for lines the grammar does not accept.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SyntaxError {
    pub offset: usize,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unexpected input at column {}", self.offset + 1)
    }
}

impl std::error::Error for SyntaxError {}

/// Parses one console line.
pub fn parse_command(line: &str) -> Result<Command<'_>, SyntaxError> {
    terminated(command, (space0, eof))
        .parse(line.trim())
        .map_err(|error| SyntaxError {
            offset: error.offset(),
        })
}

fn command<'a>(input: &mut &'a str) -> Result<Command<'a>, ContextError> {
    match keyword.parse_next(input)? {
        Keyword::Help => opt(preceded(space1, word))
            .map(Command::Help)
            .parse_next(input),
        Keyword::List => Ok(Command::List),
        Keyword::Play => preceded(space1, target).map(Command::Play).parse_next(input),
        Keyword::Stop => Ok(Command::Stop),
        Keyword::Status => Ok(Command::Status),
        Keyword::Tick => opt(preceded(space1, tick_count))
            .map(|count| Command::Tick(count.unwrap_or(1)))
            .parse_next(input),
        Keyword::Policy => preceded(
            space1,
            alt((
                "reject".value(StartPolicy::Reject),
                "replace".value(StartPolicy::Replace),
            )),
        )
        .map(Command::Policy)
        .parse_next(input),
        Keyword::Dump => Ok(Command::Dump),
        Keyword::Events => Ok(Command::Events),
        Keyword::Fault => opt(preceded(
            space1,
            alt((
                "submit".value(FaultTarget::Submit),
                "halt".value(FaultTarget::Halt),
            )),
        ))
        .map(|target| Command::Fault(target.unwrap_or(FaultTarget::Submit)))
        .parse_next(input),
        Keyword::Render => opt(preceded(space1, target))
            .map(Command::Render)
            .parse_next(input),
    }
}

fn keyword(input: &mut &str) -> Result<Keyword, ContextError> {
    terminated(
        alt((
            "help".value(Keyword::Help),
            "list".value(Keyword::List),
            "play".value(Keyword::Play),
            "stop".value(Keyword::Stop),
            "status".value(Keyword::Status),
            "tick".value(Keyword::Tick),
            "policy".value(Keyword::Policy),
            "dump".value(Keyword::Dump),
            "events".value(Keyword::Events),
            "fault".value(Keyword::Fault),
            "render".value(Keyword::Render),
        )),
        peek(alt((space1, eof))),
    )
    .parse_next(input)
}

fn tick_count(input: &mut &str) -> Result<u32, ContextError> {
    dec_uint
        .verify(|count: &u32| (1..=MAX_TICKS_PER_COMMAND).contains(count))
        .parse_next(input)
}

fn target<'a>(input: &mut &'a str) -> Result<Target<'a>, ContextError> {
    alt((
        terminated(dec_uint, peek(alt((space1, eof)))).map(Target::Id),
        word.map(Target::Name),
    ))
    .parse_next(input)
}

fn word<'a>(input: &mut &'a str) -> Result<&'a str, ContextError> {
    take_while(1.., |c: char| {
        c.is_ascii_alphanumeric() || c == '-' || c == '_'
    })
    .parse_next(input)
}
