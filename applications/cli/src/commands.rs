//! Interactive line commands
//!
//! Times typed by the user are seconds into the current chapter; they are
//! converted to absolute asset time with the active segment's start.

use crate::error::{CliError, Result};
use std::str::FromStr;
use verso_playback::{Command, SessionSnapshot};

pub const HELP: &str = "\
Commands:
  play | pause | p          start, pause or toggle playback
  next | prev               next or previous chapter
  select N                  play chapter N of today's list (1-based)
  seek SECS                 jump to SECS into the chapter
  + | -                     skip forward or back
  scrub SECS                preview a position without playing it
  commit [SECS]             apply the scrub preview (or SECS)
  cancel                    abandon the scrub preview
  rate R | cycle            set or cycle the playback rate
  day N | tomorrow | yesterday
                            change the reading-plan day
  status | list             show the session or today's chapters
  help | quit";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UserCommand {
    Play,
    Pause,
    Toggle,
    Next,
    Previous,
    /// 1-based chapter number in the day's list
    Select(usize),
    Seek(f64),
    SkipForward,
    SkipBackward,
    Scrub(f64),
    Commit(Option<f64>),
    Cancel,
    Rate(f32),
    CycleRate,
    Day(u32),
    NextDay,
    PreviousDay,
    Status,
    List,
    Help,
    Quit,
}

impl FromStr for UserCommand {
    type Err = CliError;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let Some(word) = words.next() else {
            return Err(CliError::InvalidCommand("empty command".to_string()));
        };
        let arg = words.next();
        if let Some(extra) = words.next() {
            return Err(CliError::InvalidCommand(format!("unexpected '{}'", extra)));
        }

        let command = match word.to_lowercase().as_str() {
            "play" => Self::Play,
            "pause" => Self::Pause,
            "p" | "toggle" => Self::Toggle,
            "next" | "n" => Self::Next,
            "prev" | "previous" => Self::Previous,
            "select" | "s" => Self::Select(parse_arg(word, arg)?),
            "seek" => Self::Seek(parse_arg(word, arg)?),
            "+" | "ff" => Self::SkipForward,
            "-" | "rew" => Self::SkipBackward,
            "scrub" => Self::Scrub(parse_arg(word, arg)?),
            "commit" => Self::Commit(arg.map(|a| parse_arg(word, Some(a))).transpose()?),
            "cancel" => Self::Cancel,
            "rate" => Self::Rate(parse_arg(word, arg)?),
            "cycle" => Self::CycleRate,
            "day" => Self::Day(parse_arg(word, arg)?),
            "tomorrow" => Self::NextDay,
            "yesterday" => Self::PreviousDay,
            "status" => Self::Status,
            "list" | "ls" => Self::List,
            "help" | "?" => Self::Help,
            "quit" | "q" | "exit" => Self::Quit,
            other => return Err(CliError::InvalidCommand(format!("unknown command '{}'", other))),
        };

        if arg.is_some()
            && !matches!(
                command,
                Self::Select(_)
                    | Self::Seek(_)
                    | Self::Scrub(_)
                    | Self::Commit(_)
                    | Self::Rate(_)
                    | Self::Day(_)
            )
        {
            return Err(CliError::InvalidCommand(format!("'{}' takes no argument", word)));
        }
        Ok(command)
    }
}

fn parse_arg<T: FromStr>(word: &str, arg: Option<&str>) -> Result<T> {
    let arg = arg.ok_or_else(|| CliError::InvalidCommand(format!("'{}' needs a value", word)))?;
    arg.parse()
        .map_err(|_| CliError::InvalidCommand(format!("'{}' is not a valid value for '{}'", arg, word)))
}

impl UserCommand {
    /// Service command for session-level actions
    ///
    /// Returns `None` for commands the application handles itself (day
    /// changes, status, help, quit) and for a chapter number outside the
    /// list.
    pub fn to_service_command(self, snapshot: &SessionSnapshot) -> Option<Command> {
        let chapter_start = snapshot
            .segments
            .get(snapshot.active_index)
            .map_or(0.0, |s| s.start_offset());

        let command = match self {
            Self::Play => Command::Play,
            Self::Pause => Command::Pause,
            Self::Toggle => Command::TogglePlayPause,
            Self::Next => Command::NextSegment,
            Self::Previous => Command::PreviousSegment,
            Self::Select(n) => {
                let index = n.checked_sub(1)?;
                if index >= snapshot.segments.len() {
                    return None;
                }
                Command::SelectSegment {
                    index,
                    from_time: None,
                }
            }
            Self::Seek(secs) => Command::SeekTo(chapter_start + secs),
            Self::SkipForward => Command::SkipForward,
            Self::SkipBackward => Command::SkipBackward,
            Self::Scrub(secs) => Command::UpdateScrub(chapter_start + secs),
            Self::Commit(secs) => {
                Command::CommitScrub(secs.map_or(snapshot.position, |s| chapter_start + s))
            }
            Self::Cancel => Command::CancelScrub,
            Self::Rate(rate) => Command::SetRate(rate),
            Self::CycleRate => Command::CycleRate,
            Self::Day(_)
            | Self::NextDay
            | Self::PreviousDay
            | Self::Status
            | Self::List
            | Self::Help
            | Self::Quit => return None,
        };
        Some(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verso_playback::VirtualSegment;

    fn snapshot() -> SessionSnapshot {
        SessionSnapshot {
            segments: vec![
                VirtualSegment::new("John 1", 100.0, 400.0).unwrap(),
                VirtualSegment::new("John 2", 400.0, 650.0).unwrap(),
            ],
            active_index: 1,
            position: 420.0,
            elapsed: 20.0,
            duration: 250.0,
            is_playing: true,
            is_scrubbing: false,
            rate: 1.0,
            epoch: 3,
            total_duration: 550.0,
            asset_duration: Some(3600.0),
        }
    }

    #[test]
    fn parses_commands_with_arguments() {
        assert_eq!("seek 12.5".parse::<UserCommand>().unwrap(), UserCommand::Seek(12.5));
        assert_eq!("SELECT 2".parse::<UserCommand>().unwrap(), UserCommand::Select(2));
        assert_eq!("rate 1.5".parse::<UserCommand>().unwrap(), UserCommand::Rate(1.5));
        assert_eq!("commit".parse::<UserCommand>().unwrap(), UserCommand::Commit(None));
        assert_eq!(
            "commit 30".parse::<UserCommand>().unwrap(),
            UserCommand::Commit(Some(30.0))
        );
        assert_eq!("  +  ".parse::<UserCommand>().unwrap(), UserCommand::SkipForward);
    }

    #[test]
    fn rejects_bad_input() {
        assert!("".parse::<UserCommand>().is_err());
        assert!("dance".parse::<UserCommand>().is_err());
        assert!("seek".parse::<UserCommand>().is_err());
        assert!("seek soon".parse::<UserCommand>().is_err());
        assert!("play 3".parse::<UserCommand>().is_err());
        assert!("seek 1 2".parse::<UserCommand>().is_err());
    }

    #[test]
    fn times_are_relative_to_the_chapter() {
        let snapshot = snapshot();
        assert!(matches!(
            UserCommand::Seek(30.0).to_service_command(&snapshot),
            Some(Command::SeekTo(t)) if t == 430.0
        ));
        assert!(matches!(
            UserCommand::Scrub(5.0).to_service_command(&snapshot),
            Some(Command::UpdateScrub(t)) if t == 405.0
        ));
        assert!(matches!(
            UserCommand::Commit(None).to_service_command(&snapshot),
            Some(Command::CommitScrub(t)) if t == 420.0
        ));
    }

    #[test]
    fn select_is_one_based_and_bounded() {
        let snapshot = snapshot();
        assert!(matches!(
            UserCommand::Select(1).to_service_command(&snapshot),
            Some(Command::SelectSegment { index: 0, from_time: None })
        ));
        assert!(UserCommand::Select(0).to_service_command(&snapshot).is_none());
        assert!(UserCommand::Select(3).to_service_command(&snapshot).is_none());
    }

    #[test]
    fn app_commands_have_no_service_command() {
        let snapshot = snapshot();
        for command in [UserCommand::Day(3), UserCommand::Status, UserCommand::Quit] {
            assert!(command.to_service_command(&snapshot).is_none());
        }
    }
}
