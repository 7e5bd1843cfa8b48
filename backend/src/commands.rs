use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "", no_binary_name = true, disable_version_flag = true)]
struct InnerCli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
  /// Requests a song. Quote titles with spaces: request "Hey Jude" "The Beatles".
  Request { title: String, artist: String },

  /// Opens the DJ session.
  Login { username: String, password: String },

  /// Closes the DJ session.
  Logout,

  /// Shows pending requests, most requested first.
  Top,

  /// Shows songs on cooldown with the time left.
  Cooldowns,

  /// Shows blacklisted songs.
  Banned,

  /// Marks a requested song as played and starts its cooldown.
  Play { song_id: String },

  /// Blacklists a song and drops any pending request for it.
  Blacklist { title: String, artist: String },

  /// Lifts a blacklist entry.
  Unblacklist { song_id: String },

  /// Closes this program.
  #[command(visible_alias = "quit")]
  Exit,
}

impl Command {
  /// Whether the command needs an open DJ session.
  pub fn is_dj_only(&self) -> bool {
    matches!(
      self,
      Command::Top
        | Command::Cooldowns
        | Command::Banned
        | Command::Play { .. }
        | Command::Blacklist { .. }
        | Command::Unblacklist { .. }
    )
  }
}

/// Parses one console line. Blank lines yield `Ok(None)`; help requests and
/// usage mistakes, unbalanced quotes included, come back as a clap error ready
/// to print.
pub fn parse_line(line: &str) -> Result<Option<Command>, clap::Error> {
  let line = line.trim();
  if line.is_empty() {
    return Ok(None);
  }

  let Some(args) = shlex::split(line) else {
    let err = InnerCli::command().error(ErrorKind::ValueValidation, "unbalanced quotes");
    return Err(err);
  };
  InnerCli::try_parse_from(args).map(|cli| Some(cli.command))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn quoted_arguments_keep_their_spaces() {
    let cmd = parse_line(r#"request "Hotel California" 'The Eagles'"#).unwrap();
    assert_eq!(
      cmd,
      Some(Command::Request { title: "Hotel California".into(), artist: "The Eagles".into() })
    );
  }

  #[test]
  fn blank_line_is_nothing() {
    assert_eq!(parse_line("   ").unwrap(), None);
  }

  #[test]
  fn unbalanced_quotes_are_a_usage_error() {
    let err = parse_line(r#"blacklist "Baby Shark Pinkfong"#).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValueValidation);
    assert!(err.to_string().contains("unbalanced quotes"));

    let err = parse_line(r#"play "eagles-hotel-california"#).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValueValidation);
  }

  #[test]
  fn missing_argument_is_a_usage_error() {
    let err = parse_line("request Africa").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
  }

  #[test]
  fn help_is_reported_as_display_help() {
    let err = parse_line("help").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    assert!(err.to_string().contains("blacklist"));
  }

  #[test]
  fn quit_is_exit() {
    assert_eq!(parse_line("quit").unwrap(), Some(Command::Exit));
  }

  #[test]
  fn dj_commands_are_flagged() {
    assert!(Command::Play { song_id: "x".into() }.is_dj_only());
    assert!(Command::Top.is_dj_only());
    assert!(!Command::Request { title: "a".into(), artist: "b".into() }.is_dj_only());
    assert!(!Command::Logout.is_dj_only());
  }
}
