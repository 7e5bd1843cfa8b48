use jukebox_core::domain::SongId;
use jukebox_core::ports::{Clock, ExternalChange, SyncBridge};
use jukebox_core::services::{DjGate, FactNotice, LifecycleCoordinator};
use tracing::debug;

use crate::commands::{Command, parse_line};
use crate::render;

/// Result of one console line.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Reply {
  pub lines: Vec<String>,
  pub exit: bool,
}

impl Reply {
  fn say(line: impl Into<String>) -> Self {
    Reply { lines: vec![line.into()], exit: false }
  }

  fn lines(lines: Vec<String>) -> Self {
    Reply { lines, exit: false }
  }

  fn quiet() -> Self {
    Reply::default()
  }
}

/// One console: a customer screen that turns into a DJ screen after login.
pub struct Session<B, C>
where
  B: SyncBridge,
  C: Clock,
{
  jukebox: LifecycleCoordinator<B, C>,
  gate: DjGate,
}

impl<B, C> Session<B, C>
where
  B: SyncBridge,
  C: Clock,
{
  pub fn new(jukebox: LifecycleCoordinator<B, C>, gate: DjGate) -> Self {
    Self { jukebox, gate }
  }

  pub fn jukebox(&self) -> &LifecycleCoordinator<B, C> {
    &self.jukebox
  }

  pub fn is_dj(&self) -> bool {
    self.gate.is_logged_in()
  }

  pub fn handle_line(&mut self, line: &str) -> Reply {
    match parse_line(line) {
      Ok(Some(command)) => self.execute(command),
      Ok(None) => Reply::quiet(),
      Err(err) => Reply::lines(err.to_string().lines().map(String::from).collect()),
    }
  }

  pub fn execute(&mut self, command: Command) -> Reply {
    if command.is_dj_only() {
      if let Err(err) = self.gate.require() {
        return render::error_message(&err).map(Reply::say).unwrap_or_default();
      }
    }

    match command {
      Command::Request { title, artist } => match self.jukebox.request_song(&title, &artist) {
        Ok(id) => {
          let count = self.jukebox.request(&id).map(|r| r.request_count).unwrap_or(1);
          Reply::say(format!("Requested \"{title}\" by {artist} (requests: {count})."))
        }
        Err(err) => render::error_message(&err).map(Reply::say).unwrap_or_default(),
      },
      Command::Login { username, password } => match self.gate.login(&username, &password) {
        Ok(()) => Reply::say("Welcome to the booth. Type `help` for the DJ commands."),
        Err(err) => render::error_message(&err).map(Reply::say).unwrap_or_default(),
      },
      Command::Logout => {
        self.gate.logout();
        Reply::say("Logged out.")
      }
      Command::Top => Reply::lines(render::requests(&self.jukebox.top_requests())),
      Command::Cooldowns => {
        let now = self.jukebox.clock().now();
        Reply::lines(render::cooldowns(&self.jukebox.cooldowns(), now))
      }
      Command::Banned => Reply::lines(render::blacklist(&self.jukebox.blacklist())),
      Command::Play { song_id } => match self.jukebox.play_song(&SongId::from_raw(song_id)) {
        Ok(played) => Reply::say(format!("Now playing \"{}\" by {}.", played.title, played.artist)),
        Err(err) => render::error_message(&err).map(Reply::say).unwrap_or_default(),
      },
      Command::Blacklist { title, artist } => {
        let id = self.jukebox.blacklist_song(&title, &artist);
        Reply::say(format!("\"{title}\" by {artist} is blacklisted [{id}]."))
      }
      Command::Unblacklist { song_id } => {
        match self.jukebox.unblacklist_song(&SongId::from_raw(song_id.as_str())) {
          Some(lifted) => Reply::say(format!("\"{}\" can be requested again.", lifted.title)),
          None => Reply::say(format!("{song_id} is not blacklisted.")),
        }
      }
      Command::Exit => Reply { lines: vec!["Bye!".to_string()], exit: true },
    }
  }

  /// Periodic housekeeping; expired cooldowns are dropped silently.
  pub fn on_tick(&mut self) {
    let expired = self.jukebox.sweep();
    if !expired.is_empty() {
      debug!(count = expired.len(), "songs requestable again");
    }
  }

  pub fn on_external_change(&mut self, change: ExternalChange) {
    let replaced = self.jukebox.apply_external_change(change);
    debug!(?replaced, "ledgers updated by another instance");
  }

  /// A line for the customer when a fresh fact arrived, `None` otherwise.
  pub fn on_fact(&mut self, notice: FactNotice) -> Option<String> {
    let notice = self.jukebox.accept_fact(notice)?;
    match notice.fact {
      Some(fact) => Some(format!("Fun fact about \"{}\": {fact}", notice.title)),
      None => {
        debug!(song_id = %notice.song_id, "no fun fact available");
        None
      }
    }
  }
}
