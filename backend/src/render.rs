use std::time::Duration;

use jukebox_core::domain::{BlacklistRecord, CooldownRecord, RequestRecord, Timestamp};
use jukebox_core::{CoreError, RejectReason};

/// `HH:MM:SS`, hours not wrapped at 24.
pub fn format_countdown(left: Duration) -> String {
  let secs = left.as_secs();
  format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

pub fn rejection(title: &str, reason: RejectReason) -> String {
  match reason {
    RejectReason::Cooldown => {
      format!("\"{title}\" was played recently. Please wait a bit before requesting it again.")
    }
    RejectReason::Blacklisted => format!("Sorry, \"{title}\" can't be requested tonight."),
  }
}

/// What the user sees for an error. `None` means stay quiet.
pub fn error_message(err: &CoreError) -> Option<String> {
  match err {
    CoreError::Rejected { title, reason } => Some(rejection(title, *reason)),
    CoreError::NotFound(_) => None,
    CoreError::InvalidCredentials => Some("Invalid username or password.".to_string()),
    CoreError::NotAuthorized => Some("DJ login required: login <username> <password>".to_string()),
  }
}

pub fn requests(records: &[RequestRecord]) -> Vec<String> {
  if records.is_empty() {
    return vec!["No requests yet. The night is young!".to_string()];
  }
  let mut lines = vec!["Top Requests".to_string()];
  lines.extend(records.iter().enumerate().map(|(i, r)| {
    let times = if r.request_count == 1 { "request" } else { "requests" };
    format!("{:>3}. {} - {} ({} {times})  [{}]", i + 1, r.title, r.artist, r.request_count, r.id)
  }));
  lines
}

pub fn cooldowns(records: &[CooldownRecord], now: Timestamp) -> Vec<String> {
  if records.is_empty() {
    return vec!["No songs on cooldown.".to_string()];
  }
  let mut lines = vec!["On Cooldown".to_string()];
  lines.extend(records.iter().map(|r| {
    format!("  {} {} - {}  [{}]", format_countdown(r.remaining(now)), r.title, r.artist, r.id)
  }));
  lines
}

pub fn blacklist(records: &[BlacklistRecord]) -> Vec<String> {
  if records.is_empty() {
    return vec!["No blacklisted songs.".to_string()];
  }
  let mut lines = vec!["Blacklist".to_string()];
  lines.extend(records.iter().map(|r| format!("  {} - {}  [{}]", r.title, r.artist, r.id)));
  lines
}
