use crate::errors::CoreError;

/// The single shared DJ login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DjCredentials {
  pub username: String,
  pub password: String,
}

/// Session flag guarding the DJ operations (play, blacklist, unblacklist).
///
/// The credentials are fixed and shared by every DJ, so this keeps customers
/// off the DJ screen and nothing more. It is not a security boundary.
#[derive(Debug, Clone)]
pub struct DjGate {
  credentials: DjCredentials,
  logged_in: bool,
}

impl DjGate {
  pub fn new(credentials: DjCredentials) -> Self {
    Self { credentials, logged_in: false }
  }

  pub fn login(&mut self, username: &str, password: &str) -> Result<(), CoreError> {
    if username == self.credentials.username && password == self.credentials.password {
      self.logged_in = true;
      Ok(())
    } else {
      Err(CoreError::InvalidCredentials)
    }
  }

  pub fn logout(&mut self) {
    self.logged_in = false;
  }

  pub fn is_logged_in(&self) -> bool {
    self.logged_in
  }

  pub fn require(&self) -> Result<(), CoreError> {
    if self.logged_in { Ok(()) } else { Err(CoreError::NotAuthorized) }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn gate() -> DjGate {
    DjGate::new(DjCredentials { username: "Cowboy".into(), password: "secret".into() })
  }

  #[test]
  fn login_and_logout() {
    let mut gate = gate();
    assert!(matches!(gate.require(), Err(CoreError::NotAuthorized)));

    gate.login("Cowboy", "secret").unwrap();
    assert!(gate.require().is_ok());

    gate.logout();
    assert!(!gate.is_logged_in());
  }

  #[test]
  fn wrong_password_keeps_gate_closed() {
    let mut gate = gate();
    assert!(matches!(gate.login("Cowboy", "Secret"), Err(CoreError::InvalidCredentials)));
    assert!(matches!(gate.login("cowboy", "secret"), Err(CoreError::InvalidCredentials)));
    assert!(!gate.is_logged_in());
  }
}
