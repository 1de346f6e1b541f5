//! User identity lookup via `getent passwd`.
//!
//! Lookups miss softly: any spawn failure, non-zero exit, or malformed
//! line yields `None`, and the caller substitutes the uid as text.

use tracing::debug;

use rackview_core::UserId;

use crate::exec::capture_stdout;
use crate::UserDirectory;

pub struct GetentDirectory {
    getent: String,
}

impl Default for GetentDirectory {
    fn default() -> Self {
        Self {
            getent: "getent".to_string(),
        }
    }
}

impl GetentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn passwd_entry(&self, uid: UserId) -> Option<(String, String)> {
        let uid_arg = uid.to_string();
        match capture_stdout(&self.getent, &["passwd", uid_arg.as_str()]) {
            Ok(stdout) => parse_passwd_line(stdout.lines().next().unwrap_or_default()),
            Err(err) => {
                debug!(uid, error = %err, "passwd lookup failed");
                None
            }
        }
    }
}

impl UserDirectory for GetentDirectory {
    fn login_name(&self, uid: UserId) -> Option<String> {
        self.passwd_entry(uid).map(|(login, _)| login)
    }

    fn display_name(&self, uid: UserId) -> Option<String> {
        self.passwd_entry(uid)
            .map(|(_, display)| display)
            .filter(|d| !d.is_empty())
    }
}

/// Split one `passwd(5)` line into (login, display name). The display name
/// is the first comma-separated token of the GECOS field.
fn parse_passwd_line(line: &str) -> Option<(String, String)> {
    let mut fields = line.split(':');
    let login = fields.next()?.trim();
    if login.is_empty() {
        return None;
    }
    let gecos = fields.nth(3).unwrap_or_default();
    let display = gecos.split(',').next().unwrap_or_default().trim();
    Some((login.to_string(), display.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_gecos_line() {
        let (login, display) =
            parse_passwd_line("jdoe:x:1200:1200:Jane Doe,Room 5,555:/home/jdoe:/bin/bash")
                .unwrap();
        assert_eq!(login, "jdoe");
        assert_eq!(display, "Jane Doe");
    }

    #[test]
    fn empty_gecos_gives_empty_display() {
        let (login, display) = parse_passwd_line("svc:x:900:900::/srv:/sbin/nologin").unwrap();
        assert_eq!(login, "svc");
        assert_eq!(display, "");
    }

    #[test]
    fn blank_line_is_none() {
        assert!(parse_passwd_line("").is_none());
    }
}
