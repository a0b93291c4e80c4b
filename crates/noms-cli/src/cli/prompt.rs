//! Interactive credential prompt on stderr/stdin.

use noms_core::auth::Challenge;
use std::io::{BufRead, Write};

const USERNAME_LABEL: &str = "Username: ";
// Input is read as a plain line; there is no terminal echo suppression.
const PASSWORD_LABEL: &str = "Password (input will be visible): ";

/// Ask for a username and password. `None` on EOF or an empty username.
pub(crate) fn ask(challenge: &Challenge) -> Option<(String, String)> {
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut err = std::io::stderr().lock();

    let realm = if challenge.realm.is_empty() {
        String::new()
    } else {
        format!(" ({})", challenge.realm)
    };
    let _ = writeln!(err, "{}{} requires authentication", challenge.domain, realm);
    read_credentials(&mut input, &mut err)
}

fn read_credentials(input: &mut impl BufRead, err: &mut impl Write) -> Option<(String, String)> {
    let username = read_field(input, err, USERNAME_LABEL)?;
    if username.is_empty() {
        return None;
    }
    let password = read_field(input, err, PASSWORD_LABEL)?;
    Some((username, password))
}

fn read_field(input: &mut impl BufRead, err: &mut impl Write, label: &str) -> Option<String> {
    let _ = write!(err, "{label}");
    let _ = err.flush();
    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
    }
}
