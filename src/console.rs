//! Terminal side of notices and navigation.

use marketplace::{Navigator, Notice, Notifier, Severity};
use serde::Serialize;
use session::access::LOGIN_PATH;

use crate::CliError;

/// Prints notices to stderr, keeping stdout for JSON output.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: &Notice) {
        eprintln!("{}", format_notice(notice));
    }
}

/// A terminal cannot change route; tell the user which command gets them there.
pub struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn navigate(&self, path: &str) {
        eprintln!("{}", route_hint(path));
    }
}

pub fn format_notice(notice: &Notice) -> String {
    let tag = match notice.severity {
        Severity::Info => "info",
        Severity::Warning => "warning",
        Severity::Error => "error",
    };
    format!("[{tag}] {}", notice.message)
}

pub fn route_hint(path: &str) -> String {
    match path {
        LOGIN_PATH => "sign in again with `flexrent login`".to_owned(),
        "/complete-profile" => "finish your profile with `flexrent profile set-role`".to_owned(),
        other => format!("continue at {other}"),
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
#[path = "console_test.rs"]
mod tests;
