//! Ports for user-facing side effects of the request layer.
//!
//! The browser client shows toasts and changes route; the CLI prints to the
//! terminal. Tests record both.

use crate::error::Notice;

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice);
}

pub trait Navigator: Send + Sync {
    /// Send the user to an application route such as `/login`.
    fn navigate(&self, path: &str);
}
