//! Role-based route access.
//!
//! SYSTEM CONTEXT
//! ==============
//! Route guards and the CLI apply identical redirect behavior: unauthenticated
//! users go to `/login`, users without a marketplace role finish their profile
//! first, and users outside an area land on their own role's home.

use crate::types::{Role, SessionState};

pub const LOGIN_PATH: &str = "/login";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Area {
    /// Landing, search and space detail pages.
    Public,
    /// Profile completion and role selection.
    Profile,
    Client,
    Provider,
    Admin,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Allow,
    Redirect(&'static str),
}

/// Decide whether the published session may enter `area`.
#[must_use]
pub fn decide(state: &SessionState, area: Area) -> Access {
    if area == Area::Public {
        return Access::Allow;
    }
    let Some(session) = state.session() else {
        return Access::Redirect(LOGIN_PATH);
    };
    let role = session.role;
    if area == Area::Profile {
        return Access::Allow;
    }
    if role == Role::Default {
        return Access::Redirect(Role::Default.home_path());
    }
    let allowed = match area {
        Area::Admin => role == Role::Admin,
        Area::Provider => matches!(role, Role::Proveedor | Role::Admin),
        Area::Client => matches!(role, Role::Cliente | Role::Admin),
        Area::Public | Area::Profile => true,
    };
    if allowed { Access::Allow } else { Access::Redirect(role.home_path()) }
}

#[cfg(test)]
#[path = "access_test.rs"]
mod tests;
