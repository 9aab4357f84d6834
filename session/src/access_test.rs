use super::*;
use crate::test_helpers::record;

fn signed_in(role: Role) -> SessionState {
    SessionState::Authenticated(record("a", role))
}

#[test]
fn public_area_is_always_open() {
    assert_eq!(decide(&SessionState::Anonymous, Area::Public), Access::Allow);
    assert_eq!(decide(&SessionState::Expired, Area::Public), Access::Allow);
}

#[test]
fn signed_out_states_redirect_to_login() {
    for state in [SessionState::Anonymous, SessionState::Rehydrating, SessionState::Expired] {
        assert_eq!(decide(&state, Area::Client), Access::Redirect("/login"));
        assert_eq!(decide(&state, Area::Profile), Access::Redirect("/login"));
    }
}

#[test]
fn default_role_must_complete_profile() {
    let state = signed_in(Role::Default);
    assert_eq!(decide(&state, Area::Profile), Access::Allow);
    assert_eq!(decide(&state, Area::Client), Access::Redirect("/complete-profile"));
    assert_eq!(decide(&state, Area::Admin), Access::Redirect("/complete-profile"));
}

#[test]
fn roles_map_to_their_areas() {
    assert_eq!(decide(&signed_in(Role::Cliente), Area::Client), Access::Allow);
    assert_eq!(decide(&signed_in(Role::Cliente), Area::Provider), Access::Redirect("/client/dashboard"));
    assert_eq!(decide(&signed_in(Role::Proveedor), Area::Provider), Access::Allow);
    assert_eq!(decide(&signed_in(Role::Proveedor), Area::Admin), Access::Redirect("/provider/dashboard"));
    for area in [Area::Admin, Area::Provider, Area::Client] {
        assert_eq!(decide(&signed_in(Role::Admin), area), Access::Allow);
    }
}

#[test]
fn refreshing_session_keeps_access() {
    let state = SessionState::Refreshing(record("a", Role::Proveedor));
    assert_eq!(decide(&state, Area::Provider), Access::Allow);
}
