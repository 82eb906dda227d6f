use super::*;

#[test]
fn default_state_is_unresolved_and_anonymous() {
    let state = ClientIdentityState::default();
    assert!(state.is_resolving());
    assert_eq!(state.resolution, Resolution::Unresolved);
    assert_eq!(state.role(), Role::Anonymous);
    assert!(state.profile().is_none());
}

#[test]
fn set_fact_replaces_same_source() {
    let mut state = ClientIdentityState::default();
    state.set_fact(IdentitySource::Primary, Some(IdentityRecord::new("a")));
    state.set_fact(IdentitySource::Primary, Some(IdentityRecord::new("b")));
    assert_eq!(state.facts.len(), 1);
    assert_eq!(state.primary_user().unwrap().id, "b");
}

#[test]
fn set_fact_none_removes() {
    let mut state = ClientIdentityState::default();
    state.set_fact(IdentitySource::Secondary, Some(IdentityRecord::new("s")));
    state.set_fact(IdentitySource::Secondary, None);
    assert!(state.secondary_user().is_none());
}

#[test]
fn facts_stay_in_precedence_order() {
    let mut state = ClientIdentityState::default();
    state.set_fact(IdentitySource::Primary, Some(IdentityRecord::new("p")));
    state.set_fact(IdentitySource::Secondary, Some(IdentityRecord::new("s")));
    assert_eq!(state.facts[0].source, IdentitySource::Secondary);
    assert_eq!(state.facts[1].source, IdentitySource::Primary);
}

#[test]
fn admin_profile_uses_fixed_name() {
    let state = ClientIdentityState { local: LocalRole::Admin, ..ClientIdentityState::default() };
    assert!(state.is_privileged_admin());
    assert!(!state.is_guest());
    assert_eq!(state.profile().unwrap().display_name, "Administrador");
}

#[test]
fn view_reflects_accessors() {
    let mut state = ClientIdentityState { local: LocalRole::Guest, resolution: Resolution::Resolved, ..Default::default() };
    state.set_fact(IdentitySource::Primary, Some(IdentityRecord::new("p")));
    let view = IdentityView::from(&state);
    assert!(view.is_guest);
    assert!(!view.is_resolving);
    assert_eq!(view.primary_user.unwrap().id, "p");
    assert_eq!(view.role, Role::Guest);
}
