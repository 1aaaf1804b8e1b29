//! Integration tests for optimistic view state, driven the way the client
//! flows drive it: begin, await a (simulated) response, then settle.

use schoolhub_protocol::{Club, ClubId, Profile};
use schoolhub_state::{Optimistic, Reconciler, StateError};

// =========================================================================
// Helpers
// =========================================================================

fn club(id: u64, members: u32, joined: bool) -> Club {
    Club {
        id: ClubId(id),
        title: format!("Club {id}"),
        description: String::new(),
        direction: Some("Science".into()),
        class_limit_min: Some(5),
        class_limit_max: Some(11),
        members_count: members,
        joined,
        administration: None,
    }
}

fn join(c: &mut Club) {
    c.joined = true;
    c.members_count += 1;
}

fn leave(c: &mut Club) {
    c.joined = false;
    c.members_count = c.members_count.saturating_sub(1);
}

fn profile() -> Profile {
    Profile {
        name: "Anna".into(),
        surname: "Ivanova".into(),
        login: "anna".into(),
        email: None,
        telegram_name: None,
        class_number: 9,
        class_letter: "B".into(),
    }
}

/// Stand-in for the network: `Ok(server_object)` or `Err(())`.
fn settle(r: &mut Reconciler<Club>, id: ClubId, response: Result<Option<Club>, ()>) {
    match response {
        Ok(server) => {
            r.commit(id, server).unwrap();
        }
        Err(()) => {
            r.rollback(id).unwrap();
        }
    }
}

// =========================================================================
// Clubs
// =========================================================================

#[test]
fn test_rejected_join_restores_pre_update_values() {
    let mut clubs = Reconciler::new();
    clubs.replace_all([club(1, 12, false)]);

    clubs.begin(ClubId(1), join).unwrap();
    assert_eq!(clubs.get(ClubId(1)).unwrap().members_count, 13);
    settle(&mut clubs, ClubId(1), Err(()));

    let c = clubs.get(ClubId(1)).unwrap();
    assert!(!c.joined);
    assert_eq!(c.members_count, 12);
}

#[test]
fn test_accepted_join_increments_exactly_once() {
    let mut clubs = Reconciler::new();
    clubs.replace_all([club(1, 12, false)]);

    clubs.begin(ClubId(1), join).unwrap();
    settle(&mut clubs, ClubId(1), Ok(None));

    let c = clubs.get(ClubId(1)).unwrap();
    assert!(c.joined);
    assert_eq!(c.members_count, 13);
    assert!(!clubs.is_pending(ClubId(1)));
}

#[test]
fn test_accepted_join_with_server_object_uses_server_count() {
    let mut clubs = Reconciler::new();
    clubs.replace_all([club(1, 12, false)]);

    clubs.begin(ClubId(1), join).unwrap();
    settle(&mut clubs, ClubId(1), Ok(Some(club(1, 20, true))));

    assert_eq!(clubs.get(ClubId(1)).unwrap().members_count, 20);
}

#[test]
fn test_leave_at_zero_members_saturates() {
    let mut clubs = Reconciler::new();
    clubs.replace_all([club(1, 0, true)]);

    clubs.begin(ClubId(1), leave).unwrap();

    assert_eq!(clubs.get(ClubId(1)).unwrap().members_count, 0);
}

#[test]
fn test_double_tap_join_is_rejected_until_settled() {
    let mut clubs = Reconciler::new();
    clubs.replace_all([club(1, 12, false)]);
    clubs.begin(ClubId(1), join).unwrap();

    assert!(matches!(
        clubs.begin(ClubId(1), join),
        Err(StateError::MutationInFlight(_))
    ));

    settle(&mut clubs, ClubId(1), Ok(None));
    clubs.begin(ClubId(1), leave).unwrap();
    assert_eq!(clubs.get(ClubId(1)).unwrap().members_count, 12);
}

#[test]
fn test_created_club_merged_twice_appears_once() {
    let mut clubs = Reconciler::new();
    clubs.replace_all([club(1, 12, false)]);

    let created = club(2, 1, true);
    clubs.merge_confirmed(created.clone());
    clubs.merge_confirmed(created);

    assert_eq!(clubs.len(), 2);
}

// =========================================================================
// Profile
// =========================================================================

#[test]
fn test_profile_rejected_edit_reverts_login_and_email() {
    let mut view = Optimistic::new(profile());

    view.begin("profile", |p| {
        p.login = "anna.iv".into();
        p.email = Some("anna@school.test".into());
    })
    .unwrap();
    assert_eq!(view.view().login, "anna.iv");

    view.rollback("profile").unwrap();

    assert_eq!(view.view(), &profile());
}
