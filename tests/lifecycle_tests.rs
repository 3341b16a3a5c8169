use chrono::{Duration, Utc};
use mycricmate_server::{
    auth::{tokens::fingerprint, TokenKeys, TokenType},
    domain::{
        squad::{Squad, SquadFull},
        status::{ApplicationStatus, InvitationStatus, TransitionError},
    },
};
use uuid::Uuid;

#[test]
fn squad_fills_through_mixed_recruitment() {
    let mut squad = Squad {
        current_player_count: 0,
        max_players: 2,
        is_squad_full: false,
    };

    // one player via application, one via invitation
    let app = ApplicationStatus::Pending.approve().unwrap();
    assert_eq!(app, ApplicationStatus::Accepted);
    squad.admit().unwrap();

    let now = Utc::now();
    let inv = InvitationStatus::Pending
        .respond(InvitationStatus::Accepted, now + Duration::days(7), now)
        .unwrap();
    assert_eq!(inv, InvitationStatus::Accepted);
    squad.admit().unwrap();

    assert!(squad.is_squad_full);
    assert_eq!(squad.current_player_count, 2);
    assert_eq!(squad.admit(), Err(SquadFull));
    assert_eq!(squad.current_player_count, 2);
}

#[test]
fn withdrawn_application_is_final() {
    let withdrawn = ApplicationStatus::Pending.withdraw().unwrap();
    for next in [withdrawn.approve(), withdrawn.reject(), withdrawn.withdraw()] {
        assert!(matches!(next, Err(TransitionError::ApplicationNotPending { .. })));
    }
}

#[test]
fn access_and_refresh_tokens_do_not_cross() {
    let keys = TokenKeys::new("lifecycle-secret", Duration::minutes(30), Duration::days(7));
    let user = Uuid::new_v4();

    let access = keys.issue_access(user).unwrap();
    let refresh = keys.issue_refresh(user).unwrap();

    assert_eq!(keys.verify(&access, TokenType::Access).unwrap().sub, user);
    assert_eq!(keys.verify(&refresh.token, TokenType::Refresh).unwrap().sub, user);
    assert!(keys.verify(&access, TokenType::Refresh).is_err());
    assert!(keys.verify(&refresh.token, TokenType::Access).is_err());

    // the ledger only ever sees the hash
    assert_eq!(refresh.token_hash, fingerprint(&refresh.token));
    assert_ne!(refresh.token_hash, refresh.token);
    assert!(refresh.expires_at > Utc::now() + Duration::days(6));
}

#[test]
fn two_refresh_tokens_in_the_same_second_differ() {
    let keys = TokenKeys::new("lifecycle-secret", Duration::minutes(30), Duration::days(7));
    let user = Uuid::new_v4();
    let a = keys.issue_refresh(user).unwrap();
    let b = keys.issue_refresh(user).unwrap();
    assert_ne!(a.token_hash, b.token_hash);
}

#[test]
fn expired_access_token_is_rejected() {
    let keys = TokenKeys::new("lifecycle-secret", Duration::seconds(-5), Duration::days(7));
    let token = keys.issue_access(Uuid::new_v4()).unwrap();
    assert!(keys.verify(&token, TokenType::Access).is_err());
}
