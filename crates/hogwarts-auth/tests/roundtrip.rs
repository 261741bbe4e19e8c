// Roundtrip tests for credential issuance and verification
//
// These tests validate that:
// 1. A freshly generated authority can issue a token that it immediately verifies
// 2. A second authority (as after a process restart) rejects that token
// 3. The password check and token issue compose into a login flow

use chrono::{Duration, Utc};
use hogwarts_auth::{AuthError, PasswordHasher, TokenAuthority};

fn roles(list: &[&str]) -> Vec<String> {
    list.iter().map(|r| r.to_string()).collect()
}

#[test]
fn test_issue_verify_roundtrip() {
    let authority = TokenAuthority::generate().expect("authority");
    let issued_at = Utc::now();

    let token = authority
        .issue("john", &roles(&["admin", "user"]), issued_at, Duration::hours(2))
        .expect("Issuing should succeed");

    let verified = authority.verify(&token).expect("Verification should succeed");
    assert_eq!(verified.subject, "john");
    assert_eq!(verified.roles, roles(&["admin", "user"]));
    assert_eq!(verified.issued_at.timestamp(), issued_at.timestamp());
    assert_eq!(
        verified.expires_at.timestamp(),
        (issued_at + Duration::hours(2)).timestamp()
    );
}

#[test]
fn test_restart_invalidates_previous_tokens() {
    let before_restart = TokenAuthority::generate().expect("authority");
    let token = before_restart
        .issue("eric", &roles(&["user"]), Utc::now(), Duration::hours(2))
        .expect("issue");

    let after_restart = TokenAuthority::generate().expect("authority");
    match after_restart.verify(&token) {
        Err(AuthError::InvalidToken(_)) => {}
        other => panic!("expected InvalidToken, got {:?}", other),
    }
}

#[test]
fn test_password_check_then_issue() {
    let hasher = PasswordHasher::with_cost(4);
    let stored_hash = hasher.hash("654321").expect("hash");

    assert!(hasher.verify("654321", &stored_hash).expect("verify"));
    assert!(!hasher.verify("wrong", &stored_hash).expect("verify"));

    let authority = TokenAuthority::generate().expect("authority");
    let token = authority
        .issue("tom", &roles(&["user"]), Utc::now(), Duration::minutes(10))
        .expect("issue");
    let verified = authority.verify(&token).expect("verify");
    assert_eq!(verified.subject, "tom");
    assert!(verified.has_role("user"));
    assert!(!verified.has_role("admin"));
}
