//! Email normalization tests.

use crate::*;

#[test]
fn test_normalizes_case_and_whitespace() {
    assert_eq!(
        normalize_email("  Kari.Nordmann+jobs@Example.NO ").unwrap(),
        "kari.nordmann+jobs@example.no"
    );
    assert_eq!(
        EmailSession::new("OLA@example.com").unwrap().email,
        "ola@example.com"
    );
}

#[test]
fn test_rejects_malformed() {
    for email in [
        "",
        "plainaddress",
        "@example.com",
        "user@",
        "user@localhost",
        "a@b@example.com",
        "user name@example.com",
        "user@exa mple.com",
        "user@.example.com",
        "user@example..com",
    ] {
        assert!(
            matches!(normalize_email(email), Err(SessionError::InvalidEmail(_))),
            "{email:?} should be rejected"
        );
    }
}

#[test]
fn test_rejects_too_long() {
    let email = format!("{}@example.com", "a".repeat(250));
    assert!(normalize_email(&email).is_err());
}
