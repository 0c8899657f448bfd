use crate::workflows::intake::domain::ClientId;
use crate::workflows::intake::portal::PortalTokens;

fn tokens() -> PortalTokens {
    PortalTokens::new("unit-test-secret", 3600)
}

#[test]
fn round_trip_verifies_for_the_bound_client() {
    let portal = tokens();
    let client_id = ClientId::random();
    let token = portal.create(&client_id);
    assert!(portal.verify(&token, &client_id));
}

#[test]
fn rejects_a_different_client() {
    let portal = tokens();
    let token = portal.create(&ClientId::random());
    assert!(!portal.verify(&token, &ClientId::random()));
}

#[test]
fn rejects_after_expiry() {
    let portal = tokens();
    let client_id = ClientId::random();
    let token = portal.create_with_ttl(&client_id, -1);
    assert!(!portal.verify(&token, &client_id));
}

#[test]
fn rejects_tampered_payload() {
    let portal = tokens();
    let client_id = ClientId::random();
    let token = portal.create(&client_id);
    let (payload, signature) = token.split_once('.').expect("token has two segments");
    let mut forged = payload.to_string();
    forged.push('A');
    assert!(!portal.verify(&format!("{forged}.{signature}"), &client_id));
}

#[test]
fn rejects_wrong_secret() {
    let client_id = ClientId::random();
    let token = PortalTokens::new("secret-a", 3600).create(&client_id);
    assert!(!PortalTokens::new("secret-b", 3600).verify(&token, &client_id));
}

#[test]
fn rejects_garbage_tokens() {
    let portal = tokens();
    let client_id = ClientId::random();
    for garbage in ["", "no-dot", "a.b", "a.b.c", "!!!.???"] {
        assert!(!portal.verify(garbage, &client_id), "accepted '{garbage}'");
    }
}

#[test]
fn exposes_expiration_for_display() {
    let portal = tokens();
    let token = portal.create(&ClientId::random());
    let exp = PortalTokens::token_expiration(&token).expect("payload parses");
    assert!(exp > chrono::Utc::now().timestamp());
    assert_eq!(PortalTokens::token_expiration("garbage"), None);
}
