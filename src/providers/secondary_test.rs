use super::*;

fn client() -> HostedSecondary {
    HostedSecondary::new(
        reqwest::Client::new(),
        SecondaryAuthConfig { base_url: "https://id.example.invalid/v1".into(), api_key: "k".into() },
    )
}

#[test]
fn parse_lookup_takes_first_account() {
    let text = r#"{"kind": "identitytoolkit#GetAccountInfoResponse", "users": [
        {"localId": "abc", "email": "eva@example.com", "displayName": "Eva", "photoUrl": "https://img/e.png"},
        {"localId": "ignored"}
    ]}"#;
    let user = parse_lookup(text).unwrap();
    assert_eq!(user.id, "abc");
    assert_eq!(user.display_name.as_deref(), Some("Eva"));
    assert_eq!(user.photo_url.as_deref(), Some("https://img/e.png"));
}

#[test]
fn parse_lookup_without_users_fails() {
    assert!(matches!(parse_lookup(r#"{"kind": "x"}"#), Err(IdentityError::Credential(_))));
}

#[test]
fn error_message_reads_envelope() {
    let text = r#"{"error": {"code": 400, "message": "INVALID_ID_TOKEN"}}"#;
    assert_eq!(parse_error_message(text, 400), "INVALID_ID_TOKEN");
    assert_eq!(parse_error_message("", 503), "identity provider returned status 503");
}

#[test]
fn lookup_url_carries_key() {
    assert_eq!(client().lookup_url(), "https://id.example.invalid/v1/accounts:lookup?key=k");
}

#[tokio::test]
async fn empty_grant_is_rejected_without_request() {
    let err = client()
        .sign_in_with_popup(PopupGrant("  ".into()))
        .await
        .unwrap_err();
    assert_eq!(err, IdentityError::Credential(POPUP_CLOSED_MESSAGE.into()));
}

#[tokio::test]
async fn sign_out_publishes_signed_out() {
    let secondary = client();
    secondary
        .session
        .send_replace(ProviderSession::SignedIn(IdentityRecord::new("abc")));
    secondary.sign_out().await.unwrap();
    assert_eq!(*secondary.watch().borrow(), ProviderSession::SignedOut);
}
