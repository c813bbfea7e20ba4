use taskify_core::{open_shared_db, AuthError, AuthSession, LocalAuthSession};

fn session() -> LocalAuthSession {
    LocalAuthSession::new(open_shared_db(None).unwrap())
}

#[tokio::test]
async fn sign_up_publishes_identity_and_defaults_display_name() {
    let auth = session();
    let mut identities = auth.subscribe();
    assert_eq!(*identities.borrow(), None);

    let identity = auth
        .sign_up("  ", " Ada@Example.com ", "hunter22")
        .await
        .unwrap();
    assert_eq!(identity.email.as_deref(), Some("ada@example.com"));
    assert_eq!(identity.display_name.as_deref(), Some("ada"));

    assert!(identities.has_changed().unwrap());
    assert_eq!(*identities.borrow_and_update(), Some(identity.clone()));
    assert_eq!(auth.current_identity(), Some(identity));
    assert!(!auth.is_loading());
}

#[tokio::test]
async fn sign_in_after_sign_out_restores_same_user() {
    let auth = session();
    let created = auth
        .sign_up("Ada", "ada@example.com", "hunter22")
        .await
        .unwrap();

    auth.sign_out().await.unwrap();
    assert_eq!(auth.current_identity(), None);

    let signed_in = auth.sign_in("ADA@example.com", "hunter22").await.unwrap();
    assert_eq!(signed_in.id, created.id);
    assert_eq!(signed_in.display_name.as_deref(), Some("Ada"));
}

#[tokio::test]
async fn rejected_credentials_leave_session_signed_out() {
    let auth = session();
    auth.sign_up("Ada", "ada@example.com", "hunter22")
        .await
        .unwrap();
    auth.sign_out().await.unwrap();

    assert_eq!(
        auth.sign_in("ada@example.com", "wrong-pass").await.unwrap_err(),
        AuthError::InvalidCredentials
    );
    assert_eq!(
        auth.sign_in("nobody@example.com", "hunter22")
            .await
            .unwrap_err(),
        AuthError::InvalidCredentials
    );
    assert_eq!(auth.current_identity(), None);
}

#[tokio::test]
async fn sign_up_validates_input() {
    let auth = session();

    assert!(matches!(
        auth.sign_up("Ada", "not-an-email", "hunter22").await,
        Err(AuthError::InvalidEmail(_))
    ));
    assert_eq!(
        auth.sign_up("Ada", "ada@example.com", "short")
            .await
            .unwrap_err(),
        AuthError::WeakPassword
    );

    auth.sign_up("Ada", "ada@example.com", "hunter22")
        .await
        .unwrap();
    assert_eq!(
        auth.sign_up("Other", "ADA@example.com", "hunter22")
            .await
            .unwrap_err(),
        AuthError::EmailTaken
    );
}

#[tokio::test]
async fn error_messages_are_presentable() {
    assert_eq!(
        AuthError::InvalidCredentials.to_string(),
        "invalid email or password"
    );
    assert!(AuthError::WeakPassword.to_string().contains('6'));
}

#[tokio::test]
async fn stored_password_is_an_argon2_phc_string() {
    let conn = open_shared_db(None).unwrap();
    let auth = LocalAuthSession::new(std::rc::Rc::clone(&conn));
    auth.sign_up("Ada", "ada@example.com", "hunter22")
        .await
        .unwrap();

    let stored: String = conn
        .query_row(
            "SELECT password_hash FROM users WHERE email = 'ada@example.com';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!(stored.starts_with("$argon2id$"));
    assert!(!stored.contains("hunter22"));
}
