//! SQLite-backed auth session for single-device use.
//!
//! # Responsibility
//! - Store accounts in the `users` table with Argon2 password hashes in PHC
//!   string form (algorithm, parameters and salt travel with the hash).
//! - Publish the signed-in identity on a watch channel.
//!
//! # Invariants
//! - Emails are stored lowercase and trimmed.
//! - Plain-text passwords never reach storage or logs.

use super::{AuthError, AuthSession, Identity, IdentityReceiver, UserId};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::Cell;
use std::rc::Rc;
use tokio::sync::watch;
use uuid::Uuid;

pub(super) const MIN_PASSWORD_CHARS: usize = 6;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Local account store plus the current session.
pub struct LocalAuthSession {
    conn: Rc<Connection>,
    identity_tx: watch::Sender<Option<Identity>>,
    loading: Cell<bool>,
}

impl LocalAuthSession {
    /// Creates a signed-out session over a migrated connection.
    pub fn new(conn: Rc<Connection>) -> Self {
        let (identity_tx, _) = watch::channel(None);
        Self {
            conn,
            identity_tx,
            loading: Cell::new(false),
        }
    }

    fn publish(&self, identity: Option<Identity>) {
        self.identity_tx.send_replace(identity);
    }

    fn with_loading<T>(&self, op: impl FnOnce() -> Result<T, AuthError>) -> Result<T, AuthError> {
        self.loading.set(true);
        let result = op();
        self.loading.set(false);
        result
    }

    fn insert_account(&self, name: &str, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AuthError::WeakPassword);
        }

        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1);",
            [email.as_str()],
            |row| row.get(0),
        )?;
        if exists {
            return Err(AuthError::EmailTaken);
        }

        let id = UserId::new(Uuid::new_v4().to_string());
        let display_name = match name.trim() {
            "" => default_display_name(&email),
            trimmed => trimmed.to_string(),
        };
        let password_hash = hash_password(password)?;
        self.conn.execute(
            "INSERT INTO users (id, email, display_name, password_hash)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                id.as_str(),
                email.as_str(),
                display_name.as_str(),
                password_hash.as_str(),
            ],
        )?;

        Ok(Identity {
            id,
            display_name: Some(display_name),
            email: Some(email),
        })
    }

    fn verify_account(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = normalize_email(email)?;
        let row = self
            .conn
            .query_row(
                "SELECT id, display_name, password_hash
                 FROM users
                 WHERE email = ?1;",
                [email.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, display_name, stored_hash)) = row else {
            return Err(AuthError::InvalidCredentials);
        };
        if !password_matches(password, &stored_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(Identity {
            id: UserId::new(id),
            display_name: display_name.or_else(|| Some(default_display_name(&email))),
            email: Some(email),
        })
    }
}

#[async_trait(?Send)]
impl AuthSession for LocalAuthSession {
    fn current_identity(&self) -> Option<Identity> {
        self.identity_tx.borrow().clone()
    }

    fn is_loading(&self) -> bool {
        self.loading.get()
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        match self.with_loading(|| self.verify_account(email, password)) {
            Ok(identity) => {
                info!("event=auth_sign_in module=auth status=ok user_id={}", identity.id);
                self.publish(Some(identity.clone()));
                Ok(identity)
            }
            Err(err) => {
                warn!("event=auth_sign_in module=auth status=error error={err}");
                Err(err)
            }
        }
    }

    async fn sign_up(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Identity, AuthError> {
        match self.with_loading(|| self.insert_account(name, email, password)) {
            Ok(identity) => {
                info!("event=auth_sign_up module=auth status=ok user_id={}", identity.id);
                self.publish(Some(identity.clone()));
                Ok(identity)
            }
            Err(err) => {
                warn!("event=auth_sign_up module=auth status=error error={err}");
                Err(err)
            }
        }
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.publish(None);
        info!("event=auth_sign_out module=auth status=ok");
        Ok(())
    }

    fn subscribe(&self) -> IdentityReceiver {
        self.identity_tx.subscribe()
    }
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let normalized = email.trim().to_lowercase();
    if !EMAIL_RE.is_match(&normalized) {
        return Err(AuthError::InvalidEmail(email.trim().to_string()));
    }
    Ok(normalized)
}

fn default_display_name(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AuthError::Storage(format!("password hashing failed: {err}")))
}

/// `Err` only when the stored value is not a readable PHC string.
fn password_matches(password: &str, stored_hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|err| AuthError::Storage(format!("unreadable password hash: {err}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::{default_display_name, hash_password, normalize_email, password_matches};
    use crate::auth::AuthError;

    #[test]
    fn email_is_trimmed_and_lowercased() {
        assert_eq!(
            normalize_email("  Ada@Example.COM ").unwrap(),
            "ada@example.com"
        );
    }

    #[test]
    fn malformed_email_is_rejected() {
        assert!(matches!(
            normalize_email("not-an-email"),
            Err(AuthError::InvalidEmail(_))
        ));
    }

    #[test]
    fn display_name_defaults_to_local_part() {
        assert_eq!(default_display_name("ada@example.com"), "ada");
    }

    #[test]
    fn hash_is_salted_argon2_phc_string() {
        let first = hash_password("secret").unwrap();
        let second = hash_password("secret").unwrap();
        assert!(first.starts_with("$argon2id$"));
        assert!(!first.contains("secret"));
        assert_ne!(first, second);
    }

    #[test]
    fn stored_hash_verifies_only_the_original_password() {
        let stored = hash_password("hunter22").unwrap();
        assert!(password_matches("hunter22", &stored).unwrap());
        assert!(!password_matches("hunter23", &stored).unwrap());
    }

    #[test]
    fn non_phc_hash_is_reported_as_storage_error() {
        let digest = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";
        assert!(matches!(
            password_matches("secret", digest),
            Err(AuthError::Storage(_))
        ));
    }
}
