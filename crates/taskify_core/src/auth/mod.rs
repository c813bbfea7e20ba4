//! Auth session collaborator contract.
//!
//! # Responsibility
//! - Describe the signed-in identity consumed by the store and remote clients.
//! - Publish identity changes to subscribers.
//!
//! # Invariants
//! - Subscribers observe `None` whenever nobody is signed in.
//! - `AuthError` display text is suitable for direct presentation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use tokio::sync::watch;

mod local;

pub use local::LocalAuthSession;

/// Opaque user identifier issued by the auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Signed-in user as seen by the rest of the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

impl Identity {
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            display_name: None,
            email: None,
        }
    }
}

/// Receiving half of the identity channel.
pub type IdentityReceiver = watch::Receiver<Option<Identity>>;

/// Auth failures. `Display` output is user-facing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    InvalidEmail(String),
    WeakPassword,
    EmailTaken,
    InvalidCredentials,
    Storage(String),
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidEmail(value) => write!(f, "`{value}` is not a valid email address"),
            Self::WeakPassword => write!(
                f,
                "password must be at least {} characters",
                local::MIN_PASSWORD_CHARS
            ),
            Self::EmailTaken => write!(f, "an account with this email already exists"),
            Self::InvalidCredentials => write!(f, "invalid email or password"),
            Self::Storage(message) => write!(f, "auth storage error: {message}"),
        }
    }
}

impl Error for AuthError {}

impl From<rusqlite::Error> for AuthError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(value.to_string())
    }
}

/// Session provider used by UI hosts.
///
/// The synchronization store only consumes [`AuthSession::subscribe`]; it
/// never signs in or out itself.
#[async_trait(?Send)]
pub trait AuthSession {
    fn current_identity(&self) -> Option<Identity>;
    fn is_loading(&self) -> bool;
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError>;
    async fn sign_up(&self, name: &str, email: &str, password: &str)
        -> Result<Identity, AuthError>;
    async fn sign_out(&self) -> Result<(), AuthError>;
    fn subscribe(&self) -> IdentityReceiver;
}

/// Reads the identity currently published on `receiver`.
pub fn current_identity(receiver: &IdentityReceiver) -> Option<Identity> {
    receiver.borrow().clone()
}
