use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An established identity, opaque to the coordinator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    /// Identity-provider-assigned user id
    pub user_id: String,
    /// Email the user signed in with
    pub email: String,
    /// When this session was established
    pub signed_in_at: DateTime<Utc>,
}

/// Authentication state as published by the identity provider
///
/// `is_loading` is true while the provider is resolving (initial session
/// restore or an in-flight login). The coordinator only reads this state;
/// the provider owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    pub session: Option<Session>,
    pub is_loading: bool,
}

impl AuthState {
    /// State published before the provider has resolved anything
    pub fn resolving() -> Self {
        Self {
            session: None,
            is_loading: true,
        }
    }

    /// Settled state with no session
    pub fn signed_out() -> Self {
        Self {
            session: None,
            is_loading: false,
        }
    }

    /// Settled state with an established session
    pub fn signed_in(session: Session) -> Self {
        Self {
            session: Some(session),
            is_loading: false,
        }
    }
}
