use chrono::Utc;
use tokio::sync::watch;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{AuthState, Session},
    services::providers::IdentityProvider,
};

/// Single-user identity adapter for local deployments
///
/// Publishes auth transitions on a watch channel, the same observable shape a
/// hosted identity service would feed. There is no session store to probe, so
/// the restore phase settles to signed-out during construction; `login`
/// establishes the configured user (one stable user id per process) and
/// `logout` clears it. Subscribers that miss intermediate states still land
/// on the latest one: watch channels retain only the newest value.
pub struct LocalIdentityProvider {
    state_tx: watch::Sender<AuthState>,
    user_id: String,
    email: String,
}

impl LocalIdentityProvider {
    /// Creates the provider with its restore probe already settled
    pub fn new(email: impl Into<String>) -> Self {
        let state_tx = watch::Sender::new(AuthState::resolving());
        // Nothing to restore locally, so the probe settles at once.
        state_tx.send_replace(AuthState::signed_out());

        Self {
            state_tx,
            user_id: Uuid::new_v4().to_string(),
            email: email.into(),
        }
    }
}

#[async_trait::async_trait]
impl IdentityProvider for LocalIdentityProvider {
    fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state_tx.subscribe()
    }

    async fn login(&self) -> AppResult<()> {
        self.state_tx.send_replace(AuthState::resolving());

        let session = Session {
            user_id: self.user_id.clone(),
            email: self.email.clone(),
            signed_in_at: Utc::now(),
        };

        tracing::info!(user_id = %session.user_id, email = %session.email, "Local session established");
        self.state_tx.send_replace(AuthState::signed_in(session));
        Ok(())
    }

    async fn logout(&self) -> AppResult<()> {
        tracing::info!("Local session cleared");
        self.state_tx.send_replace(AuthState::signed_out());
        Ok(())
    }
}
