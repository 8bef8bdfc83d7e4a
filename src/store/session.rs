//! Session store: the signed-in principal and its derived privilege flag

use std::sync::{Arc, RwLock};

use log::{info, warn};

use crate::auth::User;
use crate::error::Error;

use super::remote::IdentityService;
use super::types::{is_privileged_identity, Principal};

/// Holds the authenticated principal and proxies sign-in/sign-out
///
/// The privilege flag is not stored; it is derived from the identity on every
/// read, so it cannot drift from it.
pub struct SessionStore {
    service: Arc<dyn IdentityService>,
    identity: RwLock<Option<User>>,
}

impl SessionStore {
    /// Create a store with no identity
    pub fn new(service: Arc<dyn IdentityService>) -> Self {
        Self {
            service,
            identity: RwLock::new(None),
        }
    }

    /// The current identity, if any
    pub fn identity(&self) -> Option<User> {
        match self.identity.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Whether the current identity is an admin
    pub fn is_privileged(&self) -> bool {
        match self.identity.read() {
            Ok(guard) => is_privileged_identity(guard.as_ref()),
            Err(poisoned) => is_privileged_identity(poisoned.into_inner().as_ref()),
        }
    }

    /// Identity and privilege flag read together
    pub fn snapshot(&self) -> Principal {
        Principal::from_identity(self.identity())
    }

    /// Overwrite the identity, e.g. from a restored session
    pub fn set_identity(&self, identity: Option<User>) {
        match self.identity.write() {
            Ok(mut guard) => *guard = identity,
            Err(poisoned) => *poisoned.into_inner() = identity,
        }
    }

    /// Sign in with email and password
    ///
    /// On failure nothing changes and the identity service's error is
    /// returned as-is.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, Error> {
        let user = self.service.sign_in_with_password(email, password).await?;

        self.set_identity(Some(user.clone()));
        info!(
            "session established for {} (privileged: {})",
            user.id,
            self.is_privileged()
        );
        Ok(user)
    }

    /// Sign out
    ///
    /// The remote call is always made and its outcome does not matter: the
    /// identity is cleared either way.
    pub async fn sign_out(&self) {
        if let Err(e) = self.service.sign_out().await {
            warn!("remote sign-out failed, clearing session anyway: {}", e);
        }

        self.set_identity(None);
        info!("session cleared");
    }
}
