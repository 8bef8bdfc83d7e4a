//! Authentication against the Supabase identity service

mod types;
mod session;

use std::sync::{Arc, RwLock};

use log::{debug, info};
use reqwest::Client;

use crate::config::ClientOptions;
use crate::error::Error;
use crate::fetch::{Fetch, FetchBuilder};

pub use types::*;
pub use session::*;

/// Client for Supabase Authentication
///
/// Cloning is cheap and clones share the current session, so a data client
/// built from a clone sees sign-ins made through the original.
#[derive(Clone)]
pub struct Auth {
    /// The base URL for the Supabase project
    url: String,

    /// The anonymous API key for the Supabase project
    key: String,

    /// HTTP client used for requests
    client: Client,

    /// The current session
    session: Arc<RwLock<Option<Session>>>,

    /// Client options
    options: ClientOptions,
}

impl Auth {
    /// Create a new Auth client
    pub fn new(url: &str, key: &str, client: Client, options: ClientOptions) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            client,
            session: Arc::new(RwLock::new(None)),
            options,
        }
    }

    fn get_auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.url, path)
    }

    fn request<'a>(&'a self, fetch: FetchBuilder<'a>) -> FetchBuilder<'a> {
        fetch
            .header("apikey", &self.key)
            .header("X-Client-Info", &self.options.client_info)
            .timeout(self.options.request_timeout)
            .on_error(Error::Auth)
    }

    /// Sign in a user with email and password
    ///
    /// On success the returned session becomes the current session (unless
    /// session persistence is disabled). On failure the current session is
    /// left untouched and the identity service's error detail is returned.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, Error> {
        let url = self.get_auth_url("/token");

        let credentials = PasswordCredentials {
            email: email.to_string(),
            password: password.to_string(),
        };

        let response = self
            .request(Fetch::post(&self.client, &url))
            .query([("grant_type", "password")])
            .json(&credentials)?
            .execute_raw()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await?;
            let detail = serde_json::from_str::<AuthErrorBody>(&text)
                .ok()
                .and_then(|body| body.detail().map(str::to_string))
                .unwrap_or(text);
            debug!("password grant rejected with status {}", status);
            return Err(Error::auth(detail));
        }

        let session: Session = response.json().await?;
        info!("signed in user {}", session.user.id);

        if self.options.persist_session {
            self.set_session(session.clone());
        }

        Ok(session)
    }

    /// Sign out the current user
    ///
    /// The local session is cleared even when the logout request fails.
    pub async fn sign_out(&self) -> Result<(), Error> {
        let token = self.take_session().map(|session| session.access_token);

        let token = match token {
            Some(token) => token,
            None => return Err(Error::MissingSession),
        };

        let url = self.get_auth_url("/logout");
        self.request(Fetch::post(&self.client, &url))
            .bearer_auth(&token)
            .execute_empty()
            .await?;

        info!("signed out");
        Ok(())
    }

    /// Get the user data for the currently authenticated user
    pub async fn get_user(&self) -> Result<User, Error> {
        let token = self.access_token().ok_or(Error::MissingSession)?;
        let url = self.get_auth_url("/user");

        self.request(Fetch::get(&self.client, &url))
            .bearer_auth(&token)
            .execute::<User>()
            .await
    }

    /// Get the current session
    pub fn get_session(&self) -> Option<Session> {
        match self.session.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Set the session
    pub fn set_session(&self, session: Session) {
        self.replace_session(Some(session));
    }

    /// Clear the session without contacting the identity service
    pub fn clear_session(&self) {
        self.replace_session(None);
    }

    /// The access token of the current session, if any
    pub fn access_token(&self) -> Option<String> {
        self.get_session().map(|session| session.access_token)
    }

    /// Bearer token for data requests: the session's access token, or the
    /// anon key when nobody is signed in
    pub fn bearer_token(&self) -> String {
        self.access_token().unwrap_or_else(|| self.key.clone())
    }

    fn take_session(&self) -> Option<Session> {
        match self.session.write() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }

    fn replace_session(&self, session: Option<Session>) {
        match self.session.write() {
            Ok(mut guard) => *guard = session,
            Err(poisoned) => *poisoned.into_inner() = session,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> Auth {
        Auth::new("http://localhost:54321/", "anon", Client::new(), ClientOptions::default())
    }

    #[test]
    fn bearer_falls_back_to_anon_key() {
        let auth = auth();
        assert_eq!(auth.bearer_token(), "anon");

        auth.set_session(Session::new("jwt".into(), "rt".into(), User::new("u1", None), 60));
        assert_eq!(auth.bearer_token(), "jwt");

        auth.clear_session();
        assert!(auth.get_session().is_none());
    }

    #[test]
    fn clones_share_session() {
        let auth = auth();
        let other = auth.clone();
        auth.set_session(Session::new("jwt".into(), "rt".into(), User::new("u1", None), 60));
        assert_eq!(other.access_token().as_deref(), Some("jwt"));
    }

    #[tokio::test]
    async fn sign_out_without_session_is_missing_session() {
        let err = auth().sign_out().await.unwrap_err();
        assert!(matches!(err, Error::MissingSession));
    }

    #[test]
    fn auth_url_has_no_double_slash() {
        assert_eq!(auth().get_auth_url("/logout"), "http://localhost:54321/auth/v1/logout");
    }
}
