//! Supabase Storefront
//!
//! Session and cart stores for a storefront backed by Supabase. Sign-in and
//! sign-out go to the Supabase identity service; the cart lives in a
//! PostgREST table and is refetched in full after every change.

pub mod auth;
pub mod postgrest;
pub mod store;
pub mod error;
pub mod config;
pub mod fetch;

use std::sync::Arc;

use reqwest::Client;

use crate::auth::Auth;
use crate::config::{ClientOptions, ProjectConfig};
use crate::error::Error;
use crate::store::{CartStore, SessionStore, SupabaseCartRepository};

/// The main entry point for the storefront client
pub struct Supabase {
    /// The base URL for the Supabase project
    pub url: String,
    /// The anonymous API key for the Supabase project
    pub key: String,
    /// HTTP client used for requests
    pub http_client: Client,
    /// Auth client for sign-in and session state
    pub auth: Auth,
    /// Client options
    pub options: ClientOptions,
}

impl Supabase {
    /// Create a new client
    ///
    /// # Example
    ///
    /// ```
    /// use supabase_storefront::Supabase;
    ///
    /// let supabase = Supabase::new("https://your-project-url.supabase.co", "your-anon-key");
    /// ```
    pub fn new(supabase_url: &str, supabase_key: &str) -> Self {
        Self::new_with_options(supabase_url, supabase_key, ClientOptions::default())
    }

    /// Create a new client with custom options
    ///
    /// # Example
    ///
    /// ```
    /// use supabase_storefront::{Supabase, config::ClientOptions};
    ///
    /// let options = ClientOptions::default().with_cart_table("basket_items");
    /// let supabase = Supabase::new_with_options(
    ///     "https://your-project-url.supabase.co",
    ///     "your-anon-key",
    ///     options
    /// );
    /// ```
    pub fn new_with_options(supabase_url: &str, supabase_key: &str, options: ClientOptions) -> Self {
        let url = supabase_url.trim_end_matches('/');
        let http_client = Client::new();
        let auth = Auth::new(url, supabase_key, http_client.clone(), options.clone());

        Self {
            url: url.to_string(),
            key: supabase_key.to_string(),
            http_client,
            auth,
            options,
        }
    }

    /// Create a client from `SUPABASE_URL` and `SUPABASE_KEY`
    pub fn from_env() -> Result<Self, Error> {
        let project = ProjectConfig::from_env()?;
        Ok(Self::new(&project.url, &project.key))
    }

    /// Get a reference to the auth client
    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    /// Cart repository over the configured cart table
    pub fn cart_repository(&self) -> SupabaseCartRepository {
        SupabaseCartRepository::new(
            &self.url,
            &self.key,
            self.http_client.clone(),
            self.auth.clone(),
            self.options.clone(),
        )
    }

    /// A session store signing in through this client's auth
    pub fn session_store(&self) -> SessionStore {
        SessionStore::new(Arc::new(self.auth.clone()))
    }

    /// A cart store over this client's cart table
    ///
    /// Cart requests carry whatever session the auth client holds when they
    /// are made, so a session store from [`Supabase::session_store`] and this
    /// store see the same user.
    pub fn cart_store(&self) -> CartStore {
        CartStore::new(Arc::new(self.cart_repository()))
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::Supabase;
    pub use crate::error::Error;
    pub use crate::config::ClientOptions;
    pub use crate::store::{CartLine, CartStore, Principal, SessionStore, SyncReport};
}
