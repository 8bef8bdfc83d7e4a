//! Configuration options for the storefront client

use std::time::Duration;

use crate::error::Error;

/// Environment variable holding the project URL
pub const URL_ENV: &str = "SUPABASE_URL";

/// Environment variable holding the anon key
pub const KEY_ENV: &str = "SUPABASE_KEY";

/// Configuration options for the storefront client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Whether to keep the session returned by sign-in for later requests
    pub persist_session: bool,

    /// The request timeout. `None` leaves requests unbounded.
    pub request_timeout: Option<Duration>,

    /// The database schema
    pub db_schema: String,

    /// Table holding cart rows
    pub cart_table: String,

    /// Table the cart rows reference for product display fields
    pub products_table: String,

    /// Value sent in the `X-Client-Info` header
    pub client_info: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            persist_session: true,
            request_timeout: None,
            db_schema: "public".to_string(),
            cart_table: "cart_items".to_string(),
            products_table: "products".to_string(),
            client_info: concat!("supabase-storefront/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientOptions {
    /// Set whether to persist the session
    pub fn with_persist_session(mut self, value: bool) -> Self {
        self.persist_session = value;
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the database schema
    pub fn with_db_schema(mut self, value: &str) -> Self {
        self.db_schema = value.to_string();
        self
    }

    /// Set the cart table name
    pub fn with_cart_table(mut self, value: &str) -> Self {
        self.cart_table = value.to_string();
        self
    }

    /// Set the products table name
    pub fn with_products_table(mut self, value: &str) -> Self {
        self.products_table = value.to_string();
        self
    }

    /// Set the `X-Client-Info` header value
    pub fn with_client_info(mut self, value: &str) -> Self {
        self.client_info = value.to_string();
        self
    }
}

/// Connection settings for a Supabase project
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    /// The base URL for the project
    pub url: String,

    /// The anonymous API key
    pub key: String,
}

impl ProjectConfig {
    /// Read the project settings from `SUPABASE_URL` and `SUPABASE_KEY`
    pub fn from_env() -> Result<Self, Error> {
        let url = std::env::var(URL_ENV)
            .map_err(|_| Error::general(format!("{} must be set", URL_ENV)))?;
        let key = std::env::var(KEY_ENV)
            .map_err(|_| Error::general(format!("{} must be set", KEY_ENV)))?;

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            key,
        })
    }
}
