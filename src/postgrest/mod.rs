//! Database operations through the PostgREST API

mod query;
mod filter;

use reqwest::Client;
use serde::Serialize;

use crate::config::ClientOptions;

pub use query::*;
pub use filter::*;

/// Client for database operations on one table
pub struct PostgrestClient {
    target: Target,
}

impl PostgrestClient {
    /// Create a new PostgrestClient
    ///
    /// Requests are authorized with the anon key until [`with_auth`] supplies
    /// a user's access token.
    ///
    /// [`with_auth`]: PostgrestClient::with_auth
    pub fn new(url: &str, key: &str, table: &str, client: Client, options: ClientOptions) -> Self {
        Self {
            target: Target {
                url: format!("{}/rest/v1/{}", url.trim_end_matches('/'), table),
                key: key.to_string(),
                bearer: key.to_string(),
                client,
                options,
            },
        }
    }

    /// Authorize requests as the holder of `token`
    pub fn with_auth(mut self, token: &str) -> Self {
        self.target.bearer = token.to_string();
        self
    }

    /// The table URL requests are sent to
    pub fn url(&self) -> &str {
        &self.target.url
    }

    /// Select specific columns from the table
    pub fn select(&self, columns: &str) -> SelectBuilder {
        SelectBuilder::new(self.target.clone(), columns)
    }

    /// Insert data into the table
    pub fn insert<T: Serialize>(&self, values: T) -> InsertBuilder<T> {
        InsertBuilder::new(self.target.clone(), values)
    }

    /// Update data in the table
    pub fn update<T: Serialize>(&self, values: T) -> UpdateBuilder<T> {
        UpdateBuilder::new(self.target.clone(), values)
    }

    /// Delete data from the table
    pub fn delete(&self) -> DeleteBuilder {
        DeleteBuilder::new(self.target.clone())
    }
}
