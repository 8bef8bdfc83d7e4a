//! Query builders for PostgrestClient

use log::trace;
use reqwest::Client;
use serde::{Serialize, de::DeserializeOwned};

use crate::config::ClientOptions;
use crate::error::Error;
use crate::fetch::{Fetch, FetchBuilder};
use crate::postgrest::filter::*;

// Mutations never ask for the affected rows back.
const PREFER_MINIMAL: &str = "return=minimal";

/// Everything a request against one table needs
#[derive(Clone)]
pub struct Target {
    /// The table URL (`.../rest/v1/<table>`)
    pub url: String,

    /// The API key
    pub key: String,

    /// Bearer token sent as `Authorization`
    pub bearer: String,

    /// HTTP client
    pub client: Client,

    /// Client options
    pub options: ClientOptions,
}

impl Target {
    /// Apply the headers every PostgREST request carries
    fn prepare<'a>(&'a self, fetch: FetchBuilder<'a>, read: bool) -> FetchBuilder<'a> {
        let mut fetch = fetch
            .header("apikey", &self.key)
            .header("X-Client-Info", &self.options.client_info)
            .bearer_auth(&self.bearer)
            .timeout(self.options.request_timeout)
            .on_error(Error::Database);

        if self.options.db_schema != "public" {
            let profile = if read { "Accept-Profile" } else { "Content-Profile" };
            fetch = fetch.header(profile, &self.options.db_schema);
        }

        fetch
    }
}

/// Base query builder
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    /// Query parameters, in insertion order
    params: Vec<(String, String)>,
}

impl QueryBuilder {
    /// Create a new QueryBuilder
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Add a parameter to the query, replacing an earlier one with the same key
    pub fn set_param(&mut self, key: &str, value: &str) {
        self.params.retain(|(k, _)| k != key);
        self.params.push((key.to_string(), value.to_string()));
    }

    /// Add a filter; filters on the same column accumulate
    pub fn add_filter(&mut self, filter: Filter) {
        trace!("filter {:?}", filter);
        self.params.push(filter.to_param());
    }

    /// Get the query parameters
    pub fn get_params(&self) -> &[(String, String)] {
        &self.params
    }
}

/// Builder for SELECT queries
pub struct SelectBuilder {
    target: Target,
    query: QueryBuilder,
}

impl SelectBuilder {
    /// Create a new SelectBuilder
    pub fn new(target: Target, columns: &str) -> Self {
        let mut query = QueryBuilder::new();
        query.set_param("select", columns);

        Self { target, query }
    }

    /// Filter rows where column equals a value
    pub fn eq<T: ToString>(&mut self, column: &str, value: T) -> &mut Self {
        self.filter(Filter::eq(column, value))
    }

    fn filter(&mut self, filter: Filter) -> &mut Self {
        self.query.add_filter(filter);
        self
    }

    /// Limit the number of rows returned
    pub fn limit(&mut self, count: u32) -> &mut Self {
        self.query.set_param("limit", &count.to_string());
        self
    }

    /// The query parameters this builder will send
    pub fn params(&self) -> &[(String, String)] {
        self.query.get_params()
    }

    /// Execute the query and return the results
    pub async fn execute<T: DeserializeOwned>(&self) -> Result<Vec<T>, Error> {
        self.target
            .prepare(Fetch::get(&self.target.client, &self.target.url), true)
            .query(self.query.get_params().iter().cloned())
            .execute::<Vec<T>>()
            .await
    }

    /// Execute the query expecting exactly one row
    ///
    /// Zero rows yields `Ok(None)`; more than one row is an error, since the
    /// caller asked for a single match.
    pub async fn execute_single<T: DeserializeOwned>(&mut self) -> Result<Option<T>, Error> {
        self.limit(2);

        let mut rows = self.execute::<T>().await?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(rows.pop()),
            n => Err(Error::database(format!(
                "expected a single row, query returned {}",
                n
            ))),
        }
    }
}

/// Builder for INSERT queries
pub struct InsertBuilder<T: Serialize> {
    target: Target,
    values: T,
}

impl<T: Serialize> InsertBuilder<T> {
    /// Create a new InsertBuilder
    pub fn new(target: Target, values: T) -> Self {
        Self { target, values }
    }

    /// Execute the query without returning the inserted data
    pub async fn execute_no_return(&self) -> Result<(), Error> {
        self.target
            .prepare(Fetch::post(&self.target.client, &self.target.url), false)
            .header("Prefer", PREFER_MINIMAL)
            .json(&self.values)?
            .execute_empty()
            .await
    }
}

/// Builder for UPDATE queries
pub struct UpdateBuilder<T: Serialize> {
    target: Target,
    values: T,
    query: QueryBuilder,
}

impl<T: Serialize> UpdateBuilder<T> {
    /// Create a new UpdateBuilder
    pub fn new(target: Target, values: T) -> Self {
        Self {
            target,
            values,
            query: QueryBuilder::new(),
        }
    }

    /// Filter rows where column equals a value
    pub fn eq<V: ToString>(&mut self, column: &str, value: V) -> &mut Self {
        self.query.add_filter(Filter::eq(column, value));
        self
    }

    /// Execute the query without returning the updated data
    pub async fn execute_no_return(&self) -> Result<(), Error> {
        require_filter(&self.query, "update")?;

        self.target
            .prepare(Fetch::patch(&self.target.client, &self.target.url), false)
            .header("Prefer", PREFER_MINIMAL)
            .query(self.query.get_params().iter().cloned())
            .json(&self.values)?
            .execute_empty()
            .await
    }
}

/// Builder for DELETE queries
pub struct DeleteBuilder {
    target: Target,
    query: QueryBuilder,
}

impl DeleteBuilder {
    /// Create a new DeleteBuilder
    pub fn new(target: Target) -> Self {
        Self {
            target,
            query: QueryBuilder::new(),
        }
    }

    /// Filter rows where column equals a value
    pub fn eq<V: ToString>(&mut self, column: &str, value: V) -> &mut Self {
        self.query.add_filter(Filter::eq(column, value));
        self
    }

    /// Execute the query without returning the deleted data
    pub async fn execute_no_return(&self) -> Result<(), Error> {
        require_filter(&self.query, "delete")?;

        self.target
            .prepare(Fetch::delete(&self.target.client, &self.target.url), false)
            .header("Prefer", PREFER_MINIMAL)
            .query(self.query.get_params().iter().cloned())
            .execute_empty()
            .await
    }
}

// PostgREST refuses unfiltered UPDATE/DELETE; fail locally with a clearer message.
fn require_filter(query: &QueryBuilder, verb: &str) -> Result<(), Error> {
    if query.get_params().is_empty() {
        return Err(Error::database(format!("refusing to {} without a filter", verb)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_param_replaces_and_filters_accumulate() {
        let mut query = QueryBuilder::new();
        query.set_param("limit", "1");
        query.set_param("limit", "2");
        query.add_filter(Filter::eq("product_id", "a"));
        query.add_filter(Filter::eq("product_id", "b"));

        assert_eq!(
            query.get_params(),
            &[
                ("limit".to_string(), "2".to_string()),
                ("product_id".to_string(), "eq.a".to_string()),
                ("product_id".to_string(), "eq.b".to_string()),
            ]
        );
    }

    #[test]
    fn unfiltered_mutations_are_rejected() {
        let err = require_filter(&QueryBuilder::new(), "delete").unwrap_err();
        assert!(matches!(err, Error::Database(_)));
    }
}
