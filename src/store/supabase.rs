//! Store collaborators backed by the hosted Supabase services

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Serialize;

use crate::auth::{Auth, User};
use crate::config::ClientOptions;
use crate::error::Error;
use crate::postgrest::PostgrestClient;

use super::remote::{CartRepository, IdentityService};
use super::types::{CartLine, CartRow};

#[async_trait]
impl IdentityService for Auth {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<User, Error> {
        let session = Auth::sign_in_with_password(self, email, password).await?;
        Ok(session.user)
    }

    async fn sign_out(&self) -> Result<(), Error> {
        match Auth::sign_out(self).await {
            Err(Error::MissingSession) => {
                debug!("sign-out without a session, nothing to revoke");
                Ok(())
            }
            result => result,
        }
    }
}

#[derive(Serialize)]
struct NewCartRow<'a> {
    product_id: &'a str,
    quantity: u32,
}

#[derive(Serialize)]
struct QuantityPatch {
    quantity: u32,
}

/// Cart rows stored in a PostgREST table
///
/// Each request is authorized with the access token of the session held by
/// `auth` at the time of the call, so row-level security scopes the rows to
/// the signed-in user.
#[derive(Clone)]
pub struct SupabaseCartRepository {
    url: String,
    key: String,
    client: Client,
    auth: Auth,
    options: ClientOptions,
}

impl SupabaseCartRepository {
    /// Create a repository for the project at `url`
    pub fn new(url: &str, key: &str, client: Client, auth: Auth, options: ClientOptions) -> Self {
        Self {
            url: url.to_string(),
            key: key.to_string(),
            client,
            auth,
            options,
        }
    }

    fn table(&self) -> PostgrestClient {
        PostgrestClient::new(
            &self.url,
            &self.key,
            &self.options.cart_table,
            self.client.clone(),
            self.options.clone(),
        )
        .with_auth(&self.auth.bearer_token())
    }

    /// Select expression embedding the product display fields as `product`
    pub fn joined_columns(&self) -> String {
        format!("*,product:{}(name,price,image_url)", self.options.products_table)
    }
}

#[async_trait]
impl CartRepository for SupabaseCartRepository {
    async fn list_lines(&self) -> Result<Vec<CartLine>, Error> {
        self.table()
            .select(&self.joined_columns())
            .execute::<CartLine>()
            .await
    }

    async fn find_by_product(&self, product_id: &str) -> Result<Option<CartRow>, Error> {
        self.table()
            .select("*")
            .eq("product_id", product_id)
            .execute_single::<CartRow>()
            .await
    }

    async fn insert(&self, product_id: &str, quantity: u32) -> Result<(), Error> {
        self.table()
            .insert(NewCartRow { product_id, quantity })
            .execute_no_return()
            .await
    }

    async fn set_quantity_by_id(&self, row_id: &str, quantity: u32) -> Result<(), Error> {
        self.table()
            .update(QuantityPatch { quantity })
            .eq("id", row_id)
            .execute_no_return()
            .await
    }

    async fn set_quantity_by_product(&self, product_id: &str, quantity: u32) -> Result<(), Error> {
        self.table()
            .update(QuantityPatch { quantity })
            .eq("product_id", product_id)
            .execute_no_return()
            .await
    }

    async fn delete_by_product(&self, product_id: &str) -> Result<(), Error> {
        self.table()
            .delete()
            .eq("product_id", product_id)
            .execute_no_return()
            .await
    }
}
