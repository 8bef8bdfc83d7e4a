//! Remote collaborators the stores are written against
//!
//! The stores never talk HTTP themselves. They drive these traits, which are
//! implemented for the hosted backend in [`super::supabase`] and in-process in
//! [`super::memory`].

use async_trait::async_trait;

use crate::auth::User;
use crate::error::Error;

use super::types::{CartLine, CartRow};

/// Identity service used by the session store
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Exchange email and password for the signed-in user
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<User, Error>;

    /// Revoke the current session
    async fn sign_out(&self) -> Result<(), Error>;
}

/// Cart rows table, implicitly scoped to the current session by the backend
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// All rows joined with their product snapshot
    async fn list_lines(&self) -> Result<Vec<CartLine>, Error>;

    /// The single row for `product_id`; more than one match is an error
    async fn find_by_product(&self, product_id: &str) -> Result<Option<CartRow>, Error>;

    /// Insert a new row
    async fn insert(&self, product_id: &str, quantity: u32) -> Result<(), Error>;

    /// Set the quantity of the row with id `row_id`
    async fn set_quantity_by_id(&self, row_id: &str, quantity: u32) -> Result<(), Error>;

    /// Set the quantity of every row for `product_id`
    async fn set_quantity_by_product(&self, product_id: &str, quantity: u32) -> Result<(), Error>;

    /// Delete every row for `product_id`
    async fn delete_by_product(&self, product_id: &str) -> Result<(), Error>;
}
