//! In-process store collaborators
//!
//! These back isolated store instances in tests and demos. Every call yields
//! to the runtime once before touching state, so concurrent store operations
//! interleave the way remote round-trips do.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::User;
use crate::error::Error;

use super::remote::{CartRepository, IdentityService};
use super::types::{CartLine, CartRow, ProductSnapshot, SyncStep};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Cart rows kept in memory, joined against an in-memory product catalog
#[derive(Default)]
pub struct MemoryCartRepository {
    products: Mutex<HashMap<String, ProductSnapshot>>,
    rows: Mutex<Vec<CartRow>>,
    failing: Mutex<HashSet<SyncStep>>,
}

impl MemoryCartRepository {
    /// Create an empty repository with an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a catalog entry
    pub fn with_product(self, product_id: &str, product: ProductSnapshot) -> Self {
        lock(&self.products).insert(product_id.to_string(), product);
        self
    }

    /// Drop a catalog entry; rows that reference it are kept
    pub fn remove_product(&self, product_id: &str) {
        lock(&self.products).remove(product_id);
    }

    /// Make every call of `step` fail until switched off again
    pub fn set_failing(&self, step: SyncStep, failing: bool) {
        let mut set = lock(&self.failing);
        if failing {
            set.insert(step);
        } else {
            set.remove(&step);
        }
    }

    /// The raw rows, as stored
    pub fn rows(&self) -> Vec<CartRow> {
        lock(&self.rows).clone()
    }

    async fn enter(&self, step: SyncStep) -> Result<(), Error> {
        tokio::task::yield_now().await;
        if lock(&self.failing).contains(&step) {
            return Err(Error::database(format!("{:?} unavailable", step)));
        }
        Ok(())
    }
}

#[async_trait]
impl CartRepository for MemoryCartRepository {
    async fn list_lines(&self) -> Result<Vec<CartLine>, Error> {
        self.enter(SyncStep::Fetch).await?;

        let products = lock(&self.products);
        let rows = lock(&self.rows);
        Ok(rows
            .iter()
            .map(|row| CartLine {
                id: row.id.clone(),
                product_id: row.product_id.clone(),
                quantity: row.quantity,
                product: products.get(&row.product_id).cloned(),
            })
            .collect())
    }

    async fn find_by_product(&self, product_id: &str) -> Result<Option<CartRow>, Error> {
        self.enter(SyncStep::Lookup).await?;

        let rows = lock(&self.rows);
        let mut matches = rows.iter().filter(|row| row.product_id == product_id);
        match (matches.next(), matches.next()) {
            (None, _) => Ok(None),
            (Some(row), None) => Ok(Some(row.clone())),
            (Some(_), Some(_)) => Err(Error::database(format!(
                "multiple rows for product {}",
                product_id
            ))),
        }
    }

    async fn insert(&self, product_id: &str, quantity: u32) -> Result<(), Error> {
        self.enter(SyncStep::Insert).await?;

        if !lock(&self.products).contains_key(product_id) {
            return Err(Error::database(format!(
                "foreign key violation: product {} does not exist",
                product_id
            )));
        }
        if quantity == 0 {
            return Err(Error::database("quantity must be positive"));
        }

        lock(&self.rows).push(CartRow {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            quantity,
        });
        Ok(())
    }

    async fn set_quantity_by_id(&self, row_id: &str, quantity: u32) -> Result<(), Error> {
        self.enter(SyncStep::Update).await?;
        if quantity == 0 {
            return Err(Error::database("quantity must be positive"));
        }

        lock(&self.rows)
            .iter_mut()
            .filter(|row| row.id == row_id)
            .for_each(|row| row.quantity = quantity);
        Ok(())
    }

    async fn set_quantity_by_product(&self, product_id: &str, quantity: u32) -> Result<(), Error> {
        self.enter(SyncStep::Update).await?;
        if quantity == 0 {
            return Err(Error::database("quantity must be positive"));
        }

        lock(&self.rows)
            .iter_mut()
            .filter(|row| row.product_id == product_id)
            .for_each(|row| row.quantity = quantity);
        Ok(())
    }

    async fn delete_by_product(&self, product_id: &str) -> Result<(), Error> {
        self.enter(SyncStep::Delete).await?;

        lock(&self.rows).retain(|row| row.product_id != product_id);
        Ok(())
    }
}

/// Identity service over a fixed set of accounts
#[derive(Default)]
pub struct MemoryIdentityService {
    accounts: Mutex<HashMap<String, (String, User)>>,
    signed_in: Mutex<Option<User>>,
    fail_sign_out: Mutex<bool>,
    sign_out_calls: Mutex<usize>,
}

impl MemoryIdentityService {
    /// Create a service with no accounts
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account; the user id is derived from the email
    pub fn with_account(self, email: &str, password: &str) -> Self {
        let user = User::new(format!("user-{}", email), Some(email));
        lock(&self.accounts).insert(email.to_string(), (password.to_string(), user));
        self
    }

    /// Make sign-out report a failure
    pub fn set_sign_out_failing(&self, failing: bool) {
        *lock(&self.fail_sign_out) = failing;
    }

    /// How many times sign-out was called
    pub fn sign_out_calls(&self) -> usize {
        *lock(&self.sign_out_calls)
    }
}

#[async_trait]
impl IdentityService for MemoryIdentityService {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<User, Error> {
        tokio::task::yield_now().await;

        let user = match lock(&self.accounts).get(email) {
            Some((expected, user)) if expected == password => user.clone(),
            _ => return Err(Error::auth("Invalid login credentials")),
        };
        *lock(&self.signed_in) = Some(user.clone());
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), Error> {
        tokio::task::yield_now().await;

        *lock(&self.sign_out_calls) += 1;
        if *lock(&self.fail_sign_out) {
            return Err(Error::auth("logout failed"));
        }
        if lock(&self.signed_in).take().is_none() {
            return Err(Error::MissingSession);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mug() -> ProductSnapshot {
        ProductSnapshot {
            name: "Mug".to_string(),
            price: 12.5,
            image_url: "https://cdn/mug.png".to_string(),
        }
    }

    #[tokio::test]
    async fn insert_requires_known_product() {
        let repo = MemoryCartRepository::new();
        let err = repo.insert("ghost", 1).await.unwrap_err();
        assert!(matches!(err, Error::Database(_)));
    }

    #[tokio::test]
    async fn duplicate_rows_fail_single_lookup() {
        let repo = MemoryCartRepository::new().with_product("p", mug());
        repo.insert("p", 1).await.unwrap();
        assert!(repo.find_by_product("p").await.unwrap().is_some());

        repo.insert("p", 1).await.unwrap();
        assert!(repo.find_by_product("p").await.is_err());
    }

    #[tokio::test]
    async fn failing_step_errors_until_cleared() {
        let repo = MemoryCartRepository::new().with_product("p", mug());
        repo.set_failing(SyncStep::Insert, true);
        assert!(repo.insert("p", 1).await.is_err());

        repo.set_failing(SyncStep::Insert, false);
        repo.insert("p", 1).await.unwrap();
        assert_eq!(repo.list_lines().await.unwrap()[0].product, Some(mug()));
    }

    #[tokio::test]
    async fn removed_product_joins_as_none() {
        let repo = MemoryCartRepository::new().with_product("p", mug());
        repo.insert("p", 1).await.unwrap();
        repo.remove_product("p");

        let lines = repo.list_lines().await.unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].product.is_none());
    }

    #[tokio::test]
    async fn wrong_password_is_auth_error() {
        let identity = MemoryIdentityService::new().with_account("a@example.com", "pw");
        let err = identity
            .sign_in_with_password("a@example.com", "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }
}
