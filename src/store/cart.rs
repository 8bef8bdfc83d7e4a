//! Cart store: the current user's cart, reconciled by refetching
//!
//! Every mutation is a handful of remote calls followed by a full
//! [`CartStore::fetch_cart`]. Remote failures never abort an operation; they
//! are logged, collected into the returned [`SyncReport`], and the refetch
//! shows whatever the backend actually holds.
//!
//! `add_item` is a lookup followed by an insert or update, with nothing
//! making the pair atomic. Two concurrent adds of a product that is not yet in
//! the cart can both see no row and both insert, leaving two rows at
//! quantity 1 instead of one at quantity 2. Closing that needs a unique
//! `(user_id, product_id)` constraint with an upsert on the backend, or a
//! per-product serialization point here.

use std::sync::{Arc, RwLock};

use log::{debug, warn};

use crate::error::Error;

use super::remote::CartRepository;
use super::types::{CartLine, CartState, SyncReport, SyncStep};

#[derive(Default)]
struct Inner {
    lines: Vec<CartLine>,
    // Operations currently running, nested ones included.
    in_flight: usize,
}

/// Holds the cart lines and a busy flag
///
/// The store is busy while at least one operation is running. The flag is
/// advisory: nothing stops operations from overlapping.
pub struct CartStore {
    repo: Arc<dyn CartRepository>,
    state: RwLock<Inner>,
}

/// Marks one operation as in flight until dropped
struct InFlight<'a> {
    store: &'a CartStore,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.store
            .write(|state| state.in_flight = state.in_flight.saturating_sub(1));
    }
}

impl CartStore {
    /// Create a store with an empty cart
    pub fn new(repo: Arc<dyn CartRepository>) -> Self {
        Self {
            repo,
            state: RwLock::new(Inner::default()),
        }
    }

    /// Lines as of the last fetch
    pub fn lines(&self) -> Vec<CartLine> {
        self.read(|state| state.lines.clone())
    }

    /// Whether any operation is in flight
    pub fn is_busy(&self) -> bool {
        self.read(|state| state.in_flight > 0)
    }

    /// Lines and busy flag read together
    pub fn snapshot(&self) -> CartState {
        self.read(|state| CartState {
            lines: state.lines.clone(),
            busy: state.in_flight > 0,
        })
    }

    /// The first line for `product_id`
    pub fn line_for(&self, product_id: &str) -> Option<CartLine> {
        self.read(|state| {
            state
                .lines
                .iter()
                .find(|line| line.product_id == product_id)
                .cloned()
        })
    }

    /// Sum of quantities over all lines
    pub fn total_quantity(&self) -> u64 {
        self.read(|state| state.lines.iter().map(|l| u64::from(l.quantity)).sum())
    }

    /// Sum of price times quantity over all lines
    pub fn subtotal(&self) -> f64 {
        self.read(|state| state.lines.iter().map(CartLine::line_total).sum())
    }

    /// Replace the lines with a fresh read of the cart
    ///
    /// A failed read leaves the cart empty, indistinguishable from a
    /// genuinely empty cart except through the report.
    pub async fn fetch_cart(&self) -> SyncReport {
        let _busy = self.begin();
        let mut report = SyncReport::default();

        let lines = match self.repo.list_lines().await {
            Ok(lines) => lines,
            Err(e) => {
                note(&mut report, SyncStep::Fetch, e);
                Vec::new()
            }
        };

        debug!("cart fetched: {} lines", lines.len());
        self.write(|state| state.lines = lines);
        report
    }

    /// Add one unit of `product_id`
    ///
    /// Increments the existing row, or inserts one at quantity 1. A lookup
    /// failure, including finding more than one row, counts as "no row".
    pub async fn add_item(&self, product_id: &str) -> SyncReport {
        let _busy = self.begin();
        let mut report = SyncReport::default();

        let existing = match self.repo.find_by_product(product_id).await {
            Ok(row) => row,
            Err(e) => {
                note(&mut report, SyncStep::Lookup, e);
                None
            }
        };

        match existing {
            Some(row) => match row.quantity.checked_add(1) {
                Some(quantity) => {
                    if let Err(e) = self.repo.set_quantity_by_id(&row.id, quantity).await {
                        note(&mut report, SyncStep::Update, e);
                    }
                }
                None => note(
                    &mut report,
                    SyncStep::Update,
                    Error::general(format!("quantity of row {} is already at its maximum", row.id)),
                ),
            },
            None => {
                if let Err(e) = self.repo.insert(product_id, 1).await {
                    note(&mut report, SyncStep::Insert, e);
                }
            }
        }

        report.merge(self.fetch_cart().await);
        report
    }

    /// Remove every line for `product_id`
    pub async fn remove_item(&self, product_id: &str) -> SyncReport {
        let _busy = self.begin();
        self.delete_and_refetch(product_id).await
    }

    /// Set the quantity for `product_id`; zero or less removes it
    pub async fn update_quantity(&self, product_id: &str, quantity: i64) -> SyncReport {
        let _busy = self.begin();

        if quantity <= 0 {
            return self.delete_and_refetch(product_id).await;
        }

        let mut report = SyncReport::default();
        match u32::try_from(quantity) {
            Ok(quantity) => {
                if let Err(e) = self.repo.set_quantity_by_product(product_id, quantity).await {
                    note(&mut report, SyncStep::Update, e);
                }
            }
            Err(_) => note(
                &mut report,
                SyncStep::Update,
                Error::general(format!("quantity {} out of range", quantity)),
            ),
        }
        report.merge(self.fetch_cart().await);
        report
    }

    async fn delete_and_refetch(&self, product_id: &str) -> SyncReport {
        let mut report = SyncReport::default();
        if let Err(e) = self.repo.delete_by_product(product_id).await {
            note(&mut report, SyncStep::Delete, e);
        }
        report.merge(self.fetch_cart().await);
        report
    }

    fn begin(&self) -> InFlight<'_> {
        self.write(|state| state.in_flight += 1);
        InFlight { store: self }
    }

    fn read<R>(&self, f: impl FnOnce(&Inner) -> R) -> R {
        match self.state.read() {
            Ok(guard) => f(&guard),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    fn write(&self, f: impl FnOnce(&mut Inner)) {
        match self.state.write() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

fn note(report: &mut SyncReport, step: SyncStep, error: Error) {
    warn!("cart {:?} failed, reconciling by refetch: {}", step, error);
    report.record(step, error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryCartRepository;
    use crate::store::types::ProductSnapshot;

    fn product(name: &str, price: f64) -> ProductSnapshot {
        ProductSnapshot {
            name: name.to_string(),
            price,
            image_url: format!("https://cdn.example.com/{}.png", name),
        }
    }

    fn store() -> (CartStore, Arc<MemoryCartRepository>) {
        let repo = Arc::new(
            MemoryCartRepository::new()
                .with_product("prod-1", product("mug", 12.5))
                .with_product("prod-2", product("tee", 20.0)),
        );
        (CartStore::new(repo.clone()), repo)
    }

    fn quantity_of(store: &CartStore, product_id: &str) -> Option<u32> {
        store.line_for(product_id).map(|line| line.quantity)
    }

    #[tokio::test]
    async fn starts_empty_and_idle() {
        let (store, _) = store();
        assert_eq!(store.snapshot(), CartState::default());
    }

    #[tokio::test]
    async fn add_update_remove_walkthrough() {
        let (store, _) = store();

        assert!(store.add_item("prod-1").await.is_clean());
        let lines = store.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].product_id, "prod-1");
        assert_eq!(lines[0].quantity, 1);
        assert_eq!(lines[0].product.as_ref().map(|p| p.name.as_str()), Some("mug"));

        store.add_item("prod-1").await;
        assert_eq!(store.lines().len(), 1);
        assert_eq!(quantity_of(&store, "prod-1"), Some(2));

        store.update_quantity("prod-1", 5).await;
        assert_eq!(quantity_of(&store, "prod-1"), Some(5));

        store.update_quantity("prod-1", 0).await;
        assert!(store.lines().is_empty());

        let report = store.remove_item("prod-1").await;
        assert!(report.is_clean());
        assert!(store.lines().is_empty());
        assert!(!store.is_busy());
    }

    #[tokio::test]
    async fn negative_quantity_removes_like_remove_item() {
        let (store, repo) = store();
        store.add_item("prod-1").await;
        store.add_item("prod-2").await;

        store.update_quantity("prod-1", -3).await;

        assert!(store.line_for("prod-1").is_none());
        assert_eq!(quantity_of(&store, "prod-2"), Some(1));
        assert!(repo.rows().iter().all(|row| row.quantity >= 1));
    }

    #[tokio::test]
    async fn totals_follow_lines() {
        let (store, _) = store();
        store.add_item("prod-1").await;
        store.update_quantity("prod-1", 2).await;
        store.add_item("prod-2").await;

        assert_eq!(store.total_quantity(), 3);
        assert_eq!(store.subtotal(), 45.0);
    }

    #[tokio::test]
    async fn failed_insert_is_reported_and_cart_reconciled() {
        let (store, repo) = store();
        repo.set_failing(SyncStep::Insert, true);

        let report = store.add_item("prod-1").await;

        assert!(report.failed(SyncStep::Insert));
        assert!(!report.failed(SyncStep::Fetch));
        assert!(store.lines().is_empty());
        assert!(!store.is_busy());
    }

    #[tokio::test]
    async fn unknown_product_insert_is_swallowed() {
        let (store, _) = store();
        let report = store.add_item("ghost").await;
        assert!(report.failed(SyncStep::Insert));
        assert!(store.lines().is_empty());
    }

    #[tokio::test]
    async fn failed_fetch_folds_to_empty() {
        let (store, repo) = store();
        store.add_item("prod-1").await;
        assert_eq!(store.lines().len(), 1);

        repo.set_failing(SyncStep::Fetch, true);
        let report = store.fetch_cart().await;

        assert!(report.failed(SyncStep::Fetch));
        assert!(store.lines().is_empty());
        assert_eq!(repo.rows().len(), 1);

        repo.set_failing(SyncStep::Fetch, false);
        assert!(store.fetch_cart().await.is_clean());
        assert_eq!(store.lines().len(), 1);
    }

    #[tokio::test]
    async fn failed_update_keeps_remote_quantity() {
        let (store, repo) = store();
        store.add_item("prod-1").await;
        repo.set_failing(SyncStep::Update, true);

        let report = store.update_quantity("prod-1", 7).await;

        assert!(report.failed(SyncStep::Update));
        assert_eq!(quantity_of(&store, "prod-1"), Some(1));
    }

    #[tokio::test]
    async fn oversized_quantity_is_reported() {
        let (store, _) = store();
        store.add_item("prod-1").await;

        let report = store.update_quantity("prod-1", i64::from(u32::MAX) + 1).await;

        assert!(report.failed(SyncStep::Update));
        assert_eq!(quantity_of(&store, "prod-1"), Some(1));
    }

    #[tokio::test]
    async fn lookup_failure_falls_back_to_insert() {
        let (store, repo) = store();
        store.add_item("prod-1").await;
        repo.set_failing(SyncStep::Lookup, true);

        let report = store.add_item("prod-1").await;

        assert!(report.failed(SyncStep::Lookup));
        assert_eq!(repo.rows().len(), 2);
        assert!(store.lines().iter().all(|line| line.quantity == 1));
    }

    // add_item is not atomic: both tasks may see "no row" and both insert.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_adds_are_not_atomic() {
        let (store, repo) = store();
        let store = Arc::new(store);

        let (a, b) = tokio::join!(
            tokio::spawn({
                let store = store.clone();
                async move { store.add_item("prod-2").await }
            }),
            tokio::spawn({
                let store = store.clone();
                async move { store.add_item("prod-2").await }
            }),
        );
        a.unwrap();
        b.unwrap();
        store.fetch_cart().await;

        let mut quantities: Vec<u32> = repo
            .rows()
            .iter()
            .filter(|row| row.product_id == "prod-2")
            .map(|row| row.quantity)
            .collect();
        quantities.sort_unstable();

        assert!(
            quantities == vec![2] || quantities == vec![1, 1],
            "unexpected rows: {:?}",
            quantities
        );
        assert_eq!(store.total_quantity(), 2);
    }

    #[tokio::test]
    async fn interleaved_adds_on_one_thread_duplicate_rows() {
        let (store, repo) = store();

        tokio::join!(store.add_item("prod-2"), store.add_item("prod-2"));

        // Both lookups run before either insert on a single-threaded runtime.
        let rows: Vec<_> = repo
            .rows()
            .into_iter()
            .filter(|row| row.product_id == "prod-2")
            .collect();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.quantity == 1));
        assert!(!store.is_busy());
    }

    #[tokio::test]
    async fn busy_until_last_overlapping_operation_ends() {
        let (store, _) = store();

        let (_, busy_after_fetch) = tokio::join!(store.add_item("prod-1"), async {
            store.fetch_cart().await;
            store.is_busy()
        });

        // add_item still had its insert and refetch to run when fetch_cart ended.
        assert!(busy_after_fetch);
        assert!(!store.is_busy());
        assert!(!store.snapshot().busy);
        assert_eq!(quantity_of(&store, "prod-1"), Some(1));
    }

    #[tokio::test]
    async fn busy_while_running_and_balanced_after_nested_fetch() {
        let (store, _) = store();

        let (_, busy_during) = tokio::join!(store.update_quantity("prod-1", 0), async {
            tokio::task::yield_now().await;
            store.is_busy()
        });

        assert!(busy_during);
        assert!(!store.is_busy());
    }

    #[tokio::test]
    async fn increment_past_maximum_is_reported() {
        let (store, repo) = store();
        repo.insert("prod-1", u32::MAX).await.unwrap();

        let report = store.add_item("prod-1").await;

        assert!(report.failed(SyncStep::Update));
        assert_eq!(quantity_of(&store, "prod-1"), Some(u32::MAX));
    }

    #[tokio::test]
    async fn line_without_product_keeps_rest_of_cart() {
        let (store, repo) = store();
        store.add_item("prod-1").await;
        store.add_item("prod-2").await;
        repo.remove_product("prod-2");

        let report = store.fetch_cart().await;

        assert!(report.is_clean());
        assert_eq!(store.lines().len(), 2);
        assert!(store.line_for("prod-2").unwrap().product.is_none());
        assert_eq!(store.subtotal(), 12.5);
    }
}
