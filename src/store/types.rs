//! Types shared by the session and cart stores

use serde::{Deserialize, Serialize};

use crate::auth::User;
use crate::error::Error;

/// Email domain suffix that marks a privileged (admin) principal
pub const ADMIN_EMAIL_SUFFIX: &str = "@admin.com";

/// Whether `identity` is privileged: present, with an email ending in
/// [`ADMIN_EMAIL_SUFFIX`]
pub fn is_privileged_identity(identity: Option<&User>) -> bool {
    identity
        .and_then(|user| user.email.as_deref())
        .map_or(false, |email| email.ends_with(ADMIN_EMAIL_SUFFIX))
}

/// The authenticated principal as seen by presentation code
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Principal {
    /// The signed-in user, if any
    pub identity: Option<User>,

    /// Derived from `identity` at snapshot time
    pub is_privileged: bool,
}

impl Principal {
    /// Build a principal, deriving the privilege flag from the identity
    pub fn from_identity(identity: Option<User>) -> Self {
        let is_privileged = is_privileged_identity(identity.as_ref());
        Self { identity, is_privileged }
    }
}

/// Product display fields joined into a cart line at read time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    /// Product name
    pub name: String,

    /// Unit price
    pub price: f64,

    /// Image URL
    pub image_url: String,
}

/// A bare cart row, without the product join
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartRow {
    /// Row id
    pub id: String,

    /// Referenced product
    pub product_id: String,

    /// Stored quantity, always at least 1
    pub quantity: u32,
}

/// One product-quantity pairing in the cart with its product snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    /// Row id
    pub id: String,

    /// Referenced product
    pub product_id: String,

    /// Stored quantity, always at least 1
    pub quantity: u32,

    /// Product fields as of the last fetch. `None` when the join found no
    /// visible product (deleted, or hidden by row-level security).
    #[serde(default)]
    pub product: Option<ProductSnapshot>,
}

impl CartLine {
    /// Price times quantity; zero when the product is missing
    pub fn line_total(&self) -> f64 {
        self.product
            .as_ref()
            .map_or(0.0, |product| product.price * f64::from(self.quantity))
    }
}

/// Snapshot of the cart store's state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartState {
    /// Lines in the order the last fetch returned them
    pub lines: Vec<CartLine>,

    /// True while an operation is in flight. Advisory only.
    pub busy: bool,
}

/// Remote failures a store operation observed and did not propagate
///
/// Cart operations reconcile by refetching, so a failed write does not fail
/// the operation; the report lets callers see what went wrong anyway.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// What failed, in the order it happened
    pub diagnostics: Vec<Diagnostic>,
}

/// One swallowed remote failure
#[derive(Debug)]
pub struct Diagnostic {
    /// The remote step that failed
    pub step: SyncStep,

    /// The error it failed with
    pub error: Error,
}

/// The remote calls a cart operation is made of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStep {
    /// Reading the joined cart
    Fetch,
    /// Looking up an existing row for a product
    Lookup,
    /// Inserting a new row
    Insert,
    /// Changing a row's quantity
    Update,
    /// Deleting rows for a product
    Delete,
}

impl SyncReport {
    /// Whether every remote call succeeded
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Whether the step failed during the operation
    pub fn failed(&self, step: SyncStep) -> bool {
        self.diagnostics.iter().any(|d| d.step == step)
    }

    pub(crate) fn record(&mut self, step: SyncStep, error: Error) {
        self.diagnostics.push(Diagnostic { step, error });
    }

    pub(crate) fn merge(&mut self, other: SyncReport) {
        self.diagnostics.extend(other.diagnostics);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: Option<&str>) -> User {
        User::new("u1", email)
    }

    #[test]
    fn privilege_follows_email_suffix() {
        assert!(is_privileged_identity(Some(&user(Some("root@admin.com")))));
        assert!(!is_privileged_identity(Some(&user(Some("root@example.com")))));
        assert!(!is_privileged_identity(Some(&user(Some("admin.com@example.com")))));
        assert!(!is_privileged_identity(Some(&user(None))));
        assert!(!is_privileged_identity(None));
    }

    #[test]
    fn suffix_match_is_case_sensitive() {
        assert!(!is_privileged_identity(Some(&user(Some("root@ADMIN.com")))));
    }

    #[test]
    fn cart_line_deserializes_joined_row() {
        let line: CartLine = serde_json::from_value(serde_json::json!({
            "id": "row-1",
            "user_id": "u1",
            "product_id": "prod-1",
            "quantity": 2,
            "created_at": "2024-01-01T00:00:00Z",
            "product": { "name": "Mug", "price": 12.5, "image_url": "https://cdn/mug.png" }
        }))
        .unwrap();

        assert_eq!(line.quantity, 2);
        assert_eq!(line.product.as_ref().map(|p| p.name.as_str()), Some("Mug"));
        assert_eq!(line.line_total(), 25.0);
    }

    #[test]
    fn null_product_does_not_fail_the_batch() {
        let lines: Vec<CartLine> = serde_json::from_value(serde_json::json!([
            {
                "id": "row-1",
                "product_id": "prod-1",
                "quantity": 2,
                "product": { "name": "Mug", "price": 12.5, "image_url": "https://cdn/mug.png" }
            },
            { "id": "row-2", "product_id": "gone", "quantity": 3, "product": null }
        ]))
        .unwrap();

        assert_eq!(lines.len(), 2);
        assert!(lines[1].product.is_none());
        assert_eq!(lines[1].line_total(), 0.0);
    }

    #[test]
    fn report_tracks_steps() {
        let mut report = SyncReport::default();
        assert!(report.is_clean());

        report.record(SyncStep::Update, Error::database("boom"));
        assert!(!report.is_clean());
        assert!(report.failed(SyncStep::Update));
        assert!(!report.failed(SyncStep::Fetch));
    }
}
