//! Store API collaborator interface.
//!
//! The network client that fetches the catalog and places orders lives
//! outside the core. The core only needs the two calls in [`StoreApi`].
//! [`FixtureApi`] answers them from an in-memory product list and applies
//! the same acceptance rules the store server does.

use crate::catalog::{Product, ProductList};
use crate::ids::{OrderId, ProductId};
use crate::order::{OrderDraft, OrderResult};
use std::cell::Cell;
use thiserror::Error;
use tracing::{debug, info};

/// Error type for store API calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The store refused the order.
    #[error("Order rejected: {0}")]
    Rejected(String),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),
}

/// Calls the core makes against the remote store.
pub trait StoreApi {
    /// Fetch the current catalog, in display order.
    fn product_list(&self) -> Result<Vec<Product>, ApiError>;

    /// Place an order for the draft.
    fn order_products(&self, order: &OrderDraft) -> Result<OrderResult, ApiError>;
}

/// In-memory store backed by a fixed product list.
#[derive(Debug)]
pub struct FixtureApi {
    products: ProductList,
    cdn_url: String,
    placed: Cell<u64>,
}

impl FixtureApi {
    pub fn new(products: ProductList) -> Self {
        Self {
            products,
            cdn_url: String::new(),
            placed: Cell::new(0),
        }
    }

    /// Load the product list from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self, ApiError> {
        Ok(Self::new(ProductList::from_json(json)?))
    }

    /// Resolve image references against `cdn_url` when listing.
    pub fn with_cdn(mut self, cdn_url: impl Into<String>) -> Self {
        self.cdn_url = cdn_url.into();
        self
    }

    /// Number of orders accepted so far.
    pub fn orders_placed(&self) -> u64 {
        self.placed.get()
    }

    fn find(&self, id: &ProductId) -> Option<&Product> {
        self.products.items.iter().find(|p| &p.id == id)
    }

    fn check(&self, order: &OrderDraft) -> Result<(), ApiError> {
        if order.payment.is_empty() {
            return Err(ApiError::Rejected("payment method not set".to_string()));
        }
        if order.address.is_empty() {
            return Err(ApiError::Rejected("address not set".to_string()));
        }
        if order.email.is_empty() {
            return Err(ApiError::Rejected("email not set".to_string()));
        }
        if order.phone.is_empty() {
            return Err(ApiError::Rejected("phone not set".to_string()));
        }
        if order.items.is_empty() {
            return Err(ApiError::Rejected("no items selected".to_string()));
        }

        let mut expected = 0u64;
        for id in &order.items {
            let product = self
                .find(id)
                .ok_or_else(|| ApiError::Rejected(format!("product {id} not found")))?;
            let price = product
                .price
                .ok_or_else(|| ApiError::Rejected(format!("product {id} is not for sale")))?;
            expected = expected.saturating_add(price);
        }

        if expected != order.total {
            return Err(ApiError::Rejected(format!(
                "wrong order total: expected {expected}, got {}",
                order.total
            )));
        }

        Ok(())
    }
}

impl StoreApi for FixtureApi {
    fn product_list(&self) -> Result<Vec<Product>, ApiError> {
        debug!(products = self.products.items.len(), "Serving product list");
        Ok(self
            .products
            .items
            .iter()
            .map(|p| p.with_cdn(&self.cdn_url))
            .collect())
    }

    fn order_products(&self, order: &OrderDraft) -> Result<OrderResult, ApiError> {
        self.check(order)?;

        let n = self.placed.get() + 1;
        self.placed.set(n);
        let result = OrderResult {
            id: OrderId::new(format!("order-{n}")),
            total: order.total,
        };
        info!(order = %result.id, total = result.total, "Order accepted");
        Ok(result)
    }
}
