//! Storefront error types.

use crate::api::ApiError;
use crate::bus::BusError;
use thiserror::Error;

/// Errors that can occur while driving a storefront session.
///
/// Validation failures are not errors: they live in the form error maps
/// and are announced on the bus. This type only covers failures that stop
/// an operation.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Event delivery failed.
    #[error(transparent)]
    Bus(#[from] BusError),

    /// The store API failed or rejected a request.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A field-change event named a field the form does not have.
    #[error("Unknown form field: {0}")]
    UnknownField(String),

    /// An order was submitted with an empty basket.
    #[error("Cannot place an order with an empty basket")]
    EmptyBasket,

    /// An order was submitted while a checkout form is invalid.
    #[error("Order form invalid: {0}")]
    InvalidOrder(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
