//! Event-driven state core for the Larek storefront.
//!
//! The storefront's views never reference each other. They call into
//! [`AppState`] and re-render when it announces a change on the
//! [`EventBus`]:
//!
//! - **Bus**: name-addressed publish/subscribe with exact and pattern
//!   selectors, synchronous fail-loud delivery
//! - **State**: catalog, basket, draft order, and the validation state of
//!   the two checkout forms
//! - **Context**: the one bus and one state of a session, passed to every
//!   collaborator
//!
//! # Example
//!
//! ```rust
//! use larek_core::prelude::*;
//! use serde_json::json;
//!
//! let ctx = StoreContext::new();
//! let wiring = wiring::connect(&ctx).unwrap();
//!
//! ctx.state
//!     .set_catalog(vec![Product::new("a", "+1 час в сутках", Some(750))])
//!     .unwrap();
//! ctx.state.toggle_ordered_item(&ProductId::new("a"), true);
//! assert_eq!(ctx.state.total(), 750);
//!
//! // A form view reports an input change; the state validates the form.
//! ctx.bus
//!     .emit(
//!         "order.address:change",
//!         json!({"field": "address", "value": "Москва"}),
//!     )
//!     .unwrap();
//! assert!(ctx.state.address_errors().contains(FormField::Payment));
//!
//! wiring.disconnect(&ctx.bus);
//! ```

pub mod api;
pub mod bus;
pub mod catalog;
pub mod context;
pub mod error;
pub mod events;
pub mod ids;
pub mod order;
pub mod state;
pub mod wiring;

pub use bus::{BusError, Emitter, EventBus, Handler, HandlerError, HandlerResult, Selector};
pub use context::StoreContext;
pub use error::StoreError;
pub use ids::{OrderId, ProductId};
pub use state::AppState;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::api::{ApiError, FixtureApi, StoreApi};
    pub use crate::bus::{BusError, Emitter, EventBus, Handler, HandlerResult, Selector};
    pub use crate::catalog::{Category, Product, ProductList};
    pub use crate::context::StoreContext;
    pub use crate::error::StoreError;
    pub use crate::events;
    pub use crate::ids::{OrderId, ProductId};
    pub use crate::order::{
        AddressField, ContactsField, FormErrors, FormField, OrderDraft, OrderResult,
    };
    pub use crate::state::AppState;
    pub use crate::wiring;
}
