//! Event names and payload shapes exchanged over the bus.
//!
//! Names are a stable contract between the state and its views: renaming
//! one breaks every subscriber that still uses the old name.

use crate::bus::BusError;
use crate::catalog::Product;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Catalog replaced. Payload: [`CatalogChanged`].
pub const CATALOG_CHANGED: &str = "cards:changed";
/// Address-form validation ran. Payload: [`crate::order::FormErrors`].
pub const ADDRESS_FORM_ERRORS_CHANGED: &str = "addressFormErrors:change";
/// Contacts-form validation ran. Payload: [`crate::order::FormErrors`].
pub const CONTACTS_FORM_ERRORS_CHANGED: &str = "contactsFormErrors:change";

/// A catalog card was selected for preview. Payload: [`Product`].
pub const CARD_SELECT: &str = "card:select";
pub const BASKET_OPEN: &str = "basket:open";
pub const ORDER_OPEN: &str = "order:open";
/// Address step submitted; the contacts step should open.
pub const ORDER_SUBMIT: &str = "order:submit";
/// Contacts step submitted; the order should be sent.
pub const CONTACTS_SUBMIT: &str = "contacts:submit";
/// A placed order was acknowledged; the basket should be emptied.
pub const ORDER_CLEAR: &str = "order:clear";
pub const MODAL_OPEN: &str = "modal:open";
pub const MODAL_CLOSE: &str = "modal:close";
pub const FORM_RESET: &str = "form:reset";
/// A payment button was pressed. Payload: [`PaymentSelect`].
pub const PAYMENT_SELECT: &str = "buttonPayments:select";

/// Form name of the address step, as used in field-change events.
pub const ORDER_FORM: &str = "order";
/// Form name of the contacts step, as used in field-change events.
pub const CONTACTS_FORM: &str = "contacts";

/// Pattern matching field changes of the address step.
pub const ORDER_FIELD_CHANGE_PATTERN: &str = r"^order\..*:change";
/// Pattern matching field changes of the contacts step.
pub const CONTACTS_FIELD_CHANGE_PATTERN: &str = r"^contacts\..*:change";

/// Name of the event a form emits when one of its inputs changes,
/// e.g. `order.address:change`.
pub fn field_change(form: &str, field: &str) -> String {
    format!("{form}.{field}:change")
}

/// Payload of [`CATALOG_CHANGED`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogChanged {
    pub catalog: Vec<Product>,
}

/// Payload of a field-change event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldChange {
    pub field: String,
    pub value: String,
}

/// Payload of [`PAYMENT_SELECT`]: the tag of the pressed button.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentSelect {
    pub payment: String,
}

/// Deserialize an event payload into its typed shape.
pub fn decode<T: DeserializeOwned>(payload: &Value) -> Result<T, BusError> {
    Ok(T::deserialize(payload)?)
}

/// Serialize a typed payload for emission.
pub fn encode<T: Serialize>(payload: &T) -> Result<Value, BusError> {
    Ok(serde_json::to_value(payload)?)
}
