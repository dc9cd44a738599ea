//! Draft order, form fields, and validation errors.

use crate::error::StoreError;
use crate::ids::{OrderId, ProductId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Payment tag for paying online by card.
pub const PAYMENT_ONLINE: &str = "card";
/// Payment tag for paying on receipt.
pub const PAYMENT_ON_RECEIPT: &str = "cash";

/// The in-progress order.
///
/// Exactly one draft exists per session. It is reset between checkouts,
/// never replaced. The serialized form is the order-submit request body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderDraft {
    /// Payment tag, empty when unset.
    pub payment: String,
    /// Delivery address, empty when unset.
    pub address: String,
    /// Contact email, empty when unset.
    pub email: String,
    /// Contact phone, empty when unset.
    pub phone: String,
    /// Sum of the prices of `items`, as of the last basket mutation.
    pub total: u64,
    /// Ordered product ids, without duplicates.
    pub items: Vec<ProductId>,
}

impl OrderDraft {
    pub fn address_field(&self, field: AddressField) -> &str {
        match field {
            AddressField::Payment => &self.payment,
            AddressField::Address => &self.address,
        }
    }

    pub fn contacts_field(&self, field: ContactsField) -> &str {
        match field {
            ContactsField::Email => &self.email,
            ContactsField::Phone => &self.phone,
        }
    }

    pub(crate) fn set_address_field(&mut self, field: AddressField, value: String) {
        match field {
            AddressField::Payment => self.payment = value,
            AddressField::Address => self.address = value,
        }
    }

    pub(crate) fn set_contacts_field(&mut self, field: ContactsField, value: String) {
        match field {
            ContactsField::Email => self.email = value,
            ContactsField::Phone => self.phone = value,
        }
    }

    /// Clear the four form fields. Items and total are kept.
    pub(crate) fn clear_fields(&mut self) {
        self.payment.clear();
        self.address.clear();
        self.email.clear();
        self.phone.clear();
    }

    /// Compute the address-form errors for the current draft.
    pub fn address_errors(&self) -> FormErrors {
        let mut errors = FormErrors::new();
        for field in AddressField::ALL {
            if self.address_field(field).is_empty() {
                errors.insert(field.into(), field.required_message());
            }
        }
        errors
    }

    /// Compute the contacts-form errors for the current draft.
    pub fn contacts_errors(&self) -> FormErrors {
        let mut errors = FormErrors::new();
        for field in ContactsField::ALL {
            if self.contacts_field(field).is_empty() {
                errors.insert(field.into(), field.required_message());
            }
        }
        errors
    }
}

/// Fields of the first checkout step (payment and delivery).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressField {
    Payment,
    Address,
}

impl AddressField {
    pub const ALL: [AddressField; 2] = [AddressField::Payment, AddressField::Address];

    pub fn as_str(&self) -> &'static str {
        match self {
            AddressField::Payment => "payment",
            AddressField::Address => "address",
        }
    }

    fn required_message(&self) -> &'static str {
        match self {
            AddressField::Payment => "Укажите способ оплаты",
            AddressField::Address => "Укажите адрес",
        }
    }
}

impl FromStr for AddressField {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "payment" => Ok(AddressField::Payment),
            "address" => Ok(AddressField::Address),
            other => Err(StoreError::UnknownField(other.to_string())),
        }
    }
}

/// Fields of the second checkout step (contact details).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactsField {
    Email,
    Phone,
}

impl ContactsField {
    pub const ALL: [ContactsField; 2] = [ContactsField::Email, ContactsField::Phone];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContactsField::Email => "email",
            ContactsField::Phone => "phone",
        }
    }

    fn required_message(&self) -> &'static str {
        match self {
            ContactsField::Email => "Необходимо указать email",
            ContactsField::Phone => "Необходимо указать телефон",
        }
    }
}

impl FromStr for ContactsField {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(ContactsField::Email),
            "phone" => Ok(ContactsField::Phone),
            other => Err(StoreError::UnknownField(other.to_string())),
        }
    }
}

/// Any validated field, used as the key of a [`FormErrors`] map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormField {
    Payment,
    Address,
    Email,
    Phone,
}

impl FormField {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormField::Payment => "payment",
            FormField::Address => "address",
            FormField::Email => "email",
            FormField::Phone => "phone",
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<AddressField> for FormField {
    fn from(field: AddressField) -> Self {
        match field {
            AddressField::Payment => FormField::Payment,
            AddressField::Address => FormField::Address,
        }
    }
}

impl From<ContactsField> for FormField {
    fn from(field: ContactsField) -> Self {
        match field {
            ContactsField::Email => FormField::Email,
            ContactsField::Phone => FormField::Phone,
        }
    }
}

/// Active validation messages for one form, keyed by field.
///
/// A map only ever holds the result of one complete validation pass; it is
/// rebuilt from scratch and swapped in, never patched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<FormField, String>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, field: FormField, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    /// True when no field is failing.
    pub fn is_valid(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: impl Into<FormField>) -> Option<&str> {
        self.0.get(&field.into()).map(String::as_str)
    }

    pub fn contains(&self, field: impl Into<FormField>) -> bool {
        self.0.contains_key(&field.into())
    }

    pub fn iter(&self) -> impl Iterator<Item = (FormField, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// All messages joined for display under a form.
    pub fn messages(&self) -> String {
        self.0.values().map(String::as_str).collect::<Vec<_>>().join("; ")
    }
}

/// Response to a successful order submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderResult {
    /// Order identifier assigned by the store.
    pub id: OrderId,
    /// Amount charged, in synapses.
    pub total: u64,
}
