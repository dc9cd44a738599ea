//! Application state: catalog, draft order, and form validation.
//!
//! [`AppState`] is the single owner of the session's catalog, order draft,
//! and the two form error maps. Views never touch these directly; they call
//! the methods here and re-render when the state announces a change on the
//! bus.
//!
//! All methods take `&self`. No internal borrow is held while an event is
//! emitted, so handlers may call back into the state.
//!
//! # Basket mutations are silent
//!
//! [`AppState::toggle_ordered_item`] and [`AppState::clear_basket`] do not
//! emit. The views that call them already know what to refresh, and the
//! re-render timing of the storefront depends on no extra event being
//! delivered here.

use crate::bus::{BusError, EventBus};
use crate::catalog::Product;
use crate::events::{self, CatalogChanged};
use crate::ids::ProductId;
use crate::order::{AddressField, ContactsField, FormErrors, OrderDraft};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, trace};

/// Single source of truth for one storefront session.
#[derive(Debug)]
pub struct AppState {
    bus: Rc<EventBus>,
    catalog: RefCell<Vec<Product>>,
    order: RefCell<OrderDraft>,
    address_errors: RefCell<FormErrors>,
    contacts_errors: RefCell<FormErrors>,
}

impl AppState {
    /// Create an empty state that announces changes on `bus`.
    pub fn new(bus: Rc<EventBus>) -> Self {
        Self {
            bus,
            catalog: RefCell::new(Vec::new()),
            order: RefCell::new(OrderDraft::default()),
            address_errors: RefCell::new(FormErrors::new()),
            contacts_errors: RefCell::new(FormErrors::new()),
        }
    }

    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    /// Replace the catalog and emit [`events::CATALOG_CHANGED`].
    pub fn set_catalog(&self, products: Vec<Product>) -> Result<(), BusError> {
        debug!(products = products.len(), "Catalog replaced");
        let payload = events::encode(&CatalogChanged {
            catalog: products.clone(),
        })?;
        *self.catalog.borrow_mut() = products;
        self.bus.emit(events::CATALOG_CHANGED, payload)
    }

    /// Add (`include == true`) or remove a product from the basket, then
    /// recompute the stored total.
    ///
    /// Both directions are idempotent. Does not emit.
    pub fn toggle_ordered_item(&self, id: &ProductId, include: bool) {
        let total = {
            let mut order = self.order.borrow_mut();
            if include {
                if !order.items.contains(id) {
                    order.items.push(id.clone());
                }
            } else {
                order.items.retain(|item| item != id);
            }
            let total = compute_total(&self.catalog.borrow(), &order.items);
            order.total = total;
            total
        };
        trace!(product = %id, include, total, "Basket toggled");
    }

    /// Check if `id` is in the basket.
    pub fn is_included_card(&self, id: &ProductId) -> bool {
        self.order.borrow().items.contains(id)
    }

    /// Sum of catalog prices of the basket items, computed against the
    /// current catalog. Ids missing from the catalog and products without a
    /// price contribute zero.
    pub fn total(&self) -> u64 {
        compute_total(&self.catalog.borrow(), &self.order.borrow().items)
    }

    /// Basket products, in catalog order.
    pub fn basket_products(&self) -> Vec<Product> {
        let order = self.order.borrow();
        self.catalog
            .borrow()
            .iter()
            .filter(|product| order.items.contains(&product.id))
            .cloned()
            .collect()
    }

    /// Set a field of the address step, then validate that form.
    ///
    /// Returns whether the form is valid after the change.
    pub fn set_order_field(
        &self,
        field: AddressField,
        value: impl Into<String>,
    ) -> Result<bool, BusError> {
        self.order
            .borrow_mut()
            .set_address_field(field, value.into());
        self.validate_order_form()
    }

    /// Recompute the address-form errors, emit
    /// [`events::ADDRESS_FORM_ERRORS_CHANGED`] with the full map, and
    /// report whether the form is valid.
    pub fn validate_order_form(&self) -> Result<bool, BusError> {
        let errors = self.order.borrow().address_errors();
        let valid = errors.is_valid();
        debug!(valid, errors = errors.len(), "Address form validated");

        let payload = events::encode(&errors)?;
        *self.address_errors.borrow_mut() = errors;
        self.bus.emit(events::ADDRESS_FORM_ERRORS_CHANGED, payload)?;
        Ok(valid)
    }

    /// Set a field of the contacts step, then validate that form.
    pub fn set_contacts_field(
        &self,
        field: ContactsField,
        value: impl Into<String>,
    ) -> Result<bool, BusError> {
        self.order
            .borrow_mut()
            .set_contacts_field(field, value.into());
        self.validate_contacts_form()
    }

    /// Recompute the contacts-form errors, emit
    /// [`events::CONTACTS_FORM_ERRORS_CHANGED`], and report validity.
    pub fn validate_contacts_form(&self) -> Result<bool, BusError> {
        let errors = self.order.borrow().contacts_errors();
        let valid = errors.is_valid();
        debug!(valid, errors = errors.len(), "Contacts form validated");

        let payload = events::encode(&errors)?;
        *self.contacts_errors.borrow_mut() = errors;
        self.bus.emit(events::CONTACTS_FORM_ERRORS_CHANGED, payload)?;
        Ok(valid)
    }

    /// Number of products in the basket.
    pub fn count_items(&self) -> usize {
        self.order.borrow().items.len()
    }

    /// Remove every basket item through the single-item removal path.
    /// Form fields are kept.
    pub fn clear_basket(&self) {
        let items = self.order.borrow().items.clone();
        for id in &items {
            self.toggle_ordered_item(id, false);
        }
    }

    /// Clear payment, address, email and phone. Items, total and the error
    /// maps are left alone; validation is not re-run.
    pub fn reset_form(&self) {
        self.order.borrow_mut().clear_fields();
    }

    /// Snapshot of the catalog.
    pub fn catalog(&self) -> Vec<Product> {
        self.catalog.borrow().clone()
    }

    /// Look up a catalog product by id.
    pub fn product(&self, id: &ProductId) -> Option<Product> {
        self.catalog.borrow().iter().find(|p| &p.id == id).cloned()
    }

    /// Snapshot of the order draft.
    pub fn order(&self) -> OrderDraft {
        self.order.borrow().clone()
    }

    /// Errors from the last address-form validation.
    pub fn address_errors(&self) -> FormErrors {
        self.address_errors.borrow().clone()
    }

    /// Errors from the last contacts-form validation.
    pub fn contacts_errors(&self) -> FormErrors {
        self.contacts_errors.borrow().clone()
    }
}

fn compute_total(catalog: &[Product], items: &[ProductId]) -> u64 {
    items
        .iter()
        .map(|id| {
            catalog
                .iter()
                .find(|p| &p.id == id)
                .map(Product::price_or_zero)
                .unwrap_or(0)
        })
        .fold(0u64, u64::saturating_add)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::Handler;
    use crate::order::{FormField, PAYMENT_ONLINE};
    use serde_json::Value;

    fn state_with_catalog(products: Vec<Product>) -> AppState {
        let state = AppState::new(Rc::new(EventBus::new()));
        state.set_catalog(products).unwrap();
        state
    }

    fn sample_catalog() -> Vec<Product> {
        vec![
            Product::new("a", "Фреймворк куки судьбы", Some(100)),
            Product::new("b", "Бэкенд-антистресс", Some(1000)),
            Product::new("c", "Мамка-таймер", None),
        ]
    }

    fn count_events(bus: &EventBus, name: &str) -> Rc<RefCell<Vec<Value>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.subscribe(name, &Handler::new(move |_, payload| {
            sink.borrow_mut().push(payload.clone());
            Ok(())
        }));
        seen
    }

    #[test]
    fn test_set_catalog_emits_catalog() {
        let bus = Rc::new(EventBus::new());
        let seen = count_events(&bus, events::CATALOG_CHANGED);
        let state = AppState::new(Rc::clone(&bus));

        state.set_catalog(sample_catalog()).unwrap();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        let payload: CatalogChanged = events::decode(&seen[0]).unwrap();
        assert_eq!(payload.catalog.len(), 3);
        assert_eq!(state.catalog().len(), 3);
    }

    #[test]
    fn test_toggle_is_idempotent() {
        let state = state_with_catalog(sample_catalog());
        let a = ProductId::new("a");

        state.toggle_ordered_item(&a, true);
        let once = state.order();
        state.toggle_ordered_item(&a, true);

        assert_eq!(state.order(), once);
        assert_eq!(state.count_items(), 1);
        assert_eq!(state.total(), 100);
        assert_eq!(state.order().total, 100);
    }

    #[test]
    fn test_toggle_remove_absent_is_noop_and_silent() {
        let bus = Rc::new(EventBus::new());
        let (seen, handler) = {
            let seen = Rc::new(RefCell::new(0));
            let sink = Rc::clone(&seen);
            (seen, Handler::new(move |_, _| {
                *sink.borrow_mut() += 1;
                Ok(())
            }))
        };
        let state = AppState::new(Rc::clone(&bus));
        state.set_catalog(sample_catalog()).unwrap();
        bus.subscribe_all(&handler);

        state.toggle_ordered_item(&ProductId::new("b"), false);
        state.toggle_ordered_item(&ProductId::new("a"), true);

        assert_eq!(*seen.borrow(), 0);
        assert_eq!(state.total(), 100);
    }

    #[test]
    fn test_total_treats_unknown_and_priceless_as_zero() {
        let state = state_with_catalog(sample_catalog());
        state.toggle_ordered_item(&ProductId::new("b"), true);
        state.toggle_ordered_item(&ProductId::new("c"), true);
        state.toggle_ordered_item(&ProductId::new("gone"), true);

        assert_eq!(state.count_items(), 3);
        assert_eq!(state.total(), 1000);
    }

    #[test]
    fn test_total_is_live_over_catalog() {
        let state = state_with_catalog(vec![Product::new("a", "A", Some(100))]);
        state.toggle_ordered_item(&ProductId::new("a"), true);
        assert_eq!(state.total(), 100);

        state.set_catalog(Vec::new()).unwrap();
        assert_eq!(state.total(), 0);
        // The stored total is only refreshed by basket mutations.
        assert_eq!(state.order().total, 100);
    }

    #[test]
    fn test_basket_products_in_catalog_order() {
        let state = state_with_catalog(sample_catalog());
        state.toggle_ordered_item(&ProductId::new("c"), true);
        state.toggle_ordered_item(&ProductId::new("a"), true);

        let ids: Vec<_> = state
            .basket_products()
            .into_iter()
            .map(|p| p.id.into_inner())
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(state.order().items, vec![ProductId::new("c"), ProductId::new("a")]);
    }

    #[test]
    fn test_clear_basket_keeps_fields() {
        let state = state_with_catalog(sample_catalog());
        for id in ["a", "b", "c"] {
            state.toggle_ordered_item(&ProductId::new(id), true);
        }
        state.set_order_field(AddressField::Address, "Москва").unwrap();

        state.clear_basket();

        assert_eq!(state.count_items(), 0);
        assert_eq!(state.total(), 0);
        assert_eq!(state.order().total, 0);
        assert_eq!(state.order().address, "Москва");
    }

    #[test]
    fn test_set_order_field_validates_and_emits() {
        let bus = Rc::new(EventBus::new());
        let seen = count_events(&bus, events::ADDRESS_FORM_ERRORS_CHANGED);
        let state = AppState::new(Rc::clone(&bus));

        let valid = state.set_order_field(AddressField::Payment, "").unwrap();
        assert!(!valid);
        let errors = state.address_errors();
        assert!(errors.contains(FormField::Payment));
        assert!(errors.contains(FormField::Address));

        state.set_order_field(AddressField::Address, "Москва").unwrap();
        let errors = state.address_errors();
        assert!(errors.contains(FormField::Payment));
        assert!(!errors.contains(FormField::Address));

        assert!(state.set_order_field(AddressField::Payment, PAYMENT_ONLINE).unwrap());
        assert!(state.address_errors().is_valid());

        let seen = seen.borrow();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[2], serde_json::json!({}));
    }

    #[test]
    fn test_forms_validate_independently() {
        let bus = Rc::new(EventBus::new());
        let address_events = count_events(&bus, events::ADDRESS_FORM_ERRORS_CHANGED);
        let state = AppState::new(Rc::clone(&bus));

        state.validate_order_form().unwrap();
        let before = state.address_errors();
        assert_eq!(before.len(), 2);

        assert!(!state.set_contacts_field(ContactsField::Email, "a@b.c").unwrap());
        assert!(state.set_contacts_field(ContactsField::Phone, "+7 999").unwrap());

        assert_eq!(state.address_errors(), before);
        assert!(state.contacts_errors().is_valid());
        assert_eq!(address_events.borrow().len(), 1);
    }

    #[test]
    fn test_reset_form_is_silent() {
        let bus = Rc::new(EventBus::new());
        let seen = count_events(&bus, events::CONTACTS_FORM_ERRORS_CHANGED);
        let state = AppState::new(Rc::clone(&bus));
        state.set_contacts_field(ContactsField::Email, "a@b.c").unwrap();
        state.toggle_ordered_item(&ProductId::new("a"), true);

        state.reset_form();

        let order = state.order();
        assert!(order.email.is_empty());
        assert_eq!(order.items.len(), 1);
        assert_eq!(seen.borrow().len(), 1);
        // Error state stays as of the last validation.
        assert!(state.contacts_errors().contains(FormField::Phone));
    }

    #[test]
    fn test_handler_failure_leaves_state_updated() {
        let bus = Rc::new(EventBus::new());
        bus.subscribe(
            events::ADDRESS_FORM_ERRORS_CHANGED,
            &Handler::new(|_, _| Err("view detached".into())),
        );
        let state = AppState::new(Rc::clone(&bus));

        let result = state.set_order_field(AddressField::Address, "Москва");
        assert!(matches!(result, Err(BusError::Handler { .. })));
        assert_eq!(state.order().address, "Москва");
        assert!(state.address_errors().contains(FormField::Payment));
    }

    #[test]
    fn test_handler_can_reenter_state() {
        let bus = Rc::new(EventBus::new());
        let state = Rc::new(AppState::new(Rc::clone(&bus)));
        let counts = Rc::new(RefCell::new(Vec::new()));

        let weak = Rc::downgrade(&state);
        let sink = Rc::clone(&counts);
        bus.subscribe(events::CATALOG_CHANGED, &Handler::new(move |_, _| {
            if let Some(state) = weak.upgrade() {
                state.toggle_ordered_item(&ProductId::new("a"), true);
                sink.borrow_mut().push((state.count_items(), state.total()));
            }
            Ok(())
        }));

        state.set_catalog(sample_catalog()).unwrap();
        assert_eq!(*counts.borrow(), vec![(1, 100)]);
    }
}
