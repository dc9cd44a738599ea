//! Session context shared by every collaborator.

use crate::api::StoreApi;
use crate::bus::{EventBus, Handler};
use crate::error::StoreError;
use crate::events;
use crate::order::OrderResult;
use crate::state::AppState;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info};

/// The one event bus and the one application state of a session.
///
/// Built once at startup and handed to each view or driver that needs it.
/// Cloning shares the same bus and state.
#[derive(Debug, Clone)]
pub struct StoreContext {
    pub bus: Rc<EventBus>,
    pub state: Rc<AppState>,
    pending_clear: Rc<RefCell<Option<Handler>>>,
}

impl StoreContext {
    pub fn new() -> Self {
        let bus = Rc::new(EventBus::new());
        let state = Rc::new(AppState::new(Rc::clone(&bus)));
        Self {
            bus,
            state,
            pending_clear: Rc::new(RefCell::new(None)),
        }
    }

    /// Fetch the catalog and hand it to the state.
    ///
    /// Returns the number of products loaded.
    pub fn load_catalog(&self, api: &dyn StoreApi) -> Result<usize, StoreError> {
        let products = api.product_list()?;
        let count = products.len();
        self.state.set_catalog(products)?;
        info!(products = count, "Catalog loaded");
        Ok(count)
    }

    /// Validate both checkout forms and place the order.
    ///
    /// On success a one-shot [`events::ORDER_CLEAR`] handler is registered
    /// (at most one at a time). Emitting that event, when the success panel
    /// is dismissed, empties the basket and removes the handler again.
    pub fn submit_order(&self, api: &dyn StoreApi) -> Result<OrderResult, StoreError> {
        if self.state.count_items() == 0 {
            return Err(StoreError::EmptyBasket);
        }

        let address_valid = self.state.validate_order_form()?;
        let contacts_valid = self.state.validate_contacts_form()?;
        if !address_valid || !contacts_valid {
            let mut messages = Vec::new();
            for errors in [self.state.address_errors(), self.state.contacts_errors()] {
                if !errors.is_valid() {
                    messages.push(errors.messages());
                }
            }
            return Err(StoreError::InvalidOrder(messages.join("; ")));
        }

        let order = self.state.order();
        debug!(items = order.items.len(), total = order.total, "Submitting order");
        let result = api.order_products(&order)?;

        self.clear_on_acknowledge();
        Ok(result)
    }

    /// Drop every subscription. Handlers holding the state are released,
    /// which breaks any reference cycle between the bus and its handlers.
    pub fn teardown(&self) {
        self.pending_clear.borrow_mut().take();
        self.bus.clear_all();
    }

    fn clear_on_acknowledge(&self) {
        if self.pending_clear.borrow().is_some() {
            return;
        }

        let state = Rc::downgrade(&self.state);
        let bus = Rc::downgrade(&self.bus);
        let pending = Rc::downgrade(&self.pending_clear);

        let handler = Handler::new(move |event, _| {
            if let Some(state) = state.upgrade() {
                state.clear_basket();
            }
            let me = pending.upgrade().and_then(|slot| {
                let me = slot.borrow_mut().take();
                me
            });
            if let (Some(bus), Some(me)) = (bus.upgrade(), me) {
                bus.unsubscribe(event, &me);
            }
            Ok(())
        });

        self.bus.subscribe(events::ORDER_CLEAR, &handler);
        *self.pending_clear.borrow_mut() = Some(handler);
    }
}

impl Default for StoreContext {
    fn default() -> Self {
        Self::new()
    }
}
