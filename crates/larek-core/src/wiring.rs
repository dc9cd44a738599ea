//! Standard routes from form events into the application state.
//!
//! Form views emit a field-change event per input (`order.address:change`,
//! `contacts.email:change`, ...) and know nothing about the state. These
//! subscriptions turn those events into the matching state setters.

use crate::bus::{BusError, EventBus, Handler, HandlerResult, Selector};
use crate::context::StoreContext;
use crate::events::{self, FieldChange, PaymentSelect};
use crate::order::{AddressField, ContactsField};
use crate::state::AppState;
use serde_json::Value;
use std::rc::{Rc, Weak};
use tracing::debug;

/// Subscriptions registered by [`connect`].
#[derive(Debug)]
pub struct Wiring {
    routes: Vec<(Selector, Handler)>,
}

impl Wiring {
    /// Remove every route from `bus`.
    pub fn disconnect(&self, bus: &EventBus) {
        for (selector, handler) in &self.routes {
            bus.unsubscribe(selector, handler);
        }
        debug!(routes = self.routes.len(), "Form routes disconnected");
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Route form events on `ctx.bus` into `ctx.state`:
///
/// - `order.<field>:change` → [`AppState::set_order_field`]
/// - `contacts.<field>:change` → [`AppState::set_contacts_field`]
/// - `buttonPayments:select` → payment field of the address step
/// - `form:reset` → [`AppState::reset_form`]
///
/// Handlers hold the state weakly; after the state is dropped they do
/// nothing.
pub fn connect(ctx: &StoreContext) -> Result<Wiring, BusError> {
    let routes = vec![
        (
            Selector::pattern(events::ORDER_FIELD_CHANGE_PATTERN)?,
            route(&ctx.state, on_order_field),
        ),
        (
            Selector::pattern(events::CONTACTS_FIELD_CHANGE_PATTERN)?,
            route(&ctx.state, on_contacts_field),
        ),
        (
            Selector::from(events::PAYMENT_SELECT),
            route(&ctx.state, on_payment_select),
        ),
        (
            Selector::from(events::FORM_RESET),
            route(&ctx.state, |state, _| {
                state.reset_form();
                Ok(())
            }),
        ),
    ];

    for (selector, handler) in &routes {
        ctx.bus.subscribe(selector, handler);
    }
    debug!(routes = routes.len(), "Form routes connected");

    Ok(Wiring { routes })
}

fn route<F>(state: &Rc<AppState>, f: F) -> Handler
where
    F: Fn(&AppState, &Value) -> HandlerResult + 'static,
{
    let state: Weak<AppState> = Rc::downgrade(state);
    Handler::new(move |_, payload| match state.upgrade() {
        Some(state) => f(&state, payload),
        None => Ok(()),
    })
}

fn on_order_field(state: &AppState, payload: &Value) -> HandlerResult {
    let change: FieldChange = events::decode(payload)?;
    let field: AddressField = change.field.parse()?;
    state.set_order_field(field, change.value)?;
    Ok(())
}

fn on_contacts_field(state: &AppState, payload: &Value) -> HandlerResult {
    let change: FieldChange = events::decode(payload)?;
    let field: ContactsField = change.field.parse()?;
    state.set_contacts_field(field, change.value)?;
    Ok(())
}

fn on_payment_select(state: &AppState, payload: &Value) -> HandlerResult {
    let select: PaymentSelect = events::decode(payload)?;
    state.set_order_field(AddressField::Payment, select.payment)?;
    Ok(())
}
