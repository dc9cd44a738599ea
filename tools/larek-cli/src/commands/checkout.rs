//! Checkout session.
//!
//! Plays the part of the storefront's views: cards go into the basket, the
//! two form steps report their inputs as field-change events, and the
//! validation results come back over the bus.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{bail, Result};
use larek_core::events::{self, PaymentSelect};
use larek_core::order::{FormErrors, PAYMENT_ONLINE, PAYMENT_ON_RECEIPT};
use larek_core::{wiring, Handler, ProductId, StoreContext, StoreError};
use serde_json::{json, Value};
use tracing::debug;

use super::{open_session, open_store, CheckoutArgs};
use crate::context::Context;
use crate::output::{format_amount, format_price};

const STEPS: usize = 4;

/// Run the checkout command.
pub fn run(args: CheckoutArgs, ctx: &Context) -> Result<()> {
    let api = open_store(args.catalog.as_deref(), ctx)?;
    let session = open_session(ctx);
    let wiring = wiring::connect(&session)?;

    let address_errors = watch_errors(&session, events::ADDRESS_FORM_ERRORS_CHANGED);
    let contacts_errors = watch_errors(&session, events::CONTACTS_FORM_ERRORS_CHANGED);

    let loaded = session.load_catalog(&api)?;
    ctx.output.debug(&format!("Loaded {} products", loaded));

    ctx.output.step(1, STEPS, "Basket");
    fill_basket(&args.items, &session, ctx)?;

    ctx.output.step(2, STEPS, "Payment and address");
    if !args.payment.is_empty() {
        if args.payment != PAYMENT_ONLINE && args.payment != PAYMENT_ON_RECEIPT {
            ctx.output.warn(&format!(
                "Unusual payment method '{}' (expected {} or {})",
                args.payment, PAYMENT_ONLINE, PAYMENT_ON_RECEIPT
            ));
        }
        let select = events::encode(&PaymentSelect {
            payment: args.payment.clone(),
        })?;
        session.bus.emit(events::PAYMENT_SELECT, select)?;
    }
    input(&session, events::ORDER_FORM, "address", &args.address)?;
    report_form(ctx, &address_errors);

    ctx.output.step(3, STEPS, "Contacts");
    input(&session, events::CONTACTS_FORM, "email", &args.email)?;
    input(&session, events::CONTACTS_FORM, "phone", &args.phone)?;
    report_form(ctx, &contacts_errors);

    ctx.output.step(4, STEPS, "Order");
    let items = session.state.basket_products();
    let result = match session.submit_order(&api) {
        Ok(result) => result,
        Err(StoreError::InvalidOrder(messages)) => {
            bail!("Order forms are incomplete: {}", messages);
        }
        Err(e) => return Err(e.into()),
    };

    // Success panel dismissed.
    session.bus.emit(events::ORDER_CLEAR, Value::Null)?;
    session.bus.emit(events::FORM_RESET, Value::Null)?;
    debug!(
        basket = session.state.count_items(),
        "Basket cleared after order"
    );

    wiring.disconnect(&session.bus);
    session.teardown();

    if ctx.output.is_json() {
        ctx.output.json(&json!({
            "id": result.id,
            "total": result.total,
            "items": items.iter().map(|p| &p.id).collect::<Vec<_>>(),
        }));
        return Ok(());
    }

    ctx.output.success(&format!("Order {} placed", result.id));
    for product in &items {
        ctx.output.product_row(product, true);
    }
    ctx.output.kv("Списано", &format_amount(result.total));

    Ok(())
}

/// Put every requested product in the basket, the way the preview card
/// button does: unknown ids are an error, priceless products are skipped.
fn fill_basket(items: &[String], session: &StoreContext, ctx: &Context) -> Result<()> {
    for raw in items {
        let id = ProductId::new(raw.trim());
        let Some(product) = session.state.product(&id) else {
            bail!("Product not in catalog: {}", id);
        };
        if !product.is_for_sale() {
            ctx.output.warn(&format!(
                "'{}' is {} and cannot be ordered",
                product.title,
                format_price(None)
            ));
            continue;
        }
        if session.state.is_included_card(&id) {
            ctx.output.debug(&format!("'{}' is already in the basket", product.title));
            continue;
        }
        session.state.toggle_ordered_item(&id, true);
        ctx.output.list_item(&format!(
            "{} ({})",
            product.title,
            format_price(product.price)
        ));
    }

    ctx.output.kv(
        "Итого",
        &format!(
            "{} item(s), {}",
            session.state.count_items(),
            format_amount(session.state.total())
        ),
    );
    Ok(())
}

/// Report one input change the way a form view does.
fn input(session: &StoreContext, form: &str, field: &str, value: &str) -> Result<()> {
    let emitter = session
        .bus
        .make_emitter(events::field_change(form, field), json!({ "field": field }));
    emitter.emit(json!({ "value": value }))?;
    Ok(())
}

/// Keep the latest error map announced on `event`.
fn watch_errors(session: &StoreContext, event: &str) -> Rc<RefCell<FormErrors>> {
    let latest: Rc<RefCell<FormErrors>> = Rc::default();
    let sink = Rc::clone(&latest);
    session.bus.subscribe(
        event,
        &Handler::new(move |_, payload| {
            *sink.borrow_mut() = events::decode(payload)?;
            Ok(())
        }),
    );
    latest
}

fn report_form(ctx: &Context, errors: &Rc<RefCell<FormErrors>>) {
    let errors = errors.borrow();
    if errors.is_valid() {
        ctx.output.debug("Form is valid");
        return;
    }
    for (field, message) in errors.iter() {
        ctx.output.warn(&format!("{}: {}", field, message));
    }
}
