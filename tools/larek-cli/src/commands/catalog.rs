//! Catalog listing.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;
use larek_core::catalog::Product;
use larek_core::events::{self, CatalogChanged};
use larek_core::Handler;

use super::{open_session, open_store, CatalogArgs};
use crate::context::Context;
use crate::output::format_price;

/// Run the catalog command.
pub fn run(args: CatalogArgs, ctx: &Context) -> Result<()> {
    let api = open_store(args.catalog.as_deref(), ctx)?;
    let session = open_session(ctx);

    // The gallery renders from the change event, not from the loader.
    let gallery: Rc<RefCell<Vec<Product>>> = Rc::default();
    {
        let gallery = Rc::clone(&gallery);
        session.bus.subscribe(
            events::CATALOG_CHANGED,
            &Handler::new(move |_, payload| {
                let changed: CatalogChanged = events::decode(payload)?;
                *gallery.borrow_mut() = changed.catalog;
                Ok(())
            }),
        );
    }

    session.load_catalog(&api)?;
    session.teardown();

    let products: Vec<Product> = gallery
        .take()
        .into_iter()
        .filter(|p| !args.for_sale || p.is_for_sale())
        .collect();

    if ctx.output.is_json() {
        ctx.output.json(&products);
        return Ok(());
    }

    ctx.output.header(&format!("Catalog ({} products)", products.len()));
    for product in &products {
        ctx.output.product_row(product, false);
        ctx.output.debug(&format!("{} {}", product.image, product.description));
    }

    let priceless = products.iter().filter(|p| !p.is_for_sale()).count();
    if priceless > 0 {
        ctx.output.info(&format!(
            "{} product(s) are {} and cannot be ordered",
            priceless,
            format_price(None)
        ));
    }

    Ok(())
}
