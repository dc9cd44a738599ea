//! Name-addressed publish/subscribe event bus.
//!
//! Publishers emit an event name with a JSON payload; every handler whose
//! [`Selector`] matches the name is invoked synchronously, inline, before
//! [`EventBus::emit`] returns.
//!
//! # Delivery rules
//!
//! - Exact selectors are visited first, then pattern selectors in the order
//!   they were first registered. Within one selector, handlers run in
//!   registration order.
//! - Every handler receives the same `&mut Value`. A mutation made by one
//!   handler is visible to the handlers after it.
//! - A handler returning `Err` stops delivery: later handlers do not run
//!   and the error is returned to the caller of `emit` as
//!   [`BusError::Handler`]. Panics propagate unchanged.
//! - The handler list for an emit is captured when the emit starts.
//!   Handlers may subscribe, unsubscribe, or emit on the same bus. A
//!   handler subscribed during an emit first runs on the next emit; a
//!   handler unsubscribed during an emit is skipped if it has not run yet.
//!
//! Nothing detects emission cycles. A handler for `x` that emits `x` again
//! recurses until the stack runs out.

use regex::Regex;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Error returned by a handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result returned by a handler.
pub type HandlerResult = Result<(), HandlerError>;

type HandlerFn = dyn Fn(&str, &mut Value) -> HandlerResult;

/// Source text of the selector used by [`EventBus::subscribe_all`].
pub const WILDCARD: &str = ".*";

static WILDCARD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(WILDCARD).expect("Invalid wildcard regex"));

/// Errors produced by the event bus.
#[derive(Error, Debug)]
pub enum BusError {
    /// A handler failed while an event was being delivered.
    #[error("Handler for '{event}' failed: {source}")]
    Handler {
        event: String,
        #[source]
        source: HandlerError,
    },

    /// A pattern selector did not compile.
    #[error("Invalid event pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A payload did not have the expected shape.
    #[error("Payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

/// A subscribed callback.
///
/// Handlers are compared by identity: two clones of the same `Handler` are
/// equal, two handlers built from identical closures are not. Keep a clone
/// around to [`EventBus::unsubscribe`] it later.
#[derive(Clone)]
pub struct Handler(Rc<HandlerFn>);

impl Handler {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str, &mut Value) -> HandlerResult + 'static,
    {
        Self(Rc::new(f))
    }

    /// Check whether two handles refer to the same callback.
    pub fn same(&self, other: &Handler) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }

    fn call(&self, event: &str, payload: &mut Value) -> HandlerResult {
        (self.0)(event, payload)
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl Eq for Handler {}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

/// What a subscription listens to.
#[derive(Debug, Clone)]
pub enum Selector {
    /// Matches one event name exactly.
    Exact(String),
    /// Matches every event name the regex finds a match in.
    Pattern(Regex),
}

impl Selector {
    /// Compile a pattern selector.
    pub fn pattern(pattern: &str) -> Result<Self, BusError> {
        Ok(Selector::Pattern(Regex::new(pattern)?))
    }

    /// Selector matching every event name.
    pub fn wildcard() -> Self {
        Selector::Pattern(WILDCARD_RE.clone())
    }

    /// Test an event name against this selector.
    pub fn matches(&self, event: &str) -> bool {
        match self {
            Selector::Exact(name) => name == event,
            Selector::Pattern(re) => re.is_match(event),
        }
    }

    fn is_exact(&self) -> bool {
        matches!(self, Selector::Exact(_))
    }

    /// Selectors are keyed by kind and source text.
    fn same_key(&self, other: &Selector) -> bool {
        match (self, other) {
            (Selector::Exact(a), Selector::Exact(b)) => a == b,
            (Selector::Pattern(a), Selector::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Exact(name) => f.write_str(name),
            Selector::Pattern(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

impl From<&str> for Selector {
    fn from(name: &str) -> Self {
        Selector::Exact(name.to_string())
    }
}

impl From<String> for Selector {
    fn from(name: String) -> Self {
        Selector::Exact(name)
    }
}

impl From<Regex> for Selector {
    fn from(re: Regex) -> Self {
        Selector::Pattern(re)
    }
}

impl From<&Selector> for Selector {
    fn from(selector: &Selector) -> Self {
        selector.clone()
    }
}

struct Listeners {
    selector: Selector,
    handlers: Vec<Handler>,
}

/// Synchronous publish/subscribe bus.
///
/// The bus is single-threaded (`!Send`) and uses interior mutability so it
/// can be shared behind an `Rc` by every collaborator in a session.
#[derive(Default)]
pub struct EventBus {
    listeners: RefCell<Vec<Listeners>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for events matching `selector`.
    ///
    /// Registering the same handler twice for the same selector is a no-op.
    pub fn subscribe(&self, selector: impl Into<Selector>, handler: &Handler) {
        let selector = selector.into();
        let mut listeners = self.listeners.borrow_mut();

        match listeners.iter_mut().find(|l| l.selector.same_key(&selector)) {
            Some(entry) => {
                if entry.handlers.iter().any(|h| h.same(handler)) {
                    return;
                }
                entry.handlers.push(handler.clone());
            }
            None => listeners.push(Listeners {
                selector: selector.clone(),
                handlers: vec![handler.clone()],
            }),
        }

        debug!(%selector, ?handler, "Subscribed handler");
    }

    /// Remove `handler` from `selector`.
    ///
    /// A selector left without handlers is dropped. Removing a handler that
    /// is not registered does nothing.
    pub fn unsubscribe(&self, selector: impl Into<Selector>, handler: &Handler) {
        let selector = selector.into();
        let mut listeners = self.listeners.borrow_mut();

        let Some(index) = listeners.iter().position(|l| l.selector.same_key(&selector)) else {
            return;
        };

        let entry = &mut listeners[index];
        let before = entry.handlers.len();
        entry.handlers.retain(|h| !h.same(handler));
        let removed = entry.handlers.len() < before;

        if entry.handlers.is_empty() {
            listeners.remove(index);
        }

        if removed {
            debug!(%selector, ?handler, "Unsubscribed handler");
        }
    }

    /// Register `handler` for every event that flows through the bus.
    pub fn subscribe_all(&self, handler: &Handler) {
        self.subscribe(Selector::wildcard(), handler);
    }

    /// Drop every registration.
    pub fn clear_all(&self) {
        let dropped = {
            let mut listeners = self.listeners.borrow_mut();
            std::mem::take(&mut *listeners)
        };
        debug!(selectors = dropped.len(), "Cleared all subscriptions");
    }

    /// Emit `event` with `payload`. Use `Value::Null` for no payload.
    pub fn emit(&self, event: &str, payload: Value) -> Result<(), BusError> {
        let mut payload = payload;
        self.emit_mut(event, &mut payload)
    }

    /// Emit `event`, letting the caller observe handler mutations of the
    /// payload afterwards.
    pub fn emit_mut(&self, event: &str, payload: &mut Value) -> Result<(), BusError> {
        let handlers = self.matching(event);
        trace!(event, handlers = handlers.len(), "Emitting event");

        for (selector, handler) in &handlers {
            // Unsubscribed by an earlier handler of this emit.
            if !self.is_registered(selector, handler) {
                continue;
            }
            if let Err(source) = handler.call(event, payload) {
                warn!(event, error = %source, "Event handler failed, delivery aborted");
                return Err(BusError::Handler {
                    event: event.to_string(),
                    source,
                });
            }
        }

        Ok(())
    }

    /// Build an [`Emitter`] that always emits `event` with `fixed` object
    /// fields merged over whatever payload it is called with.
    pub fn make_emitter(self: &Rc<Self>, event: impl Into<String>, fixed: Value) -> Emitter {
        let fixed = match fixed {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Emitter {
            bus: Rc::clone(self),
            event: event.into(),
            fixed,
        }
    }

    /// Number of handlers registered under `selector`.
    pub fn listener_count(&self, selector: impl Into<Selector>) -> usize {
        let selector = selector.into();
        self.listeners
            .borrow()
            .iter()
            .find(|l| l.selector.same_key(&selector))
            .map(|l| l.handlers.len())
            .unwrap_or(0)
    }

    /// True when nothing is subscribed.
    pub fn is_empty(&self) -> bool {
        self.listeners.borrow().is_empty()
    }

    fn is_registered(&self, selector: &Selector, handler: &Handler) -> bool {
        self.listeners
            .borrow()
            .iter()
            .find(|l| l.selector.same_key(selector))
            .is_some_and(|l| l.handlers.iter().any(|h| h.same(handler)))
    }

    fn matching(&self, event: &str) -> Vec<(Selector, Handler)> {
        let listeners = self.listeners.borrow();
        let exact = listeners
            .iter()
            .filter(|l| l.selector.is_exact() && l.selector.matches(event));
        let patterns = listeners
            .iter()
            .filter(|l| !l.selector.is_exact() && l.selector.matches(event));

        exact
            .chain(patterns)
            .flat_map(|l| {
                l.handlers
                    .iter()
                    .map(move |h| (l.selector.clone(), h.clone()))
            })
            .collect()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.borrow();
        f.debug_map()
            .entries(
                listeners
                    .iter()
                    .map(|l| (l.selector.to_string(), l.handlers.len())),
            )
            .finish()
    }
}

/// A pre-bound emit for one event name.
#[derive(Debug, Clone)]
pub struct Emitter {
    bus: Rc<EventBus>,
    event: String,
    fixed: Map<String, Value>,
}

impl Emitter {
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Emit with `payload` as the base object. Fixed fields win on
    /// conflicts; a non-object payload is replaced by the fixed fields.
    pub fn emit(&self, payload: Value) -> Result<(), BusError> {
        let mut merged = match payload {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in &self.fixed {
            merged.insert(key.clone(), value.clone());
        }
        self.bus.emit(&self.event, Value::Object(merged))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    fn recorder() -> (Rc<RefCell<Vec<(String, Value)>>>, Handler) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let handler = Handler::new(move |event, payload| {
            sink.borrow_mut().push((event.to_string(), payload.clone()));
            Ok(())
        });
        (seen, handler)
    }

    #[test]
    fn test_exact_subscription_receives_payload_once() {
        let bus = EventBus::new();
        let (seen, handler) = recorder();
        bus.subscribe("x", &handler);

        bus.emit("x", json!({"n": 1})).unwrap();
        bus.emit("y", json!({"n": 2})).unwrap();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], ("x".to_string(), json!({"n": 1})));
    }

    #[test]
    fn test_pattern_subscription() {
        let bus = EventBus::new();
        let (seen, handler) = recorder();
        bus.subscribe(Selector::pattern(r":change$").unwrap(), &handler);

        bus.emit("order.address:change", Value::Null).unwrap();
        bus.emit("order.address:changed", Value::Null).unwrap();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "order.address:change");
    }

    #[test]
    fn test_duplicate_subscription_is_noop() {
        let bus = EventBus::new();
        let (seen, handler) = recorder();
        bus.subscribe("x", &handler);
        bus.subscribe("x", &handler.clone());

        assert_eq!(bus.listener_count("x"), 1);
        bus.emit("x", Value::Null).unwrap();
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_identical_closures_are_distinct_handlers() {
        let bus = EventBus::new();
        let a = Handler::new(|_, _| Ok(()));
        let b = Handler::new(|_, _| Ok(()));
        bus.subscribe("x", &a);
        bus.subscribe("x", &b);
        assert_eq!(bus.listener_count("x"), 2);
    }

    #[test]
    fn test_same_handler_on_two_selectors_runs_twice() {
        let bus = EventBus::new();
        let (seen, handler) = recorder();
        bus.subscribe("order:open", &handler);
        bus.subscribe(Selector::pattern("^order:").unwrap(), &handler);

        bus.emit("order:open", Value::Null).unwrap();
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn test_unsubscribe_stops_delivery_and_drops_empty_selector() {
        let bus = EventBus::new();
        let (seen, handler) = recorder();
        bus.subscribe("x", &handler);
        bus.unsubscribe("x", &handler);

        assert!(bus.is_empty());
        bus.emit("x", Value::Null).unwrap();
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_unsubscribe_unknown_is_noop() {
        let bus = EventBus::new();
        let (_, handler) = recorder();
        let (_, other) = recorder();
        bus.unsubscribe("never", &handler);

        bus.subscribe("x", &handler);
        bus.unsubscribe("x", &other);
        assert_eq!(bus.listener_count("x"), 1);
    }

    #[test]
    fn test_registration_order_within_selector() {
        let bus = EventBus::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for i in 0..3 {
            let order = Rc::clone(&order);
            bus.subscribe("x", &Handler::new(move |_, _| {
                order.borrow_mut().push(i);
                Ok(())
            }));
        }

        bus.emit("x", Value::Null).unwrap();
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_exact_selectors_run_before_patterns() {
        let bus = EventBus::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        let o = Rc::clone(&order);
        bus.subscribe(Selector::pattern("^x").unwrap(), &Handler::new(move |_, _| {
            o.borrow_mut().push("pattern");
            Ok(())
        }));
        let o = Rc::clone(&order);
        bus.subscribe("x", &Handler::new(move |_, _| {
            o.borrow_mut().push("exact");
            Ok(())
        }));

        bus.emit("x", Value::Null).unwrap();
        assert_eq!(*order.borrow(), vec!["exact", "pattern"]);
    }

    #[test]
    fn test_payload_mutation_visible_to_later_handlers() {
        let bus = EventBus::new();
        bus.subscribe("x", &Handler::new(|_, payload| {
            payload["touched"] = json!(true);
            Ok(())
        }));
        let (seen, handler) = recorder();
        bus.subscribe("x", &handler);

        let mut payload = json!({"n": 1});
        bus.emit_mut("x", &mut payload).unwrap();

        assert_eq!(seen.borrow()[0].1, json!({"n": 1, "touched": true}));
        assert_eq!(payload["touched"], true);
    }

    #[test]
    fn test_failing_handler_aborts_delivery() {
        let bus = EventBus::new();
        let (before, first) = recorder();
        let (after, last) = recorder();
        bus.subscribe("x", &first);
        bus.subscribe("x", &Handler::new(|_, _| Err("render failed".into())));
        bus.subscribe("x", &last);

        let err = bus.emit("x", Value::Null).unwrap_err();
        assert!(matches!(err, BusError::Handler { ref event, .. } if event == "x"));
        assert_eq!(err.to_string(), "Handler for 'x' failed: render failed");
        assert_eq!(before.borrow().len(), 1);
        assert!(after.borrow().is_empty());
    }

    #[test]
    fn test_subscribe_all_sees_every_event() {
        let bus = EventBus::new();
        let (seen, handler) = recorder();
        bus.subscribe_all(&handler);

        bus.emit("cards:changed", Value::Null).unwrap();
        bus.emit("basket:open", Value::Null).unwrap();

        let names: Vec<_> = seen.borrow().iter().map(|(n, _)| n.clone()).collect();
        assert_eq!(names, vec!["cards:changed", "basket:open"]);
        assert_eq!(bus.listener_count(Selector::wildcard()), 1);
    }

    #[test]
    fn test_clear_all() {
        let bus = EventBus::new();
        let (seen, handler) = recorder();
        bus.subscribe("x", &handler);
        bus.subscribe_all(&handler);
        bus.clear_all();

        assert!(bus.is_empty());
        bus.emit("x", Value::Null).unwrap();
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_handler_can_unsubscribe_itself() {
        let bus = Rc::new(EventBus::new());
        let calls = Rc::new(Cell::new(0));
        let slot: Rc<RefCell<Option<Handler>>> = Rc::new(RefCell::new(None));

        let handler = {
            let bus = Rc::downgrade(&bus);
            let calls = Rc::clone(&calls);
            let slot = Rc::clone(&slot);
            Handler::new(move |event, _| {
                calls.set(calls.get() + 1);
                if let (Some(bus), Some(me)) = (bus.upgrade(), slot.borrow().as_ref()) {
                    bus.unsubscribe(event, me);
                }
                Ok(())
            })
        };
        *slot.borrow_mut() = Some(handler.clone());
        bus.subscribe("order:clear", &handler);

        bus.emit("order:clear", Value::Null).unwrap();
        bus.emit("order:clear", Value::Null).unwrap();
        assert_eq!(calls.get(), 1);
        assert!(bus.is_empty());
    }

    #[test]
    fn test_handler_unsubscribed_mid_emit_is_skipped() {
        let bus = Rc::new(EventBus::new());
        let (seen, view) = recorder();

        let closer = {
            let bus = Rc::downgrade(&bus);
            let view = view.clone();
            Handler::new(move |event, _| {
                if let Some(bus) = bus.upgrade() {
                    bus.unsubscribe(event, &view);
                }
                Ok(())
            })
        };
        bus.subscribe("modal:close", &closer);
        bus.subscribe("modal:close", &view);
        bus.subscribe_all(&view);

        bus.emit("modal:close", Value::Null).unwrap();

        // Still reached through the wildcard, not through the removed selector.
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(bus.listener_count("modal:close"), 1);
    }

    #[test]
    fn test_handler_subscribed_mid_emit_waits_for_next_emit() {
        let bus = Rc::new(EventBus::new());
        let (seen, late) = recorder();

        let weak = Rc::downgrade(&bus);
        bus.subscribe("x", &Handler::new(move |event, _| {
            if let Some(bus) = weak.upgrade() {
                bus.subscribe(event, &late);
            }
            Ok(())
        }));

        bus.emit("x", Value::Null).unwrap();
        assert!(seen.borrow().is_empty());
        bus.emit("x", Value::Null).unwrap();
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_nested_emit() {
        let bus = Rc::new(EventBus::new());
        let (seen, handler) = recorder();
        bus.subscribe("inner", &handler);

        let weak = Rc::downgrade(&bus);
        bus.subscribe("outer", &Handler::new(move |_, payload| {
            if let Some(bus) = weak.upgrade() {
                bus.emit("inner", payload.clone())?;
            }
            Ok(())
        }));

        bus.emit("outer", json!({"k": "v"})).unwrap();
        assert_eq!(seen.borrow()[0], ("inner".to_string(), json!({"k": "v"})));
    }

    #[test]
    fn test_make_emitter_fixed_fields_win() {
        let bus = Rc::new(EventBus::new());
        let (seen, handler) = recorder();
        bus.subscribe("order.payment:change", &handler);

        let emitter = bus.make_emitter("order.payment:change", json!({"field": "payment"}));
        assert_eq!(emitter.event(), "order.payment:change");
        emitter
            .emit(json!({"field": "address", "value": "card"}))
            .unwrap();
        emitter.emit(Value::Null).unwrap();

        let seen = seen.borrow();
        assert_eq!(seen[0].1, json!({"field": "payment", "value": "card"}));
        assert_eq!(seen[1].1, json!({"field": "payment"}));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(
            Selector::pattern("(unclosed"),
            Err(BusError::InvalidPattern(_))
        ));
    }
}
