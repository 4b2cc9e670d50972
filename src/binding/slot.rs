//! Expression slot: one embedded expression of an interpolation
//!
//! A slot evaluates its expression, caches the stringified result and tracks
//! the dependencies read during evaluation. Dependencies are tagged with the
//! bind-generation (`version`) that last touched them; after a re-evaluation
//! the slot drops the ones the new generation no longer reads, so there is no
//! observation gap and no duplicate subscription.
//!
//! A slot either belongs to a [`CompositeInterpolation`] (which it asks to
//! recompute on change) or stands alone and writes `left + value + right`
//! into its own target.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::error::Result;
use crate::scope::{LookupContext, Scope};
use crate::value::{RawValue, Record, Sequence};

use super::composite::CompositeInterpolation;
use super::observer::same_observer;
use super::{
    BindingServices, Connect, Connectable, Expression, Observer, Subscriber, Target, TargetAccessor,
    UpdateMode,
};

/// Where a slot sends its value
pub(crate) enum SlotOwner {
    Composite(Weak<CompositeInterpolation>),
    Standalone {
        target: Rc<dyn Target>,
        property: String,
        accessor: Rc<dyn TargetAccessor>,
        left: String,
        right: String,
    },
}

struct ObservedEntry {
    observer: Rc<dyn Observer>,
    version: u32,
}

#[derive(Default)]
struct SlotState {
    is_bound: bool,
    source: Option<Rc<Scope>>,
    value: Option<String>,
    raw_value: RawValue,
    version: u32,
    observed: Vec<ObservedEntry>,
}

pub struct ExpressionSlot {
    me: Weak<ExpressionSlot>,
    owner: SlotOwner,
    expression: Rc<dyn Expression>,
    lookup: Rc<LookupContext>,
    services: BindingServices,
    original_mode: UpdateMode,
    mode: Cell<UpdateMode>,
    state: RefCell<SlotState>,
}

impl ExpressionSlot {
    pub(crate) fn new(
        owner: SlotOwner,
        expression: Rc<dyn Expression>,
        mode: UpdateMode,
        lookup: Rc<LookupContext>,
        services: BindingServices,
    ) -> Rc<Self> {
        Rc::new_cyclic(|me| Self {
            me: me.clone(),
            owner,
            expression,
            lookup,
            services,
            original_mode: mode,
            mode: Cell::new(mode),
            state: RefCell::new(SlotState::default()),
        })
    }

    pub fn is_bound(&self) -> bool {
        self.state.borrow().is_bound
    }

    /// Last stringified value (None before the first evaluation or after unbind)
    pub fn value(&self) -> Option<String> {
        self.state.borrow().value.clone()
    }

    /// Last raw evaluation result
    pub fn raw_value(&self) -> RawValue {
        self.state.borrow().raw_value.clone()
    }

    /// Bind-generation counter
    pub fn version(&self) -> u32 {
        self.state.borrow().version
    }

    /// Dependencies currently subscribed to
    pub fn observed_count(&self) -> usize {
        self.state.borrow().observed.len()
    }

    pub(crate) fn push_value(&self, out: &mut String) {
        if let Some(value) = &self.state.borrow().value {
            out.push_str(value);
        }
    }

    fn source(&self) -> Option<Rc<Scope>> {
        let state = self.state.borrow();
        if state.is_bound {
            state.source.clone()
        } else {
            None
        }
    }

    fn is_bound_to(&self, source: &Rc<Scope>) -> bool {
        let state = self.state.borrow();
        state.is_bound && state.source.as_ref().is_some_and(|s| Rc::ptr_eq(s, source))
    }

    fn subscriber(&self) -> Weak<dyn Subscriber> {
        self.me.clone()
    }

    pub fn bind(&self, source: &Rc<Scope>) -> Result<()> {
        if self.is_bound() {
            if self.is_bound_to(source) {
                return Ok(());
            }
            self.unbind();
        }
        {
            let mut state = self.state.borrow_mut();
            state.is_bound = true;
            state.source = Some(Rc::clone(source));
        }

        if let Err(err) = self.bind_and_render(source) {
            self.unbind();
            return Err(err);
        }
        debug!(expression = ?self.expression, mode = ?self.mode.get(), "slot bound");
        Ok(())
    }

    fn bind_and_render(&self, source: &Rc<Scope>) -> Result<()> {
        self.expression.bind(self, source, &self.lookup)?;
        self.evaluate_and_render(source)?;

        // The bind hook may have switched the mode.
        if self.mode.get() == UpdateMode::ToView {
            if let Some(me) = self.me.upgrade() {
                self.services.scheduler.enqueue(me)?;
            }
        }
        Ok(())
    }

    pub fn unbind(&self) {
        let source = {
            let mut state = self.state.borrow_mut();
            if !state.is_bound {
                return;
            }
            state.is_bound = false;
            state.source.take()
        };
        if let Some(source) = &source {
            self.expression.unbind(self, source, &self.lookup);
        }
        {
            let mut state = self.state.borrow_mut();
            state.value = None;
            state.raw_value = RawValue::Undefined;
        }
        self.unobserve(true);
        debug!(expression = ?self.expression, "slot unbound");
    }

    /// Re-evaluate after a dependency change and refresh subscriptions
    pub fn call(&self) -> Result<()> {
        let Some(source) = self.source() else {
            return Ok(());
        };
        let raw = self.evaluate_and_render(&source)?;

        if self.mode.get() == UpdateMode::OneTime || !self.is_bound() {
            return Ok(());
        }
        {
            let mut state = self.state.borrow_mut();
            state.version = state.version.wrapping_add(1);
        }
        self.expression.connect(self, &source)?;
        if let RawValue::Sequence(sequence) = &raw {
            self.observe_collection(sequence)?;
        }
        self.unobserve(false);
        Ok(())
    }

    fn evaluate_and_render(&self, source: &Scope) -> Result<RawValue> {
        let raw = self.expression.evaluate(source, &self.lookup)?;
        self.state.borrow_mut().raw_value = raw.clone();
        self.update_target(&raw);
        Ok(raw)
    }

    /// Cache the stringified value and propagate it if it changed
    pub fn update_target(&self, raw: &RawValue) {
        let value = raw.to_display_string();
        {
            let mut state = self.state.borrow_mut();
            if state.value.as_deref() == Some(value.as_str()) {
                return;
            }
            state.value = Some(value.clone());
        }

        match &self.owner {
            SlotOwner::Composite(parent) => {
                if let Some(parent) = parent.upgrade() {
                    parent.interpolate();
                }
            }
            SlotOwner::Standalone {
                target,
                property,
                accessor,
                left,
                right,
            } => {
                trace!(node = target.node_name(), property = %property, "sole-slot write");
                accessor.set_value(format!("{}{}{}", left, value, right));
            }
        }
    }

    fn observe(&self, observer: Rc<dyn Observer>) {
        {
            let mut state = self.state.borrow_mut();
            let version = state.version;
            if let Some(entry) = state
                .observed
                .iter_mut()
                .find(|entry| same_observer(&entry.observer, &observer))
            {
                entry.version = version;
                return;
            }
            state.observed.push(ObservedEntry {
                observer: Rc::clone(&observer),
                version,
            });
        }
        observer.subscribe(self.subscriber());
    }
}

impl Connectable for ExpressionSlot {
    fn observe_property(&self, record: &Rc<dyn Record>, property: &str) {
        if let Some(observer) = self.services.locator.property_observer(record, property) {
            self.observe(observer);
        }
    }

    fn observe_collection(&self, sequence: &Rc<dyn Sequence>) -> Result<()> {
        match self.services.locator.collection_observer(sequence)? {
            Some(observer) => self.observe(observer),
            None => trace!(?sequence, "collection not observable, tracking reassignment only"),
        }
        Ok(())
    }

    fn unobserve(&self, all: bool) {
        let stale: Vec<ObservedEntry> = {
            let mut state = self.state.borrow_mut();
            let version = state.version;
            let (keep, stale): (Vec<_>, Vec<_>) = std::mem::take(&mut state.observed)
                .into_iter()
                .partition(|entry| !all && entry.version == version);
            state.observed = keep;
            stale
        };
        if stale.is_empty() {
            return;
        }
        let me = self.subscriber();
        for entry in stale {
            entry.observer.unsubscribe(&me);
        }
    }

    fn mode(&self) -> UpdateMode {
        self.mode.get()
    }

    fn set_mode(&self, mode: UpdateMode) {
        self.mode.set(mode);
    }

    fn reset_mode(&self) {
        self.mode.set(self.original_mode);
    }
}

impl Connect for ExpressionSlot {
    fn connect(&self, force_evaluate: bool) -> Result<()> {
        let Some(source) = self.source() else {
            return Ok(());
        };
        if force_evaluate {
            self.evaluate_and_render(&source)?;
        }
        self.expression.connect(self, &source)?;
        let raw = self.raw_value();
        if let RawValue::Sequence(sequence) = &raw {
            self.observe_collection(sequence)?;
        }
        trace!(observed = self.observed_count(), "slot connected");
        Ok(())
    }
}

impl Subscriber for ExpressionSlot {
    fn handle_change(&self) -> Result<()> {
        self.call()
    }
}

impl fmt::Debug for ExpressionSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("ExpressionSlot")
            .field("expression", &self.expression)
            .field("mode", &self.mode.get())
            .field("is_bound", &state.is_bound)
            .field("value", &state.value)
            .field("version", &state.version)
            .field("observed", &state.observed.len())
            .finish()
    }
}
