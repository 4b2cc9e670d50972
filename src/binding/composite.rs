//! Composite interpolation: several slots, one target write
//!
//! Owns one [`ExpressionSlot`] per embedded expression while bound, stored by
//! expression ordinal (part index `2k + 1` is slot `k`). Any slot change
//! triggers [`CompositeInterpolation::interpolate`], which rebuilds the whole
//! string and writes it once.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::error::Result;
use crate::scope::{LookupContext, Scope};

use super::slot::{ExpressionSlot, SlotOwner};
use super::{
    BindingServices, Connectable, InterpolationParts, Part, Target, TargetAccessor, UpdateMode,
};

#[derive(Default)]
struct CompositeState {
    is_bound: bool,
    source: Option<Rc<Scope>>,
    slots: Vec<Rc<ExpressionSlot>>,
}

pub struct CompositeInterpolation {
    me: Weak<CompositeInterpolation>,
    parts: InterpolationParts,
    target: Rc<dyn Target>,
    target_property: String,
    accessor: Rc<dyn TargetAccessor>,
    mode: UpdateMode,
    lookup: Rc<LookupContext>,
    services: BindingServices,
    state: RefCell<CompositeState>,
}

impl CompositeInterpolation {
    pub(crate) fn new(
        parts: InterpolationParts,
        target: Rc<dyn Target>,
        target_property: String,
        accessor: Rc<dyn TargetAccessor>,
        mode: UpdateMode,
        lookup: Rc<LookupContext>,
        services: BindingServices,
    ) -> Rc<Self> {
        Rc::new_cyclic(|me| Self {
            me: me.clone(),
            parts,
            target,
            target_property,
            accessor,
            mode,
            lookup,
            services,
            state: RefCell::new(CompositeState::default()),
        })
    }

    pub fn is_bound(&self) -> bool {
        self.state.borrow().is_bound
    }

    pub fn parts(&self) -> &InterpolationParts {
        &self.parts
    }

    /// Live slot for the expression at `part_index` (odd indices only)
    pub fn slot(&self, part_index: usize) -> Option<Rc<ExpressionSlot>> {
        if part_index % 2 == 0 {
            return None;
        }
        self.state.borrow().slots.get(part_index / 2).cloned()
    }

    /// Live slots in parts order (empty while unbound)
    pub fn slots(&self) -> Vec<Rc<ExpressionSlot>> {
        self.state.borrow().slots.clone()
    }

    pub fn bind(&self, source: &Rc<Scope>) -> Result<()> {
        if self.is_bound() {
            let same = self
                .state
                .borrow()
                .source
                .as_ref()
                .is_some_and(|s| Rc::ptr_eq(s, source));
            if same {
                return Ok(());
            }
            self.unbind();
        }

        let count = self.parts.expression_count();
        let mut slots: Vec<Rc<ExpressionSlot>> = Vec::with_capacity(count);
        for ordinal in 0..count {
            let slot = ExpressionSlot::new(
                SlotOwner::Composite(self.me.clone()),
                Rc::clone(self.parts.expression(ordinal)),
                self.mode,
                Rc::clone(&self.lookup),
                self.services.clone(),
            );
            if let Err(err) = slot.bind(source) {
                for bound in &slots {
                    bound.unbind();
                }
                return Err(err);
            }
            slots.push(slot);
        }

        {
            let mut state = self.state.borrow_mut();
            state.source = Some(Rc::clone(source));
            state.slots = slots;
            state.is_bound = true;
        }
        debug!(
            node = self.target.node_name(),
            property = %self.target_property,
            slots = count,
            "interpolation bound"
        );
        self.interpolate();
        Ok(())
    }

    pub fn unbind(&self) {
        let slots = {
            let mut state = self.state.borrow_mut();
            if !state.is_bound {
                return;
            }
            state.is_bound = false;
            state.source = None;
            std::mem::take(&mut state.slots)
        };
        for slot in &slots {
            slot.unbind();
        }
        debug!(property = %self.target_property, "interpolation unbound");
    }

    /// Concatenate literals and slot values, then write once
    pub fn interpolate(&self) {
        let value = {
            let state = self.state.borrow();
            if !state.is_bound {
                return;
            }
            let mut value = String::new();
            for (i, part) in self.parts.iter().enumerate() {
                match part {
                    Part::Literal(text) => value.push_str(text),
                    Part::Expression(_) => state.slots[i / 2].push_value(&mut value),
                }
            }
            value
        };
        trace!(property = %self.target_property, value = %value, "interpolation write");
        self.accessor.set_value(value);
    }

    /// Re-evaluate every slot whose mode is one-time
    pub fn update_one_time_bindings(&self) -> Result<()> {
        for slot in self.slots() {
            if slot.mode() == UpdateMode::OneTime {
                slot.call()?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for CompositeInterpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("CompositeInterpolation")
            .field("target", &self.target)
            .field("target_property", &self.target_property)
            .field("mode", &self.mode)
            .field("parts", &self.parts.len())
            .field("is_bound", &state.is_bound)
            .field("slots", &state.slots.len())
            .finish()
    }
}
