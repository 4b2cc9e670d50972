//! Binding factory
//!
//! [`InterpolationBindingExpression`] is the compiled instruction for one
//! interpolated attribute. `create_binding` validates the target, then builds
//! the sole-slot form for `[literal, expr, literal]` and a composite for
//! anything longer. Both render the same output.

use std::rc::Rc;

use crate::config::{ValidationPolicy, DEFAULT_POLICY};
use crate::error::Result;
use crate::schedule::ConnectScheduler;
use crate::scope::{LookupContext, Scope};

use super::composite::CompositeInterpolation;
use super::slot::{ExpressionSlot, SlotOwner};
use super::validate::validate_target;
use super::{Connectable, InterpolationParts, ObserverLocator, Target, UpdateMode};

/// Collaborators shared by every binding an expression creates
#[derive(Clone)]
pub struct BindingServices {
    pub locator: Rc<dyn ObserverLocator>,
    pub scheduler: Rc<dyn ConnectScheduler>,
    pub policy: Rc<ValidationPolicy>,
}

impl BindingServices {
    pub fn new(locator: Rc<dyn ObserverLocator>, scheduler: Rc<dyn ConnectScheduler>) -> Self {
        Self {
            locator,
            scheduler,
            policy: Rc::new(DEFAULT_POLICY.clone()),
        }
    }

    pub fn with_policy(mut self, policy: ValidationPolicy) -> Self {
        self.policy = Rc::new(policy);
        self
    }
}

/// Instruction for an interpolation binding on one target property
pub struct InterpolationBindingExpression {
    services: BindingServices,
    target_property: String,
    parts: InterpolationParts,
    mode: UpdateMode,
    lookup: Rc<LookupContext>,
    /// Attribute the instruction was compiled from
    pub attribute: String,
    /// Attribute the compiler strips from the element
    pub attr_to_remove: String,
    pub discrete: bool,
}

impl InterpolationBindingExpression {
    pub fn new(
        services: BindingServices,
        target_property: impl Into<String>,
        parts: InterpolationParts,
        mode: UpdateMode,
        lookup: Rc<LookupContext>,
        attribute: impl Into<String>,
    ) -> Self {
        let attribute = attribute.into();
        Self {
            services,
            target_property: target_property.into(),
            parts,
            mode,
            lookup,
            attr_to_remove: attribute.clone(),
            attribute,
            discrete: false,
        }
    }

    pub fn target_property(&self) -> &str {
        &self.target_property
    }

    pub fn parts(&self) -> &InterpolationParts {
        &self.parts
    }

    pub fn mode(&self) -> UpdateMode {
        self.mode
    }

    /// Create a binding for `target`; fails before constructing anything
    /// when the target property cannot hold interpolated content.
    pub fn create_binding(&self, target: Rc<dyn Target>) -> Result<BindingInstance> {
        validate_target(&self.services.policy, target.as_ref(), &self.target_property)?;
        let accessor = self.services.locator.accessor(&target, &self.target_property);

        if self.parts.len() == 3 {
            let owner = SlotOwner::Standalone {
                target,
                property: self.target_property.clone(),
                accessor,
                left: self.parts.literal(0).to_string(),
                right: self.parts.literal(2).to_string(),
            };
            return Ok(BindingInstance::Single(ExpressionSlot::new(
                owner,
                Rc::clone(self.parts.expression(0)),
                self.mode,
                Rc::clone(&self.lookup),
                self.services.clone(),
            )));
        }

        Ok(BindingInstance::Composite(CompositeInterpolation::new(
            self.parts.clone(),
            target,
            self.target_property.clone(),
            accessor,
            self.mode,
            Rc::clone(&self.lookup),
            self.services.clone(),
        )))
    }
}

impl std::fmt::Debug for InterpolationBindingExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterpolationBindingExpression")
            .field("target_property", &self.target_property)
            .field("parts", &self.parts.len())
            .field("mode", &self.mode)
            .field("attribute", &self.attribute)
            .finish()
    }
}

/// A bindable interpolation: sole-slot or composite
#[derive(Debug, Clone)]
pub enum BindingInstance {
    Single(Rc<ExpressionSlot>),
    Composite(Rc<CompositeInterpolation>),
}

impl BindingInstance {
    pub fn bind(&self, scope: &Rc<Scope>) -> Result<()> {
        match self {
            BindingInstance::Single(slot) => slot.bind(scope),
            BindingInstance::Composite(composite) => composite.bind(scope),
        }
    }

    pub fn unbind(&self) {
        match self {
            BindingInstance::Single(slot) => slot.unbind(),
            BindingInstance::Composite(composite) => composite.unbind(),
        }
    }

    pub fn is_bound(&self) -> bool {
        match self {
            BindingInstance::Single(slot) => slot.is_bound(),
            BindingInstance::Composite(composite) => composite.is_bound(),
        }
    }

    /// Resolve one-time expressions after the initial attach
    pub fn update_one_time_bindings(&self) -> Result<()> {
        match self {
            BindingInstance::Single(slot) if slot.mode() == UpdateMode::OneTime => slot.call(),
            BindingInstance::Single(_) => Ok(()),
            BindingInstance::Composite(composite) => composite.update_one_time_bindings(),
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, BindingInstance::Composite(_))
    }

    /// Total dependencies subscribed across all live slots
    pub fn observed_count(&self) -> usize {
        match self {
            BindingInstance::Single(slot) => slot.observed_count(),
            BindingInstance::Composite(composite) => {
                composite.slots().iter().map(|slot| slot.observed_count()).sum()
            }
        }
    }
}
