//! Binding scope and lookup context
//!
//! A [`Scope`] is the read-only context every slot of one binding evaluates
//! against. Identity matters: binding twice to the same `Rc<Scope>` is a
//! no-op, binding to a different one rebinds.

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::binding::{Connectable, UpdateMode};
use crate::error::{BindingError, Result};
use crate::value::{RawValue, Record};

/// Evaluation context: a binding context plus an optional parent scope
#[derive(Debug, Clone)]
pub struct Scope {
    binding_context: Rc<dyn Record>,
    parent: Option<Rc<Scope>>,
}

impl Scope {
    pub fn new(binding_context: Rc<dyn Record>) -> Rc<Self> {
        Rc::new(Self {
            binding_context,
            parent: None,
        })
    }

    /// Child scope that falls back to `parent` for unknown identifiers
    pub fn child(binding_context: Rc<dyn Record>, parent: Rc<Scope>) -> Rc<Self> {
        Rc::new(Self {
            binding_context,
            parent: Some(parent),
        })
    }

    pub fn binding_context(&self) -> &Rc<dyn Record> {
        &self.binding_context
    }

    pub fn parent(&self) -> Option<&Rc<Scope>> {
        self.parent.as_ref()
    }

    /// Record that owns `name`: the nearest context declaring it, else the
    /// innermost one (so a later assignment there is still observed).
    pub fn owner_of(&self, name: &str) -> &Rc<dyn Record> {
        let mut current = Some(self);
        while let Some(scope) = current {
            if scope.binding_context.has(name) {
                return &scope.binding_context;
            }
            current = scope.parent.as_deref();
        }
        &self.binding_context
    }

    /// Resolve an identifier (undefined when no context declares it)
    pub fn lookup(&self, name: &str) -> RawValue {
        self.owner_of(name).get(name).unwrap_or_default()
    }
}

/// Transforms a value on its way to the view (`expr | name`)
pub trait ValueConverter {
    fn to_view(&self, value: RawValue) -> Result<RawValue>;
}

/// Adjusts a binding when it binds (`expr & name`)
pub trait BindingBehavior {
    fn bind(&self, binding: &dyn Connectable, scope: &Scope) -> Result<()>;

    fn unbind(&self, _binding: &dyn Connectable, _scope: &Scope) {}
}

/// Named converters and behaviors available to expressions
#[derive(Clone, Default)]
pub struct LookupContext {
    converters: FxHashMap<String, Rc<dyn ValueConverter>>,
    behaviors: FxHashMap<String, Rc<dyn BindingBehavior>>,
}

impl LookupContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context with the stock `oneTime` behavior and `upper`/`lower` converters
    pub fn with_builtins() -> Self {
        let mut lookup = Self::new();
        lookup.register_behavior("oneTime", Rc::new(OneTimeBehavior));
        lookup.register_converter("upper", Rc::new(CaseConverter::Upper));
        lookup.register_converter("lower", Rc::new(CaseConverter::Lower));
        lookup
    }

    pub fn register_converter(&mut self, name: impl Into<String>, converter: Rc<dyn ValueConverter>) {
        self.converters.insert(name.into(), converter);
    }

    pub fn register_behavior(&mut self, name: impl Into<String>, behavior: Rc<dyn BindingBehavior>) {
        self.behaviors.insert(name.into(), behavior);
    }

    pub fn converter(&self, name: &str) -> Result<&Rc<dyn ValueConverter>> {
        self.converters
            .get(name)
            .ok_or_else(|| BindingError::UnknownConverter { name: name.to_string() })
    }

    pub fn behavior(&self, name: &str) -> Result<&Rc<dyn BindingBehavior>> {
        self.behaviors
            .get(name)
            .ok_or_else(|| BindingError::UnknownBehavior { name: name.to_string() })
    }
}

impl fmt::Debug for LookupContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut converters: Vec<_> = self.converters.keys().collect();
        let mut behaviors: Vec<_> = self.behaviors.keys().collect();
        converters.sort();
        behaviors.sort();
        f.debug_struct("LookupContext")
            .field("converters", &converters)
            .field("behaviors", &behaviors)
            .finish()
    }
}

/// Forces a binding to evaluate once, restoring its mode on unbind
#[derive(Debug, Clone, Copy)]
pub struct OneTimeBehavior;

impl BindingBehavior for OneTimeBehavior {
    fn bind(&self, binding: &dyn Connectable, _scope: &Scope) -> Result<()> {
        binding.set_mode(UpdateMode::OneTime);
        Ok(())
    }

    fn unbind(&self, binding: &dyn Connectable, _scope: &Scope) {
        binding.reset_mode();
    }
}

#[derive(Debug, Clone, Copy)]
enum CaseConverter {
    Upper,
    Lower,
}

impl ValueConverter for CaseConverter {
    fn to_view(&self, value: RawValue) -> Result<RawValue> {
        if value.is_nullish() {
            return Ok(value);
        }
        let text = value.to_display_string();
        Ok(RawValue::Text(match self {
            CaseConverter::Upper => text.to_uppercase(),
            CaseConverter::Lower => text.to_lowercase(),
        }))
    }
}
