//! Host expressions
//!
//! - `AccessScope`: dotted member path (`user.name`, `items.length`)
//! - `LiteralExpression`: constant (`'text'`, `42`)
//! - `ValueConverterExpression`: `expr | name`
//! - `BindingBehaviorExpression`: `expr & name`

use std::fmt;
use std::rc::Rc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::binding::{Connectable, Expression};
use crate::error::{BindingError, Result};
use crate::scope::{LookupContext, Scope};
use crate::value::RawValue;

/// Member path resolved against the scope chain
#[derive(Clone, PartialEq, Eq)]
pub struct AccessScope {
    segments: Vec<String>,
}

impl AccessScope {
    /// Parse `name(.name)*`; each segment is an identifier
    pub fn parse(path: &str) -> Result<Self> {
        let segments: Vec<String> = path.split('.').map(|s| s.trim().to_string()).collect();
        for segment in &segments {
            if !is_identifier(segment) {
                return Err(BindingError::Evaluation {
                    expression: path.to_string(),
                    reason: format!("'{}' is not a valid identifier", segment),
                });
            }
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Walk the path, stopping at the first non-record value
    fn walk(&self, scope: &Scope, mut visit: impl FnMut(&RawValue, &str)) -> RawValue {
        let Some((head, rest)) = self.segments.split_first() else {
            return RawValue::Undefined;
        };
        let mut current = scope.lookup(head);
        for segment in rest {
            visit(&current, segment);
            current = member(&current, segment);
        }
        current
    }
}

fn member(value: &RawValue, name: &str) -> RawValue {
    match value {
        RawValue::Record(record) => record.get(name).unwrap_or_default(),
        RawValue::Sequence(seq) if name == "length" => RawValue::Number(seq.items().len() as f64),
        RawValue::Text(text) if name == "length" => RawValue::Number(text.chars().count() as f64),
        _ => RawValue::Undefined,
    }
}

/// Identifier pattern for members, converters and behaviors
static IDENTIFIER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("valid identifier pattern"));

pub(crate) fn is_identifier(name: &str) -> bool {
    IDENTIFIER_PATTERN.is_match(name)
}

impl Expression for AccessScope {
    fn evaluate(&self, scope: &Scope, _lookup: &LookupContext) -> Result<RawValue> {
        Ok(self.walk(scope, |_, _| {}))
    }

    fn connect(&self, binding: &dyn Connectable, scope: &Scope) -> Result<()> {
        if let Some(head) = self.segments.first() {
            binding.observe_property(scope.owner_of(head), head);
        }
        let mut outcome = Ok(());
        self.walk(scope, |current, segment| match current {
            RawValue::Record(record) => binding.observe_property(record, segment),
            RawValue::Sequence(sequence) if segment == "length" && outcome.is_ok() => {
                outcome = binding.observe_collection(sequence);
            }
            _ => {}
        });
        outcome
    }
}

impl fmt::Debug for AccessScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

/// Constant value; never has dependencies
#[derive(Debug, Clone)]
pub struct LiteralExpression(pub RawValue);

impl Expression for LiteralExpression {
    fn evaluate(&self, _scope: &Scope, _lookup: &LookupContext) -> Result<RawValue> {
        Ok(self.0.clone())
    }

    fn connect(&self, _binding: &dyn Connectable, _scope: &Scope) -> Result<()> {
        Ok(())
    }
}

/// `inner | name`: runs the named converter on the way to the view
pub struct ValueConverterExpression {
    inner: Rc<dyn Expression>,
    name: String,
}

impl ValueConverterExpression {
    pub fn new(inner: Rc<dyn Expression>, name: impl Into<String>) -> Self {
        Self {
            inner,
            name: name.into(),
        }
    }
}

impl Expression for ValueConverterExpression {
    fn evaluate(&self, scope: &Scope, lookup: &LookupContext) -> Result<RawValue> {
        let value = self.inner.evaluate(scope, lookup)?;
        lookup.converter(&self.name)?.to_view(value)
    }

    fn connect(&self, binding: &dyn Connectable, scope: &Scope) -> Result<()> {
        self.inner.connect(binding, scope)
    }

    fn bind(&self, binding: &dyn Connectable, scope: &Scope, lookup: &LookupContext) -> Result<()> {
        lookup.converter(&self.name)?;
        self.inner.bind(binding, scope, lookup)
    }

    fn unbind(&self, binding: &dyn Connectable, scope: &Scope, lookup: &LookupContext) {
        self.inner.unbind(binding, scope, lookup);
    }
}

impl fmt::Debug for ValueConverterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} | {}", self.inner, self.name)
    }
}

/// `inner & name`: lets the named behavior adjust the binding on bind
pub struct BindingBehaviorExpression {
    inner: Rc<dyn Expression>,
    name: String,
}

impl BindingBehaviorExpression {
    pub fn new(inner: Rc<dyn Expression>, name: impl Into<String>) -> Self {
        Self {
            inner,
            name: name.into(),
        }
    }
}

impl Expression for BindingBehaviorExpression {
    fn evaluate(&self, scope: &Scope, lookup: &LookupContext) -> Result<RawValue> {
        self.inner.evaluate(scope, lookup)
    }

    fn connect(&self, binding: &dyn Connectable, scope: &Scope) -> Result<()> {
        self.inner.connect(binding, scope)
    }

    fn bind(&self, binding: &dyn Connectable, scope: &Scope, lookup: &LookupContext) -> Result<()> {
        lookup.behavior(&self.name)?.bind(binding, scope)?;
        self.inner.bind(binding, scope, lookup)
    }

    fn unbind(&self, binding: &dyn Connectable, scope: &Scope, lookup: &LookupContext) {
        match lookup.behavior(&self.name) {
            Ok(behavior) => behavior.unbind(binding, scope),
            Err(err) => warn!(behavior = %self.name, error = %err, "behavior vanished before unbind"),
        }
        self.inner.unbind(binding, scope, lookup);
    }
}

impl fmt::Debug for BindingBehaviorExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} & {}", self.inner, self.name)
    }
}
