//! Expressions and the interpolation parts array

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::{BindingError, Result};
use crate::scope::{LookupContext, Scope};
use crate::value::RawValue;

use super::Connectable;

/// Update discipline of a binding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateMode {
    /// Render the initial value only
    OneTime,
    /// Re-render on every dependency change
    #[default]
    ToView,
}

/// Evaluable expression embedded in a template
pub trait Expression: fmt::Debug {
    fn evaluate(&self, scope: &Scope, lookup: &LookupContext) -> Result<RawValue>;

    /// Register every dependency this expression reads on `binding`
    fn connect(&self, binding: &dyn Connectable, scope: &Scope) -> Result<()>;

    fn bind(&self, _binding: &dyn Connectable, _scope: &Scope, _lookup: &LookupContext) -> Result<()> {
        Ok(())
    }

    fn unbind(&self, _binding: &dyn Connectable, _scope: &Scope, _lookup: &LookupContext) {}
}

/// One entry of a parts array
#[derive(Debug, Clone)]
pub enum Part {
    Literal(String),
    Expression(Rc<dyn Expression>),
}

impl Part {
    pub fn literal(text: impl Into<String>) -> Self {
        Part::Literal(text.into())
    }

    pub fn expression(expr: impl Expression + 'static) -> Self {
        Part::Expression(Rc::new(expr))
    }
}

/// Validated `[literal, expr, literal, …, literal]` sequence.
///
/// Literals live at even indices, expressions at odd ones, and there is at
/// least one expression.
#[derive(Debug, Clone)]
pub struct InterpolationParts {
    parts: Rc<[Part]>,
}

impl InterpolationParts {
    pub fn new(parts: Vec<Part>) -> Result<Self> {
        if parts.len() < 3 || parts.len() % 2 == 0 {
            return Err(BindingError::InvalidParts {
                reason: format!("expected an odd length of at least 3, got {}", parts.len()),
            });
        }
        for (i, part) in parts.iter().enumerate() {
            match (i % 2 == 0, part) {
                (true, Part::Literal(_)) | (false, Part::Expression(_)) => {}
                (true, Part::Expression(_)) => {
                    return Err(BindingError::InvalidParts {
                        reason: format!("index {} must be a literal", i),
                    });
                }
                (false, Part::Literal(_)) => {
                    return Err(BindingError::InvalidParts {
                        reason: format!("index {} must be an expression", i),
                    });
                }
            }
        }
        Ok(Self { parts: parts.into() })
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Number of embedded expressions
    pub fn expression_count(&self) -> usize {
        self.parts.len() / 2
    }

    pub fn iter(&self) -> impl Iterator<Item = &Part> {
        self.parts.iter()
    }

    /// Literal at an even index
    pub fn literal(&self, index: usize) -> &str {
        match &self.parts[index] {
            Part::Literal(text) => text,
            Part::Expression(_) => unreachable!("parts validated: index {} is a literal", index),
        }
    }

    /// Expression by ordinal (part index `2 * ordinal + 1`)
    pub fn expression(&self, ordinal: usize) -> &Rc<dyn Expression> {
        match &self.parts[2 * ordinal + 1] {
            Part::Expression(expr) => expr,
            Part::Literal(_) => unreachable!("parts validated: ordinal {} is an expression", ordinal),
        }
    }
}
