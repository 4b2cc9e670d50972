//! Binding Module - Interpolation bindings
//!
//! Keeps one target property in sync with a template such as
//! `"Hello ${user.name}, you have ${count} items"`:
//! - `expression`: parts array, `Expression` trait, update modes
//! - `observer`: collaborator traits (targets, accessors, observers)
//! - `slot`: one expression, its cached value and dependency subscriptions
//! - `composite`: several slots concatenated into a single write
//! - `factory`: picks the sole-slot or composite form, validates the target
//! - `validate`: target validation policy
//!
//! Data flow:
//! ```text
//! parts → InterpolationBindingExpression::create_binding(target)
//!                          ↓
//!            BindingInstance (Single | Composite)
//!                          ↓ bind(scope)
//!        each slot evaluates, renders, enqueues connect
//!                          ↓ dependency changes
//!        slot re-evaluates → composite interpolates → one set_value
//! ```

mod composite;
mod expression;
mod factory;
mod observer;
mod slot;
mod validate;

// Re-export public types
pub use composite::CompositeInterpolation;
pub use expression::{Expression, InterpolationParts, Part, UpdateMode};
pub use factory::{BindingInstance, BindingServices, InterpolationBindingExpression};
pub use observer::{
    Connect, Connectable, Observer, ObserverLocator, Subscriber, Target, TargetAccessor,
};
pub use slot::ExpressionSlot;
pub use validate::validate_target;
