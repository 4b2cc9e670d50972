//! Interbind - reactive interpolation bindings for template attributes

pub mod binding;
pub mod config;
pub mod error;
pub mod host;
pub mod schedule;
pub mod scope;
pub mod template;
pub mod value;

pub use binding::{BindingInstance, BindingServices, InterpolationBindingExpression, UpdateMode};
pub use config::BindingConfig;
pub use error::{BindingError, FixSuggestion};
pub use schedule::{ConnectQueue, ConnectScheduler, ImmediateScheduler};
pub use scope::{LookupContext, Scope};
pub use template::{parse_template, TemplateParser};
pub use value::RawValue;
