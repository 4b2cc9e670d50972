//! In-memory host: observable data, elements, and expressions
//!
//! Enough of a rendering host to drive bindings outside a browser, used by
//! the CLI, the benches and the tests.

mod element;
mod expression;
mod observable;

pub use element::{Element, MemoryLocator, PropertyAccessor};
pub use expression::{
    AccessScope, BindingBehaviorExpression, LiteralExpression, ValueConverterExpression,
};
pub use observable::{observable_from_json, ChangeNotifier, ObservableList, ObservableObject};

pub(crate) use expression::is_identifier;
