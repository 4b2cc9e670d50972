//! Collaborator capabilities consumed by bindings
//!
//! The engine never observes values or touches targets directly; it goes
//! through these traits. [`crate::host`] provides in-memory implementations.

use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::{BindingError, Result};
use crate::value::{Record, Sequence};

use super::UpdateMode;

/// Rendering target (element or text node) a binding writes into
pub trait Target: fmt::Debug {
    fn node_name(&self) -> &str;

    /// Node name of the parent element, if attached
    fn parent_node_name(&self) -> Option<String>;

    fn property(&self, name: &str) -> Option<String>;

    fn set_property(&self, name: &str, value: String);
}

/// Read/write capability bound to one property of one target
pub trait TargetAccessor {
    fn get_value(&self) -> Option<String>;

    fn set_value(&self, value: String);
}

/// Receives change notifications from an [`Observer`]
pub trait Subscriber {
    fn handle_change(&self) -> Result<()>;
}

/// Change source for one dependency (a property, a collection)
pub trait Observer {
    fn subscribe(&self, subscriber: Weak<dyn Subscriber>);

    fn unsubscribe(&self, subscriber: &Weak<dyn Subscriber>);
}

/// Resolves accessors and observers for bindings
pub trait ObserverLocator {
    fn accessor(&self, target: &Rc<dyn Target>, property: &str) -> Rc<dyn TargetAccessor>;

    /// Observer for `record[property]`; `None` when the record is not observable
    fn property_observer(&self, record: &Rc<dyn Record>, property: &str) -> Option<Rc<dyn Observer>>;

    /// Observer for in-place mutations of `sequence`.
    ///
    /// `Ok(None)` means this shape is not observable and the binding falls
    /// back to reassignment tracking. The default signals missing wiring.
    fn collection_observer(&self, _sequence: &Rc<dyn Sequence>) -> Result<Option<Rc<dyn Observer>>> {
        Err(BindingError::Unsupported {
            operation: "collection_observer",
        })
    }
}

/// Dependency-tracking capability of a binding.
///
/// Expressions call back into it while connecting so the binding can
/// subscribe to everything read during the last evaluation.
pub trait Connectable {
    fn observe_property(&self, record: &Rc<dyn Record>, property: &str);

    fn observe_collection(&self, sequence: &Rc<dyn Sequence>) -> Result<()>;

    /// Release observers from earlier generations, or all of them
    fn unobserve(&self, all: bool);

    fn mode(&self) -> UpdateMode;

    fn set_mode(&self, mode: UpdateMode);

    /// Restore the mode the binding was created with
    fn reset_mode(&self);
}

/// Entry point the connect scheduler drives
pub trait Connect {
    fn connect(&self, force_evaluate: bool) -> Result<()>;
}

/// Pointer identity for trait-object handles (metadata ignored)
pub(crate) fn same_observer(a: &Rc<dyn Observer>, b: &Rc<dyn Observer>) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}
