//! In-memory targets and the observer locator for host types

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::binding::{Observer, ObserverLocator, Target, TargetAccessor};
use crate::error::Result;
use crate::value::{Record, Sequence};

use super::observable::{ObservableList, ObservableObject};

/// Element or text node with a flat property map
pub struct Element {
    node_name: String,
    parent_node_name: Option<String>,
    properties: RefCell<FxHashMap<String, String>>,
    writes: Cell<usize>,
}

impl Element {
    pub fn new(node_name: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            node_name: node_name.into(),
            parent_node_name: None,
            properties: RefCell::new(FxHashMap::default()),
            writes: Cell::new(0),
        })
    }

    pub fn with_parent(node_name: impl Into<String>, parent: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            node_name: node_name.into(),
            parent_node_name: Some(parent.into()),
            properties: RefCell::new(FxHashMap::default()),
            writes: Cell::new(0),
        })
    }

    /// Number of property writes so far
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }
}

impl Target for Element {
    fn node_name(&self) -> &str {
        &self.node_name
    }

    fn parent_node_name(&self) -> Option<String> {
        self.parent_node_name.clone()
    }

    fn property(&self, name: &str) -> Option<String> {
        self.properties.borrow().get(name).cloned()
    }

    fn set_property(&self, name: &str, value: String) {
        self.writes.set(self.writes.get() + 1);
        self.properties.borrow_mut().insert(name.to_string(), value);
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("node_name", &self.node_name)
            .field("parent", &self.parent_node_name)
            .field("writes", &self.writes.get())
            .finish()
    }
}

/// Accessor writing one named property of a target
pub struct PropertyAccessor {
    target: Rc<dyn Target>,
    property: String,
}

impl PropertyAccessor {
    pub fn new(target: Rc<dyn Target>, property: impl Into<String>) -> Self {
        Self {
            target,
            property: property.into(),
        }
    }
}

impl TargetAccessor for PropertyAccessor {
    fn get_value(&self) -> Option<String> {
        self.target.property(&self.property)
    }

    fn set_value(&self, value: String) {
        trace!(node = self.target.node_name(), property = %self.property, value = %value, "set");
        self.target.set_property(&self.property, value);
    }
}

/// Observer locator for [`ObservableObject`] and [`ObservableList`].
///
/// Other record and sequence shapes are reported as unobservable.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryLocator;

impl ObserverLocator for MemoryLocator {
    fn accessor(&self, target: &Rc<dyn Target>, property: &str) -> Rc<dyn TargetAccessor> {
        Rc::new(PropertyAccessor::new(Rc::clone(target), property))
    }

    fn property_observer(&self, record: &Rc<dyn Record>, property: &str) -> Option<Rc<dyn Observer>> {
        let object = record.as_any().downcast_ref::<ObservableObject>()?;
        Some(object.observer(property))
    }

    fn collection_observer(&self, sequence: &Rc<dyn Sequence>) -> Result<Option<Rc<dyn Observer>>> {
        Ok(sequence
            .as_any()
            .downcast_ref::<ObservableList>()
            .map(|list| list.notifier() as Rc<dyn Observer>))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::RawValue;
    use serde_json::json;

    #[test]
    fn accessor_round_trips_and_counts_writes() {
        let el = Element::new("div");
        let target: Rc<dyn Target> = el.clone();
        let accessor = MemoryLocator.accessor(&target, "title");

        assert_eq!(accessor.get_value(), None);
        accessor.set_value("hello".into());
        assert_eq!(accessor.get_value().as_deref(), Some("hello"));
        assert_eq!(el.write_count(), 1);
    }

    #[test]
    fn plain_values_are_not_observable() {
        let RawValue::Record(record) = RawValue::from(json!({"a": 1})) else {
            panic!("expected record");
        };
        assert!(MemoryLocator.property_observer(&record, "a").is_none());

        let RawValue::Sequence(seq) = RawValue::from(json!([1])) else {
            panic!("expected sequence");
        };
        assert!(MemoryLocator.collection_observer(&seq).unwrap().is_none());
    }

    #[test]
    fn observable_values_resolve_observers() {
        let object = ObservableObject::new();
        let record: Rc<dyn Record> = object.clone();
        let first = MemoryLocator.property_observer(&record, "x").unwrap();
        let second = MemoryLocator.property_observer(&record, "x").unwrap();
        assert!(std::ptr::addr_eq(Rc::as_ptr(&first), Rc::as_ptr(&second)));

        let list = ObservableList::new(vec![]);
        let seq: Rc<dyn Sequence> = list;
        assert!(MemoryLocator.collection_observer(&seq).unwrap().is_some());
    }
}
