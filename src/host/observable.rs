//! Observable objects and lists
//!
//! Property writes and list mutations notify subscribed bindings
//! synchronously. Subscribers are held weakly and pruned lazily; the list is
//! snapshotted before notifying so handlers may (un)subscribe re-entrantly.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;

use crate::binding::{Observer, Subscriber};
use crate::error::{BindingError, Result};
use crate::value::{RawValue, Record, Sequence};

/// Subscriber list shared by property and mutation observers
#[derive(Default)]
pub struct ChangeNotifier {
    subscribers: RefCell<Vec<Weak<dyn Subscriber>>>,
}

impl ChangeNotifier {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .borrow()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Notify every live subscriber in registration order
    pub fn notify(&self) -> Result<()> {
        let snapshot: Vec<Weak<dyn Subscriber>> = {
            let mut subscribers = self.subscribers.borrow_mut();
            subscribers.retain(|w| w.strong_count() > 0);
            subscribers.clone()
        };
        for subscriber in snapshot.iter().filter_map(Weak::upgrade) {
            subscriber.handle_change()?;
        }
        Ok(())
    }
}

impl Observer for ChangeNotifier {
    fn subscribe(&self, subscriber: Weak<dyn Subscriber>) {
        let mut subscribers = self.subscribers.borrow_mut();
        if !subscribers.iter().any(|s| Weak::ptr_eq(s, &subscriber)) {
            subscribers.push(subscriber);
        }
    }

    fn unsubscribe(&self, subscriber: &Weak<dyn Subscriber>) {
        self.subscribers
            .borrow_mut()
            .retain(|s| !Weak::ptr_eq(s, subscriber));
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Record whose properties can be observed individually
#[derive(Default)]
pub struct ObservableObject {
    properties: RefCell<FxHashMap<String, RawValue>>,
    observers: RefCell<FxHashMap<String, Rc<ChangeNotifier>>>,
}

impl ObservableObject {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Build from JSON; nested objects and arrays become observable too
    pub fn from_json(value: serde_json::Map<String, serde_json::Value>) -> Rc<Self> {
        let object = Self::default();
        {
            let mut properties = object.properties.borrow_mut();
            for (key, value) in value {
                properties.insert(key, observable_from_json(value));
            }
        }
        Rc::new(object)
    }

    pub fn get(&self, key: &str) -> Option<RawValue> {
        self.properties.borrow().get(key).cloned()
    }

    /// Write a property, notifying observers when the value changed
    pub fn set(&self, key: &str, value: impl Into<RawValue>) -> Result<()> {
        let value = value.into();
        let changed = {
            let mut properties = self.properties.borrow_mut();
            let changed = properties.get(key) != Some(&value);
            if changed {
                properties.insert(key.to_string(), value);
            }
            changed
        };
        if !changed {
            return Ok(());
        }
        let observer = self.observers.borrow().get(key).cloned();
        match observer {
            Some(observer) => observer.notify(),
            None => Ok(()),
        }
    }

    /// Write through a dotted path (`user.name`)
    pub fn set_path(&self, path: &str, value: impl Into<RawValue>) -> Result<()> {
        let (parents, last) = match path.rsplit_once('.') {
            Some((parents, last)) => (Some(parents), last),
            None => (None, path),
        };
        let Some(parents) = parents else {
            return self.set(last, value);
        };

        let mut current = self.get(parents.split('.').next().unwrap_or_default());
        for segment in parents.split('.').skip(1) {
            current = current
                .as_ref()
                .and_then(RawValue::as_record)
                .and_then(|record| record.get(segment));
        }
        let owner = current.and_then(|value| match value {
            RawValue::Record(record) => Some(record),
            _ => None,
        });
        match owner.as_ref().and_then(|r| r.as_any().downcast_ref::<ObservableObject>()) {
            Some(object) => object.set(last, value),
            None => Err(BindingError::Evaluation {
                expression: path.to_string(),
                reason: format!("'{}' is not an observable object", parents),
            }),
        }
    }

    /// Observer for one property (created on first request)
    pub fn observer(&self, key: &str) -> Rc<ChangeNotifier> {
        Rc::clone(
            self.observers
                .borrow_mut()
                .entry(key.to_string())
                .or_insert_with(ChangeNotifier::new),
        )
    }

    /// Live subscribers of one property
    pub fn subscriber_count(&self, key: &str) -> usize {
        self.observers
            .borrow()
            .get(key)
            .map_or(0, |o| o.subscriber_count())
    }
}

impl Record for ObservableObject {
    fn get(&self, key: &str) -> Option<RawValue> {
        ObservableObject::get(self, key)
    }

    fn has(&self, key: &str) -> bool {
        self.properties.borrow().contains_key(key)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for ObservableObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self.properties.borrow().keys().cloned().collect();
        keys.sort();
        f.debug_struct("ObservableObject").field("keys", &keys).finish()
    }
}

/// Sequence that notifies on in-place mutation
#[derive(Default)]
pub struct ObservableList {
    items: RefCell<Vec<RawValue>>,
    mutations: Rc<ChangeNotifier>,
}

impl ObservableList {
    pub fn new(items: Vec<RawValue>) -> Rc<Self> {
        Rc::new(Self {
            items: RefCell::new(items),
            mutations: ChangeNotifier::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn notifier(&self) -> Rc<ChangeNotifier> {
        Rc::clone(&self.mutations)
    }

    pub fn push(&self, item: impl Into<RawValue>) -> Result<()> {
        self.items.borrow_mut().push(item.into());
        self.mutations.notify()
    }

    pub fn pop(&self) -> Result<Option<RawValue>> {
        let item = self.items.borrow_mut().pop();
        if item.is_some() {
            self.mutations.notify()?;
        }
        Ok(item)
    }

    /// Replace the item at `index`; out-of-range indices are ignored
    pub fn set(&self, index: usize, item: impl Into<RawValue>) -> Result<()> {
        let replaced = match self.items.borrow_mut().get_mut(index) {
            Some(slot) => {
                *slot = item.into();
                true
            }
            None => false,
        };
        if replaced {
            self.mutations.notify()?;
        }
        Ok(())
    }

    /// Remove `delete_count` items at `start` and insert `items` there
    pub fn splice(&self, start: usize, delete_count: usize, items: Vec<RawValue>) -> Result<Vec<RawValue>> {
        let inserted = !items.is_empty();
        let removed: Vec<RawValue> = {
            let mut current = self.items.borrow_mut();
            let start = start.min(current.len());
            let end = start.saturating_add(delete_count).min(current.len());
            current.splice(start..end, items).collect()
        };
        if inserted || !removed.is_empty() {
            self.mutations.notify()?;
        }
        Ok(removed)
    }

    pub fn clear(&self) -> Result<()> {
        let had_items = !self.is_empty();
        self.items.borrow_mut().clear();
        if had_items {
            self.mutations.notify()?;
        }
        Ok(())
    }
}

impl Sequence for ObservableList {
    fn items(&self) -> Vec<RawValue> {
        self.items.borrow().clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for ObservableList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableList")
            .field("len", &self.len())
            .field("subscribers", &self.mutations.subscriber_count())
            .finish()
    }
}

impl From<Rc<ObservableObject>> for RawValue {
    fn from(object: Rc<ObservableObject>) -> Self {
        RawValue::Record(object)
    }
}

impl From<Rc<ObservableList>> for RawValue {
    fn from(list: Rc<ObservableList>) -> Self {
        RawValue::Sequence(list)
    }
}

/// Convert JSON into observable values (objects and arrays included)
pub fn observable_from_json(value: serde_json::Value) -> RawValue {
    use serde_json::Value;
    match value {
        Value::Object(map) => ObservableObject::from_json(map).into(),
        Value::Array(items) => {
            ObservableList::new(items.into_iter().map(observable_from_json).collect()).into()
        }
        scalar => RawValue::from(scalar),
    }
}
