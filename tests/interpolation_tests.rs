//! Integration tests for interpolation bindings
//!
//! Drive full bindings through the in-memory host: observable scope data,
//! elements, the template parser and both schedulers.

use std::rc::Rc;

use interbind::binding::{Observer, ObserverLocator, Target, TargetAccessor};
use interbind::config::QueueConfig;
use interbind::host::{Element, MemoryLocator, ObservableList, ObservableObject};
use interbind::template::parse_template;
use interbind::value::{Record, Sequence};
use interbind::{
    BindingError, BindingInstance, BindingServices, ConnectQueue, ImmediateScheduler,
    InterpolationBindingExpression, LookupContext, RawValue, Scope, UpdateMode,
};
use serde_json::json;

// ============================================================================
// Helpers
// ============================================================================

fn object(value: serde_json::Value) -> Rc<ObservableObject> {
    match value {
        serde_json::Value::Object(map) => ObservableObject::from_json(map),
        other => panic!("expected a JSON object, got {}", other),
    }
}

fn immediate_services() -> BindingServices {
    BindingServices::new(Rc::new(MemoryLocator), Rc::new(ImmediateScheduler))
}

fn instruction(services: BindingServices, template: &str) -> InterpolationBindingExpression {
    let parts = parse_template(template).unwrap().expect("template has interpolation");
    InterpolationBindingExpression::new(
        services,
        "textContent",
        parts,
        UpdateMode::ToView,
        Rc::new(LookupContext::with_builtins()),
        "textContent",
    )
}

fn bound(template: &str, root: &Rc<ObservableObject>) -> (BindingInstance, Rc<Element>) {
    let element = Element::new("#text");
    let binding = instruction(immediate_services(), template)
        .create_binding(element.clone())
        .unwrap();
    binding.bind(&Scope::new(root.clone())).unwrap();
    (binding, element)
}

fn text(element: &Element) -> String {
    element.property("textContent").unwrap_or_default()
}

// ============================================================================
// Rendering scenarios
// ============================================================================

#[test]
fn test_composite_initial_render() {
    let root = object(json!({"user": {"name": "Ada"}, "count": 3}));
    let (binding, element) = bound("Hello ${user.name}, you have ${count} items", &root);

    assert!(binding.is_composite());
    assert_eq!(text(&element), "Hello Ada, you have 3 items");
    assert_eq!(element.write_count(), 1);
}

#[test]
fn test_dependency_change_writes_once() {
    let root = object(json!({"user": {"name": "Ada"}, "count": 3}));
    let (_binding, element) = bound("Hello ${user.name}, you have ${count} items", &root);

    root.set("count", 4).unwrap();

    assert_eq!(text(&element), "Hello Ada, you have 4 items");
    assert_eq!(element.write_count(), 2);
}

#[test]
fn test_nested_member_change() {
    let root = object(json!({"user": {"name": "Ada"}, "count": 3}));
    let (_binding, element) = bound("Hello ${user.name}, you have ${count} items", &root);

    root.set_path("user.name", "Grace").unwrap();
    assert_eq!(text(&element), "Hello Grace, you have 3 items");

    // Replacing the intermediate object moves the subscription to the new one
    let old_user = root.get("user").unwrap();
    root.set("user", object(json!({"name": "Linus"}))).unwrap();
    assert_eq!(text(&element), "Hello Linus, you have 3 items");

    let old_user = old_user.as_record().unwrap();
    let old_user = old_user.as_any().downcast_ref::<ObservableObject>().unwrap();
    assert_eq!(old_user.subscriber_count("name"), 0);
    old_user.set("name", "Stale").unwrap();
    assert_eq!(text(&element), "Hello Linus, you have 3 items");
}

#[test]
fn test_sole_slot_renders_literals() {
    let root = object(json!({"val": 5}));
    let (binding, element) = bound("x=${val}", &root);

    assert!(!binding.is_composite());
    assert_eq!(text(&element), "x=5");

    root.set("val", RawValue::Null).unwrap();
    assert_eq!(text(&element), "x=");
}

#[test]
fn test_missing_and_null_render_empty() {
    let root = object(json!({"nothing": null}));
    let (_binding, element) = bound("[${nothing}|${missing}|${user.name}]", &root);
    assert_eq!(text(&element), "[||]");
}

#[test]
fn test_no_redundant_write_for_equal_text() {
    let root = object(json!({"count": 3}));
    let (_binding, element) = bound("n=${count}", &root);
    assert_eq!(element.write_count(), 1);

    // Different raw value, same rendered text
    root.set("count", "3").unwrap();
    assert_eq!(element.write_count(), 1);

    root.set("count", 7).unwrap();
    assert_eq!(element.write_count(), 2);
}

#[test]
fn test_converters_apply_on_updates() {
    let root = object(json!({"name": "ada"}));
    let (_binding, element) = bound("${name | upper}!", &root);
    assert_eq!(text(&element), "ADA!");

    root.set("name", "grace").unwrap();
    assert_eq!(text(&element), "GRACE!");
}

// ============================================================================
// One-time slots
// ============================================================================

#[test]
fn test_one_time_slot_waits_for_explicit_update() {
    let root = object(json!({"name": "Ada", "count": 3}));
    let (binding, element) = bound("${name & oneTime} has ${count}", &root);
    assert_eq!(text(&element), "Ada has 3");
    assert_eq!(root.subscriber_count("name"), 0);

    root.set("name", "Grace").unwrap();
    assert_eq!(text(&element), "Ada has 3");

    root.set("count", 4).unwrap();
    assert_eq!(text(&element), "Ada has 4");

    binding.update_one_time_bindings().unwrap();
    assert_eq!(text(&element), "Grace has 4");
}

#[test]
fn test_one_time_sole_slot() {
    let root = object(json!({"name": "Ada"}));
    let (binding, element) = bound("${name & oneTime}", &root);

    root.set("name", "Grace").unwrap();
    assert_eq!(text(&element), "Ada");
    assert_eq!(binding.observed_count(), 0);

    binding.update_one_time_bindings().unwrap();
    assert_eq!(text(&element), "Grace");
}

#[test]
fn test_one_time_instruction_never_subscribes() {
    let (services, queue) = queued_services(0);
    let root = object(json!({"first": "Ada", "last": "Lovelace"}));
    let parts = parse_template("${first} ${last}").unwrap().unwrap();
    let instruction = InterpolationBindingExpression::new(
        services,
        "textContent",
        parts,
        UpdateMode::OneTime,
        Rc::new(LookupContext::with_builtins()),
        "textContent",
    );
    let element = Element::new("#text");
    let binding = instruction.create_binding(element.clone()).unwrap();
    binding.bind(&Scope::new(root.clone())).unwrap();

    assert_eq!(text(&element), "Ada Lovelace");
    assert_eq!(queue.pending(), 0);
    assert_eq!(binding.observed_count(), 0);
    assert_eq!(root.subscriber_count("first"), 0);

    root.set("first", "Augusta").unwrap();
    assert_eq!(text(&element), "Ada Lovelace");
    assert_eq!(element.write_count(), 1);

    binding.update_one_time_bindings().unwrap();
    assert_eq!(text(&element), "Augusta Lovelace");
    assert_eq!(binding.observed_count(), 0);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_bind_same_scope_is_noop() {
    let root = object(json!({"a": 1, "b": 2}));
    let element = Element::new("#text");
    let binding = instruction(immediate_services(), "${a}-${b}")
        .create_binding(element.clone())
        .unwrap();
    let scope = Scope::new(root.clone());

    binding.bind(&scope).unwrap();
    let observed = binding.observed_count();
    let writes = element.write_count();

    binding.bind(&scope).unwrap();
    assert_eq!(binding.observed_count(), observed);
    assert_eq!(element.write_count(), writes);
    assert_eq!(root.subscriber_count("a"), 1);
}

#[test]
fn test_unbind_releases_subscriptions() {
    let root = object(json!({"a": 1, "b": 2}));
    let (binding, element) = bound("${a}-${b}", &root);
    assert_eq!(root.subscriber_count("a"), 1);

    binding.unbind();
    assert!(!binding.is_bound());
    assert_eq!(binding.observed_count(), 0);
    assert_eq!(root.subscriber_count("a"), 0);
    assert_eq!(root.subscriber_count("b"), 0);

    root.set("a", 10).unwrap();
    assert_eq!(text(&element), "1-2");

    // Unbinding twice is harmless
    binding.unbind();
}

#[test]
fn test_bind_unbind_round_trip() {
    let root = object(json!({"a": 1, "b": 2}));
    let (binding, element) = bound("${a}-${b}", &root);

    binding.unbind();
    root.set("a", 5).unwrap();
    binding.bind(&Scope::new(root.clone())).unwrap();

    assert_eq!(text(&element), "5-2");
    assert_eq!(root.subscriber_count("a"), 1);
    root.set("b", 6).unwrap();
    assert_eq!(text(&element), "5-6");
}

#[test]
fn test_rebind_to_different_scope() {
    let first = object(json!({"name": "Ada"}));
    let second = object(json!({"name": "Grace"}));
    let (binding, element) = bound("Hi ${name}!", &first);
    assert_eq!(text(&element), "Hi Ada!");

    binding.bind(&Scope::new(second.clone())).unwrap();
    assert_eq!(text(&element), "Hi Grace!");
    assert_eq!(first.subscriber_count("name"), 0);
    assert_eq!(second.subscriber_count("name"), 1);

    first.set("name", "Stale").unwrap();
    assert_eq!(text(&element), "Hi Grace!");
}

#[test]
fn test_child_scope_reads_parent() {
    let parent = object(json!({"title": "Dr"}));
    let child = object(json!({"name": "Ada"}));
    let element = Element::new("#text");
    let binding = instruction(immediate_services(), "${title} ${name}")
        .create_binding(element.clone())
        .unwrap();
    binding
        .bind(&Scope::child(child.clone(), Scope::new(parent.clone())))
        .unwrap();
    assert_eq!(text(&element), "Dr Ada");

    parent.set("title", "Prof").unwrap();
    assert_eq!(text(&element), "Prof Ada");
}

// ============================================================================
// Collections
// ============================================================================

#[test]
fn test_collection_mutation_rerenders() {
    let root = object(json!({"items": [1, 2]}));
    let (_binding, element) = bound("items: ${items}", &root);
    assert_eq!(text(&element), "items: 1,2");

    let items = root.get("items").unwrap();
    let list = items.as_sequence().unwrap();
    let list = list.as_any().downcast_ref::<ObservableList>().unwrap();

    list.push(3).unwrap();
    assert_eq!(text(&element), "items: 1,2,3");

    list.splice(0, 1, vec![]).unwrap();
    assert_eq!(text(&element), "items: 2,3");
}

#[test]
fn test_sequence_length_tracks_mutation() {
    let root = object(json!({"items": [1, 2]}));
    let (binding, element) = bound("n=${items.length}", &root);
    assert_eq!(text(&element), "n=2");
    assert_eq!(binding.observed_count(), 2);

    let items = root.get("items").unwrap();
    let list = items.as_sequence().unwrap();
    let list = list.as_any().downcast_ref::<ObservableList>().unwrap();

    list.push(3).unwrap();
    assert_eq!(text(&element), "n=3");

    list.pop().unwrap();
    list.pop().unwrap();
    assert_eq!(text(&element), "n=1");
}

#[test]
fn test_reassigned_collection_drops_old_subscription() {
    let root = object(json!({"items": ["a"]}));
    let (_binding, element) = bound("${items}", &root);

    let original = root.get("items").unwrap();
    let original = original.as_sequence().unwrap();
    let original = original.as_any().downcast_ref::<ObservableList>().unwrap();
    assert_eq!(original.notifier().subscriber_count(), 1);

    root.set("items", ObservableList::new(vec!["b".into()])).unwrap();
    assert_eq!(text(&element), "b");
    assert_eq!(original.notifier().subscriber_count(), 0);

    original.push("ignored").unwrap();
    assert_eq!(text(&element), "b");
}

/// Locator that never implemented collection observation
struct PropertyOnlyLocator;

impl ObserverLocator for PropertyOnlyLocator {
    fn accessor(&self, target: &Rc<dyn Target>, property: &str) -> Rc<dyn TargetAccessor> {
        MemoryLocator.accessor(target, property)
    }

    fn property_observer(&self, record: &Rc<dyn Record>, property: &str) -> Option<Rc<dyn Observer>> {
        MemoryLocator.property_observer(record, property)
    }
}

#[test]
fn test_missing_collection_observer_fails_bind() {
    let root = object(json!({"items": [1]}));
    let services = BindingServices::new(Rc::new(PropertyOnlyLocator), Rc::new(ImmediateScheduler));
    let binding = instruction(services, "${items}")
        .create_binding(Element::new("#text"))
        .unwrap();

    let err = binding.bind(&Scope::new(root.clone())).unwrap_err();
    assert!(matches!(err, BindingError::Unsupported { operation: "collection_observer" }));
    assert!(!binding.is_bound());
    assert_eq!(root.subscriber_count("items"), 0);
}

#[test]
fn test_plain_sequence_tracks_reassignment_only() {
    let root = ObservableObject::new();
    root.set("items", RawValue::from(json!([1, 2]))).unwrap();
    let (binding, element) = bound("${items}", &root);
    assert_eq!(text(&element), "1,2");
    assert_eq!(binding.observed_count(), 1);

    root.set("items", RawValue::from(json!([3]))).unwrap();
    assert_eq!(text(&element), "3");
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_textarea_content_is_rejected() {
    let target = Element::with_parent("#text", "textarea");
    let err = instruction(immediate_services(), "${value}")
        .create_binding(target.clone())
        .unwrap_err();

    assert!(matches!(err, BindingError::RestrictedContent { .. }));
    assert!(err.to_string().contains("TEXTAREA"));
    assert_eq!(target.write_count(), 0);
}

#[test]
fn test_style_property_is_allowed() {
    let services = immediate_services();
    let parts = parse_template("color: ${color}").unwrap().unwrap();
    let instruction = InterpolationBindingExpression::new(
        services,
        "style",
        parts,
        UpdateMode::ToView,
        Rc::new(LookupContext::new()),
        "style",
    );
    let element = Element::new("div");
    let binding = instruction.create_binding(element.clone()).unwrap();
    binding.bind(&Scope::new(object(json!({"color": "red"})))).unwrap();
    assert_eq!(element.property("style").as_deref(), Some("color: red"));
}

#[test]
fn test_unknown_converter_fails_bind() {
    let root = object(json!({"name": "ada"}));
    let element = Element::new("#text");
    let binding = instruction(immediate_services(), "${name | shout} and ${name}")
        .create_binding(element.clone())
        .unwrap();

    let err = binding.bind(&Scope::new(root.clone())).unwrap_err();
    assert!(matches!(err, BindingError::UnknownConverter { .. }));
    assert!(!binding.is_bound());
    assert_eq!(element.write_count(), 0);
}

#[test]
fn test_partial_composite_bind_is_rolled_back() {
    let root = object(json!({"name": "ada"}));
    let binding = instruction(immediate_services(), "${name} and ${name & sticky}")
        .create_binding(Element::new("#text"))
        .unwrap();

    let err = binding.bind(&Scope::new(root.clone())).unwrap_err();
    assert!(matches!(err, BindingError::UnknownBehavior { .. }));
    assert_eq!(root.subscriber_count("name"), 0);
}

// ============================================================================
// Connect queue
// ============================================================================

fn queued_services(minimum_immediate: usize) -> (BindingServices, Rc<ConnectQueue>) {
    let queue = Rc::new(ConnectQueue::new(QueueConfig {
        minimum_immediate,
        ..QueueConfig::default()
    }));
    let services = BindingServices::new(Rc::new(MemoryLocator), queue.clone());
    (services, queue)
}

#[test]
fn test_queued_connect_subscribes_on_flush() {
    let (services, queue) = queued_services(0);
    let root = object(json!({"a": 1, "b": 2}));
    let element = Element::new("#text");
    let binding = instruction(services, "${a}+${b}")
        .create_binding(element.clone())
        .unwrap();
    binding.bind(&Scope::new(root.clone())).unwrap();

    assert_eq!(text(&element), "1+2");
    assert_eq!(queue.pending(), 2);
    assert_eq!(root.subscriber_count("a"), 0);

    // Changed before connect: the forced evaluation on flush picks it up
    root.set("a", 5).unwrap();
    assert_eq!(text(&element), "1+2");
    assert_eq!(queue.flush().unwrap(), 2);
    assert_eq!(text(&element), "5+2");
    assert_eq!(root.subscriber_count("a"), 1);

    root.set("b", 9).unwrap();
    assert_eq!(text(&element), "5+9");
}

#[test]
fn test_deferred_connect_after_unbind_is_noop() {
    let (services, queue) = queued_services(0);
    let root = object(json!({"a": 1}));
    let element = Element::new("#text");
    let binding = instruction(services, "a=${a}")
        .create_binding(element.clone())
        .unwrap();
    binding.bind(&Scope::new(root.clone())).unwrap();
    binding.unbind();

    assert_eq!(queue.flush().unwrap(), 1);
    assert_eq!(root.subscriber_count("a"), 0);
    assert_eq!(binding.observed_count(), 0);
    assert_eq!(element.write_count(), 1);
}

#[test]
fn test_queue_connects_first_bindings_immediately() {
    let (services, queue) = queued_services(1);
    let root = object(json!({"a": 1, "b": 2}));
    let binding = instruction(services, "${a}${b}")
        .create_binding(Element::new("#text"))
        .unwrap();
    binding.bind(&Scope::new(root.clone())).unwrap();

    assert_eq!(root.subscriber_count("a"), 1);
    assert_eq!(root.subscriber_count("b"), 0);
    assert_eq!(queue.pending(), 1);

    queue.flush().unwrap();
    assert_eq!(root.subscriber_count("b"), 1);
}
