//! Quick benchmark for template parsing and binding update throughput

use std::rc::Rc;
use std::time::Instant;

use interbind::host::{Element, MemoryLocator, ObservableObject};
use interbind::template::parse_template;
use interbind::{
    BindingServices, ImmediateScheduler, InterpolationBindingExpression, LookupContext, Scope,
    UpdateMode,
};
use serde_json::json;

fn main() {
    let templates = vec![
        "Simple text with no templates",
        "Hello ${user.name}",
        "Hello ${user.name}, you have ${count} items",
        "${a}${b}${c}${d} ${user.name | upper} ${count & oneTime}",
    ];

    println!("Template Parsing Performance Test");
    println!("=================================\n");

    // Warm up the token cache
    for template in &templates {
        let _ = parse_template(template);
    }

    for template in &templates {
        let iterations = 100_000;
        let start = Instant::now();

        for _ in 0..iterations {
            let _ = parse_template(template);
        }

        let elapsed = start.elapsed();
        println!("Template: {:60}", format!("\"{}\"", template));
        println!("  Time for {} iterations: {:?}", iterations, elapsed);
        println!("  Per operation: {:?}\n", elapsed / iterations);
    }

    println!("Binding Update Performance Test");
    println!("===============================\n");

    let serde_json::Value::Object(map) = json!({"user": {"name": "Ada"}, "count": 0}) else {
        unreachable!()
    };
    let root = ObservableObject::from_json(map);
    let scope = Scope::new(root.clone());
    let services = BindingServices::new(Rc::new(MemoryLocator), Rc::new(ImmediateScheduler));
    let lookup = Rc::new(LookupContext::with_builtins());

    for template in &templates[1..] {
        let Ok(Some(parts)) = parse_template(template) else {
            continue;
        };
        let instruction = InterpolationBindingExpression::new(
            services.clone(),
            "textContent",
            parts,
            UpdateMode::ToView,
            Rc::clone(&lookup),
            "textContent",
        );
        let element = Element::new("#text");
        let binding = instruction.create_binding(element.clone()).unwrap();
        binding.bind(&scope).unwrap();

        let iterations = 100_000u32;
        let start = Instant::now();
        for i in 0..iterations {
            root.set("count", i as f64).unwrap();
        }
        let elapsed = start.elapsed();

        println!("Template: {:60}", format!("\"{}\"", template));
        println!("  Updates: {}, writes: {}", iterations, element.write_count());
        println!("  Per update: {:?}\n", elapsed / iterations);
        binding.unbind();
    }
}
