//! Interbind CLI - render and check interpolation bindings

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use clap::{Parser, Subcommand};
use colored::Colorize;

use interbind::binding::{
    validate_target, BindingServices, InterpolationBindingExpression, Target, UpdateMode,
};
use interbind::config::BindingConfig;
use interbind::error::{BindingError, FixSuggestion, Result};
use interbind::host::{observable_from_json, Element, MemoryLocator, ObservableObject};
use interbind::schedule::ConnectQueue;
use interbind::scope::{LookupContext, Scope};
use interbind::template::parse_template;

#[derive(Parser)]
#[command(name = "interbind")]
#[command(about = "Interbind - reactive interpolation bindings")]
#[command(version)]
struct Cli {
    /// Config file (defaults apply when missing)
    #[arg(short, long, global = true, default_value = "interbind.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bind a template to an in-memory element and print every write
    Render {
        /// Template text, e.g. "Hello ${user.name}"
        template: String,

        /// YAML file holding the binding context
        #[arg(short, long)]
        scope: Option<PathBuf>,

        /// Target property
        #[arg(short, long, default_value = "textContent")]
        property: String,

        /// Target node name
        #[arg(short, long, default_value = "#text")]
        element: String,

        /// Parent node name of the target
        #[arg(long)]
        parent: Option<String>,

        /// Update applied after binding: path=value (value is YAML)
        #[arg(long = "set", value_parser = parse_assignment)]
        updates: Vec<(String, String)>,
    },

    /// Check whether a target property accepts interpolation
    Check {
        /// Target node name
        #[arg(short, long)]
        element: String,

        /// Target property
        #[arg(short, long)]
        property: String,

        /// Parent node name of the target
        #[arg(long)]
        parent: Option<String>,
    },
}

fn main() {
    // Load .env file (ignore if not present)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = BindingConfig::load(&cli.config)
        .and_then(BindingConfig::with_env)
        .and_then(|config| match cli.command {
            Commands::Render {
                template,
                scope,
                property,
                element,
                parent,
                updates,
            } => render(
                &config,
                &template,
                scope.as_deref(),
                make_element(element, parent),
                &property,
                &updates,
            ),
            Commands::Check {
                element,
                property,
                parent,
            } => check(&config, make_element(element, parent), &property),
        });

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(suggestion) = e.fix_suggestion() {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

fn parse_assignment(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(path, value)| (path.trim().to_string(), value.to_string()))
        .filter(|(path, _)| !path.is_empty())
        .ok_or_else(|| format!("expected path=value, got '{}'", raw))
}

fn make_element(name: String, parent: Option<String>) -> Rc<Element> {
    match parent {
        Some(parent) => Element::with_parent(name, parent),
        None => Element::new(name),
    }
}

/// Target that echoes each write to stdout
#[derive(Debug)]
struct ConsoleTarget {
    element: Rc<Element>,
}

impl Target for ConsoleTarget {
    fn node_name(&self) -> &str {
        self.element.node_name()
    }

    fn parent_node_name(&self) -> Option<String> {
        self.element.parent_node_name()
    }

    fn property(&self, name: &str) -> Option<String> {
        self.element.property(name)
    }

    fn set_property(&self, name: &str, value: String) {
        println!("{} {} = {:?}", "→".cyan(), name.bold(), value);
        self.element.set_property(name, value);
    }
}

fn load_scope(path: Option<&Path>) -> Result<Rc<ObservableObject>> {
    let Some(path) = path else {
        return Ok(ObservableObject::new());
    };
    let yaml = fs::read_to_string(path)?;
    match serde_yaml::from_str::<serde_json::Value>(&yaml)? {
        serde_json::Value::Object(map) => Ok(ObservableObject::from_json(map)),
        serde_json::Value::Null => Ok(ObservableObject::new()),
        other => Err(BindingError::Config {
            reason: format!("scope file {} must hold a mapping, got {}", path.display(), other),
        }),
    }
}

fn render(
    config: &BindingConfig,
    template: &str,
    scope_file: Option<&Path>,
    element: Rc<Element>,
    property: &str,
    updates: &[(String, String)],
) -> Result<()> {
    let Some(parts) = parse_template(template)? else {
        println!("{} no interpolation, value is static: {:?}", "✓".green(), template);
        return Ok(());
    };

    let root = load_scope(scope_file)?;
    let scope = Scope::new(root.clone());
    let queue = Rc::new(ConnectQueue::new(config.connect_queue.clone()));
    let services = BindingServices::new(Rc::new(MemoryLocator), queue.clone())
        .with_policy(config.validation.clone());

    let instruction = InterpolationBindingExpression::new(
        services,
        property,
        parts,
        UpdateMode::ToView,
        Rc::new(LookupContext::with_builtins()),
        property,
    );
    let target: Rc<dyn Target> = Rc::new(ConsoleTarget {
        element: Rc::clone(&element),
    });
    let binding = instruction.create_binding(target)?;
    binding.bind(&scope)?;
    binding.update_one_time_bindings()?;
    queue.flush()?;

    for (path, raw) in updates {
        let value: serde_json::Value = serde_yaml::from_str(raw)?;
        println!("{} {} = {}", "↻".yellow(), path, raw);
        root.set_path(path, observable_from_json(value))?;
        queue.flush()?;
    }

    println!(
        "{} {} = {:?} ({} writes, {} dependencies)",
        "✓".green(),
        property,
        element.property(property).unwrap_or_default(),
        element.write_count(),
        binding.observed_count()
    );
    binding.unbind();
    Ok(())
}

fn check(config: &BindingConfig, element: Rc<Element>, property: &str) -> Result<()> {
    validate_target(&config.validation, element.as_ref(), property)?;
    println!(
        "{} '{}' of {} accepts interpolation",
        "✓".green(),
        property,
        element.node_name()
    );
    Ok(())
}
