//! Binding configuration
//!
//! Loaded from YAML. Every section has defaults, so an empty or missing file
//! yields the stock behavior.
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. Environment variables (`INTERBIND_MINIMUM_IMMEDIATE`, `INTERBIND_FRAME_BUDGET_MS`)
//! 2. Config file
//! 3. Defaults

use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{BindingError, Result};

/// Process-wide default validation policy
pub static DEFAULT_POLICY: Lazy<ValidationPolicy> = Lazy::new(ValidationPolicy::default);

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BindingConfig {
    /// Target validation rules applied when bindings are created
    pub validation: ValidationPolicy,

    /// Connect queue batching
    pub connect_queue: QueueConfig,
}

/// Which target properties accept interpolation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationPolicy {
    /// Allowed, but logged as a portability notice
    pub style_properties: Vec<String>,

    /// Content properties that restricted parents cannot hold
    pub content_properties: Vec<String>,

    /// Parent node names (case-insensitive) whose content cannot be interpolated
    pub restricted_content_parents: Vec<String>,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            style_properties: vec!["style".to_string()],
            content_properties: vec!["textContent".to_string()],
            restricted_content_parents: vec!["TEXTAREA".to_string()],
        }
    }
}

impl ValidationPolicy {
    pub fn is_style_property(&self, property: &str) -> bool {
        self.style_properties.iter().any(|p| p == property)
    }

    pub fn is_content_property(&self, property: &str) -> bool {
        self.content_properties.iter().any(|p| p == property)
    }

    pub fn is_restricted_parent(&self, node_name: &str) -> bool {
        self.restricted_content_parents
            .iter()
            .any(|p| p.eq_ignore_ascii_case(node_name))
    }
}

/// Connect queue tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct QueueConfig {
    /// Bindings connected synchronously before queueing starts
    pub minimum_immediate: usize,

    /// Time budget for one flush (ms)
    pub frame_budget_ms: u64,

    /// Bindings processed between budget checks
    pub check_interval: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            minimum_immediate: 100,
            frame_budget_ms: 15,
            check_interval: 100,
        }
    }
}

impl BindingConfig {
    /// Load configuration from file
    ///
    /// Returns default config if file doesn't exist.
    /// Returns error if file exists but is malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| BindingError::Config {
            reason: format!("Failed to read config file {}: {}", path.display(), e),
        })?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content).map_err(|e| BindingError::Config {
            reason: format!("Failed to parse config: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Merge with environment variables
    ///
    /// Environment variables take precedence over config file values.
    pub fn with_env(mut self) -> Result<Self> {
        if let Some(n) = env_number("INTERBIND_MINIMUM_IMMEDIATE")? {
            self.connect_queue.minimum_immediate = n as usize;
        }
        if let Some(ms) = env_number("INTERBIND_FRAME_BUDGET_MS")? {
            self.connect_queue.frame_budget_ms = ms;
        }
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.connect_queue.check_interval == 0 {
            return Err(BindingError::Config {
                reason: "connect_queue.check_interval must be at least 1".into(),
            });
        }
        Ok(())
    }
}

fn env_number(name: &str) -> Result<Option<u64>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| BindingError::Config {
                reason: format!("{} must be a non-negative integer: {}", name, e),
            }),
        Err(_) => Ok(None),
    }
}
