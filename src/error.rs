//! Error types with fix suggestions

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T, E = BindingError> = std::result::Result<T, E>;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

#[derive(Error, Debug)]
pub enum BindingError {
    // ─────────────────────────────────────────────────────────────
    // Construction errors (BIND-001 to BIND-010)
    // ─────────────────────────────────────────────────────────────

    #[error("BIND-001: Invalid interpolation parts: {reason}")]
    InvalidParts { reason: String },

    #[error(
        "BIND-010: Interpolation binding cannot be used in the '{property}' of a {parent} element"
    )]
    RestrictedContent { property: String, parent: String },

    // ─────────────────────────────────────────────────────────────
    // Collaborator errors (BIND-020 to BIND-032)
    // ─────────────────────────────────────────────────────────────

    #[error("BIND-020: Operation '{operation}' is not supported by the observer locator")]
    Unsupported { operation: &'static str },

    #[error("BIND-030: Evaluation failed for '{expression}': {reason}")]
    Evaluation { expression: String, reason: String },

    #[error("BIND-031: No value converter named '{name}'")]
    UnknownConverter { name: String },

    #[error("BIND-032: No binding behavior named '{name}'")]
    UnknownBehavior { name: String },

    // ─────────────────────────────────────────────────────────────
    // Host errors (BIND-040 to BIND-050)
    // ─────────────────────────────────────────────────────────────

    #[error("BIND-040: Template parse error at position {position}: {details}")]
    TemplateParse { position: usize, details: String },

    #[error("BIND-050: Config error: {reason}")]
    Config { reason: String },

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FixSuggestion for BindingError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            BindingError::InvalidParts { .. } => {
                Some("Alternate literals and expressions, starting and ending with a literal")
            }
            BindingError::RestrictedContent { .. } => {
                Some("Bind the element's value directly: <textarea value.bind=\"expression\">")
            }
            BindingError::Unsupported { .. } => {
                Some("Supply an observer locator that implements collection observation")
            }
            BindingError::Evaluation { .. } => Some("Check the expression against the bound scope"),
            BindingError::UnknownConverter { .. } => {
                Some("Register the converter in the lookup context before binding")
            }
            BindingError::UnknownBehavior { .. } => {
                Some("Register the behavior in the lookup context before binding")
            }
            BindingError::TemplateParse { .. } => {
                Some("Close every '${' with '}': ${user.name} or ${count | fmt}")
            }
            BindingError::Config { .. } => Some("Check the YAML config keys and value types"),
            BindingError::Yaml(_) => Some("Check YAML syntax: indentation and quoting"),
            BindingError::Io(_) => Some("Check file path and permissions"),
        }
    }
}
