//! Target validation
//!
//! Runs once per target/property pair when a binding is created:
//! - style properties: allowed, logged as a portability notice
//! - content properties of a restricted parent (a textarea's text): rejected,
//!   the element's value must be bound directly instead

use tracing::info;

use crate::config::ValidationPolicy;
use crate::error::{BindingError, Result};

use super::Target;

/// Check that `property` of `target` can receive interpolated content
pub fn validate_target(policy: &ValidationPolicy, target: &dyn Target, property: &str) -> Result<()> {
    if policy.is_style_property(property) {
        info!(
            target: "templating-binding",
            property,
            "Some browsers do not support interpolation in \"style\" attributes. Use the style attribute's alias, \"css\" instead."
        );
        return Ok(());
    }

    if !policy.is_content_property(property) {
        return Ok(());
    }
    match target.parent_node_name() {
        Some(parent) if policy.is_restricted_parent(&parent) => Err(BindingError::RestrictedContent {
            property: property.to_string(),
            parent: parent.to_ascii_uppercase(),
        }),
        _ => Ok(()),
    }
}
