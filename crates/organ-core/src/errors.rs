//! Error types for the organ engine.

use thiserror::Error;

/// Problems encountered while expanding placeholders.
///
/// Apart from [`ExpandError::NotAnArray`], these are never returned as `Err`
/// by the expander. They are collected as diagnostics while the offending
/// placeholder stays in the output verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpandError {
    #[error("Unknown organ: {organ_id}")]
    UnknownOrgan { organ_id: String },

    #[error("Unknown variant '{variant_id}' for organ {organ_id} (no default either)")]
    UnknownVariant { organ_id: String, variant_id: String },

    #[error("Variant '{variant_id}' of organ {organ_id} is not an object")]
    MalformedVariant { organ_id: String, variant_id: String },

    #[error("Organ placeholder has no string organId")]
    MalformedPlaceholder,

    #[error("Document field '{field}' is not an array")]
    MalformedDocument { field: String },

    #[error("Circular organ reference: {}", .cycle.join(" -> "))]
    CycleDetected { cycle: Vec<String> },

    #[error("Maximum organ nesting depth ({depth}) exceeded")]
    MaxDepthExceeded { depth: usize },

    #[error("Expected an array of nodes, found {found}")]
    NotAnArray { found: String },
}

/// Errors while populating a variant registry at bootstrap.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid organ id: {id:?}")]
    InvalidOrganId { id: String },

    #[error("Invalid variant bundle: {reason}")]
    InvalidBundle { reason: String },

    #[error("I/O error during discovery: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
