//! Core types and utilities for the organ expansion engine.
//!
//! This crate provides the foundational pieces shared by the expander:
//! - JSON node helpers and the organ placeholder view
//! - Deep merge with replace-not-concatenate array semantics
//! - Typed document and region shapes
//! - Error types

pub mod document;
pub mod errors;
pub mod merge;
pub mod node;

pub use document::{Document, Region};
pub use errors::*;
pub use merge::{deep_merge, deep_merge_into};
pub use node::*;
