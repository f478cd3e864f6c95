//! SCIM 2.0 filter and PATCH processing for Rust.
//!
//! Parses RFC 7644 filter expressions, evaluates them against resource
//! documents, and applies PATCH operations with schema-aware semantics:
//! value paths, schema extensions, mutability and primary-flag rules.
//!
//! # Core Components
//!
//! - [`filter`] - Lexer, parser and predicate compiler for filter expressions
//! - [`patch`] - PATCH request model and the [`PatchEngine`]
//! - [`schema`] - Attribute definitions the other two consult
//!
//! # Quick Start
//!
//! ```rust
//! use scim_patch::{PatchEngine, PatchOperation, SchemaRegistry, filter};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = SchemaRegistry::new()?;
//! let user = registry.resource_schema("User")?;
//!
//! let mut doc = json!({
//!     "userName": "bjensen",
//!     "phoneNumbers": [
//!         {"type": "home", "value": "555-1111"},
//!         {"type": "work", "value": "555-2222"}
//!     ]
//! });
//!
//! PatchEngine::new(&user).apply(
//!     &mut doc,
//!     &[PatchOperation::remove("phoneNumbers[type eq \"home\"]")?],
//! )?;
//! assert!(!filter::matches("phoneNumbers[type eq \"home\"]", &user, &doc)?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod filter;
pub mod patch;
pub mod schema;

// Re-export commonly used types for convenience
pub use config::{FilterConfig, PatchConfig};
pub use document::{DocumentObject, DocumentValue};
pub use error::{ScimError, ScimResult};
pub use filter::{FilterExpression, Predicate, parse_filter};
pub use patch::{PatchEngine, PatchOperation, PatchOperationType, PatchRequest};
pub use schema::{AttributeDefinition, ResourceSchema, Schema, SchemaRegistry};
