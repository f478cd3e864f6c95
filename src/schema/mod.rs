//! Schema definitions consumed by the filter compiler and patch engine.
//!
//! The schema layer only answers questions: which attributes exist, what
//! type they have, whether they are multi-valued, case-exact or mutable.
//! [`validation`] checks PATCH values against those declarations; nothing
//! here validates whole resources.
//!
//! # Key Types
//!
//! - [`Schema`] - SCIM schema definition with attributes and metadata
//! - [`SchemaRegistry`] - Registry for managing and accessing schemas
//! - [`AttributeDefinition`] - Individual attribute specifications
//! - [`ResourceSchema`] - A base schema together with its extensions
//!
//! # Examples
//!
//! ```rust
//! use scim_patch::schema::SchemaRegistry;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = SchemaRegistry::new()?;
//! let user = registry.resource_schema("User")?;
//! assert!(user.base.get_attribute("emails").is_some());
//! # Ok(())
//! # }
//! ```

pub mod container;
pub mod embedded;
pub mod registry;
pub mod types;
pub mod validation;


// Re-export the main types for convenience
pub use container::{AttributeContainer, ResolvedAttribute, ResourceSchema, resolve};
pub use embedded::{ENTERPRISE_USER_SCHEMA_URN, GROUP_SCHEMA_URN, USER_SCHEMA_URN};
pub use registry::SchemaRegistry;
pub use types::{AttributeDefinition, AttributeType, Mutability, Schema, Uniqueness};
pub use validation::{check_attribute_value, check_element, check_single_primary};
