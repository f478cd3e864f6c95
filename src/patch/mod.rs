//! SCIM PATCH (RFC 7644 §3.5.2).
//!
//! ```rust
//! use scim_patch::patch::{PatchEngine, PatchOperation};
//! use scim_patch::schema::SchemaRegistry;
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = SchemaRegistry::new()?;
//! let user = registry.resource_schema("User")?;
//! let engine = PatchEngine::new(&user);
//!
//! let mut doc = json!({"userName": "bjensen", "emails": []});
//! engine.apply(
//!     &mut doc,
//!     &[PatchOperation::add("emails[type eq \"work\"].value", json!("b@example.com"))?],
//! )?;
//! assert_eq!(doc["emails"], json!([{"type": "work", "value": "b@example.com"}]));
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod operation;
pub mod path;
mod target;

pub use engine::PatchEngine;
pub use operation::{PATCH_OP_SCHEMA_URN, PatchOperation, PatchOperationType, PatchRequest};
pub use path::{PatchOperationPath, parse_path, parse_path_with};
