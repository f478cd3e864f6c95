//! Schema registry for loading, managing, and accessing SCIM schemas.
//!
//! The registry owns every schema the filter compiler and patch engine may
//! consult, plus the resource types that tie a base schema to its extensions.

use super::container::ResourceSchema;
use super::embedded;
use super::types::Schema;
use crate::error::{ScimError, ScimResult};

use std::collections::HashMap;

/// Registry of SCIM schemas and resource types.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Schema>,
    resource_types: HashMap<String, ResourceTypeEntry>,
}

#[derive(Debug, Clone)]
struct ResourceTypeEntry {
    base: String,
    extensions: Vec<String>,
}

impl SchemaRegistry {
    /// Create a registry holding the embedded User, Group and Enterprise User
    /// schemas, with "User" and "Group" resource types registered.
    pub fn new() -> ScimResult<Self> {
        let mut registry = Self::empty();
        registry.add_schema(Self::load_schema_from_str(embedded::core_user_schema())?);
        registry.add_schema(Self::load_schema_from_str(embedded::core_group_schema())?);
        registry.add_schema(Self::load_schema_from_str(
            embedded::enterprise_user_schema(),
        )?);

        registry.register_resource_type(
            "User",
            embedded::USER_SCHEMA_URN,
            &[embedded::ENTERPRISE_USER_SCHEMA_URN],
        )?;
        registry.register_resource_type("Group", embedded::GROUP_SCHEMA_URN, &[])?;
        Ok(registry)
    }

    /// Create a registry with no schemas at all.
    pub fn empty() -> Self {
        Self {
            schemas: HashMap::new(),
            resource_types: HashMap::new(),
        }
    }

    /// Parse a schema from its RFC 7643 JSON representation.
    pub fn load_schema_from_str(content: &str) -> ScimResult<Schema> {
        Ok(serde_json::from_str(content)?)
    }

    /// Get all available schemas.
    pub fn get_schemas(&self) -> Vec<&Schema> {
        self.schemas.values().collect()
    }

    /// Get a specific schema by URN. URNs compare case-insensitively.
    pub fn get_schema(&self, urn: &str) -> Option<&Schema> {
        self.schemas.get(urn).or_else(|| {
            self.schemas
                .values()
                .find(|schema| schema.id.eq_ignore_ascii_case(urn))
        })
    }

    /// Add a schema to the registry, replacing any schema with the same URN.
    pub fn add_schema(&mut self, schema: Schema) {
        log::debug!("Registering schema {}", schema.id);
        self.schemas.insert(schema.id.clone(), schema);
    }

    /// Tie a base schema and its extensions together under a resource type name.
    pub fn register_resource_type(
        &mut self,
        name: &str,
        base_urn: &str,
        extension_urns: &[&str],
    ) -> ScimResult<()> {
        for urn in std::iter::once(&base_urn).chain(extension_urns) {
            if self.get_schema(urn).is_none() {
                return Err(ScimError::schema_not_found(*urn));
            }
        }

        self.resource_types.insert(
            name.to_string(),
            ResourceTypeEntry {
                base: base_urn.to_string(),
                extensions: extension_urns.iter().map(|urn| urn.to_string()).collect(),
            },
        );
        Ok(())
    }

    /// Snapshot of a registered resource type with its schemas.
    pub fn resource_schema(&self, name: &str) -> ScimResult<ResourceSchema> {
        let entry = self
            .resource_types
            .get(name)
            .ok_or_else(|| ScimError::schema_not_found(name))?;

        let base = self
            .get_schema(&entry.base)
            .cloned()
            .ok_or_else(|| ScimError::schema_not_found(&entry.base))?;

        let mut resource = ResourceSchema::new(name, base);
        for urn in &entry.extensions {
            let extension = self
                .get_schema(urn)
                .cloned()
                .ok_or_else(|| ScimError::schema_not_found(urn))?;
            resource = resource.with_extension(extension);
        }
        Ok(resource)
    }

    pub fn get_user_schema(&self) -> Option<&Schema> {
        self.get_schema(embedded::USER_SCHEMA_URN)
    }

    pub fn get_group_schema(&self) -> Option<&Schema> {
        self.get_schema(embedded::GROUP_SCHEMA_URN)
    }
}
