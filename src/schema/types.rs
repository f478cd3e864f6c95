//! Core schema type definitions.
//!
//! These are plain-data descriptors of RFC 7643 schemas. They are built once,
//! when a schema is registered, and only read afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A SCIM schema definition.
///
/// Represents a complete schema with its metadata and attribute definitions,
/// either a base resource schema (User, Group) or a schema extension.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Schema {
    /// Unique schema identifier (URN)
    pub id: String,
    /// Human-readable schema name
    pub name: String,
    /// Schema description
    #[serde(default)]
    pub description: String,
    /// List of attribute definitions
    pub attributes: Vec<AttributeDefinition>,
}

impl Schema {
    /// Look up a top-level attribute by name, ignoring case.
    pub fn get_attribute(&self, name: &str) -> Option<&AttributeDefinition> {
        find_by_name(&self.attributes, name)
    }
}

/// Definition of a SCIM attribute.
///
/// Defines all characteristics of an attribute including type,
/// constraints, and nested sub-attributes for complex types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDefinition {
    /// Attribute name
    pub name: String,
    /// Data type of the attribute
    #[serde(rename = "type")]
    pub data_type: AttributeType,
    /// Whether this attribute can have multiple values
    #[serde(default)]
    pub multi_valued: bool,
    /// Whether this attribute is required
    #[serde(default)]
    pub required: bool,
    /// Whether string comparison is case-sensitive
    #[serde(default)]
    pub case_exact: bool,
    /// Mutability characteristics
    #[serde(default)]
    pub mutability: Mutability,
    /// Uniqueness constraints
    #[serde(default)]
    pub uniqueness: Uniqueness,
    /// Allowed values for string attributes
    #[serde(default)]
    pub canonical_values: Vec<String>,
    /// Sub-attributes for complex types
    #[serde(default)]
    pub sub_attributes: Vec<AttributeDefinition>,
}

impl AttributeDefinition {
    /// Create a read-write, single-valued attribute of the given type.
    pub fn new(name: impl Into<String>, data_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            data_type,
            ..Self::default()
        }
    }

    pub fn multi_valued(mut self) -> Self {
        self.multi_valued = true;
        self
    }

    pub fn case_exact(mut self) -> Self {
        self.case_exact = true;
        self
    }

    pub fn with_mutability(mut self, mutability: Mutability) -> Self {
        self.mutability = mutability;
        self
    }

    pub fn with_sub_attributes(mut self, sub_attributes: Vec<AttributeDefinition>) -> Self {
        self.sub_attributes = sub_attributes;
        self
    }

    /// Look up a sub-attribute by name, ignoring case.
    pub fn get_attribute(&self, name: &str) -> Option<&AttributeDefinition> {
        find_by_name(&self.sub_attributes, name)
    }

    pub fn is_complex(&self) -> bool {
        self.data_type == AttributeType::Complex
    }

    /// Whether elements of this attribute carry a `primary` sub-attribute.
    pub fn has_primary(&self) -> bool {
        self.get_attribute("primary").is_some()
    }
}

impl Default for AttributeDefinition {
    fn default() -> Self {
        Self {
            name: String::new(),
            data_type: AttributeType::String,
            multi_valued: false,
            required: false,
            case_exact: false,
            mutability: Mutability::ReadWrite,
            uniqueness: Uniqueness::None,
            canonical_values: Vec::new(),
            sub_attributes: Vec::new(),
        }
    }
}

fn find_by_name<'a>(
    attributes: &'a [AttributeDefinition],
    name: &str,
) -> Option<&'a AttributeDefinition> {
    attributes
        .iter()
        .find(|attr| attr.name.eq_ignore_ascii_case(name))
}

/// SCIM attribute data types.
///
/// Represents the valid data types for SCIM attributes as defined in RFC 7643.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum AttributeType {
    /// String value
    #[default]
    String,
    /// Boolean value
    Boolean,
    /// Decimal number
    Decimal,
    /// Integer number
    Integer,
    /// DateTime in RFC3339 format
    DateTime,
    /// Binary data (base64 encoded)
    Binary,
    /// URI reference
    Reference,
    /// Complex attribute with sub-attributes
    Complex,
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttributeType::String => "string",
            AttributeType::Boolean => "boolean",
            AttributeType::Decimal => "decimal",
            AttributeType::Integer => "integer",
            AttributeType::DateTime => "dateTime",
            AttributeType::Binary => "binary",
            AttributeType::Reference => "reference",
            AttributeType::Complex => "complex",
        };
        f.write_str(name)
    }
}

/// Attribute mutability characteristics.
///
/// Defines whether and how an attribute can be modified by PATCH.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Mutability {
    /// Read-only attribute (managed by server)
    ReadOnly,
    /// Read-write attribute (can be modified by clients)
    #[default]
    ReadWrite,
    /// Immutable attribute (set once, never modified)
    Immutable,
    /// Write-only attribute (passwords, etc.)
    WriteOnly,
}

impl fmt::Display for Mutability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mutability::ReadOnly => "readOnly",
            Mutability::ReadWrite => "readWrite",
            Mutability::Immutable => "immutable",
            Mutability::WriteOnly => "writeOnly",
        };
        f.write_str(name)
    }
}

/// Attribute uniqueness constraints.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Uniqueness {
    /// No uniqueness constraint
    #[default]
    None,
    /// Unique within the server
    Server,
    /// Globally unique
    Global,
}
