//! PATCH path expressions: `[urn:]attr[.sub]` or `[urn:]attr[filter][.sub]`.

use crate::config::FilterConfig;
use crate::error::{ScimError, ScimResult};
use crate::filter::parser::parse_path_expression;
use crate::filter::{AttributeReference, FilterExpression};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A parsed PATCH `path`.
///
/// When a value filter is present, `attribute.sub_attribute_name` is the
/// sub-attribute written after the closing bracket, e.g. `value` in
/// `emails[type eq "work"].value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PatchOperationPath {
    pub attribute: AttributeReference,
    pub filter: Option<FilterExpression>,
}

impl PatchOperationPath {
    pub fn new(attribute: AttributeReference) -> Self {
        Self {
            attribute,
            filter: None,
        }
    }

    /// Same attribute, selected through `filter`.
    pub fn with_filter(&self, filter: FilterExpression) -> Self {
        Self {
            attribute: self.attribute.clone(),
            filter: Some(filter),
        }
    }

    pub fn parse(path: &str) -> ScimResult<Self> {
        Self::parse_with(path, &FilterConfig::default())
    }

    pub fn parse_with(path: &str, config: &FilterConfig) -> ScimResult<Self> {
        let (attribute, filter) = parse_path_expression(path, config)?;
        Ok(Self { attribute, filter })
    }

    /// The extension urn this path names, when it names a whole extension
    /// (`urn:ietf:params:scim:schemas:extension:enterprise:2.0:User`).
    pub fn extension_urn(&self) -> Option<String> {
        match self.filter {
            Some(_) => None,
            None => self.attribute.as_schema_urn(),
        }
    }
}

/// Parse a PATCH path with the default limits.
pub fn parse_path(path: &str) -> ScimResult<PatchOperationPath> {
    PatchOperationPath::parse(path)
}

/// Parse a PATCH path with explicit limits.
pub fn parse_path_with(path: &str, config: &FilterConfig) -> ScimResult<PatchOperationPath> {
    PatchOperationPath::parse_with(path, config)
}

impl fmt::Display for PatchOperationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(filter) = &self.filter else {
            return write!(f, "{}", self.attribute);
        };

        if let Some(urn) = &self.attribute.urn {
            write!(f, "{}:", urn)?;
        }
        write!(f, "{}[{}]", self.attribute.attribute_name, filter)?;
        if let Some(sub) = &self.attribute.sub_attribute_name {
            write!(f, ".{}", sub)?;
        }
        Ok(())
    }
}

impl FromStr for PatchOperationPath {
    type Err = ScimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PatchOperationPath {
    type Error = ScimError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PatchOperationPath> for String {
    fn from(path: PatchOperationPath) -> Self {
        path.to_string()
    }
}
