//! PATCH request model (RFC 7644 §3.5.2).

use super::path::PatchOperationPath;
use crate::error::{ScimError, ScimResult};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Message schema of a PATCH request body.
pub const PATCH_OP_SCHEMA_URN: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOperationType {
    Add,
    Replace,
    Remove,
}

impl FromStr for PatchOperationType {
    type Err = ScimError;

    /// Operation names are matched ignoring case; some clients send "Add".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "add" => Ok(Self::Add),
            "replace" => Ok(Self::Replace),
            "remove" => Ok(Self::Remove),
            _ => Err(ScimError::invalid_syntax(format!(
                "Unknown PATCH operation '{}'",
                s
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for PatchOperationType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for PatchOperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => f.write_str("add"),
            Self::Replace => f.write_str("replace"),
            Self::Remove => f.write_str("remove"),
        }
    }
}

/// One entry of the `Operations` array.
///
/// Without a `path` the operation is in bulk form: `value` is an object whose
/// keys name the attributes to add or replace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: PatchOperationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PatchOperationPath>,
    /// An explicit `"value": null` is kept as `Some(Value::Null)`; on add or
    /// replace it clears the target.
    #[serde(
        default,
        deserialize_with = "deserialize_explicit",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<Value>,
}

fn deserialize_explicit<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl PatchOperation {
    pub fn add(path: &str, value: Value) -> ScimResult<Self> {
        Ok(Self {
            op: PatchOperationType::Add,
            path: Some(path.parse()?),
            value: Some(value),
        })
    }

    pub fn replace(path: &str, value: Value) -> ScimResult<Self> {
        Ok(Self {
            op: PatchOperationType::Replace,
            path: Some(path.parse()?),
            value: Some(value),
        })
    }

    pub fn remove(path: &str) -> ScimResult<Self> {
        Ok(Self {
            op: PatchOperationType::Remove,
            path: Some(path.parse()?),
            value: None,
        })
    }

    /// A removal that also carries a value, as some clients send for
    /// `members`.
    pub fn remove_with_value(path: &str, value: Value) -> ScimResult<Self> {
        Ok(Self {
            value: Some(value),
            ..Self::remove(path)?
        })
    }

    /// An operation without a path.
    pub fn bulk(op: PatchOperationType, value: Value) -> Self {
        Self {
            op,
            path: None,
            value: Some(value),
        }
    }

    /// Structural checks that need no schema.
    pub fn validate(&self) -> ScimResult<()> {
        match (self.op, &self.path, &self.value) {
            (PatchOperationType::Remove, None, _) => Err(ScimError::no_target("")),
            (PatchOperationType::Add | PatchOperationType::Replace, _, None) => {
                Err(ScimError::invalid_value(
                    self.path.as_ref().map(ToString::to_string).unwrap_or_default(),
                    format!("'{}' requires a value", self.op),
                ))
            }
            (PatchOperationType::Add | PatchOperationType::Replace, None, Some(value))
                if !value.is_object() =>
            {
                Err(ScimError::invalid_value(
                    "",
                    format!("'{}' without a path requires an object value", self.op),
                ))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for PatchOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{} {}", self.op, path),
            None => write!(f, "{} (no path)", self.op),
        }
    }
}

/// A PATCH request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchRequest {
    pub schemas: Vec<String>,
    #[serde(rename = "Operations")]
    pub operations: Vec<PatchOperation>,
}

impl PatchRequest {
    pub fn new(operations: Vec<PatchOperation>) -> Self {
        Self {
            schemas: vec![PATCH_OP_SCHEMA_URN.to_string()],
            operations,
        }
    }

    /// Deserialize and validate a request body.
    pub fn from_json(body: &str) -> ScimResult<Self> {
        let request: Self =
            serde_json::from_str(body).map_err(|e| ScimError::invalid_syntax(e.to_string()))?;
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> ScimResult<()> {
        if !self
            .schemas
            .iter()
            .any(|schema| schema.eq_ignore_ascii_case(PATCH_OP_SCHEMA_URN))
        {
            return Err(ScimError::invalid_syntax(format!(
                "PATCH request must declare the schema {}",
                PATCH_OP_SCHEMA_URN
            )));
        }
        if self.operations.is_empty() {
            return Err(ScimError::invalid_syntax(
                "PATCH request must contain at least one operation",
            ));
        }
        self.operations.iter().try_for_each(PatchOperation::validate)
    }
}
