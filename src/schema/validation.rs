//! Value type checks for PATCH values.
//!
//! The patch engine calls these before a value is written so a document
//! never ends up holding, say, a string where the schema declares a boolean.
//! `null` passes every check; writing null is how SCIM clears a value.

use super::types::{AttributeDefinition, AttributeType};
use crate::document::{get_ci, value_kind};
use crate::error::{ScimError, ScimResult};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value};

/// Check a value destined for the attribute as a whole.
///
/// Multi-valued attributes take an array, or a single element that the
/// engine will append or wrap. At most one element may be primary.
pub fn check_attribute_value(attr_def: &AttributeDefinition, value: &Value) -> ScimResult<()> {
    if value.is_null() {
        return Ok(());
    }

    if attr_def.multi_valued {
        match value {
            Value::Array(items) => {
                for item in items {
                    check_element(attr_def, item)?;
                }
                check_single_primary(attr_def, items)
            }
            single => check_element(attr_def, single),
        }
    } else if value.is_array() {
        Err(ScimError::invalid_value(
            &attr_def.name,
            "expected a single value, got an array",
        ))
    } else {
        check_element(attr_def, value)
    }
}

/// Check one value of the attribute's declared type: an element of a
/// collection, or the value of a single-valued attribute.
pub fn check_element(attr_def: &AttributeDefinition, value: &Value) -> ScimResult<()> {
    let fits = match attr_def.data_type {
        AttributeType::String => value.is_string(),
        AttributeType::Boolean => value.is_boolean(),
        AttributeType::Integer => value.is_i64() || value.is_u64(),
        AttributeType::Decimal => value.is_number(),
        AttributeType::DateTime => value.as_str().is_some_and(is_valid_datetime_format),
        AttributeType::Binary => value.as_str().is_some_and(is_valid_base64),
        AttributeType::Reference => value.as_str().is_some_and(is_valid_reference),
        AttributeType::Complex => {
            let Some(obj) = value.as_object() else {
                return Err(type_mismatch(attr_def, value));
            };
            return check_sub_attributes(attr_def, obj);
        }
    };

    if fits || value.is_null() {
        Ok(())
    } else {
        Err(type_mismatch(attr_def, value))
    }
}

fn check_sub_attributes(attr_def: &AttributeDefinition, obj: &Map<String, Value>) -> ScimResult<()> {
    for (key, sub_value) in obj {
        // unknown keys are carried through untouched
        if let Some(sub_attr) = attr_def.get_attribute(key) {
            check_attribute_value(sub_attr, sub_value).map_err(|error| match error {
                ScimError::InvalidValue { attribute, message } => ScimError::invalid_value(
                    format!("{}.{}", attr_def.name, attribute),
                    message,
                ),
                other => other,
            })?;
        }
    }
    Ok(())
}

/// Reject a set of elements that marks more than one of them primary.
pub fn check_single_primary(attr_def: &AttributeDefinition, items: &[Value]) -> ScimResult<()> {
    if !attr_def.has_primary() {
        return Ok(());
    }

    let primaries = items
        .iter()
        .filter_map(Value::as_object)
        .filter(|obj| get_ci(obj, "primary") == Some(&Value::Bool(true)))
        .count();
    if primaries > 1 {
        return Err(ScimError::invalid_value(
            &attr_def.name,
            format!("{} elements are marked primary, at most one may be", primaries),
        ));
    }
    Ok(())
}

fn type_mismatch(attr_def: &AttributeDefinition, value: &Value) -> ScimError {
    ScimError::invalid_value(
        &attr_def.name,
        format!("expected {}, got {}", attr_def.data_type, describe(value)),
    )
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(text) => format!("string \"{}\"", text),
        other => value_kind(other).to_string(),
    }
}

pub(crate) fn is_valid_datetime_format(value: &str) -> bool {
    !value.is_empty() && DateTime::<FixedOffset>::parse_from_rfc3339(value).is_ok()
}

pub(crate) fn is_valid_base64(value: &str) -> bool {
    STANDARD.decode(value).is_ok()
}

/// References may be absolute URIs, urns or paths relative to the service.
pub(crate) fn is_valid_reference(value: &str) -> bool {
    !value.is_empty() && !value.chars().any(char::is_whitespace)
}
