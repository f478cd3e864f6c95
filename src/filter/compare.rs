//! Type-aware comparison of attribute values.
//!
//! | Type            | Operators                       |
//! |-----------------|---------------------------------|
//! | boolean, binary | eq ne                           |
//! | dateTime        | eq ne gt ge lt le (by instant)  |
//! | decimal/integer | eq ne gt ge lt le (numeric)     |
//! | reference       | eq ne gt ge lt le (exact text)  |
//! | string          | all, case-folded unless caseExact |
//! | complex         | none                            |
//!
//! The functions here are strict: an operator the type does not support, or
//! a compare value of the wrong kind, is an error. Values read from the
//! document that have the wrong shape simply do not match.

use super::ast::{CompareOperator, CompareValue};
use crate::error::{ScimError, ScimResult};
use crate::schema::{AttributeDefinition, AttributeType};

use chrono::{DateTime, FixedOffset};
use serde_json::Value;
use std::cmp::Ordering;

/// Check that `operator` may be applied to attributes of `data_type`.
pub fn check_operator(data_type: AttributeType, operator: CompareOperator) -> ScimResult<()> {
    let allowed = match data_type {
        AttributeType::String => true,
        AttributeType::Boolean | AttributeType::Binary => {
            matches!(operator, CompareOperator::Eq | CompareOperator::Ne)
        }
        AttributeType::DateTime
        | AttributeType::Decimal
        | AttributeType::Integer
        | AttributeType::Reference => !operator.is_substring(),
        AttributeType::Complex => false,
    };

    if allowed {
        Ok(())
    } else {
        Err(ScimError::unsupported_filter(format!(
            "Operator '{}' is not supported for {} attributes",
            operator, data_type
        )))
    }
}

/// Check that a compare value suits the attribute it is compared with.
pub fn check_compare_value(
    attribute: &AttributeDefinition,
    operator: CompareOperator,
    expected: &CompareValue,
) -> ScimResult<()> {
    check_operator(attribute.data_type, operator)?;

    let fits = match (attribute.data_type, expected) {
        (_, CompareValue::Null) => matches!(operator, CompareOperator::Eq | CompareOperator::Ne),
        (AttributeType::Boolean, CompareValue::Boolean(_)) => true,
        (AttributeType::Integer | AttributeType::Decimal, CompareValue::Integer(_))
        | (AttributeType::Integer | AttributeType::Decimal, CompareValue::Decimal(_)) => true,
        (AttributeType::DateTime, CompareValue::String(text)) => parse_instant(text).is_some(),
        (
            AttributeType::String | AttributeType::Reference | AttributeType::Binary,
            CompareValue::String(_),
        ) => true,
        _ => false,
    };

    if fits {
        Ok(())
    } else {
        Err(ScimError::unsupported_filter(format!(
            "Cannot compare {} attribute '{}' with {} using '{}'",
            attribute.data_type, attribute.name, expected, operator
        )))
    }
}

/// Compare one value read from a document with a filter's compare value.
pub fn compare_value(
    attribute: &AttributeDefinition,
    actual: &Value,
    operator: CompareOperator,
    expected: &CompareValue,
) -> ScimResult<bool> {
    check_compare_value(attribute, operator, expected)?;

    if let CompareValue::Null = expected {
        let is_null = actual.is_null();
        return Ok(match operator {
            CompareOperator::Eq => is_null,
            _ => !is_null,
        });
    }

    let matched = match (attribute.data_type, actual, expected) {
        (AttributeType::Boolean, Value::Bool(actual), CompareValue::Boolean(expected)) => {
            apply_ordering(actual.cmp(expected), operator)
        }
        (AttributeType::Binary, Value::String(actual), CompareValue::String(expected)) => {
            apply_ordering(actual.as_str().cmp(expected.as_str()), operator)
        }
        (AttributeType::Reference, Value::String(actual), CompareValue::String(expected)) => {
            apply_ordering(actual.as_str().cmp(expected.as_str()), operator)
        }
        (AttributeType::String, Value::String(actual), CompareValue::String(expected)) => {
            compare_strings(actual, expected, operator, attribute.case_exact)
        }
        (AttributeType::DateTime, Value::String(actual), CompareValue::String(expected)) => {
            match (parse_instant(actual), parse_instant(expected)) {
                (Some(actual), Some(expected)) => apply_ordering(actual.cmp(&expected), operator),
                _ => false,
            }
        }
        (AttributeType::Integer | AttributeType::Decimal, Value::Number(actual), expected) => {
            match compare_numbers(actual, expected) {
                Some(ordering) => apply_ordering(ordering, operator),
                None => false,
            }
        }
        _ => false,
    };
    Ok(matched)
}

/// Compare two strings, folding case unless `case_exact`.
///
/// ```
/// use scim_patch::filter::{CompareOperator, compare_strings};
///
/// assert!(compare_strings("ABC", "abc", CompareOperator::Eq, false));
/// assert!(!compare_strings("ABC", "abc", CompareOperator::Eq, true));
/// ```
pub fn compare_strings(actual: &str, expected: &str, operator: CompareOperator, case_exact: bool) -> bool {
    let (actual, expected) = if case_exact {
        (actual.to_string(), expected.to_string())
    } else {
        (actual.to_lowercase(), expected.to_lowercase())
    };

    match operator {
        CompareOperator::Co => actual.contains(&expected),
        CompareOperator::Sw => actual.starts_with(&expected),
        CompareOperator::Ew => actual.ends_with(&expected),
        _ => apply_ordering(actual.cmp(&expected), operator),
    }
}

fn apply_ordering(ordering: Ordering, operator: CompareOperator) -> bool {
    match operator {
        CompareOperator::Eq => ordering == Ordering::Equal,
        CompareOperator::Ne => ordering != Ordering::Equal,
        CompareOperator::Gt => ordering == Ordering::Greater,
        CompareOperator::Ge => ordering != Ordering::Less,
        CompareOperator::Lt => ordering == Ordering::Less,
        CompareOperator::Le => ordering != Ordering::Greater,
        CompareOperator::Co | CompareOperator::Sw | CompareOperator::Ew => false,
    }
}

fn compare_numbers(actual: &serde_json::Number, expected: &CompareValue) -> Option<Ordering> {
    if let (Some(actual), CompareValue::Integer(expected)) = (actual.as_i64(), expected) {
        return Some(actual.cmp(expected));
    }
    actual.as_f64()?.partial_cmp(&expected.as_f64()?)
}

/// Parse an RFC 3339 timestamp.
pub(crate) fn parse_instant(text: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(text).ok()
}
