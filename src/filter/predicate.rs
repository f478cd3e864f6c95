//! Compile filter expressions into document predicates.
//!
//! Matching comes in two flavours. [`compile`] is lenient: an unknown
//! attribute, an operator the attribute type does not support or a compare
//! value of the wrong kind turns that comparison into a constant `false`,
//! so a search never fails because of a questionable filter. [`compile_strict`]
//! reports the same problems as errors and is what the patch engine uses to
//! select collection elements.

use super::ast::{CompareOperator, CompareValue, FilterExpression, LogicalOperator};
use super::compare::{check_compare_value, compare_value};
use super::parser::parse_filter;
use crate::document::{get_ci, is_present};
use crate::error::{ScimError, ScimResult};
use crate::schema::{AttributeContainer, ResolvedAttribute, resolve};

use serde_json::Value;
use std::fmt;

/// A compiled filter, borrowing the schema it was compiled against.
pub struct Predicate<'s> {
    test: Box<dyn Fn(&Value) -> bool + 's>,
}

impl<'s> Predicate<'s> {
    fn new(test: impl Fn(&Value) -> bool + 's) -> Self {
        Self {
            test: Box::new(test),
        }
    }

    /// A predicate that ignores the document.
    pub fn constant(result: bool) -> Self {
        Self::new(move |_| result)
    }

    /// Evaluate against a document (or a collection element).
    pub fn matches(&self, document: &Value) -> bool {
        (self.test)(document)
    }
}

impl fmt::Debug for Predicate<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate").finish_non_exhaustive()
    }
}

/// Compile leniently; problems evaluate to `false`.
pub fn compile<'s, C>(expression: &FilterExpression, container: &'s C) -> Predicate<'s>
where
    C: AttributeContainer + ?Sized,
{
    match build(expression, container, false) {
        Ok(predicate) => predicate,
        Err(error) => {
            log::debug!("Filter '{}' never matches: {}", expression, error);
            Predicate::constant(false)
        }
    }
}

/// Compile strictly; unknown attributes and illegal comparisons are errors.
pub fn compile_strict<'s, C>(
    expression: &FilterExpression,
    container: &'s C,
) -> ScimResult<Predicate<'s>>
where
    C: AttributeContainer + ?Sized,
{
    build(expression, container, true)
}

/// Parse `filter` and evaluate it leniently against `document`.
///
/// Only syntax errors are reported.
pub fn matches<C>(filter: &str, container: &C, document: &Value) -> ScimResult<bool>
where
    C: AttributeContainer + ?Sized,
{
    let expression = parse_filter(filter)?;
    Ok(compile(&expression, container).matches(document))
}

fn build<'s, C>(
    expression: &FilterExpression,
    container: &'s C,
    strict: bool,
) -> ScimResult<Predicate<'s>>
where
    C: AttributeContainer + ?Sized,
{
    let leaf = match expression {
        FilterExpression::Comparison {
            path,
            operator,
            value,
        } => resolve_or_fail(container, path, expression)
            .and_then(|resolved| comparison(resolved, *operator, value.clone())),
        FilterExpression::Present { path } => {
            resolve_or_fail(container, path, expression).map(present)
        }
        FilterExpression::ValuePath { path, filter } => {
            resolve_or_fail(container, path, expression).and_then(|resolved| {
                value_path(resolved, filter.as_deref(), strict, expression)
            })
        }
        FilterExpression::Logical {
            left,
            operator,
            right,
        } => {
            let left = build(left, container, strict)?;
            let right = build(right, container, strict)?;
            return Ok(match operator {
                LogicalOperator::And => {
                    Predicate::new(move |doc| left.matches(doc) && right.matches(doc))
                }
                LogicalOperator::Or => {
                    Predicate::new(move |doc| left.matches(doc) || right.matches(doc))
                }
            });
        }
        FilterExpression::Group { negated, inner } => {
            let inner = build(inner, container, strict)?;
            return Ok(if *negated {
                Predicate::new(move |doc| !inner.matches(doc))
            } else {
                inner
            });
        }
    };

    match leaf {
        Ok(predicate) => Ok(predicate),
        Err(error) if strict => Err(error),
        Err(error) => {
            log::debug!("'{}' evaluates to false: {}", expression, error);
            Ok(Predicate::constant(false))
        }
    }
}

fn resolve_or_fail<'s, C>(
    container: &'s C,
    path: &super::ast::AttributeReference,
    expression: &FilterExpression,
) -> ScimResult<ResolvedAttribute<'s>>
where
    C: AttributeContainer + ?Sized,
{
    resolve(container, path).ok_or_else(|| {
        ScimError::unsupported_filter(format!(
            "Unknown attribute '{}' in '{}'",
            path, expression
        ))
    })
}

fn comparison(
    resolved: ResolvedAttribute<'_>,
    operator: CompareOperator,
    expected: CompareValue,
) -> ScimResult<Predicate<'_>> {
    let leaf = resolved.leaf();
    check_compare_value(leaf, operator, &expected)?;

    if let CompareValue::Null = expected {
        let wants_null = operator == CompareOperator::Eq;
        return Ok(Predicate::new(move |doc| {
            let any_value = candidates(&resolved, doc).iter().any(|value| !value.is_null());
            any_value != wants_null
        }));
    }

    Ok(Predicate::new(move |doc| {
        candidates(&resolved, doc)
            .into_iter()
            .any(|actual| compare_value(leaf, actual, operator, &expected).unwrap_or(false))
    }))
}

fn present(resolved: ResolvedAttribute<'_>) -> Predicate<'_> {
    if resolved.leaf().multi_valued {
        return Predicate::constant(false);
    }
    Predicate::new(move |doc| {
        candidates(&resolved, doc)
            .into_iter()
            .any(|value| is_present(Some(value)))
    })
}

fn value_path<'s>(
    resolved: ResolvedAttribute<'s>,
    filter: Option<&FilterExpression>,
    strict: bool,
    expression: &FilterExpression,
) -> ScimResult<Predicate<'s>> {
    let attribute = resolved.attribute;
    if !attribute.multi_valued || resolved.sub_attribute.is_some() {
        return Err(ScimError::unsupported_filter(format!(
            "'{}' is not a multi-valued attribute in '{}'",
            attribute.name, expression
        )));
    }

    let Some(filter) = filter else {
        return Ok(Predicate::new(move |doc| match attribute_value(&resolved, doc) {
            Some(Value::Array(elements)) => !elements.is_empty(),
            other => is_present(other),
        }));
    };

    let inner = build(filter, attribute, strict)?;
    Ok(Predicate::new(move |doc| {
        match attribute_value(&resolved, doc) {
            Some(Value::Array(elements)) => elements.iter().any(|element| inner.matches(element)),
            Some(single @ Value::Object(_)) => inner.matches(single),
            _ => false,
        }
    }))
}

/// The value of the resolved top-level attribute in `doc`.
fn attribute_value<'d>(resolved: &ResolvedAttribute<'_>, doc: &'d Value) -> Option<&'d Value> {
    let mut object = doc.as_object()?;
    if let Some(urn) = resolved.extension {
        object = get_ci(object, urn)?.as_object()?;
    }
    get_ci(object, &resolved.attribute.name)
}

/// Every value the reference denotes in `doc`. Collections contribute each
/// of their elements, so a comparison holds when any element satisfies it.
fn candidates<'d>(resolved: &ResolvedAttribute<'_>, doc: &'d Value) -> Vec<&'d Value> {
    let mut found = Vec::new();
    let Some(value) = attribute_value(resolved, doc) else {
        return found;
    };

    match resolved.sub_attribute {
        Some(sub) => {
            let parents: Vec<&Value> = match value {
                Value::Array(elements) => elements.iter().collect(),
                other => vec![other],
            };
            for parent in parents {
                if let Some(child) = parent.as_object().and_then(|obj| get_ci(obj, &sub.name)) {
                    flatten_into(child, &mut found);
                }
            }
        }
        None => flatten_into(value, &mut found),
    }
    found
}

fn flatten_into<'d>(value: &'d Value, found: &mut Vec<&'d Value>) {
    match value {
        Value::Array(elements) => found.extend(elements.iter()),
        other => found.push(other),
    }
}
