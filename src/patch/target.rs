//! Resolving where a PATCH operation lands and what shape it has there.

use super::path::PatchOperationPath;
use crate::document::{DocumentObject, find_key, get_ci, get_ci_mut, is_present, value_kind};
use crate::error::{ScimError, ScimResult};
use crate::filter::{Predicate, compile_strict};
use crate::schema::{
    AttributeDefinition, Mutability, ResolvedAttribute, ResourceSchema, check_attribute_value,
    check_element, resolve,
};

use serde_json::Value;

/// The three ways a path can address a value.
pub(crate) enum Shape<'s> {
    /// A single-valued attribute, or a sub-attribute of one.
    Single,
    /// A whole multi-valued attribute.
    Collection,
    /// Elements of a multi-valued attribute. `None` selects every element,
    /// as in `emails.display`.
    Filtered(Option<Predicate<'s>>),
}

pub(crate) struct Target<'s> {
    pub(crate) resolved: ResolvedAttribute<'s>,
    pub(crate) shape: Shape<'s>,
}

impl<'s> Target<'s> {
    pub(crate) fn resolve(schema: &'s ResourceSchema, path: &PatchOperationPath) -> ScimResult<Self> {
        let resolved = resolve(schema, &path.attribute).ok_or_else(|| {
            ScimError::invalid_path(
                path.to_string(),
                format!("no such attribute in the {} schema", schema.name),
            )
        })?;
        let attribute = resolved.attribute;

        let shape = match &path.filter {
            Some(filter) => {
                if !attribute.multi_valued || !attribute.is_complex() {
                    return Err(ScimError::invalid_path(
                        path.to_string(),
                        format!(
                            "a value filter needs a multi-valued complex attribute, '{}' is not one",
                            attribute.name
                        ),
                    ));
                }
                Shape::Filtered(Some(compile_strict(filter, attribute)?))
            }
            None if attribute.multi_valued && resolved.sub_attribute.is_some() => {
                Shape::Filtered(None)
            }
            None if attribute.multi_valued => Shape::Collection,
            None => Shape::Single,
        };

        Ok(Self { resolved, shape })
    }

    pub(crate) fn attribute(&self) -> &'s AttributeDefinition {
        self.resolved.attribute
    }

    pub(crate) fn sub_attribute(&self) -> Option<&'s AttributeDefinition> {
        self.resolved.sub_attribute
    }

    /// Whether elements are selected by an explicit value filter.
    pub(crate) fn has_filter(&self) -> bool {
        matches!(self.shape, Shape::Filtered(Some(_)))
    }

    /// Indices of the collection elements this target selects.
    pub(crate) fn matching(&self, elements: &[Value]) -> Vec<usize> {
        let Shape::Filtered(predicate) = &self.shape else {
            return Vec::new();
        };
        elements
            .iter()
            .enumerate()
            .filter(|(_, element)| {
                element.is_object() && predicate.as_ref().is_none_or(|p| p.matches(element))
            })
            .map(|(index, _)| index)
            .collect()
    }

    /// Reject writes to readOnly attributes, and to immutable ones that
    /// already hold a value at this location.
    pub(crate) fn check_mutability(&self, owner: Option<&DocumentObject>) -> ScimResult<()> {
        let attribute = self.attribute();
        if attribute.mutability == Mutability::ReadOnly {
            return Err(ScimError::mutability(&attribute.name, Mutability::ReadOnly));
        }
        if let Some(sub) = self.sub_attribute() {
            if sub.mutability == Mutability::ReadOnly {
                return Err(ScimError::mutability(
                    self.qualified_name(),
                    Mutability::ReadOnly,
                ));
            }
        }

        let current = owner.and_then(|owner| get_ci(owner, &attribute.name));
        let selected: Vec<&Value> = match (&self.shape, current) {
            (Shape::Filtered(_), Some(Value::Array(elements))) => self
                .matching(elements)
                .into_iter()
                .map(|index| &elements[index])
                .collect(),
            (Shape::Filtered(_), _) => Vec::new(),
            (_, Some(value)) => vec![value],
            (_, None) => Vec::new(),
        };

        if attribute.mutability == Mutability::Immutable
            && selected.iter().any(|value| is_present(Some(value)))
        {
            return Err(ScimError::mutability(&attribute.name, Mutability::Immutable));
        }

        if let Some(sub) = self.sub_attribute() {
            let occupied = selected.iter().any(|value| {
                is_present(value.as_object().and_then(|obj| get_ci(obj, &sub.name)))
            });
            if sub.mutability == Mutability::Immutable && occupied {
                return Err(ScimError::mutability(
                    self.qualified_name(),
                    Mutability::Immutable,
                ));
            }
        }
        Ok(())
    }

    /// Check that `value` fits what this target holds.
    pub(crate) fn check_value(&self, value: &Value) -> ScimResult<()> {
        if value.is_null() {
            return Ok(());
        }
        match (&self.shape, self.sub_attribute()) {
            (_, Some(sub)) => check_attribute_value(sub, value).map_err(|error| match error {
                ScimError::InvalidValue { message, .. } => {
                    ScimError::invalid_value(self.qualified_name(), message)
                }
                other => other,
            }),
            (Shape::Filtered(_), None) => check_element(self.attribute(), value),
            (_, None) => check_attribute_value(self.attribute(), value),
        }
    }

    /// Whether writing `value` here marks an element primary.
    pub(crate) fn sets_primary(&self, value: &Value) -> bool {
        if !self.attribute().has_primary() {
            return false;
        }
        match self.sub_attribute() {
            Some(sub) => sub.name.eq_ignore_ascii_case("primary") && value == &Value::Bool(true),
            None => is_primary(value),
        }
    }

    fn qualified_name(&self) -> String {
        match self.sub_attribute() {
            Some(sub) => format!("{}.{}", self.attribute().name, sub.name),
            None => self.attribute().name.clone(),
        }
    }
}

/// The array stored under `name`, created when absent. A stray scalar is
/// wrapped into a one-element array.
pub(crate) fn collection_mut<'d>(owner: &'d mut DocumentObject, name: &str) -> ScimResult<&'d mut Vec<Value>> {
    let key = find_key(owner, name).unwrap_or(name).to_string();
    let slot = owner.entry(key).or_insert(Value::Null);
    if !slot.is_array() {
        let existing = slot.take();
        *slot = Value::Array(if existing.is_null() { Vec::new() } else { vec![existing] });
    }
    match slot {
        Value::Array(elements) => Ok(elements),
        other => Err(ScimError::invalid_value(
            name,
            format!("expected a collection, found {}", value_kind(other)),
        )),
    }
}

/// The existing array stored under `name`.
pub(crate) fn existing_collection_mut<'d>(
    owner: &'d mut DocumentObject,
    name: &str,
) -> Option<&'d mut Vec<Value>> {
    get_ci_mut(owner, name).and_then(Value::as_array_mut)
}

/// Whether an element carries `primary: true`.
pub(crate) fn is_primary(element: &Value) -> bool {
    element
        .as_object()
        .and_then(|obj| get_ci(obj, "primary"))
        .is_some_and(|primary| primary == &Value::Bool(true))
}

/// Force `primary` to false on every element that has it, except `keep`.
pub(crate) fn demote_primaries(elements: &mut [Value], keep: Option<usize>) {
    let mut demoted = 0;
    for (index, element) in elements.iter_mut().enumerate() {
        if Some(index) == keep {
            continue;
        }
        if let Some(primary) = element
            .as_object_mut()
            .and_then(|obj| get_ci_mut(obj, "primary"))
        {
            if primary == &Value::Bool(true) {
                demoted += 1;
            }
            *primary = Value::Bool(false);
        }
    }
    if demoted > 0 {
        log::debug!("Demoted {} primary element(s)", demoted);
    }
}
