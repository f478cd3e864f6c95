//! Applies PATCH operations to a resource document.
//!
//! Each operation is resolved to a [`Target`] and dispatched on operation
//! type and target shape:
//!
//! | Shape      | add                         | replace                      | remove                 |
//! |------------|-----------------------------|------------------------------|------------------------|
//! | single     | set, merging complex values | overwrite                    | delete the key         |
//! | collection | append missing elements     | replace the whole array      | delete the attribute   |
//! | filtered   | set on matches, or append   | overwrite on matches         | delete matches or keys |
//!
//! A batch runs against a copy of the document; the caller's document only
//! changes when every operation succeeds.

use super::operation::{PatchOperation, PatchOperationType, PatchRequest};
use super::path::PatchOperationPath;
use super::target::{
    Shape, Target, collection_mut, demote_primaries, existing_collection_mut, is_primary,
};
use crate::config::PatchConfig;
use crate::document::{
    DocumentObject, from_document, get_ci, get_ci_mut, insert_ci, object_entry, remove_ci,
    to_document, value_kind,
};
use crate::error::{ScimError, ScimResult};
use crate::filter::{AttributeReference, CompareOperator, CompareValue, FilterExpression};
use crate::schema::{
    AttributeContainer, AttributeDefinition, ResourceSchema, Schema, check_element,
    check_single_primary,
};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Schema-aware PATCH processor for one resource type.
#[derive(Debug, Clone)]
pub struct PatchEngine<'s> {
    schema: &'s ResourceSchema,
    config: PatchConfig,
}

impl<'s> PatchEngine<'s> {
    pub fn new(schema: &'s ResourceSchema) -> Self {
        Self::with_config(schema, PatchConfig::default())
    }

    pub fn with_config(schema: &'s ResourceSchema, config: PatchConfig) -> Self {
        Self { schema, config }
    }

    pub fn schema(&self) -> &'s ResourceSchema {
        self.schema
    }

    pub fn config(&self) -> &PatchConfig {
        &self.config
    }

    /// Apply `operations` in order. On error `document` is left untouched.
    pub fn apply(&self, document: &mut Value, operations: &[PatchOperation]) -> ScimResult<()> {
        *document = self.apply_to_copy(document, operations)?;
        Ok(())
    }

    /// Apply `operations` to a copy of `document` and return the copy.
    pub fn apply_to_copy(&self, document: &Value, operations: &[PatchOperation]) -> ScimResult<Value> {
        let mut working = document.clone();
        for (index, operation) in operations.iter().enumerate() {
            if let Err(error) = self.apply_operation(&mut working, operation) {
                log::debug!(
                    "PATCH operation {} ({}) on {} failed, discarding the batch: {}",
                    index,
                    operation,
                    self.schema.name,
                    error
                );
                return Err(error);
            }
        }
        log::debug!(
            "Applied {} PATCH operation(s) to {} resource",
            operations.len(),
            self.schema.name
        );
        Ok(working)
    }

    /// Validate a request body and apply its operations.
    pub fn apply_request(&self, document: &mut Value, request: &PatchRequest) -> ScimResult<()> {
        request.validate()?;
        self.apply(document, &request.operations)
    }

    /// Patch a typed resource through its document form.
    pub fn apply_to_resource<T>(&self, resource: &T, operations: &[PatchOperation]) -> ScimResult<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let document = to_document(resource)?;
        let patched = self.apply_to_copy(&document, operations)?;
        from_document(patched)
    }

    /// Apply one operation in place.
    ///
    /// Unlike [`apply`](Self::apply), a failure may leave earlier steps of a
    /// bulk or multi-value operation applied.
    pub fn apply_operation(&self, document: &mut Value, operation: &PatchOperation) -> ScimResult<()> {
        let root = document
            .as_object_mut()
            .ok_or_else(|| ScimError::invalid_syntax("A resource document must be a JSON object"))?;
        log::trace!("Applying PATCH operation {}", operation);
        self.execute(
            root,
            operation.op,
            operation.path.as_ref(),
            operation.value.as_ref(),
        )
    }

    fn execute(
        &self,
        doc: &mut DocumentObject,
        op: PatchOperationType,
        path: Option<&PatchOperationPath>,
        value: Option<&Value>,
    ) -> ScimResult<()> {
        let Some(path) = path else {
            return self.execute_bulk(doc, op, value, None);
        };

        if let Some(extension) = self.named_extension(path) {
            return self.execute_extension(doc, op, extension, value);
        }

        if op == PatchOperationType::Remove && self.config.normalize_member_removal {
            if let Some(ids) = member_removal_ids(path, value) {
                log::debug!(
                    "Rewriting removal of {} value(s) from '{}' into filtered removals",
                    ids.len(),
                    path
                );
                for id in ids {
                    let filtered = path.with_filter(FilterExpression::comparison(
                        AttributeReference::new("value"),
                        CompareOperator::Eq,
                        id,
                    ));
                    self.execute(doc, op, Some(&filtered), None)?;
                }
                return Ok(());
            }
        }

        let target = Target::resolve(self.schema, path)?;

        // add or replace with null clears the target
        let value = match (op, value) {
            (PatchOperationType::Remove, _) | (_, Some(Value::Null)) => None,
            (_, Some(value)) => Some(value),
            (_, None) => {
                return Err(ScimError::invalid_value(
                    path.to_string(),
                    format!("'{}' requires a value", op),
                ));
            }
        };

        let owner = self.owner(doc, &target, value.is_some())?;
        target.check_mutability(owner.as_deref())?;
        let Some(owner) = owner else {
            log::debug!("Nothing to remove at '{}'", path);
            return Ok(());
        };

        match (op, value) {
            (PatchOperationType::Add, Some(value)) => {
                self.check_value(&target, value)?;
                self.add(owner, &target, path, value)
            }
            (PatchOperationType::Replace, Some(value)) => {
                self.check_value(&target, value)?;
                self.replace(owner, &target, path, value)
            }
            _ => self.remove(owner, &target, path),
        }
    }

    fn check_value(&self, target: &Target<'_>, value: &Value) -> ScimResult<()> {
        if self.config.enforce_value_types {
            target.check_value(value)?;
        }
        Ok(())
    }

    /// Expand a path-less value object into one operation per attribute.
    fn execute_bulk(
        &self,
        doc: &mut DocumentObject,
        op: PatchOperationType,
        value: Option<&Value>,
        extension: Option<&'s Schema>,
    ) -> ScimResult<()> {
        let location = extension.map_or("", |schema| schema.id.as_str());
        if op == PatchOperationType::Remove {
            return Err(ScimError::no_target(location));
        }
        let Some(Value::Object(entries)) = value else {
            return Err(ScimError::invalid_value(
                location,
                format!("'{}' without a path requires an object value", op),
            ));
        };

        for (key, entry) in entries {
            if extension.is_none() {
                if key.eq_ignore_ascii_case("schemas") {
                    log::trace!("Ignoring 'schemas' in a path-less {}", op);
                    continue;
                }
                if let Some(nested) = self.schema.get_extension(key) {
                    self.execute_bulk(doc, op, Some(entry), Some(nested))?;
                    continue;
                }
            }

            let text = match extension {
                Some(schema) => format!("{}:{}", schema.id, key),
                None => key.clone(),
            };
            let path = PatchOperationPath::parse_with(&text, &self.config.filter)?;
            self.execute(doc, op, Some(&path), Some(entry))?;
        }
        Ok(())
    }

    fn named_extension(&self, path: &PatchOperationPath) -> Option<&'s Schema> {
        let urn = path.extension_urn()?;
        self.schema.get_extension(&urn)
    }

    fn execute_extension(
        &self,
        doc: &mut DocumentObject,
        op: PatchOperationType,
        extension: &'s Schema,
        value: Option<&Value>,
    ) -> ScimResult<()> {
        if op != PatchOperationType::Remove {
            return self.execute_bulk(doc, op, value, Some(extension));
        }

        if remove_ci(doc, &extension.id).is_some() {
            log::debug!("Removed extension {}", extension.id);
            if let Some(schemas) = get_ci_mut(doc, "schemas").and_then(Value::as_array_mut) {
                schemas.retain(|urn| {
                    !urn
                        .as_str()
                        .is_some_and(|urn| urn.eq_ignore_ascii_case(&extension.id))
                });
            }
        }
        Ok(())
    }

    /// The object holding the target attribute: the document itself, or the
    /// extension object, created on write.
    fn owner<'d>(
        &self,
        doc: &'d mut DocumentObject,
        target: &Target<'s>,
        writing: bool,
    ) -> ScimResult<Option<&'d mut DocumentObject>> {
        let Some(urn) = target.resolved.extension else {
            return Ok(Some(doc));
        };
        if !writing {
            return Ok(get_ci_mut(doc, urn).and_then(Value::as_object_mut));
        }

        self.list_schema(doc, urn);
        object_entry(doc, urn).map(Some).ok_or_else(|| {
            ScimError::invalid_value(urn, "extension attributes must be held in an object")
        })
    }

    /// Make sure `schemas` names an extension that is about to be written.
    fn list_schema(&self, doc: &mut DocumentObject, urn: &str) {
        let base = self.schema.base.id.clone();
        let Ok(schemas) = collection_mut(doc, "schemas") else {
            return;
        };
        let listed = |id: &str| {
            schemas
                .iter()
                .any(|entry| entry.as_str().is_some_and(|entry| entry.eq_ignore_ascii_case(id)))
        };
        let missing_base = schemas.is_empty();
        let missing_urn = !listed(urn);
        if missing_base {
            schemas.push(Value::String(base));
        }
        if missing_urn {
            log::trace!("Adding {} to schemas", urn);
            schemas.push(Value::String(urn.to_string()));
        }
    }

    fn add(
        &self,
        owner: &mut DocumentObject,
        target: &Target<'s>,
        path: &PatchOperationPath,
        value: &Value,
    ) -> ScimResult<()> {
        let attribute = target.attribute();
        match (&target.shape, target.sub_attribute()) {
            (Shape::Single, None) => {
                if attribute.is_complex() {
                    if let (Some(Value::Object(existing)), Value::Object(update)) =
                        (get_ci_mut(owner, &attribute.name), value)
                    {
                        merge(existing, update);
                        return Ok(());
                    }
                }
                insert_ci(owner, &attribute.name, value.clone());
            }
            (Shape::Single, Some(sub)) => {
                let parent = object_entry(owner, &attribute.name).ok_or_else(|| {
                    ScimError::invalid_value(&attribute.name, "existing value is not an object")
                })?;
                insert_ci(parent, &sub.name, value.clone());
            }
            (Shape::Collection, _) => add_to_collection(owner, attribute, value)?,
            (Shape::Filtered(_), sub) => {
                let elements = collection_mut(owner, &attribute.name)?;
                let matched = target.matching(elements);

                if matched.is_empty() {
                    let element = synthesize_element(attribute, path, sub, value)?;
                    if target.sets_primary(value) || is_primary(&element) {
                        demote_primaries(elements, None);
                    }
                    log::debug!("No element matched '{}', appending a new one", path);
                    elements.push(element);
                    return Ok(());
                }

                set_on_matches(elements, &matched, target, path, value, |element, value| {
                    match sub {
                        Some(sub) => insert_ci(element, &sub.name, value.clone()),
                        None => {
                            if let Value::Object(update) = value {
                                merge(element, update);
                            }
                        }
                    }
                    Ok(())
                })?;
            }
        }
        Ok(())
    }

    fn replace(
        &self,
        owner: &mut DocumentObject,
        target: &Target<'s>,
        path: &PatchOperationPath,
        value: &Value,
    ) -> ScimResult<()> {
        let attribute = target.attribute();
        match (&target.shape, target.sub_attribute()) {
            (Shape::Single, None) => insert_ci(owner, &attribute.name, value.clone()),
            (Shape::Single, Some(sub)) => {
                let parent = get_ci_mut(owner, &attribute.name)
                    .and_then(Value::as_object_mut)
                    .ok_or_else(|| ScimError::no_target(path.to_string()))?;
                insert_ci(parent, &sub.name, value.clone());
            }
            (Shape::Collection, _) => {
                let elements = match value {
                    Value::Array(items) => {
                        check_single_primary(attribute, items)?;
                        value.clone()
                    }
                    single => Value::Array(vec![single.clone()]),
                };
                insert_ci(owner, &attribute.name, elements);
            }
            (Shape::Filtered(_), sub) => {
                let elements = existing_collection_mut(owner, &attribute.name)
                    .ok_or_else(|| ScimError::no_target(path.to_string()))?;
                let matched = target.matching(elements);
                if matched.is_empty() {
                    return Err(ScimError::no_target(path.to_string()));
                }

                let filtered = target.has_filter();
                let swaps_elements = match sub {
                    Some(sub) => {
                        filtered
                            && matched.iter().any(|&index| {
                                elements[index]
                                    .as_object()
                                    .is_some_and(|element| find_sub(element, &sub.name).is_none())
                            })
                    }
                    None => true,
                };
                if swaps_elements {
                    self.check_replacement_element(attribute, value)?;
                }

                set_on_matches(elements, &matched, target, path, value, |element, value| {
                    match sub {
                        Some(sub) if filtered && find_sub(element, &sub.name).is_none() => {
                            log::warn!(
                                "Element selected by '{}' has no '{}', replacing the whole element",
                                path,
                                sub.name
                            );
                            return Err(value.clone());
                        }
                        Some(sub) => insert_ci(element, &sub.name, value.clone()),
                        None => return Err(value.clone()),
                    }
                    Ok(())
                })?;
            }
        }
        Ok(())
    }

    /// A value standing in for a whole element must be shaped like one.
    fn check_replacement_element(&self, attribute: &AttributeDefinition, value: &Value) -> ScimResult<()> {
        if attribute.is_complex() && !value.is_object() {
            return Err(ScimError::invalid_value(
                &attribute.name,
                format!(
                    "replacing a whole '{}' element needs an object, got {}",
                    attribute.name,
                    value_kind(value)
                ),
            ));
        }
        if self.config.enforce_value_types {
            check_element(attribute, value)?;
        }
        Ok(())
    }

    fn remove(
        &self,
        owner: &mut DocumentObject,
        target: &Target<'s>,
        path: &PatchOperationPath,
    ) -> ScimResult<()> {
        let attribute = target.attribute();
        match (&target.shape, target.sub_attribute()) {
            (Shape::Single, Some(sub)) => {
                let parent = get_ci_mut(owner, &attribute.name)
                    .and_then(Value::as_object_mut)
                    .ok_or_else(|| ScimError::no_target(path.to_string()))?;
                remove_ci(parent, &sub.name);
            }
            (Shape::Single, None) | (Shape::Collection, _) => {
                remove_ci(owner, &attribute.name);
            }
            (Shape::Filtered(_), sub) => {
                let Some(elements) = existing_collection_mut(owner, &attribute.name) else {
                    log::debug!("Nothing to remove at '{}'", path);
                    return Ok(());
                };
                let matched = target.matching(elements);
                log::trace!("'{}' selected {} element(s)", path, matched.len());

                match sub {
                    Some(sub) => {
                        for index in matched {
                            if let Some(element) = elements[index].as_object_mut() {
                                remove_ci(element, &sub.name);
                            }
                        }
                    }
                    None => {
                        let mut index = 0;
                        elements.retain(|_| {
                            let keep = !matched.contains(&index);
                            index += 1;
                            keep
                        });
                        if elements.is_empty() {
                            remove_ci(owner, &attribute.name);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Append the elements of `value` that are not already in the collection.
fn add_to_collection(
    owner: &mut DocumentObject,
    attribute: &AttributeDefinition,
    value: &Value,
) -> ScimResult<()> {
    let incoming = match value {
        Value::Array(items) => items.as_slice(),
        single => std::slice::from_ref(single),
    };
    if incoming.is_empty() {
        return Ok(());
    }
    check_single_primary(attribute, incoming)?;

    let elements = collection_mut(owner, &attribute.name)?;
    let mut fresh: Vec<Value> = Vec::with_capacity(incoming.len());
    for item in incoming {
        if elements.contains(item) || fresh.contains(item) {
            log::trace!("'{}' already holds {}", attribute.name, item);
            continue;
        }
        fresh.push(item.clone());
    }

    if attribute.has_primary() && fresh.iter().any(is_primary) {
        demote_primaries(elements, None);
    }
    elements.extend(fresh);
    Ok(())
}

/// Write `value` into each matched element through `write`. A writer that
/// returns `Err(replacement)` swaps the whole element for `replacement`.
fn set_on_matches<F>(
    elements: &mut [Value],
    matched: &[usize],
    target: &Target<'_>,
    path: &PatchOperationPath,
    value: &Value,
    write: F,
) -> ScimResult<()>
where
    F: Fn(&mut DocumentObject, &Value) -> Result<(), Value>,
{
    if target.sets_primary(value) {
        if matched.len() > 1 {
            return Err(ScimError::invalid_value(
                path.to_string(),
                format!(
                    "cannot mark {} elements primary, the filter must select one",
                    matched.len()
                ),
            ));
        }
        demote_primaries(elements, matched.first().copied());
    }

    for &index in matched {
        let element = &mut elements[index];
        let Some(object) = element.as_object_mut() else {
            continue;
        };
        if let Err(replacement) = write(object, value) {
            *element = replacement;
        }
    }
    Ok(())
}

/// Build the element an `add` through an unmatched equality filter creates:
/// `emails[type eq "work"].value` with "x" becomes `{"type": "work", "value": "x"}`.
fn synthesize_element(
    attribute: &AttributeDefinition,
    path: &PatchOperationPath,
    sub: Option<&AttributeDefinition>,
    value: &Value,
) -> ScimResult<Value> {
    let Some(filter) = &path.filter else {
        return Err(ScimError::no_target(path.to_string()));
    };
    let FilterExpression::Comparison {
        path: compared,
        operator: CompareOperator::Eq,
        value: expected,
    } = filter
    else {
        return Err(ScimError::unsupported_filter(format!(
            "No element matches '{}' and only a single equality filter describes a new one",
            filter
        )));
    };
    if compared.sub_attribute_name.is_some() || matches!(expected, CompareValue::Null) {
        return Err(ScimError::unsupported_filter(format!(
            "Cannot build a new '{}' element from '{}'",
            attribute.name, filter
        )));
    }

    let key = attribute
        .get_attribute(&compared.attribute_name)
        .map_or_else(|| compared.attribute_name.clone(), |sub| sub.name.clone());
    let mut element = Map::new();
    element.insert(key, expected.to_json());

    match (sub, value) {
        (Some(sub), value) => insert_ci(&mut element, &sub.name, value.clone()),
        (None, Value::Object(update)) => merge(&mut element, update),
        (None, other) => {
            return Err(ScimError::invalid_value(
                &attribute.name,
                format!("expected an object to add as a new element, got {}", other),
            ));
        }
    }
    Ok(Value::Object(element))
}

/// The ids of a removal written as `"value": [{"value": id}, ...]` with no
/// value filter in the path.
fn member_removal_ids(path: &PatchOperationPath, value: Option<&Value>) -> Option<Vec<CompareValue>> {
    if path.filter.is_some() || path.attribute.sub_attribute_name.is_some() {
        return None;
    }
    let items = value?.as_array()?;
    if items.is_empty() {
        return None;
    }

    items
        .iter()
        .map(|item| {
            let object = item.as_object()?;
            let (key, id) = object.iter().next()?;
            if object.len() != 1 || !key.eq_ignore_ascii_case("value") {
                return None;
            }
            match id {
                Value::String(_) | Value::Number(_) | Value::Bool(_) => CompareValue::from_json(id),
                _ => None,
            }
        })
        .collect()
}

fn merge(existing: &mut DocumentObject, update: &DocumentObject) {
    for (key, value) in update {
        insert_ci(existing, key, value.clone());
    }
}

fn find_sub<'a>(element: &'a DocumentObject, name: &str) -> Option<&'a Value> {
    get_ci(element, name)
}
