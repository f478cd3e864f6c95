//! Document value model.
//!
//! A resource under filter or patch is handled in its generic JSON form:
//! [`serde_json::Value`] is the tagged union (null, bool, number, string,
//! object, array) and the crate enables `preserve_order`, so objects keep
//! their key order through a patch. Attribute names are case-insensitive in
//! SCIM while JSON keys are not; the helpers here bridge that gap.

use crate::error::ScimResult;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// A generic resource value.
pub type DocumentValue = Value;

/// An object node of a document.
pub type DocumentObject = Map<String, Value>;

/// Convert a typed resource into a fresh document.
pub fn to_document<T: Serialize>(resource: &T) -> ScimResult<DocumentValue> {
    Ok(serde_json::to_value(resource)?)
}

/// Convert a document back into a typed resource.
pub fn from_document<T: DeserializeOwned>(document: DocumentValue) -> ScimResult<T> {
    Ok(serde_json::from_value(document)?)
}

/// The key actually used in `object` for an attribute name, if any.
pub fn find_key<'a>(object: &'a DocumentObject, name: &str) -> Option<&'a str> {
    if object.contains_key(name) {
        return object.get_key_value(name).map(|(key, _)| key.as_str());
    }
    object
        .keys()
        .find(|key| key.eq_ignore_ascii_case(name))
        .map(String::as_str)
}

/// Read an attribute, ignoring case in its name.
pub fn get_ci<'a>(object: &'a DocumentObject, name: &str) -> Option<&'a Value> {
    find_key(object, name).and_then(|key| object.get(key))
}

/// Mutable counterpart of [`get_ci`].
pub fn get_ci_mut<'a>(object: &'a mut DocumentObject, name: &str) -> Option<&'a mut Value> {
    let key = find_key(object, name)?.to_string();
    object.get_mut(&key)
}

/// Write an attribute, reusing the existing key spelling when present.
pub fn insert_ci(object: &mut DocumentObject, name: &str, value: Value) {
    let key = find_key(object, name).unwrap_or(name).to_string();
    object.insert(key, value);
}

/// Remove an attribute, ignoring case, keeping the order of the other keys.
pub fn remove_ci(object: &mut DocumentObject, name: &str) -> Option<Value> {
    let key = find_key(object, name)?.to_string();
    object.shift_remove(&key)
}

/// Fetch the object stored under `name`, creating an empty one when absent
/// or null. Returns `None` when a non-object value is in the way.
pub fn object_entry<'a>(object: &'a mut DocumentObject, name: &str) -> Option<&'a mut DocumentObject> {
    let key = find_key(object, name).unwrap_or(name).to_string();
    let slot = object.entry(key).or_insert(Value::Null);
    if slot.is_null() {
        *slot = Value::Object(Map::new());
    }
    slot.as_object_mut()
}

/// Whether a value is present: held and not null. Empty strings, arrays
/// and objects are present values.
pub fn is_present(value: Option<&Value>) -> bool {
    value.is_some_and(|value| !value.is_null())
}

/// Get the type name of a JSON value for error messages.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "decimal",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
