//! Fluent builders for test documents and PATCH operations.

use scim_patch::{PatchOperation, PatchOperationType};
use serde_json::{Value, json};

pub const ENTERPRISE_URN: &str = "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User";

/// Builder for User documents
#[derive(Debug, Clone)]
pub struct UserBuilder {
    data: Value,
}

impl UserBuilder {
    /// Minimal valid User
    pub fn new() -> Self {
        Self {
            data: json!({
                "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
                "id": "2819c223-7f76-453a-919d-413861904646",
                "userName": "bjensen@example.com",
                "meta": {
                    "resourceType": "User",
                    "created": "2010-01-23T04:56:22Z",
                    "lastModified": "2011-05-13T04:42:34Z"
                }
            }),
        }
    }

    pub fn with(mut self, attribute: &str, value: Value) -> Self {
        self.data[attribute] = value;
        self
    }

    pub fn without(mut self, attribute: &str) -> Self {
        if let Some(obj) = self.data.as_object_mut() {
            obj.shift_remove(attribute);
        }
        self
    }

    pub fn with_name(self, given: &str, family: &str) -> Self {
        self.with("name", json!({"givenName": given, "familyName": family}))
    }

    /// Emails as `(type, value, primary)`
    pub fn with_emails(self, emails: &[(&str, &str, bool)]) -> Self {
        self.with("emails", elements(emails))
    }

    /// Phone numbers as `(type, value, primary)`
    pub fn with_phone_numbers(self, numbers: &[(&str, &str, bool)]) -> Self {
        self.with("phoneNumbers", elements(numbers))
    }

    pub fn with_enterprise(mut self, extension: Value) -> Self {
        self.data["schemas"] = json!([
            "urn:ietf:params:scim:schemas:core:2.0:User",
            ENTERPRISE_URN
        ]);
        self.data[ENTERPRISE_URN] = extension;
        self
    }

    pub fn build(self) -> Value {
        self.data
    }
}

impl Default for UserBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn elements(entries: &[(&str, &str, bool)]) -> Value {
    Value::Array(
        entries
            .iter()
            .map(|(kind, value, primary)| {
                if *primary {
                    json!({"type": kind, "value": value, "primary": true})
                } else {
                    json!({"type": kind, "value": value})
                }
            })
            .collect(),
    )
}

/// Builder for Group documents
#[derive(Debug, Clone)]
pub struct GroupBuilder {
    data: Value,
}

impl GroupBuilder {
    pub fn new(display_name: &str) -> Self {
        Self {
            data: json!({
                "schemas": ["urn:ietf:params:scim:schemas:core:2.0:Group"],
                "id": "e9e30dba-f08f-4109-8486-d5c6a331660a",
                "displayName": display_name
            }),
        }
    }

    pub fn with_members(mut self, ids: &[&str]) -> Self {
        self.data["members"] = Value::Array(
            ids.iter()
                .map(|id| json!({"value": id, "display": format!("User {}", id)}))
                .collect(),
        );
        self
    }

    pub fn build(self) -> Value {
        self.data
    }
}

/// Builder for a list of PATCH operations
#[derive(Debug, Default)]
pub struct PatchBuilder {
    operations: Vec<PatchOperation>,
}

impl PatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, path: &str, value: Value) -> Self {
        self.operations
            .push(PatchOperation::add(path, value).expect("valid add path"));
        self
    }

    pub fn replace(mut self, path: &str, value: Value) -> Self {
        self.operations
            .push(PatchOperation::replace(path, value).expect("valid replace path"));
        self
    }

    pub fn remove(mut self, path: &str) -> Self {
        self.operations
            .push(PatchOperation::remove(path).expect("valid remove path"));
        self
    }

    pub fn remove_with_value(mut self, path: &str, value: Value) -> Self {
        self.operations
            .push(PatchOperation::remove_with_value(path, value).expect("valid remove path"));
        self
    }

    pub fn bulk(mut self, op: PatchOperationType, value: Value) -> Self {
        self.operations.push(PatchOperation::bulk(op, value));
        self
    }

    pub fn build(self) -> Vec<PatchOperation> {
        self.operations
    }
}
