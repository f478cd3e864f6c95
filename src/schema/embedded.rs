//! Core SCIM schemas shipped with the crate.
//!
//! The User and Group schemas of RFC 7643 §4 and the Enterprise User
//! extension of §4.3, as plain JSON. Characteristics left out of an
//! attribute take their RFC 7643 §2.2 defaults when deserialized
//! (single-valued, optional, case-insensitive, readWrite).

pub const USER_SCHEMA_URN: &str = "urn:ietf:params:scim:schemas:core:2.0:User";
pub const GROUP_SCHEMA_URN: &str = "urn:ietf:params:scim:schemas:core:2.0:Group";
pub const ENTERPRISE_USER_SCHEMA_URN: &str =
    "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User";

/// Returns the core User schema as a JSON string.
pub fn core_user_schema() -> &'static str {
    r#"{
  "id": "urn:ietf:params:scim:schemas:core:2.0:User",
  "name": "User",
  "description": "User Account",
  "attributes": [
    { "name": "id", "type": "string", "caseExact": true, "mutability": "readOnly", "uniqueness": "server" },
    { "name": "externalId", "type": "string", "caseExact": true },
    { "name": "userName", "type": "string", "required": true, "uniqueness": "server" },
    { "name": "name", "type": "complex", "subAttributes": [
        { "name": "formatted", "type": "string" },
        { "name": "familyName", "type": "string" },
        { "name": "givenName", "type": "string" },
        { "name": "middleName", "type": "string" },
        { "name": "honorificPrefix", "type": "string" },
        { "name": "honorificSuffix", "type": "string" }
    ] },
    { "name": "displayName", "type": "string" },
    { "name": "nickName", "type": "string" },
    { "name": "profileUrl", "type": "reference" },
    { "name": "title", "type": "string" },
    { "name": "userType", "type": "string" },
    { "name": "preferredLanguage", "type": "string" },
    { "name": "locale", "type": "string" },
    { "name": "timezone", "type": "string" },
    { "name": "active", "type": "boolean" },
    { "name": "password", "type": "string", "mutability": "writeOnly" },
    { "name": "emails", "type": "complex", "multiValued": true, "subAttributes": [
        { "name": "value", "type": "string" },
        { "name": "display", "type": "string" },
        { "name": "type", "type": "string", "canonicalValues": ["work", "home", "other"] },
        { "name": "primary", "type": "boolean" }
    ] },
    { "name": "phoneNumbers", "type": "complex", "multiValued": true, "subAttributes": [
        { "name": "value", "type": "string" },
        { "name": "display", "type": "string" },
        { "name": "type", "type": "string", "canonicalValues": ["work", "home", "mobile", "fax", "pager", "other"] },
        { "name": "primary", "type": "boolean" }
    ] },
    { "name": "ims", "type": "complex", "multiValued": true, "subAttributes": [
        { "name": "value", "type": "string" },
        { "name": "display", "type": "string" },
        { "name": "type", "type": "string" },
        { "name": "primary", "type": "boolean" }
    ] },
    { "name": "photos", "type": "complex", "multiValued": true, "subAttributes": [
        { "name": "value", "type": "reference" },
        { "name": "display", "type": "string" },
        { "name": "type", "type": "string", "canonicalValues": ["photo", "thumbnail"] },
        { "name": "primary", "type": "boolean" }
    ] },
    { "name": "addresses", "type": "complex", "multiValued": true, "subAttributes": [
        { "name": "formatted", "type": "string" },
        { "name": "streetAddress", "type": "string" },
        { "name": "locality", "type": "string" },
        { "name": "region", "type": "string" },
        { "name": "postalCode", "type": "string" },
        { "name": "country", "type": "string" },
        { "name": "type", "type": "string", "canonicalValues": ["work", "home", "other"] },
        { "name": "primary", "type": "boolean" }
    ] },
    { "name": "groups", "type": "complex", "multiValued": true, "mutability": "readOnly", "subAttributes": [
        { "name": "value", "type": "string", "mutability": "readOnly" },
        { "name": "$ref", "type": "reference", "mutability": "readOnly" },
        { "name": "display", "type": "string", "mutability": "readOnly" },
        { "name": "type", "type": "string", "mutability": "readOnly" }
    ] },
    { "name": "entitlements", "type": "complex", "multiValued": true, "subAttributes": [
        { "name": "value", "type": "string" },
        { "name": "display", "type": "string" },
        { "name": "type", "type": "string" },
        { "name": "primary", "type": "boolean" }
    ] },
    { "name": "roles", "type": "complex", "multiValued": true, "subAttributes": [
        { "name": "value", "type": "string" },
        { "name": "display", "type": "string" },
        { "name": "type", "type": "string" },
        { "name": "primary", "type": "boolean" }
    ] },
    { "name": "x509Certificates", "type": "complex", "multiValued": true, "subAttributes": [
        { "name": "value", "type": "binary", "caseExact": true },
        { "name": "display", "type": "string" },
        { "name": "type", "type": "string" },
        { "name": "primary", "type": "boolean" }
    ] },
    { "name": "meta", "type": "complex", "mutability": "readOnly", "subAttributes": [
        { "name": "resourceType", "type": "string", "caseExact": true, "mutability": "readOnly" },
        { "name": "created", "type": "dateTime", "mutability": "readOnly" },
        { "name": "lastModified", "type": "dateTime", "mutability": "readOnly" },
        { "name": "location", "type": "reference", "mutability": "readOnly" },
        { "name": "version", "type": "string", "caseExact": true, "mutability": "readOnly" }
    ] }
  ]
}"#
}

/// Returns the core Group schema as a JSON string.
pub fn core_group_schema() -> &'static str {
    r#"{
  "id": "urn:ietf:params:scim:schemas:core:2.0:Group",
  "name": "Group",
  "description": "Group",
  "attributes": [
    { "name": "id", "type": "string", "caseExact": true, "mutability": "readOnly", "uniqueness": "server" },
    { "name": "externalId", "type": "string", "caseExact": true },
    { "name": "displayName", "type": "string", "required": true },
    { "name": "members", "type": "complex", "multiValued": true, "subAttributes": [
        { "name": "value", "type": "string", "mutability": "immutable" },
        { "name": "$ref", "type": "reference", "mutability": "immutable" },
        { "name": "type", "type": "string", "mutability": "immutable", "canonicalValues": ["User", "Group"] },
        { "name": "display", "type": "string", "mutability": "readOnly" }
    ] },
    { "name": "meta", "type": "complex", "mutability": "readOnly", "subAttributes": [
        { "name": "resourceType", "type": "string", "caseExact": true, "mutability": "readOnly" },
        { "name": "created", "type": "dateTime", "mutability": "readOnly" },
        { "name": "lastModified", "type": "dateTime", "mutability": "readOnly" },
        { "name": "location", "type": "reference", "mutability": "readOnly" },
        { "name": "version", "type": "string", "caseExact": true, "mutability": "readOnly" }
    ] }
  ]
}"#
}

/// Returns the Enterprise User extension schema as a JSON string.
pub fn enterprise_user_schema() -> &'static str {
    r#"{
  "id": "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User",
  "name": "EnterpriseUser",
  "description": "Enterprise User",
  "attributes": [
    { "name": "employeeNumber", "type": "string" },
    { "name": "costCenter", "type": "string" },
    { "name": "organization", "type": "string" },
    { "name": "division", "type": "string" },
    { "name": "department", "type": "string" },
    { "name": "manager", "type": "complex", "subAttributes": [
        { "name": "value", "type": "string" },
        { "name": "$ref", "type": "reference" },
        { "name": "displayName", "type": "string", "mutability": "readOnly" }
    ] }
  ]
}"#
}
