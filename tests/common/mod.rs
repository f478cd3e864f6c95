//! Common test utilities for filter and PATCH testing.

use scim_patch::schema::{ResourceSchema, SchemaRegistry};
use scim_patch::{PatchEngine, PatchOperation, ScimResult};
use serde_json::Value;

pub mod builders;
pub mod fixtures;

/// Route `log` output through the test harness. Safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn user_schema() -> ResourceSchema {
    SchemaRegistry::new()
        .and_then(|registry| registry.resource_schema("User"))
        .expect("User resource schema")
}

pub fn group_schema() -> ResourceSchema {
    SchemaRegistry::new()
        .and_then(|registry| registry.resource_schema("Group"))
        .expect("Group resource schema")
}

/// Apply `operations` to a User document with the default engine.
pub fn patch_user(document: &mut Value, operations: &[PatchOperation]) -> ScimResult<()> {
    init_logging();
    let schema = user_schema();
    PatchEngine::new(&schema).apply(document, operations)
}

/// Apply `operations` to a Group document with the default engine.
pub fn patch_group(document: &mut Value, operations: &[PatchOperation]) -> ScimResult<()> {
    init_logging();
    let schema = group_schema();
    PatchEngine::new(&schema).apply(document, operations)
}

/// Evaluate a filter against a User document.
pub fn user_matches(filter: &str, document: &Value) -> bool {
    init_logging();
    let schema = user_schema();
    scim_patch::filter::matches(filter, &schema, document).expect("filter should parse")
}

/// Assert that a result failed with the given `ScimError` pattern.
#[macro_export]
macro_rules! assert_scim_error {
    ($result:expr, $pattern:pat) => {
        match $result {
            Err($pattern) => {}
            Ok(_) => panic!(
                "Expected {}, but the operation succeeded",
                stringify!($pattern)
            ),
            Err(other) => panic!("Expected {}, got {:?}", stringify!($pattern), other),
        }
    };
}

/// Assert that a result failed with a message containing a substring.
#[macro_export]
macro_rules! assert_error_message_contains {
    ($result:expr, $substring:expr) => {
        match $result {
            Err(err) => assert!(
                err.to_string().contains($substring),
                "Error message '{}' does not contain '{}'",
                err,
                $substring
            ),
            Ok(_) => panic!(
                "Expected error containing '{}', but the operation succeeded",
                $substring
            ),
        }
    };
}
