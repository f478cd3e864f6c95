//! End-to-end PATCH scenarios.

use crate::common::builders::{ENTERPRISE_URN, GroupBuilder, PatchBuilder, UserBuilder};
use crate::common::fixtures::rfc_examples;
use crate::common::{init_logging, patch_group, patch_user, user_schema};
use scim_patch::{
    PatchConfig, PatchEngine, PatchOperation, PatchOperationType, PatchRequest, ScimError,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[test]
fn test_add_work_email_updates_the_single_match() {
    let mut user = UserBuilder::new()
        .with_emails(&[("work", "old@example.com", false), ("home", "a@x.com", false)])
        .build();

    let ops = PatchBuilder::new()
        .add("emails[type eq \"work\"].value", json!("new@example.com"))
        .build();
    patch_user(&mut user, &ops).unwrap();

    assert_eq!(
        user["emails"],
        json!([
            {"type": "work", "value": "new@example.com"},
            {"type": "home", "value": "a@x.com"}
        ])
    );
}

#[test]
fn test_add_work_email_appends_when_nothing_matches() {
    let mut user = UserBuilder::new()
        .with_emails(&[("home", "a@x.com", false)])
        .build();

    let ops = PatchBuilder::new()
        .add("emails[type eq \"work\"].value", json!("new@example.com"))
        .build();
    patch_user(&mut user, &ops).unwrap();

    assert_eq!(
        user["emails"],
        json!([
            {"type": "home", "value": "a@x.com"},
            {"type": "work", "value": "new@example.com"}
        ])
    );

    // and when the collection is missing altogether
    let mut bare = UserBuilder::new().build();
    patch_user(&mut bare, &ops).unwrap();
    assert_eq!(bare["emails"], json!([{"type": "work", "value": "new@example.com"}]));
}

#[test]
fn test_add_through_composite_filter_without_match_is_unsupported() {
    let mut user = UserBuilder::new().build();
    let ops = PatchBuilder::new()
        .add(
            "emails[type eq \"work\" and primary eq true].value",
            json!("new@example.com"),
        )
        .build();
    assert_scim_error!(patch_user(&mut user, &ops), ScimError::UnsupportedFilter { .. });
}

#[test]
fn test_remove_home_phone_keeps_order() {
    let mut user = UserBuilder::new()
        .with_phone_numbers(&[
            ("work", "555-0001", false),
            ("home", "555-0002", false),
            ("mobile", "555-0003", false),
        ])
        .build();

    let ops = PatchBuilder::new()
        .remove("phoneNumbers[type eq \"home\"]")
        .build();
    patch_user(&mut user, &ops).unwrap();

    assert_eq!(
        user["phoneNumbers"],
        json!([
            {"type": "work", "value": "555-0001"},
            {"type": "mobile", "value": "555-0003"}
        ])
    );
}

#[test]
fn test_member_removal_quirk_matches_filtered_removals() {
    let group = GroupBuilder::new("Tour Guides")
        .with_members(&["u1", "u2", "u3"])
        .build();

    let mut quirky = group.clone();
    let ops = PatchBuilder::new()
        .remove_with_value("members", json!([{"value": "u1"}, {"value": "u2"}]))
        .build();
    patch_group(&mut quirky, &ops).unwrap();

    let mut filtered = group;
    let ops = PatchBuilder::new()
        .remove("members[value eq \"u1\"]")
        .remove("members[value eq \"u2\"]")
        .build();
    patch_group(&mut filtered, &ops).unwrap();

    assert_eq!(quirky, filtered);
    assert_eq!(quirky["members"], json!([{"value": "u3", "display": "User u3"}]));
}

#[test]
fn test_member_removal_quirk_can_be_disabled() {
    init_logging();
    let schema = crate::common::group_schema();
    let engine = PatchEngine::with_config(
        &schema,
        PatchConfig::default().with_member_removal_normalization(false),
    );
    let mut group = GroupBuilder::new("Tour Guides").with_members(&["u1", "u2"]).build();
    let ops = PatchBuilder::new()
        .remove_with_value("members", json!([{"value": "u1"}]))
        .build();
    engine.apply(&mut group, &ops).unwrap();
    // plain removal of the whole attribute
    assert!(group.get("members").is_none());
}

#[test]
fn test_removing_the_last_member_drops_the_attribute() {
    let mut group = GroupBuilder::new("Solo").with_members(&["u1"]).build();
    let ops = PatchBuilder::new().remove("members[value eq \"u1\"]").build();
    patch_group(&mut group, &ops).unwrap();
    assert!(group.get("members").is_none());
}

#[test]
fn test_add_members_skips_existing_ones() {
    let mut group = rfc_examples::group_basic();
    let existing = group["members"][0].clone();
    let ops = PatchBuilder::new()
        .add("members", json!([existing, {"value": "u9", "display": "Nine"}]))
        .build();
    patch_group(&mut group, &ops).unwrap();
    assert_eq!(group["members"].as_array().unwrap().len(), 3);
    assert_eq!(group["members"][2]["value"], "u9");
}

#[test]
fn test_primary_moves_between_emails() {
    let mut user = rfc_examples::user_full();
    let ops = PatchBuilder::new()
        .add("emails[type eq \"home\"].primary", json!(true))
        .build();
    patch_user(&mut user, &ops).unwrap();

    assert_eq!(user["emails"][0]["primary"], json!(false));
    assert_eq!(user["emails"][1]["primary"], json!(true));
}

#[test]
fn test_adding_a_primary_element_demotes_the_others() {
    let mut user = rfc_examples::user_full();
    let ops = PatchBuilder::new()
        .add("emails", json!({"type": "other", "value": "x@y.com", "primary": true}))
        .build();
    patch_user(&mut user, &ops).unwrap();

    let primaries: Vec<_> = user["emails"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|email| email["primary"] == json!(true))
        .collect();
    assert_eq!(primaries.len(), 1);
    assert_eq!(primaries[0]["value"], "x@y.com");
}

#[test]
fn test_primary_through_a_filter_matching_many_is_rejected() {
    let mut user = UserBuilder::new()
        .with_emails(&[("work", "a@x.com", true), ("work", "b@x.com", false)])
        .build();
    let ops = PatchBuilder::new()
        .replace("emails[type eq \"work\"].primary", json!(true))
        .build();
    assert_scim_error!(patch_user(&mut user, &ops), ScimError::InvalidValue { .. });
}

#[test]
fn test_replace_element_lacking_sub_attribute_replaces_whole_element() {
    init_logging();
    let schema = user_schema();
    let engine = PatchEngine::with_config(
        &schema,
        PatchConfig::default().with_value_type_enforcement(false),
    );
    let mut user = UserBuilder::new()
        .with_emails(&[("work", "a@x.com", false), ("home", "b@x.com", false)])
        .build();
    let ops = PatchBuilder::new()
        .replace(
            "emails[type eq \"work\"].display",
            json!({"type": "work", "value": "c@x.com", "display": "Work mail"}),
        )
        .build();
    engine.apply(&mut user, &ops).unwrap();
    assert_eq!(
        user["emails"],
        json!([
            {"type": "work", "value": "c@x.com", "display": "Work mail"},
            {"type": "home", "value": "b@x.com"}
        ])
    );
}

#[test]
fn test_whole_element_replacement_must_be_an_element() {
    let original = UserBuilder::new()
        .with_emails(&[("work", "a@x.com", false)])
        .build();
    let mut user = original.clone();
    let ops = PatchBuilder::new()
        .replace("emails[type eq \"work\"].display", json!("Work mail"))
        .build();
    assert_scim_error!(patch_user(&mut user, &ops), ScimError::InvalidValue { .. });
    assert_eq!(user, original);
}

#[test]
fn test_replace_primary_on_element_without_the_key_keeps_the_current_primary() {
    let original = UserBuilder::new()
        .with_emails(&[("home", "a@x.com", true), ("work", "b@x.com", false)])
        .build();

    let mut user = original.clone();
    let ops = PatchBuilder::new()
        .replace("emails[type eq \"work\"].primary", json!(true))
        .build();
    assert_scim_error!(patch_user(&mut user, &ops), ScimError::InvalidValue { .. });
    assert_eq!(user, original);

    // the same with type checks off still refuses to store a bare boolean
    init_logging();
    let schema = user_schema();
    let engine = PatchEngine::with_config(
        &schema,
        PatchConfig::default().with_value_type_enforcement(false),
    );
    assert_scim_error!(engine.apply(&mut user, &ops), ScimError::InvalidValue { .. });
    assert_eq!(user, original);
    assert_eq!(user["emails"][0]["primary"], json!(true));
}

#[test]
fn test_replace_primary_on_element_with_the_key_moves_it() {
    let mut user = UserBuilder::new()
        .with_emails(&[("home", "a@x.com", true), ("work", "b@x.com", false)])
        .build();
    user["emails"][1]["primary"] = json!(false);
    let ops = PatchBuilder::new()
        .replace("emails[type eq \"work\"].primary", json!(true))
        .build();
    patch_user(&mut user, &ops).unwrap();
    assert_eq!(user["emails"][0]["primary"], json!(false));
    assert_eq!(user["emails"][1]["primary"], json!(true));
}

#[test]
fn test_remove_primary_only_deletes_the_key() {
    let mut user = rfc_examples::user_full();
    let ops = PatchBuilder::new()
        .remove("emails[type eq \"work\"].primary")
        .build();
    patch_user(&mut user, &ops).unwrap();
    assert!(user["emails"][0].get("primary").is_none());
    assert!(user["emails"][1].get("primary").is_none());
}

#[test]
fn test_enterprise_extension_paths() {
    let mut user = UserBuilder::new().build();
    let ops = PatchBuilder::new()
        .add(&format!("{}:employeeNumber", ENTERPRISE_URN), json!("701984"))
        .add(&format!("{}:manager.value", ENTERPRISE_URN), json!("26118915"))
        .build();
    patch_user(&mut user, &ops).unwrap();

    assert_eq!(
        user[ENTERPRISE_URN],
        json!({"employeeNumber": "701984", "manager": {"value": "26118915"}})
    );
    assert_eq!(
        user["schemas"],
        json!(["urn:ietf:params:scim:schemas:core:2.0:User", ENTERPRISE_URN])
    );

    let ops = PatchBuilder::new()
        .replace(
            ENTERPRISE_URN,
            json!({"department": "Tour Operations", "employeeNumber": "1"}),
        )
        .build();
    patch_user(&mut user, &ops).unwrap();
    assert_eq!(user[ENTERPRISE_URN]["department"], "Tour Operations");
    assert_eq!(user[ENTERPRISE_URN]["employeeNumber"], "1");
    assert_eq!(user[ENTERPRISE_URN]["manager"]["value"], "26118915");

    let ops = PatchBuilder::new().remove(ENTERPRISE_URN).build();
    patch_user(&mut user, &ops).unwrap();
    assert!(user.get(ENTERPRISE_URN).is_none());
    assert_eq!(user["schemas"], json!(["urn:ietf:params:scim:schemas:core:2.0:User"]));
}

#[test]
fn test_manager_display_name_is_read_only() {
    let mut user = rfc_examples::user_enterprise();
    let ops = PatchBuilder::new()
        .replace(&format!("{}:manager.displayName", ENTERPRISE_URN), json!("Jane"))
        .build();
    assert_scim_error!(patch_user(&mut user, &ops), ScimError::Mutability { .. });
}

#[test]
fn test_bulk_form_expands_attributes_and_extensions() {
    let mut user = rfc_examples::user_full();
    let ops = PatchBuilder::new()
        .bulk(
            PatchOperationType::Replace,
            json!({
                "schemas": ["ignored"],
                "displayName": "Babs",
                "active": false,
                "name": {"givenName": "Barb"},
                ENTERPRISE_URN: {"costCenter": "4130"}
            }),
        )
        .build();
    patch_user(&mut user, &ops).unwrap();

    assert_eq!(user["displayName"], "Babs");
    assert_eq!(user["active"], false);
    assert_eq!(user["name"], json!({"givenName": "Barb"}));
    assert_eq!(user[ENTERPRISE_URN], json!({"costCenter": "4130"}));
    assert_eq!(user["schemas"][1], ENTERPRISE_URN);
}

#[test]
fn test_bulk_add_merges_complex_values() {
    let mut user = rfc_examples::user_full();
    let ops = PatchBuilder::new()
        .bulk(PatchOperationType::Add, json!({"name": {"givenName": "Barb"}}))
        .build();
    patch_user(&mut user, &ops).unwrap();
    assert_eq!(user["name"]["givenName"], "Barb");
    assert_eq!(user["name"]["familyName"], "Jensen");
}

#[test]
fn test_failed_batch_leaves_document_untouched() {
    let original = rfc_examples::user_full();
    let mut user = original.clone();
    let ops = PatchBuilder::new()
        .replace("displayName", json!("Changed"))
        .remove("phoneNumbers[type eq \"work\"]")
        .replace("id", json!("new-id"))
        .build();

    assert_scim_error!(patch_user(&mut user, &ops), ScimError::Mutability { .. });
    assert_eq!(user, original);
}

#[test]
fn test_request_body_end_to_end() {
    init_logging();
    let schema = user_schema();
    let request = PatchRequest::from_json(
        r#"{
            "schemas": ["urn:ietf:params:scim:api:messages:2.0:PatchOp"],
            "Operations": [
                {"op": "Replace", "path": "title", "value": "Lead Guide"},
                {"op": "add", "path": "addresses[type eq \"home\"].locality", "value": "Burbank"},
                {"op": "remove", "path": "phoneNumbers[type eq \"mobile\"]"}
            ]
        }"#,
    )
    .unwrap();

    let mut user = rfc_examples::user_full();
    PatchEngine::new(&schema).apply_request(&mut user, &request).unwrap();

    assert_eq!(user["title"], "Lead Guide");
    assert_eq!(user["addresses"][1]["locality"], "Burbank");
    assert_eq!(user["addresses"][0]["locality"], "Hollywood");
    assert_eq!(user["phoneNumbers"].as_array().unwrap().len(), 1);
}

#[test]
fn test_request_body_null_value_clears_the_target() {
    init_logging();
    let schema = user_schema();
    let request = PatchRequest::from_json(
        r#"{
            "schemas": ["urn:ietf:params:scim:api:messages:2.0:PatchOp"],
            "Operations": [
                {"op": "replace", "path": "nickName", "value": null},
                {"op": "add", "path": "name.middleName", "value": null}
            ]
        }"#,
    )
    .unwrap();

    let mut user = rfc_examples::user_full();
    PatchEngine::new(&schema).apply_request(&mut user, &request).unwrap();

    assert!(user.get("nickName").is_none());
    assert!(user["name"].get("middleName").is_none());
    assert_eq!(user["name"]["givenName"], "Barbara");
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Email {
    value: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    primary: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MiniUser {
    schemas: Vec<String>,
    user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(default)]
    emails: Vec<Email>,
}

#[test]
fn test_typed_resource_round_trip() {
    init_logging();
    let schema = user_schema();
    let user = MiniUser {
        schemas: vec!["urn:ietf:params:scim:schemas:core:2.0:User".to_string()],
        user_name: "bjensen".to_string(),
        title: None,
        emails: vec![Email {
            value: "a@x.com".to_string(),
            kind: Some("home".to_string()),
            primary: Some(true),
        }],
    };

    let ops = vec![
        PatchOperation::add("title", json!("Tour Guide")).unwrap(),
        PatchOperation::add("emails[type eq \"work\"].value", json!("b@example.com")).unwrap(),
    ];
    let patched = PatchEngine::new(&schema).apply_to_resource(&user, &ops).unwrap();

    assert_eq!(patched.title.as_deref(), Some("Tour Guide"));
    assert_eq!(patched.emails.len(), 2);
    assert_eq!(patched.emails[1].kind.as_deref(), Some("work"));
    // the input resource is never touched
    assert!(user.title.is_none());
}
