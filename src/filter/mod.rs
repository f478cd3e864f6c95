//! SCIM filter grammar (RFC 7644 §3.4.2.2).
//!
//! Text goes through [`lexer::tokenize`], [`parser::parse_filter`] builds a
//! [`FilterExpression`], and [`predicate::compile`] turns that into a
//! [`Predicate`] bound to a schema.
//!
//! ```
//! use scim_patch::filter;
//! use scim_patch::schema::SchemaRegistry;
//! use serde_json::json;
//!
//! let registry = SchemaRegistry::new().unwrap();
//! let user = registry.resource_schema("User").unwrap();
//! let doc = json!({"userName": "bjensen", "emails": [{"type": "work", "value": "b@example.com"}]});
//!
//! assert!(filter::matches("emails[type eq \"work\"]", &user, &doc).unwrap());
//! ```

pub mod ast;
pub mod compare;
pub mod lexer;
pub mod parser;
pub mod predicate;

pub use ast::{AttributeReference, CompareOperator, CompareValue, FilterExpression, LogicalOperator};
pub use compare::{check_operator, compare_strings, compare_value};
pub use parser::{parse_filter, parse_filter_with};
pub use predicate::{Predicate, compile, compile_strict, matches};
