//! Attribute containers and reference resolution.
//!
//! Filters and PATCH paths name attributes through an [`AttributeReference`].
//! Whatever they are resolved against (a schema, the sub-attributes of a
//! complex attribute, or a resource type with its extensions) implements
//! [`AttributeContainer`].

use super::types::{AttributeDefinition, Schema};
use crate::filter::AttributeReference;

/// Anything that can answer "which attribute is called `name`?".
pub trait AttributeContainer {
    /// URN of the schema whose attributes this container exposes.
    fn schema_urn(&self) -> Option<&str> {
        None
    }

    /// Look up a directly contained attribute, ignoring case.
    fn get_attribute(&self, name: &str) -> Option<&AttributeDefinition>;

    /// Schema extension reachable through a urn-qualified reference.
    fn get_extension(&self, _urn: &str) -> Option<&Schema> {
        None
    }
}

impl AttributeContainer for Schema {
    fn schema_urn(&self) -> Option<&str> {
        Some(&self.id)
    }

    fn get_attribute(&self, name: &str) -> Option<&AttributeDefinition> {
        Schema::get_attribute(self, name)
    }
}

impl AttributeContainer for AttributeDefinition {
    fn get_attribute(&self, name: &str) -> Option<&AttributeDefinition> {
        AttributeDefinition::get_attribute(self, name)
    }
}

/// A resource type: its base schema plus the extensions attached to it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSchema {
    /// Resource type name, e.g. "User"
    pub name: String,
    /// Base schema
    pub base: Schema,
    /// Schema extensions, stored in the document under their URN
    pub extensions: Vec<Schema>,
}

impl ResourceSchema {
    pub fn new(name: impl Into<String>, base: Schema) -> Self {
        Self {
            name: name.into(),
            base,
            extensions: Vec::new(),
        }
    }

    pub fn with_extension(mut self, extension: Schema) -> Self {
        self.extensions.push(extension);
        self
    }
}

impl AttributeContainer for ResourceSchema {
    fn schema_urn(&self) -> Option<&str> {
        Some(&self.base.id)
    }

    fn get_attribute(&self, name: &str) -> Option<&AttributeDefinition> {
        self.base.get_attribute(name)
    }

    fn get_extension(&self, urn: &str) -> Option<&Schema> {
        self.extensions
            .iter()
            .find(|schema| schema.id.eq_ignore_ascii_case(urn))
    }
}

/// An [`AttributeReference`] resolved against a container.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedAttribute<'s> {
    /// URN of the extension object holding the attribute; `None` when the
    /// attribute sits at the top level of the document.
    pub extension: Option<&'s str>,
    pub attribute: &'s AttributeDefinition,
    pub sub_attribute: Option<&'s AttributeDefinition>,
}

impl<'s> ResolvedAttribute<'s> {
    /// The innermost attribute named by the reference.
    pub fn leaf(&self) -> &'s AttributeDefinition {
        self.sub_attribute.unwrap_or(self.attribute)
    }
}

/// Resolve a reference, following a urn prefix into a schema extension when
/// it does not name the container's own schema.
pub fn resolve<'s, C>(container: &'s C, reference: &AttributeReference) -> Option<ResolvedAttribute<'s>>
where
    C: AttributeContainer + ?Sized,
{
    let (extension, attribute) = match reference.urn.as_deref() {
        Some(urn)
            if container
                .schema_urn()
                .is_some_and(|own| own.eq_ignore_ascii_case(urn)) =>
        {
            (None, container.get_attribute(&reference.attribute_name)?)
        }
        Some(urn) => {
            let schema = container.get_extension(urn)?;
            (
                Some(schema.id.as_str()),
                schema.get_attribute(&reference.attribute_name)?,
            )
        }
        None => (None, container.get_attribute(&reference.attribute_name)?),
    };

    let sub_attribute = match reference.sub_attribute_name.as_deref() {
        Some(sub) => Some(attribute.get_attribute(sub)?),
        None => None,
    };

    Some(ResolvedAttribute {
        extension,
        attribute,
        sub_attribute,
    })
}
