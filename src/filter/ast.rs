//! Filter expression tree.
//!
//! Nodes are immutable values built once per parse. `Display` renders the
//! canonical filter text, which parses back to an equal tree.

use std::fmt;

/// Reference to an attribute, optionally schema-qualified and nested.
///
/// `urn:ietf:params:scim:schemas:core:2.0:User:name.givenName` splits into
/// the urn, `name` and `givenName`. Names compare case-insensitively.
#[derive(Debug, Clone, Eq)]
pub struct AttributeReference {
    pub urn: Option<String>,
    pub attribute_name: String,
    pub sub_attribute_name: Option<String>,
}

impl AttributeReference {
    pub fn new(attribute_name: impl Into<String>) -> Self {
        Self {
            urn: None,
            attribute_name: attribute_name.into(),
            sub_attribute_name: None,
        }
    }

    pub fn with_sub(attribute_name: impl Into<String>, sub_attribute_name: impl Into<String>) -> Self {
        Self {
            urn: None,
            attribute_name: attribute_name.into(),
            sub_attribute_name: Some(sub_attribute_name.into()),
        }
    }

    pub fn with_urn(mut self, urn: impl Into<String>) -> Self {
        self.urn = Some(urn.into());
        self
    }

    /// Parse the text of an attribute path token.
    ///
    /// Returns a description of the problem when the text is not a valid
    /// `[urn:]attr[.subAttr]` reference.
    pub fn parse(text: &str) -> Result<Self, String> {
        let (urn, local) = if text
            .get(..4)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("urn:"))
        {
            let split = text
                .rfind(':')
                .ok_or_else(|| format!("'{}' is not a valid attribute path", text))?;
            (Some(&text[..split]), &text[split + 1..])
        } else {
            (None, text)
        };

        let (attribute_name, sub_attribute_name) = match local.split_once('.') {
            Some((attr, sub)) => (attr, Some(sub)),
            None => (local, None),
        };

        if !is_attribute_name(attribute_name) {
            return Err(format!("'{}' is not a valid attribute name", attribute_name));
        }
        if let Some(sub) = sub_attribute_name {
            if !is_attribute_name(sub) {
                return Err(format!("'{}' is not a valid sub-attribute name", sub));
            }
        }

        Ok(Self {
            urn: urn.map(str::to_string),
            attribute_name: attribute_name.to_string(),
            sub_attribute_name: sub_attribute_name.map(str::to_string),
        })
    }

    /// The fully qualified name of a schema extension this reference would
    /// denote if it named the extension itself rather than an attribute.
    pub fn as_schema_urn(&self) -> Option<String> {
        match (&self.urn, &self.sub_attribute_name) {
            (Some(urn), None) => Some(format!("{}:{}", urn, self.attribute_name)),
            _ => None,
        }
    }
}

// ATTRNAME = ALPHA *(nameChar), plus "$ref" for reference sub-attributes
fn is_attribute_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '$' => chars
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
        _ => false,
    }
}

impl PartialEq for AttributeReference {
    fn eq(&self, other: &Self) -> bool {
        fn same(a: Option<&str>, b: Option<&str>) -> bool {
            match (a, b) {
                (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                (None, None) => true,
                _ => false,
            }
        }

        self.attribute_name.eq_ignore_ascii_case(&other.attribute_name)
            && same(self.urn.as_deref(), other.urn.as_deref())
            && same(
                self.sub_attribute_name.as_deref(),
                other.sub_attribute_name.as_deref(),
            )
    }
}

impl fmt::Display for AttributeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(urn) = &self.urn {
            write!(f, "{}:", urn)?;
        }
        write!(f, "{}", self.attribute_name)?;
        if let Some(sub) = &self.sub_attribute_name {
            write!(f, ".{}", sub)?;
        }
        Ok(())
    }
}

/// Comparison operators per RFC 7644 §3.4.2.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOperator {
    /// Equal
    Eq,
    /// Not equal
    Ne,
    /// Contains
    Co,
    /// Starts with
    Sw,
    /// Ends with
    Ew,
    /// Greater than
    Gt,
    /// Greater than or equal
    Ge,
    /// Less than
    Lt,
    /// Less than or equal
    Le,
}

impl CompareOperator {
    pub const ALL: [CompareOperator; 9] = [
        CompareOperator::Eq,
        CompareOperator::Ne,
        CompareOperator::Co,
        CompareOperator::Sw,
        CompareOperator::Ew,
        CompareOperator::Gt,
        CompareOperator::Ge,
        CompareOperator::Lt,
        CompareOperator::Le,
    ];

    /// Map a case-folded lexer keyword to an operator.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "EQ" => Some(CompareOperator::Eq),
            "NE" => Some(CompareOperator::Ne),
            "CO" => Some(CompareOperator::Co),
            "SW" => Some(CompareOperator::Sw),
            "EW" => Some(CompareOperator::Ew),
            "GT" => Some(CompareOperator::Gt),
            "GE" => Some(CompareOperator::Ge),
            "LT" => Some(CompareOperator::Lt),
            "LE" => Some(CompareOperator::Le),
            _ => None,
        }
    }

    /// Operators that need an ordering on the attribute's values.
    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            CompareOperator::Gt | CompareOperator::Ge | CompareOperator::Lt | CompareOperator::Le
        )
    }

    /// Substring operators, only meaningful for strings.
    pub fn is_substring(self) -> bool {
        matches!(
            self,
            CompareOperator::Co | CompareOperator::Sw | CompareOperator::Ew
        )
    }
}

impl fmt::Display for CompareOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOperator::Eq => "eq",
            CompareOperator::Ne => "ne",
            CompareOperator::Co => "co",
            CompareOperator::Sw => "sw",
            CompareOperator::Ew => "ew",
            CompareOperator::Gt => "gt",
            CompareOperator::Ge => "ge",
            CompareOperator::Lt => "lt",
            CompareOperator::Le => "le",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOperator {
    And,
    Or,
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOperator::And => f.write_str("and"),
            LogicalOperator::Or => f.write_str("or"),
        }
    }
}

/// JSON scalar on the right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum CompareValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
}

impl CompareValue {
    /// Interpret a lexer token as a JSON scalar.
    ///
    /// Numbers containing a `.` are decimals, other numbers integers.
    pub fn from_token(token: &str) -> Option<Self> {
        if token.starts_with('"') {
            return serde_json::from_str::<String>(token)
                .ok()
                .map(CompareValue::String);
        }

        match token.to_ascii_lowercase().as_str() {
            "true" => return Some(CompareValue::Boolean(true)),
            "false" => return Some(CompareValue::Boolean(false)),
            "null" => return Some(CompareValue::Null),
            _ => {}
        }

        if !token
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit() || c == '-')
        {
            return None;
        }
        if token.contains('.') {
            token.parse::<f64>().ok().map(CompareValue::Decimal)
        } else {
            token
                .parse::<i64>()
                .ok()
                .map(CompareValue::Integer)
                .or_else(|| token.parse::<f64>().ok().map(CompareValue::Decimal))
        }
    }

    /// Build a compare value from a JSON scalar.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        use serde_json::Value;
        match value {
            Value::Null => Some(CompareValue::Null),
            Value::Bool(b) => Some(CompareValue::Boolean(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(CompareValue::Integer)
                .or_else(|| n.as_f64().map(CompareValue::Decimal)),
            Value::String(s) => Some(CompareValue::String(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            CompareValue::Null => Value::Null,
            CompareValue::Boolean(b) => Value::Bool(*b),
            CompareValue::Integer(i) => Value::from(*i),
            CompareValue::Decimal(d) => Value::from(*d),
            CompareValue::String(s) => Value::String(s.clone()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CompareValue::Integer(i) => Some(*i as f64),
            CompareValue::Decimal(d) => Some(*d),
            _ => None,
        }
    }
}

impl fmt::Display for CompareValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareValue::Null => f.write_str("null"),
            CompareValue::Boolean(b) => write!(f, "{}", b),
            CompareValue::Integer(i) => write!(f, "{}", i),
            CompareValue::Decimal(d) if d.fract() == 0.0 && d.is_finite() => write!(f, "{:.1}", d),
            CompareValue::Decimal(d) => write!(f, "{}", d),
            CompareValue::String(s) => write!(f, "{}", serde_json::Value::String(s.clone())),
        }
    }
}

/// A parsed filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpression {
    /// `path op value`
    Comparison {
        path: AttributeReference,
        operator: CompareOperator,
        value: CompareValue,
    },
    /// `path pr`
    Present { path: AttributeReference },
    /// `left and right`, `left or right`
    Logical {
        left: Box<FilterExpression>,
        operator: LogicalOperator,
        right: Box<FilterExpression>,
    },
    /// `(inner)` or `not (inner)`
    Group {
        negated: bool,
        inner: Box<FilterExpression>,
    },
    /// `path[filter]`, the filter scoped to the elements of a multi-valued attribute
    ValuePath {
        path: AttributeReference,
        filter: Option<Box<FilterExpression>>,
    },
}

impl FilterExpression {
    pub fn comparison(path: AttributeReference, operator: CompareOperator, value: CompareValue) -> Self {
        FilterExpression::Comparison {
            path,
            operator,
            value,
        }
    }

    pub fn and(left: FilterExpression, right: FilterExpression) -> Self {
        FilterExpression::Logical {
            left: Box::new(left),
            operator: LogicalOperator::And,
            right: Box::new(right),
        }
    }

    pub fn or(left: FilterExpression, right: FilterExpression) -> Self {
        FilterExpression::Logical {
            left: Box::new(left),
            operator: LogicalOperator::Or,
            right: Box::new(right),
        }
    }

    pub fn not(inner: FilterExpression) -> Self {
        FilterExpression::Group {
            negated: true,
            inner: Box::new(inner),
        }
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterExpression::Comparison {
                path,
                operator,
                value,
            } => write!(f, "{} {} {}", path, operator, value),
            FilterExpression::Present { path } => write!(f, "{} pr", path),
            FilterExpression::Logical {
                left,
                operator,
                right,
            } => write!(f, "{} {} {}", left, operator, right),
            FilterExpression::Group {
                negated: true,
                inner,
            } => write!(f, "not ({})", inner),
            FilterExpression::Group {
                negated: false,
                inner,
            } => write!(f, "({})", inner),
            FilterExpression::ValuePath { path, filter } => match filter {
                Some(filter) => write!(f, "{}[{}]", path, filter),
                None => write!(f, "{}", path),
            },
        }
    }
}
