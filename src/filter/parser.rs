//! Filter parser.
//!
//! Recursive descent over the lexer's tokens, one token of lookahead:
//!
//! ```text
//! filter     := orTerm
//! orTerm     := andTerm (OR andTerm)*
//! andTerm    := unary (AND unary)*
//! unary      := NOT group | group | valuePath | present | comparison
//! group      := '(' filter ')'
//! valuePath  := attrPath '[' filter ']'
//! present    := attrPath PR
//! comparison := attrPath compareOp jsonScalar
//! ```
//!
//! PATCH paths use the same machinery restricted to
//! `attrPath ('[' filter ']')? ('.' subAttr)?`.

use super::ast::{AttributeReference, CompareOperator, CompareValue, FilterExpression, LogicalOperator};
use super::lexer::tokenize;
use crate::config::FilterConfig;
use crate::error::{ScimError, ScimResult};

/// Parse a filter with the default limits.
///
/// # Examples
///
/// ```
/// use scim_patch::filter::parse_filter;
///
/// let filter = parse_filter("emails[type eq \"work\" and value co \"@example.com\"]").unwrap();
/// assert_eq!(filter.to_string(), "emails[type eq \"work\" and value co \"@example.com\"]");
/// ```
pub fn parse_filter(filter: &str) -> ScimResult<FilterExpression> {
    parse_filter_with(filter, &FilterConfig::default())
}

/// Parse a filter with explicit limits.
pub fn parse_filter_with(filter: &str, config: &FilterConfig) -> ScimResult<FilterExpression> {
    let mut parser = Parser::new(filter, config)?;
    let expression = parser.parse_or()?;
    parser.expect_end()?;
    log::debug!("Parsed filter '{}' as {:?}", filter, expression);
    Ok(expression)
}

/// Parse a PATCH path into its attribute reference and optional value filter.
///
/// A sub-attribute written after the bracket (`emails[type eq "work"].value`)
/// ends up in the reference's `sub_attribute_name`.
pub(crate) fn parse_path_expression(
    path: &str,
    config: &FilterConfig,
) -> ScimResult<(AttributeReference, Option<FilterExpression>)> {
    let mut parser = Parser::new(path, config)?;
    let (mut reference, filter) = parser.parse_attribute_path()?;

    if filter.is_some() {
        if let Some(token) = parser.peek().map(str::to_string) {
            let sub = token.strip_prefix('.').ok_or_else(|| {
                parser.error("Unexpected token after value filter", &token)
            })?;
            let parsed = AttributeReference::parse(&format!("x.{}", sub))
                .map_err(|message| parser.error(message, &token))?;
            reference.sub_attribute_name = parsed.sub_attribute_name;
            parser.advance();
        }
    }

    parser.expect_end()?;
    Ok((reference, filter))
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<String>,
    position: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str, config: &FilterConfig) -> ScimResult<Self> {
        if input.len() > config.max_length {
            return Err(ScimError::filter_parse(
                format!(
                    "Filter exceeds maximum length ({} bytes, max {})",
                    input.len(),
                    config.max_length
                ),
                "",
                input,
            ));
        }

        let tokens = tokenize(input);
        if tokens.is_empty() {
            return Err(ScimError::filter_parse("Empty filter", "", input));
        }

        Ok(Self {
            input,
            tokens,
            position: 0,
            depth: 0,
            max_depth: config.max_depth,
        })
    }

    fn error(&self, message: impl Into<String>, token: &str) -> ScimError {
        ScimError::filter_parse(message, token, self.input)
    }

    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.position).map(String::as_str)
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn next_token(&mut self, expected: &str) -> ScimResult<String> {
        match self.tokens.get(self.position) {
            Some(token) => {
                let token = token.clone();
                self.advance();
                Ok(token)
            }
            None => Err(self.error(format!("Unexpected end of filter, expected {}", expected), "")),
        }
    }

    fn expect(&mut self, symbol: &str) -> ScimResult<()> {
        match self.peek() {
            Some(token) if token == symbol => {
                self.advance();
                Ok(())
            }
            Some(token) => Err(self.error(format!("Expected '{}'", symbol), token)),
            None => Err(self.error(format!("Expected '{}' before end of filter", symbol), "")),
        }
    }

    fn expect_end(&self) -> ScimResult<()> {
        match self.peek() {
            Some(token) => Err(self.error("Unexpected trailing token", token)),
            None => Ok(()),
        }
    }

    fn enter_scope(&mut self) -> ScimResult<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            let token = self.peek().unwrap_or_default().to_string();
            return Err(self.error(
                format!("Filter exceeds maximum nesting depth ({})", self.max_depth),
                &token,
            ));
        }
        Ok(())
    }

    fn exit_scope(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn parse_or(&mut self) -> ScimResult<FilterExpression> {
        let mut left = self.parse_and()?;
        while self.peek() == Some("OR") {
            self.advance();
            let right = self.parse_and()?;
            left = FilterExpression::Logical {
                left: Box::new(left),
                operator: LogicalOperator::Or,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ScimResult<FilterExpression> {
        let mut left = self.parse_unary()?;
        while self.peek() == Some("AND") {
            self.advance();
            let right = self.parse_unary()?;
            left = FilterExpression::Logical {
                left: Box::new(left),
                operator: LogicalOperator::And,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> ScimResult<FilterExpression> {
        match self.peek() {
            Some("NOT") => {
                self.advance();
                self.parse_group(true)
            }
            Some("(") => self.parse_group(false),
            Some(_) => self.parse_attribute_expression(),
            None => Err(self.error("Unexpected end of filter, expected an expression", "")),
        }
    }

    fn parse_group(&mut self, negated: bool) -> ScimResult<FilterExpression> {
        self.expect("(")?;
        self.enter_scope()?;
        let inner = self.parse_or()?;
        self.expect(")")?;
        self.exit_scope();
        Ok(FilterExpression::Group {
            negated,
            inner: Box::new(inner),
        })
    }

    fn parse_attribute_expression(&mut self) -> ScimResult<FilterExpression> {
        let (path, filter) = self.parse_attribute_path()?;
        if let Some(filter) = filter {
            return Ok(FilterExpression::ValuePath {
                path,
                filter: Some(Box::new(filter)),
            });
        }

        let token = self.next_token("an operator")?;
        if token == "PR" {
            return Ok(FilterExpression::Present { path });
        }

        let operator = CompareOperator::from_keyword(&token)
            .ok_or_else(|| self.error("Expected a comparison operator or 'pr'", &token))?;
        let literal = self.next_token("a comparison value")?;
        let value = CompareValue::from_token(&literal)
            .ok_or_else(|| self.error("Expected a JSON string, number, boolean or null", &literal))?;

        Ok(FilterExpression::Comparison {
            path,
            operator,
            value,
        })
    }

    fn parse_attribute_path(&mut self) -> ScimResult<(AttributeReference, Option<FilterExpression>)> {
        let token = self.next_token("an attribute path")?;
        if token.starts_with('"') || super::lexer::KEYWORDS.contains(&token.as_str()) {
            return Err(self.error("Expected an attribute path", &token));
        }
        let path = AttributeReference::parse(&token).map_err(|message| self.error(message, &token))?;

        if self.peek() != Some("[") {
            return Ok((path, None));
        }
        if path.sub_attribute_name.is_some() {
            return Err(self.error("Value filter must follow a top-level attribute", &token));
        }

        self.advance();
        self.enter_scope()?;
        let filter = self.parse_or()?;
        self.expect("]")?;
        self.exit_scope();
        Ok((path, Some(filter)))
    }
}
