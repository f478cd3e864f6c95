//! Filter lexer.
//!
//! Splits a filter or path string into tokens, left to right, in a single
//! pass:
//! - `(`, `)`, `[` and `]` are standalone tokens;
//! - whitespace separates tokens and runs of it collapse;
//! - a double-quoted literal is one token, whitespace, brackets and escaped
//!   quotes inside it included;
//! - keywords (`and`, `or`, `not`, the comparison operators and `pr`) are
//!   folded to uppercase, every other token is left as written.
//!
//! The lexer never fails. An unterminated literal becomes a token that
//! starts with `"` but does not end with one, and the parser rejects it.

/// Keywords recognised case-insensitively.
pub const KEYWORDS: [&str; 13] = [
    "AND", "OR", "NOT", "EQ", "NE", "CO", "SW", "EW", "PR", "GT", "GE", "LT", "LE",
];

/// Tokenize a filter or PATCH path expression.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut escaped = false;

    for c in input.chars() {
        if in_quote {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_quote = false;
            }
            continue;
        }

        match c {
            '(' | ')' | '[' | ']' => {
                flush(&mut current, &mut tokens);
                tokens.push(c.to_string());
            }
            '"' => {
                current.push(c);
                in_quote = true;
            }
            c if c.is_whitespace() => flush(&mut current, &mut tokens),
            c => current.push(c),
        }
    }
    flush(&mut current, &mut tokens);

    log::trace!("Tokenized '{}' into {:?}", input, tokens);
    tokens
}

fn flush(current: &mut String, tokens: &mut Vec<String>) {
    if current.is_empty() {
        return;
    }
    let token = std::mem::take(current);
    if !token.starts_with('"') {
        let upper = token.to_ascii_uppercase();
        if KEYWORDS.contains(&upper.as_str()) {
            tokens.push(upper);
            return;
        }
    }
    tokens.push(token);
}
