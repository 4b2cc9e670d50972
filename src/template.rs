//! Template splitting with caching
//!
//! Turns attribute text such as `"Hello ${user.name | upper}!"` into
//! [`InterpolationParts`]:
//! - Tokenizes templates once and caches the token list
//! - Scans `${ … }` in a single pass, skipping braces inside quotes
//! - Builds expressions: `path | literal`, then `| converter`*, then `& behavior`*

use std::ops::Range;
use std::rc::Rc;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::binding::{Expression, InterpolationParts, Part};
use crate::error::{BindingError, Result};
use crate::host::{
    is_identifier, AccessScope, BindingBehaviorExpression, LiteralExpression,
    ValueConverterExpression,
};
use crate::value::RawValue;

/// Token representing a parsed template fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Literal text (range in the original string)
    Literal(Range<usize>),
    /// `${ … }` body (range of the inner source) and offset of the `$`
    Interpolation { source: Range<usize>, position: usize },
}

/// Template parser with a token cache
pub struct TemplateParser {
    cache: DashMap<String, Arc<Vec<Token>>>,
}

impl Default for TemplateParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateParser {
    pub fn new() -> Self {
        Self {
            cache: DashMap::new(),
        }
    }

    /// Split a template into tokens (cached on success)
    pub fn tokenize(&self, template: &str) -> Result<Arc<Vec<Token>>> {
        if let Some(cached) = self.cache.get(template) {
            return Ok(Arc::clone(&cached));
        }

        let mut tokens = Vec::new();
        let mut chars = template.char_indices().peekable();
        let mut literal_start = 0;

        while let Some((i, ch)) = chars.next() {
            if ch != '$' || chars.peek().map(|(_, c)| *c) != Some('{') {
                continue;
            }
            chars.next(); // consume '{'
            if i > literal_start {
                tokens.push(Token::Literal(literal_start..i));
            }
            let end = scan_expression(&mut chars).ok_or_else(|| BindingError::TemplateParse {
                position: i,
                details: "unterminated '${'".to_string(),
            })?;
            tokens.push(Token::Interpolation {
                source: i + 2..end,
                position: i,
            });
            literal_start = end + 1;
        }

        if literal_start < template.len() {
            tokens.push(Token::Literal(literal_start..template.len()));
        }

        let tokens = Arc::new(tokens);
        self.cache.insert(template.to_string(), Arc::clone(&tokens));
        Ok(tokens)
    }

    /// Parse a template into parts; `None` when it has no interpolation
    pub fn parse(&self, template: &str) -> Result<Option<InterpolationParts>> {
        let tokens = self.tokenize(template)?;
        if !tokens.iter().any(|t| matches!(t, Token::Interpolation { .. })) {
            return Ok(None);
        }

        let mut parts = Vec::with_capacity(tokens.len() + 2);
        let mut literal = String::new();
        for token in tokens.iter() {
            match token {
                Token::Literal(range) => literal.push_str(&template[range.clone()]),
                Token::Interpolation { source, position } => {
                    parts.push(Part::Literal(std::mem::take(&mut literal)));
                    let expression = parse_expression(&template[source.clone()], *position)?;
                    parts.push(Part::Expression(expression));
                }
            }
        }
        parts.push(Part::Literal(literal));

        InterpolationParts::new(parts).map(Some)
    }

    /// Number of cached templates
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

/// Advance past the closing `}`, returning its byte offset
fn scan_expression(chars: &mut std::iter::Peekable<std::str::CharIndices>) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    for (i, ch) in chars.by_ref() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(ch),
            (None, '{') => depth += 1,
            (None, '}') if depth == 0 => return Some(i),
            (None, '}') => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Split on `sep` outside quotes
fn split_top_level(source: &str, sep: char) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, ch) in source.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(ch),
            (None, c) if c == sep => {
                pieces.push(&source[start..i]);
                start = i + ch.len_utf8();
            }
            _ => {}
        }
    }
    pieces.push(&source[start..]);
    pieces
}

fn parse_error(position: usize, details: impl Into<String>) -> BindingError {
    BindingError::TemplateParse {
        position,
        details: details.into(),
    }
}

fn parse_name(name: &str, kind: &str, position: usize) -> Result<String> {
    let name = name.trim();
    if !is_identifier(name) {
        return Err(parse_error(position, format!("invalid {} name '{}'", kind, name)));
    }
    Ok(name.to_string())
}

/// Parse one `${ … }` body
pub fn parse_expression(source: &str, position: usize) -> Result<Rc<dyn Expression>> {
    let mut behaviors = split_top_level(source, '&').into_iter();
    let body = behaviors.next().unwrap_or_default();
    let mut converters = split_top_level(body, '|').into_iter();
    let primary = converters.next().unwrap_or_default();

    let mut expression = parse_primary(primary, position)?;
    for name in converters {
        let name = parse_name(name, "converter", position)?;
        expression = Rc::new(ValueConverterExpression::new(expression, name));
    }
    for name in behaviors {
        let name = parse_name(name, "behavior", position)?;
        expression = Rc::new(BindingBehaviorExpression::new(expression, name));
    }
    Ok(expression)
}

fn parse_primary(source: &str, position: usize) -> Result<Rc<dyn Expression>> {
    let text = source.trim();
    if text.is_empty() {
        return Err(parse_error(position, "empty expression"));
    }

    let literal = match text {
        "true" => Some(RawValue::Bool(true)),
        "false" => Some(RawValue::Bool(false)),
        "null" => Some(RawValue::Null),
        "undefined" => Some(RawValue::Undefined),
        _ => None,
    };
    if let Some(value) = literal {
        return Ok(Rc::new(LiteralExpression(value)));
    }

    let first = text.chars().next().unwrap_or_default();
    if first == '\'' || first == '"' {
        let inner = text
            .strip_prefix(first)
            .and_then(|rest| rest.strip_suffix(first))
            .ok_or_else(|| parse_error(position, format!("unterminated string {}", text)))?;
        return Ok(Rc::new(LiteralExpression(RawValue::Text(inner.to_string()))));
    }
    if first.is_ascii_digit() || first == '-' || first == '.' {
        let number: f64 = text
            .parse()
            .map_err(|_| parse_error(position, format!("invalid number '{}'", text)))?;
        return Ok(Rc::new(LiteralExpression(RawValue::Number(number))));
    }

    for segment in text.split('.') {
        parse_name(segment, "member", position)?;
    }
    Ok(Rc::new(AccessScope::parse(text)?))
}

/// Global template parser instance
pub static TEMPLATE_PARSER: Lazy<TemplateParser> = Lazy::new(TemplateParser::new);

/// Convenience function for parsing templates
pub fn parse_template(template: &str) -> Result<Option<InterpolationParts>> {
    TEMPLATE_PARSER.parse(template)
}
