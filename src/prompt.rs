//! Prompt templates with named `{field}` placeholders.
//!
//! Substitution is a single pass over the parsed template: values are copied
//! into the output verbatim and never scanned for placeholders themselves.
//! `{{` and `}}` produce literal braces.

use std::fmt;

use thiserror::Error;
use tracing::warn;

/// Errors raised while parsing or populating a template.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromptError {
    /// The template references a field that was not supplied.
    #[error("Missing template field: {0}")]
    MissingField(String),

    /// The template references a field the caller does not provide.
    #[error("Unknown template field: {0}")]
    UnknownField(String),

    /// The template contains an unbalanced or empty brace pair.
    #[error("Malformed template at byte {position}")]
    Malformed { position: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(String),
}

/// A parsed prompt template.
///
/// # Examples
///
/// ```
/// use citeqa::prompt::PromptTemplate;
///
/// let template = PromptTemplate::new("Q: {question}\nC: {context}").unwrap();
/// let prompt = template
///     .populate(&[("question", "Why?"), ("context", "Because.")])
///     .unwrap();
/// assert_eq!(prompt, "Q: Why?\nC: Because.");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
    segments: Vec<Segment>,
}

impl PromptTemplate {
    /// Parses a template.
    ///
    /// Placeholder names may contain ASCII letters, digits and underscores.
    pub fn new(text: impl Into<String>) -> Result<Self, PromptError> {
        let text = text.into();
        let segments = parse(&text)?;
        Ok(Self { text, segments })
    }

    /// Returns the template source text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Returns the distinct placeholder names in order of first appearance.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Field(name) = segment {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Substitutes the given fields into the template.
    ///
    /// Every placeholder must be supplied. Fields the template does not use are
    /// ignored with a warning.
    pub fn populate(&self, fields: &[(&str, &str)]) -> Result<String, PromptError> {
        let placeholders = self.placeholders();

        for name in &placeholders {
            if !fields.iter().any(|(key, _)| key == name) {
                return Err(PromptError::MissingField((*name).to_string()));
            }
        }
        for (key, _) in fields {
            if !placeholders.contains(key) {
                warn!(field = %key, "Template does not use supplied field");
            }
        }

        let extra: usize = fields.iter().map(|(_, value)| value.len()).sum();
        let mut out = String::with_capacity(self.text.len() + extra);
        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => out.push_str(literal),
                Segment::Field(name) => {
                    let value = fields
                        .iter()
                        .find(|(key, _)| *key == name.as_str())
                        .map(|(_, value)| *value)
                        .ok_or_else(|| PromptError::MissingField(name.clone()))?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

impl fmt::Display for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn parse(text: &str) -> Result<Vec<Segment>, PromptError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = text.char_indices().peekable();

    while let Some((position, c)) = chars.next() {
        match c {
            '{' => {
                if matches!(chars.peek(), Some((_, '{'))) {
                    chars.next();
                    literal.push('{');
                    continue;
                }

                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some((_, '}')) => break,
                        Some((_, ch)) if ch.is_ascii_alphanumeric() || ch == '_' => name.push(ch),
                        _ => return Err(PromptError::Malformed { position }),
                    }
                }
                if name.is_empty() {
                    return Err(PromptError::Malformed { position });
                }

                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Field(name));
            }
            '}' => {
                if matches!(chars.peek(), Some((_, '}'))) {
                    chars.next();
                    literal.push('}');
                } else {
                    return Err(PromptError::Malformed { position });
                }
            }
            _ => literal.push(c),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}
