//! Message template rendering.
//!
//! Templates use brace placeholders: `{title}`, `{message}`, `{project_name}`,
//! `{url}` and `{tag[<key>]}`. Literal braces are written `{{` and `}}`.
//! Only this fixed grammar is understood; there is no expression evaluation,
//! conversion (`!r`) or format spec (`:>10`) support.

use std::collections::HashMap;

use thiserror::Error;

use crate::event::{Event, Group};

/// Shown for any `{tag[..]}` whose key the event does not carry
pub const MISSING_TAG: &str = "[NA]";

pub const DEFAULT_MESSAGE_TEMPLATE: &str =
    "*[Sentry]* {project_name} {tag[level]}: *{title}*\n```{message}```\n{url}";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unmatched '{{' at byte {0}")]
    UnmatchedOpen(usize),

    #[error("single '}}' encountered at byte {0}")]
    SingleClose(usize),

    #[error("empty placeholder '{{}}' at byte {0}")]
    EmptyField(usize),

    #[error("unknown placeholder '{0}' (available: title, message, project_name, url, tag[...])")]
    UnknownField(String),

    #[error("'tag' must be indexed, e.g. {{tag[level]}}")]
    MissingTagKey,

    #[error("empty tag key in '{0}'")]
    EmptyTagKey(String),

    #[error("missing ']' in placeholder '{0}'")]
    UnterminatedIndex(String),

    #[error("placeholder '{0}' cannot be indexed; only 'tag' supports [...]")]
    NotIndexable(String),

    #[error("unexpected text after ']' in placeholder '{0}'")]
    TrailingAccess(String),

    #[error("conversions and format specs are not supported in placeholder '{0}'")]
    UnsupportedSpec(String),
}

/// Markup dialect the rendered text is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseFormat {
    /// Telegram's legacy Markdown
    #[default]
    Markdown,
}

impl ParseFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseFormat::Markdown => "Markdown",
        }
    }
}

impl std::fmt::Display for ParseFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rendered message ready to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    text: String,
    format: ParseFormat,
}

impl Payload {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: ParseFormat::Markdown,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn format(&self) -> ParseFormat {
        self.format
    }
}

/// Tag lookup that falls back to [`MISSING_TAG`] instead of failing
#[derive(Debug, Clone, Default)]
pub struct TagMapping {
    tags: HashMap<String, String>,
}

impl TagMapping {
    pub fn new(tags: HashMap<String, String>) -> Self {
        Self { tags }
    }

    pub fn get(&self, key: &str) -> &str {
        self.tags.get(key).map(String::as_str).unwrap_or(MISSING_TAG)
    }
}

impl From<&Event> for TagMapping {
    fn from(event: &Event) -> Self {
        Self::new(event.tag_map())
    }
}

/// The values a template may reference
#[derive(Debug, Clone)]
pub struct Fields<'a> {
    pub title: &'a str,
    pub message: &'a str,
    pub project_name: &'a str,
    pub url: &'a str,
    pub tag: TagMapping,
}

impl<'a> Fields<'a> {
    pub fn new(group: &'a Group, event: &'a Event) -> Self {
        Self {
            title: &event.title,
            message: &event.message,
            project_name: &group.project.name,
            url: &group.url,
            tag: TagMapping::from(event),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Placeholder {
    Title,
    Message,
    ProjectName,
    Url,
    Tag(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Placeholder),
}

/// A parsed template. Parsing is where all syntax errors surface, so a
/// `Template` always renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' => {
                    if chars.next_if(|&(_, n)| n == '{').is_some() {
                        literal.push('{');
                        continue;
                    }

                    let mut body = String::new();
                    let mut in_index = false;
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        match c {
                            ']' if in_index => in_index = false,
                            '[' if !in_index => in_index = true,
                            '}' if !in_index => {
                                closed = true;
                                break;
                            }
                            '{' if !in_index => return Err(TemplateError::UnmatchedOpen(pos)),
                            _ => {}
                        }
                        body.push(c);
                    }
                    if !closed {
                        if in_index {
                            return Err(TemplateError::UnterminatedIndex(body));
                        }
                        return Err(TemplateError::UnmatchedOpen(pos));
                    }
                    if body.is_empty() {
                        return Err(TemplateError::EmptyField(pos));
                    }

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(parse_placeholder(&body)?));
                }
                '}' => {
                    if chars.next_if(|&(_, n)| n == '}').is_some() {
                        literal.push('}');
                    } else {
                        return Err(TemplateError::SingleClose(pos));
                    }
                }
                _ => literal.push(c),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { segments })
    }

    pub fn render(&self, fields: &Fields<'_>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(Placeholder::Title) => out.push_str(fields.title),
                Segment::Field(Placeholder::Message) => out.push_str(fields.message),
                Segment::Field(Placeholder::ProjectName) => out.push_str(fields.project_name),
                Segment::Field(Placeholder::Url) => out.push_str(fields.url),
                Segment::Field(Placeholder::Tag(key)) => out.push_str(fields.tag.get(key)),
            }
        }
        out
    }
}

/// Parse the text between `{` and `}` into a placeholder.
fn parse_placeholder(body: &str) -> Result<Placeholder, TemplateError> {
    let name_end = body
        .find(|c| matches!(c, '[' | '.' | '!' | ':'))
        .unwrap_or(body.len());
    let (name, rest) = body.split_at(name_end);

    if rest.starts_with('!') || rest.starts_with(':') {
        return Err(TemplateError::UnsupportedSpec(body.to_string()));
    }

    let simple = match name {
        "title" => Some(Placeholder::Title),
        "message" => Some(Placeholder::Message),
        "project_name" => Some(Placeholder::ProjectName),
        "url" => Some(Placeholder::Url),
        "tag" => None,
        _ => return Err(TemplateError::UnknownField(name.to_string())),
    };

    if let Some(placeholder) = simple {
        if !rest.is_empty() {
            return Err(TemplateError::NotIndexable(body.to_string()));
        }
        return Ok(placeholder);
    }

    let Some(index) = rest.strip_prefix('[') else {
        if rest.is_empty() {
            return Err(TemplateError::MissingTagKey);
        }
        return Err(TemplateError::TrailingAccess(body.to_string()));
    };
    let Some(close) = index.find(']') else {
        return Err(TemplateError::UnterminatedIndex(body.to_string()));
    };
    let (key, after) = (&index[..close], &index[close + 1..]);

    if key.is_empty() {
        return Err(TemplateError::EmptyTagKey(body.to_string()));
    }
    if after.starts_with('!') || after.starts_with(':') {
        return Err(TemplateError::UnsupportedSpec(body.to_string()));
    }
    if !after.is_empty() {
        return Err(TemplateError::TrailingAccess(body.to_string()));
    }
    Ok(Placeholder::Tag(key.to_string()))
}

/// Render `template` against one group/event pair.
pub fn render(template: &str, group: &Group, event: &Event) -> Result<Payload, TemplateError> {
    let parsed = Template::parse(template)?;
    Ok(Payload::new(parsed.render(&Fields::new(group, event))))
}
