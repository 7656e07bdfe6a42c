use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

lazy_static! {
    static ref PIPE: Regex = Regex::new(r"\s*\|\s*").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

const VAR_SEPARATOR: &str = ":-";

/// One recipient as described by a line of the recipient list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub email: String,
    pub first: String,
    pub last: String,
    /// Extra template variables and header overrides (`ORG`, `Cc`, ...)
    pub vars: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecipientError {
    #[error("missing email address")]
    MissingAddress,
    #[error("missing display name for {0}")]
    MissingName(String),
    #[error("malformed segment '{segment}' (expected KEY:-VALUE)")]
    Malformed { segment: String },
}

impl Recipient {
    pub fn new(email: &str, first: &str, last: &str) -> Self {
        Self {
            email: email.to_string(),
            first: first.to_string(),
            last: last.to_string(),
            vars: BTreeMap::new(),
        }
    }

    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }

    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }
}

/// A recipient line that could not be parsed, with its 1-based position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecipient {
    pub line_no: usize,
    pub line: String,
    #[serde(serialize_with = "serialize_error")]
    pub error: RecipientError,
}

fn serialize_error<S: serde::Serializer>(
    error: &RecipientError,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&error.to_string())
}

/// Parses `jd@example.com=John Doe Jr.|ORG:-EFF|TITLE:-PhD`.
///
/// The display name is split on its first whitespace run; whatever follows
/// becomes the last name verbatim. Every segment after the name must be a
/// `KEY:-VALUE` pair, otherwise the whole line is rejected.
pub fn parse_recipient_line(line: &str) -> Result<Recipient, RecipientError> {
    let (email, rest) = line
        .split_once('=')
        .ok_or(RecipientError::MissingAddress)?;
    let email = email.trim();
    if email.is_empty() {
        return Err(RecipientError::MissingAddress);
    }

    let mut segments = PIPE.split(rest.trim());
    let name = segments.next().unwrap_or_default();
    if name.is_empty() {
        return Err(RecipientError::MissingName(email.to_string()));
    }

    let mut names = WHITESPACE.splitn(name, 2);
    let first = names.next().unwrap_or_default();
    let last = names.next().unwrap_or_default();
    let mut recipient = Recipient::new(email, first, last);

    for segment in segments {
        if segment.is_empty() {
            // trailing pipe
            continue;
        }
        let (key, value) = segment
            .split_once(VAR_SEPARATOR)
            .map(|(k, v)| (k.trim(), v.trim()))
            .filter(|(k, _)| !k.is_empty())
            .ok_or_else(|| RecipientError::Malformed {
                segment: segment.to_string(),
            })?;
        recipient.vars.insert(key.to_string(), value.to_string());
    }

    Ok(recipient)
}

/// Parses line `line_no` (1-based) of a recipient list.
pub fn parse_numbered(line_no: usize, line: &str) -> Result<Recipient, SkippedRecipient> {
    parse_recipient_line(line).map_err(|error| {
        log::warn!("Skipping recipient line {line_no}: {error}");
        SkippedRecipient {
            line_no,
            line: line.to_string(),
            error,
        }
    })
}

/// Parses every line on its own; one bad line never affects the others.
pub fn parse_recipients<'a, I>(lines: I) -> Vec<Result<Recipient, SkippedRecipient>>
where
    I: IntoIterator<Item = &'a str>,
{
    lines
        .into_iter()
        .enumerate()
        .map(|(i, line)| parse_numbered(i + 1, line))
        .collect()
}
