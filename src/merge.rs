use crate::recipient::Recipient;

/// Marks a per-recipient directive that extends instead of replacing.
pub const APPEND_SENTINEL: char = '+';

/// Header key a recipient line may use to override the global Cc list.
pub const CC: &str = "Cc";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Replace(Vec<String>),
    Append(Vec<String>),
}

impl Directive {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.strip_prefix(APPEND_SENTINEL) {
            Some(rest) => Directive::Append(split_values(rest)),
            None => Directive::Replace(split_values(raw)),
        }
    }

    pub fn apply(self, global: &[String]) -> Vec<String> {
        match self {
            Directive::Replace(values) => values,
            Directive::Append(values) => {
                let mut merged = global.to_vec();
                merged.extend(values);
                merged
            }
        }
    }
}

fn split_values(raw: &str) -> Vec<String> {
    raw.trim()
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// Merges a global multi-valued header with an optional override directive.
pub fn merge(global: &[String], directive: Option<&str>) -> Vec<String> {
    match directive {
        Some(raw) => Directive::parse(raw).apply(global),
        None => global.to_vec(),
    }
}

/// Merges header `name` using the directive found in the recipient's vars.
pub fn merge_header(name: &str, global: &[String], recipient: &Recipient) -> Vec<String> {
    let directive = recipient.var(name);
    if let Some(raw) = directive {
        log::debug!("{}: {name} override '{raw}'", recipient.email);
    }
    merge(global, directive)
}
