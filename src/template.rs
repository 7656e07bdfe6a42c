use crate::merge::CC;
use crate::recipient::Recipient;
use std::collections::{BTreeMap, HashMap};

const DELIMITER: char = '%';

pub const EMAIL_ADDRESS: &str = "EA";
pub const FIRST_NAME: &str = "FN";
pub const LAST_NAME: &str = "LN";

/// Lookup table for one recipient: global vars, overlaid by the
/// recipient's own vars, overlaid by the reserved `EA`/`FN`/`LN` names.
///
/// A recipient's `Cc` attribute is a header directive (`+addr` or a
/// replacement list), not text, so it is left out of the table.
#[derive(Debug, Clone, Default)]
pub struct Variables<'a> {
    values: HashMap<&'a str, &'a str>,
}

impl<'a> Variables<'a> {
    pub fn new(recipient: &'a Recipient, globals: &'a BTreeMap<String, String>) -> Self {
        let mut values = HashMap::new();
        let own = recipient.vars.iter().filter(|(key, _)| key.as_str() != CC);
        for (key, value) in globals.iter().chain(own) {
            values.insert(key.as_str(), value.as_str());
        }
        values.insert(EMAIL_ADDRESS, recipient.email.as_str());
        values.insert(FIRST_NAME, recipient.first.as_str());
        values.insert(LAST_NAME, recipient.last.as_str());
        Self { values }
    }

    /// Adds or replaces one entry on top of all layers.
    pub fn insert(&mut self, key: &'a str, value: &'a str) {
        self.values.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.values.get(key).copied()
    }

    /// Substitutes every known `%KEY%` in `template`.
    ///
    /// Scans left to right once. Substituted values are copied to the output
    /// and never rescanned; unknown tokens stay as they are.
    pub fn substitute(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find(DELIMITER) {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];

            let known = after.find(DELIMITER).and_then(|end| {
                self.get(&after[..end]).map(|value| (value, end))
            });

            match known {
                Some((value, end)) => {
                    out.push_str(value);
                    rest = &after[end + 1..];
                }
                None => {
                    // the closing delimiter may open the next token
                    out.push(DELIMITER);
                    rest = after;
                }
            }
        }

        out.push_str(rest);
        out
    }
}

/// Resolves `template` for `recipient` with `globals` as the lowest layer.
pub fn resolve(template: &str, recipient: &Recipient, globals: &BTreeMap<String, String>) -> String {
    Variables::new(recipient, globals).substitute(template)
}
