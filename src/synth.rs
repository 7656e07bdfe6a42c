use crate::dialect::{Dialect, Headers};
use crate::merge::{merge_header, CC};
use crate::recipient::{parse_numbered, Recipient, SkippedRecipient};
use crate::template::Variables;
use serde::Serialize;
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::thread;

/// Message settings shared by every recipient. Read-only once built.
#[derive(Debug, Clone)]
pub struct GlobalMessage {
    pub dialect: Dialect,
    pub from: String,
    pub reply_to: String,
    pub cc: Vec<String>,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<String>,
    /// Product/version string for the `X-Mailer` header
    pub product: String,
    pub vars: BTreeMap<String, String>,
}

impl GlobalMessage {
    pub fn new(dialect: Dialect, subject: &str, body: &str) -> Self {
        Self {
            dialect,
            from: String::new(),
            reply_to: String::new(),
            cc: Vec::new(),
            subject: subject.to_string(),
            body: body.to_string(),
            attachments: Vec::new(),
            product: String::new(),
            vars: BTreeMap::new(),
        }
    }
}

/// A message ready to be handed to the mail program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedMessage {
    pub recipient: String,
    pub subject: String,
    pub body: String,
    /// Program followed by its arguments
    pub invocation: Vec<String>,
}

/// Outcome of synthesizing a whole recipient list.
#[derive(Debug, Default, Serialize)]
pub struct Synthesis {
    pub messages: Vec<ResolvedMessage>,
    pub skipped: Vec<SkippedRecipient>,
}

pub fn synthesize(global: &GlobalMessage, recipient: &Recipient) -> ResolvedMessage {
    let cc = merge_header(CC, &global.cc, recipient);
    // %Cc% is the merged list, never the raw directive
    let cc_list = cc.join(", ");
    let mut vars = Variables::new(recipient, &global.vars);
    vars.insert(CC, &cc_list);
    let subject = vars.substitute(&global.subject);
    let body = vars.substitute(&global.body);

    let serialized = global.dialect.serialize(&Headers {
        to: &recipient.email,
        subject: &subject,
        cc: &cc,
        from: &global.from,
        reply_to: &global.reply_to,
        attachments: &global.attachments,
        mailer: &global.product,
    });

    let body = match serialized.header_block {
        Some(mut block) => {
            block.push_str(&body);
            block
        }
        None => body,
    };

    log::debug!("{}: {:?}", recipient.email, serialized.invocation);

    ResolvedMessage {
        recipient: recipient.email.clone(),
        subject,
        body,
        invocation: serialized.invocation,
    }
}

/// Parses and synthesizes every recipient line.
///
/// Lines are handled independently on a few scoped worker threads that only
/// borrow `global`; the output keeps the order of `lines`. Lines that fail
/// to parse end up in [`Synthesis::skipped`].
pub fn synthesize_all<S: AsRef<str> + Sync>(global: &GlobalMessage, lines: &[S]) -> Synthesis {
    let workers = thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1);
    let chunk_size = lines.len().div_ceil(workers).max(1);

    let chunks: Vec<Vec<Result<ResolvedMessage, SkippedRecipient>>> = thread::scope(|scope| {
        let handles: Vec<_> = lines
            .chunks(chunk_size)
            .enumerate()
            .map(|(n, chunk)| {
                scope.spawn(move || {
                    chunk
                        .iter()
                        .enumerate()
                        .map(|(i, line)| {
                            let line_no = n * chunk_size + i + 1;
                            parse_numbered(line_no, line.as_ref())
                                .map(|recipient| synthesize(global, &recipient))
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(outcomes) => outcomes,
                Err(_) => {
                    log::error!("Synthesis worker panicked, its recipients are lost");
                    Vec::new()
                }
            })
            .collect()
    });

    let mut synthesis = Synthesis::default();
    for outcome in chunks.into_iter().flatten() {
        match outcome {
            Ok(message) => synthesis.messages.push(message),
            Err(skipped) => synthesis.skipped.push(skipped),
        }
    }
    synthesis
}
