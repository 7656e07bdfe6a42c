use std::borrow::Cow;
use std::path::Path;

pub const SENDMAIL: &str = "sendmail";
pub const MAILX: &str = "mailx";

/// Command line convention of the mail program that delivers the messages.
///
/// Every variant keeps the program as configured, so `/usr/sbin/sendmail`
/// is run by that path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dialect {
    /// Headers travel inline at the top of the body (`sendmail -t`).
    Sendmail(String),
    /// BSD/heirloom mailx: `-c` per Cc address, `-S` for sender settings.
    Mailx(String),
    /// Any other mail client taking `-a "Header: value"` arguments
    /// (GNU mailutils `mail`, `gnu-mail`, ...).
    Generic(String),
}

/// Header values for one recipient, after merging.
#[derive(Debug, Clone, Copy)]
pub struct Headers<'a> {
    pub to: &'a str,
    pub subject: &'a str,
    pub cc: &'a [String],
    pub from: &'a str,
    pub reply_to: &'a str,
    pub attachments: &'a [String],
    pub mailer: &'a str,
}

/// What a dialect produces: the command to run and, for dialects that read
/// headers from the message itself, the block to put in front of the body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Serialized {
    pub invocation: Vec<String>,
    pub header_block: Option<String>,
}

pub trait HeaderSerializer {
    fn serialize(&self, headers: &Headers<'_>) -> Serialized;
}

pub struct SendmailHeaders<'a> {
    pub program: &'a str,
}

pub struct MailxArgs<'a> {
    pub program: &'a str,
}

pub struct GenericArgs<'a> {
    pub program: &'a str,
}

impl Dialect {
    pub fn sendmail() -> Self {
        Dialect::Sendmail(SENDMAIL.to_string())
    }

    pub fn mailx() -> Self {
        Dialect::Mailx(MAILX.to_string())
    }

    /// Picks the dialect from the program's file name, so a full path such
    /// as `/usr/bin/mailx` still selects mailx.
    pub fn from_program(program: &str) -> Self {
        let program = program.trim();
        let name = Path::new(program)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(program);
        match name {
            SENDMAIL => Dialect::Sendmail(program.to_string()),
            MAILX => Dialect::Mailx(program.to_string()),
            _ => Dialect::Generic(program.to_string()),
        }
    }

    pub fn program(&self) -> &str {
        match self {
            Dialect::Sendmail(program) | Dialect::Mailx(program) | Dialect::Generic(program) => {
                program.as_str()
            }
        }
    }

    pub fn supports_attachments(&self) -> bool {
        !matches!(self, Dialect::Sendmail(_))
    }

    pub fn serialize(&self, headers: &Headers<'_>) -> Serialized {
        match self {
            Dialect::Sendmail(program) => SendmailHeaders { program }.serialize(headers),
            Dialect::Mailx(program) => MailxArgs { program }.serialize(headers),
            Dialect::Generic(program) => GenericArgs { program }.serialize(headers),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.program())
    }
}

/// Folds any CR/LF in a header value into a single space, so a value can
/// never start a header line of its own.
fn one_line(value: &str) -> Cow<'_, str> {
    if !value.contains(['\r', '\n']) {
        return Cow::Borrowed(value);
    }
    let folded: Vec<&str> = value
        .split(['\r', '\n'])
        .filter(|part| !part.is_empty())
        .collect();
    Cow::Owned(folded.join(" "))
}

fn push_pair(args: &mut Vec<String>, flag: &str, value: impl Into<String>) {
    args.push(flag.to_string());
    args.push(value.into());
}

impl HeaderSerializer for SendmailHeaders<'_> {
    fn serialize(&self, headers: &Headers<'_>) -> Serialized {
        let mut lines = vec![
            format!("To: {}", one_line(headers.to)),
            format!("Subject: {}", one_line(headers.subject)),
        ];
        if !headers.cc.is_empty() {
            lines.push(format!("Cc: {}", one_line(&headers.cc.join(", "))));
        }
        if !headers.from.is_empty() {
            lines.push(format!("From: {}", one_line(headers.from)));
        }
        if !headers.reply_to.is_empty() {
            lines.push(format!("Reply-To: {}", one_line(headers.reply_to)));
        }
        if !headers.mailer.is_empty() {
            lines.push(format!("X-Mailer: {}", one_line(headers.mailer)));
        }
        if !headers.attachments.is_empty() {
            log::warn!(
                "{}: sendmail cannot carry attachments, ignoring {} path(s)",
                headers.to,
                headers.attachments.len()
            );
        }

        let mut block = lines.join("\n");
        block.push_str("\n\n");

        Serialized {
            invocation: vec![self.program.to_string(), "-t".to_string()],
            header_block: Some(block),
        }
    }
}

impl HeaderSerializer for MailxArgs<'_> {
    fn serialize(&self, headers: &Headers<'_>) -> Serialized {
        let mut args = vec![self.program.to_string()];
        for address in headers.cc {
            push_pair(&mut args, "-c", address.as_str());
        }
        if !headers.from.is_empty() {
            push_pair(&mut args, "-S", format!("from='{}'", one_line(headers.from)));
        }
        if !headers.reply_to.is_empty() {
            push_pair(
                &mut args,
                "-S",
                format!("replyto='{}'", one_line(headers.reply_to)),
            );
        }
        for path in headers.attachments {
            push_pair(&mut args, "-a", path.as_str());
        }
        push_pair(&mut args, "-s", one_line(headers.subject));
        args.push(headers.to.to_string());

        Serialized {
            invocation: args,
            header_block: None,
        }
    }
}

impl HeaderSerializer for GenericArgs<'_> {
    fn serialize(&self, headers: &Headers<'_>) -> Serialized {
        let mut args = vec![self.program.to_string()];
        if !headers.cc.is_empty() {
            push_pair(
                &mut args,
                "-a",
                format!("Cc: {}", one_line(&headers.cc.join(", "))),
            );
        }
        if !headers.from.is_empty() {
            push_pair(&mut args, "-a", format!("From: {}", one_line(headers.from)));
        }
        if !headers.reply_to.is_empty() {
            push_pair(
                &mut args,
                "-a",
                format!("Reply-To: {}", one_line(headers.reply_to)),
            );
        }
        for path in headers.attachments {
            push_pair(&mut args, "-A", path.as_str());
        }
        push_pair(&mut args, "-s", one_line(headers.subject));
        args.push(headers.to.to_string());

        Serialized {
            invocation: args,
            header_block: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn minimal<'a>(cc: &'a [String], attachments: &'a [String]) -> Headers<'a> {
        Headers {
            to: "jd@example.com",
            subject: "Hello John!",
            cc,
            from: "",
            reply_to: "",
            attachments,
            mailer: "",
        }
    }

    #[test]
    fn test_dialect_from_program() {
        assert_eq!(Dialect::from_program("sendmail"), Dialect::sendmail());
        assert_eq!(Dialect::from_program(" mailx "), Dialect::mailx());
        assert_eq!(
            Dialect::from_program("gnu-mail"),
            Dialect::Generic("gnu-mail".to_string())
        );
        assert_eq!(Dialect::from_program("gnu-mail").program(), "gnu-mail");
        assert!(!Dialect::sendmail().supports_attachments());
        assert!(Dialect::mailx().supports_attachments());
    }

    #[test]
    fn test_mailx_one_flag_per_cc() {
        let cc = strings(&["a@x", "b@y"]);
        let out = Dialect::mailx().serialize(&minimal(&cc, &[]));

        assert_eq!(
            out.invocation,
            strings(&["mailx", "-c", "a@x", "-c", "b@y", "-s", "Hello John!", "jd@example.com"])
        );
        assert_eq!(out.header_block, None);
    }

    #[test]
    fn test_mailx_full() {
        let cc = strings(&["a@x"]);
        let attachments = strings(&["/tmp/a.ics", "../doc.txt"]);
        let headers = Headers {
            from: "Frodo Baggins <rts@example.com>",
            reply_to: "John Doe <jd@mail.com>",
            mailer: "gmt 0.1.0",
            ..minimal(&cc, &attachments)
        };
        let out = Dialect::mailx().serialize(&headers);

        assert_eq!(
            out.invocation,
            strings(&[
                "mailx",
                "-c",
                "a@x",
                "-S",
                "from='Frodo Baggins <rts@example.com>'",
                "-S",
                "replyto='John Doe <jd@mail.com>'",
                "-a",
                "/tmp/a.ics",
                "-a",
                "../doc.txt",
                "-s",
                "Hello John!",
                "jd@example.com",
            ])
        );
    }

    #[test]
    fn test_generic_full() {
        let cc = strings(&["bl@kf.io", "info@ex.org"]);
        let attachments = strings(&["/tmp/a.ics"]);
        let headers = Headers {
            from: "Frodo Baggins <rts@example.com>",
            reply_to: "John Doe <jd@mail.com>",
            ..minimal(&cc, &attachments)
        };
        let out = Dialect::from_program("gnu-mail").serialize(&headers);

        assert_eq!(
            out.invocation,
            strings(&[
                "gnu-mail",
                "-a",
                "Cc: bl@kf.io, info@ex.org",
                "-a",
                "From: Frodo Baggins <rts@example.com>",
                "-a",
                "Reply-To: John Doe <jd@mail.com>",
                "-A",
                "/tmp/a.ics",
                "-s",
                "Hello John!",
                "jd@example.com",
            ])
        );
        assert_eq!(out.header_block, None);
    }

    #[test]
    fn test_empty_fields_are_omitted() {
        let mailx = Dialect::mailx().serialize(&minimal(&[], &[]));
        assert_eq!(
            mailx.invocation,
            strings(&["mailx", "-s", "Hello John!", "jd@example.com"])
        );
        assert!(!mailx.invocation.iter().any(|a| a.starts_with("replyto=")));

        let generic = Dialect::from_program("mail").serialize(&minimal(&[], &[]));
        assert_eq!(
            generic.invocation,
            strings(&["mail", "-s", "Hello John!", "jd@example.com"])
        );
        assert!(!generic.invocation.iter().any(|a| a.starts_with("Reply-To:")));
    }

    #[test]
    fn test_sendmail_header_block() {
        let cc = strings(&["a@x", "b@y"]);
        let headers = Headers {
            from: "Frodo Baggins <rts@example.com>",
            reply_to: "John Doe <jd@mail.com>",
            mailer: "gmt 0.1.0",
            ..minimal(&cc, &[])
        };
        let out = Dialect::sendmail().serialize(&headers);

        assert_eq!(out.invocation, strings(&["sendmail", "-t"]));
        assert_eq!(
            out.header_block.as_deref(),
            Some(
                "To: jd@example.com\n\
                 Subject: Hello John!\n\
                 Cc: a@x, b@y\n\
                 From: Frodo Baggins <rts@example.com>\n\
                 Reply-To: John Doe <jd@mail.com>\n\
                 X-Mailer: gmt 0.1.0\n\n"
            )
        );
    }

    #[test]
    fn test_sendmail_minimal_header_block() {
        let out = Dialect::sendmail().serialize(&minimal(&[], &[]));
        assert_eq!(
            out.header_block.as_deref(),
            Some("To: jd@example.com\nSubject: Hello John!\n\n")
        );
    }

    #[test]
    fn test_dialect_from_full_path() {
        let sendmail = Dialect::from_program("/usr/sbin/sendmail");
        assert_eq!(sendmail, Dialect::Sendmail("/usr/sbin/sendmail".to_string()));
        assert!(!sendmail.supports_attachments());
        assert_eq!(
            sendmail.serialize(&minimal(&[], &[])).invocation,
            strings(&["/usr/sbin/sendmail", "-t"])
        );

        let mailx = Dialect::from_program(" /usr/bin/mailx ");
        assert_eq!(mailx, Dialect::Mailx("/usr/bin/mailx".to_string()));
        assert_eq!(
            mailx.serialize(&minimal(&[], &[])).invocation,
            strings(&["/usr/bin/mailx", "-s", "Hello John!", "jd@example.com"])
        );

        assert_eq!(
            Dialect::from_program("/usr/local/bin/gnu-mail"),
            Dialect::Generic("/usr/local/bin/gnu-mail".to_string())
        );
        assert_eq!(mailx.to_string(), "/usr/bin/mailx");
    }

    #[test]
    fn test_sendmail_folds_line_breaks_in_values() {
        let cc = strings(&["a@x\r\nBcc: leak@evil.example"]);
        let headers = Headers {
            subject: "Hi\nBcc: victim@evil.example",
            from: "Frodo\r\n\r\nBody",
            ..minimal(&cc, &[])
        };
        let block = Dialect::sendmail()
            .serialize(&headers)
            .header_block
            .unwrap();

        assert_eq!(
            block,
            "To: jd@example.com\n\
             Subject: Hi Bcc: victim@evil.example\n\
             Cc: a@x Bcc: leak@evil.example\n\
             From: Frodo Body\n\n"
        );
        assert!(!block.lines().any(|line| line.starts_with("Bcc:")));
    }

    #[test]
    fn test_argument_dialects_fold_line_breaks() {
        let headers = Headers {
            subject: "Hi\r\nthere",
            from: "Frodo\nBcc: x@y",
            ..minimal(&[], &[])
        };
        let generic = Dialect::from_program("mail").serialize(&headers);
        assert_eq!(
            generic.invocation,
            strings(&["mail", "-a", "From: Frodo Bcc: x@y", "-s", "Hi there", "jd@example.com"])
        );
        let mailx = Dialect::mailx().serialize(&headers);
        assert_eq!(
            mailx.invocation,
            strings(&["mailx", "-S", "from='Frodo Bcc: x@y'", "-s", "Hi there", "jd@example.com"])
        );
    }
}
