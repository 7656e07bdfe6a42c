use crate::dialect::Dialect;
use crate::synth::GlobalMessage;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const SAMPLE_CONFIG: &str = r#"# mail program: 'sendmail', 'mailx' or any client accepting -a "Header: value"
# (gnu-mail on arch linux, mail on ubuntu)
mail_prog: gnu-mail
from: Frodo Baggins <rts@example.com>
#cc: weirdo@nsb.gov, cc@example.com
#reply_to: John Doe <jd@mail.com>
subject: Hello %FN%!
#attachments: [/home/user/atmt1.ics, ../Documents/doc2.txt]
#send_timeout_seconds: 60
#vars:
#  EVENT: RustConf
recipients:
  # email=first last|KEY:-value|... ; 'Cc:-+addr' adds to the global Cc, 'Cc:-addr' replaces it
  - jd@example.com=John Doe Jr.|ORG:-EFF|TITLE:-PhD
  - mm@gmail.com=Mickey Mouse|ORG:-Disney
  - daisy@example.com=Daisy Lila|ORG:-NASA|TITLE:-Dr.
"#;

pub fn sample_template(version: &str) -> String {
    format!(
        "FN / LN / EA = first name / last name / email address

Hello %FN% // %LN%, how are things going at %ORG%?
this is your email: %EA% :)


Sent with gmt version {version}, see https://301.mx/gmt for details."
    )
}

/// Value for the `X-Mailer` header.
pub fn product() -> String {
    format!("gmt {VERSION}")
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot access '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error("'mail_prog' not configured!")]
    MissingMailProg,
    #[error("'subject' not configured!")]
    MissingSubject,
    #[error("no recipients configured!")]
    NoRecipients,
    #[error("Cannot use '{0}' with attachments!")]
    AttachmentsUnsupported(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub mail_prog: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub from: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reply_to: String,
    #[serde(default, deserialize_with = "comma_list")]
    pub cc: Vec<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "comma_list")]
    pub attachments: Vec<String>,
    #[serde(default = "default_send_timeout")]
    pub send_timeout_seconds: u64,
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
    /// Raw recipient lines, parsed later so that bad lines only skip
    /// themselves.
    #[serde(default)]
    pub recipients: Vec<String>,
}

fn default_send_timeout() -> u64 {
    60
}

/// Accepts a YAML list, a single comma separated string, or nothing at all
/// (`cc:` with no value).
fn comma_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum List {
        Joined(String),
        Items(Vec<String>),
    }

    let items = match Option::<List>::deserialize(deserializer)? {
        Some(List::Joined(joined)) => joined.split(',').map(str::to_string).collect(),
        Some(List::Items(items)) => items,
        None => Vec::new(),
    };
    Ok(items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect())
}

impl Default for Config {
    fn default() -> Self {
        Config {
            mail_prog: crate::dialect::MAILX.to_string(),
            from: "Frodo Baggins <rts@example.com>".to_string(),
            reply_to: String::new(),
            cc: Vec::new(),
            subject: Some("Hello %FN%!".to_string()),
            attachments: Vec::new(),
            send_timeout_seconds: default_send_timeout(),
            vars: BTreeMap::new(),
            recipients: vec![
                "jd@example.com=John Doe Jr.|ORG:-EFF|TITLE:-PhD".to_string(),
                "mm@gmail.com=Mickey Mouse|ORG:-Disney".to_string(),
            ],
        }
    }
}

impl Config {
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mail_prog.trim().is_empty() {
            return Err(ConfigError::MissingMailProg);
        }
        if self.subject.is_none() {
            return Err(ConfigError::MissingSubject);
        }
        if self.recipients.is_empty() {
            return Err(ConfigError::NoRecipients);
        }
        let dialect = self.dialect();
        if !self.attachments.is_empty() && !dialect.supports_attachments() {
            return Err(ConfigError::AttachmentsUnsupported(dialect.to_string()));
        }
        Ok(())
    }

    pub fn dialect(&self) -> Dialect {
        Dialect::from_program(&self.mail_prog)
    }

    /// Builds the shared message settings around `body`.
    pub fn global_message(&self, body: &str) -> GlobalMessage {
        GlobalMessage {
            dialect: self.dialect(),
            from: self.from.trim().to_string(),
            reply_to: self.reply_to.trim().to_string(),
            cc: self.cc.clone(),
            subject: self.subject.clone().unwrap_or_default(),
            body: body.to_string(),
            attachments: self.attachments.clone(),
            product: product(),
            vars: self.vars.clone(),
        }
    }
}
