pub mod config;
pub mod dialect;
pub mod merge;
pub mod recipient;
pub mod synth;
pub mod template;
pub mod transport;

pub use config::{Config, ConfigError};
pub use dialect::Dialect;
pub use recipient::{parse_recipient_line, Recipient, RecipientError, SkippedRecipient};
pub use synth::{synthesize, synthesize_all, GlobalMessage, ResolvedMessage, Synthesis};
pub use template::resolve;
pub use transport::{send_all, CommandTransport, SendReport, Transport, TransportError};
