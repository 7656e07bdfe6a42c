use crate::synth::ResolvedMessage;
use serde::Serialize;
use std::future::Future;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("empty command line")]
    EmptyInvocation,
    #[error("{program} start failure ({source})")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot pipe message to {program} ({source})")]
    Stdin {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} {status}: {stderr}")]
    Status {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("{program} did not finish within {after:?}")]
    Timeout { program: String, after: Duration },
}

/// Delivers one resolved message.
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        message: &ResolvedMessage,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Runs the synthesized command line and pipes the body to its stdin.
#[derive(Debug, Clone)]
pub struct CommandTransport {
    timeout: Duration,
}

impl CommandTransport {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn run(&self, program: &str, args: &[String], body: &str) -> Result<(), TransportError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| TransportError::Spawn {
                program: program.to_string(),
                source,
            })?;

        // Feed stdin while stderr is drained, or a program that fills its
        // stderr pipe before reading the body never finishes.
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(body.as_bytes()).await?;
                // dropping stdin sends EOF
            }
            Ok::<(), std::io::Error>(())
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());

        let output = output.map_err(|source| TransportError::Spawn {
            program: program.to_string(),
            source,
        })?;

        if !output.status.success() {
            return Err(TransportError::Status {
                program: program.to_string(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        match fed {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                log::warn!("{program} exited before reading the whole message");
                Ok(())
            }
            Err(source) => Err(TransportError::Stdin {
                program: program.to_string(),
                source,
            }),
        }
    }
}

impl Transport for CommandTransport {
    async fn send(&self, message: &ResolvedMessage) -> Result<(), TransportError> {
        let (program, args) = message
            .invocation
            .split_first()
            .ok_or(TransportError::EmptyInvocation)?;

        match tokio::time::timeout(self.timeout, self.run(program, args, &message.body)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout {
                program: program.clone(),
                after: self.timeout,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendFailure {
    pub recipient: String,
    pub error: String,
}

/// Aggregate result of a send run, in the order the messages were given.
#[derive(Debug, Default, Serialize)]
pub struct SendReport {
    pub sent: Vec<String>,
    pub failed: Vec<SendFailure>,
}

impl SendReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Sends every message on its own task and waits for all of them.
pub async fn send_all<T: Transport>(transport: Arc<T>, messages: Vec<ResolvedMessage>) -> SendReport {
    let handles: Vec<_> = messages
        .into_iter()
        .map(|message| {
            let transport = Arc::clone(&transport);
            let recipient = message.recipient.clone();
            let handle = tokio::spawn(async move { transport.send(&message).await });
            (recipient, handle)
        })
        .collect();

    let mut report = SendReport::default();
    for (recipient, handle) in handles {
        let error = match handle.await {
            Ok(Ok(())) => {
                log::info!("Sent to {recipient}");
                report.sent.push(recipient);
                continue;
            }
            Ok(Err(e)) => e.to_string(),
            Err(e) => format!("send task failed: {e}"),
        };
        log::error!("Error sending to {recipient}: {error}");
        report.failed.push(SendFailure { recipient, error });
    }
    report
}
