//! Scanner subprocess.
//!
//! [`ScannerProcess`] runs a [`NucleiCommand`] to completion and streams every
//! output line into the log as it arrives. Only a failed launch is an error;
//! once the child is running, read and wait problems are logged and the run
//! is reported with an unknown exit code.
//!
//! ```text
//!   child stdout ──> reader task ──┐
//!                                  ├──> mpsc ──> log (target "nuclei")
//!   child stderr ──> reader task ──┘
//! ```

use std::future::Future;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::command::NucleiCommand;
use crate::error::NucleiError;

/// Buffered output lines between the reader tasks and the logger.
const LINE_CHANNEL_CAPACITY: usize = 256;

/// How a scanner run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit code; `None` when killed by a signal or when waiting failed
    pub code: Option<i32>,
    /// Output lines seen on stdout and stderr
    pub lines: usize,
}

impl ProcessExit {
    /// Exit code 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs the scanner.
pub trait ScannerProcess: Send + Sync {
    /// Runs `command` until the child exits.
    ///
    /// # Errors
    ///
    /// `NucleiError::Spawn` when the process cannot be started.
    fn run(
        &self,
        command: &NucleiCommand,
    ) -> impl Future<Output = Result<ProcessExit, NucleiError>> + Send;
}

impl<P: ScannerProcess> ScannerProcess for &P {
    fn run(
        &self,
        command: &NucleiCommand,
    ) -> impl Future<Output = Result<ProcessExit, NucleiError>> + Send {
        (**self).run(command)
    }
}

/// [`ScannerProcess`] backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScannerProcess;

impl TokioScannerProcess {
    /// Creates the process runner.
    pub fn new() -> Self {
        Self
    }
}

impl ScannerProcess for TokioScannerProcess {
    async fn run(&self, command: &NucleiCommand) -> Result<ProcessExit, NucleiError> {
        let mut child = Command::new(command.program())
            .args(command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| NucleiError::Spawn(format!("{}: {e}", command.program().display())))?;

        let (line_tx, mut line_rx) = mpsc::channel::<String>(LINE_CHANNEL_CAPACITY);

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, line_tx.clone(), "stdout"));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, line_tx.clone(), "stderr"));
        }
        // the loop below ends once both reader tasks drop their senders
        drop(line_tx);

        let mut lines = 0;
        while let Some(line) = line_rx.recv().await {
            info!(target: "nuclei", "{line}");
            lines += 1;
        }

        let code = match child.wait().await {
            Ok(status) => status.code(),
            Err(e) => {
                warn!(error = %e, "failed to wait for nuclei");
                None
            }
        };

        Ok(ProcessExit { code, lines })
    }
}

/// Sends each non-empty output line to `tx`.
///
/// Lines are decoded lossily since the scanner can echo raw response bytes.
/// The pipe stays open until EOF; closing it early would kill the scanner on
/// its next write.
async fn forward_lines<R>(reader: R, tx: mpsc::Sender<String>, stream: &'static str)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let decoded = String::from_utf8_lossy(&buf);
                let line = decoded.trim();
                if line.is_empty() {
                    continue;
                }
                if tx.send(line.to_owned()).await.is_err() {
                    discard(&mut reader, stream).await;
                    break;
                }
            }
            Err(e) => {
                warn!(stream, error = %e, "failed to read nuclei output, discarding the rest");
                discard(&mut reader, stream).await;
                break;
            }
        }
    }
}

/// Drains `reader` to EOF without logging.
async fn discard<R>(reader: &mut R, stream: &'static str)
where
    R: AsyncRead + Unpin,
{
    if let Err(e) = tokio::io::copy(reader, &mut tokio::io::sink()).await {
        warn!(stream, error = %e, "failed to drain nuclei output");
    }
}
