//! Shell bridge: wires an interpreter's standard streams to a session.
//!
//! Session bytes feed the interpreter's stdin. Its stdout and stderr are both
//! written back to the session through a single writer, so each stream keeps
//! its own order while the interleaving between them is whatever arrives first.

use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::{ChildStderr, ChildStdin, ChildStdout, Command};

use crate::error::ShellError;

const READ_BUF_SIZE: usize = 8 * 1024;

/// The command interpreter to run for each session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ShellSpec {
    /// Interpreter with no arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// The platform's standard command interpreter.
    pub fn platform_default() -> Self {
        if cfg!(windows) {
            Self::new("cmd.exe")
        } else {
            Self::new("/bin/sh")
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl Default for ShellSpec {
    fn default() -> Self {
        Self::platform_default()
    }
}

/// Run one interpreter against `stream` until it exits or the stream breaks.
///
/// Returns the interpreter's exit status, or `None` when the stream was
/// severed first (the interpreter is then killed). A clean end of input from
/// the peer only closes the interpreter's stdin; output keeps flowing until
/// the interpreter exits. No timeouts apply.
pub async fn pump<S>(stream: S, spec: &ShellSpec) -> Result<Option<ExitStatus>, ShellError>
where
    S: AsyncRead + AsyncWrite,
{
    let start_error = |source: io::Error| ShellError::InterpreterStart {
        program: spec.program.display().to_string(),
        source,
    };

    let mut child = spec.command().spawn().map_err(start_error)?;
    let (Some(stdin), Some(stdout), Some(stderr)) =
        (child.stdin.take(), child.stdout.take(), child.stderr.take())
    else {
        return Err(start_error(io::Error::other("interpreter stdio not captured")));
    };

    tracing::debug!(pid = ?child.id(), program = %spec.program.display(), "Interpreter started");

    let (mut net_read, mut net_write) = tokio::io::split(stream);

    let (status, severed) = {
        let input = forward_input(&mut net_read, stdin);
        let output = forward_output(stdout, stderr, &mut net_write);
        tokio::pin!(input, output);

        let mut status = None;
        let mut exited = false;
        let mut input_done = false;
        let mut output_done = false;
        let mut severed = false;

        while !(exited && output_done) {
            tokio::select! {
                result = child.wait(), if !exited => {
                    exited = true;
                    match result {
                        Ok(s) => status = Some(s),
                        Err(e) => tracing::debug!(error = %e, "Waiting on interpreter failed"),
                    }
                }
                result = &mut output, if !output_done => {
                    output_done = true;
                    if let Err(e) = result {
                        tracing::debug!(error = %e, "Session write failed");
                        severed = true;
                        break;
                    }
                }
                result = &mut input, if !input_done => {
                    input_done = true;
                    match result {
                        Ok(bytes) => tracing::debug!(bytes, "Interpreter input finished"),
                        Err(e) => {
                            tracing::debug!(error = %e, "Session read failed");
                            severed = true;
                            break;
                        }
                    }
                }
            }
        }

        (status, severed)
    };

    if severed {
        if let Err(e) = child.start_kill() {
            tracing::debug!(error = %e, "Interpreter already gone");
        }
        let _ = child.wait().await;
    }

    // Best effort close_notify; the peer may already be gone
    let _ = net_write.shutdown().await;

    tracing::debug!(?status, severed, "Interpreter session ended");
    Ok(status)
}

/// Copy session bytes into the interpreter's stdin.
///
/// Only a session read error is returned. Peer EOF and an interpreter that
/// stops reading (broken pipe) both end input normally, and dropping `stdin`
/// gives the interpreter its end of input.
async fn forward_input<R>(reader: &mut R, mut stdin: ChildStdin) -> io::Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_BUF_SIZE];
    let mut total = 0u64;

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(total);
        }
        if let Err(e) = stdin.write_all(&buf[..n]).await {
            tracing::debug!(error = %e, "Interpreter stopped reading input");
            return Ok(total);
        }
        total += n as u64;
    }
}

/// Copy stdout and stderr into `writer` until both reach EOF.
///
/// Local read errors end that stream only; write errors are returned because
/// they mean the session is gone.
async fn forward_output<W>(
    stdout: ChildStdout,
    stderr: ChildStderr,
    writer: &mut W,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut stdout = Some(stdout);
    let mut stderr = Some(stderr);
    let mut out_buf = vec![0u8; READ_BUF_SIZE];
    let mut err_buf = vec![0u8; READ_BUF_SIZE];

    while stdout.is_some() || stderr.is_some() {
        tokio::select! {
            read = read_some(&mut stdout, &mut out_buf), if stdout.is_some() => {
                match read {
                    Ok(0) => stdout = None,
                    Ok(n) => {
                        writer.write_all(&out_buf[..n]).await?;
                        writer.flush().await?;
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "Interpreter stdout read failed");
                        stdout = None;
                    }
                }
            }
            read = read_some(&mut stderr, &mut err_buf), if stderr.is_some() => {
                match read {
                    Ok(0) => stderr = None,
                    Ok(n) => {
                        writer.write_all(&err_buf[..n]).await?;
                        writer.flush().await?;
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "Interpreter stderr read failed");
                        stderr = None;
                    }
                }
            }
        }
    }

    Ok(())
}

async fn read_some<R>(reader: &mut Option<R>, buf: &mut [u8]) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    match reader {
        Some(r) => r.read(buf).await,
        None => std::future::pending().await,
    }
}
