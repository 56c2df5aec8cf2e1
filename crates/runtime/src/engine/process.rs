//! Streaming subprocess runner for container engine invocations
//!
//! Runs one engine command to completion while forwarding every output
//! line to the diagnostic sink as it is produced. This is a streaming
//! contract, not drain-after-exit: callers observe progress while the
//! process is still running, and the exit status only becomes available
//! after the sink has seen the full stream.

use std::collections::VecDeque;
use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

use crate::types::LogSink;

/// Outcome of one engine subprocess.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Exit code; `-1` when the process was terminated by a signal.
    pub status: i32,
    /// Bounded tail of the combined output, for error reports.
    pub tail: Vec<String>,
}

impl ProcessOutput {
    pub fn tail_text(&self) -> String {
        self.tail.join("\n")
    }
}

/// Spawn `binary args…` and forward each output line to `sink` until the
/// process exits. stdout and stderr are both forwarded; the last
/// `tail_limit` lines are retained for error reporting.
///
/// `child_path`, when set, replaces the child's `PATH`. The engine spawns
/// its own helpers (credential helpers in particular), which must be
/// resolvable even when the binary itself was found outside `PATH`.
///
/// Lines that are not valid UTF-8 are skipped rather than fatal; correct
/// behavior is only guaranteed under a UTF-8 host locale.
pub async fn stream_command(
    binary: &Path,
    args: &[String],
    child_path: Option<&OsStr>,
    sink: &dyn LogSink,
    tail_limit: usize,
) -> std::io::Result<ProcessOutput> {
    let mut command = Command::new(binary);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(path) = child_path {
        command.env("PATH", path);
    }
    let mut child = command.spawn()?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let tail = Mutex::new(VecDeque::with_capacity(tail_limit));

    // Both pipes must be drained concurrently or the child can block on a
    // full pipe buffer.
    tokio::join!(
        forward_lines(stdout, sink, &tail, tail_limit),
        forward_lines(stderr, sink, &tail, tail_limit),
    );

    let status = child.wait().await?;
    Ok(ProcessOutput {
        status: status.code().unwrap_or(-1),
        tail: tail.into_inner().into(),
    })
}

/// Capture a short engine command without streaming (probe and listing).
pub async fn capture_command(
    binary: &Path,
    args: &[String],
    child_path: Option<&OsStr>,
) -> std::io::Result<(i32, String, String)> {
    let mut command = Command::new(binary);
    command.args(args).stdin(Stdio::null());
    if let Some(path) = child_path {
        command.env("PATH", path);
    }
    let output = command.output().await?;
    Ok((
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
    ))
}

async fn forward_lines<R: AsyncRead + Unpin>(
    reader: Option<R>,
    sink: &dyn LogSink,
    tail: &Mutex<VecDeque<String>>,
    tail_limit: usize,
) {
    let Some(reader) = reader else {
        return;
    };
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => match std::str::from_utf8(&buf) {
                Ok(text) => {
                    let line = text.trim_end_matches('\n').trim_end_matches('\r');
                    sink.line(line);
                    let mut tail = tail.lock();
                    if tail.len() == tail_limit {
                        tail.pop_front();
                    }
                    tail.push_back(line.to_string());
                }
                Err(_) => {
                    tracing::debug!("skipping non-UTF-8 line in subprocess output");
                }
            },
            Err(error) => {
                tracing::warn!(%error, "subprocess output read failed");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CollectSink;
    use std::path::PathBuf;

    fn sh() -> PathBuf {
        PathBuf::from("/bin/sh")
    }

    fn args(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn test_streams_lines_in_order() {
        let sink = CollectSink::new();
        let out = stream_command(&sh(), &args("echo one; echo two"), None, &sink, 10)
            .await
            .unwrap();
        assert_eq!(out.status, 0);
        assert_eq!(sink.lines(), vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_nonzero_exit_reported() {
        let sink = CollectSink::new();
        let out = stream_command(&sh(), &args("echo failing; exit 3"), None, &sink, 10)
            .await
            .unwrap();
        assert_eq!(out.status, 3);
        assert!(out.tail_text().contains("failing"));
    }

    #[tokio::test]
    async fn test_stderr_forwarded() {
        let sink = CollectSink::new();
        let out = stream_command(&sh(), &args("echo oops >&2"), None, &sink, 10)
            .await
            .unwrap();
        assert_eq!(out.status, 0);
        assert_eq!(sink.lines(), vec!["oops"]);
    }

    #[tokio::test]
    async fn test_tail_is_bounded() {
        let sink = CollectSink::new();
        let out = stream_command(
            &sh(),
            &args("for i in 1 2 3 4 5 6; do echo line$i; done"),
            None,
            &sink,
            3,
        )
        .await
        .unwrap();
        assert_eq!(sink.lines().len(), 6);
        assert_eq!(out.tail, vec!["line4", "line5", "line6"]);
    }

    #[tokio::test]
    async fn test_non_utf8_line_skipped() {
        let sink = CollectSink::new();
        let out = stream_command(
            &sh(),
            &args("printf 'good\\n\\377\\376bad\\n'; echo after"),
            None,
            &sink,
            10,
        )
        .await
        .unwrap();
        assert_eq!(out.status, 0);
        assert_eq!(sink.lines(), vec!["good", "after"]);
    }

    #[tokio::test]
    async fn test_missing_binary_is_io_error() {
        let sink = CollectSink::new();
        let result = stream_command(
            Path::new("/no/such/engine"),
            &args("true"),
            None,
            &sink,
            10,
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_child_path_overrides_environment() {
        let sink = CollectSink::new();
        let path = std::ffi::OsString::from("/one:/two");
        stream_command(&sh(), &args("echo \"$PATH\""), Some(&path), &sink, 10)
            .await
            .unwrap();
        assert_eq!(sink.lines(), vec!["/one:/two"]);
    }

    #[tokio::test]
    async fn test_capture_command() {
        let (status, stdout, stderr) =
            capture_command(&sh(), &args("echo out; echo err >&2"), None)
                .await
                .unwrap();
        assert_eq!(status, 0);
        assert_eq!(stdout.trim(), "out");
        assert_eq!(stderr.trim(), "err");
    }
}
