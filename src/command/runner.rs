use std::process::Stdio;

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

use crate::buffer::StreamKind;
use crate::demux::OutputDemux;
use crate::error::{Error, Result};
use crate::event::SessionEvent;

/// Events buffered between the reader tasks and the UI tick
const CHANNEL_CAPACITY: usize = 1000;

/// Chunked reads instead of the byte-at-a-time loop; the demultiplexer
/// re-splits on \r and \n so event semantics are unchanged
const READ_BUF_SIZE: usize = 4096;

/// Handle for one running download subprocess
///
/// Owns the child and the receiving end of the session event channel. The
/// channel closes once both pipe readers hit end-of-stream, which is the
/// owner's signal to reap the exit code.
pub struct SessionHandle {
    child: Child,
    receiver: mpsc::Receiver<SessionEvent>,
}

impl SessionHandle {
    /// Receive the next event asynchronously; `None` means end-of-stream
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.receiver.recv().await
    }

    /// Ask the process to terminate gracefully (SIGTERM)
    ///
    /// The readers then observe end-of-stream and exit their loops
    /// naturally; no thread is ever cancelled forcibly.
    pub fn terminate(&self) {
        if let Some(pid) = self.child.id() {
            if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                tracing::warn!(pid, error = %e, "failed to signal process");
            }
        }
    }

    /// Kill the process outright (SIGKILL)
    pub async fn kill(&mut self) -> std::io::Result<()> {
        self.child.kill().await
    }

    /// Wait for the process to exit and return the exit code
    ///
    /// A signal death has no code and is reported as -1.
    pub async fn wait(&mut self) -> std::io::Result<i32> {
        let status = self.child.wait().await?;
        Ok(status.code().unwrap_or(-1))
    }

    /// Get the process ID
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }
}

/// Download subprocess launcher
pub struct DownloadRunner;

impl DownloadRunner {
    /// Spawn the downloader with a prebuilt argument vector
    ///
    /// Both pipes get their own reader task and demultiplexer instance;
    /// events from each pipe arrive on the shared channel in the order they
    /// were produced. A spawn failure is returned here, once, before any
    /// streaming begins.
    pub fn spawn(argv: &[String]) -> Result<SessionHandle> {
        let (program, args) = argv.split_first().ok_or_else(|| Error::Spawn {
            program: String::new(),
            reason: "empty argument vector".into(),
        })?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Spawn {
                program: program.clone(),
                reason: e.to_string(),
            })?;

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(pump(stdout, StreamKind::Stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(pump(stderr, StreamKind::Stderr, tx.clone()));
        }

        // Channel closes when both reader tasks complete
        drop(tx);

        Ok(SessionHandle {
            child,
            receiver: rx,
        })
    }
}

/// Pull chunks from one pipe through a demultiplexer into the channel
///
/// Blocks only on the pipe read, never on the UI. A mid-stream read error
/// is reported once and treated as end-of-stream.
async fn pump<R>(mut reader: R, kind: StreamKind, tx: mpsc::Sender<SessionEvent>)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut demux = OutputDemux::new();
    let mut buf = [0u8; READ_BUF_SIZE];

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                for event in demux.feed(&buf[..n]) {
                    if tx.send(SessionEvent::Output { kind, event }).await.is_err() {
                        // Receiver torn down; stop posting
                        return;
                    }
                }
            }
            Err(e) => {
                let _ = tx
                    .send(SessionEvent::ReadError {
                        kind,
                        message: e.to_string(),
                    })
                    .await;
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demux::OutputEvent;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".into(), "-c".into(), script.into()]
    }

    async fn collect_output(handle: &mut SessionHandle) -> Vec<(StreamKind, OutputEvent)> {
        let mut events = Vec::new();
        while let Some(event) = handle.next_event().await {
            if let SessionEvent::Output { kind, event } = event {
                events.push((kind, event));
            }
        }
        events
    }

    #[tokio::test]
    async fn runner_spawn_fails_for_missing_program() {
        let result = DownloadRunner::spawn(&["/nonexistent/vidgrab-downloader".into()]);
        assert!(matches!(result, Err(Error::Spawn { .. })));
    }

    #[tokio::test]
    async fn runner_spawn_fails_for_empty_argv() {
        let result = DownloadRunner::spawn(&[]);
        assert!(matches!(result, Err(Error::Spawn { .. })));
    }

    #[tokio::test]
    async fn runner_captures_stdout_as_append_events() {
        let mut handle = DownloadRunner::spawn(&sh("echo hello")).unwrap();

        let events = collect_output(&mut handle).await;
        assert!(events.contains(&(
            StreamKind::Stdout,
            OutputEvent::AppendLine("hello\n".into())
        )));

        assert_eq!(handle.wait().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn runner_captures_stderr_separately() {
        let mut handle = DownloadRunner::spawn(&sh("echo oops >&2")).unwrap();

        let events = collect_output(&mut handle).await;
        assert!(events.contains(&(
            StreamKind::Stderr,
            OutputEvent::AppendLine("oops\n".into())
        )));
    }

    #[tokio::test]
    async fn runner_demultiplexes_carriage_return_progress() {
        let mut handle =
            DownloadRunner::spawn(&sh(r#"printf 'one\rtwo\rdone\n'"#)).unwrap();

        let events: Vec<OutputEvent> = collect_output(&mut handle)
            .await
            .into_iter()
            .filter(|(kind, _)| *kind == StreamKind::Stdout)
            .map(|(_, e)| e)
            .collect();

        assert_eq!(
            events,
            vec![
                OutputEvent::ReplaceCurrent("one".into()),
                OutputEvent::ReplaceCurrent("two".into()),
                OutputEvent::AppendLine("done\n".into()),
            ]
        );
    }

    #[tokio::test]
    async fn runner_trailing_progress_line_stays_open_on_success() {
        // The process exits mid-progress: the last line was never
        // finalized with a newline
        let mut handle =
            DownloadRunner::spawn(&sh(r#"printf '10%%\r20%%\r30%%\r'"#)).unwrap();

        let events: Vec<OutputEvent> = collect_output(&mut handle)
            .await
            .into_iter()
            .map(|(_, e)| e)
            .collect();

        assert_eq!(
            events,
            vec![
                OutputEvent::ReplaceCurrent("10%".into()),
                OutputEvent::ReplaceCurrent("20%".into()),
                OutputEvent::ReplaceCurrent("30%".into()),
            ]
        );
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, OutputEvent::AppendLine(_)))
        );
        assert_eq!(handle.wait().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn runner_wait_reports_exit_code_verbatim() {
        let mut handle = DownloadRunner::spawn(&sh("exit 42")).unwrap();
        let _ = collect_output(&mut handle).await;

        assert_eq!(handle.wait().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn runner_terminate_stops_long_running_process() {
        let mut handle = DownloadRunner::spawn(&sh("sleep 10")).unwrap();
        assert!(handle.pid().is_some());

        handle.terminate();
        let _ = collect_output(&mut handle).await;

        // Died by signal: no exit code
        assert_eq!(handle.wait().await.unwrap(), -1);
    }

    #[tokio::test]
    async fn runner_kill_terminates_process() {
        let mut handle = DownloadRunner::spawn(&sh("sleep 10")).unwrap();

        handle.kill().await.unwrap();
        let _ = collect_output(&mut handle).await;
        assert_eq!(handle.wait().await.unwrap(), -1);
    }
}
