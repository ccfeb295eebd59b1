//! Hook process execution
//!
//! [`HookProcess`] runs one [`HookCommand`] against one [`EventPayload`]: it spawns the
//! program (no shell), writes the payload to stdin, captures bounded stdout/stderr and
//! enforces the command timeout.
//!
//! The child is started in its own process group. Every exit path, including the
//! caller dropping the future, goes through [`RunningHook`], whose `Drop` kills the
//! whole group, so no hook outlives the event it was spawned for.

use std::borrow::Cow;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::command_hook::HookCommand;
use super::hook_input::EventPayload;
use crate::error::HookExecutionError;

/// Exit code reported for a hook killed at its deadline. Real exit codes are 0..=255.
pub const TIMED_OUT_EXIT_CODE: i32 = -1;

/// Default cap for each captured stream
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// Default time between SIGTERM and SIGKILL
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_millis(500);

const TRUNCATION_MARKER: &str = "\n... (output truncated due to size limit)";

/// Tunables for a [`HookProcess`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Maximum bytes kept per stream; the rest is drained and discarded
    pub max_output_bytes: usize,
    /// Grace period between the polite and the unconditional kill
    pub kill_grace: Duration,
    /// How long to wait for the output pipes to close after the child exited
    pub drain_timeout: Duration,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            kill_grace: DEFAULT_KILL_GRACE,
            drain_timeout: Duration::from_secs(1),
        }
    }
}

/// Raw outcome of one hook invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookExecutionResult {
    /// Process exit code; [`TIMED_OUT_EXIT_CODE`] when `timed_out`
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub duration: Duration,
    pub timed_out: bool,
    /// Whether either stream hit the output cap
    pub truncated: bool,
}

impl HookExecutionResult {
    /// Result of a process that exited on its own
    pub fn exited(exit_code: i32, stdout: impl Into<Vec<u8>>, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
            duration: Duration::ZERO,
            timed_out: false,
            truncated: false,
        }
    }

    /// Result of a process killed at its deadline
    pub fn timed_out(duration: Duration) -> Self {
        Self {
            exit_code: TIMED_OUT_EXIT_CODE,
            stdout: Vec::new(),
            stderr: Vec::new(),
            duration,
            timed_out: true,
            truncated: false,
        }
    }

    /// Duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        self.duration.as_millis() as u64
    }

    /// stdout decoded lossily as UTF-8
    pub fn stdout_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    /// stderr decoded lossily as UTF-8
    pub fn stderr_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }

    /// Check if the process exited with status 0
    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }

    /// Execution error to report for this result, if any
    ///
    /// Exit code 2 is the blocking protocol signal, not an error.
    pub fn failure(&self, command: &HookCommand) -> Option<HookExecutionError> {
        if self.timed_out {
            return Some(HookExecutionError::Timeout {
                command: command.command.clone(),
                timeout_secs: command.timeout_secs,
            });
        }
        match self.exit_code {
            0 | 2 => None,
            code => Some(HookExecutionError::NonZeroExit {
                command: command.command.clone(),
                code,
                stderr: self.stderr_text().trim().to_string(),
            }),
        }
    }
}

/// Executes hook commands
#[derive(Debug, Clone, Default)]
pub struct HookProcess {
    options: ProcessOptions,
}

impl HookProcess {
    /// Create an executor with the given options
    pub fn new(options: ProcessOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ProcessOptions {
        &self.options
    }

    /// Run `command` with `payload` on stdin
    pub async fn execute(
        &self,
        command: &HookCommand,
        payload: &EventPayload,
    ) -> Result<HookExecutionResult, HookExecutionError> {
        self.execute_with_cancel(command, payload, &CancellationToken::new())
            .await
    }

    /// Run `command`, terminating it early if `cancel` fires
    pub async fn execute_with_cancel(
        &self,
        command: &HookCommand,
        payload: &EventPayload,
        cancel: &CancellationToken,
    ) -> Result<HookExecutionResult, HookExecutionError> {
        let start = Instant::now();
        let input = payload
            .to_json_line()
            .map_err(|e| HookExecutionError::Io {
                command: command.command.clone(),
                message: e.to_string(),
            })?;

        let mut running = self.spawn(command, payload)?;
        running.feed_stdin(input);

        debug!(
            "Spawned hook '{}' (pid {:?}, timeout {}s)",
            command, running.pid, command.timeout_secs
        );

        let deadline = command.timeout();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => WaitOutcome::Cancelled,
            waited = timeout(deadline, running.child.wait()) => match waited {
                Ok(Ok(status)) => WaitOutcome::Exited(status),
                Ok(Err(e)) => WaitOutcome::WaitFailed(e),
                Err(_) => WaitOutcome::TimedOut,
            },
        };

        match outcome {
            WaitOutcome::Exited(status) => {
                // Background children may still hold the pipes open.
                running.kill_group();
                let (stdout, stderr) = running.collect_output(self.options.drain_timeout).await;
                let truncated = stdout.truncated || stderr.truncated;
                Ok(HookExecutionResult {
                    exit_code: exit_code(status),
                    stdout: stdout.data,
                    stderr: stderr.data,
                    duration: start.elapsed(),
                    timed_out: false,
                    truncated,
                })
            }
            WaitOutcome::TimedOut => {
                warn!("Hook '{}' timed out after {:?}", command, deadline);
                running.terminate(self.options.kill_grace).await;
                let (stdout, stderr) = running.collect_output(self.options.drain_timeout).await;
                Ok(HookExecutionResult {
                    stdout: stdout.data,
                    stderr: stderr.data,
                    truncated: stdout.truncated || stderr.truncated,
                    ..HookExecutionResult::timed_out(start.elapsed())
                })
            }
            WaitOutcome::Cancelled => {
                debug!("Hook '{}' cancelled", command);
                running.terminate(self.options.kill_grace).await;
                running.abort_readers();
                Err(HookExecutionError::Cancelled {
                    command: command.command.clone(),
                })
            }
            WaitOutcome::WaitFailed(e) => {
                running.terminate(self.options.kill_grace).await;
                running.abort_readers();
                Err(HookExecutionError::Io {
                    command: command.command.clone(),
                    message: format!("failed to wait for process: {}", e),
                })
            }
        }
    }

    fn spawn(
        &self,
        command: &HookCommand,
        payload: &EventPayload,
    ) -> Result<RunningHook, HookExecutionError> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = working_dir(command, payload) {
            cmd.current_dir(dir);
        }

        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|e| HookExecutionError::SpawnFailed {
            command: command.command.clone(),
            message: e.to_string(),
        })?;

        let max_output = self.options.max_output_bytes;
        let stdout = child
            .stdout
            .take()
            .map(|out| tokio::spawn(read_output_limited(out, max_output)));
        let stderr = child
            .stderr
            .take()
            .map(|err| tokio::spawn(read_output_limited(err, max_output)));

        Ok(RunningHook {
            pid: child.id(),
            child,
            stdin_task: None,
            stdout,
            stderr,
            reaped: false,
        })
    }
}

enum WaitOutcome {
    Exited(ExitStatus),
    TimedOut,
    Cancelled,
    WaitFailed(std::io::Error),
}

/// Explicit working directory, else the payload's cwd when it exists
fn working_dir(command: &HookCommand, payload: &EventPayload) -> Option<PathBuf> {
    command
        .working_dir
        .clone()
        .or_else(|| Some(payload.cwd.clone()).filter(|dir| dir.is_dir()))
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

#[derive(Debug, Default)]
struct CapturedOutput {
    data: Vec<u8>,
    truncated: bool,
}

/// Read a stream to EOF, keeping at most `max_bytes`
///
/// Reading continues past the cap so the child never blocks on a full pipe.
async fn read_output_limited<R: AsyncRead + Unpin>(mut reader: R, max_bytes: usize) -> CapturedOutput {
    let mut output = CapturedOutput::default();
    let mut buf = [0u8; 8192];

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let room = max_bytes.saturating_sub(output.data.len());
                if n > room {
                    output.data.extend_from_slice(&buf[..room]);
                    output.truncated = true;
                } else {
                    output.data.extend_from_slice(&buf[..n]);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }

    if output.truncated {
        output.data.extend_from_slice(TRUNCATION_MARKER.as_bytes());
    }
    output
}

/// A spawned hook that has not been fully cleaned up yet
struct RunningHook {
    child: Child,
    pid: Option<u32>,
    stdin_task: Option<JoinHandle<()>>,
    stdout: Option<JoinHandle<CapturedOutput>>,
    stderr: Option<JoinHandle<CapturedOutput>>,
    reaped: bool,
}

impl RunningHook {
    /// Write the payload and close stdin without blocking the wait
    fn feed_stdin(&mut self, input: Vec<u8>) {
        let Some(mut stdin) = self.child.stdin.take() else {
            return;
        };
        self.stdin_task = Some(tokio::spawn(async move {
            if let Err(e) = stdin.write_all(&input).await {
                // Hooks are free to ignore their input and exit early.
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    debug!("Failed to write hook payload: {}", e);
                }
            }
            let _ = stdin.shutdown().await;
        }));
    }

    /// SIGTERM the group, wait out the grace period, then SIGKILL and reap
    async fn terminate(&mut self, grace: Duration) {
        #[cfg(unix)]
        if let Some(pid) = self.pid {
            use nix::sys::signal::Signal;

            if signal_group(pid, Signal::SIGTERM)
                && timeout(grace, self.child.wait()).await.is_ok()
            {
                self.kill_group();
                self.reaped = true;
                return;
            }
        }
        #[cfg(not(unix))]
        let _ = grace;

        self.kill_group();
        if let Err(e) = self.child.kill().await {
            debug!("Failed to kill hook process: {}", e);
        }
        self.reaped = true;
    }

    /// SIGKILL whatever is left of the process group
    fn kill_group(&mut self) {
        #[cfg(unix)]
        if let Some(pid) = self.pid {
            use nix::sys::signal::Signal;

            signal_group(pid, Signal::SIGKILL);
        }
        if self.child.try_wait().ok().flatten().is_some() {
            self.reaped = true;
        }
    }

    async fn collect_output(&mut self, drain: Duration) -> (CapturedOutput, CapturedOutput) {
        let stdout = join_reader(self.stdout.take(), drain).await;
        let stderr = join_reader(self.stderr.take(), drain).await;
        if let Some(task) = self.stdin_task.take() {
            task.abort();
        }
        (stdout, stderr)
    }

    fn abort_readers(&mut self) {
        for task in [self.stdout.take(), self.stderr.take()].into_iter().flatten() {
            task.abort();
        }
        if let Some(task) = self.stdin_task.take() {
            task.abort();
        }
    }
}

impl Drop for RunningHook {
    fn drop(&mut self) {
        if !self.reaped {
            #[cfg(unix)]
            if let Some(pid) = self.pid {
                signal_group(pid, nix::sys::signal::Signal::SIGKILL);
            }
            let _ = self.child.start_kill();
        }
        self.abort_readers();
    }
}

async fn join_reader(task: Option<JoinHandle<CapturedOutput>>, drain: Duration) -> CapturedOutput {
    let Some(mut task) = task else {
        return CapturedOutput::default();
    };
    match timeout(drain, &mut task).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            debug!("Output reader failed: {}", e);
            CapturedOutput::default()
        }
        Err(_) => {
            warn!("Hook output pipe still open after {:?}; discarding", drain);
            task.abort();
            CapturedOutput::default()
        }
    }
}

/// Send `signal` to the process group led by `pid`. Returns false if it is gone.
#[cfg(unix)]
fn signal_group(pid: u32, signal: nix::sys::signal::Signal) -> bool {
    use nix::sys::signal::killpg;
    use nix::unistd::Pid;

    match killpg(Pid::from_raw(pid as i32), signal) {
        Ok(()) => true,
        Err(nix::errno::Errno::ESRCH) => false,
        Err(e) => {
            warn!("Failed to send {} to hook process group {}: {}", signal, pid, e);
            false
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::hooks::events::EventKind;
    use serde_json::json;

    fn sh(script: &str) -> HookCommand {
        HookCommand::new("/bin/sh").with_args(["-c", script])
    }

    fn payload() -> EventPayload {
        EventPayload::pre_action("test-session", "Write", json!({"path": "a.txt"}))
    }

    fn process_exists(pid: i32) -> bool {
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        kill(Pid::from_raw(pid), None).is_ok()
    }

    #[tokio::test]
    async fn test_execute_captures_output_and_exit_code() {
        let result = HookProcess::default()
            .execute(&sh("echo out; echo err >&2; exit 3"), &payload())
            .await
            .unwrap();
        assert_eq!(result.exit_code, 3);
        assert_eq!(result.stdout_text().trim(), "out");
        assert_eq!(result.stderr_text().trim(), "err");
        assert!(!result.timed_out);
        assert!(!result.truncated);
    }

    #[tokio::test]
    async fn test_payload_written_to_stdin() {
        let result = HookProcess::default()
            .execute(&sh("cat"), &payload())
            .await
            .unwrap();
        let echoed: serde_json::Value = serde_json::from_slice(&result.stdout).unwrap();
        assert_eq!(echoed["hook_event_name"], "PreAction");
        assert_eq!(echoed["subject"], "Write");
        assert_eq!(echoed["tool_input"]["path"], "a.txt");
        assert_eq!(result.stdout.last(), Some(&b'\n'));
    }

    #[tokio::test]
    async fn test_hook_ignoring_stdin_still_succeeds() {
        let big = EventPayload::new(EventKind::PromptSubmit, "s")
            .with_field("prompt", json!("x".repeat(512 * 1024)));
        let result = HookProcess::default()
            .execute(&sh("exit 0"), &big)
            .await
            .unwrap();
        assert!(result.success());
    }

    #[tokio::test]
    async fn test_output_is_truncated_with_marker() {
        let process = HookProcess::new(ProcessOptions {
            max_output_bytes: 1024,
            ..Default::default()
        });
        let result = process
            .execute(&sh("head -c 100000 /dev/zero | tr '\\0' 'a'"), &payload())
            .await
            .unwrap();
        assert!(result.truncated);
        assert!(result.stdout_text().ends_with(TRUNCATION_MARKER));
        assert_eq!(result.stdout.len(), 1024 + TRUNCATION_MARKER.len());
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let process = HookProcess::new(ProcessOptions {
            kill_grace: Duration::from_millis(100),
            ..Default::default()
        });
        let command = sh("echo $$; exec sleep 30").with_timeout(1);
        let start = Instant::now();
        let result = process.execute(&command, &payload()).await.unwrap();

        assert!(result.timed_out);
        assert_eq!(result.exit_code, TIMED_OUT_EXIT_CODE);
        assert!(start.elapsed() < Duration::from_secs(5));
        let pid: i32 = result.stdout_text().trim().parse().unwrap();
        assert!(!process_exists(pid));
        assert!(result.failure(&command).is_some());
    }

    #[tokio::test]
    async fn test_timeout_escalates_past_ignored_sigterm() {
        let process = HookProcess::new(ProcessOptions {
            kill_grace: Duration::from_millis(200),
            ..Default::default()
        });
        let command = sh("trap '' TERM; echo $$; while true; do sleep 1; done").with_timeout(1);
        let result = process.execute(&command, &payload()).await.unwrap();

        assert!(result.timed_out);
        let pid: i32 = result.stdout_text().trim().parse().unwrap();
        assert!(!process_exists(pid));
    }

    #[tokio::test]
    async fn test_background_children_do_not_hang_execution() {
        let process = HookProcess::new(ProcessOptions {
            drain_timeout: Duration::from_millis(200),
            ..Default::default()
        });
        let start = Instant::now();
        let result = process
            .execute(&sh("sleep 30 & echo started"), &payload())
            .await
            .unwrap();
        assert_eq!(result.exit_code, 0);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_cancellation_terminates_hook() {
        let process = HookProcess::default();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let result = process
            .execute_with_cancel(&sh("sleep 30").with_timeout(60), &payload(), &cancel)
            .await;
        assert!(matches!(result, Err(HookExecutionError::Cancelled { .. })));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let result = HookProcess::default()
            .execute(&HookCommand::new("/nonexistent/hook-binary"), &payload())
            .await;
        assert!(matches!(result, Err(HookExecutionError::SpawnFailed { .. })));
    }

    #[tokio::test]
    async fn test_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let expected = dir.path().canonicalize().unwrap();
        let result = HookProcess::default()
            .execute(&sh("pwd -P").with_working_dir(dir.path()), &payload())
            .await
            .unwrap();
        assert_eq!(result.stdout_text().trim(), expected.display().to_string());
    }

    #[test]
    fn test_failure_classification() {
        let command = HookCommand::new("/bin/true");
        assert!(HookExecutionResult::exited(0, "", "").failure(&command).is_none());
        assert!(HookExecutionResult::exited(2, "", "no").failure(&command).is_none());
        assert!(matches!(
            HookExecutionResult::exited(1, "", "boom").failure(&command),
            Some(HookExecutionError::NonZeroExit { code: 1, .. })
        ));
        assert!(matches!(
            HookExecutionResult::timed_out(Duration::from_secs(1)).failure(&command),
            Some(HookExecutionError::Timeout { .. })
        ));
    }
}
