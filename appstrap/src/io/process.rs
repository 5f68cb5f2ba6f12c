//! External command execution with timeouts and bounded output.
//!
//! Every step-level action that touches an external tool goes through the
//! [`ProcessRunner`] trait, so orchestration can be tested with scripted runners
//! that never spawn processes.

use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

use crate::error::ProcessError;

const REDACTED: &str = "******";

/// One external command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
    pub timeout: Duration,
    /// Values masked in [`CommandSpec::display`].
    pub secrets: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            env: Vec::new(),
            timeout,
            secrets: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable whose value is treated as a secret.
    pub fn secret_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.secrets.push(value.clone());
        }
        self.env.push((key.into(), value));
        self
    }

    /// First positional argument, used by fakes to match invocations.
    pub fn subcommand(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    /// Shell-quoted command line with secrets masked.
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| shell_quote(&self.redact(part)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn redact(&self, part: &str) -> String {
        self.secrets
            .iter()
            .fold(part.to_string(), |acc, secret| acc.replace(secret, REDACTED))
    }
}

/// Quote a word for a POSIX shell. Words made of safe characters pass through.
pub fn shell_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,@+%".contains(c));
    if safe {
        return word.to_string();
    }
    format!("'{}'", word.replace('\'', r"'\''"))
}

/// Captured output of a successful command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Executes external commands for pipeline steps.
pub trait ProcessRunner {
    /// Run to completion. Non-zero exit and timeout are errors.
    fn run(&self, command: &CommandSpec) -> Result<CommandOutput, ProcessError>;

    /// Start a command without waiting for it. Failures are never reported.
    fn spawn_detached(&self, command: &CommandSpec);
}

/// Runner backed by real child processes.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    output_limit_bytes: usize,
}

impl SystemRunner {
    pub fn new(output_limit_bytes: usize) -> Self {
        Self { output_limit_bytes }
    }

    fn command(spec: &CommandSpec) -> Command {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args).current_dir(&spec.cwd);
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }
        cmd
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new(100_000)
    }
}

impl ProcessRunner for SystemRunner {
    #[instrument(skip_all, fields(command = %spec.display(), timeout_ms = spec.timeout.as_millis() as u64))]
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ProcessError> {
        let captured = run_command_with_timeout(
            Self::command(spec),
            &spec.display(),
            spec.timeout,
            self.output_limit_bytes,
        )?;
        let stderr = String::from_utf8_lossy(&captured.stderr).into_owned();

        if captured.timed_out {
            return Err(ProcessError::TimedOut {
                command: spec.display(),
                timeout: spec.timeout,
                stderr,
            });
        }
        if captured.exit_code != Some(0) {
            warn!(exit_code = ?captured.exit_code, "command failed");
            return Err(ProcessError::Failed {
                command: spec.display(),
                exit_code: captured.exit_code,
                stderr,
            });
        }

        Ok(CommandOutput {
            exit_code: 0,
            stdout: String::from_utf8_lossy(&captured.stdout).into_owned(),
            stderr,
        })
    }

    fn spawn_detached(&self, spec: &CommandSpec) {
        let mut cmd = Self::command(spec);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        match cmd.spawn() {
            Ok(mut child) => {
                debug!(command = %spec.display(), pid = child.id(), "detached command started");
                // Reap in the background; nobody joins this thread.
                thread::spawn(move || {
                    let _ = child.wait();
                });
            }
            Err(err) => debug!(command = %spec.display(), err = %err, "detached command failed to start"),
        }
    }
}

/// Raw output of a finished (or killed) child.
#[derive(Debug)]
struct CapturedOutput {
    exit_code: Option<i32>,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    timed_out: bool,
}

/// Run a command with a timeout and capture stdout/stderr without risking pipe deadlocks.
///
/// Output is read concurrently while the child runs. `output_limit_bytes` bounds the amount of
/// stdout/stderr stored in memory (bytes beyond this are discarded while still draining the pipe).
fn run_command_with_timeout(
    mut cmd: Command,
    label: &str,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CapturedOutput, ProcessError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("spawning child process");
    let mut child = cmd.spawn().map_err(|source| {
        error!(err = %source, "failed to spawn command");
        ProcessError::Spawn {
            command: label.to_string(),
            source,
        }
    })?;
    let wait_err = |source| ProcessError::Wait {
        command: label.to_string(),
        source,
    };

    let stdout = spawn_reader(child.stdout.take(), output_limit_bytes);
    let stderr = spawn_reader(child.stderr.take(), output_limit_bytes);

    let mut timed_out = false;
    let status = match child.wait_timeout(timeout).map_err(wait_err)? {
        Some(status) => status,
        None => {
            warn!(
                timeout_ms = timeout.as_millis() as u64,
                "command timed out, killing"
            );
            timed_out = true;
            child.kill().map_err(wait_err)?;
            child.wait().map_err(wait_err)?
        }
    };

    // Descendants of a killed child can keep the pipes open indefinitely.
    let deadline = timed_out.then(|| Instant::now() + KILL_GRACE);
    let (stdout, stdout_truncated) = stdout.collect(deadline);
    let (stderr, stderr_truncated) = stderr.collect(deadline);
    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CapturedOutput {
        exit_code: status.code(),
        stdout,
        stderr,
        timed_out,
    })
}

/// How long reader threads may keep draining after a timed-out child was killed.
const KILL_GRACE: Duration = Duration::from_millis(250);

#[derive(Debug, Default)]
struct StreamCapture {
    bytes: Vec<u8>,
    truncated: usize,
}

/// A background thread draining one pipe into a shared, bounded buffer.
struct StreamReader {
    capture: Arc<Mutex<StreamCapture>>,
    handle: thread::JoinHandle<std::io::Result<()>>,
}

fn spawn_reader<R: Read + Send + 'static>(reader: Option<R>, limit: usize) -> StreamReader {
    let capture = Arc::new(Mutex::new(StreamCapture::default()));
    let sink = Arc::clone(&capture);
    let handle = thread::spawn(move || read_stream_limited(reader, limit, &sink));
    StreamReader { capture, handle }
}

impl StreamReader {
    /// Wait for the reader to finish, or until `deadline`; then return what was captured.
    ///
    /// A reader still blocked at the deadline is left running and its pipe abandoned.
    fn collect(self, deadline: Option<Instant>) -> (Vec<u8>, usize) {
        if let Some(deadline) = deadline {
            while !self.handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(10));
            }
        }
        if self.handle.is_finished() || deadline.is_none() {
            match self.handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(err = %err, "failed to read child output"),
                Err(_) => warn!("output reader thread panicked"),
            }
        } else {
            warn!("output pipe still held by a descendant process, abandoning reader");
        }
        let capture = self.capture.lock().unwrap_or_else(PoisonError::into_inner);
        (capture.bytes.clone(), capture.truncated)
    }
}

fn read_stream_limited<R: Read>(
    reader: Option<R>,
    limit: usize,
    sink: &Mutex<StreamCapture>,
) -> std::io::Result<()> {
    let Some(mut reader) = reader else {
        return Ok(());
    };
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        let mut capture = sink.lock().unwrap_or_else(PoisonError::into_inner);
        let remaining = limit.saturating_sub(capture.bytes.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            capture.bytes.extend_from_slice(&chunk[..keep]);
            capture.truncated += n.saturating_sub(keep);
        } else {
            capture.truncated += n;
        }
    }

    Ok(())
}
