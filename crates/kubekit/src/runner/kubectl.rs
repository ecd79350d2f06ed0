//! Real kubectl runner using subprocesses.
//!
//! Standard output and error are buffered in memory in full. Manifests and
//! the objects they describe are bounded-size documents, so this is not a
//! concern in practice, but it is a scale limit.

use crate::error::{Error, Result};
use crate::runner::Runner;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Runner that executes a real kubectl binary.
#[derive(Debug, Clone)]
pub struct KubectlRunner {
    /// Path to the kubectl executable
    program: PathBuf,
    /// Flags placed before every command (`--kubeconfig`, `--context`)
    global_args: Vec<String>,
    /// Deadline for a single invocation; unbounded when `None`
    timeout: Option<Duration>,
}

impl KubectlRunner {
    /// Create a runner for the kubectl found on PATH.
    pub fn new() -> Result<Self> {
        let program = which::which("kubectl").map_err(|_| Error::ToolNotFound)?;
        Ok(Self::with_program(program))
    }

    /// Create a runner for an explicit executable.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            global_args: Vec::new(),
            timeout: None,
        }
    }

    /// Use a specific kubeconfig file.
    pub fn with_kubeconfig(mut self, path: impl AsRef<Path>) -> Self {
        self.global_args.push("--kubeconfig".to_string());
        self.global_args
            .push(path.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Use a specific kubeconfig context.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.global_args.push("--context".to_string());
        self.global_args.push(context.into());
        self
    }

    /// Kill the process and fail if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Path of the executable this runner invokes.
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn full_args<'a>(&'a self, args: &[&'a str]) -> Vec<&'a str> {
        self.global_args
            .iter()
            .map(String::as_str)
            .chain(args.iter().copied())
            .collect()
    }
}

impl Runner for KubectlRunner {
    fn run(&self, args: &[&str], stdin: Option<&str>) -> Result<String> {
        let args = self.full_args(args);
        let command = format!("{} {}", self.program.display(), args.join(" "));
        log::debug!("running {command}");

        let spawn_err = |source: io::Error| Error::Spawn {
            command: command.clone(),
            source,
        };

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;

        // Fed from its own thread so the deadline also covers a child that
        // never reads its input
        let writer = match (stdin, child.stdin.take()) {
            (Some(input), Some(pipe)) => Some(feed(pipe, input.to_string())),
            _ => None,
        };

        let output = match self.timeout {
            None => child.wait_with_output().map_err(spawn_err)?,
            Some(timeout) => match wait_with_deadline(child, timeout).map_err(spawn_err)? {
                Some(output) => output,
                None => return Err(Error::Timeout { command, timeout }),
            },
        };

        // An early exit closes the pipe; the exit status reports why
        if let Some(Ok(Err(e))) = writer.map(thread::JoinHandle::join) {
            if e.kind() != io::ErrorKind::BrokenPipe {
                return Err(spawn_err(e));
            }
        }

        if !output.status.success() {
            return Err(Error::Tool {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        log::trace!("{stdout}");
        Ok(stdout)
    }
}

/// Wait for `child`, killing it once `timeout` elapses.
///
/// Returns `None` if the deadline passed. Output pipes are drained on
/// separate threads so a chatty child cannot block on a full pipe.
fn wait_with_deadline(mut child: Child, timeout: Duration) -> io::Result<Option<Output>> {
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());
    let deadline = Instant::now() + timeout;

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            child.kill()?;
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    };

    Ok(Some(Output {
        status,
        stdout: stdout.join().unwrap_or_default(),
        stderr: stderr.join().unwrap_or_default(),
    }))
}

fn feed(mut pipe: ChildStdin, input: String) -> thread::JoinHandle<io::Result<()>> {
    thread::spawn(move || pipe.write_all(input.as_bytes()))
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}
