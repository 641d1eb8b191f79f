//! Running the wrapped compiler as a subprocess.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::CompilerError;
use crate::invocation::Invocation;

/// How often a timed child is polled for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Exit code and captured streams of a finished subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    /// Process exit code.
    pub exit_code: i32,
    /// Everything written to standard output.
    pub stdout: Vec<u8>,
    /// Everything written to standard error.
    pub stderr: Vec<u8>,
}

/// The wrapped compiler, seen as an opaque command runner.
pub trait Compiler {
    /// Runs the invocation with captured output.
    fn capture(&self, invocation: &Invocation) -> Result<CapturedOutput, CompilerError>;

    /// Runs the invocation with inherited stdio and returns its exit code.
    fn run(&self, invocation: &Invocation) -> Result<i32, CompilerError>;
}

/// Runs the compiler as a child process, optionally under a timeout.
#[derive(Debug, Clone, Default)]
pub struct ProcessCompiler {
    timeout: Option<Duration>,
}

impl ProcessCompiler {
    /// Creates a runner. `None` lets the child run as long as it needs.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    fn command(invocation: &Invocation) -> Command {
        let mut cmd = Command::new(invocation.program());
        cmd.args(invocation.args());
        cmd
    }

    fn spawn(mut cmd: Command, program: &Path) -> Result<Child, CompilerError> {
        cmd.spawn().map_err(|e| CompilerError::Spawn {
            program: program.to_path_buf(),
            source: e,
        })
    }
}

impl Compiler for ProcessCompiler {
    fn capture(&self, invocation: &Invocation) -> Result<CapturedOutput, CompilerError> {
        let program = invocation.program();
        let mut cmd = Self::command(invocation);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        debug!(argv = ?invocation.argv(), "capturing compiler output");
        let mut child = Self::spawn(cmd, program)?;

        // Drain both pipes concurrently so a chatty child never blocks on a full pipe.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);
        let status = wait_with_timeout(&mut child, self.timeout, program);

        let stdout = join_drain(stdout, program)?;
        let stderr = join_drain(stderr, program)?;
        Ok(CapturedOutput {
            exit_code: exit_code(status?),
            stdout,
            stderr,
        })
    }

    fn run(&self, invocation: &Invocation) -> Result<i32, CompilerError> {
        let program = invocation.program();
        debug!(argv = ?invocation.argv(), "running compiler");
        let mut child = Self::spawn(Self::command(invocation), program)?;
        wait_with_timeout(&mut child, self.timeout, program).map(exit_code)
    }
}

type Drain = thread::JoinHandle<std::io::Result<Vec<u8>>>;

fn drain<R: Read + Send + 'static>(mut reader: R) -> Drain {
    thread::spawn(move || {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn join_drain(handle: Option<Drain>, program: &Path) -> Result<Vec<u8>, CompilerError> {
    let Some(handle) = handle else {
        return Ok(Vec::new());
    };
    let wait_err = |source: std::io::Error| CompilerError::Wait {
        program: program.to_path_buf(),
        source,
    };
    handle
        .join()
        .map_err(|_| wait_err(std::io::Error::other("output reader panicked")))?
        .map_err(wait_err)
}

/// Waits for `child`, killing it once `timeout` has elapsed.
fn wait_with_timeout(
    child: &mut Child,
    timeout: Option<Duration>,
    program: &Path,
) -> Result<ExitStatus, CompilerError> {
    let wait_err = |source: std::io::Error| CompilerError::Wait {
        program: program.to_path_buf(),
        source,
    };
    let Some(limit) = timeout else {
        return child.wait().map_err(wait_err);
    };

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait().map_err(wait_err)? {
            return Ok(status);
        }
        if start.elapsed() >= limit {
            // The child may exit between the poll and the kill; either way it is reaped.
            let _ = child.kill();
            let _ = child.wait();
            return Err(CompilerError::Timeout {
                program: program.to_path_buf(),
                after: limit,
            });
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Maps an exit status to a shell-style exit code.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
