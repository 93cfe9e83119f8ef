//! Subprocess plumbing.
//!
//! ToolCommand::parse -> configured executable (program + leading args)
//! Invocation         -> one fully-built command line
//! CommandRunner      -> seam every subprocess call goes through
//! ProcessRunner      -> tokio-backed runner (blocking, Ctrl-C aware)
//!
use std::fmt;
use std::io;
use std::process::{ExitStatus, Stdio};

use log::{debug, warn};
use shell_words::split as shell_split;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};

use crate::error::{KernelError, Result};

/// A configured external executable, e.g. `ansible` or `python3 -m ansible`.
///
/// It retains the original input for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    original: String,
    program: String,
    args: Vec<String>,
}

impl ToolCommand {
    /// A bare program name with no leading args.
    pub fn new(program: impl Into<String>) -> Self {
        let program = program.into();
        ToolCommand {
            original: program.clone(),
            program,
            args: Vec::new(),
        }
    }

    /// Parse a command string with shell-style splitting.
    ///
    /// - "ansible" -> program `ansible`, no leading args
    /// - "python3 -m ansible" -> program `python3`, leading args `-m ansible`
    /// - "'/opt/my tools/ansible'" -> program with a space in it
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(KernelError::Config("command string is empty".into()));
        }
        let parts = shell_split(trimmed)
            .map_err(|e| KernelError::Config(format!("cannot split command '{raw}': {e}")))?;
        let Some((program, args)) = parts.split_first() else {
            return Err(KernelError::Config(format!("no tokens in command '{raw}'")));
        };
        if program.is_empty() {
            return Err(KernelError::Config(format!("empty program name in '{raw}'")));
        }
        Ok(ToolCommand {
            original: raw.to_string(),
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Build an invocation: leading args from the configuration, then `extra`.
    pub fn invocation<I, S>(&self, extra: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = self.args.clone();
        args.extend(extra.into_iter().map(Into::into));
        Invocation {
            program: self.program.clone(),
            args,
        }
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            f.write_str(&self.program)
        } else {
            write!(f, "{} {}", self.program, self.args.join(" "))
        }
    }
}

/// One command line, ready to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&shell_words::quote(&self.program))?;
        for a in &self.args {
            write!(f, " {}", shell_words::quote(a))?;
        }
        Ok(())
    }
}

/// Exit code and combined stdout/stderr of one finished subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(ExecOutput),
    /// Cancelled by Ctrl-C while waiting; the child has been killed and reaped.
    Interrupted,
}

/// Runs a subprocess to completion, blocking the caller.
pub trait CommandRunner {
    fn run(&self, invocation: &Invocation) -> Result<RunOutcome>;
}

/// Real runner. Owns a current-thread tokio runtime and `block_on`s each call.
pub struct ProcessRunner {
    rt: tokio::runtime::Runtime,
}

impl ProcessRunner {
    pub fn new() -> io::Result<Self> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(ProcessRunner { rt })
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<RunOutcome> {
        debug!("command {invocation}");
        let outcome = self
            .rt
            .block_on(run_child(invocation))
            .map_err(|source| KernelError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;
        if let RunOutcome::Completed(out) = &outcome {
            debug!("exitcode {}", out.exit_code);
            debug!("output {:?}", out.output);
        }
        Ok(outcome)
    }
}

async fn run_child(invocation: &Invocation) -> io::Result<RunOutcome> {
    let mut child = Command::new(&invocation.program)
        .args(&invocation.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    // A failed signal registration must not look like an interrupt.
    let interrupt = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    let finished = tokio::select! {
        res = collect(&mut child) => Some(res?),
        _ = interrupt => None,
    };

    match finished {
        Some((status, output)) => Ok(RunOutcome::Completed(ExecOutput {
            exit_code: exit_code(status),
            output: String::from_utf8_lossy(&output).into_owned(),
        })),
        None => {
            warn!("interrupted while waiting for {invocation}");
            // kill() also waits, so the child is reaped before we return.
            child.kill().await?;
            Ok(RunOutcome::Interrupted)
        }
    }
}

/// Drain both pipes concurrently, then wait. Output is stdout followed by stderr.
async fn collect(child: &mut Child) -> io::Result<(ExitStatus, Vec<u8>)> {
    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();
    let mut out = Vec::new();
    let mut err = Vec::new();
    tokio::try_join!(
        drain(stdout.as_mut(), &mut out),
        drain(stderr.as_mut(), &mut err),
    )?;
    let status = child.wait().await?;
    out.extend_from_slice(&err);
    Ok((status, out))
}

async fn drain<R: AsyncRead + Unpin>(pipe: Option<&mut R>, buf: &mut Vec<u8>) -> io::Result<()> {
    if let Some(p) = pipe {
        p.read_to_end(buf).await?;
    }
    Ok(())
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return -sig;
        }
    }
    -1
}

/// Test double: records every invocation and replays queued outcomes.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    pub struct RecordingRunner {
        calls: RefCell<Vec<Invocation>>,
        queued: RefCell<VecDeque<RunOutcome>>,
        fallback: RunOutcome,
    }

    impl RecordingRunner {
        /// Every call succeeds with exit 0 and empty output unless queued otherwise.
        pub fn new() -> Self {
            Self::with_output(0, "")
        }

        pub fn with_output(exit_code: i32, output: &str) -> Self {
            RecordingRunner {
                calls: RefCell::new(Vec::new()),
                queued: RefCell::new(VecDeque::new()),
                fallback: RunOutcome::Completed(ExecOutput {
                    exit_code,
                    output: output.to_string(),
                }),
            }
        }

        pub fn push(&self, outcome: RunOutcome) {
            self.queued.borrow_mut().push_back(outcome);
        }

        pub fn push_output(&self, exit_code: i32, output: &str) {
            self.push(RunOutcome::Completed(ExecOutput {
                exit_code,
                output: output.to_string(),
            }));
        }

        pub fn calls(&self) -> Vec<Invocation> {
            self.calls.borrow().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.borrow().len()
        }
    }

    impl CommandRunner for RecordingRunner {
        fn run(&self, invocation: &Invocation) -> Result<RunOutcome> {
            self.calls.borrow_mut().push(invocation.clone());
            let next = self.queued.borrow_mut().pop_front();
            Ok(next.unwrap_or_else(|| self.fallback.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_program() {
        let cmd = ToolCommand::parse("ansible").unwrap();
        assert_eq!(cmd.program(), "ansible");
        assert_eq!(cmd.to_string(), "ansible");
    }

    #[test]
    fn parse_with_leading_args() {
        let cmd = ToolCommand::parse("python3 -m ansible").unwrap();
        let inv = cmd.invocation(["--version"]);
        assert_eq!(inv.program, "python3");
        assert_eq!(inv.args, vec!["-m", "ansible", "--version"]);
    }

    #[test]
    fn parse_quoted_program() {
        let cmd = ToolCommand::parse(r#""/opt/my tools/ansible-doc""#).unwrap();
        assert_eq!(cmd.program(), "/opt/my tools/ansible-doc");
    }

    #[test]
    fn empty_command_rejected() {
        let err = ToolCommand::parse("   ").unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn unbalanced_quotes_rejected() {
        assert!(ToolCommand::parse("ansible 'oops").is_err());
    }

    #[test]
    fn invocation_display_quotes_args() {
        let inv = ToolCommand::parse("ansible")
            .unwrap()
            .invocation(["-a", "msg=\"hi there\""]);
        assert_eq!(inv.to_string(), r#"ansible -a 'msg="hi there"'"#);
    }

    // SIGINT reaches every ctrl_c listener in the process.
    static SIGNAL_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    #[cfg(unix)]
    #[test]
    fn process_runner_combines_output() {
        let _guard = SIGNAL_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let runner = ProcessRunner::new().unwrap();
        let inv = Invocation {
            program: "sh".into(),
            args: vec!["-c".into(), "echo out; echo err 1>&2; exit 3".into()],
        };
        match runner.run(&inv).unwrap() {
            RunOutcome::Completed(out) => {
                assert_eq!(out.exit_code, 3);
                assert_eq!(out.output, "out\nerr\n");
            }
            RunOutcome::Interrupted => panic!("unexpected interrupt"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn process_runner_kills_child_on_interrupt() {
        let _guard = SIGNAL_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let runner = ProcessRunner::new().unwrap();
        let inv = Invocation {
            program: "sh".into(),
            args: vec!["-c".into(), "sleep 0.3; kill -INT $PPID; sleep 30".into()],
        };
        let started = std::time::Instant::now();
        let outcome = runner.run(&inv).unwrap();
        assert!(matches!(outcome, RunOutcome::Interrupted));
        assert!(started.elapsed() < std::time::Duration::from_secs(10));
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let runner = ProcessRunner::new().unwrap();
        let inv = Invocation {
            program: "ansible-kernel-definitely-missing-binary".into(),
            args: vec![],
        };
        let err = runner.run(&inv).unwrap_err();
        assert!(matches!(err, KernelError::Spawn { .. }));
    }

    #[test]
    fn recording_runner_replays_queue() {
        use testing::RecordingRunner;
        let runner = RecordingRunner::new();
        runner.push_output(2, "boom");
        let inv = ToolCommand::parse("ansible").unwrap().invocation(["x"]);
        assert_eq!(
            runner.run(&inv).unwrap(),
            RunOutcome::Completed(ExecOutput {
                exit_code: 2,
                output: "boom".into()
            })
        );
        assert_eq!(
            runner.run(&inv).unwrap(),
            RunOutcome::Completed(ExecOutput {
                exit_code: 0,
                output: String::new()
            })
        );
        assert_eq!(runner.call_count(), 2);
    }
}
