/*!
`execute.rs`

Implements the `execute` subcommand: run one YAML snippet through the kernel,
the same way a notebook cell would.

Code source (first match wins):
  - positional CODE
  - --file PATH
  - stdin

Human output streams each module's output as soon as it finishes; a failing
status is shown as an error box. Exit codes: 0 ok, 1 error, 130 abort.

JSON output (single object, printed after the request completes):
{
  "reply": { "status": "ok", "execution_count": 1, ... },
  "iopub": [ { "msg_type": "stream", "content": { "name": "stdout", "text": "..." } } ]
}
*/

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use ansible_kernel::kernel::{ExecuteReply, ExecuteRequest, IoPub, IoPubMessage, Kernel};
use anyhow::{Context, Result};
use clap::Args;
use log::warn;

use super::format::{Role, StyleOptions, box_header, color, emoji};
use super::{KernelOpts, build_kernel, print_json};

#[derive(Args, Debug)]
pub struct ExecuteArgs {
    /// YAML snippet, e.g. 'ping:' or '{"command": "uptime"}'
    #[arg(value_name = "CODE")]
    pub code: Option<String>,

    /// Read the snippet from a file
    #[arg(short = 'f', long, value_name = "PATH", conflicts_with = "code")]
    pub file: Option<PathBuf>,

    /// Do not print module output
    #[arg(long)]
    pub silent: bool,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

/// Prints stream notifications live; errors as a red box.
struct Console {
    style: StyleOptions,
}

impl IoPub for Console {
    fn send(&mut self, message: IoPubMessage) {
        match message {
            IoPubMessage::Stream(s) => {
                print!("{}", s.text);
                if let Err(e) = io::stdout().flush() {
                    warn!("stdout flush failed: {e}");
                }
            }
            IoPubMessage::Error(e) => {
                let title = format!("{} Execution failed", emoji("error", &self.style));
                let sub = color(Role::Error, format!("exit status {}", e.evalue), &self.style);
                println!("{}", box_header(title, Some(sub), &self.style));
            }
        }
    }
}

pub fn execute_execute(args: ExecuteArgs, opts: &KernelOpts) -> Result<ExitCode> {
    let code = read_code(&args)?;
    let kernel = build_kernel(opts)?;
    let request = ExecuteRequest::new(code)
        .silent(args.silent)
        .with_execution_count(1);

    if args.json {
        let mut sink: Vec<IoPubMessage> = Vec::new();
        let result = kernel.execute(&request, &mut sink);
        let iopub: Vec<_> = sink
            .iter()
            .map(|m| serde_json::json!({"msg_type": m.msg_type(), "content": m}))
            .collect();
        return match result {
            Ok(reply) => {
                print_json(&serde_json::json!({"reply": reply, "iopub": iopub}));
                Ok(exit_code(&reply))
            }
            Err(e) => {
                print_json(&serde_json::json!({
                    "reply": {
                        "status": "error",
                        "execution_count": request.execution_count,
                        "ename": e.kind(),
                        "evalue": e.to_string(),
                        "traceback": [],
                    },
                    "iopub": iopub,
                }));
                Ok(ExitCode::FAILURE)
            }
        };
    }

    let style = StyleOptions::detect();
    let mut console = Console {
        style: style.clone(),
    };
    match kernel.execute(&request, &mut console) {
        Ok(reply) => {
            if let ExecuteReply::Abort { .. } = reply {
                println!(
                    "{} {}",
                    emoji("warn", &style),
                    color(Role::Dim, "Execution interrupted", &style)
                );
            }
            Ok(exit_code(&reply))
        }
        Err(e) => {
            let title = format!("{} {}", emoji("error", &style), e.kind());
            println!(
                "{}",
                box_header(title, Some(color(Role::Error, e.to_string(), &style)), &style)
            );
            Ok(ExitCode::FAILURE)
        }
    }
}

fn read_code(args: &ExecuteArgs) -> Result<String> {
    if let Some(code) = &args.code {
        return Ok(code.clone());
    }
    if let Some(path) = &args.file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to read snippet file: {}", path.display()));
    }
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("failed to read snippet from stdin")?;
    Ok(buf)
}

fn exit_code(reply: &ExecuteReply) -> ExitCode {
    ExitCode::from(exit_status(reply))
}

fn exit_status(reply: &ExecuteReply) -> u8 {
    match reply {
        ExecuteReply::Ok { .. } => 0,
        ExecuteReply::Error(_) => 1,
        ExecuteReply::Abort { .. } => 130,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(subcommand)]
        cmd: TestSub,
    }

    #[derive(clap::Subcommand, Debug)]
    enum TestSub {
        Execute(ExecuteArgs),
    }

    #[test]
    fn clap_parses_inline_code() {
        let cli = TestCli::try_parse_from(["t", "execute", "ping:", "--silent"]).unwrap();
        let TestSub::Execute(a) = cli.cmd;
        assert_eq!(a.code.as_deref(), Some("ping:"));
        assert!(a.silent);
        assert_eq!(read_code(&a).unwrap(), "ping:");
    }

    #[test]
    fn code_and_file_conflict() {
        assert!(TestCli::try_parse_from(["t", "execute", "ping:", "-f", "x.yml"]).is_err());
    }

    #[test]
    fn reads_snippet_file() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        write!(file, "command: uptime\n").unwrap();
        let path = file.path().to_str().unwrap().to_owned();
        let cli = TestCli::try_parse_from(["t", "execute", "-f", path.as_str()]).unwrap();
        let TestSub::Execute(a) = cli.cmd;
        assert_eq!(read_code(&a).unwrap(), "command: uptime\n");
    }

    #[test]
    fn reply_exit_codes() {
        assert_eq!(exit_status(&ExecuteReply::ok(1)), 0);
        assert_eq!(exit_status(&ExecuteReply::Abort { execution_count: 1 }), 130);
    }
}
