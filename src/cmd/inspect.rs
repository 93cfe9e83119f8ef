/*!
`inspect.rs`

Implements the `inspect` subcommand: show `ansible-doc` output for the module
a snippet refers to.

  ansible-kernel inspect copy
  ansible-kernel inspect 'file: {path: /tmp/x, state: touch}'

Resolution: plain text is the module name; a mapping uses its first key.
Anything else is "not found" (exit 0, nothing looked up).

JSON Output Shape:
{
  "status": "ok",
  "found": true,
  "data": { "text/plain": "> COPY ..." },
  "metadata": {}
}
*/

use std::process::ExitCode;

use ansible_kernel::Kernel;
use ansible_kernel::kernel::InspectRequest;
use anyhow::{Context, Result};
use clap::Args;

use super::format::{Role, StyleOptions, box_header, color, emoji};
use super::{KernelOpts, build_kernel, print_json};

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Module name or YAML snippet
    #[arg(value_name = "CODE")]
    pub code: String,

    /// Cursor offset (informational)
    #[arg(short = 'c', long = "cursor", value_name = "N", default_value_t = 0)]
    pub cursor: usize,

    /// Detail level (informational)
    #[arg(long = "detail", value_name = "N", default_value_t = 0)]
    pub detail: u8,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute_inspect(args: InspectArgs, opts: &KernelOpts) -> Result<ExitCode> {
    let kernel = build_kernel(opts)?;
    let request = InspectRequest {
        code: args.code,
        cursor_pos: args.cursor,
        detail_level: args.detail,
    };
    let reply = kernel
        .inspect(&request)
        .context("Documentation lookup failed")?;

    if args.json {
        print_json(&serde_json::to_value(&reply)?);
        return Ok(ExitCode::SUCCESS);
    }

    let style = StyleOptions::detect();
    match reply.text() {
        Some(text) if reply.found => {
            let title = format!("{} {}", emoji("doc", &style), request.code.trim());
            println!("{}", box_header(title, Some("ansible-doc"), &style));
            print!("{text}");
            if !text.ends_with('\n') {
                println!();
            }
        }
        _ => {
            println!(
                "{} {}",
                emoji("warn", &style),
                color(Role::Dim, "No module found in input", &style)
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}
