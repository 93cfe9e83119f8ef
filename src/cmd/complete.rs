//! `complete` subcommand: module-name completion at a cursor offset.
//!
//! Mirrors what a notebook front end asks for on <Tab>. The cursor is a
//! character offset and defaults to the end of CODE.

use std::process::ExitCode;

use ansible_kernel::Kernel;
use ansible_kernel::kernel::CompleteRequest;
use anyhow::Result;
use clap::Args;

use super::format::{Role, StyleOptions, color, columns, emoji};
use super::{KernelOpts, build_kernel, print_json};

#[derive(Args, Debug)]
pub struct CompleteArgs {
    /// Text being completed
    #[arg(value_name = "CODE")]
    pub code: String,

    /// Cursor offset in characters (default: end of CODE)
    #[arg(short = 'c', long = "cursor", value_name = "N")]
    pub cursor: Option<usize>,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute_complete(args: CompleteArgs, opts: &KernelOpts) -> Result<ExitCode> {
    let kernel = build_kernel(opts)?;
    let request = CompleteRequest {
        code: args.code,
        cursor_pos: args.cursor,
    };
    let reply = kernel.complete(&request.code, request.cursor());

    if args.json {
        print_json(&serde_json::to_value(&reply)?);
        return Ok(ExitCode::SUCCESS);
    }

    let style = StyleOptions::detect();
    if reply.matches.is_empty() {
        println!(
            "{}",
            color(Role::Dim, format!("{} (no matches)", emoji("info", &style)), &style)
        );
        return Ok(ExitCode::SUCCESS);
    }
    println!(
        "{}",
        color(
            Role::Accent,
            format!(
                "{} match(es), replace [{}..{})",
                reply.matches.len(),
                reply.cursor_start,
                reply.cursor_end
            ),
            &style
        )
    );
    println!("{}", columns(&reply.matches, &style));
    Ok(ExitCode::SUCCESS)
}
