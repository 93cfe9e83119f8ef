//! `serve` subcommand: JSON-lines host bridge on stdin/stdout.
//!
//! See `ansible_kernel::bridge` for the line format. Logs go to stderr.

use std::io;
use std::process::ExitCode;

use ansible_kernel::bridge;
use anyhow::{Context, Result};
use clap::Args;

use super::{KernelOpts, build_kernel};

#[derive(Args, Debug)]
pub struct ServeArgs {}

pub fn execute_serve(_args: ServeArgs, opts: &KernelOpts) -> Result<ExitCode> {
    let kernel = build_kernel(opts)?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    bridge::serve(&kernel, stdin.lock(), stdout.lock())
        .context("Kernel failed to start")?;
    Ok(ExitCode::SUCCESS)
}
