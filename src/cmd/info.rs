//! `info` subcommand: identity metadata and the tool banner.
//!
//! The banner is resolved eagerly; a missing tool or an unrecognized banner
//! is reported as an error (non-zero exit), never papered over.

use std::process::ExitCode;

use ansible_kernel::Kernel;
use anyhow::{Context, Result};
use clap::Args;

use super::format::{Role, StyleOptions, box_header, color, emoji};
use super::{KernelOpts, build_kernel, print_json};

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Output JSON instead of human-readable text
    #[arg(long)]
    pub json: bool,
}

pub fn execute_info(args: InfoArgs, opts: &KernelOpts) -> Result<ExitCode> {
    let kernel = build_kernel(opts)?;
    let info = kernel
        .kernel_info()
        .context("Unable to determine the Ansible version")?;

    if args.json {
        print_json(&serde_json::to_value(&info)?);
        return Ok(ExitCode::SUCCESS);
    }

    let style = StyleOptions::detect();
    println!(
        "{}",
        box_header(
            format!(
                "{} {} {}",
                emoji("info", &style),
                info.implementation,
                info.implementation_version
            ),
            Some(format!(
                "{} {} • {} • {}",
                info.language_info.name,
                info.language_info.version,
                info.language_info.mimetype,
                info.language_info.file_extension
            )),
            &style,
        )
    );
    println!("{}", color(Role::Dim, info.banner.trim_end(), &style));
    println!(
        "{} {} modules available for completion",
        emoji("list", &style),
        kernel.catalog().len()
    );
    Ok(ExitCode::SUCCESS)
}
