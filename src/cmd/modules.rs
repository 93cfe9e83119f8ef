//! `modules` subcommand: list the completion catalog, optionally by prefix.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use super::format::{Role, StyleOptions, box_header, color, columns, emoji};
use super::{KernelOpts, build_kernel, print_json};

#[derive(Args, Debug)]
pub struct ModulesArgs {
    /// Only names starting with this prefix
    #[arg(short = 'p', long, value_name = "PREFIX")]
    pub prefix: Option<String>,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute_modules(args: ModulesArgs, opts: &KernelOpts) -> Result<ExitCode> {
    let kernel = build_kernel(opts)?;
    let prefix = args.prefix.as_deref().unwrap_or("");
    let mut names: Vec<String> = kernel
        .catalog()
        .matching(prefix)
        .map(str::to_owned)
        .collect();
    names.sort();
    names.dedup();

    if args.json {
        print_json(&serde_json::json!({
            "status": "ok",
            "prefix": args.prefix,
            "count": names.len(),
            "modules": names,
        }));
        return Ok(ExitCode::SUCCESS);
    }

    let style = StyleOptions::detect();
    let subtitle = args.prefix.as_ref().map(|p| format!("prefix={p}"));
    println!(
        "{}",
        box_header(
            format!("{} Modules ({})", emoji("list", &style), names.len()),
            subtitle,
            &style
        )
    );
    if names.is_empty() {
        println!("{}", color(Role::Dim, "(none)", &style));
    } else {
        println!("{}", columns(&names, &style));
    }
    Ok(ExitCode::SUCCESS)
}
