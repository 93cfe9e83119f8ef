use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod cmd;

use ansible_kernel::utils;
use cmd::{CompleteArgs, ExecuteArgs, InfoArgs, InspectArgs, KernelOpts, ModulesArgs, ServeArgs};

/// Ansible Kernel - run Ansible ad-hoc module snippets the way a notebook does
///
/// Command layout:
///   ansible-kernel info                     [--json]
///   ansible-kernel execute [CODE | -f PATH] [--silent] [--json]
///   ansible-kernel complete CODE            [--cursor N] [--json]
///   ansible-kernel inspect CODE             [--json]
///   ansible-kernel modules                  [--prefix P] [--json]
///   ansible-kernel serve                    (JSON lines on stdin/stdout)
///
/// Global flags / env:
///   -v / -vv / -vvv          Increase verbosity (stderr)
///   -q / --quiet             Errors only
///   --ansible CMD            ANSIBLE_KERNEL_ANSIBLE
///   --ansible-doc CMD        ANSIBLE_KERNEL_ANSIBLE_DOC
///   --modules-file PATH      ANSIBLE_KERNEL_MODULES
///   --legacy-exit-status     ANSIBLE_KERNEL_LEGACY_EXIT_STATUS
///   ANSIBLE_KERNEL_LOG       Full log spec, overrides -v/-q
///
/// Examples:
///   ansible-kernel execute 'ping:'
///   ansible-kernel execute '{"command": {"cmd": "uptime"}}' --json
///   ansible-kernel complete 'com'
///   ansible-kernel inspect copy
#[derive(Parser, Debug)]
#[command(
    name = "ansible-kernel",
    version,
    about = "Ansible Kernel - YAML ad-hoc commands, completion and docs for notebook hosts",
    propagate_version = true,
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Silence all non-error logging
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(flatten)]
    kernel: KernelOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show kernel identity and the Ansible banner
    Info(InfoArgs),

    /// Execute a YAML snippet of module: args entries
    Execute(ExecuteArgs),

    /// Complete a module name at a cursor
    Complete(CompleteArgs),

    /// Show documentation for a module
    Inspect(InspectArgs),

    /// List module names known for completion
    Modules(ModulesArgs),

    /// Serve requests as JSON lines on stdin/stdout
    Serve(ServeArgs),
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = utils::derive_level(cli.verbose, cli.quiet);
    utils::init_logging(level).context("Failed to initialize logging")?;

    match cli.command {
        Commands::Info(args) => cmd::execute_info(args, &cli.kernel),
        Commands::Execute(args) => cmd::execute_execute(args, &cli.kernel),
        Commands::Complete(args) => cmd::execute_complete(args, &cli.kernel),
        Commands::Inspect(args) => cmd::execute_inspect(args, &cli.kernel),
        Commands::Modules(args) => cmd::execute_modules(args, &cli.kernel),
        Commands::Serve(args) => cmd::execute_serve(args, &cli.kernel),
    }
}
