/*!
Subcommand modules for the `ansible-kernel` CLI.

  info      identity, language info, banner
  execute   run one snippet (positional / --file / stdin)
  complete  module-name completion at a cursor
  inspect   ansible-doc lookup for a snippet
  modules   list the completion catalog
  serve     JSON-lines host bridge on stdin/stdout

Conventions:
  - Each module exposes one `execute_*` entry point returning
    `anyhow::Result<ExitCode>`.
  - Argument structs derive `clap::Args`.
  - Kernel construction lives here (`build_kernel`) so every command sees the
    same configuration precedence (flag > env > default).
*/

pub mod complete;
pub mod execute;
pub mod format;
pub mod info;
pub mod inspect;
pub mod modules;
pub mod serve;

pub use complete::{CompleteArgs, execute_complete};
pub use execute::{ExecuteArgs, execute_execute};
pub use info::{InfoArgs, execute_info};
pub use inspect::{InspectArgs, execute_inspect};
pub use modules::{ModulesArgs, execute_modules};
pub use serve::{ServeArgs, execute_serve};

use std::path::PathBuf;

use ansible_kernel::AnsibleKernel;
use ansible_kernel::config::{ConfigOverrides, KernelConfig};
use ansible_kernel::process::ProcessRunner;
use anyhow::{Context, Result};
use clap::Args;

/// Kernel settings shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct KernelOpts {
    /// Command used to run modules (or ANSIBLE_KERNEL_ANSIBLE)
    #[arg(long, global = true, value_name = "CMD")]
    pub ansible: Option<String>,

    /// Command used for documentation lookups (or ANSIBLE_KERNEL_ANSIBLE_DOC)
    #[arg(long = "ansible-doc", global = true, value_name = "CMD")]
    pub ansible_doc: Option<String>,

    /// Completion names file: YAML list or one name per line (or ANSIBLE_KERNEL_MODULES)
    #[arg(long = "modules-file", global = true, value_name = "PATH")]
    pub modules_file: Option<PathBuf>,

    /// Build the completion catalog from `ansible-doc -l`
    #[arg(long = "discover-modules", global = true)]
    pub discover_modules: bool,

    /// Always report exit status 1 after execution (historic behavior)
    #[arg(long = "legacy-exit-status", global = true)]
    pub legacy_exit_status: bool,
}

impl From<KernelOpts> for ConfigOverrides {
    fn from(opts: KernelOpts) -> Self {
        ConfigOverrides {
            ansible: opts.ansible,
            ansible_doc: opts.ansible_doc,
            modules_file: opts.modules_file,
            discover_modules: opts.discover_modules,
            legacy_exit_status: opts.legacy_exit_status,
        }
    }
}

pub fn build_kernel(opts: &KernelOpts) -> Result<AnsibleKernel<ProcessRunner>> {
    let config = KernelConfig::resolve(opts.clone().into()).context("Invalid kernel configuration")?;
    let runner = ProcessRunner::new().context("Failed to create Tokio runtime")?;
    AnsibleKernel::from_config(config, runner).context("Failed to initialize kernel")
}

/// Print a pretty JSON value, falling back to compact form.
pub fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    );
}
