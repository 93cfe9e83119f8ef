//! Ansible ad-hoc command kernel.
//!
//! Notebook hosts send YAML snippets (`module: args`) and get back execution
//! results, module-name completions, and `ansible-doc` pages.
//!
//! - [`kernel`]  host-facing trait + the Ansible adapter
//! - [`process`] subprocess seam (`CommandRunner`) and the tokio runner
//! - [`bridge`]  JSON-lines host bridge used by `ansible-kernel serve`
//! - [`config`]  CLI/env configuration resolution

pub mod bridge;
pub mod config;
pub mod error;
pub mod kernel;
pub mod process;
pub mod utils;

pub use error::{KernelError, Result};
pub use kernel::{AnsibleKernel, Kernel};
