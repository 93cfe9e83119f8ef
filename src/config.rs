//! Kernel configuration.
//!
//! Precedence: explicit override (CLI flag) > environment variable > default.
//!
//! | Setting            | Env                                 | Default       |
//! |--------------------|-------------------------------------|---------------|
//! | ansible command    | `ANSIBLE_KERNEL_ANSIBLE`            | `ansible`     |
//! | ansible-doc command| `ANSIBLE_KERNEL_ANSIBLE_DOC`        | `ansible-doc` |
//! | module names file  | `ANSIBLE_KERNEL_MODULES`            | built-in list |
//! | legacy exit status | `ANSIBLE_KERNEL_LEGACY_EXIT_STATUS` | off           |

use std::path::PathBuf;

use crate::error::Result;
use crate::kernel::ExitStatusPolicy;
use crate::process::ToolCommand;

pub const ENV_ANSIBLE: &str = "ANSIBLE_KERNEL_ANSIBLE";
pub const ENV_ANSIBLE_DOC: &str = "ANSIBLE_KERNEL_ANSIBLE_DOC";
pub const ENV_MODULES: &str = "ANSIBLE_KERNEL_MODULES";
pub const ENV_LEGACY_EXIT_STATUS: &str = "ANSIBLE_KERNEL_LEGACY_EXIT_STATUS";

/// Where completion candidates come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleSource {
    Builtin,
    File(PathBuf),
    Discover,
}

/// Values supplied on the command line; `None`/`false` means "not given".
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub ansible: Option<String>,
    pub ansible_doc: Option<String>,
    pub modules_file: Option<PathBuf>,
    pub discover_modules: bool,
    pub legacy_exit_status: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelConfig {
    pub ansible: ToolCommand,
    pub ansible_doc: ToolCommand,
    pub modules: ModuleSource,
    pub exit_status: ExitStatusPolicy,
}

impl Default for KernelConfig {
    fn default() -> Self {
        KernelConfig {
            ansible: ToolCommand::new("ansible"),
            ansible_doc: ToolCommand::new("ansible-doc"),
            modules: ModuleSource::Builtin,
            exit_status: ExitStatusPolicy::default(),
        }
    }
}

impl KernelConfig {
    /// Resolve against the process environment.
    pub fn resolve(overrides: ConfigOverrides) -> Result<Self> {
        Self::resolve_with(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve with an injectable environment lookup.
    pub fn resolve_with<F>(overrides: ConfigOverrides, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let ansible = match overrides.ansible.or_else(|| lookup(ENV_ANSIBLE)) {
            Some(raw) => ToolCommand::parse(&raw)?,
            None => ToolCommand::new("ansible"),
        };
        let ansible_doc = match overrides.ansible_doc.or_else(|| lookup(ENV_ANSIBLE_DOC)) {
            Some(raw) => ToolCommand::parse(&raw)?,
            None => ToolCommand::new("ansible-doc"),
        };

        // An explicit file wins over discovery; discovery wins over the env file.
        let modules = if let Some(path) = overrides.modules_file {
            ModuleSource::File(path)
        } else if overrides.discover_modules {
            ModuleSource::Discover
        } else if let Some(path) = lookup(ENV_MODULES) {
            ModuleSource::File(PathBuf::from(path))
        } else {
            ModuleSource::Builtin
        };

        let legacy = overrides.legacy_exit_status
            || lookup(ENV_LEGACY_EXIT_STATUS)
                .map(|v| is_truthy(&v))
                .unwrap_or(false);
        let exit_status = if legacy {
            ExitStatusPolicy::AlwaysFail
        } else {
            ExitStatusPolicy::LastObserved
        };

        Ok(KernelConfig {
            ansible,
            ansible_doc,
            modules,
            exit_status,
        })
    }
}

fn is_truthy(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let cfg = KernelConfig::resolve_with(ConfigOverrides::default(), env(&[])).unwrap();
        assert_eq!(cfg, KernelConfig::default());
    }

    #[test]
    fn env_fallbacks() {
        let cfg = KernelConfig::resolve_with(
            ConfigOverrides::default(),
            env(&[
                (ENV_ANSIBLE, "python3 -m ansible"),
                (ENV_MODULES, "/etc/ansible-kernel/modules.txt"),
                (ENV_LEGACY_EXIT_STATUS, "Yes"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.ansible.program(), "python3");
        assert_eq!(cfg.ansible_doc.program(), "ansible-doc");
        assert_eq!(
            cfg.modules,
            ModuleSource::File("/etc/ansible-kernel/modules.txt".into())
        );
        assert_eq!(cfg.exit_status, ExitStatusPolicy::AlwaysFail);
    }

    #[test]
    fn cli_beats_env() {
        let overrides = ConfigOverrides {
            ansible: Some("/opt/ansible/bin/ansible".into()),
            discover_modules: true,
            ..Default::default()
        };
        let cfg = KernelConfig::resolve_with(
            overrides,
            env(&[(ENV_ANSIBLE, "ansible"), (ENV_MODULES, "/tmp/m.txt")]),
        )
        .unwrap();
        assert_eq!(cfg.ansible.program(), "/opt/ansible/bin/ansible");
        assert_eq!(cfg.modules, ModuleSource::Discover);
    }

    #[test]
    fn blank_env_ignored() {
        let cfg = KernelConfig::resolve_with(
            ConfigOverrides::default(),
            env(&[(ENV_ANSIBLE_DOC, "   "), (ENV_LEGACY_EXIT_STATUS, "0")]),
        )
        .unwrap();
        assert_eq!(cfg.ansible_doc.program(), "ansible-doc");
        assert_eq!(cfg.exit_status, ExitStatusPolicy::LastObserved);
    }

    #[test]
    fn bad_command_is_config_error() {
        let overrides = ConfigOverrides {
            ansible_doc: Some("ansible-doc 'unterminated".into()),
            ..Default::default()
        };
        assert!(KernelConfig::resolve_with(overrides, env(&[])).is_err());
    }
}
