//! Module-name catalog used for completion.
//!
//! Sources: a built-in list, a names file (YAML sequence or one per line),
//! or discovery through `ansible-doc -l -t module`.

use std::path::Path;

use log::{debug, info};

use crate::error::{KernelError, Result};
use crate::process::{CommandRunner, RunOutcome, ToolCommand};

/// Common modules shipped with Ansible, used when nothing else is configured.
pub const BUILTIN_MODULES: &[&str] = &[
    "acl",
    "add_host",
    "alternatives",
    "apk",
    "apt",
    "apt_key",
    "apt_repository",
    "archive",
    "assemble",
    "assert",
    "async_status",
    "at",
    "authorized_key",
    "blockinfile",
    "command",
    "copy",
    "cron",
    "debconf",
    "debug",
    "dnf",
    "docker_container",
    "docker_image",
    "docker_network",
    "dpkg_selections",
    "expect",
    "fail",
    "fetch",
    "file",
    "filesystem",
    "find",
    "firewalld",
    "gather_facts",
    "get_url",
    "getent",
    "git",
    "git_config",
    "group",
    "group_by",
    "hostname",
    "include_role",
    "include_tasks",
    "include_vars",
    "ini_file",
    "iptables",
    "known_hosts",
    "lineinfile",
    "locale_gen",
    "lvg",
    "lvol",
    "make",
    "meta",
    "modprobe",
    "mount",
    "mysql_db",
    "mysql_user",
    "nmcli",
    "npm",
    "openssl_certificate",
    "openssl_privatekey",
    "package",
    "package_facts",
    "pam_limits",
    "parted",
    "pause",
    "ping",
    "pip",
    "postgresql_db",
    "postgresql_user",
    "raw",
    "reboot",
    "replace",
    "rpm_key",
    "script",
    "seboolean",
    "selinux",
    "service",
    "service_facts",
    "set_fact",
    "setup",
    "shell",
    "slurp",
    "snap",
    "stat",
    "subversion",
    "synchronize",
    "sysctl",
    "systemd",
    "systemd_service",
    "tempfile",
    "template",
    "timezone",
    "ufw",
    "unarchive",
    "uri",
    "user",
    "wait_for",
    "wait_for_connection",
    "yum",
    "yum_repository",
    "zypper",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleCatalog {
    names: Vec<String>,
}

impl Default for ModuleCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ModuleCatalog {
    pub fn builtin() -> Self {
        Self::from_names(BUILTIN_MODULES.iter().copied())
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ModuleCatalog {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Load names from a file.
    ///
    /// `.yml` / `.yaml` files hold a YAML sequence of strings; anything else is
    /// one name per line with blank lines and `#` comments skipped.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            KernelError::Catalog(format!("failed to read {}: {e}", path.display()))
        })?;
        let lower = path.to_string_lossy().to_ascii_lowercase();
        let catalog = if lower.ends_with(".yml") || lower.ends_with(".yaml") {
            let names: Vec<String> = serde_yaml::from_str(&raw).map_err(|e| {
                KernelError::Catalog(format!("{} is not a list of names: {e}", path.display()))
            })?;
            Self::from_names(names)
        } else {
            Self::from_names(
                raw.lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty() && !l.starts_with('#')),
            )
        };
        info!(
            "loaded {} module names from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Build from `ansible-doc -l` output: the first token of each line.
    pub fn from_listing(listing: &str) -> Self {
        Self::from_names(listing.lines().filter_map(|l| l.split_whitespace().next()))
    }

    /// Ask the documentation tool for every installed module.
    pub fn discover<R: CommandRunner + ?Sized>(runner: &R, doc_tool: &ToolCommand) -> Result<Self> {
        let invocation = doc_tool.invocation(["-l", "-t", "module"]);
        match runner.run(&invocation)? {
            RunOutcome::Completed(out) if out.exit_code == 0 => {
                let catalog = Self::from_listing(&out.output);
                debug!("discovered {} modules via {invocation}", catalog.len());
                if catalog.is_empty() {
                    return Err(KernelError::Catalog(format!(
                        "`{invocation}` listed no modules"
                    )));
                }
                Ok(catalog)
            }
            RunOutcome::Completed(out) => Err(KernelError::Catalog(format!(
                "`{invocation}` exited with {}",
                out.exit_code
            ))),
            RunOutcome::Interrupted => Err(KernelError::Catalog(format!(
                "`{invocation}` was interrupted"
            ))),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names starting with `prefix` (case-sensitive), in catalog order.
    pub fn matching<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.names
            .iter()
            .map(String::as_str)
            .filter(move |n| n.starts_with(prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::testing::RecordingRunner;
    use std::io::Write;

    #[test]
    fn builtin_is_sorted_and_unique() {
        let mut sorted = BUILTIN_MODULES.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted, BUILTIN_MODULES);
    }

    #[test]
    fn matching_is_case_sensitive_prefix() {
        let catalog = ModuleCatalog::from_names(["copy", "command", "cron", "Copy"]);
        let hits: Vec<_> = catalog.matching("co").collect();
        assert_eq!(hits, vec!["copy", "command"]);
        assert_eq!(catalog.matching("x").count(), 0);
    }

    #[test]
    fn load_plain_lines() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "# local modules\nping\n\n  copy  \nmy.collection.thing").unwrap();
        let catalog = ModuleCatalog::load(f.path()).unwrap();
        assert_eq!(catalog.names(), ["ping", "copy", "my.collection.thing"]);
    }

    #[test]
    fn load_yaml_sequence() {
        let mut f = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(f, "- ping\n- setup").unwrap();
        let catalog = ModuleCatalog::load(f.path()).unwrap();
        assert_eq!(catalog.names(), ["ping", "setup"]);
    }

    #[test]
    fn load_yaml_wrong_shape() {
        let mut f = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(f, "ping: yes").unwrap();
        let err = ModuleCatalog::load(f.path()).unwrap_err();
        assert!(matches!(err, KernelError::Catalog(_)));
    }

    #[test]
    fn load_missing_file() {
        let err = ModuleCatalog::load(Path::new("/nonexistent/modules.txt")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn discover_parses_listing() {
        let runner = RecordingRunner::with_output(
            0,
            "ansible.builtin.copy    Copy files to remote locations\nansible.builtin.ping    Try to connect\n",
        );
        let doc = ToolCommand::parse("ansible-doc").unwrap();
        let catalog = ModuleCatalog::discover(&runner, &doc).unwrap();
        assert_eq!(
            catalog.names(),
            ["ansible.builtin.copy", "ansible.builtin.ping"]
        );
        assert_eq!(runner.calls()[0].args, vec!["-l", "-t", "module"]);
    }

    #[test]
    fn discover_failure_is_error() {
        let runner = RecordingRunner::with_output(5, "ERROR!");
        let doc = ToolCommand::parse("ansible-doc").unwrap();
        let err = ModuleCatalog::discover(&runner, &doc).unwrap_err();
        assert!(err.to_string().contains("exited with 5"));
    }
}
