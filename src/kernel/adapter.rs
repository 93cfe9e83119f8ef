//! `AnsibleKernel`: runs ad-hoc module snippets through `ansible`, completes
//! module names, and looks documentation up with `ansible-doc`.

use log::{debug, error, warn};
use once_cell::sync::Lazy;
use once_cell::unsync::OnceCell;
use regex::Regex;
use serde_json::Map;

use super::args::{self, ModuleCall};
use super::messages::{
    CompleteReply, ErrorContent, ExecuteReply, ExecuteRequest, InspectReply, InspectRequest,
    IoPubMessage, LanguageInfo, ReplyStatus,
};
use super::modules::ModuleCatalog;
use super::{IoPub, Kernel};
use crate::config::{KernelConfig, ModuleSource};
use crate::error::{KernelError, Result};
use crate::process::{CommandRunner, Invocation, RunOutcome, ToolCommand};

pub const IMPLEMENTATION: &str = "ansible_kernel";
pub const IMPLEMENTATION_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Always act on the machine we run on, over the local connection.
/// The trailing comma makes `localhost,` an inline host list, not an inventory path.
const LOCAL_TARGET: [&str; 5] = ["-i", "localhost,", "-c", "local", "localhost"];

static VERSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"version (\d+(\.\d+)+)").expect("valid version pattern"));

// `ansible [core 2.15.3]` / `ansible 2.9.27` on the first banner line.
static HEADLINE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^ansible (?:\[core )?(\d+(?:\.\d+)+)").expect("valid headline pattern")
});

/// How the execute reply's status is derived from the subprocess exit codes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExitStatusPolicy {
    /// Report the exit code of the last module that ran.
    #[default]
    LastObserved,
    /// Always report `1`, as historic versions of this kernel did.
    AlwaysFail,
}

pub struct AnsibleKernel<R> {
    runner: R,
    ansible: ToolCommand,
    ansible_doc: ToolCommand,
    catalog: ModuleCatalog,
    exit_status: ExitStatusPolicy,
    banner: OnceCell<String>,
}

impl<R: CommandRunner> AnsibleKernel<R> {
    pub fn new(runner: R, catalog: ModuleCatalog) -> Self {
        AnsibleKernel {
            runner,
            ansible: ToolCommand::new("ansible"),
            ansible_doc: ToolCommand::new("ansible-doc"),
            catalog,
            exit_status: ExitStatusPolicy::default(),
            banner: OnceCell::new(),
        }
    }

    /// Build from resolved configuration. Module discovery runs here.
    pub fn from_config(config: KernelConfig, runner: R) -> Result<Self> {
        let catalog = match &config.modules {
            ModuleSource::Builtin => ModuleCatalog::builtin(),
            ModuleSource::File(path) => ModuleCatalog::load(path)?,
            ModuleSource::Discover => ModuleCatalog::discover(&runner, &config.ansible_doc)?,
        };
        Ok(Self::new(runner, catalog)
            .with_tools(config.ansible, config.ansible_doc)
            .with_exit_status(config.exit_status))
    }

    pub fn with_tools(mut self, ansible: ToolCommand, ansible_doc: ToolCommand) -> Self {
        self.ansible = ansible;
        self.ansible_doc = ansible_doc;
        self
    }

    pub fn with_exit_status(mut self, policy: ExitStatusPolicy) -> Self {
        self.exit_status = policy;
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn catalog(&self) -> &ModuleCatalog {
        &self.catalog
    }

    /// Version number parsed out of the banner.
    pub fn language_version(&self) -> Result<String> {
        let banner = self.banner()?;
        parse_version(banner).ok_or_else(|| {
            KernelError::Banner(format!("no version number in banner: {:?}", banner.trim()))
        })
    }

    fn load_banner(&self) -> Result<String> {
        let invocation = self.ansible.invocation(["--version"]);
        let outcome = self
            .runner
            .run(&invocation)
            .map_err(|e| KernelError::Banner(e.to_string()))?;
        match outcome {
            RunOutcome::Completed(out) if out.exit_code == 0 => Ok(out.output),
            RunOutcome::Completed(out) => Err(KernelError::Banner(format!(
                "`{invocation}` exited with {}",
                out.exit_code
            ))),
            RunOutcome::Interrupted => {
                Err(KernelError::Banner(format!("`{invocation}` was interrupted")))
            }
        }
    }

    fn module_invocation(&self, call: &ModuleCall) -> Invocation {
        let mut extra = vec![
            "-m".to_string(),
            call.module.clone(),
            "-a".to_string(),
            call.args.render(),
        ];
        extra.extend(LOCAL_TARGET.iter().map(|s| s.to_string()));
        self.ansible.invocation(extra)
    }
}

impl<R: CommandRunner> Kernel for AnsibleKernel<R> {
    fn implementation(&self) -> &str {
        IMPLEMENTATION
    }

    fn implementation_version(&self) -> &str {
        IMPLEMENTATION_VERSION
    }

    fn banner(&self) -> Result<&str> {
        self.banner
            .get_or_try_init(|| self.load_banner())
            .map(String::as_str)
    }

    fn language_info(&self) -> Result<LanguageInfo> {
        Ok(LanguageInfo {
            name: "ansible".into(),
            version: self.language_version()?,
            mimetype: "text/yaml".into(),
            file_extension: ".yml".into(),
            codemirror_mode: "yaml".into(),
        })
    }

    fn execute(&self, request: &ExecuteRequest, iopub: &mut dyn IoPub) -> Result<ExecuteReply> {
        let count = request.execution_count;
        if request.code.trim().is_empty() {
            return Ok(ExecuteReply::ok(count));
        }

        debug!("code {:?}", request.code);
        let entries = args::parse_snippet(&request.code)?;
        debug!("code_data {entries:?}");

        let mut interrupted = false;
        let mut last_exit: Option<i32> = None;

        for (key, value) in &entries {
            let call = ModuleCall::from_entry(key, value)?;
            let invocation = self.module_invocation(&call);
            match self.runner.run(&invocation)? {
                RunOutcome::Completed(out) => {
                    debug!("module {} exitcode {}", call.module, out.exit_code);
                    last_exit = Some(out.exit_code);
                    if !request.silent {
                        iopub.send(IoPubMessage::stdout(out.output));
                    }
                }
                RunOutcome::Interrupted => {
                    error!("interrupted while running module '{}'", call.module);
                    interrupted = true;
                    break;
                }
            }
        }

        if interrupted {
            return Ok(ExecuteReply::Abort {
                execution_count: count,
            });
        }

        let status = match self.exit_status {
            ExitStatusPolicy::LastObserved => last_exit.unwrap_or(0),
            ExitStatusPolicy::AlwaysFail => 1,
        };

        if status != 0 {
            let content = ErrorContent {
                execution_count: count,
                ename: String::new(),
                evalue: status.to_string(),
                traceback: Vec::new(),
            };
            iopub.send(IoPubMessage::Error(content.clone()));
            return Ok(ExecuteReply::Error(content));
        }
        Ok(ExecuteReply::ok(count))
    }

    fn complete(&self, code: &str, cursor_pos: usize) -> CompleteReply {
        let cursor_pos = cursor_pos.min(code.chars().count());
        let head: String = code.chars().take(cursor_pos).collect();
        debug!("code {head:?}");

        if head.is_empty() || head.ends_with(' ') {
            return CompleteReply::empty(cursor_pos);
        }
        let Some(token) = head.split_whitespace().last() else {
            return CompleteReply::empty(cursor_pos);
        };
        let start = cursor_pos.saturating_sub(token.chars().count());

        let mut matches: Vec<String> = self.catalog.matching(token).map(str::to_owned).collect();
        if matches.is_empty() {
            return CompleteReply::empty(cursor_pos);
        }
        matches.sort();
        matches.dedup();

        CompleteReply {
            matches,
            cursor_start: start,
            cursor_end: cursor_pos,
            metadata: Map::new(),
            status: ReplyStatus::Ok,
        }
    }

    fn inspect(&self, request: &InspectRequest) -> Result<InspectReply> {
        debug!("code {:?}", request.code);
        debug!("cursor_pos {}", request.cursor_pos);
        debug!("detail_level {}", request.detail_level);

        let Some(module) = args::inspect_target(&request.code) else {
            return Ok(InspectReply::not_found());
        };

        let invocation = self.ansible_doc.invocation(["-t", "module", module.as_str()]);
        match self.runner.run(&invocation)? {
            RunOutcome::Completed(out) => {
                debug!("ansible-doc exitcode {}", out.exit_code);
                Ok(InspectReply::plain_text(out.output))
            }
            RunOutcome::Interrupted => {
                warn!("documentation lookup for '{module}' interrupted");
                Ok(InspectReply::not_found())
            }
        }
    }
}

fn parse_version(banner: &str) -> Option<String> {
    VERSION_PATTERN
        .captures(banner)
        .or_else(|| HEADLINE_PATTERN.captures(banner.trim_start()))
        .map(|c| c[1].to_string())
}
