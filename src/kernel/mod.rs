//! Host-facing kernel interface and the Ansible adapter behind it.
//!
//! A host runtime drives a [`Kernel`] one request at a time and receives
//! side-channel notifications through an [`IoPub`] sink.

pub mod adapter;
pub mod args;
pub mod messages;
pub mod modules;

pub use adapter::{AnsibleKernel, ExitStatusPolicy, IMPLEMENTATION, IMPLEMENTATION_VERSION};
pub use messages::{
    CompleteReply, CompleteRequest, ErrorContent, ExecuteReply, ExecuteRequest, InspectReply,
    InspectRequest, IoPubMessage, KernelInfo, LanguageInfo, ReplyStatus, StreamContent,
};
pub use modules::ModuleCatalog;

use crate::error::Result;

/// Sink for notifications emitted while a request is in flight.
pub trait IoPub {
    fn send(&mut self, message: IoPubMessage);
}

impl IoPub for Vec<IoPubMessage> {
    fn send(&mut self, message: IoPubMessage) {
        self.push(message);
    }
}

/// The three request handlers plus identity metadata a host needs.
pub trait Kernel {
    fn implementation(&self) -> &str;

    fn implementation_version(&self) -> &str;

    /// Tool banner; resolving it may fail, which is fatal for the host.
    fn banner(&self) -> Result<&str>;

    fn language_info(&self) -> Result<LanguageInfo>;

    fn kernel_info(&self) -> Result<KernelInfo> {
        Ok(KernelInfo {
            status: ReplyStatus::Ok,
            protocol_version: messages::PROTOCOL_VERSION.to_string(),
            implementation: self.implementation().to_string(),
            implementation_version: self.implementation_version().to_string(),
            language_info: self.language_info()?,
            banner: self.banner()?.to_string(),
        })
    }

    fn execute(&self, request: &ExecuteRequest, iopub: &mut dyn IoPub) -> Result<ExecuteReply>;

    fn complete(&self, code: &str, cursor_pos: usize) -> CompleteReply;

    fn inspect(&self, request: &InspectRequest) -> Result<InspectReply>;
}
