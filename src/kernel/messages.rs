//! Request / reply shapes exchanged with the host runtime.
//!
//! Field names follow the notebook messaging protocol so replies can be
//! forwarded by the host without translation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const PROTOCOL_VERSION: &str = "5.3";

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub code: String,
    #[serde(default)]
    pub silent: bool,
    #[serde(default = "default_true")]
    pub store_history: bool,
    #[serde(default)]
    pub user_expressions: Map<String, Value>,
    #[serde(default)]
    pub allow_stdin: bool,
    /// Assigned by the host; echoed back untouched.
    #[serde(default)]
    pub execution_count: u32,
}

impl ExecuteRequest {
    pub fn new(code: impl Into<String>) -> Self {
        ExecuteRequest {
            code: code.into(),
            silent: false,
            store_history: true,
            user_expressions: Map::new(),
            allow_stdin: false,
            execution_count: 0,
        }
    }

    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    pub fn with_execution_count(mut self, count: u32) -> Self {
        self.execution_count = count;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteRequest {
    pub code: String,
    /// Defaults to the end of `code`.
    #[serde(default)]
    pub cursor_pos: Option<usize>,
}

impl CompleteRequest {
    pub fn cursor(&self) -> usize {
        self.cursor_pos
            .unwrap_or_else(|| self.code.chars().count())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectRequest {
    pub code: String,
    #[serde(default)]
    pub cursor_pos: usize,
    #[serde(default)]
    pub detail_level: u8,
}

impl InspectRequest {
    pub fn new(code: impl Into<String>) -> Self {
        InspectRequest {
            code: code.into(),
            cursor_pos: 0,
            detail_level: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Ok,
    Error,
    Abort,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorContent {
    pub execution_count: u32,
    pub ename: String,
    pub evalue: String,
    pub traceback: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExecuteReply {
    Ok {
        execution_count: u32,
        payload: Vec<Value>,
        user_expressions: Map<String, Value>,
    },
    Error(ErrorContent),
    Abort {
        execution_count: u32,
    },
}

impl ExecuteReply {
    pub fn ok(execution_count: u32) -> Self {
        ExecuteReply::Ok {
            execution_count,
            payload: Vec::new(),
            user_expressions: Map::new(),
        }
    }

    pub fn status(&self) -> ReplyStatus {
        match self {
            ExecuteReply::Ok { .. } => ReplyStatus::Ok,
            ExecuteReply::Error(_) => ReplyStatus::Error,
            ExecuteReply::Abort { .. } => ReplyStatus::Abort,
        }
    }

    pub fn execution_count(&self) -> u32 {
        match self {
            ExecuteReply::Ok {
                execution_count, ..
            } => *execution_count,
            ExecuteReply::Error(e) => e.execution_count,
            ExecuteReply::Abort { execution_count } => *execution_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompleteReply {
    pub matches: Vec<String>,
    pub cursor_start: usize,
    pub cursor_end: usize,
    pub metadata: Map<String, Value>,
    pub status: ReplyStatus,
}

impl CompleteReply {
    /// No matches; the replacement span collapses onto the cursor.
    pub fn empty(cursor_pos: usize) -> Self {
        CompleteReply {
            matches: Vec::new(),
            cursor_start: cursor_pos,
            cursor_end: cursor_pos,
            metadata: Map::new(),
            status: ReplyStatus::Ok,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InspectReply {
    pub status: ReplyStatus,
    pub data: Map<String, Value>,
    pub metadata: Map<String, Value>,
    pub found: bool,
}

impl InspectReply {
    pub fn not_found() -> Self {
        InspectReply {
            status: ReplyStatus::Ok,
            data: Map::new(),
            metadata: Map::new(),
            found: false,
        }
    }

    pub fn plain_text(text: impl Into<String>) -> Self {
        let mut data = Map::new();
        data.insert("text/plain".into(), Value::String(text.into()));
        InspectReply {
            status: ReplyStatus::Ok,
            data,
            metadata: Map::new(),
            found: true,
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.data.get("text/plain").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamContent {
    pub name: String,
    pub text: String,
}

/// Side-channel notifications emitted while a request is being handled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum IoPubMessage {
    Stream(StreamContent),
    Error(ErrorContent),
}

impl IoPubMessage {
    pub fn stdout(text: impl Into<String>) -> Self {
        IoPubMessage::Stream(StreamContent {
            name: "stdout".into(),
            text: text.into(),
        })
    }

    pub fn msg_type(&self) -> &'static str {
        match self {
            IoPubMessage::Stream(_) => "stream",
            IoPubMessage::Error(_) => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageInfo {
    pub name: String,
    pub version: String,
    pub mimetype: String,
    pub file_extension: String,
    pub codemirror_mode: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KernelInfo {
    pub status: ReplyStatus,
    pub protocol_version: String,
    pub implementation: String,
    pub implementation_version: String,
    pub language_info: LanguageInfo,
    pub banner: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn execute_request_defaults() {
        let req: ExecuteRequest = serde_json::from_value(json!({"code": "ping:"})).unwrap();
        assert!(!req.silent);
        assert!(req.store_history);
        assert_eq!(req.execution_count, 0);
    }

    #[test]
    fn execute_reply_shapes() {
        assert_eq!(
            serde_json::to_value(ExecuteReply::ok(3)).unwrap(),
            json!({"status":"ok","execution_count":3,"payload":[],"user_expressions":{}})
        );
        let err = ExecuteReply::Error(ErrorContent {
            execution_count: 4,
            ename: String::new(),
            evalue: "2".into(),
            traceback: vec![],
        });
        assert_eq!(
            serde_json::to_value(err).unwrap(),
            json!({"status":"error","execution_count":4,"ename":"","evalue":"2","traceback":[]})
        );
        assert_eq!(
            serde_json::to_value(ExecuteReply::Abort { execution_count: 5 }).unwrap(),
            json!({"status":"abort","execution_count":5})
        );
    }

    #[test]
    fn complete_cursor_defaults_to_end() {
        let req = CompleteRequest {
            code: "cöpy".into(),
            cursor_pos: None,
        };
        assert_eq!(req.cursor(), 4);
    }

    #[test]
    fn iopub_stream_serializes_content_only() {
        let msg = IoPubMessage::stdout("hi\n");
        assert_eq!(msg.msg_type(), "stream");
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"name":"stdout","text":"hi\n"})
        );
    }

    #[test]
    fn inspect_reply_found() {
        let reply = InspectReply::plain_text("docs");
        assert!(reply.found);
        assert_eq!(reply.text(), Some("docs"));
        assert!(InspectReply::not_found().data.is_empty());
    }
}
