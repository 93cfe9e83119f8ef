/*!
Line-delimited JSON host bridge.

Stands in for a host runtime's plugin mechanism: one request object per input
line, one JSON object per output line.

Requests (tagged by `type`):
  {"type":"kernel_info"}
  {"type":"execute","code":"ping:","silent":false}
  {"type":"complete","code":"co","cursor_pos":2}
  {"type":"inspect","code":"copy"}
  {"type":"shutdown"}

Output lines:
  {"channel":"iopub","msg_type":"stream","content":{"name":"stdout","text":"..."}}
  {"channel":"iopub","msg_type":"error","content":{...}}
  {"channel":"shell","msg_type":"execute_reply","content":{"status":"ok",...}}

The bridge owns the execution counter: it is bumped before every execute
request that stores history and is not silent.
*/

use std::io::{BufRead, Write};

use log::{debug, error, info, warn};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::KernelError;
use crate::kernel::{
    CompleteRequest, ExecuteRequest, InspectRequest, IoPub, IoPubMessage, Kernel,
};

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BridgeRequest {
    KernelInfo,
    Execute(ExecuteRequest),
    Complete(CompleteRequest),
    Inspect(InspectRequest),
    Shutdown,
}

impl BridgeRequest {
    fn reply_type(&self) -> &'static str {
        match self {
            BridgeRequest::KernelInfo => "kernel_info_reply",
            BridgeRequest::Execute(_) => "execute_reply",
            BridgeRequest::Complete(_) => "complete_reply",
            BridgeRequest::Inspect(_) => "inspect_reply",
            BridgeRequest::Shutdown => "shutdown_reply",
        }
    }
}

/// JSON-lines writer; also the iopub sink handed to the kernel.
struct JsonLines<W: Write> {
    out: W,
}

impl<W: Write> JsonLines<W> {
    fn write(&mut self, value: &Value) {
        let res = serde_json::to_writer(&mut self.out, value)
            .map_err(std::io::Error::from)
            .and_then(|_| self.out.write_all(b"\n"))
            .and_then(|_| self.out.flush());
        if let Err(e) = res {
            error!("failed to write bridge output: {e}");
        }
    }

    fn reply(&mut self, msg_type: &str, content: Value) {
        self.write(&json!({"channel": "shell", "msg_type": msg_type, "content": content}));
    }
}

impl<W: Write> IoPub for JsonLines<W> {
    fn send(&mut self, message: IoPubMessage) {
        let value = json!({
            "channel": "iopub",
            "msg_type": message.msg_type(),
            "content": message,
        });
        self.write(&value);
    }
}

fn error_content(execution_count: Option<u32>, ename: &str, evalue: String) -> Value {
    let mut content = json!({
        "status": "error",
        "ename": ename,
        "evalue": evalue,
        "traceback": [],
    });
    if let Some(n) = execution_count {
        content["execution_count"] = json!(n);
    }
    content
}

fn to_content<T: serde::Serialize>(reply: &T) -> Value {
    serde_json::to_value(reply).unwrap_or_else(|e| {
        error_content(None, "SerializeError", e.to_string())
    })
}

/// Serve requests until `shutdown` or end of input.
///
/// The banner is resolved first; failure there is returned without serving.
pub fn serve<K, R, W>(kernel: &K, input: R, output: W) -> Result<(), KernelError>
where
    K: Kernel + ?Sized,
    R: BufRead,
    W: Write,
{
    let banner = kernel.banner()?;
    info!("serving {} {}", kernel.implementation(), kernel.implementation_version());
    debug!("banner {banner:?}");

    let mut lines = JsonLines { out: output };
    let mut execution_count: u32 = 0;

    for line in input.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                error!("failed to read request: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let request: BridgeRequest = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                warn!("bad request line {line:?}: {e}");
                lines.reply("error", error_content(None, "BadRequest", e.to_string()));
                continue;
            }
        };
        let reply_type = request.reply_type();

        match request {
            BridgeRequest::KernelInfo => {
                let content = match kernel.kernel_info() {
                    Ok(info) => to_content(&info),
                    Err(e) => error_content(None, e.kind(), e.to_string()),
                };
                lines.reply(reply_type, content);
            }
            BridgeRequest::Execute(mut req) => {
                if req.store_history && !req.silent {
                    execution_count += 1;
                }
                req.execution_count = execution_count;
                let content = match kernel.execute(&req, &mut lines) {
                    Ok(reply) => to_content(&reply),
                    Err(e) => {
                        error!("execute failed: {e}");
                        lines.send(IoPubMessage::Error(crate::kernel::ErrorContent {
                            execution_count,
                            ename: e.kind().to_string(),
                            evalue: e.to_string(),
                            traceback: Vec::new(),
                        }));
                        error_content(Some(execution_count), e.kind(), e.to_string())
                    }
                };
                lines.reply(reply_type, content);
            }
            BridgeRequest::Complete(req) => {
                let reply = kernel.complete(&req.code, req.cursor());
                lines.reply(reply_type, to_content(&reply));
            }
            BridgeRequest::Inspect(req) => {
                let content = match kernel.inspect(&req) {
                    Ok(reply) => to_content(&reply),
                    Err(e) => error_content(None, e.kind(), e.to_string()),
                };
                lines.reply(reply_type, content);
            }
            BridgeRequest::Shutdown => {
                lines.reply(reply_type, json!({"status": "ok", "restart": false}));
                info!("shutdown requested");
                break;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{AnsibleKernel, ModuleCatalog};
    use crate::process::testing::RecordingRunner;

    fn kernel(runner: RecordingRunner) -> AnsibleKernel<RecordingRunner> {
        runner.push_output(0, "ansible [core 2.16.0]\n");
        AnsibleKernel::new(runner, ModuleCatalog::from_names(["copy", "command"]))
    }

    fn drive(k: &AnsibleKernel<RecordingRunner>, input: &str) -> Vec<Value> {
        let mut out = Vec::new();
        serve(k, input.as_bytes(), &mut out).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn execute_emits_stream_then_reply() {
        let runner = RecordingRunner::new();
        let k = kernel(runner);
        k.runner().push_output(0, "localhost | SUCCESS\n");
        let out = drive(&k, "{\"type\":\"execute\",\"code\":\"ping:\"}\n");
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["channel"], "iopub");
        assert_eq!(out[0]["msg_type"], "stream");
        assert_eq!(out[0]["content"]["text"], "localhost | SUCCESS\n");
        assert_eq!(out[1]["msg_type"], "execute_reply");
        assert_eq!(out[1]["content"]["status"], "ok");
        assert_eq!(out[1]["content"]["execution_count"], 1);
    }

    #[test]
    fn execution_counter_skips_silent_requests() {
        let k = kernel(RecordingRunner::new());
        let input = concat!(
            "{\"type\":\"execute\",\"code\":\"ping:\"}\n",
            "{\"type\":\"execute\",\"code\":\"ping:\",\"silent\":true}\n",
            "{\"type\":\"execute\",\"code\":\"\"}\n",
        );
        let replies: Vec<_> = drive(&k, input)
            .into_iter()
            .filter(|v| v["channel"] == "shell")
            .map(|v| v["content"]["execution_count"].clone())
            .collect();
        assert_eq!(replies, vec![json!(1), json!(1), json!(2)]);
    }

    #[test]
    fn kernel_error_becomes_error_reply_and_serving_continues() {
        let k = kernel(RecordingRunner::new());
        let input = concat!(
            "{\"type\":\"execute\",\"code\":\"ping: [1\"}\n",
            "{\"type\":\"complete\",\"code\":\"co\"}\n",
        );
        let out = drive(&k, input);
        assert_eq!(out[0]["msg_type"], "error");
        assert_eq!(out[0]["content"]["ename"], "InvalidYaml");
        assert_eq!(out[1]["content"]["status"], "error");
        assert_eq!(out[1]["content"]["ename"], "InvalidYaml");
        assert_eq!(out[2]["msg_type"], "complete_reply");
        assert_eq!(out[2]["content"]["matches"], json!(["command", "copy"]));
        assert_eq!(out[2]["content"]["cursor_start"], 0);
    }

    #[test]
    fn bad_lines_and_shutdown() {
        let k = kernel(RecordingRunner::new());
        let input = concat!(
            "not json\n",
            "\n",
            "{\"type\":\"shutdown\"}\n",
            "{\"type\":\"inspect\",\"code\":\"copy\"}\n",
        );
        let out = drive(&k, input);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["content"]["ename"], "BadRequest");
        assert_eq!(out[1]["msg_type"], "shutdown_reply");
        // banner only; inspect after shutdown never ran
        assert_eq!(k.runner().call_count(), 1);
    }

    #[test]
    fn kernel_info_and_inspect() {
        let k = kernel(RecordingRunner::new());
        k.runner().push_output(0, "> COPY\n");
        let input = concat!(
            "{\"type\":\"kernel_info\"}\n",
            "{\"type\":\"inspect\",\"code\":\"copy\",\"cursor_pos\":4}\n",
        );
        let out = drive(&k, input);
        assert_eq!(out[0]["content"]["implementation"], "ansible_kernel");
        assert_eq!(out[0]["content"]["language_info"]["version"], "2.16.0");
        assert_eq!(out[0]["content"]["language_info"]["file_extension"], ".yml");
        assert_eq!(out[1]["content"]["found"], true);
        assert_eq!(out[1]["content"]["data"]["text/plain"], "> COPY\n");
    }

    #[test]
    fn banner_failure_stops_before_serving() {
        let runner = RecordingRunner::with_output(1, "");
        let k = AnsibleKernel::new(runner, ModuleCatalog::builtin());
        let mut out = Vec::new();
        let err = serve(&k, "{\"type\":\"kernel_info\"}\n".as_bytes(), &mut out).unwrap_err();
        assert!(matches!(err, KernelError::Banner(_)));
        assert!(out.is_empty());
    }
}
