/*!
Snippet parsing and module argument rendering.

A snippet is a YAML mapping of module name -> argument specification:

```yaml
ping:
command: echo hi
debug: {msg: hello, verbosity: 1}
```

Argument specifications are a closed set (`ModuleArgs`):
  - mapping -> `key="value"` tokens joined by single spaces
  - text    -> used verbatim
  - null    -> empty argument string
Anything else is rejected with `KernelError::InvalidInput`.

Rendering is per entry so that a bad entry only fails once the entries before
it have already run.
*/

use log::{debug, warn};
use serde_yaml::{Mapping, Value};

use crate::error::{KernelError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleArgs {
    /// Ordered `(key, value)` pairs, values already rendered to text.
    Mapping(Vec<(String, String)>),
    Text(String),
    Absent,
}

impl ModuleArgs {
    pub fn from_yaml(value: &Value) -> Result<Self> {
        match value {
            Value::Null => {
                debug!("is None");
                Ok(ModuleArgs::Absent)
            }
            Value::String(s) => {
                debug!("is string");
                Ok(ModuleArgs::Text(s.clone()))
            }
            Value::Mapping(map) => {
                debug!("is dict");
                let mut pairs = Vec::with_capacity(map.len());
                for (k, v) in map {
                    let key = scalar_text(k).ok_or_else(|| {
                        KernelError::invalid_input(format!(
                            "argument keys must be scalars, got {}",
                            shape(k)
                        ))
                    })?;
                    let val = scalar_text(v).ok_or_else(|| {
                        KernelError::invalid_input(format!(
                            "argument '{key}' must be a scalar, got {}",
                            shape(v)
                        ))
                    })?;
                    pairs.push((key, val));
                }
                Ok(ModuleArgs::Mapping(pairs))
            }
            other => {
                debug!("is not supported {}", shape(other));
                Err(KernelError::invalid_input(format!(
                    "not supported type {}",
                    shape(other)
                )))
            }
        }
    }

    /// Render into the single argument string handed to `ansible -a`.
    pub fn render(&self) -> String {
        match self {
            ModuleArgs::Mapping(pairs) => pairs
                .iter()
                .map(|(k, v)| format!("{k}=\"{v}\""))
                .collect::<Vec<_>>()
                .join(" "),
            ModuleArgs::Text(s) => s.clone(),
            ModuleArgs::Absent => String::new(),
        }
    }
}

/// One `module: args` entry of a snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleCall {
    pub module: String,
    pub args: ModuleArgs,
}

impl ModuleCall {
    pub fn from_entry(key: &Value, value: &Value) -> Result<Self> {
        let Value::String(module) = key else {
            return Err(KernelError::invalid_input(format!(
                "module names must be strings, got {}",
                shape(key)
            )));
        };
        Ok(ModuleCall {
            module: module.clone(),
            args: ModuleArgs::from_yaml(value)?,
        })
    }
}

/// Parse an execute snippet. The document must be a mapping.
pub fn parse_snippet(code: &str) -> Result<Mapping> {
    match serde_yaml::from_str::<Value>(code)? {
        Value::Mapping(map) => Ok(map),
        other => Err(KernelError::invalid_input(format!(
            "expected a mapping of module names to arguments, got {}",
            shape(&other)
        ))),
    }
}

/// Resolve the module name an inspect request refers to.
///
/// Plain text is the name; a mapping uses its first key. Anything else,
/// including unparsable YAML, resolves to nothing.
pub fn inspect_target(code: &str) -> Option<String> {
    let value = match serde_yaml::from_str::<Value>(code) {
        Ok(v) => v,
        Err(e) => {
            warn!("cannot parse inspect request: {e}");
            return None;
        }
    };
    debug!("code_data {value:?}");
    match value {
        Value::String(s) => Some(s),
        Value::Mapping(map) => map.keys().next().and_then(Value::as_str).map(str::to_owned),
        other => {
            warn!("code type not supported {}", shape(&other));
            None
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("True".into()),
        Value::Bool(false) => Some("False".into()),
        Value::Null => Some(String::new()),
        Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => None,
    }
}

fn shape(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}
