use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::tools::schema::ToolSignature;

/// Call-site information handed to every tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolContext {
    /// Agent whose loop issued the call.
    pub agent_name: String,
    /// Thread the calling agent is currently answering on.
    pub thread_id: Option<String>,
    /// Agents currently blocked in this call chain, outermost first, ending
    /// with `agent_name`.
    pub call_chain: Vec<String>,
}

impl ToolContext {
    pub fn new(agent_name: impl Into<String>) -> Self {
        let agent_name = agent_name.into();
        Self {
            call_chain: vec![agent_name.clone()],
            agent_name,
            thread_id: None,
        }
    }

    pub fn with_thread(mut self, thread_id: Option<String>) -> Self {
        self.thread_id = thread_id;
        self
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn signature(&self) -> ToolSignature;
    async fn call(&self, context: &ToolContext, args: Map<String, Value>) -> Result<Value>;
}

type ToolFn = dyn Fn(&ToolContext, &Map<String, Value>) -> Result<Value> + Send + Sync;

/// Adapts a synchronous closure to the async [`Tool`] interface.
pub struct FnTool {
    signature: ToolSignature,
    func: Box<ToolFn>,
}

impl FnTool {
    pub fn new<F>(signature: ToolSignature, func: F) -> Self
    where
        F: Fn(&ToolContext, &Map<String, Value>) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            signature,
            func: Box::new(func),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn signature(&self) -> ToolSignature {
        self.signature.clone()
    }

    async fn call(&self, context: &ToolContext, args: Map<String, Value>) -> Result<Value> {
        (self.func)(context, &args)
    }
}

/// Reads a required string argument. Schema validation has already run, so a
/// miss here means the tool was called directly.
pub fn required_str<'a>(args: &'a Map<String, Value>, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| crate::error::Error::Tool(format!("missing '{key}' argument")))
}

pub fn optional_str<'a>(args: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
}
