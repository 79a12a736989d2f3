use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::{json, Map, Value};

use crate::tools::registry::{ToolEntry, ToolRegistry};
use crate::tools::schema::ToolSchema;
use crate::tools::types::{Tool, ToolContext};

/// The subset of registered tools one agent may call.
#[derive(Clone, Default)]
pub struct ToolBox {
    entries: HashMap<String, Arc<ToolEntry>>,
    names: Vec<String>,
    schemas: Vec<ToolSchema>,
}

impl ToolBox {
    pub fn new<S: AsRef<str>>(registry: &ToolRegistry, categories: &[S]) -> Self {
        let mut tool_box = Self::default();

        for entry in registry.entries() {
            let wanted = categories
                .iter()
                .any(|category| entry.in_category(category.as_ref()));
            if wanted && !tool_box.entries.contains_key(&entry.name) {
                tool_box.names.push(entry.name.clone());
                tool_box.schemas.push(entry.schema.clone());
                tool_box.entries.insert(entry.name.clone(), Arc::clone(entry));
            }
        }

        tool_box
    }

    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.entries.get(name).map(|entry| Arc::clone(&entry.tool))
    }

    pub fn get_tool_names(&self) -> &[String] {
        &self.names
    }

    pub fn schemas(&self) -> &[ToolSchema] {
        &self.schemas
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Runs a tool by name. Never fails: unknown tools, invalid arguments,
    /// tool errors and panics all come back as `{"error": message}`.
    pub async fn run_tool(&self, name: &str, context: &ToolContext, args: Value) -> Value {
        let Some(entry) = self.entries.get(name) else {
            return error_result(format!("Unknown tool: {name}"));
        };

        if let Err(err) = entry.validate(&args) {
            tracing::debug!(tool = name, error = %err, "tool arguments rejected");
            return error_result(err.to_string());
        }

        let args = match args {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        match AssertUnwindSafe(entry.tool.call(context, args))
            .catch_unwind()
            .await
        {
            Ok(Ok(value)) => value,
            Ok(Err(err)) => {
                tracing::debug!(tool = name, error = %err, "tool returned an error");
                error_result(err.tool_message())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(tool = name, panic = %message, "tool panicked");
                error_result(message)
            }
        }
    }
}

fn error_result(message: impl Into<String>) -> Value {
    json!({ "error": message.into() })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "tool panicked".to_owned()
    }
}
