use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;
use crate::tools::registry::ToolRegistry;
use crate::tools::schema::ToolSignature;
use crate::tools::types::FnTool;

pub const GENERAL_CATEGORY: &str = "general";

pub fn register_general_tools(registry: &mut ToolRegistry) -> Result<()> {
    let say_hello = FnTool::new(
        ToolSignature::new("sayHello", "Return a friendly greeting.", Vec::new()),
        |_, _| Ok(Value::String("Hello, world!".to_owned())),
    );
    registry.register("sayHello", Arc::new(say_hello), [GENERAL_CATEGORY])
}
