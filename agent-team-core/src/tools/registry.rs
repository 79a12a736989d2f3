use std::collections::HashMap;
use std::sync::Arc;

use jsonschema::JSONSchema;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::tools::schema::ToolSchema;
use crate::tools::types::Tool;

/// A registered tool with its derived schema and compiled argument validator.
pub struct ToolEntry {
    pub name: String,
    pub tool: Arc<dyn Tool>,
    pub schema: ToolSchema,
    pub categories: Vec<String>,
    validator: JSONSchema,
}

impl ToolEntry {
    pub fn in_category(&self, category: &str) -> bool {
        self.categories.iter().any(|tag| tag == category)
    }

    pub fn validate(&self, args: &Value) -> Result<()> {
        if let Err(errors) = self.validator.validate(args) {
            return Err(Error::ToolArguments(format!(
                "invalid arguments for '{}': {}",
                self.name,
                errors.map(|e| e.to_string()).collect::<Vec<_>>().join(", ")
            )));
        }

        Ok(())
    }
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<ToolEntry>>,
    order: Vec<String>,
}

impl ToolRegistry {
    /// Registers `tool` under `name`. A second registration with the same name
    /// replaces the first and keeps its original position.
    pub fn register<I, S>(&mut self, name: &str, tool: Arc<dyn Tool>, categories: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut schema = ToolSchema::from_signature(&tool.signature())?;
        schema.name = name.to_owned();

        let validator = JSONSchema::compile(&schema.parameters).map_err(|e| {
            Error::Schema(format!("failed to compile argument schema for '{name}': {e}"))
        })?;

        let entry = Arc::new(ToolEntry {
            name: name.to_owned(),
            tool,
            schema,
            categories: categories.into_iter().map(Into::into).collect(),
            validator,
        });

        if self.tools.insert(name.to_owned(), entry).is_some() {
            tracing::warn!(tool = name, "tool re-registered; previous definition replaced");
        } else {
            self.order.push(name.to_owned());
        }

        tracing::debug!(tool = name, "registered tool");
        Ok(())
    }

    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).map(|entry| Arc::clone(&entry.tool))
    }

    pub fn entry(&self, name: &str) -> Option<Arc<ToolEntry>> {
        self.tools.get(name).cloned()
    }

    pub fn get_tools_by_category(&self, category: &str) -> HashMap<String, Arc<dyn Tool>> {
        self.entries_in(category)
            .map(|entry| (entry.name.clone(), Arc::clone(&entry.tool)))
            .collect()
    }

    pub fn get_schemas_by_category(&self, category: &str) -> Vec<ToolSchema> {
        self.entries_in(category)
            .map(|entry| entry.schema.clone())
            .collect()
    }

    pub fn all_schemas(&self) -> Vec<ToolSchema> {
        self.entries().map(|entry| entry.schema.clone()).collect()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Entries in registration order.
    pub(crate) fn entries(&self) -> impl Iterator<Item = &Arc<ToolEntry>> {
        self.order.iter().filter_map(|name| self.tools.get(name))
    }

    fn entries_in<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a Arc<ToolEntry>> {
        self.entries().filter(move |entry| entry.in_category(category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::schema::{ParamSpec, ParamType, ToolSignature};
    use crate::tools::types::FnTool;
    use serde_json::json;

    fn echo_tool(tool_name: &str) -> Arc<dyn Tool> {
        Arc::new(FnTool::new(
            ToolSignature::new(
                tool_name,
                "Echo the text back.",
                vec![ParamSpec::untyped("ctx"), ParamSpec::new("text", ParamType::String)],
            ),
            |_, args| Ok(args.get("text").cloned().unwrap_or(Value::Null)),
        ))
    }

    #[test]
    fn filters_tools_and_schemas_by_category_in_registration_order() {
        let mut registry = ToolRegistry::default();
        registry
            .register("echo", echo_tool("echo"), ["general"])
            .expect("register echo");
        registry
            .register("shout", echo_tool("shout"), ["general", "loud"])
            .expect("register shout");
        registry
            .register("whisper", echo_tool("whisper"), ["quiet"])
            .expect("register whisper");

        let general = registry.get_schemas_by_category("general");
        let names: Vec<&str> = general.iter().map(|schema| schema.name.as_str()).collect();
        assert_eq!(names, vec!["echo", "shout"]);

        let loud = registry.get_tools_by_category("loud");
        assert_eq!(loud.len(), 1);
        assert!(loud.contains_key("shout"));
        assert!(registry.get_tools_by_category("missing").is_empty());
        assert_eq!(registry.tool_names(), vec!["echo", "shout", "whisper"]);
        assert_eq!(registry.all_schemas().len(), 3);
    }

    #[test]
    fn registered_name_overrides_signature_name_and_last_writer_wins() {
        let mut registry = ToolRegistry::default();
        registry
            .register("alias", echo_tool("original"), ["general"])
            .expect("register alias");
        registry
            .register("alias", echo_tool("original"), ["file"])
            .expect("re-register alias");

        assert_eq!(registry.tool_names(), vec!["alias"]);
        assert!(registry.get_schemas_by_category("general").is_empty());
        let file = registry.get_schemas_by_category("file");
        assert_eq!(file[0].name, "alias");
        assert!(registry.get_tool("alias").is_some());
        assert!(registry.get_tool("original").is_none());
    }

    #[test]
    fn rejects_untyped_parameters_at_registration() {
        let untyped: Arc<dyn Tool> = Arc::new(FnTool::new(
            ToolSignature::new("bad", "Bad tool.", vec![ParamSpec::untyped("value")]),
            |_, _| Ok(Value::Null),
        ));

        let mut registry = ToolRegistry::default();
        let error = registry
            .register("bad", untyped, ["general"])
            .expect_err("registration should fail");
        assert!(matches!(error, Error::Schema(_)));
        assert!(registry.tool_names().is_empty());
    }

    #[test]
    fn compiled_validator_checks_arguments() {
        let mut registry = ToolRegistry::default();
        registry
            .register("echo", echo_tool("echo"), ["general"])
            .expect("register echo");
        let entry = registry.entry("echo").expect("echo entry");

        assert!(entry.validate(&json!({ "text": "hi" })).is_ok());
        let error = entry
            .validate(&json!({ "text": 5 }))
            .expect_err("wrong type should fail");
        assert!(matches!(error, Error::ToolArguments(_)));
        assert!(entry.validate(&json!({})).is_err());
        assert!(entry.validate(&json!({ "text": "hi", "extra": 1 })).is_err());
    }
}
