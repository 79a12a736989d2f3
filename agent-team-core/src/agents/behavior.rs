use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::agents::session::Session;
use crate::agents::{AgentInfo, ConversationAgent, MessageContext};
use crate::config::schema::{AgentConfig, SessionMode};
use crate::error::{Error, Result};
use crate::providers::types::{CompletionRequest, ModelProvider, ModelReply};
use crate::storage::model::ActionLog;
use crate::storage::MessageStore;
use crate::tools::{ToolBox, ToolContext};

pub const PARSE_ERROR_REPLY: &str = "Sorry, there was an error parsing the function call.";

const DEFAULT_SYSTEM_PROMPT: &str = "You are {name}, a {role} agent in a multi-agent development team.

Description: {description}

Available tools: {tools}

Use the tools at your disposal to assist with tasks. Call the relevant tool whenever a request needs one instead of answering directly.
You are expected to collaborate with the other agents in the team to complete tasks.
Explain what you are doing, show the results and keep your answers clear and actionable.";

/// An agent driving a model through the tool-call loop.
pub struct Agent {
    config: AgentConfig,
    agent_id: String,
    system_prompt: String,
    provider: Arc<dyn ModelProvider>,
    tools: ToolBox,
    store: Arc<dyn MessageStore>,
    session: Mutex<Session>,
}

impl Agent {
    pub fn new(
        config: AgentConfig,
        provider: Arc<dyn ModelProvider>,
        tools: ToolBox,
        store: Arc<dyn MessageStore>,
    ) -> Self {
        let agent_id = config
            .agent_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let system_prompt = render_system_prompt(&config, &tools);

        Self {
            session: Mutex::new(Session::new(&system_prompt)),
            config,
            agent_id,
            system_prompt,
            provider,
            tools,
            store,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn tools(&self) -> &ToolBox {
        &self.tools
    }

    /// Snapshot of the session as it stands between messages.
    pub async fn session(&self) -> Session {
        self.session.lock().await.clone()
    }

    fn tool_context(&self, context: &MessageContext) -> ToolContext {
        let mut call_chain = context.call_chain.clone();
        if call_chain.last().map(String::as_str) != Some(self.config.name.as_str()) {
            call_chain.push(self.config.name.clone());
        }

        ToolContext {
            agent_name: self.config.name.clone(),
            thread_id: context.thread_id.clone(),
            call_chain,
        }
    }

    async fn run_tool_loop(&self, session: &mut Session, context: &MessageContext) -> Result<String> {
        let tool_context = self.tool_context(context);
        let mut rounds = 0usize;

        loop {
            let reply = self
                .provider
                .complete(CompletionRequest::new(session.turns(), self.tools.schemas()))
                .await?;

            let invocation = match reply {
                ModelReply::Content(text) => {
                    session.push_assistant(&text);
                    return Ok(text);
                }
                ModelReply::ToolCall(invocation) => invocation,
            };

            if let Some(limit) = self.config.max_tool_rounds {
                if rounds >= limit {
                    tracing::warn!(
                        agent = %self.config.name,
                        limit,
                        "tool round limit reached; ending turn"
                    );
                    return Ok(format!(
                        "Sorry, I stopped after {limit} tool calls without reaching an answer."
                    ));
                }
            }

            let args = parse_arguments(&invocation.arguments)?;
            tracing::debug!(
                agent = %self.config.name,
                tool = %invocation.name,
                round = rounds,
                "executing tool call"
            );
            let result = self
                .tools
                .run_tool(&invocation.name, &tool_context, args.clone())
                .await;

            self.record_action(&invocation.name, args, &result).await;
            session.push_tool_exchange(invocation, &result);
            rounds += 1;
        }
    }

    async fn record_action(&self, tool_name: &str, input: Value, output: &Value) {
        let action = ActionLog::from_result(&self.agent_id, tool_name, input, output.clone());
        if let Err(err) = self.store.log_action(action).await {
            tracing::warn!(
                agent = %self.config.name,
                tool = tool_name,
                error = %err,
                "failed to log tool action"
            );
        }
    }
}

/// Empty arguments mean no arguments; anything but a JSON object is rejected.
fn parse_arguments(raw: &str) -> Result<Value> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(other) => Err(Error::ToolArguments(format!(
            "expected a JSON object, got {other}"
        ))),
        Err(err) => Err(Error::ToolArguments(err.to_string())),
    }
}

fn render_system_prompt(config: &AgentConfig, tools: &ToolBox) -> String {
    let template = config
        .system_prompt
        .as_deref()
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);

    template
        .replace("{name}", &config.name)
        .replace("{role}", &config.role)
        .replace("{description}", config.description.trim())
        .replace("{tools}", &tools.get_tool_names().join(", "))
}

#[async_trait]
impl ConversationAgent for Agent {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn info(&self) -> AgentInfo {
        AgentInfo {
            id: self.agent_id.clone(),
            name: self.config.name.clone(),
            role: self.config.role.clone(),
            description: self.config.description.clone(),
            tools: self.tools.get_tool_names().to_vec(),
        }
    }

    async fn process_message(&self, message: &str, context: MessageContext) -> String {
        let mut session = self.session.lock().await;
        tracing::info!(
            agent = %self.config.name,
            thread_id = context.thread_id.as_deref().unwrap_or("-"),
            depth = context.call_chain.len(),
            "processing message"
        );

        let outcome = match self.config.session_mode {
            SessionMode::Persistent => {
                session.push_user(message);
                self.run_tool_loop(&mut session, &context).await
            }
            SessionMode::OneShot => {
                let mut ephemeral = Session::new(&self.system_prompt);
                ephemeral.push_user(message);
                let outcome = self.run_tool_loop(&mut ephemeral, &context).await;
                *session = ephemeral;
                outcome
            }
        };

        match outcome {
            Ok(reply) => reply,
            Err(Error::ToolArguments(detail)) => {
                tracing::warn!(agent = %self.config.name, error = %detail, "model sent malformed tool arguments");
                PARSE_ERROR_REPLY.to_owned()
            }
            Err(err) => {
                tracing::error!(agent = %self.config.name, error = %err, "message processing failed");
                format!("Sorry, I encountered an error: {err}")
            }
        }
    }

    async fn log_conversation(&self) {
        let transcript = {
            let session = self.session.lock().await;
            if !session.has_user_turns() {
                return;
            }
            session.transcript()
        };

        match self.store.log_conversation(&self.agent_id, &transcript).await {
            Ok(summary_id) => {
                tracing::debug!(agent = %self.config.name, summary_id = %summary_id, "conversation logged")
            }
            Err(err) => {
                tracing::warn!(agent = %self.config.name, error = %err, "failed to log conversation")
            }
        }
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("config", &self.config)
            .field("agent_id", &self.agent_id)
            .field("provider", &self.provider.name())
            .field("tools", &self.tools.get_tool_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::types::{Role, ToolInvocation};
    use crate::storage::model::ActionStatus;
    use crate::storage::InMemoryStore;
    use crate::testing::{FailingStore, ScriptedProvider};
    use crate::tools::general::register_general_tools;
    use crate::tools::ToolRegistry;

    fn general_tools() -> ToolBox {
        let mut registry = ToolRegistry::default();
        register_general_tools(&mut registry).expect("register general tools");
        ToolBox::new(&registry, &["general"])
    }

    fn developer(mode: SessionMode) -> AgentConfig {
        AgentConfig {
            name: "Developer".to_owned(),
            agent_id: Some("dev-1".to_owned()),
            role: "software developer".to_owned(),
            description: "Writes code.".to_owned(),
            provider: "scripted".to_owned(),
            tool_categories: vec!["general".to_owned()],
            session_mode: mode,
            ..AgentConfig::default()
        }
    }

    fn hello_call(id: &str) -> ModelReply {
        ModelReply::ToolCall(ToolInvocation::new(id, "sayHello", "{}"))
    }

    #[tokio::test]
    async fn runs_tool_calls_until_final_content() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            hello_call("call_1"),
            hello_call("call_2"),
            ModelReply::Content("Hello from the team!".to_owned()),
        ]));
        let store = Arc::new(InMemoryStore::default());
        let agent = Agent::new(
            developer(SessionMode::Persistent),
            provider.clone(),
            general_tools(),
            store.clone(),
        );

        let reply = agent
            .process_message("say hello twice", MessageContext::default())
            .await;
        assert_eq!(reply, "Hello from the team!");

        let session = agent.session().await;
        let roles: Vec<Role> = session.turns().iter().map(|turn| turn.role).collect();
        assert_eq!(
            roles,
            vec![
                Role::System,
                Role::User,
                Role::Assistant,
                Role::Tool,
                Role::Assistant,
                Role::Tool,
                Role::Assistant,
            ]
        );
        assert_eq!(session.turns()[3].content, "\"Hello, world!\"");
        assert_eq!(provider.request_count(), 3);
        assert_eq!(provider.offered_tools(0), vec!["sayHello"]);

        let actions = store.actions().await;
        assert_eq!(actions.len(), 2);
        assert!(actions
            .iter()
            .all(|action| action.status == ActionStatus::Success && action.agent_id == "dev-1"));
    }

    #[tokio::test]
    async fn malformed_arguments_end_the_turn_without_new_turns() {
        let provider = Arc::new(ScriptedProvider::new(vec![ModelReply::ToolCall(
            ToolInvocation::new("call_1", "sayHello", "{not json"),
        )]));
        let agent = Agent::new(
            developer(SessionMode::Persistent),
            provider,
            general_tools(),
            Arc::new(InMemoryStore::default()),
        );

        let reply = agent.process_message("hi", MessageContext::default()).await;
        assert_eq!(reply, PARSE_ERROR_REPLY);

        let session = agent.session().await;
        assert_eq!(session.len(), 2);
        assert_eq!(session.turns()[1].role, Role::User);
    }

    #[tokio::test]
    async fn provider_failures_become_apologies_and_keep_the_session() {
        let provider = Arc::new(ScriptedProvider::new(vec![hello_call("call_1")]));
        let agent = Agent::new(
            developer(SessionMode::Persistent),
            provider,
            general_tools(),
            Arc::new(InMemoryStore::default()),
        );

        let reply = agent.process_message("hi", MessageContext::default()).await;
        assert!(reply.starts_with("Sorry, I encountered an error:"));
        assert!(reply.contains("script exhausted"));

        // The completed tool exchange survives the failed follow-up call.
        assert_eq!(agent.session().await.len(), 4);
    }

    #[tokio::test]
    async fn unknown_tools_are_reported_back_to_the_model() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            ModelReply::ToolCall(ToolInvocation::new("call_1", "deploy", "")),
            ModelReply::Content("I cannot deploy.".to_owned()),
        ]));
        let agent = Agent::new(
            developer(SessionMode::Persistent),
            provider,
            general_tools(),
            Arc::new(InMemoryStore::default()),
        );

        let reply = agent.process_message("deploy it", MessageContext::default()).await;
        assert_eq!(reply, "I cannot deploy.");
        let session = agent.session().await;
        assert_eq!(session.turns()[3].content, "{\"error\":\"Unknown tool: deploy\"}");
    }

    #[tokio::test]
    async fn one_shot_sessions_start_fresh_each_message() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            ModelReply::Content("first".to_owned()),
            ModelReply::Content("second".to_owned()),
        ]));
        let agent = Agent::new(
            developer(SessionMode::OneShot),
            provider.clone(),
            general_tools(),
            Arc::new(InMemoryStore::default()),
        );

        agent.process_message("one", MessageContext::default()).await;
        agent.process_message("two", MessageContext::default()).await;

        assert_eq!(provider.request_len(1), 2);
        let session = agent.session().await;
        assert_eq!(session.len(), 3);
        assert_eq!(session.turns()[1].content, "two");
    }

    #[tokio::test]
    async fn persistent_sessions_accumulate_history() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            ModelReply::Content("first".to_owned()),
            ModelReply::Content("second".to_owned()),
        ]));
        let agent = Agent::new(
            developer(SessionMode::Persistent),
            provider.clone(),
            general_tools(),
            Arc::new(InMemoryStore::default()),
        );

        agent.process_message("one", MessageContext::default()).await;
        agent.process_message("two", MessageContext::default()).await;

        assert_eq!(provider.request_len(1), 4);
    }

    #[tokio::test]
    async fn tool_round_limit_ends_the_turn() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            hello_call("call_1"),
            hello_call("call_2"),
        ]));
        let mut config = developer(SessionMode::Persistent);
        config.max_tool_rounds = Some(1);
        let agent = Agent::new(
            config,
            provider,
            general_tools(),
            Arc::new(InMemoryStore::default()),
        );

        let reply = agent.process_message("loop", MessageContext::default()).await;
        assert_eq!(
            reply,
            "Sorry, I stopped after 1 tool calls without reaching an answer."
        );
    }

    #[tokio::test]
    async fn logs_transcript_as_summary() {
        let store = Arc::new(InMemoryStore::default());
        let agent = Agent::new(
            developer(SessionMode::Persistent),
            Arc::new(ScriptedProvider::new(vec![ModelReply::Content("hey".to_owned())])),
            general_tools(),
            store.clone(),
        );

        agent.log_conversation().await;
        assert!(store.recent_summaries("dev-1", 5).await.expect("summaries").is_empty());

        agent.process_message("hi", MessageContext::default()).await;
        agent.log_conversation().await;

        let summaries = store.recent_summaries("dev-1", 5).await.expect("summaries");
        assert_eq!(summaries.len(), 1);
        assert!(summaries[0].summary.ends_with("user: hi\nassistant: hey"));
    }

    #[tokio::test]
    async fn store_failures_while_logging_leave_the_reply_untouched() {
        let store = Arc::new(FailingStore::default());
        let agent = Agent::new(
            developer(SessionMode::Persistent),
            Arc::new(ScriptedProvider::new(vec![
                hello_call("call_1"),
                ModelReply::Content("Said hello.".to_owned()),
            ])),
            general_tools(),
            store.clone(),
        );

        let reply = agent.process_message("say hello", MessageContext::default()).await;
        assert_eq!(reply, "Said hello.");
        assert_eq!(store.attempts(), 1);
        assert_eq!(agent.session().await.len(), 5);

        agent.log_conversation().await;
        assert_eq!(store.attempts(), 2);
        assert!(agent.session().await.has_user_turns());
    }

    #[test]
    fn system_prompt_fills_template_placeholders() {
        let mut config = developer(SessionMode::Persistent);
        config.system_prompt = Some("{name} ({role}) uses {tools}".to_owned());
        let agent = Agent::new(
            config,
            Arc::new(ScriptedProvider::new(Vec::new())),
            general_tools(),
            Arc::new(InMemoryStore::default()),
        );

        assert_eq!(agent.system_prompt(), "Developer (software developer) uses sayHello");
        assert_eq!(agent.info().tools, vec!["sayHello"]);
    }
}
