use std::sync::{Arc, Weak};

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::agents::{AgentRegistry, MessageContext};
use crate::conversation::team::TeamThreads;
use crate::error::{Error, Result};
use crate::storage::model::{NewMessage, TEAM_THREAD_FLAG};
use crate::storage::MessageStore;
use crate::tools::schema::{ParamSpec, ParamType, ToolSignature};
use crate::tools::types::{optional_str, required_str, Tool, ToolContext};

pub const TEAM_CATEGORY: &str = "team";

/// Lets an agent hand a message to a teammate and wait for the answer.
pub struct MessageAgentTool {
    agents: Weak<AgentRegistry>,
    threads: Arc<TeamThreads>,
    store: Arc<dyn MessageStore>,
    max_call_depth: usize,
}

impl MessageAgentTool {
    pub fn new(
        agents: &Arc<AgentRegistry>,
        threads: Arc<TeamThreads>,
        store: Arc<dyn MessageStore>,
        max_call_depth: usize,
    ) -> Self {
        Self {
            agents: Arc::downgrade(agents),
            threads,
            store,
            max_call_depth,
        }
    }

    fn check_chain(&self, target: &str, chain: &[String]) -> Result<()> {
        if chain.iter().any(|agent| agent == target) {
            return Err(Error::Tool(format!(
                "Cannot message '{target}': it is already waiting in the call chain {} -> {target}",
                chain.join(" -> ")
            )));
        }

        if chain.len() >= self.max_call_depth {
            return Err(Error::Tool(format!(
                "Cannot message '{target}': call chain {} already has the maximum depth of {}",
                chain.join(" -> "),
                self.max_call_depth
            )));
        }

        Ok(())
    }

    async fn save(&self, message: NewMessage, target: &str) -> Result<()> {
        self.store
            .save_message(message)
            .await
            .map(|_| ())
            .map_err(|err| Error::Tool(format!("Error messaging {target}: {err}")))
    }
}

#[async_trait]
impl Tool for MessageAgentTool {
    fn signature(&self) -> ToolSignature {
        ToolSignature::new(
            "message_agent",
            "Send a message to another agent and get their response. Inter-agent messages are saved to a shared team thread.",
            vec![
                ParamSpec::untyped("ctx"),
                ParamSpec::new("agent_name", ParamType::String),
                ParamSpec::new("message", ParamType::String),
                ParamSpec::new("thread_id", ParamType::optional(ParamType::String)),
                ParamSpec::new("sender_agent", ParamType::optional(ParamType::String)),
            ],
        )
    }

    async fn call(&self, context: &ToolContext, args: Map<String, Value>) -> Result<Value> {
        let target_name = required_str(&args, "agent_name")?;
        let message = required_str(&args, "message")?;
        let sender = optional_str(&args, "sender_agent").unwrap_or(context.agent_name.as_str());
        let origin_thread = optional_str(&args, "thread_id")
            .map(str::to_owned)
            .or_else(|| context.thread_id.clone());

        let agents = self
            .agents
            .upgrade()
            .ok_or_else(|| Error::Tool("agent registry is no longer available".to_owned()))?;
        let target = agents.get_agent(target_name).ok_or_else(|| {
            Error::Tool(format!(
                "Unknown agent '{target_name}'. Available agents: {}",
                agents.list_agents().join(", ")
            ))
        })?;

        self.check_chain(target_name, &context.call_chain)?;

        let team_thread = self.threads.resolve().await;
        let metadata = |message: NewMessage| {
            message
                .with_metadata(TEAM_THREAD_FLAG, json!(true))
                .with_metadata("origin_thread_id", json!(origin_thread))
        };

        tracing::info!(
            from = sender,
            to = target_name,
            thread_id = %team_thread,
            depth = context.call_chain.len(),
            "messaging agent"
        );

        self.save(
            metadata(NewMessage::new(&team_thread, sender, target_name, "assistant", message)),
            target_name,
        )
        .await?;

        let mut call_chain = context.call_chain.clone();
        call_chain.push(target_name.to_owned());
        let reply = target
            .process_message(
                message,
                MessageContext {
                    thread_id: Some(team_thread.clone()),
                    call_chain,
                },
            )
            .await;

        self.save(
            metadata(NewMessage::new(&team_thread, target_name, sender, "assistant", &reply)),
            target_name,
        )
        .await?;

        Ok(Value::String(format!("Response from {target_name}: {reply}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;
    use crate::testing::EchoAgent;
    use crate::tools::{ToolBox, ToolRegistry};

    struct Team {
        registry: Arc<AgentRegistry>,
        critic: Arc<EchoAgent>,
        store: Arc<InMemoryStore>,
        tools: ToolBox,
    }

    fn team(max_call_depth: usize) -> Team {
        let registry = Arc::new(AgentRegistry::new());
        let critic = Arc::new(EchoAgent::new("Critic"));
        registry
            .register(Arc::new(EchoAgent::new("Developer")))
            .expect("register developer");
        registry.register(critic.clone()).expect("register critic");

        let store = Arc::new(InMemoryStore::default());
        let threads = Arc::new(TeamThreads::new(store.clone()));
        let mut tools = ToolRegistry::default();
        tools
            .register(
                "message_agent",
                Arc::new(MessageAgentTool::new(
                    &registry,
                    threads,
                    store.clone(),
                    max_call_depth,
                )),
                ["general", TEAM_CATEGORY],
            )
            .expect("register message_agent");

        Team {
            tools: ToolBox::new(&tools, &[TEAM_CATEGORY]),
            registry,
            critic,
            store,
        }
    }

    fn developer_context() -> ToolContext {
        ToolContext::new("Developer").with_thread(Some("dev-thread".to_owned()))
    }

    #[tokio::test]
    async fn relays_message_and_persists_both_sides_on_team_thread() {
        let team = team(4);

        let result = team
            .tools
            .run_tool(
                "message_agent",
                &developer_context(),
                json!({
                    "agent_name": "Critic",
                    "message": "please review main.rs",
                    "thread_id": null,
                    "sender_agent": null
                }),
            )
            .await;

        assert_eq!(
            result,
            json!("Response from Critic: Critic heard: please review main.rs")
        );

        let saved = team.store.get_messages(None, 10).await.expect("messages");
        assert_eq!(saved.len(), 2);
        let (reply, request) = (&saved[0], &saved[1]);
        assert_eq!((request.sender.as_str(), request.recipient.as_str()), ("Developer", "Critic"));
        assert_eq!((reply.sender.as_str(), reply.recipient.as_str()), ("Critic", "Developer"));
        assert_eq!(request.thread_id, reply.thread_id);
        assert!(request.is_team_thread());
        assert_eq!(request.metadata["origin_thread_id"], "dev-thread");

        let received = team.critic.received();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].1.thread_id.as_deref(), Some(request.thread_id.as_str()));
        assert_eq!(received[0].1.call_chain, vec!["Developer", "Critic"]);
        assert_eq!(team.registry.len(), 2);
    }

    #[tokio::test]
    async fn unknown_agent_lists_available_agents() {
        let team = team(4);

        let result = team
            .tools
            .run_tool(
                "message_agent",
                &developer_context(),
                json!({
                    "agent_name": "Nonexistent",
                    "message": "hello?",
                    "thread_id": "dev-thread",
                    "sender_agent": "Developer"
                }),
            )
            .await;

        assert_eq!(
            result,
            json!({ "error": "Unknown agent 'Nonexistent'. Available agents: Developer, Critic" })
        );
        assert!(team.store.get_messages(None, 10).await.expect("messages").is_empty());
    }

    #[tokio::test]
    async fn refuses_to_message_an_agent_already_in_the_chain() {
        let team = team(4);
        let mut context = ToolContext::new("Critic");
        context.call_chain = vec!["Developer".to_owned(), "Critic".to_owned()];

        let result = team
            .tools
            .run_tool(
                "message_agent",
                &context,
                json!({
                    "agent_name": "Developer",
                    "message": "back to you",
                    "thread_id": null,
                    "sender_agent": null
                }),
            )
            .await;

        let message = result["error"].as_str().expect("cycle error");
        assert!(message.contains("Developer -> Critic -> Developer"));
        assert!(team.store.get_messages(None, 10).await.expect("messages").is_empty());
    }

    #[tokio::test]
    async fn refuses_self_messages_and_deep_chains() {
        let team = team(1);

        let to_self = team
            .tools
            .run_tool(
                "message_agent",
                &developer_context(),
                json!({
                    "agent_name": "Developer",
                    "message": "talking to myself",
                    "thread_id": null,
                    "sender_agent": null
                }),
            )
            .await;
        assert!(to_self["error"].as_str().expect("cycle error").contains("call chain"));

        let too_deep = team
            .tools
            .run_tool(
                "message_agent",
                &developer_context(),
                json!({
                    "agent_name": "Critic",
                    "message": "hi",
                    "thread_id": null,
                    "sender_agent": null
                }),
            )
            .await;
        assert!(too_deep["error"]
            .as_str()
            .expect("depth error")
            .contains("maximum depth of 1"));
    }
}
