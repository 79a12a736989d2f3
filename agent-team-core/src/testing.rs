//! Test doubles for providers, agents and stores.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::agents::{AgentInfo, ConversationAgent, MessageContext};
use crate::error::{Error, Result};
use crate::providers::types::{ChatMessage, CompletionRequest, ModelProvider, ModelReply};
use crate::storage::model::{ActionLog, ConversationSummary, NewMessage, PersistedMessage};
use crate::storage::MessageStore;

/// Replays canned replies in order and records every request it receives.
/// Once the script runs out every call fails with a provider error.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<ModelReply>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<String>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<ModelReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests().len()
    }

    /// Number of turns sent with the `index`-th request.
    pub fn request_len(&self, index: usize) -> usize {
        self.requests()
            .get(index)
            .map(|request| request.messages.len())
            .unwrap_or_default()
    }

    /// Tool names offered with the `index`-th request.
    pub fn offered_tools(&self, index: usize) -> Vec<String> {
        self.requests()
            .get(index)
            .map(|request| request.tools.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest<'_>) -> Result<ModelReply> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedRequest {
                messages: request.messages.to_vec(),
                tools: request.tools.iter().map(|tool| tool.name.clone()).collect(),
            });

        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or_else(|| Error::Provider("script exhausted".to_owned()))
    }
}

/// Agent that answers with a fixed prefix and remembers what it was asked.
#[derive(Debug)]
pub struct EchoAgent {
    name: String,
    received: Mutex<Vec<(String, MessageContext)>>,
}

impl EchoAgent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn received(&self) -> Vec<(String, MessageContext)> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ConversationAgent for EchoAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn info(&self) -> AgentInfo {
        AgentInfo {
            id: format!("{}-id", self.name.to_lowercase()),
            name: self.name.clone(),
            role: "echo".to_owned(),
            description: "Repeats what it hears.".to_owned(),
            tools: Vec::new(),
        }
    }

    async fn process_message(&self, message: &str, context: MessageContext) -> String {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((message.to_owned(), context));
        format!("{} heard: {message}", self.name)
    }

    async fn log_conversation(&self) {}
}

/// Store whose every call fails with a storage error. Counts the attempts.
#[derive(Debug, Default)]
pub struct FailingStore {
    attempts: AtomicUsize,
}

impl FailingStore {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn fail<T>(&self, operation: &str) -> Result<T> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(Error::Storage(format!("{operation}: store unavailable")))
    }
}

#[async_trait]
impl MessageStore for FailingStore {
    async fn save_message(&self, _message: NewMessage) -> Result<PersistedMessage> {
        self.fail("save_message")
    }

    async fn get_messages(
        &self,
        _thread_id: Option<&str>,
        _limit: usize,
    ) -> Result<Vec<PersistedMessage>> {
        self.fail("get_messages")
    }

    async fn log_action(&self, _action: ActionLog) -> Result<String> {
        self.fail("log_action")
    }

    async fn log_conversation(&self, _agent_id: &str, _summary: &str) -> Result<String> {
        self.fail("log_conversation")
    }

    async fn recent_summaries(
        &self,
        _agent_id: &str,
        _limit: usize,
    ) -> Result<Vec<ConversationSummary>> {
        self.fail("recent_summaries")
    }
}
