use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::Duration;

use crate::config::schema::ProviderConfig;
use crate::error::{Error, Result};
use crate::providers::retry::{send_with_retry, RetryPolicy};
use crate::providers::types::{
    ChatMessage, CompletionRequest, ModelProvider, ModelReply, Role, ToolChoice, ToolInvocation,
};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4-turbo";

/// Chat-completions client for OpenAI and API-compatible endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    name: String,
    model: String,
    endpoint: String,
    temperature: f32,
    max_tokens: Option<usize>,
    retry: RetryPolicy,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn from_config(config: &ProviderConfig, api_key: &str) -> Result<Self> {
        let base_url = config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let endpoint = format!("{}/chat/completions", base_url.trim_end_matches('/'));

        let mut headers = reqwest::header::HeaderMap::new();
        let authorization = format!("Bearer {api_key}").parse().map_err(|_| {
            Error::Config(format!(
                "provider '{}' has an API key that is not a valid header value",
                config.name
            ))
        })?;
        headers.insert(reqwest::header::AUTHORIZATION, authorization);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .map_err(|err| Error::Provider(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            name: config.name.clone(),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            endpoint,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            retry: RetryPolicy::with_max_retries(config.max_retries),
            client,
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn request_body(&self, request: &CompletionRequest<'_>) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": request.messages.iter().map(wire_message).collect::<Vec<_>>(),
            "temperature": self.temperature,
        });

        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        if request.tool_choice == ToolChoice::Auto && !request.tools.is_empty() {
            body["tools"] = json!(request
                .tools
                .iter()
                .map(|schema| json!({
                    "type": "function",
                    "function": {
                        "name": schema.name,
                        "description": schema.description,
                        "parameters": schema.parameters,
                    }
                }))
                .collect::<Vec<_>>());
            body["tool_choice"] = json!("auto");
            // The loop executes one call per model turn.
            body["parallel_tool_calls"] = json!(false);
        }

        body
    }
}

fn wire_message(message: &ChatMessage) -> Value {
    match (message.role, &message.tool_call) {
        (Role::Assistant, Some(call)) => json!({
            "role": "assistant",
            "content": Value::Null,
            "tool_calls": [{
                "id": call.id,
                "type": "function",
                "function": { "name": call.name, "arguments": call.arguments },
            }],
        }),
        (Role::Tool, _) => json!({
            "role": "tool",
            "tool_call_id": message.tool_call_id,
            "content": message.content,
        }),
        (role, _) => json!({
            "role": role.as_str(),
            "content": message.content,
        }),
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<OpenAiToolCall>,
}

#[derive(Debug, Deserialize)]
struct OpenAiToolCall {
    id: Option<String>,
    function: OpenAiFunction,
}

#[derive(Debug, Deserialize)]
struct OpenAiFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: CompletionRequest<'_>) -> Result<ModelReply> {
        let builder = self.client.post(&self.endpoint).json(&self.request_body(&request));
        let response = send_with_retry(builder, &self.retry, "chat completion").await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "chat completion failed with status {status}: {body}"
            )));
        }

        let payload: OpenAiResponse = response
            .json()
            .await
            .map_err(|err| Error::Provider(format!("failed to parse chat completion: {err}")))?;

        let message = payload
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| Error::Provider("chat completion returned no choices".to_owned()))?;

        if let Some(call) = message.tool_calls.into_iter().next() {
            return Ok(ModelReply::ToolCall(ToolInvocation {
                id: call.id.unwrap_or_else(ToolInvocation::generate_id),
                name: call.function.name,
                arguments: call.function.arguments,
            }));
        }

        Ok(ModelReply::Content(message.content.unwrap_or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ParamSpec, ParamType, ToolSchema, ToolSignature};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> OpenAiProvider {
        let config = ProviderConfig {
            name: "openai".to_owned(),
            base_url: Some(server.uri()),
            model: Some("gpt-test".to_owned()),
            ..ProviderConfig::default()
        };
        OpenAiProvider::from_config(&config, "sk-test")
            .expect("provider should build")
            .with_retry_policy(RetryPolicy {
                max_retries: 1,
                base_delay_ms: 1,
                max_delay_ms: 1,
            })
    }

    fn read_file_schema() -> ToolSchema {
        ToolSchema::from_signature(&ToolSignature::new(
            "read_file",
            "Read the contents of a file.",
            vec![ParamSpec::new("path", ParamType::String)],
        ))
        .expect("schema should build")
    }

    #[tokio::test]
    async fn sends_tools_with_auto_choice_and_parses_tool_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-test",
                "tool_choice": "auto",
                "tools": [{ "type": "function", "function": { "name": "read_file" } }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {
                        "content": null,
                        "tool_calls": [{
                            "id": "call_1",
                            "type": "function",
                            "function": { "name": "read_file", "arguments": "{\"path\":\"a.txt\"}" }
                        }]
                    }
                }]
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let messages = vec![ChatMessage::system("sys"), ChatMessage::user("read a.txt")];
        let tools = vec![read_file_schema()];
        let reply = provider
            .complete(CompletionRequest::new(&messages, &tools))
            .await
            .expect("completion should succeed");

        assert_eq!(
            reply,
            ModelReply::ToolCall(ToolInvocation::new("call_1", "read_file", "{\"path\":\"a.txt\"}"))
        );
    }

    #[tokio::test]
    async fn retries_server_errors_then_returns_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "All done." } }]
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let messages = vec![ChatMessage::user("hi")];
        let reply = provider
            .complete(CompletionRequest::new(&messages, &[]))
            .await
            .expect("completion should succeed after retry");

        assert_eq!(reply, ModelReply::Content("All done.".to_owned()));
    }

    #[tokio::test]
    async fn surfaces_auth_failures_as_provider_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let messages = vec![ChatMessage::user("hi")];
        let error = provider
            .complete(CompletionRequest::new(&messages, &[]))
            .await
            .expect_err("401 should fail");

        assert!(matches!(error, Error::Provider(_)));
        assert!(error.to_string().contains("401"));
    }

    #[test]
    fn serializes_tool_exchange_turns_in_wire_format() {
        let call = ToolInvocation::new("call_9", "sayHello", "{}");
        let assistant = wire_message(&ChatMessage::assistant_tool_call(call.clone()));
        let result = wire_message(&ChatMessage::tool_result(&call, "\"Hello, world!\""));

        assert_eq!(assistant["tool_calls"][0]["function"]["name"], "sayHello");
        assert_eq!(assistant["content"], Value::Null);
        assert_eq!(result["role"], "tool");
        assert_eq!(result["tool_call_id"], "call_9");
    }
}
