pub mod factory;
pub mod openai;
pub mod registry;
pub mod retry;
pub mod types;

pub use factory::create_provider_registry;
pub use registry::ProviderRegistry;
pub use types::{ChatMessage, CompletionRequest, ModelProvider, ModelReply, Role, ToolInvocation};
