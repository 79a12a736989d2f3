pub mod filesystem;
pub mod general;
pub mod message_agent;
pub mod registry;
pub mod schema;
pub mod tool_box;
pub mod types;

pub use filesystem::{register_file_tools, Workspace, FILE_CATEGORY};
pub use general::{register_general_tools, GENERAL_CATEGORY};
pub use message_agent::{MessageAgentTool, TEAM_CATEGORY};
pub use registry::{ToolEntry, ToolRegistry};
pub use schema::{ParamSpec, ParamType, ToolSchema, ToolSignature};
pub use tool_box::ToolBox;
pub use types::{FnTool, Tool, ToolContext};
