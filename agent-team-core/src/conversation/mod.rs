pub mod service;
pub mod team;

pub use service::{ConversationService, DEFAULT_HISTORY_LIMIT};
pub use team::TeamThreads;
