pub mod conversation;
pub mod message;

pub use conversation::{next_conversation_id, numeric_id, Conversation};
pub use message::{ApiMessage, AssistantContent, Message, MessageContent, Role};
