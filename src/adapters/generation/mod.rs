pub mod openai_chat;
pub mod scripted;

pub use openai_chat::{OpenAiChatConfig, OpenAiChatGenerator};
pub use scripted::ScriptedGenerator;
