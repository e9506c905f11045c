//! Scripted team conversations

pub mod scheduler;
pub mod script;

pub use scheduler::{ConversationScheduler, DialogueEvent};
pub use script::{chunk_duration_ms, chunk_text, DialogueEntry, Script, ScriptLine, TeamScript};
