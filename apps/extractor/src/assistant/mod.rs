//! Job-description assistant: JD generation plus per-mode Q&A conversations
//! over uploaded documents, served as a JSON API.

pub mod conversation;
pub mod handlers;
pub mod prompts;
