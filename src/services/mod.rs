//! Outbound integrations: email delivery and the LLM chat-completion client.

pub mod email;
pub mod llm;
