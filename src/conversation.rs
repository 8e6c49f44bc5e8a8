use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::llm::ChatMessage;

/// Message roles in a conversation log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One immutable entry in a conversation log.
#[derive(Debug, Clone)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        ChatMessage::new(message.role.as_str(), message.content.clone())
    }
}

/// Append-only message log for one conversation. The first entry is always
/// the system persona; later entries arrive as user/assistant pairs.
pub struct ConversationLog {
    messages: Mutex<Vec<Message>>,
}

impl ConversationLog {
    pub fn new(system_prompt: &str) -> Self {
        Self {
            messages: Mutex::new(vec![Message::new(Role::System, system_prompt)]),
        }
    }

    /// Appends a completed exchange under one lock so concurrent completions
    /// cannot interleave between a question and its answer.
    pub async fn append_exchange(&self, question: &str, reply: &str) {
        let mut messages = self.messages.lock().await;
        messages.push(Message::new(Role::User, question));
        messages.push(Message::new(Role::Assistant, reply));
    }

    /// Copy of the full log; no lock is held by the caller afterwards.
    pub async fn snapshot(&self) -> Vec<Message> {
        self.messages.lock().await.clone()
    }

    /// The system message plus the most recent `limit` non-system messages.
    pub async fn snapshot_window(&self, limit: usize) -> Vec<Message> {
        let messages = self.messages.lock().await;
        let mut window = Vec::with_capacity(limit + 1);
        window.push(messages[0].clone());

        let tail = &messages[1..];
        let skip = tail.len().saturating_sub(limit);
        window.extend_from_slice(&tail[skip..]);
        window
    }

    pub async fn message_count(&self) -> usize {
        self.messages.lock().await.len()
    }
}

/// Conversation logs keyed by conversation id, so concurrent callers on
/// different conversations never share context.
pub struct ConversationStore {
    system_prompt: String,
    logs: Mutex<HashMap<String, Arc<ConversationLog>>>,
}

impl ConversationStore {
    pub fn new(system_prompt: String) -> Self {
        Self {
            system_prompt,
            logs: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get_or_create(&self, conversation_id: &str) -> Arc<ConversationLog> {
        let mut logs = self.logs.lock().await;
        logs.entry(conversation_id.to_string())
            .or_insert_with(|| Arc::new(ConversationLog::new(&self.system_prompt)))
            .clone()
    }
}
