use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use crate::conversation::ConversationStore;
use crate::core::config::Settings;
use crate::core::errors::{ChatError, LlmError};
use crate::llm::{ChatMessage, ChatRequest, LlmProvider, SamplingOptions};
use crate::prompt::compose_rag_prompt;
use crate::retrieval::Retriever;

/// Fixed reply when the model cannot produce an answer in time.
pub const FALLBACK_ANSWER: &str = "Wait a moment, I can't answer right now.";
/// Guidance reply for empty questions.
pub const EMPTY_QUESTION_REPLY: &str = "Please provide a question or prompt.";

/// Turns a raw user question into a grounded answer: retrieve, compose,
/// infer under a wall-clock bound, and commit the exchange on success.
pub struct ChatEngine {
    provider: Arc<dyn LlmProvider>,
    retriever: Retriever,
    conversations: ConversationStore,
    model_id: String,
    sampling: SamplingOptions,
    history_limit: usize,
    inference_timeout: Duration,
}

impl ChatEngine {
    pub fn new(provider: Arc<dyn LlmProvider>, retriever: Retriever, settings: &Settings) -> Self {
        Self {
            provider,
            retriever,
            conversations: ConversationStore::new(settings.persona.system_prompt.clone()),
            model_id: settings.models.chat.clone(),
            sampling: settings.chat.sampling,
            history_limit: settings.chat.history_limit,
            inference_timeout: Duration::from_secs(settings.chat.timeout_secs),
        }
    }

    pub fn with_inference_timeout(mut self, inference_timeout: Duration) -> Self {
        self.inference_timeout = inference_timeout;
        self
    }

    /// Single entry point used by every binding.
    ///
    /// The conversation log is only mutated after a successful inference, as
    /// one atomic user/assistant pair: a timed-out or failed call leaves no
    /// orphaned user turn behind, and concurrent completions cannot
    /// cross-pair.
    pub async fn answer(&self, conversation_id: &str, question: &str) -> Result<String, ChatError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ChatError::EmptyQuestion);
        }

        let retrieved = self.retriever.retrieve(question).await;
        tracing::debug!("Retrieved {} chunks for question", retrieved.len());
        let rag_prompt = compose_rag_prompt(&retrieved, question);

        let log = self.conversations.get_or_create(conversation_id).await;
        let mut messages: Vec<ChatMessage> = log
            .snapshot_window(self.history_limit)
            .await
            .iter()
            .map(ChatMessage::from)
            .collect();
        messages.push(ChatMessage::user(rag_prompt));

        let request = ChatRequest::new(messages).with_options(self.sampling);

        // Dropping the future on expiry closes the in-flight backend call.
        let reply = match timeout(
            self.inference_timeout,
            self.provider.chat(request, &self.model_id),
        )
        .await
        {
            Ok(Ok(reply)) => reply,
            Ok(Err(err)) => {
                tracing::error!("Inference failed: {}", err);
                return Err(ChatError::Inference(err));
            }
            Err(_) => {
                tracing::error!(
                    "Inference timed out after {:?}",
                    self.inference_timeout
                );
                return Err(ChatError::Inference(LlmError::Timeout));
            }
        };

        log.append_exchange(question, &reply).await;
        Ok(reply)
    }

    /// `answer` with failures folded into the fixed user-facing strings.
    pub async fn answer_or_fallback(&self, conversation_id: &str, question: &str) -> String {
        match self.answer(conversation_id, question).await {
            Ok(reply) => reply,
            Err(ChatError::EmptyQuestion) => EMPTY_QUESTION_REPLY.to_string(),
            Err(_) => FALLBACK_ANSWER.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::Embedder;
    use crate::index::ChunkStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Echoes the question back; sleeps when the question asks it to.
    struct EchoProvider {
        chat_calls: AtomicUsize,
        delay: Duration,
        slow_marker_delay: Duration,
    }

    impl EchoProvider {
        fn new() -> Self {
            Self {
                chat_calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
                slow_marker_delay: Duration::from_millis(100),
            }
        }

        fn with_delay(delay: Duration) -> Self {
            Self {
                chat_calls: AtomicUsize::new(0),
                delay,
                slow_marker_delay: delay,
            }
        }
    }

    #[async_trait]
    impl LlmProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn health_check(&self) -> Result<bool, LlmError> {
            Ok(true)
        }

        async fn chat(&self, request: ChatRequest, _model_id: &str) -> Result<String, LlmError> {
            self.chat_calls.fetch_add(1, Ordering::SeqCst);
            let prompt = request
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();

            if prompt.contains("slow") {
                tokio::time::sleep(self.slow_marker_delay).await;
            } else {
                tokio::time::sleep(self.delay).await;
            }

            Ok(format!("reply to: {}", prompt))
        }

        async fn embed(
            &self,
            inputs: &[String],
            _model_id: &str,
        ) -> Result<Vec<Vec<f32>>, LlmError> {
            Ok(inputs.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    async fn test_engine(
        provider: Arc<EchoProvider>,
        dir: &tempfile::TempDir,
    ) -> ChatEngine {
        let store = ChunkStore::open(&dir.path().join("chunks.db")).await.unwrap();
        let embedder = Embedder::new(provider.clone(), "embed-model".to_string());
        let retriever = Retriever::new(store, embedder, 4);
        ChatEngine::new(provider, retriever, &Settings::default())
    }

    #[tokio::test]
    async fn empty_question_is_rejected_before_any_backend_call() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(EchoProvider::new());
        let engine = test_engine(provider.clone(), &dir).await;

        let err = engine.answer("default", "   ").await.unwrap_err();
        assert!(matches!(err, ChatError::EmptyQuestion));
        assert_eq!(provider.chat_calls.load(Ordering::SeqCst), 0);

        let reply = engine.answer_or_fallback("default", "").await;
        assert_eq!(reply, EMPTY_QUESTION_REPLY);
    }

    #[tokio::test]
    async fn empty_index_still_produces_an_answer() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(EchoProvider::new());
        let engine = test_engine(provider, &dir).await;

        let reply = engine
            .answer("default", "How do I make a furnace?")
            .await
            .unwrap();
        assert!(!reply.is_empty());
        assert!(reply.contains("How do I make a furnace?"));
    }

    #[tokio::test]
    async fn retrieved_context_reaches_the_model() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(EchoProvider::new());

        let store = ChunkStore::open(&dir.path().join("chunks.db")).await.unwrap();
        store
            .insert_chunk("guide.txt", "eight cobblestone in a ring", &[1.0, 0.0])
            .await
            .unwrap();

        let embedder = Embedder::new(provider.clone(), "embed-model".to_string());
        let retriever = Retriever::new(store, embedder, 4);
        let engine = ChatEngine::new(provider, retriever, &Settings::default());

        let reply = engine
            .answer("default", "How do I make a furnace?")
            .await
            .unwrap();
        assert!(reply.contains("eight cobblestone in a ring"));
    }

    #[tokio::test]
    async fn timeout_returns_error_and_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(EchoProvider::with_delay(Duration::from_millis(200)));
        let engine = test_engine(provider, &dir)
            .await
            .with_inference_timeout(Duration::from_millis(20));

        let err = engine.answer("default", "anything").await.unwrap_err();
        assert!(matches!(err, ChatError::Inference(LlmError::Timeout)));

        let log = engine.conversations.get_or_create("default").await;
        assert_eq!(log.message_count().await, 1);

        let reply = engine.answer_or_fallback("default", "anything").await;
        assert_eq!(reply, FALLBACK_ANSWER);
        assert_eq!(log.message_count().await, 1);
    }

    #[tokio::test]
    async fn successful_answer_commits_one_exchange() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(EchoProvider::new());
        let engine = test_engine(provider, &dir).await;

        engine.answer("default", "first question").await.unwrap();

        let log = engine.conversations.get_or_create("default").await;
        let snapshot = log.snapshot().await;
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[1].content, "first question");
        assert!(snapshot[2].content.contains("first question"));
    }

    #[tokio::test]
    async fn reverse_order_completions_stay_paired() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(EchoProvider::new());
        let engine = Arc::new(test_engine(provider, &dir).await);

        // The first question finishes last; the second overtakes it.
        let slow = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.answer("default", "slow question").await })
        };
        let fast = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.answer("default", "fast question").await })
        };

        slow.await.unwrap().unwrap();
        fast.await.unwrap().unwrap();

        let log = engine.conversations.get_or_create("default").await;
        let snapshot = log.snapshot().await;
        assert_eq!(snapshot.len(), 5);

        for pair in snapshot[1..].chunks(2) {
            assert!(
                pair[1].content.contains(&pair[0].content),
                "assistant turn {:?} is not the answer to {:?}",
                pair[1].content,
                pair[0].content
            );
        }
    }

    #[tokio::test]
    async fn concurrent_answers_never_lose_appends() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(EchoProvider::new());
        let engine = Arc::new(test_engine(provider, &dir).await);

        let mut handles = Vec::new();
        for i in 0..16 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                engine.answer("default", &format!("question {}", i)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let log = engine.conversations.get_or_create("default").await;
        assert_eq!(log.message_count().await, 1 + 2 * 16);
    }
}
