use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::LlmProvider;
use super::types::ChatRequest;
use crate::core::errors::LlmError;

#[derive(Clone)]
pub struct OllamaProvider {
    base_url: String,
    client: Client,
}

impl OllamaProvider {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    fn classify(err: reqwest::Error) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Unavailable(err.to_string())
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn health_check(&self) -> Result<bool, LlmError> {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/chat", self.base_url);

        let mut options = json!({
            "temperature": request.options.temperature,
            "top_p": request.options.top_p,
            "top_k": request.options.top_k,
            "repeat_penalty": request.options.repeat_penalty,
        });
        if let Some(presence) = request.options.presence_penalty {
            options["presence_penalty"] = json!(presence);
        }

        let body = json!({
            "model": model_id,
            "messages": request.messages,
            "stream": false,
            "options": options,
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(Self::classify)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            tracing::error!("Ollama chat error ({}): {}", status, text);
            return Err(LlmError::Unavailable(format!(
                "chat endpoint returned {}",
                status
            )));
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|err| LlmError::Malformed(err.to_string()))?;

        payload["message"]["content"]
            .as_str()
            .map(|content| content.to_string())
            .ok_or_else(|| {
                LlmError::Malformed("chat response missing message.content".to_string())
            })
    }

    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, LlmError> {
        let url = format!("{}/api/embed", self.base_url);
        let body = json!({
            "model": model_id,
            "input": inputs,
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(Self::classify)?;

        if !res.status().is_success() {
            let status = res.status();
            return Err(LlmError::Unavailable(format!(
                "embed endpoint returned {}",
                status
            )));
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|err| LlmError::Malformed(err.to_string()))?;

        payload["embeddings"]
            .as_array()
            .ok_or_else(|| LlmError::Malformed("embed response missing embeddings".to_string()))?
            .iter()
            .map(|row| {
                row.as_array()
                    .map(|vals| {
                        vals.iter()
                            .filter_map(|v| v.as_f64().map(|f| f as f32))
                            .collect()
                    })
                    .ok_or_else(|| {
                        LlmError::Malformed("embedding row is not an array".to_string())
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::ChatMessage;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};

    async fn spawn_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn chat_parses_message_content() {
        let app = Router::new().route(
            "/api/chat",
            post(|| async {
                Json(json!({
                    "model": "test",
                    "message": {"role": "assistant", "content": "hello there"}
                }))
            }),
        );
        let provider = OllamaProvider::new(spawn_stub(app).await);

        let request = ChatRequest::new(vec![ChatMessage::user("hi")]);
        let reply = provider.chat(request, "test").await.unwrap();
        assert_eq!(reply, "hello there");
    }

    #[tokio::test]
    async fn chat_without_content_is_malformed() {
        let app = Router::new().route(
            "/api/chat",
            post(|| async { Json(json!({"model": "test"})) }),
        );
        let provider = OllamaProvider::new(spawn_stub(app).await);

        let request = ChatRequest::new(vec![ChatMessage::user("hi")]);
        let err = provider.chat(request, "test").await.unwrap_err();
        assert!(matches!(err, LlmError::Malformed(_)));
    }

    #[tokio::test]
    async fn chat_backend_error_is_unavailable() {
        let app = Router::new().route(
            "/api/chat",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let provider = OllamaProvider::new(spawn_stub(app).await);

        let request = ChatRequest::new(vec![ChatMessage::user("hi")]);
        let err = provider.chat(request, "test").await.unwrap_err();
        assert!(matches!(err, LlmError::Unavailable(_)));
    }

    #[tokio::test]
    async fn unreachable_backend_is_unavailable() {
        let provider = OllamaProvider::new("http://127.0.0.1:9".to_string());
        let request = ChatRequest::new(vec![ChatMessage::user("hi")]);
        let err = provider.chat(request, "test").await.unwrap_err();
        assert!(matches!(err, LlmError::Unavailable(_)));
    }

    #[tokio::test]
    async fn embed_parses_vectors() {
        let app = Router::new().route(
            "/api/embed",
            post(|| async {
                Json(json!({
                    "model": "test",
                    "embeddings": [[0.25, -0.5], [1.0, 0.0]]
                }))
            }),
        );
        let provider = OllamaProvider::new(spawn_stub(app).await);

        let vectors = provider
            .embed(&["a".to_string(), "b".to_string()], "test")
            .await
            .unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], vec![0.25, -0.5]);
        assert_eq!(vectors[1], vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn health_check_is_false_when_down() {
        let provider = OllamaProvider::new("http://127.0.0.1:9".to_string());
        assert!(!provider.health_check().await.unwrap());
    }
}
