//! LlmClient trait definition

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// Stateless text-generation client; every call starts a fresh conversation
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::debug;

    /// Replays queued replies in order and records each request
    pub struct MockLlmClient {
        responses: Vec<Result<CompletionResponse, String>>,
        call_count: AtomicUsize,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl MockLlmClient {
        pub fn new(responses: Vec<CompletionResponse>) -> Self {
            debug!(response_count = %responses.len(), "MockLlmClient::new: called");
            Self::scripted(responses.into_iter().map(Ok).collect())
        }

        /// Text replies; an `Err` entry fails that call
        pub fn scripted(responses: Vec<Result<CompletionResponse, String>>) -> Self {
            Self {
                responses,
                call_count: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn replies(texts: &[&str]) -> Self {
            Self::new(texts.iter().map(|t| CompletionResponse::text(*t)).collect())
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            debug!("MockLlmClient::complete: called");
            self.requests.lock().unwrap().push(request);
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            match self.responses.get(idx) {
                Some(Ok(response)) => Ok(response.clone()),
                Some(Err(message)) => Err(LlmError::InvalidResponse(message.clone())),
                None => Err(LlmError::InvalidResponse("No more mock responses".to_string())),
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_client_replays_in_order() {
            let client = MockLlmClient::replies(&["first", "second"]);
            let req = CompletionRequest::single("sys", "hello", 100);

            let first = client.complete(req.clone()).await.unwrap();
            assert_eq!(first.content.as_deref(), Some("first"));
            let second = client.complete(req.clone()).await.unwrap();
            assert_eq!(second.content.as_deref(), Some("second"));

            assert!(client.complete(req).await.is_err());
            assert_eq!(client.call_count(), 3);
            assert_eq!(client.requests()[0].system_prompt, "sys");
        }

        #[tokio::test]
        async fn test_mock_client_scripted_failure() {
            let client = MockLlmClient::scripted(vec![Err("offline".to_string())]);
            let err = client
                .complete(CompletionRequest::single("sys", "hi", 10))
                .await
                .unwrap_err();
            assert!(err.to_string().contains("offline"));
        }
    }
}
