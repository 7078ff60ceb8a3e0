// capabilities-rs/src/memory_ops.rs
// Explicit memory requests: "remember ...", "what do you remember about ...".

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use shared_types::{
    CapabilityError, CapabilityModule, HandlerContext, HandlerOutput, MemoryEvent, MemoryService,
};

const RECALL_LIMIT: usize = 5;

pub struct MemoryOperationExecutor {
    memory: Arc<dyn MemoryService>,
}

impl MemoryOperationExecutor {
    pub fn new(memory: Arc<dyn MemoryService>) -> Self {
        MemoryOperationExecutor { memory }
    }

    fn strip_prefix<'a>(text: &'a str, prefixes: &[&str]) -> Option<&'a str> {
        let lowered = text.to_lowercase();
        for prefix in prefixes {
            if lowered.starts_with(prefix) {
                return Some(text[prefix.len()..].trim_start_matches([' ', ':']));
            }
        }
        None
    }
}

#[async_trait]
impl CapabilityModule for MemoryOperationExecutor {
    fn name(&self) -> &str {
        "memory_operations"
    }

    async fn handle_input(
        &self,
        text: &str,
        context: &HandlerContext,
    ) -> Result<HandlerOutput, CapabilityError> {
        let trimmed = text.trim();

        if let Some(content) = Self::strip_prefix(
            trimmed,
            &[
                "please remember that",
                "please remember",
                "remember that",
                "remember",
                "remind me to",
                "remind me about",
            ],
        ) {
            if content.is_empty() {
                return Err(CapabilityError::InvalidInput(
                    "nothing to remember".to_string(),
                ));
            }
            let event = MemoryEvent {
                conversation_id: context.conversation_id.clone(),
                speaker: context.speaker.clone(),
                user_text: trimmed.to_string(),
                assistant_text: String::new(),
                intent: "MEMORY".to_string(),
                occurred_at: Utc::now(),
            };
            self.memory.generate(vec![event]).await?;
            return Ok(HandlerOutput {
                response: format!("Okay, I'll remember that {content}."),
                action: None,
                memories: vec![content.to_string()],
            });
        }

        if let Some(topic) = Self::strip_prefix(
            trimmed,
            &[
                "what do you remember about",
                "what do you know about",
                "do you recall",
                "recall",
            ],
        ) {
            let topic = topic.trim_end_matches('?').trim();
            let queries = vec![topic.to_string()];
            let found = self.memory.retrieve(&queries, RECALL_LIMIT).await?;
            let response = if found.is_empty() {
                format!("I don't have anything about {topic} yet.")
            } else {
                format!("Here's what I remember: {}", found.join("; "))
            };
            return Ok(HandlerOutput::text(response));
        }

        if Self::strip_prefix(trimmed, &["forget about", "forget"]).is_some() {
            // deletion is not part of the memory seam; be honest about it
            return Ok(HandlerOutput::text(
                "I can't delete memories yet, but I'll de-prioritize that.",
            ));
        }

        Err(CapabilityError::InvalidInput(format!(
            "not a memory operation: {trimmed:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;

    struct FakeMemory {
        stored: Mutex<Vec<MemoryEvent>>,
        canned: Vec<String>,
    }

    impl FakeMemory {
        fn new(canned: Vec<String>) -> Self {
            FakeMemory {
                stored: Mutex::new(Vec::new()),
                canned,
            }
        }
    }

    #[async_trait]
    impl MemoryService for FakeMemory {
        async fn retrieve(
            &self,
            _queries: &[String],
            limit: usize,
        ) -> Result<Vec<String>, CapabilityError> {
            Ok(self.canned.iter().take(limit).cloned().collect())
        }

        async fn generate(&self, events: Vec<MemoryEvent>) -> Result<(), CapabilityError> {
            self.stored.lock().await.extend(events);
            Ok(())
        }
    }

    #[tokio::test]
    async fn remember_stores_an_event_and_confirms() {
        let memory = Arc::new(FakeMemory::new(Vec::new()));
        let executor = MemoryOperationExecutor::new(memory.clone());
        let out = executor
            .handle_input(
                "remember that the wifi password is on the fridge",
                &HandlerContext::default(),
            )
            .await
            .unwrap();
        assert!(out.response.contains("the wifi password is on the fridge"));
        assert_eq!(memory.stored.lock().await.len(), 1);
        assert_eq!(out.memories.len(), 1);
    }

    #[tokio::test]
    async fn recall_lists_retrieved_memories() {
        let memory = Arc::new(FakeMemory::new(vec![
            "grandma visits on sunday".to_string(),
        ]));
        let executor = MemoryOperationExecutor::new(memory);
        let out = executor
            .handle_input("what do you remember about grandma?", &HandlerContext::default())
            .await
            .unwrap();
        assert!(out.response.contains("grandma visits on sunday"));
    }

    #[tokio::test]
    async fn recall_with_no_matches_says_so() {
        let executor = MemoryOperationExecutor::new(Arc::new(FakeMemory::new(Vec::new())));
        let out = executor
            .handle_input("recall the gate code", &HandlerContext::default())
            .await
            .unwrap();
        assert!(out.response.contains("don't have anything"));
    }

    #[tokio::test]
    async fn bare_remember_is_invalid() {
        let executor = MemoryOperationExecutor::new(Arc::new(FakeMemory::new(Vec::new())));
        let err = executor
            .handle_input("remember", &HandlerContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::InvalidInput(_)));
    }
}
