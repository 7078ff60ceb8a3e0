// capabilities-rs/src/memory_store.rs
// In-process memory store with token-overlap retrieval. Durable storage
// sits behind the same MemoryService seam and can replace this without
// touching the pipeline.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use pattern_diagnostics::tokenize;
use shared_types::{CapabilityError, MemoryEvent, MemoryService};

const MAX_ENTRIES: usize = 10_000;

#[derive(Debug, Clone)]
struct MemoryEntry {
    content: String,
    tokens: Vec<String>,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct InMemoryMemoryService {
    entries: RwLock<Vec<MemoryEntry>>,
}

impl InMemoryMemoryService {
    pub fn new() -> Self {
        InMemoryMemoryService::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    async fn store(&self, content: String) {
        let tokens = tokenize(&content);
        let mut entries = self.entries.write().await;
        if entries.len() >= MAX_ENTRIES {
            entries.remove(0);
        }
        entries.push(MemoryEntry {
            content,
            tokens,
            created_at: Utc::now(),
        });
    }

    fn score(query_tokens: &[String], entry: &MemoryEntry) -> f64 {
        if query_tokens.is_empty() || entry.tokens.is_empty() {
            return 0.0;
        }
        let hits = query_tokens
            .iter()
            .filter(|q| entry.tokens.contains(q))
            .count();
        hits as f64 / query_tokens.len() as f64
    }
}

#[async_trait]
impl MemoryService for InMemoryMemoryService {
    async fn retrieve(
        &self,
        queries: &[String],
        limit: usize,
    ) -> Result<Vec<String>, CapabilityError> {
        let query_tokens: Vec<String> = queries.iter().flat_map(|q| tokenize(q)).collect();
        let entries = self.entries.read().await;
        let mut scored: Vec<(f64, &MemoryEntry)> = entries
            .iter()
            .map(|e| (Self::score(&query_tokens, e), e))
            .filter(|(score, _)| *score > 0.0)
            .collect();
        // best score first, newest breaks ties
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.1.created_at.cmp(&a.1.created_at))
        });
        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, e)| e.content.clone())
            .collect())
    }

    async fn generate(&self, events: Vec<MemoryEvent>) -> Result<(), CapabilityError> {
        for event in events {
            let content = if event.assistant_text.is_empty() {
                event.user_text
            } else {
                format!(
                    "{} (asked: {})",
                    event.assistant_text, event.user_text
                )
            };
            if !content.trim().is_empty() {
                self.store(content).await;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(user_text: &str) -> MemoryEvent {
        MemoryEvent {
            conversation_id: None,
            speaker: None,
            user_text: user_text.to_string(),
            assistant_text: String::new(),
            intent: "MEMORY".to_string(),
            occurred_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn retrieval_ranks_by_overlap() {
        let store = InMemoryMemoryService::new();
        store
            .generate(vec![
                event("grandma visits on sunday"),
                event("the wifi password is on the fridge"),
                event("grandma likes sunday roast dinners"),
            ])
            .await
            .unwrap();

        let found = store
            .retrieve(&["grandma".to_string(), "sunday".to_string()], 2)
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|m| m.contains("grandma")));
    }

    #[tokio::test]
    async fn no_overlap_returns_empty() {
        let store = InMemoryMemoryService::new();
        store.generate(vec![event("the cat is orange")]).await.unwrap();
        let found = store.retrieve(&["weather".to_string()], 5).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn empty_events_are_not_stored() {
        let store = InMemoryMemoryService::new();
        store.generate(vec![event("   ")]).await.unwrap();
        assert_eq!(store.len().await, 0);
    }
}
