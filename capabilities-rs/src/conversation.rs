// capabilities-rs/src/conversation.rs
// Open-ended conversation, behind a model-provider seam.

use std::sync::Arc;

use async_trait::async_trait;

use shared_types::{CapabilityError, CapabilityModule, HandlerContext, HandlerOutput};

/// Seam to the language-model provider.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CapabilityError>;
}

/// Offline default: composes a reply from templates and whatever context
/// was retrieved. Keeps the assistant functional with no model endpoint
/// configured.
pub struct TemplateModelClient;

#[async_trait]
impl ModelClient for TemplateModelClient {
    async fn complete(&self, prompt: &str) -> Result<String, CapabilityError> {
        // the prompt's last line is the user's utterance
        let utterance = prompt.lines().last().unwrap_or_default().trim();
        let reply = if utterance.ends_with('?') {
            format!("I'm not sure about \"{utterance}\" yet, but I can look into it.")
        } else if utterance.is_empty() {
            "I'm here whenever you need me.".to_string()
        } else {
            format!("Got it. Tell me more about {utterance}.")
        };
        Ok(reply)
    }
}

pub struct ConversationalResponder {
    model: Arc<dyn ModelClient>,
}

impl ConversationalResponder {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        ConversationalResponder { model }
    }

    fn build_prompt(text: &str, context: &HandlerContext) -> String {
        let mut prompt = String::new();
        if let Some(tone) = &context.emotional_tone {
            prompt.push_str(&format!("The speaker sounds {tone}.\n"));
        }
        if context.urgent {
            prompt.push_str("Respond with urgency.\n");
        }
        for memory in &context.retrieved_context {
            prompt.push_str(&format!("Known: {memory}\n"));
        }
        prompt.push_str(text);
        prompt
    }
}

impl Default for ConversationalResponder {
    fn default() -> Self {
        ConversationalResponder::new(Arc::new(TemplateModelClient))
    }
}

#[async_trait]
impl CapabilityModule for ConversationalResponder {
    fn name(&self) -> &str {
        "conversational_responder"
    }

    async fn handle_input(
        &self,
        text: &str,
        context: &HandlerContext,
    ) -> Result<HandlerOutput, CapabilityError> {
        let prompt = Self::build_prompt(text, context);
        let response = self.model.complete(&prompt).await?;
        Ok(HandlerOutput::text(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct CapturingModel(Mutex<Vec<String>>);

    #[async_trait]
    impl ModelClient for CapturingModel {
        async fn complete(&self, prompt: &str) -> Result<String, CapabilityError> {
            self.0.lock().unwrap().push(prompt.to_string());
            Ok("a reply".to_string())
        }
    }

    #[tokio::test]
    async fn prompt_carries_tone_urgency_and_context() {
        let model = Arc::new(CapturingModel(Mutex::new(Vec::new())));
        let responder = ConversationalResponder::new(model.clone());
        let context = HandlerContext {
            emotional_tone: Some("distressed".to_string()),
            urgent: true,
            retrieved_context: vec!["the back door sticks".to_string()],
            ..HandlerContext::default()
        };
        responder
            .handle_input("the door won't open", &context)
            .await
            .unwrap();
        let prompts = model.0.lock().unwrap();
        assert!(prompts[0].contains("distressed"));
        assert!(prompts[0].contains("urgency"));
        assert!(prompts[0].contains("the back door sticks"));
        assert!(prompts[0].ends_with("the door won't open"));
    }

    #[tokio::test]
    async fn template_client_always_produces_a_reply() {
        let responder = ConversationalResponder::default();
        for text in ["how was your day?", "it's been a long week", ""] {
            let out = responder
                .handle_input(text, &HandlerContext::default())
                .await
                .unwrap();
            assert!(!out.response.is_empty());
        }
    }
}
