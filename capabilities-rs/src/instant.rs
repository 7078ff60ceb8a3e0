// capabilities-rs/src/instant.rs
// Zero-latency local answers: time, date, weekday.

use async_trait::async_trait;
use chrono::Local;

use shared_types::{CapabilityError, CapabilityModule, HandlerContext, HandlerOutput};

pub struct InstantResponder;

impl InstantResponder {
    pub fn new() -> Self {
        InstantResponder
    }

    fn answer(&self, sub_category: Option<&str>, text: &str) -> Option<String> {
        let now = Local::now();
        let kind = sub_category.map(str::to_string).or_else(|| {
            let lowered = text.to_lowercase();
            if lowered.contains("time") {
                Some("time".to_string())
            } else if lowered.contains("date") {
                Some("date".to_string())
            } else if lowered.contains("day") {
                Some("weekday".to_string())
            } else {
                None
            }
        })?;

        match kind.as_str() {
            "time" => Some(format!("It's {}.", now.format("%-I:%M %p"))),
            "date" => Some(format!("Today is {}.", now.format("%B %-d, %Y"))),
            "weekday" => Some(format!("It's {}.", now.format("%A"))),
            _ => None,
        }
    }
}

impl Default for InstantResponder {
    fn default() -> Self {
        InstantResponder::new()
    }
}

#[async_trait]
impl CapabilityModule for InstantResponder {
    fn name(&self) -> &str {
        "instant_responder"
    }

    async fn handle_input(
        &self,
        text: &str,
        context: &HandlerContext,
    ) -> Result<HandlerOutput, CapabilityError> {
        match self.answer(context.sub_category.as_deref(), text) {
            Some(response) => Ok(HandlerOutput::text(response)),
            None => Err(CapabilityError::InvalidInput(format!(
                "no instant answer for {text:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn answers_time_via_sub_category() {
        let context = HandlerContext {
            sub_category: Some("time".to_string()),
            ..HandlerContext::default()
        };
        let out = InstantResponder::new()
            .handle_input("what time is it", &context)
            .await
            .unwrap();
        assert!(out.response.starts_with("It's "));
        assert!(out.action.is_none());
    }

    #[tokio::test]
    async fn infers_kind_from_text_without_sub_category() {
        let out = InstantResponder::new()
            .handle_input("what's the date", &HandlerContext::default())
            .await
            .unwrap();
        assert!(out.response.starts_with("Today is "));
    }

    #[tokio::test]
    async fn unanswerable_input_is_invalid() {
        let err = InstantResponder::new()
            .handle_input("what's the weather", &HandlerContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::InvalidInput(_)));
    }
}
