// orchestrator-service-rs/src/routing.rs
// The intent routing table. EMERGENCY has no dedicated handler; it
// routes to the conversational responder with the urgent flag forced so
// the reply is prioritized, never dropped.

use serde::{Deserialize, Serialize};

use shared_types::IntentCategory;

/// The four dispatchable handler slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerKind {
    Instant,
    Action,
    Memory,
    Conversation,
}

impl HandlerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerKind::Instant => "instant",
            HandlerKind::Action => "action",
            HandlerKind::Memory => "memory",
            HandlerKind::Conversation => "conversation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub handler: HandlerKind,
    /// Forced true for EMERGENCY regardless of the classifier's urgency.
    pub urgent: bool,
}

pub fn route_for(intent: IntentCategory) -> Route {
    match intent {
        IntentCategory::Instant => Route {
            handler: HandlerKind::Instant,
            urgent: false,
        },
        IntentCategory::Action => Route {
            handler: HandlerKind::Action,
            urgent: false,
        },
        IntentCategory::Memory => Route {
            handler: HandlerKind::Memory,
            urgent: false,
        },
        IntentCategory::Emergency => Route {
            handler: HandlerKind::Conversation,
            urgent: true,
        },
        IntentCategory::Conversation | IntentCategory::Query | IntentCategory::Unknown => Route {
            handler: HandlerKind::Conversation,
            urgent: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emergency_routes_to_conversation_with_urgency() {
        let route = route_for(IntentCategory::Emergency);
        assert_eq!(route.handler, HandlerKind::Conversation);
        assert!(route.urgent);
    }

    #[test]
    fn query_and_unknown_share_the_conversation_handler() {
        for intent in [IntentCategory::Query, IntentCategory::Unknown] {
            let route = route_for(intent);
            assert_eq!(route.handler, HandlerKind::Conversation);
            assert!(!route.urgent);
        }
    }

    #[test]
    fn every_intent_has_a_route() {
        for intent in [
            IntentCategory::Instant,
            IntentCategory::Action,
            IntentCategory::Memory,
            IntentCategory::Emergency,
            IntentCategory::Conversation,
            IntentCategory::Query,
            IntentCategory::Unknown,
        ] {
            // must not panic and must name a real slot
            let _ = route_for(intent).handler.as_str();
        }
    }
}
