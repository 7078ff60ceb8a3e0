// orchestrator-service-rs/src/lib.rs
// The request pipeline: classify -> retrieve context -> dispatch ->
// persist. Every stage records its decision in the registry, degrades to
// a safe default on failure, and never fails the request as a whole.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use log::{error, warn};
use tokio::time::timeout;
use tracing::instrument;

use config_rs::StageBudgets;
use decision_registry::{
    DecisionKind, DecisionRegistry, DecisionResult, DecisionScope, LogicDescriptor,
};
use logic_health::LogicHealthMonitor;
use shared_types::{
    CapabilityModule, ClassificationMethod, ClassificationOutcome, ClassificationResult,
    HandlerContext, HandlerOutput, IntentCategory, IntentClassifier, MemoryEvent, MemoryService,
    SideEffectRecord, UrgencyLevel,
};

pub mod context;
pub mod routing;
pub mod stages;

pub use context::{AssistantResponse, RequestContext, StageTiming};
pub use routing::{route_for, HandlerKind, Route};
use stages::{ClassifyStage, ContextStage, DispatchStage};

/// The fixed reply when a handler fails or overruns its budget.
pub const APOLOGY_RESPONSE: &str =
    "I'm sorry, something went wrong while I was handling that. Could you try again?";

const CONTEXT_RETRIEVE_LIMIT: usize = 5;
const INPUT_PREVIEW_CHARS: usize = 120;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("orchestrator is missing its {0}")]
    MissingComponent(&'static str),

    #[error("handler {handler} failed to initialize: {source}")]
    Init {
        handler: String,
        #[source]
        source: shared_types::CapabilityError,
    },
}

fn preview(text: &str) -> String {
    let mut p: String = text.chars().take(INPUT_PREVIEW_CHARS).collect();
    if text.chars().count() > INPUT_PREVIEW_CHARS {
        p.push_str("...");
    }
    p
}

pub struct Orchestrator {
    classifier: Arc<dyn IntentClassifier>,
    handlers: HashMap<HandlerKind, Arc<dyn CapabilityModule>>,
    memory: Arc<dyn MemoryService>,
    registry: Arc<DecisionRegistry>,
    health: Arc<LogicHealthMonitor>,
    budgets: StageBudgets,
}

#[derive(Default)]
pub struct OrchestratorBuilder {
    classifier: Option<Arc<dyn IntentClassifier>>,
    handlers: HashMap<HandlerKind, Arc<dyn CapabilityModule>>,
    memory: Option<Arc<dyn MemoryService>>,
    registry: Option<Arc<DecisionRegistry>>,
    health: Option<Arc<LogicHealthMonitor>>,
    budgets: Option<StageBudgets>,
}

impl OrchestratorBuilder {
    pub fn classifier(mut self, classifier: Arc<dyn IntentClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn handler(mut self, kind: HandlerKind, module: Arc<dyn CapabilityModule>) -> Self {
        self.handlers.insert(kind, module);
        self
    }

    pub fn memory(mut self, memory: Arc<dyn MemoryService>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn registry(mut self, registry: Arc<DecisionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn health(mut self, health: Arc<LogicHealthMonitor>) -> Self {
        self.health = Some(health);
        self
    }

    pub fn budgets(mut self, budgets: StageBudgets) -> Self {
        self.budgets = Some(budgets);
        self
    }

    pub fn build(self) -> Result<Orchestrator, PipelineError> {
        let classifier = self
            .classifier
            .ok_or(PipelineError::MissingComponent("classifier"))?;
        let memory = self
            .memory
            .ok_or(PipelineError::MissingComponent("memory service"))?;
        for kind in [
            HandlerKind::Instant,
            HandlerKind::Action,
            HandlerKind::Memory,
            HandlerKind::Conversation,
        ] {
            if !self.handlers.contains_key(&kind) {
                return Err(PipelineError::MissingComponent(kind.as_str()));
            }
        }
        Ok(Orchestrator {
            classifier,
            handlers: self.handlers,
            memory,
            registry: self
                .registry
                .unwrap_or_else(|| Arc::new(DecisionRegistry::from_env())),
            health: self
                .health
                .unwrap_or_else(|| Arc::new(LogicHealthMonitor::from_env())),
            budgets: self.budgets.unwrap_or_default(),
        })
    }
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    pub fn registry(&self) -> &Arc<DecisionRegistry> {
        &self.registry
    }

    pub fn health(&self) -> &Arc<LogicHealthMonitor> {
        &self.health
    }

    /// Run every handler's init hook. Called once at startup.
    pub async fn init(&self) -> Result<(), PipelineError> {
        for module in self.handlers.values() {
            module.init().await.map_err(|source| PipelineError::Init {
                handler: module.name().to_string(),
                source,
            })?;
        }
        Ok(())
    }

    /// Best-effort shutdown of every handler.
    pub async fn shutdown(&self) {
        for module in self.handlers.values() {
            if let Err(e) = module.shutdown().await {
                warn!("handler {} failed to shut down cleanly: {e}", module.name());
            }
        }
    }

    fn begin_decision(
        &self,
        request: &RequestContext,
        name: &str,
        kind: DecisionKind,
    ) -> DecisionScope {
        self.registry.begin(
            name,
            kind,
            "orchestrator",
            Some(request.trace_id.clone()),
            None,
        )
    }

    /// The whole pipeline for one request. Infallible: every stage
    /// failure degrades rather than propagating.
    #[instrument(
        name = "handle_request",
        skip(self, request),
        fields(trace_id = %request.trace_id)
    )]
    pub async fn handle_request(&self, request: &RequestContext) -> AssistantResponse {
        let classify = self.classify_stage(request).await;
        let retrieval = self.context_stage(request, &classify.outcome).await;
        let route = self.routing_stage(request, &classify.outcome);
        let dispatch = self
            .dispatch_stage(request, &classify.outcome, route, &retrieval.retrieved)
            .await;
        let persistence = self.persistence_stage(request, &classify, &dispatch);

        let mut side_effects = Vec::new();
        if let Some(action) = &dispatch.output.action {
            side_effects.push(SideEffectRecord::new("device_action", action.clone()));
        }

        let mut timings = vec![classify.timing.clone()];
        if let Some(timing) = &retrieval.timing {
            timings.push(timing.clone());
        }
        timings.push(dispatch.timing.clone());
        if let Some(timing) = persistence {
            timings.push(timing);
        }

        AssistantResponse {
            request_id: request.request_id,
            trace_id: request.trace_id.clone(),
            response: dispatch.output.response.clone(),
            intent: classify.outcome.result.intent.as_str().to_string(),
            sub_category: classify.outcome.result.sub_category.clone(),
            confidence: classify.outcome.result.confidence,
            method: classify.outcome.method.as_str().to_string(),
            side_effects,
            timings,
            degraded: classify.degraded || dispatch.degraded,
        }
    }

    async fn classify_stage(&self, request: &RequestContext) -> ClassifyStage {
        let started = Instant::now();
        let mut scope =
            self.begin_decision(request, "intent classification", DecisionKind::Classification);
        scope.input("text", preview(&request.text));

        let classified = timeout(
            self.budgets.classify(),
            self.classifier.classify(&request.text),
        )
        .await;

        let (outcome, degraded, timed_out) = match classified {
            Ok(Ok(outcome)) => {
                scope.set_logic(
                    LogicDescriptor::new(
                        outcome
                            .matched_pattern
                            .clone()
                            .unwrap_or_else(|| "heuristic fallback".to_string()),
                        "classifier",
                    )
                    .with_parameter("method", outcome.method.as_str()),
                );
                let mut result = match outcome.method {
                    ClassificationMethod::Pattern => {
                        DecisionResult::matched(outcome.result.intent.as_str())
                    }
                    _ => DecisionResult::fallback(
                        outcome.result.intent.as_str(),
                        "no pattern matched",
                    ),
                }
                .with_confidence(outcome.result.confidence);
                for near in &outcome.near_misses {
                    result = result.with_alternative(near.clone(), 0.0);
                }
                scope.complete(result);
                (outcome, false, false)
            }
            Ok(Err(e)) => {
                warn!("classification failed, using conversational fallback: {e}");
                scope.complete(DecisionResult::error(e.to_string()));
                (
                    ClassificationOutcome::heuristic(ClassificationResult::fallback()),
                    true,
                    false,
                )
            }
            Err(_) => {
                warn!(
                    "classification exceeded its {}ms budget",
                    self.budgets.classify_ms
                );
                scope.complete(DecisionResult::error(format!(
                    "classification exceeded {}ms budget",
                    self.budgets.classify_ms
                )));
                (
                    ClassificationOutcome::heuristic(ClassificationResult::fallback()),
                    true,
                    true,
                )
            }
        };

        if !degraded {
            match self.health.record_classification(&request.text, &outcome) {
                Ok(hash) => match self.health.check_consistency(&request.text) {
                    Ok(report) if !report.is_consistent => {
                        warn!(
                            "inconsistent classification history for input {hash}: {} variants",
                            report.conflicts.len()
                        );
                    }
                    Ok(_) => {}
                    Err(e) => warn!("consistency check failed: {e}"),
                },
                Err(e) => warn!("failed to record classification health: {e}"),
            }
        }

        ClassifyStage {
            outcome,
            degraded,
            timing: StageTiming {
                stage: "classification".to_string(),
                elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
                timed_out,
            },
        }
    }

    async fn context_stage(
        &self,
        request: &RequestContext,
        outcome: &ClassificationOutcome,
    ) -> ContextStage {
        let queries = &outcome.result.context_queries;
        let mut scope =
            self.begin_decision(request, "context retrieval", DecisionKind::ContextEvaluation);
        scope.input("query_count", queries.len() as i64);

        if queries.is_empty() {
            scope.complete(DecisionResult::skipped("no context queries"));
            return ContextStage::skipped();
        }

        let started = Instant::now();
        let retrieved = timeout(
            self.budgets.retrieval(),
            self.memory.retrieve(queries, CONTEXT_RETRIEVE_LIMIT),
        )
        .await;

        let (retrieved, timed_out) = match retrieved {
            Ok(Ok(memories)) => {
                scope.complete(
                    DecisionResult::selected(memories.len() as i64)
                        .with_explanation("retrieved memory count"),
                );
                (memories, false)
            }
            Ok(Err(e)) => {
                warn!("context retrieval failed, continuing without context: {e}");
                scope.complete(DecisionResult::error(e.to_string()));
                (Vec::new(), false)
            }
            Err(_) => {
                warn!(
                    "context retrieval exceeded its {}ms budget",
                    self.budgets.retrieval_ms
                );
                scope.complete(DecisionResult::error(format!(
                    "retrieval exceeded {}ms budget",
                    self.budgets.retrieval_ms
                )));
                (Vec::new(), true)
            }
        };

        ContextStage {
            retrieved,
            timing: Some(StageTiming {
                stage: "context_retrieval".to_string(),
                elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
                timed_out,
            }),
        }
    }

    fn routing_stage(&self, request: &RequestContext, outcome: &ClassificationOutcome) -> Route {
        let route = route_for(outcome.result.intent);
        let mut scope = self.begin_decision(request, "intent routing", DecisionKind::Routing);
        scope.input("intent", outcome.result.intent.as_str());
        scope.set_logic(LogicDescriptor::new("intent routing table", "orchestrator"));
        let mut result = DecisionResult::selected(route.handler.as_str());
        if route.urgent {
            result = result.with_explanation("urgency forced by emergency intent");
        }
        scope.complete(result);
        route
    }

    fn dispatch_budget(&self, handler: HandlerKind) -> std::time::Duration {
        match handler {
            HandlerKind::Instant => self.budgets.instant(),
            HandlerKind::Action | HandlerKind::Memory => self.budgets.action(),
            HandlerKind::Conversation => self.budgets.conversation(),
        }
    }

    async fn dispatch_stage(
        &self,
        request: &RequestContext,
        outcome: &ClassificationOutcome,
        route: Route,
        retrieved: &[String],
    ) -> DispatchStage {
        let started = Instant::now();
        let mut scope = self.begin_decision(request, "handler dispatch", DecisionKind::Dispatch);
        scope.input("handler", route.handler.as_str());

        // handler slots are validated at build time
        let Some(module) = self.handlers.get(&route.handler) else {
            error!("no handler registered for {}", route.handler.as_str());
            scope.complete(DecisionResult::error("handler slot empty"));
            return DispatchStage {
                output: HandlerOutput::text(APOLOGY_RESPONSE),
                handler: route.handler,
                degraded: true,
                timing: StageTiming {
                    stage: "dispatch".to_string(),
                    elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
                    timed_out: false,
                },
            };
        };

        let handler_context = HandlerContext {
            speaker: request.speaker.clone(),
            room: request.room.clone(),
            conversation_id: request.conversation_id.clone(),
            retrieved_context: retrieved.to_vec(),
            emotional_tone: outcome.result.emotional_tone.clone(),
            urgent: route.urgent
                || outcome.result.urgency == Some(UrgencyLevel::Critical),
            sub_category: outcome.result.sub_category.clone(),
        };

        let budget = self.dispatch_budget(route.handler);
        let handled = timeout(budget, module.handle_input(&request.text, &handler_context)).await;

        let (output, degraded, timed_out) = match handled {
            Ok(Ok(output)) => {
                scope.complete(
                    DecisionResult::selected(module.name())
                        .with_explanation(preview(&output.response)),
                );
                (output, false, false)
            }
            Ok(Err(e)) => {
                warn!("handler {} failed: {e}", module.name());
                scope.complete(DecisionResult::error(e.to_string()));
                (HandlerOutput::text(APOLOGY_RESPONSE), true, false)
            }
            Err(_) => {
                warn!(
                    "handler {} exceeded its {}ms budget",
                    module.name(),
                    budget.as_millis()
                );
                scope.complete(DecisionResult::error(format!(
                    "handler exceeded {}ms budget",
                    budget.as_millis()
                )));
                (HandlerOutput::text(APOLOGY_RESPONSE), true, true)
            }
        };

        DispatchStage {
            output,
            handler: route.handler,
            degraded,
            timing: StageTiming {
                stage: "dispatch".to_string(),
                elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
                timed_out,
            },
        }
    }

    /// Stage 4, fire-and-forget: synthesize memory events from the
    /// finished turn. Only CONVERSATION and QUERY turns feed long-term
    /// context; the memory handler stores its own content, and the rest
    /// carry nothing worth generating. The returned timing covers the
    /// synchronous part (event synthesis and task spawn); skipped turns
    /// report no timing.
    fn persistence_stage(
        &self,
        request: &RequestContext,
        classify: &ClassifyStage,
        dispatch: &DispatchStage,
    ) -> Option<StageTiming> {
        let started = Instant::now();
        let intent = classify.outcome.result.intent;
        let mut scope =
            self.begin_decision(request, "memory persistence", DecisionKind::Persistence);
        scope.input("intent", intent.as_str());

        let persist = matches!(intent, IntentCategory::Conversation | IntentCategory::Query)
            && !dispatch.degraded;

        if !persist {
            let reason = if dispatch.degraded {
                "degraded turn".to_string()
            } else {
                format!("{} turns are not persisted", intent.as_str())
            };
            scope.complete(DecisionResult::skipped(reason));
            return None;
        }

        let event = MemoryEvent {
            conversation_id: request.conversation_id.clone(),
            speaker: request.speaker.clone(),
            user_text: request.text.clone(),
            assistant_text: dispatch.output.response.clone(),
            intent: intent.as_str().to_string(),
            occurred_at: request.received_at,
        };
        let memory = Arc::clone(&self.memory);
        tokio::spawn(async move {
            match memory.generate(vec![event]).await {
                Ok(()) => scope.complete(DecisionResult::selected(1i64)),
                Err(e) => {
                    warn!("memory generation failed: {e}");
                    scope.complete(DecisionResult::error(e.to_string()))
                }
            };
        });

        Some(StageTiming {
            stage: "persistence".to_string(),
            elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
            timed_out: false,
        })
    }
}
