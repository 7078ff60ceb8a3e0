// orchestrator-service-rs/src/main.rs
// hearthd: line-oriented front end for the pipeline. Reads one request
// per line from stdin (raw text, or a JSON object with text/speaker/
// room/conversation_id) and writes one JSON response per line to stdout.

use std::error::Error;
use std::sync::Arc;

use log::{info, warn};
use serde::Deserialize;
use tokio::io::{stdin, stdout, AsyncBufReadExt, AsyncWriteExt, BufReader};

use capabilities::{
    ConversationalResponder, DeviceCommandExecutor, InMemoryMemoryService, InstantResponder,
    MemoryOperationExecutor, PatternIntentClassifier,
};
use config_rs::StageBudgets;
use decision_registry::{DecisionRegistry, RecordSink};
use logic_health::LogicHealthMonitor;
use orchestrator_service::{HandlerKind, Orchestrator, RequestContext};
use trace_export::TraceExporter;

#[derive(Debug, Deserialize)]
struct InboundRequest {
    text: String,
    speaker: Option<String>,
    room: Option<String>,
    conversation_id: Option<String>,
}

fn parse_line(line: &str) -> RequestContext {
    if let Ok(inbound) = serde_json::from_str::<InboundRequest>(line) {
        let mut request = RequestContext::new(inbound.text);
        request.speaker = inbound.speaker;
        request.room = inbound.room;
        request.conversation_id = inbound.conversation_id;
        request
    } else {
        RequestContext::new(line)
    }
}

fn build_orchestrator() -> Result<Orchestrator, Box<dyn Error>> {
    let exporter = Arc::new(TraceExporter::from_env()?);
    exporter.start_background_flush();

    let mut registry = DecisionRegistry::from_env();
    if exporter.is_enabled() {
        info!("trace export enabled");
        registry = registry.with_sink(Arc::clone(&exporter) as Arc<dyn RecordSink>);
    }

    let memory = Arc::new(InMemoryMemoryService::new());
    let orchestrator = Orchestrator::builder()
        .classifier(Arc::new(PatternIntentClassifier::with_default_patterns()))
        .handler(HandlerKind::Instant, Arc::new(InstantResponder::new()))
        .handler(HandlerKind::Action, Arc::new(DeviceCommandExecutor::default()))
        .handler(
            HandlerKind::Memory,
            Arc::new(MemoryOperationExecutor::new(memory.clone())),
        )
        .handler(
            HandlerKind::Conversation,
            Arc::new(ConversationalResponder::default()),
        )
        .memory(memory)
        .registry(Arc::new(registry))
        .health(Arc::new(LogicHealthMonitor::from_env()))
        .budgets(StageBudgets::from_env())
        .build()?;
    Ok(orchestrator)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("hearthd starting");

    let orchestrator = build_orchestrator()?;
    orchestrator.init().await?;

    let mut lines = BufReader::new(stdin()).lines();
    let mut out = stdout();

    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let request = parse_line(trimmed);
        let response = orchestrator.handle_request(&request).await;
        match serde_json::to_string(&response) {
            Ok(json) => {
                out.write_all(json.as_bytes()).await?;
                out.write_all(b"\n").await?;
                out.flush().await?;
            }
            Err(e) => warn!("failed to serialize response: {e}"),
        }
    }

    info!("stdin closed, shutting down");
    orchestrator.shutdown().await;
    Ok(())
}
