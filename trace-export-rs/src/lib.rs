//! Decision trace exporter.
//!
//! Receives sealed decision records from the registry, redacts PII from
//! their text payloads, batches them, and ships them to a collector
//! endpoint. Batches that cannot be sent are cached locally as JSONL for
//! later retry. Disabled by default; the assistant works fully offline.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use decision_registry::{DecisionRecord, DecisionValue, RecordSink};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// One exported record with its envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportEvent {
    pub event_id: String,
    pub exported_at: DateTime<Utc>,
    pub record: DecisionRecord,
}

#[derive(Debug, Clone)]
pub struct TraceExportConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub batch_size: usize,
    pub flush_interval_secs: u64,
    pub pii_redaction_enabled: bool,
    pub local_cache_path: PathBuf,
}

impl TraceExportConfig {
    pub fn from_env() -> Self {
        TraceExportConfig {
            enabled: config_rs::env_bool("TRACE_EXPORT_ENABLED", false),
            endpoint: config_rs::env_string(
                "TRACE_EXPORT_ENDPOINT",
                "http://localhost:9464/api/v1/traces",
            ),
            batch_size: config_rs::env_usize("TRACE_EXPORT_BATCH_SIZE", 50),
            flush_interval_secs: config_rs::env_u64("TRACE_EXPORT_FLUSH_INTERVAL_SECS", 30),
            pii_redaction_enabled: config_rs::env_bool("TRACE_EXPORT_PII_REDACTION", true),
            local_cache_path: config_rs::data_path("trace-cache"),
        }
    }
}

/// Scrubs common PII shapes out of free-text payloads before export.
pub struct PiiRedactor {
    email_pattern: Regex,
    phone_pattern: Regex,
    card_pattern: Regex,
}

impl PiiRedactor {
    pub fn new() -> Self {
        // static patterns, compilation cannot fail
        PiiRedactor {
            email_pattern: Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")
                .unwrap(),
            phone_pattern: Regex::new(r"\b\d{3}[-.]?\d{3}[-.]?\d{4}\b").unwrap(),
            card_pattern: Regex::new(r"\b\d{4}[- ]?\d{4}[- ]?\d{4}[- ]?\d{4}\b").unwrap(),
        }
    }

    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();
        result = self
            .email_pattern
            .replace_all(&result, "[EMAIL_REDACTED]")
            .to_string();
        result = self
            .phone_pattern
            .replace_all(&result, "[PHONE_REDACTED]")
            .to_string();
        result = self
            .card_pattern
            .replace_all(&result, "[CARD_REDACTED]")
            .to_string();
        result
    }

    fn redact_value(&self, value: &mut DecisionValue) {
        if let DecisionValue::Text(text) = value {
            *text = self.redact(text);
        }
    }

    /// Redact every free-text field of a record in place.
    pub fn redact_record(&self, record: &mut DecisionRecord) {
        for value in record.inputs.0.values_mut() {
            self.redact_value(value);
        }
        if let Some(logic) = &mut record.logic {
            for value in logic.parameters.0.values_mut() {
                self.redact_value(value);
            }
        }
        self.redact_value(&mut record.result.value);
        if let Some(explanation) = &mut record.result.explanation {
            *explanation = self.redact(explanation);
        }
    }
}

impl Default for PiiRedactor {
    fn default() -> Self {
        PiiRedactor::new()
    }
}

/// Batching exporter. `on_sealed` is called synchronously from the
/// registry's seal path, so it only pushes onto an in-memory queue; the
/// network work happens in [`flush`](Self::flush) and the background
/// task.
pub struct TraceExporter {
    config: TraceExportConfig,
    queue: Mutex<VecDeque<ExportEvent>>,
    redactor: PiiRedactor,
    http_client: reqwest::Client,
}

impl TraceExporter {
    pub fn new(config: TraceExportConfig) -> Result<Self, ExportError> {
        std::fs::create_dir_all(&config.local_cache_path)
            .map_err(|e| ExportError::Io(format!("failed to create cache directory: {e}")))?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| ExportError::Http(e.to_string()))?;

        Ok(TraceExporter {
            config,
            queue: Mutex::new(VecDeque::new()),
            redactor: PiiRedactor::new(),
            http_client,
        })
    }

    pub fn from_env() -> Result<Self, ExportError> {
        TraceExporter::new(TraceExportConfig::from_env())
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn queued(&self) -> usize {
        self.queue.lock().map(|q| q.len()).unwrap_or(0)
    }

    fn max_queue(&self) -> usize {
        self.config.batch_size.max(1) * 10
    }

    fn enqueue(&self, event: ExportEvent) {
        let Ok(mut queue) = self.queue.lock() else {
            warn!("trace export queue lock poisoned; dropping event");
            return;
        };
        if queue.len() >= self.max_queue() {
            // drop the oldest rather than block the seal path
            queue.pop_front();
        }
        queue.push_back(event);
    }

    fn drain_batch(&self) -> Vec<ExportEvent> {
        let Ok(mut queue) = self.queue.lock() else {
            return Vec::new();
        };
        let take = queue.len().min(self.config.batch_size.max(1));
        queue.drain(..take).collect()
    }

    /// Send one queued batch, caching it locally on failure. A cached
    /// batch is not an error; only cache writes can fail here.
    pub async fn flush(&self) -> Result<usize, ExportError> {
        let batch = self.drain_batch();
        if batch.is_empty() {
            return Ok(0);
        }
        match self.send_batch(&batch).await {
            Ok(()) => {
                debug!("exported {} decision records", batch.len());
            }
            Err(e) => {
                warn!("trace export failed: {e}; caching batch locally");
                self.cache_batch(&batch).await?;
            }
        }
        Ok(batch.len())
    }

    async fn send_batch(&self, batch: &[ExportEvent]) -> Result<(), ExportError> {
        let response = self
            .http_client
            .post(&self.config.endpoint)
            .json(batch)
            .send()
            .await
            .map_err(|e| ExportError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ExportError::Http(format!(
                "collector returned status {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn cache_batch(&self, batch: &[ExportEvent]) -> Result<(), ExportError> {
        let cache_file = self
            .config
            .local_cache_path
            .join(format!("traces_{}.jsonl", Uuid::new_v4()));

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&cache_file)
            .await
            .map_err(|e| ExportError::Io(format!("failed to open cache file: {e}")))?;

        for event in batch {
            let line = serde_json::to_string(event)
                .map_err(|e| ExportError::Serialization(e.to_string()))?;
            file.write_all(line.as_bytes())
                .await
                .map_err(|e| ExportError::Io(format!("failed to write cache: {e}")))?;
            file.write_all(b"\n")
                .await
                .map_err(|e| ExportError::Io(format!("failed to write cache: {e}")))?;
        }
        file.flush()
            .await
            .map_err(|e| ExportError::Io(format!("failed to flush cache: {e}")))?;
        debug!("cached {} records at {}", batch.len(), cache_file.display());
        Ok(())
    }

    /// Periodic flush until the process exits.
    pub fn start_background_flush(self: &Arc<Self>) {
        if !self.config.enabled {
            return;
        }
        let exporter = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(exporter.config.flush_interval_secs));
            loop {
                interval.tick().await;
                if let Err(e) = exporter.flush().await {
                    warn!("background trace flush failed: {e}");
                }
            }
        });
    }
}

impl RecordSink for TraceExporter {
    fn on_sealed(&self, record: &DecisionRecord) {
        if !self.config.enabled {
            return;
        }
        let mut record = record.clone();
        if self.config.pii_redaction_enabled {
            self.redactor.redact_record(&mut record);
        }
        self.enqueue(ExportEvent {
            event_id: Uuid::new_v4().to_string(),
            exported_at: Utc::now(),
            record,
        });
    }
}
