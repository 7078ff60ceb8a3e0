// decision-registry-rs/src/lib.rs
// Bounded, trace-indexed decision recorder. Every decision point in the
// pipeline opens a scope here; sealing the scope appends an immutable
// record and notifies the optional sink.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use log::{debug, warn};
use thiserror::Error;
use uuid::Uuid;

mod record;

pub use record::{
    DecisionKind, DecisionOutcome, DecisionRecord, DecisionResult, DecisionValue,
    LogicDescriptor, RankedAlternative, Snapshot, MAX_ALTERNATIVES,
};

pub const DEFAULT_CAPACITY: usize = 10_000;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown decision id {0}")]
    UnknownDecision(Uuid),
    #[error("registry lock poisoned")]
    Poisoned,
}

/// Receives sealed records as they are committed. Used by the trace
/// exporter; sealing never fails because of a sink.
pub trait RecordSink: Send + Sync {
    fn on_sealed(&self, record: &DecisionRecord);
}

/// Aggregate counters computed on demand from the retained window.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct RegistryStats {
    pub retained: usize,
    pub capacity: usize,
    pub total_sealed: u64,
    pub total_evicted: u64,
    pub by_kind: HashMap<String, u64>,
    pub by_outcome: HashMap<String, u64>,
    pub avg_duration_ms: f64,
}

#[derive(Default)]
struct Store {
    records: HashMap<Uuid, DecisionRecord>,
    /// Insertion order, oldest at the front.
    order: VecDeque<Uuid>,
    trace_index: HashMap<String, Vec<Uuid>>,
    /// Scopes begun but not yet sealed. Used to validate parent links.
    open: HashSet<Uuid>,
    total_sealed: u64,
    total_evicted: u64,
}

/// Bounded store of sealed decision records, indexed by trace id.
///
/// Shared via `Arc`; the interior mutex guards only short map updates.
pub struct DecisionRegistry {
    capacity: usize,
    store: Mutex<Store>,
    sink: Option<Arc<dyn RecordSink>>,
}

impl DecisionRegistry {
    pub fn new(capacity: usize) -> Self {
        DecisionRegistry {
            capacity: capacity.max(1),
            store: Mutex::new(Store::default()),
            sink: None,
        }
    }

    /// Capacity from `DECISION_REGISTRY_CAPACITY`, default 10,000.
    pub fn from_env() -> Self {
        DecisionRegistry::new(config_rs::env_usize(
            "DECISION_REGISTRY_CAPACITY",
            DEFAULT_CAPACITY,
        ))
    }

    pub fn with_sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Open a decision scope. The scope seals itself with an ERROR
    /// outcome if dropped before [`DecisionScope::complete`].
    pub fn begin(
        self: &Arc<Self>,
        name: impl Into<String>,
        kind: DecisionKind,
        component: impl Into<String>,
        trace_id: Option<String>,
        parent_id: Option<Uuid>,
    ) -> DecisionScope {
        let id = Uuid::new_v4();
        let parent_id = match parent_id {
            Some(parent) => {
                let open = self
                    .store
                    .lock()
                    .map(|s| s.open.contains(&parent))
                    .unwrap_or(false);
                if open {
                    Some(parent)
                } else {
                    warn!("decision parent {parent} is not an open scope; clearing link");
                    None
                }
            }
            None => None,
        };
        if let Ok(mut store) = self.store.lock() {
            store.open.insert(id);
        }
        DecisionScope {
            registry: Arc::clone(self),
            id,
            trace_id,
            parent_id,
            name: name.into(),
            kind,
            component: component.into(),
            started_at: Utc::now(),
            inputs: Snapshot::new(),
            logic: None,
            sealed: false,
        }
    }

    fn seal(&self, record: DecisionRecord) {
        let sealed = {
            let mut store = match self.store.lock() {
                Ok(s) => s,
                Err(_) => {
                    warn!("decision registry lock poisoned; dropping record {}", record.id);
                    return;
                }
            };
            store.open.remove(&record.id);
            if store.order.len() >= self.capacity {
                let batch = (self.capacity / 10).max(1);
                Self::evict_oldest(&mut store, batch);
            }
            if let Some(trace) = &record.trace_id {
                store
                    .trace_index
                    .entry(trace.clone())
                    .or_default()
                    .push(record.id);
            }
            store.order.push_back(record.id);
            store.records.insert(record.id, record.clone());
            store.total_sealed += 1;
            record
        };
        debug!(
            "decision sealed: {} {} -> {} ({:.1}ms)",
            sealed.kind, sealed.name, sealed.result.outcome, sealed.duration_ms
        );
        if let Some(sink) = &self.sink {
            sink.on_sealed(&sealed);
        }
    }

    fn evict_oldest(store: &mut Store, batch: usize) {
        for _ in 0..batch {
            let Some(oldest) = store.order.pop_front() else {
                break;
            };
            if let Some(evicted) = store.records.remove(&oldest) {
                if let Some(trace) = &evicted.trace_id {
                    if let Some(ids) = store.trace_index.get_mut(trace) {
                        ids.retain(|id| *id != oldest);
                        if ids.is_empty() {
                            store.trace_index.remove(trace);
                        }
                    }
                }
            }
            store.total_evicted += 1;
        }
    }

    pub fn get(&self, id: Uuid) -> Result<DecisionRecord, RegistryError> {
        let store = self.store.lock().map_err(|_| RegistryError::Poisoned)?;
        store
            .records
            .get(&id)
            .cloned()
            .ok_or(RegistryError::UnknownDecision(id))
    }

    /// Every retained record for a trace, in the order it was sealed.
    pub fn for_trace(&self, trace_id: &str) -> Vec<DecisionRecord> {
        let Ok(store) = self.store.lock() else {
            return Vec::new();
        };
        store
            .trace_index
            .get(trace_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| store.records.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The `n` most recently sealed records, newest first.
    pub fn recent(&self, n: usize) -> Vec<DecisionRecord> {
        let Ok(store) = self.store.lock() else {
            return Vec::new();
        };
        store
            .order
            .iter()
            .rev()
            .take(n)
            .filter_map(|id| store.records.get(id).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.store.lock().map(|s| s.order.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> RegistryStats {
        let Ok(store) = self.store.lock() else {
            return RegistryStats::default();
        };
        let mut stats = RegistryStats {
            retained: store.order.len(),
            capacity: self.capacity,
            total_sealed: store.total_sealed,
            total_evicted: store.total_evicted,
            ..RegistryStats::default()
        };
        let mut duration_sum = 0.0;
        for record in store.records.values() {
            *stats.by_kind.entry(record.kind.as_str().to_string()).or_insert(0) += 1;
            *stats
                .by_outcome
                .entry(record.result.outcome.as_str().to_string())
                .or_insert(0) += 1;
            duration_sum += record.duration_ms;
        }
        if stats.retained > 0 {
            stats.avg_duration_ms = duration_sum / stats.retained as f64;
        }
        stats
    }
}

/// An open decision point. Collect inputs and logic as the decision is
/// made, then seal with [`complete`](Self::complete). Dropping an
/// unsealed scope commits an ERROR record so no decision goes missing.
pub struct DecisionScope {
    registry: Arc<DecisionRegistry>,
    id: Uuid,
    trace_id: Option<String>,
    parent_id: Option<Uuid>,
    name: String,
    kind: DecisionKind,
    component: String,
    started_at: chrono::DateTime<Utc>,
    inputs: Snapshot,
    logic: Option<LogicDescriptor>,
    sealed: bool,
}

impl DecisionScope {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn input(&mut self, key: impl Into<String>, value: impl Into<DecisionValue>) {
        self.inputs.insert(key, value);
    }

    pub fn set_inputs(&mut self, inputs: Snapshot) {
        self.inputs = inputs;
    }

    pub fn set_logic(&mut self, logic: LogicDescriptor) {
        self.logic = Some(logic);
    }

    /// Seal the scope with its final result.
    pub fn complete(mut self, result: DecisionResult) -> Uuid {
        self.seal_with(result);
        self.id
    }

    fn seal_with(&mut self, result: DecisionResult) {
        if self.sealed {
            return;
        }
        self.sealed = true;
        let ended_at = Utc::now();
        let duration_ms = (ended_at - self.started_at)
            .num_microseconds()
            .unwrap_or(0) as f64
            / 1_000.0;
        let record = DecisionRecord {
            id: self.id,
            trace_id: self.trace_id.take(),
            parent_id: self.parent_id,
            name: std::mem::take(&mut self.name),
            kind: self.kind,
            component: std::mem::take(&mut self.component),
            started_at: self.started_at,
            ended_at,
            duration_ms,
            inputs: std::mem::take(&mut self.inputs),
            logic: self.logic.take(),
            result,
        };
        self.registry.seal(record);
    }
}

impl Drop for DecisionScope {
    fn drop(&mut self) {
        if !self.sealed {
            self.seal_with(DecisionResult::error(
                "decision scope dropped before completion",
            ));
        }
    }
}
