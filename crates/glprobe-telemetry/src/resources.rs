// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Identity-keyed registry of live GPU resources.
//!
//! The tracker never owns a native object. It keys records by
//! `(kind, handle identity)` and relies on every deletion being routed through
//! the instrumented context.

use glprobe_core::{ResourceKind, ResourceRecord, ResourceSummary, Stopwatch};
use serde_json::Value;
use std::backtrace::Backtrace;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Frames of the creation stack kept in record metadata.
const STACK_WINDOW: std::ops::Range<usize> = 3..9;

#[derive(Debug)]
struct TrackerState {
    next_id: u64,
    records: BTreeMap<u64, ResourceRecord>,
    index: HashMap<(ResourceKind, u64), u64>,
    by_kind: BTreeMap<ResourceKind, usize>,
    est_bytes: u64,
}

impl TrackerState {
    fn new() -> Self {
        Self {
            next_id: 1,
            records: BTreeMap::new(),
            index: HashMap::new(),
            by_kind: ResourceKind::ALL.iter().map(|&k| (k, 0)).collect(),
            est_bytes: 0,
        }
    }

    fn remove(&mut self, kind: ResourceKind, identity: u64) -> Option<ResourceRecord> {
        let seq = self.index.remove(&(kind, identity))?;
        let record = self.records.remove(&seq)?;
        if let Some(bytes) = record.estimated_bytes {
            self.est_bytes = self.est_bytes.saturating_sub(bytes);
        }
        if let Some(count) = self.by_kind.get_mut(&kind) {
            *count = count.saturating_sub(1);
        }
        Some(record)
    }

    fn record_mut(&mut self, kind: ResourceKind, identity: u64) -> Option<&mut ResourceRecord> {
        let seq = self.index.get(&(kind, identity))?;
        self.records.get_mut(seq)
    }
}

/// Registry of live resources with per-kind counts and a byte estimate.
#[derive(Debug)]
pub struct ResourceTracker {
    state: Mutex<TrackerState>,
    clock: Stopwatch,
    log_creates: bool,
}

impl ResourceTracker {
    /// Creates an empty tracker. With `log_creates`, each creation is logged
    /// at `info` and its call stack is stored in the record's metadata.
    /// Texture and buffer records always carry their creation stack, for
    /// leak reports.
    pub fn new(log_creates: bool) -> Self {
        Self {
            state: Mutex::new(TrackerState::new()),
            clock: Stopwatch::new(),
            log_creates,
        }
    }

    fn state(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `true` if creations are logged.
    pub fn logs_creates(&self) -> bool {
        self.log_creates
    }

    /// Registers a freshly created resource and returns its id.
    ///
    /// A handle identity that is still registered (its deletion bypassed the
    /// tracker) is replaced, so counts stay consistent with the registry.
    pub fn on_create(
        &self,
        kind: ResourceKind,
        identity: u64,
        mut metadata: BTreeMap<String, Value>,
    ) -> String {
        let keeps_stack = matches!(kind, ResourceKind::Texture | ResourceKind::Buffer);
        let stack = (self.log_creates || keeps_stack).then(capture_stack);
        if let Some(stack) = &stack {
            metadata.insert("stack".to_string(), Value::String(stack.clone()));
        }
        let now = self.clock.elapsed_ms_f64();

        let mut state = self.state();
        if let Some(stale) = state.remove(kind, identity) {
            log::debug!("Handle reused for {kind}, dropping stale record {}", stale.id);
        }

        let seq = state.next_id;
        state.next_id += 1;
        let id = format!("{}_{}", kind.id_prefix(), seq);
        state.records.insert(
            seq,
            ResourceRecord {
                id: id.clone(),
                kind,
                estimated_bytes: None,
                created_at: now,
                last_used: now,
                label: None,
                metadata,
            },
        );
        state.index.insert((kind, identity), seq);
        *state.by_kind.entry(kind).or_insert(0) += 1;
        drop(state);

        if let Some(stack) = stack.filter(|_| self.log_creates) {
            log::info!("[ResourceCreated] {kind} {id}\n{stack}");
        }
        id
    }

    /// Unregisters a resource. Unknown identities are ignored.
    pub fn on_delete(&self, kind: ResourceKind, identity: u64) -> Option<ResourceRecord> {
        let removed = self.state().remove(kind, identity);
        if let Some(record) = &removed {
            log::trace!("Deleted {} {}", kind, record.id);
        }
        removed
    }

    /// Adds `bytes` to the running estimate without attributing them.
    pub fn on_buffer_upload(&self, bytes: u64) {
        let mut state = self.state();
        state.est_bytes = state.est_bytes.saturating_add(bytes);
    }

    /// Adds an upload to the running estimate and, if `target` is a tracked
    /// resource, to that resource's bytes.
    pub fn on_upload(&self, kind: ResourceKind, target: Option<u64>, bytes: u64) {
        let now = self.clock.elapsed_ms_f64();
        let mut state = self.state();
        state.est_bytes = state.est_bytes.saturating_add(bytes);
        let Some(identity) = target else {
            return;
        };
        if let Some(record) = state.record_mut(kind, identity) {
            let total = record.estimated_bytes.unwrap_or(0).saturating_add(bytes);
            record.estimated_bytes = Some(total);
            record.last_used = now;
        }
    }

    /// Marks a resource as used now.
    pub fn touch(&self, kind: ResourceKind, identity: u64) {
        let now = self.clock.elapsed_ms_f64();
        if let Some(record) = self.state().record_mut(kind, identity) {
            record.last_used = now;
        }
    }

    /// Attaches an application label to a tracked resource.
    pub fn set_label(&self, kind: ResourceKind, identity: u64, label: impl Into<String>) -> bool {
        match self.state().record_mut(kind, identity) {
            Some(record) => {
                record.label = Some(label.into());
                true
            }
            None => false,
        }
    }

    /// The record of a tracked resource.
    pub fn record(&self, kind: ResourceKind, identity: u64) -> Option<ResourceRecord> {
        self.state().record_mut(kind, identity).map(|r| r.clone())
    }

    /// Live resources of `kind`.
    pub fn count(&self, kind: ResourceKind) -> usize {
        self.state().by_kind.get(&kind).copied().unwrap_or(0)
    }

    /// The running byte estimate.
    pub fn est_bytes(&self) -> u64 {
        self.state().est_bytes
    }

    /// A copy of the registry.
    pub fn summary(&self) -> ResourceSummary {
        let state = self.state();
        ResourceSummary {
            by_kind: state.by_kind.clone(),
            est_bytes: state.est_bytes,
            list: state.records.values().cloned().collect(),
        }
    }
}

/// Captures the caller's stack, windowed to the frames around the creation
/// site.
fn capture_stack() -> String {
    let rendered = Backtrace::force_capture().to_string();
    let mut frames: Vec<Vec<&str>> = Vec::new();
    for line in rendered.lines() {
        let trimmed = line.trim_start();
        let is_header = trimmed
            .split_once(':')
            .is_some_and(|(n, _)| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()));
        if is_header {
            frames.push(vec![trimmed]);
        } else if let Some(frame) = frames.last_mut() {
            frame.push(trimmed);
        }
    }
    frames
        .get(STACK_WINDOW.start.min(frames.len())..STACK_WINDOW.end.min(frames.len()))
        .unwrap_or_default()
        .iter()
        .map(|frame| frame.join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}
