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

//! Hierarchical GPU timing over asynchronous timer queries.
//!
//! Frame-lag model: a section's query is issued between `begin` and `end`,
//! and its result is read by a later [`GpuTimers::poll`], usually one to
//! three frames after submission. `poll` never waits; unresolved queries stay
//! pending.
//!
//! Section lifecycle:
//!   `begin`  -> active (query running, node on the stack and in the timeline)
//!   `end`    -> pending (query ended, awaiting its result)
//!   `poll`   -> resolved (stats updated, node gpu time filled, query deleted)
//!            -> discarded (disjoint event: query deleted, stats untouched)
//!
//! Every operation is a no-op when the context has no timer queries. A
//! `begin` skipped while the engine is disabled still takes a stack slot, so
//! the matching `end` consumes it instead of closing an outer section.

pub mod stats;

pub use stats::RollingStats;

use crate::error::TelemetryError;
use glprobe_core::capabilities::ext;
use glprobe_core::utils::timer::epoch_millis;
use glprobe_core::{
    gl, Bottleneck, Capabilities, DrawCallInfo, GpuHandle, GraphicsContext, Stopwatch, TimerKind,
    TimerQueryNode, TimerStats, TimerSummary,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Default number of samples kept per label for percentiles.
pub const DEFAULT_WINDOW: usize = 120;

#[derive(Debug)]
struct Section<Q> {
    id: String,
    label: String,
    kind: TimerKind,
    start: f64,
    end: Option<f64>,
    cpu: Option<f64>,
    gpu: Option<f64>,
    metadata: BTreeMap<String, Value>,
    children: Vec<usize>,
    query: Option<Q>,
}

#[derive(Debug)]
struct Pending<Q> {
    query: Q,
    label: String,
    epoch: u64,
    section: usize,
}

#[derive(Debug)]
struct TimerState<Q> {
    enabled: bool,
    sections: Vec<Section<Q>>,
    roots: Vec<usize>,
    /// Open sections, `None` for a `begin` skipped while disabled.
    stack: Vec<Option<usize>>,
    /// Stack entries below this depth belong to a pinned section.
    floor: usize,
    pending: Vec<Pending<Q>>,
    stats: HashMap<String, RollingStats>,
    epoch: u64,
    draw_index: u64,
    next_id: u64,
    resolved: u64,
}

impl<Q: GpuHandle> TimerState<Q> {
    fn close_top<C>(&mut self, gl: &C, now: f64) -> bool
    where
        C: GraphicsContext<Query = Q> + ?Sized,
    {
        let Some(Some(index)) = self.stack.pop() else {
            return false;
        };

        let epoch = self.epoch;
        let section = &mut self.sections[index];
        section.end = Some(now);
        section.cpu = Some(now - section.start);
        let label = section.label.clone();
        if let Some(query) = section.query.take() {
            gl.end_query(gl::TIME_ELAPSED_EXT);
            self.pending.push(Pending {
                query,
                label,
                epoch,
                section: index,
            });
        }
        true
    }

    fn discard_above<C>(&mut self, gl: &C, depth: usize, now: f64) -> usize
    where
        C: GraphicsContext<Query = Q> + ?Sized,
    {
        let mut discarded = 0;
        while self.stack.len() > depth {
            let Some(entry) = self.stack.pop() else {
                break;
            };
            let Some(index) = entry else {
                continue;
            };
            let section = &mut self.sections[index];
            section.end = Some(now);
            section.cpu = Some(now - section.start);
            section
                .metadata
                .insert("discarded".to_string(), Value::Bool(true));
            if let Some(query) = section.query.take() {
                gl.end_query(gl::TIME_ELAPSED_EXT);
                gl.delete_query(Some(query));
            }
            log::warn!("Discarding unterminated GPU timer section '{}'", section.label);
            discarded += 1;
        }
        self.floor = self.floor.min(self.stack.len());
        discarded
    }

    fn build_node(&self, index: usize) -> TimerQueryNode {
        let section = &self.sections[index];
        TimerQueryNode {
            id: section.id.clone(),
            label: section.label.clone(),
            kind: section.kind,
            start_time: section.start,
            end_time: section.end,
            cpu_duration: section.cpu,
            gpu_duration: section.gpu,
            metadata: section.metadata.clone(),
            children: section
                .children
                .iter()
                .map(|&child| self.build_node(child))
                .collect(),
        }
    }

    fn collect_resolved(&self, index: usize, out: &mut Vec<Bottleneck>) {
        let section = &self.sections[index];
        if let Some(time) = section.gpu {
            out.push(Bottleneck {
                label: section.label.clone(),
                time,
                kind: section.kind,
            });
        }
        for &child in &section.children {
            self.collect_resolved(child, out);
        }
    }
}

/// Metadata block of a timeline export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    /// Wall-clock milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Number of sections resolved since the last full reset.
    pub frame_count: u64,
    /// Whether GPU timing is active.
    pub gpu_timer_support: bool,
}

/// The document produced by [`GpuTimers::export_timeline`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineExport {
    /// The current frame's section forest.
    pub timeline: Vec<TimerQueryNode>,
    /// Statistics per label.
    pub stats: BTreeMap<String, TimerStats>,
    /// Export metadata.
    pub metadata: ExportMetadata,
}

/// The GPU timer engine.
///
/// `Q` is the query handle type of the context the engine is used with; every
/// operation that touches the GPU takes that context by reference.
#[derive(Debug)]
pub struct GpuTimers<Q: GpuHandle> {
    state: Mutex<TimerState<Q>>,
    supported: bool,
    window: usize,
    clock: Stopwatch,
}

impl<Q: GpuHandle> GpuTimers<Q> {
    /// Creates an engine. With `supported == false` every operation is a
    /// no-op.
    pub fn new(supported: bool, window: usize) -> Self {
        if !supported {
            log::warn!("GPU timer queries not supported, GPU timing disabled");
        }
        Self {
            state: Mutex::new(TimerState {
                enabled: supported,
                sections: Vec::new(),
                roots: Vec::new(),
                stack: Vec::new(),
                floor: 0,
                pending: Vec::new(),
                stats: HashMap::new(),
                epoch: 0,
                draw_index: 0,
                next_id: 0,
                resolved: 0,
            }),
            supported,
            window: window.max(1),
            clock: Stopwatch::new(),
        }
    }

    /// Creates an engine for `gl`, supported if it exposes a timer extension.
    pub fn for_context<C>(gl: &C) -> Self
    where
        C: GraphicsContext<Query = Q> + ?Sized,
    {
        Self::new(Capabilities::detect(gl).gpu_timers(), DEFAULT_WINDOW)
    }

    fn state(&self) -> MutexGuard<'_, TimerState<Q>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `true` if the context offers timer queries.
    pub fn is_supported(&self) -> bool {
        self.supported
    }

    /// Returns `true` if new sections are timed.
    pub fn is_enabled(&self) -> bool {
        self.state().enabled
    }

    /// Turns timing on or off. Stays off on contexts without timer queries.
    pub fn set_enabled(&self, enabled: bool) {
        self.state().enabled = enabled && self.supported;
    }

    /// Number of sections currently open, skipped ones included.
    pub fn depth(&self) -> usize {
        self.state().stack.len()
    }

    /// Number of ended sections awaiting their GPU result.
    pub fn pending_count(&self) -> usize {
        self.state().pending.len()
    }

    /// Number of sections resolved since the last full reset.
    pub fn resolved_count(&self) -> u64 {
        self.state().resolved
    }

    /// Opens a section nested under the currently open one, or as a new root.
    ///
    /// Returns `false` without timing anything when timing is unsupported or
    /// disabled. A disabled engine still reserves a stack slot for the
    /// matching `end`. If the driver cannot allocate a query the section is
    /// still recorded, without GPU time.
    pub fn begin<C>(
        &self,
        gl: &C,
        label: &str,
        kind: TimerKind,
        metadata: BTreeMap<String, Value>,
    ) -> bool
    where
        C: GraphicsContext<Query = Q> + ?Sized,
    {
        if !self.supported {
            return false;
        }
        {
            let mut state = self.state();
            if !state.enabled {
                state.stack.push(None);
                return false;
            }
        }

        let query = gl.create_query();
        if let Some(query) = query {
            gl.begin_query(gl::TIME_ELAPSED_EXT, query);
        }

        let start = self.clock.elapsed_ms_f64();
        let mut state = self.state();
        let id = format!("{label}_{}", state.next_id);
        state.next_id += 1;
        let index = state.sections.len();
        state.sections.push(Section {
            id,
            label: label.to_string(),
            kind,
            start,
            end: None,
            cpu: None,
            gpu: None,
            metadata,
            children: Vec::new(),
            query,
        });
        let parent = state.stack.iter().rev().find_map(|entry| *entry);
        match parent {
            Some(parent) => state.sections[parent].children.push(index),
            None => state.roots.push(index),
        }
        state.stack.push(Some(index));
        true
    }

    /// Closes the innermost open section and returns `true` if it was timed.
    ///
    /// Extra calls are ignored, as are calls that would close a pinned
    /// section.
    pub fn end<C>(&self, gl: &C) -> bool
    where
        C: GraphicsContext<Query = Q> + ?Sized,
    {
        let now = self.clock.elapsed_ms_f64();
        let mut state = self.state();
        if state.stack.len() <= state.floor {
            return false;
        }
        state.close_top(gl, now)
    }

    /// Closes and discards every section open above `depth`. Their queries
    /// are ended and deleted without producing samples. A pinned section is
    /// never discarded.
    pub fn unwind_to<C>(&self, gl: &C, depth: usize) -> usize
    where
        C: GraphicsContext<Query = Q> + ?Sized,
    {
        let now = self.clock.elapsed_ms_f64();
        let mut state = self.state();
        let depth = depth.max(state.floor);
        state.discard_above(gl, depth, now)
    }

    /// Opens a section that `end` and `unwind_to` cannot close, and returns
    /// the depth it was opened at. Only one section is pinned at a time.
    pub(crate) fn begin_pinned<C>(&self, gl: &C, label: &str, kind: TimerKind) -> Option<usize>
    where
        C: GraphicsContext<Query = Q> + ?Sized,
    {
        if !self.supported || !self.is_enabled() {
            return None;
        }
        let depth = self.depth();
        if !self.begin(gl, label, kind, BTreeMap::new()) {
            return None;
        }
        self.state().floor = depth + 1;
        Some(depth)
    }

    /// Closes the section pinned at `depth`, discarding anything still open
    /// above it.
    pub(crate) fn end_pinned<C>(&self, gl: &C, depth: usize) -> bool
    where
        C: GraphicsContext<Query = Q> + ?Sized,
    {
        let now = self.clock.elapsed_ms_f64();
        let mut state = self.state();
        state.floor = 0;
        if state.stack.len() <= depth {
            return false;
        }
        state.discard_above(gl, depth + 1, now);
        state.close_top(gl, now)
    }

    /// Resolves every pending query whose result is ready.
    ///
    /// A disjoint event discards all pending queries instead: they are deleted
    /// and no statistics change. Returns the number of sections resolved.
    pub fn poll<C>(&self, gl: &C) -> usize
    where
        C: GraphicsContext<Query = Q> + ?Sized,
    {
        if !self.supported {
            return 0;
        }
        let mut state = self.state();

        if !state.pending.is_empty() && !timer_extension_present(gl) {
            let lost = std::mem::take(&mut state.pending);
            log::warn!(
                "GPU timer extension lost, dropping {} pending timer queries",
                lost.len()
            );
            for pending in lost {
                gl.delete_query(Some(pending.query));
            }
            return 0;
        }

        if gl.gpu_disjoint() {
            let discarded = std::mem::take(&mut state.pending);
            if !discarded.is_empty() {
                log::debug!(
                    "GPU disjoint event, discarding {} pending timer queries",
                    discarded.len()
                );
            }
            for pending in discarded {
                gl.delete_query(Some(pending.query));
            }
            return 0;
        }

        let mut resolved = 0;
        let pending = std::mem::take(&mut state.pending);
        for entry in pending {
            if !gl.query_result_available(entry.query) {
                state.pending.push(entry);
                continue;
            }
            let ms = gl.query_result(entry.query) as f64 / 1_000_000.0;
            gl.delete_query(Some(entry.query));

            let window = self.window;
            state
                .stats
                .entry(entry.label)
                .or_insert_with(|| RollingStats::new(window))
                .push(ms);
            if entry.epoch == state.epoch {
                if let Some(section) = state.sections.get_mut(entry.section) {
                    section.gpu = Some(ms);
                }
            }
            state.resolved += 1;
            resolved += 1;
        }
        resolved
    }

    /// Times `draw` as a `Draw_<index>_<mode>` section and returns its result.
    ///
    /// `draw` runs even when timing is unsupported or disabled.
    pub fn time_draw_call<C, R>(&self, gl: &C, info: &DrawCallInfo, draw: impl FnOnce() -> R) -> R
    where
        C: GraphicsContext<Query = Q> + ?Sized,
    {
        if !self.supported || !self.is_enabled() {
            return draw();
        }

        let index = {
            let mut state = self.state();
            let index = state.draw_index;
            state.draw_index += 1;
            index
        };
        let label = format!("Draw_{}_{}", index, info.primitive_mode);
        let mut metadata = match serde_json::to_value(info) {
            Ok(Value::Object(map)) => map.into_iter().collect(),
            _ => BTreeMap::new(),
        };
        metadata.insert("drawCallIndex".to_string(), Value::from(index));

        let started = self.begin(gl, &label, TimerKind::Draw, metadata);
        let result = draw();
        if started {
            self.end(gl);
        }
        result
    }

    /// Opens a render pass section.
    pub fn begin_pass<C>(&self, gl: &C, name: &str, metadata: BTreeMap<String, Value>) -> bool
    where
        C: GraphicsContext<Query = Q> + ?Sized,
    {
        self.begin(gl, name, TimerKind::Pass, metadata)
    }

    /// Closes the innermost section, normally the pass opened last.
    pub fn end_pass<C>(&self, gl: &C) -> bool
    where
        C: GraphicsContext<Query = Q> + ?Sized,
    {
        self.end(gl)
    }

    /// Starts a new frame timeline: discards open sections, clears the
    /// timeline and the draw-call index. Statistics and pending queries are
    /// kept.
    pub fn reset_frame<C>(&self, gl: &C)
    where
        C: GraphicsContext<Query = Q> + ?Sized,
    {
        let now = self.clock.elapsed_ms_f64();
        let mut state = self.state();
        state.floor = 0;
        state.discard_above(gl, 0, now);
        state.sections.clear();
        state.roots.clear();
        state.epoch += 1;
        state.draw_index = 0;
    }

    /// Clears everything, statistics and pending queries included.
    pub fn reset<C>(&self, gl: &C)
    where
        C: GraphicsContext<Query = Q> + ?Sized,
    {
        self.reset_frame(gl);
        let mut state = self.state();
        for pending in std::mem::take(&mut state.pending) {
            gl.delete_query(Some(pending.query));
        }
        state.stats.clear();
        state.resolved = 0;
    }

    /// The current frame's section forest.
    pub fn frame_timeline(&self) -> Vec<TimerQueryNode> {
        let state = self.state();
        state.roots.iter().map(|&root| state.build_node(root)).collect()
    }

    /// Statistics of one label, if it has resolved at least once.
    pub fn stats(&self, label: &str) -> Option<TimerStats> {
        self.state().stats.get(label).map(RollingStats::snapshot)
    }

    /// Statistics of every label.
    pub fn all_stats(&self) -> BTreeMap<String, TimerStats> {
        self.state()
            .stats
            .iter()
            .map(|(label, stats)| (label.clone(), stats.snapshot()))
            .collect()
    }

    /// The compact `{last, avg, p95, max}` view of every label.
    pub fn summaries(&self) -> BTreeMap<String, TimerSummary> {
        self.all_stats()
            .into_iter()
            .map(|(label, stats)| (label, stats.into()))
            .collect()
    }

    /// The `top_n` most expensive resolved sections of the current frame,
    /// most expensive first.
    pub fn bottlenecks(&self, top_n: usize) -> Vec<Bottleneck> {
        let state = self.state();
        let mut all = Vec::new();
        for &root in &state.roots {
            state.collect_resolved(root, &mut all);
        }
        all.sort_by(|a, b| b.time.total_cmp(&a.time));
        all.truncate(top_n);
        all
    }

    /// The export document: timeline, statistics and metadata.
    pub fn timeline_export(&self) -> TimelineExport {
        TimelineExport {
            timeline: self.frame_timeline(),
            stats: self.all_stats(),
            metadata: ExportMetadata {
                timestamp: epoch_millis(),
                frame_count: self.resolved_count(),
                gpu_timer_support: self.is_enabled(),
            },
        }
    }

    /// [`timeline_export`](Self::timeline_export) as pretty JSON.
    pub fn export_timeline(&self) -> Result<String, TelemetryError> {
        Ok(serde_json::to_string_pretty(&self.timeline_export())?)
    }
}

fn timer_extension_present<C: GraphicsContext + ?Sized>(gl: &C) -> bool {
    gl.supports_extension(ext::EXT_DISJOINT_TIMER_QUERY_WEBGL2)
        || gl.supports_extension(ext::EXT_DISJOINT_TIMER_QUERY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glprobe_core::gl;
    use glprobe_infra::headless::handles::Query;
    use glprobe_infra::HeadlessContext;

    fn timers(gl: &HeadlessContext) -> GpuTimers<Query> {
        GpuTimers::for_context(gl)
    }

    #[test]
    fn test_unsupported_context_is_inert() {
        let gl = HeadlessContext::webgl2();
        let timers = timers(&gl);
        assert!(!timers.is_supported());
        assert!(!timers.begin(&gl, "Frame", TimerKind::Frame, BTreeMap::new()));
        assert!(!timers.end(&gl));
        assert_eq!(timers.poll(&gl), 0);
        assert!(timers.frame_timeline().is_empty());
        assert_eq!(gl.live_queries(), 0);
    }

    #[test]
    fn test_nested_sections_build_a_tree() {
        let gl = HeadlessContext::desktop_webgl2();
        let timers = timers(&gl);
        timers.begin_pass(&gl, "P", BTreeMap::new());
        timers.begin(&gl, "C1", TimerKind::Custom, BTreeMap::new());
        timers.end(&gl);
        timers.begin(&gl, "C2", TimerKind::Custom, BTreeMap::new());
        timers.end(&gl);
        timers.end_pass(&gl);

        let timeline = timers.frame_timeline();
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline[0].label, "P");
        assert_eq!(timeline[0].kind, TimerKind::Pass);
        let children: Vec<_> = timeline[0].children.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(children, ["C1", "C2"]);
        assert_eq!(timers.pending_count(), 3);
    }

    #[test]
    fn test_poll_resolves_in_milliseconds() {
        let gl = HeadlessContext::desktop_webgl2();
        let timers = timers(&gl);
        gl.push_query_result_ns(2_500_000);
        timers.begin(&gl, "Shadow", TimerKind::Pass, BTreeMap::new());
        timers.end(&gl);

        assert_eq!(timers.poll(&gl), 1);
        let stats = timers.stats("Shadow").expect("resolved");
        assert_eq!(stats.last, 2.5);
        assert_eq!(stats.samples, 1);
        assert_eq!(timers.frame_timeline()[0].gpu_duration, Some(2.5));
        assert_eq!(timers.pending_count(), 0);
        assert_eq!(gl.live_queries(), 0);
    }

    #[test]
    fn test_unavailable_results_stay_pending() {
        let gl = HeadlessContext::desktop_webgl2().with_query_latency(2);
        let timers = timers(&gl);
        timers.begin(&gl, "Frame", TimerKind::Frame, BTreeMap::new());
        timers.end(&gl);

        assert_eq!(timers.poll(&gl), 0);
        assert_eq!(timers.poll(&gl), 0);
        assert_eq!(timers.pending_count(), 1);
        assert_eq!(timers.poll(&gl), 1);
        assert_eq!(timers.resolved_count(), 1);
    }

    #[test]
    fn test_disjoint_discards_pending() {
        let gl = HeadlessContext::desktop_webgl2();
        let timers = timers(&gl);
        timers.begin(&gl, "Frame", TimerKind::Frame, BTreeMap::new());
        timers.end(&gl);
        gl.raise_disjoint();

        assert_eq!(timers.poll(&gl), 0);
        assert_eq!(timers.pending_count(), 0);
        assert!(timers.stats("Frame").is_none());
        assert_eq!(gl.live_queries(), 0);
    }

    #[test]
    fn test_extra_end_is_ignored() {
        let gl = HeadlessContext::desktop_webgl2();
        let timers = timers(&gl);
        assert!(!timers.end(&gl));
        timers.begin(&gl, "A", TimerKind::Custom, BTreeMap::new());
        assert!(timers.end(&gl));
        assert!(!timers.end(&gl));
        assert_eq!(timers.depth(), 0);
    }

    #[test]
    fn test_disabled_engine_skips_sections() {
        let gl = HeadlessContext::desktop_webgl2();
        let timers = timers(&gl);
        timers.set_enabled(false);
        assert!(!timers.begin(&gl, "A", TimerKind::Custom, BTreeMap::new()));
        timers.set_enabled(true);
        assert!(timers.begin(&gl, "A", TimerKind::Custom, BTreeMap::new()));
    }

    #[test]
    fn test_skipped_begin_is_consumed_by_its_end() {
        let gl = HeadlessContext::desktop_webgl2();
        let timers = timers(&gl);
        timers.begin(&gl, "Outer", TimerKind::Pass, BTreeMap::new());
        timers.set_enabled(false);
        assert!(!timers.begin(&gl, "Inner", TimerKind::Custom, BTreeMap::new()));
        assert_eq!(timers.depth(), 2);

        assert!(!timers.end(&gl));
        assert_eq!(timers.depth(), 1);

        timers.set_enabled(true);
        assert!(timers.begin(&gl, "Child", TimerKind::Custom, BTreeMap::new()));
        timers.end(&gl);
        assert!(timers.end(&gl));

        let timeline = timers.frame_timeline();
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline[0].label, "Outer");
        assert_eq!(timeline[0].children[0].label, "Child");
    }

    #[test]
    fn test_pinned_section_survives_user_ends() {
        let gl = HeadlessContext::desktop_webgl2();
        let timers = timers(&gl);
        let depth = timers.begin_pinned(&gl, "Pinned", TimerKind::Frame);
        assert_eq!(depth, Some(0));

        timers.begin(&gl, "A", TimerKind::Custom, BTreeMap::new());
        assert!(timers.end(&gl));
        assert!(!timers.end(&gl));
        assert_eq!(timers.unwind_to(&gl, 0), 0);
        assert_eq!(timers.depth(), 1);

        timers.begin(&gl, "Open", TimerKind::Custom, BTreeMap::new());
        assert!(timers.end_pinned(&gl, 0));
        assert_eq!(timers.depth(), 0);
        assert_eq!(timers.frame_timeline().len(), 1);

        timers.begin(&gl, "After", TimerKind::Custom, BTreeMap::new());
        assert!(timers.end(&gl));
    }

    #[test]
    fn test_lost_extension_drops_pending_queries() {
        let gl = HeadlessContext::desktop_webgl2();
        let timers = timers(&gl);
        timers.begin(&gl, "Frame", TimerKind::Frame, BTreeMap::new());
        timers.end(&gl);
        gl.disable_extension(ext::EXT_DISJOINT_TIMER_QUERY_WEBGL2);

        assert_eq!(timers.poll(&gl), 0);
        assert_eq!(timers.pending_count(), 0);
        assert_eq!(gl.live_queries(), 0);
        assert!(timers.stats("Frame").is_none());
    }

    #[test]
    fn test_draw_call_labels_and_metadata() {
        let gl = HeadlessContext::desktop_webgl2();
        let timers = timers(&gl);
        let info = DrawCallInfo::new(gl::TRIANGLES, 36);
        let first = timers.time_draw_call(&gl, &info, || 7);
        timers.time_draw_call(&gl, &info, || ());
        assert_eq!(first, 7);

        let timeline = timers.frame_timeline();
        assert_eq!(timeline[0].label, "Draw_0_TRIANGLES");
        assert_eq!(timeline[1].label, "Draw_1_TRIANGLES");
        assert_eq!(timeline[1].metadata["drawCallIndex"], Value::from(1));
        assert_eq!(timeline[0].kind, TimerKind::Draw);
    }

    #[test]
    fn test_draw_call_runs_without_timers() {
        let gl = HeadlessContext::webgl2();
        let timers = timers(&gl);
        let mut ran = false;
        timers.time_draw_call(&gl, &DrawCallInfo::new(gl::POINTS, 1), || ran = true);
        assert!(ran);
    }

    #[test]
    fn test_reset_frame_discards_open_sections_but_keeps_stats() {
        let gl = HeadlessContext::desktop_webgl2();
        let timers = timers(&gl);
        timers.begin(&gl, "Done", TimerKind::Custom, BTreeMap::new());
        timers.end(&gl);
        timers.poll(&gl);
        timers.begin(&gl, "Open", TimerKind::Custom, BTreeMap::new());

        timers.reset_frame(&gl);
        assert_eq!(timers.depth(), 0);
        assert!(timers.frame_timeline().is_empty());
        assert!(timers.stats("Done").is_some());
        assert_eq!(gl.live_queries(), 0);
    }

    #[test]
    fn test_late_results_do_not_touch_the_new_frame() {
        let gl = HeadlessContext::desktop_webgl2().with_query_latency(1);
        let timers = timers(&gl);
        timers.begin(&gl, "Old", TimerKind::Custom, BTreeMap::new());
        timers.end(&gl);
        timers.reset_frame(&gl);
        timers.begin(&gl, "New", TimerKind::Custom, BTreeMap::new());
        timers.end(&gl);

        timers.poll(&gl);
        timers.poll(&gl);
        assert!(timers.stats("Old").is_some());
        let timeline = timers.frame_timeline();
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline[0].label, "New");
        assert!(timeline[0].gpu_duration.is_some());
    }

    #[test]
    fn test_reset_clears_stats_and_pending() {
        let gl = HeadlessContext::desktop_webgl2().with_query_latency(5);
        let timers = timers(&gl);
        timers.begin(&gl, "A", TimerKind::Custom, BTreeMap::new());
        timers.end(&gl);
        timers.reset(&gl);
        assert_eq!(timers.pending_count(), 0);
        assert!(timers.all_stats().is_empty());
        assert_eq!(gl.live_queries(), 0);
    }

    #[test]
    fn test_bottlenecks_are_sorted() {
        let gl = HeadlessContext::desktop_webgl2();
        let timers = timers(&gl);
        for ns in [1_000_000, 3_000_000, 2_000_000] {
            gl.push_query_result_ns(ns);
        }
        timers.begin(&gl, "Root", TimerKind::Frame, BTreeMap::new());
        timers.begin(&gl, "A", TimerKind::Pass, BTreeMap::new());
        timers.end(&gl);
        timers.begin(&gl, "B", TimerKind::Pass, BTreeMap::new());
        timers.end(&gl);
        timers.end(&gl);
        timers.poll(&gl);

        let top = timers.bottlenecks(2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].label, "B");
        assert_eq!(top[0].time, 3.0);
        assert_eq!(top[1].label, "Root");
    }

    #[test]
    fn test_export_shape() {
        let gl = HeadlessContext::desktop_webgl2();
        let timers = timers(&gl);
        timers.begin(&gl, "Frame", TimerKind::Frame, BTreeMap::new());
        timers.end(&gl);
        timers.poll(&gl);

        let json = timers.export_timeline().expect("export");
        let value: Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(value["metadata"]["frameCount"], 1);
        assert_eq!(value["metadata"]["gpuTimerSupport"], true);
        assert_eq!(value["timeline"][0]["label"], "Frame");
        assert!(value["stats"]["Frame"].is_object());
    }
}
