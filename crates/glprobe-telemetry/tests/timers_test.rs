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

use glprobe_core::capabilities::ext;
use glprobe_core::{gl, DrawCallInfo, GraphicsContext, TimerKind};
use glprobe_infra::HeadlessContext;
use glprobe_telemetry::{GpuTimers, InstrumentedContext, TimelineExport, WrapOptions};
use std::collections::BTreeMap;

fn instrumented(inner: HeadlessContext) -> InstrumentedContext<HeadlessContext> {
    let _ = env_logger::builder().is_test(true).try_init();
    let gl = InstrumentedContext::new(inner, false);
    gl.wrap(WrapOptions::all());
    gl
}

#[test]
fn test_pass_with_two_children() {
    // --- 1. ARRANGE ---
    let gl = instrumented(HeadlessContext::desktop_webgl2());
    let timers = GpuTimers::for_context(&gl);
    for ns in [1_000_000, 2_000_000, 5_000_000] {
        gl.inner().push_query_result_ns(ns);
    }

    // --- 2. ACT ---
    timers.begin(&gl, "P", TimerKind::Pass, BTreeMap::new());
    timers.begin(&gl, "C1", TimerKind::Custom, BTreeMap::new());
    timers.end(&gl);
    timers.begin(&gl, "C2", TimerKind::Custom, BTreeMap::new());
    timers.end(&gl);
    timers.end(&gl);
    timers.end(&gl);
    timers.poll(&gl);

    // --- 3. ASSERT ---
    let timeline = timers.frame_timeline();
    assert_eq!(timeline.len(), 1, "Only P is a root");
    let root = &timeline[0];
    assert_eq!(root.label, "P");
    assert_eq!(root.gpu_duration, Some(5.0));
    let children: Vec<_> = root.children.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(children, ["C1", "C2"]);
    assert_eq!(root.children[1].gpu_duration, Some(2.0));

    let mut visited = Vec::new();
    root.walk(&mut |node| visited.push(node.label.clone()));
    assert_eq!(visited, ["P", "C1", "C2"]);
}

#[test]
fn test_sample_counts_after_polling() {
    let gl = instrumented(HeadlessContext::desktop_webgl2().with_query_latency(3));
    let timers = GpuTimers::for_context(&gl);

    timers.begin(&gl, "L", TimerKind::Custom, BTreeMap::new());
    timers.end(&gl);
    let mut polls = 0;
    while timers.stats("L").is_none() && polls < 10 {
        timers.poll(&gl);
        polls += 1;
    }

    assert_eq!(polls, 4);
    assert_eq!(timers.stats("L").map(|s| s.samples), Some(1));
}

#[test]
fn test_stats_accumulate_across_frames() {
    let gl = instrumented(HeadlessContext::desktop_webgl2());
    let timers = GpuTimers::for_context(&gl);

    for ns in [2_000_000, 4_000_000, 6_000_000] {
        gl.inner().push_query_result_ns(ns);
        timers.reset_frame(&gl);
        timers.begin_pass(&gl, "Lighting", BTreeMap::new());
        timers.end_pass(&gl);
        timers.poll(&gl);
    }

    let stats = timers.stats("Lighting").expect("resolved");
    assert_eq!(stats.samples, 3);
    assert_eq!(stats.average, 4.0);
    assert_eq!(stats.last, 6.0);
    assert_eq!(stats.min, 2.0);
    assert_eq!(stats.max, 6.0);
    assert_eq!(stats.p95, 6.0);
}

#[test]
fn test_timed_draw_calls_reach_the_counters() {
    let gl = instrumented(HeadlessContext::desktop_webgl2());
    let timers = GpuTimers::for_context(&gl);

    timers.begin_pass(&gl, "Opaque", BTreeMap::new());
    for _ in 0..3 {
        let info = DrawCallInfo::new(gl::TRIANGLES, 36).with_shader("lit");
        timers.time_draw_call(&gl, &info, || gl.draw_arrays(gl::TRIANGLES, 0, 36));
    }
    timers.end_pass(&gl);
    timers.poll(&gl);

    assert_eq!(gl.counters().counters().draw_calls, 3);
    let timeline = timers.frame_timeline();
    let labels: Vec<_> = timeline[0].children.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(labels, ["Draw_0_TRIANGLES", "Draw_1_TRIANGLES", "Draw_2_TRIANGLES"]);
    assert_eq!(timeline[0].children[2].metadata["shaderName"], "lit");
    assert_eq!(timers.bottlenecks(10).len(), 4);
}

#[test]
fn test_unsupported_timers_still_draw() {
    let gl = instrumented(HeadlessContext::webgl2());
    let timers = GpuTimers::for_context(&gl);

    let info = DrawCallInfo::new(gl::TRIANGLES, 3);
    timers.time_draw_call(&gl, &info, || gl.draw_arrays(gl::TRIANGLES, 0, 3));
    timers.begin(&gl, "Nothing", TimerKind::Custom, BTreeMap::new());
    timers.end(&gl);
    timers.end(&gl);
    timers.poll(&gl);

    assert_eq!(gl.inner().draw_count(), 1);
    assert!(timers.all_stats().is_empty());
    assert_eq!(gl.inner().live_queries(), 0);
}

#[test]
fn test_timer_extension_lost_mid_session() {
    // --- 1. ARRANGE ---
    let gl = instrumented(HeadlessContext::desktop_webgl2());
    let timers = GpuTimers::for_context(&gl);

    // --- 2. ACT ---
    timers.begin(&gl, "Frame", TimerKind::Frame, BTreeMap::new());
    gl.inner().disable_extension(ext::EXT_DISJOINT_TIMER_QUERY_WEBGL2);
    timers.end(&gl);
    let resolved = timers.poll(&gl);

    timers.reset_frame(&gl);
    timers.begin(&gl, "After", TimerKind::Frame, BTreeMap::new());
    timers.end(&gl);
    timers.poll(&gl);

    // --- 3. ASSERT ---
    assert_eq!(resolved, 0);
    assert_eq!(timers.pending_count(), 0);
    assert_eq!(gl.inner().live_queries(), 0);
    assert!(timers.all_stats().is_empty());

    let timeline = timers.frame_timeline();
    assert_eq!(timeline[0].label, "After");
    assert!(timeline[0].cpu_duration.is_some());
    assert!(timeline[0].gpu_duration.is_none());
}

#[test]
fn test_disabled_begin_keeps_outer_section_open() {
    // --- 1. ARRANGE ---
    let gl = instrumented(HeadlessContext::desktop_webgl2());
    let timers = GpuTimers::for_context(&gl);

    // --- 2. ACT ---
    timers.begin(&gl, "Outer", TimerKind::Pass, BTreeMap::new());
    timers.set_enabled(false);
    timers.begin(&gl, "Inner", TimerKind::Custom, BTreeMap::new());
    timers.end(&gl);

    // --- 3. ASSERT ---
    assert_eq!(timers.depth(), 1);
    assert_eq!(timers.pending_count(), 0);
    assert!(timers.end(&gl));
    assert_eq!(timers.depth(), 0);
    assert_eq!(timers.pending_count(), 1);
}

#[test]
fn test_export_round_trips_through_the_document_type() -> anyhow::Result<()> {
    let gl = instrumented(HeadlessContext::desktop_webgl2());
    let timers = GpuTimers::for_context(&gl);
    timers.begin(&gl, "Frame", TimerKind::Frame, BTreeMap::new());
    timers.begin_pass(&gl, "Shadow", BTreeMap::new());
    timers.end_pass(&gl);
    timers.end(&gl);
    timers.poll(&gl);

    let export: TimelineExport = serde_json::from_str(&timers.export_timeline()?)?;
    assert_eq!(export.metadata.frame_count, 2);
    assert!(export.metadata.gpu_timer_support);
    assert_eq!(export.timeline[0].children[0].label, "Shadow");
    assert_eq!(export.stats.len(), 2);
    Ok(())
}
