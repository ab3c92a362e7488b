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

//! The debug session: the object an application talks to.
//!
//! A session owns the instrumented context and the GPU timer engine and
//! drives both from the application's frame loop:
//!
//! ```text
//! begin_frame()  -> counters reset, optional "__frame" section opened
//! ... draws through session.gl() ...
//! end_frame()    -> fps folded in, "__frame" closed, timer engine polled
//! snapshot()     -> immutable view of the last frame
//! ```

use crate::config::{DebugMode, SessionConfig};
use crate::error::TelemetryError;
use crate::instrument::InstrumentedContext;
use crate::timers::GpuTimers;
use crate::utils::timer::ScopedGpuTimer;
use glprobe_core::utils::timer::epoch_millis;
use glprobe_core::{
    Capabilities, GpuHandle, GraphicsContext, MetricSnapshot, ResourceKind, ResourceSummary,
    Stopwatch, TimerKind, TimerSummary,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};

/// Label of the reserved whole-frame timer section.
pub const FRAME_TIMER: &str = "__frame";

/// Frame rate assumed by `cpu_ms` before any frame has completed.
const FALLBACK_FPS: f64 = 60.0;

#[derive(Serialize)]
struct SessionExport<'a> {
    device: &'a Capabilities,
    snapshot: MetricSnapshot,
    resources: ResourceSummary,
    timers: BTreeMap<String, TimerSummary>,
}

/// Instruments a graphics context for the lifetime of the session.
pub struct DebugSession<C: GraphicsContext> {
    gl: InstrumentedContext<C>,
    timers: GpuTimers<C::Query>,
    config: SessionConfig,
    rng: StdRng,
    frame_clock: Stopwatch,
    fps_samples: VecDeque<f64>,
    /// Stack depth the `__frame` section was opened at, if this frame is timed.
    frame_timer: Option<usize>,
}

impl<C: GraphicsContext> DebugSession<C> {
    /// Starts a session over `inner`.
    pub fn new(inner: C, config: SessionConfig) -> Self {
        let config = config.validated();
        let gl = InstrumentedContext::new(inner, config.log_creates);
        if let Some(options) = config.wrap_options() {
            gl.wrap(options);
        }
        let timers = GpuTimers::new(gl.capabilities().gpu_timers(), config.timer_window);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        log::info!(
            "Debug session started: mode {:?}, sample rate {}, GPU timers {}",
            config.mode,
            config.sample_rate,
            if timers.is_supported() { "available" } else { "unavailable" }
        );

        Self {
            gl,
            timers,
            fps_samples: VecDeque::with_capacity(config.fps_window),
            config,
            rng,
            frame_clock: Stopwatch::new(),
            frame_timer: None,
        }
    }

    /// Starts a session with the default configuration.
    pub fn with_defaults(inner: C) -> Self {
        Self::new(inner, SessionConfig::default())
    }

    /// The instrumented context. Render through it.
    pub fn gl(&self) -> &InstrumentedContext<C> {
        &self.gl
    }

    /// The GPU timer engine, for pass and draw timing.
    pub fn gpu_timers(&self) -> &GpuTimers<C::Query> {
        &self.timers
    }

    /// The capabilities detected at construction.
    pub fn caps(&self) -> &Capabilities {
        self.gl.capabilities()
    }

    /// The active configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The active mode.
    pub fn mode(&self) -> DebugMode {
        self.config.mode
    }

    /// Switches mode. Call interception is restored to the raw context before
    /// the new mode's options are applied.
    pub fn set_mode(&mut self, mode: DebugMode) {
        self.config.mode = mode;
        self.gl.unwrap();
        if let Some(options) = self.config.wrap_options() {
            self.gl.wrap(options);
        }
        log::info!("Debug session mode set to {mode:?}");
    }

    fn should_time_frame(&mut self) -> bool {
        match self.config.mode {
            DebugMode::Off => false,
            DebugMode::Full => true,
            DebugMode::Sampled => self.rng.gen::<f64>() < self.config.sample_rate,
        }
    }

    /// Starts a frame and returns its id.
    ///
    /// Sections left open by the previous frame are discarded.
    pub fn begin_frame(&mut self) -> u64 {
        let frame_id = self.gl.counters().begin_frame();
        self.timers.reset_frame(&self.gl);
        self.frame_clock.restart();

        self.frame_timer = if self.should_time_frame() {
            self.timers.begin_pinned(&self.gl, FRAME_TIMER, TimerKind::Frame)
        } else {
            None
        };
        frame_id
    }

    /// Ends the frame and returns its CPU duration in milliseconds.
    ///
    /// The timer engine is polled every frame, timed or not, so results of
    /// earlier frames keep resolving.
    pub fn end_frame(&mut self) -> f64 {
        let frame_ms = self.frame_clock.elapsed_ms_f64();
        if frame_ms > 0.0 {
            if self.fps_samples.len() == self.config.fps_window {
                self.fps_samples.pop_front();
            }
            self.fps_samples.push_back(1000.0 / frame_ms);
        }

        if let Some(depth) = self.frame_timer.take() {
            self.timers.end_pinned(&self.gl, depth);
        }
        self.timers.poll(&self.gl);
        frame_ms
    }

    /// Moving average of recent frame rates, 0 before the first frame.
    pub fn fps(&self) -> f64 {
        if self.fps_samples.is_empty() {
            return 0.0;
        }
        self.fps_samples.iter().sum::<f64>() / self.fps_samples.len() as f64
    }

    /// An immutable view of the current counters and timings.
    pub fn snapshot(&self) -> MetricSnapshot {
        let fps = self.fps();
        MetricSnapshot {
            timestamp: epoch_millis(),
            fps,
            cpu_ms: 1000.0 / if fps > 0.0 { fps } else { FALLBACK_FPS },
            gpu_ms: self.timers.stats(FRAME_TIMER).map(|stats| stats.last),
            counters: self.gl.counters().counters(),
        }
    }

    /// Live resources, per-kind counts and the estimated byte total.
    pub fn resources(&self) -> ResourceSummary {
        self.gl.resources().summary()
    }

    /// `{last, avg, p95, max}` per timer label.
    pub fn timers(&self) -> BTreeMap<String, TimerSummary> {
        self.timers.summaries()
    }

    /// Marks a render pass boundary. Nothing is timed.
    pub fn push_pass(&self, name: &str) {
        log::trace!("Pass '{name}'");
        self.gl.counters().push_pass();
    }

    /// Adds `delta` to a custom counter of the current frame.
    pub fn inc_custom(&self, key: &str, delta: f64) {
        self.gl.counters().inc_custom(key, delta);
    }

    /// Zeroes the per-frame counters without starting a new frame.
    pub fn reset_stats(&self) {
        self.gl.counters().reset();
    }

    /// Attaches a label to a tracked resource.
    pub fn label_resource<H: GpuHandle>(&self, kind: ResourceKind, handle: H, label: &str) -> bool {
        self.gl.label(kind, handle, label)
    }

    /// Times the enclosing scope as a custom GPU section.
    pub fn scoped_timer(&self, label: &str) -> ScopedGpuTimer<'_, InstrumentedContext<C>> {
        ScopedGpuTimer::new(&self.timers, &self.gl, label, TimerKind::Custom)
    }

    /// Serializes capabilities, snapshot, resources and timers as pretty JSON.
    pub fn export_session(&self) -> Result<String, TelemetryError> {
        let export = SessionExport {
            device: self.caps(),
            snapshot: self.snapshot(),
            resources: self.resources(),
            timers: self.timers(),
        };
        Ok(serde_json::to_string_pretty(&export)?)
    }

    /// Ends the session and hands back the raw context. Open sections and
    /// pending queries are released.
    pub fn into_inner(self) -> C {
        self.timers.reset(&self.gl);
        self.gl.into_inner()
    }
}
