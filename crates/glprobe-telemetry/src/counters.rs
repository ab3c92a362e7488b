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

//! The per-frame counter engine behind call interception.
//!
//! The engine is either *unwrapped*, in which case every hook is a no-op and
//! the decorated context behaves exactly like the raw one, or *wrapped* with a
//! set of [`WrapOptions`]. Wrapping always starts from the unwrapped state, so
//! switching options never stacks two layers of counting.

use glprobe_core::{FrameCounters, PrimitiveCounts};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Which optional entry points are counted while wrapped.
///
/// Draws and buffer uploads are always counted while wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WrapOptions {
    /// Count non-null texture binds.
    pub track_binds: bool,
    /// Count program changes.
    pub track_programs: bool,
    /// Count instanced draws.
    pub track_instancing: bool,
}

impl WrapOptions {
    /// Every optional entry point tracked.
    pub fn all() -> Self {
        Self {
            track_binds: true,
            track_programs: true,
            track_instancing: true,
        }
    }
}

#[derive(Debug, Default)]
struct CounterState {
    counters: FrameCounters,
    wrapped: Option<WrapOptions>,
    last_program: Option<u64>,
}

/// Accumulates [`FrameCounters`] from intercepted calls.
#[derive(Debug, Default)]
pub struct CounterEngine {
    state: Mutex<CounterState>,
}

impl CounterEngine {
    /// Creates an unwrapped engine with zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, CounterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts counting with `options`, restoring the unwrapped state first.
    pub fn wrap(&self, options: WrapOptions) {
        self.unwrap();
        let mut state = self.state();
        state.wrapped = Some(options);
        log::debug!("Call interception enabled with {options:?}");
    }

    /// Stops counting. Counters keep their values.
    pub fn unwrap(&self) {
        let mut state = self.state();
        if state.wrapped.take().is_some() {
            log::debug!("Call interception disabled");
        }
        state.last_program = None;
    }

    /// Returns `true` while calls are counted.
    pub fn is_wrapped(&self) -> bool {
        self.state().wrapped.is_some()
    }

    /// The active options, `None` when unwrapped.
    pub fn options(&self) -> Option<WrapOptions> {
        self.state().wrapped
    }

    /// Forgets the previously used program, so the next `use_program` counts
    /// as a switch.
    pub fn reset_program_tracking(&self) {
        self.state().last_program = None;
    }

    /// Counts a non-instanced draw.
    pub fn on_draw(&self, primitives: PrimitiveCounts) {
        let mut state = self.state();
        if state.wrapped.is_some() {
            state.counters.record_draw(primitives, false);
        }
    }

    /// Counts an instanced draw; `primitives` already include the instance
    /// multiplier. Ignored unless instancing is tracked.
    pub fn on_instanced_draw(&self, primitives: PrimitiveCounts) {
        let mut state = self.state();
        if state.wrapped.is_some_and(|o| o.track_instancing) {
            state.counters.record_draw(primitives, true);
        }
    }

    /// Counts a texture bind. Unbinding (`bound == false`) is never counted.
    pub fn on_texture_bind(&self, bound: bool) {
        let mut state = self.state();
        if bound && state.wrapped.is_some_and(|o| o.track_binds) {
            state.counters.texture_binds += 1;
        }
    }

    /// Counts a program change. Re-using the current program is free.
    pub fn on_use_program(&self, program: Option<u64>) {
        let mut state = self.state();
        if !state.wrapped.is_some_and(|o| o.track_programs) {
            return;
        }
        if state.last_program != program {
            state.counters.shader_switches += 1;
            state.last_program = program;
        }
    }

    /// Counts a full or partial buffer upload.
    pub fn on_buffer_upload(&self) {
        let mut state = self.state();
        if state.wrapped.is_some() {
            state.counters.buffer_uploads += 1;
        }
    }

    /// Advances the frame id and zeroes the per-frame counters.
    pub fn begin_frame(&self) -> u64 {
        let mut state = self.state();
        state.counters.frame_id += 1;
        state.counters.reset();
        state.counters.frame_id
    }

    /// Zeroes the per-frame counters without advancing the frame id.
    pub fn reset(&self) {
        self.state().counters.reset();
    }

    /// Marks a render pass boundary.
    pub fn push_pass(&self) {
        self.state().counters.post_passes += 1;
    }

    /// Adds `delta` to a custom counter of the current frame.
    pub fn inc_custom(&self, key: &str, delta: f64) {
        self.state().counters.inc_custom(key, delta);
    }

    /// A copy of the current counters.
    pub fn counters(&self) -> FrameCounters {
        self.state().counters.clone()
    }
}
