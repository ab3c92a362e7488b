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

//! RAII guards over GPU timer sections.

use crate::timers::GpuTimers;
use glprobe_core::{GraphicsContext, TimerKind};
use std::collections::BTreeMap;

/// Times the enclosing scope as one GPU timer section.
///
/// The section opens on construction and closes on drop, including on early
/// returns. Sections opened inside the scope and left open are discarded
/// first.
pub struct ScopedGpuTimer<'a, C: GraphicsContext> {
    timers: &'a GpuTimers<C::Query>,
    gl: &'a C,
    depth: Option<usize>,
    active: bool,
}

impl<'a, C: GraphicsContext> ScopedGpuTimer<'a, C> {
    /// Opens a section with the given label and kind.
    pub fn new(timers: &'a GpuTimers<C::Query>, gl: &'a C, label: &str, kind: TimerKind) -> Self {
        let depth = timers.depth();
        let active = timers.begin(gl, label, kind, BTreeMap::new());
        // A disabled engine still takes a stack slot that must be released.
        let opened = timers.depth() > depth;
        Self {
            timers,
            gl,
            depth: opened.then_some(depth),
            active,
        }
    }

    /// Returns `true` if a section is being timed.
    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl<'a, C: GraphicsContext> Drop for ScopedGpuTimer<'a, C> {
    fn drop(&mut self) {
        let Some(depth) = self.depth else {
            return;
        };
        if self.timers.depth() <= depth {
            log::warn!("[ScopedGpuTimer] Section already closed");
            return;
        }
        self.timers.unwind_to(self.gl, depth + 1);
        self.timers.end(self.gl);
    }
}
