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

//! Per-frame rendering counters and the snapshots built from them.

use crate::primitives::PrimitiveCounts;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counters accumulated by the call interceptor during one frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameCounters {
    /// A sequential counter for observed frames. Survives [`reset`](Self::reset).
    pub frame_id: u64,
    /// Draw calls of every flavour.
    pub draw_calls: u64,
    /// The instanced subset of `draw_calls`.
    pub instanced_draw_calls: u64,
    /// Triangles submitted.
    pub triangles: u64,
    /// Points submitted.
    pub points: u64,
    /// Line segments submitted.
    pub lines: u64,
    /// Non-null texture binds.
    pub texture_binds: u64,
    /// Program changes.
    pub shader_switches: u64,
    /// Full and partial buffer uploads.
    pub buffer_uploads: u64,
    /// Render passes marked by the application.
    pub post_passes: u64,
    /// Application defined counters, cleared every frame.
    pub custom: BTreeMap<String, f64>,
}

impl FrameCounters {
    /// Zeroes every per-frame counter and clears `custom`. `frame_id` is kept.
    pub fn reset(&mut self) {
        *self = Self {
            frame_id: self.frame_id,
            ..Self::default()
        };
    }

    /// Records one draw call and its primitives.
    pub fn record_draw(&mut self, primitives: PrimitiveCounts, instanced: bool) {
        self.draw_calls += 1;
        if instanced {
            self.instanced_draw_calls += 1;
        }
        self.triangles = self.triangles.saturating_add(primitives.triangles);
        self.lines = self.lines.saturating_add(primitives.lines);
        self.points = self.points.saturating_add(primitives.points);
    }

    /// Adds `delta` to a custom counter, creating it at zero first.
    pub fn inc_custom(&mut self, key: &str, delta: f64) {
        *self.custom.entry(key.to_string()).or_insert(0.0) += delta;
    }
}

/// An immutable view of one frame's metrics.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSnapshot {
    /// Wall-clock time of the snapshot, in milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Moving average of recent frame rates.
    pub fps: f64,
    /// CPU frame time derived from `fps`.
    pub cpu_ms: f64,
    /// Last resolved GPU duration of the whole-frame timer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu_ms: Option<f64>,
    /// The frame's counters.
    #[serde(flatten)]
    pub counters: FrameCounters,
}
