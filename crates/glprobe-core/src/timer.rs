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

//! GPU timer data types shared by the timer engine and its consumers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a timed section covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerKind {
    /// A whole frame.
    Frame,
    /// A render pass.
    Pass,
    /// A single draw call.
    Draw,
    /// A clear.
    Clear,
    /// Compute-like work.
    Compute,
    /// Anything else.
    #[default]
    Custom,
}

impl TimerKind {
    /// An array containing all `TimerKind` variants.
    pub const ALL: [TimerKind; 6] = [
        TimerKind::Frame,
        TimerKind::Pass,
        TimerKind::Draw,
        TimerKind::Clear,
        TimerKind::Compute,
        TimerKind::Custom,
    ];
}

/// One timed section of a frame timeline, with its nested sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerQueryNode {
    /// Unique id of this invocation.
    pub id: String,
    /// The section label; statistics are keyed by it.
    pub label: String,
    /// The section category.
    #[serde(rename = "type")]
    pub kind: TimerKind,
    /// CPU time at `begin`, in milliseconds since the engine started.
    pub start_time: f64,
    /// CPU time at `end`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,
    /// Wall-clock time between `begin` and `end`.
    #[serde(rename = "cpuTime", skip_serializing_if = "Option::is_none")]
    pub cpu_duration: Option<f64>,
    /// GPU time, filled once the query resolves.
    #[serde(rename = "gpuTime", skip_serializing_if = "Option::is_none")]
    pub gpu_duration: Option<f64>,
    /// Free-form data attached at `begin`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Sections begun while this one was open, in order.
    #[serde(default)]
    pub children: Vec<TimerQueryNode>,
}

impl TimerQueryNode {
    /// Visits this node and all of its descendants in pre-order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a TimerQueryNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

/// Aggregated GPU timings of one label.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerStats {
    /// Most recent sample, in milliseconds.
    pub last: f64,
    /// Mean of every resolved sample.
    pub average: f64,
    /// 95th percentile of the rolling window.
    pub p95: f64,
    /// All-time minimum.
    pub min: f64,
    /// All-time maximum.
    pub max: f64,
    /// Number of resolved samples.
    pub samples: u64,
}

/// The compact per-label view exposed to overlays and session exports.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TimerSummary {
    /// Most recent sample.
    pub last: f64,
    /// Mean of every resolved sample.
    pub avg: f64,
    /// 95th percentile of the rolling window.
    pub p95: f64,
    /// All-time maximum.
    pub max: f64,
}

impl From<TimerStats> for TimerSummary {
    fn from(stats: TimerStats) -> Self {
        Self {
            last: stats.last,
            avg: stats.average,
            p95: stats.p95,
            max: stats.max,
        }
    }
}

/// Describes a draw call timed by the draw-call helper.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawCallInfo {
    /// Primitive mode name, e.g. `TRIANGLES`.
    pub primitive_mode: String,
    /// Vertices per instance.
    pub vertex_count: u32,
    /// Instances drawn, for instanced calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_count: Option<u32>,
    /// Id of the program in use.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_id: Option<String>,
    /// Human readable shader name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shader_name: Option<String>,
}

impl DrawCallInfo {
    /// Describes a draw of `vertex_count` vertices in `mode`.
    pub fn new(mode: u32, vertex_count: u32) -> Self {
        Self {
            primitive_mode: crate::gl::mode_name(mode).to_string(),
            vertex_count,
            ..Default::default()
        }
    }

    /// Sets the instance count.
    pub fn with_instances(mut self, instance_count: u32) -> Self {
        self.instance_count = Some(instance_count);
        self
    }

    /// Sets the shader name.
    pub fn with_shader(mut self, name: impl Into<String>) -> Self {
        self.shader_name = Some(name.into());
        self
    }
}

/// One entry of a bottleneck report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bottleneck {
    /// The section label.
    pub label: String,
    /// Resolved GPU milliseconds.
    pub time: f64,
    /// The section category.
    #[serde(rename = "type")]
    pub kind: TimerKind,
}
