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

//! Primitive-count estimation for draw calls.

use crate::gl;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// How a flat vertex sequence is grouped into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topology {
    /// One point per vertex.
    Points,
    /// Independent line segments, two vertices each.
    Lines,
    /// Connected segments; each vertex after the first adds one.
    LineStrip,
    /// A line strip closed back to the first vertex.
    LineLoop,
    /// Independent triangles, three vertices each.
    Triangles,
    /// Each vertex after the second adds a triangle.
    TriangleStrip,
    /// Triangles sharing the first vertex.
    TriangleFan,
}

impl Topology {
    /// An array containing all `Topology` variants.
    pub const ALL: [Topology; 7] = [
        Topology::Points,
        Topology::Lines,
        Topology::LineStrip,
        Topology::LineLoop,
        Topology::Triangles,
        Topology::TriangleStrip,
        Topology::TriangleFan,
    ];

    /// Maps a raw primitive mode to a topology.
    pub fn from_mode(mode: u32) -> Option<Self> {
        match mode {
            gl::POINTS => Some(Topology::Points),
            gl::LINES => Some(Topology::Lines),
            gl::LINE_STRIP => Some(Topology::LineStrip),
            gl::LINE_LOOP => Some(Topology::LineLoop),
            gl::TRIANGLES => Some(Topology::Triangles),
            gl::TRIANGLE_STRIP => Some(Topology::TriangleStrip),
            gl::TRIANGLE_FAN => Some(Topology::TriangleFan),
            _ => None,
        }
    }

    /// The raw primitive mode for this topology.
    pub fn mode(self) -> u32 {
        match self {
            Topology::Points => gl::POINTS,
            Topology::Lines => gl::LINES,
            Topology::LineStrip => gl::LINE_STRIP,
            Topology::LineLoop => gl::LINE_LOOP,
            Topology::Triangles => gl::TRIANGLES,
            Topology::TriangleStrip => gl::TRIANGLE_STRIP,
            Topology::TriangleFan => gl::TRIANGLE_FAN,
        }
    }

    /// Counts the primitives produced by `count` vertices.
    pub fn estimate(self, count: u64) -> PrimitiveCounts {
        let mut counts = PrimitiveCounts::default();
        match self {
            Topology::Points => counts.points = count,
            Topology::Lines => counts.lines = count / 2,
            Topology::LineStrip => counts.lines = count.saturating_sub(1),
            Topology::LineLoop => counts.lines = count,
            Topology::Triangles => counts.triangles = count / 3,
            Topology::TriangleStrip | Topology::TriangleFan => {
                counts.triangles = count.saturating_sub(2)
            }
        }
        counts
    }
}

/// Triangles, lines and points produced by one or more draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PrimitiveCounts {
    /// Triangles rasterized.
    pub triangles: u64,
    /// Line segments rasterized.
    pub lines: u64,
    /// Points rasterized.
    pub points: u64,
}

impl PrimitiveCounts {
    /// Returns `true` if no primitive is counted.
    pub fn is_empty(&self) -> bool {
        self.triangles == 0 && self.lines == 0 && self.points == 0
    }

    /// Multiplies every count by `factor`, saturating on overflow.
    pub fn scaled(self, factor: u64) -> Self {
        Self {
            triangles: self.triangles.saturating_mul(factor),
            lines: self.lines.saturating_mul(factor),
            points: self.points.saturating_mul(factor),
        }
    }
}

impl Add for PrimitiveCounts {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            triangles: self.triangles.saturating_add(rhs.triangles),
            lines: self.lines.saturating_add(rhs.lines),
            points: self.points.saturating_add(rhs.points),
        }
    }
}

impl AddAssign for PrimitiveCounts {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// Estimates the primitives of a non-instanced draw.
///
/// Unknown modes and non-positive counts yield zero everywhere.
pub fn estimate(mode: u32, count: i32) -> PrimitiveCounts {
    match Topology::from_mode(mode) {
        Some(topology) if count > 0 => topology.estimate(count as u64),
        _ => PrimitiveCounts::default(),
    }
}

/// Estimates the primitives of an instanced draw: the per-instance estimate
/// times `instance_count`. Negative instance counts contribute nothing.
pub fn estimate_instanced(mode: u32, count: i32, instance_count: i32) -> PrimitiveCounts {
    estimate(mode, count).scaled(instance_count.max(0) as u64)
}
