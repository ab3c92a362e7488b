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

//! # glprobe Core
//!
//! Foundational crate containing the graphics context contract, the data types
//! shared by every instrumentation layer, and the pure estimation rules
//! (primitive counts, upload sizes) the tracking engine relies on.

#![warn(missing_docs)]

pub mod capabilities;
pub mod context;
pub mod gl;
pub mod memory;
pub mod primitives;
pub mod resource;
pub mod stats;
pub mod timer;
pub mod utils;

pub use capabilities::{Capabilities, ExtensionSupport, TimerTier};
pub use context::{BufferData, ContextVersion, GpuHandle, GraphicsContext};
pub use primitives::{PrimitiveCounts, Topology};
pub use resource::{ResourceKind, ResourceRecord, ResourceSummary};
pub use stats::{FrameCounters, MetricSnapshot};
pub use timer::{Bottleneck, DrawCallInfo, TimerKind, TimerQueryNode, TimerStats, TimerSummary};
pub use utils::timer::Stopwatch;
