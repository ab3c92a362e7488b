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

//! Instrumentation engine for graphics contexts.
//!
//! [`DebugSession`] is the entry point: it decorates a
//! [`GraphicsContext`](glprobe_core::GraphicsContext) with an
//! [`InstrumentedContext`] that counts draws and state changes, tracks the
//! lifecycle of every GPU resource, and drives the asynchronous
//! [`GpuTimers`] engine once per frame.

#![warn(missing_docs)]

pub mod config;
pub mod counters;
pub mod error;
pub mod instrument;
pub mod resources;
pub mod session;
pub mod shader_log;
pub mod timers;
pub mod utils;

pub use config::{DebugMode, SessionConfig};
pub use counters::{CounterEngine, WrapOptions};
pub use error::TelemetryError;
pub use instrument::{InstancingApi, InstrumentedContext, VertexArrayApi};
pub use resources::ResourceTracker;
pub use session::{DebugSession, FRAME_TIMER};
pub use shader_log::{
    concat_with_line_directives, format_shader_error, parse_info_log, MappedSource, ParsedError,
    ShaderErrorReport, ShaderStage, SourceChunk,
};
pub use timers::{GpuTimers, TimelineExport};
pub use utils::timer::ScopedGpuTimer;
