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

//! The call log recorded by the headless context.

use glprobe_core::ResourceKind;

/// One entry point invocation that reached the headless driver.
///
/// Object names are recorded as raw `u32`s, `None` standing for null.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlCall {
    /// A create entry point and the name it returned.
    Create {
        /// Object category.
        kind: ResourceKind,
        /// The returned name, `None` when creation failed.
        name: Option<u32>,
    },
    /// A delete entry point and the name it received.
    Delete {
        /// Object category.
        kind: ResourceKind,
        /// The deleted name, `None` for null.
        name: Option<u32>,
    },
    /// `drawArrays`, instanced or not.
    DrawArrays {
        /// Primitive mode.
        mode: u32,
        /// First vertex.
        first: i32,
        /// Vertex count.
        count: i32,
        /// Instance count for instanced variants.
        instances: Option<i32>,
    },
    /// `drawElements`, instanced or not.
    DrawElements {
        /// Primitive mode.
        mode: u32,
        /// Index count.
        count: i32,
        /// Index type.
        element_type: u32,
        /// Byte offset into the element buffer.
        offset: i32,
        /// Instance count for instanced variants.
        instances: Option<i32>,
    },
    /// `activeTexture`.
    ActiveTexture(u32),
    /// `bindTexture`.
    BindTexture {
        /// Bind target.
        target: u32,
        /// Bound name.
        name: Option<u32>,
    },
    /// `bindBuffer`.
    BindBuffer {
        /// Bind target.
        target: u32,
        /// Bound name.
        name: Option<u32>,
    },
    /// `useProgram`.
    UseProgram(Option<u32>),
    /// `bufferData`.
    BufferData {
        /// Bind target.
        target: u32,
        /// Payload size in bytes.
        bytes: usize,
        /// Usage hint.
        usage: u32,
    },
    /// `bufferSubData`.
    BufferSubData {
        /// Bind target.
        target: u32,
        /// Destination offset.
        offset: i32,
        /// Payload size in bytes.
        bytes: usize,
    },
    /// `texImage2D`.
    TexImage2d {
        /// Image target.
        target: u32,
        /// Mip level.
        level: i32,
        /// Width in pixels.
        width: i32,
        /// Height in pixels.
        height: i32,
        /// Pixel format.
        format: u32,
        /// Pixel type.
        pixel_type: u32,
    },
    /// `beginQuery`.
    BeginQuery {
        /// Query target.
        target: u32,
        /// Query name.
        name: u32,
    },
    /// `endQuery`.
    EndQuery(u32),
    /// `createQuery` and the name it returned.
    CreateQuery(Option<u32>),
    /// `deleteQuery` and the name it received.
    DeleteQuery(Option<u32>),
}

impl GlCall {
    /// Returns `true` for any draw entry point.
    pub fn is_draw(&self) -> bool {
        matches!(self, GlCall::DrawArrays { .. } | GlCall::DrawElements { .. })
    }
}
