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

//! The graphics context contract every backend and every instrumentation
//! layer implements.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

/// An opaque native object handle returned by a [`GraphicsContext`].
///
/// Handles are compared by identity only. `raw` exposes that identity as an
/// integer so trackers can key their registries without owning the object.
pub trait GpuHandle: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    /// The identity of the native object behind this handle.
    fn raw(&self) -> u64;
}

/// The API level exposed by a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextVersion {
    /// WebGL 1 / OpenGL ES 2.0 feature set; most features come from extensions.
    WebGl1,
    /// WebGL 2 / OpenGL ES 3.0 feature set.
    WebGl2,
}

impl ContextVersion {
    /// Returns `true` for the version 2 feature set.
    pub fn is_version2(self) -> bool {
        matches!(self, ContextVersion::WebGl2)
    }
}

/// The payload of a buffer upload.
///
/// Mirrors the overloads of the underlying `bufferData` entry point: either a
/// size to allocate, raw bytes, or a typed numeric array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferData<'a> {
    /// Allocate `n` uninitialized bytes.
    Size(usize),
    /// Upload raw bytes.
    Bytes(&'a [u8]),
    /// Upload a typed array, viewed as bytes.
    Typed {
        /// The array contents as bytes.
        bytes: &'a [u8],
        /// The width of one element in bytes.
        element_size: usize,
    },
}

impl<'a> BufferData<'a> {
    /// Wraps a slice of plain numeric values as a typed upload.
    pub fn typed<T: bytemuck::Pod>(data: &'a [T]) -> Self {
        BufferData::Typed {
            bytes: bytemuck::cast_slice(data),
            element_size: std::mem::size_of::<T>(),
        }
    }

    /// The number of bytes this upload occupies on the GPU.
    pub fn byte_len(&self) -> usize {
        match self {
            BufferData::Size(size) => *size,
            BufferData::Bytes(bytes) => bytes.len(),
            BufferData::Typed { bytes, .. } => bytes.len(),
        }
    }

    /// The uploaded bytes, if the payload carries any.
    pub fn bytes(&self) -> Option<&'a [u8]> {
        match *self {
            BufferData::Size(_) => None,
            BufferData::Bytes(bytes) | BufferData::Typed { bytes, .. } => Some(bytes),
        }
    }
}

/// The subset of an immediate-mode graphics API that glprobe observes.
///
/// Entry points take `&self`, like the host API they model; backends use
/// interior mutability for their own bookkeeping. Creation functions return
/// `None` when the driver fails to allocate, and every deletion accepts `None`
/// as a no-op, matching the host API's null semantics.
///
/// The `*_angle` and `*_oes` methods are the extension spellings available on
/// a version 1 context. Backends that lack the extension may implement them as
/// no-ops.
pub trait GraphicsContext {
    /// Texture handle.
    type Texture: GpuHandle;
    /// Buffer handle.
    type Buffer: GpuHandle;
    /// Shader handle.
    type Shader: GpuHandle;
    /// Program handle.
    type Program: GpuHandle;
    /// Framebuffer handle.
    type Framebuffer: GpuHandle;
    /// Renderbuffer handle.
    type Renderbuffer: GpuHandle;
    /// Vertex array object handle.
    type VertexArray: GpuHandle;
    /// Timer query handle.
    type Query: GpuHandle;

    /// The API level of this context.
    fn version(&self) -> ContextVersion;
    /// Returns `true` if the named extension can be enabled on this context.
    fn supports_extension(&self, name: &str) -> bool;

    // --- Resource lifecycle ---

    /// Creates a texture object.
    fn create_texture(&self) -> Option<Self::Texture>;
    /// Deletes a texture object.
    fn delete_texture(&self, texture: Option<Self::Texture>);
    /// Creates a buffer object.
    fn create_buffer(&self) -> Option<Self::Buffer>;
    /// Deletes a buffer object.
    fn delete_buffer(&self, buffer: Option<Self::Buffer>);
    /// Creates a shader object of the given stage.
    fn create_shader(&self, shader_type: u32) -> Option<Self::Shader>;
    /// Deletes a shader object.
    fn delete_shader(&self, shader: Option<Self::Shader>);
    /// Creates a program object.
    fn create_program(&self) -> Option<Self::Program>;
    /// Deletes a program object.
    fn delete_program(&self, program: Option<Self::Program>);
    /// Creates a framebuffer object.
    fn create_framebuffer(&self) -> Option<Self::Framebuffer>;
    /// Deletes a framebuffer object.
    fn delete_framebuffer(&self, framebuffer: Option<Self::Framebuffer>);
    /// Creates a renderbuffer object.
    fn create_renderbuffer(&self) -> Option<Self::Renderbuffer>;
    /// Deletes a renderbuffer object.
    fn delete_renderbuffer(&self, renderbuffer: Option<Self::Renderbuffer>);
    /// Creates a vertex array object through the core (version 2) API.
    fn create_vertex_array(&self) -> Option<Self::VertexArray>;
    /// Deletes a vertex array object through the core (version 2) API.
    fn delete_vertex_array(&self, vertex_array: Option<Self::VertexArray>);
    /// Creates a vertex array object through `OES_vertex_array_object`.
    fn create_vertex_array_oes(&self) -> Option<Self::VertexArray>;
    /// Deletes a vertex array object through `OES_vertex_array_object`.
    fn delete_vertex_array_oes(&self, vertex_array: Option<Self::VertexArray>);

    // --- Draws ---

    /// Renders `count` vertices starting at `first`.
    fn draw_arrays(&self, mode: u32, first: i32, count: i32);
    /// Renders `count` indexed vertices.
    fn draw_elements(&self, mode: u32, count: i32, element_type: u32, offset: i32);
    /// Core instanced variant of [`draw_arrays`](Self::draw_arrays).
    fn draw_arrays_instanced(&self, mode: u32, first: i32, count: i32, instance_count: i32);
    /// Core instanced variant of [`draw_elements`](Self::draw_elements).
    fn draw_elements_instanced(
        &self,
        mode: u32,
        count: i32,
        element_type: u32,
        offset: i32,
        instance_count: i32,
    );
    /// `ANGLE_instanced_arrays` variant of [`draw_arrays_instanced`](Self::draw_arrays_instanced).
    fn draw_arrays_instanced_angle(&self, mode: u32, first: i32, count: i32, instance_count: i32);
    /// `ANGLE_instanced_arrays` variant of [`draw_elements_instanced`](Self::draw_elements_instanced).
    fn draw_elements_instanced_angle(
        &self,
        mode: u32,
        count: i32,
        element_type: u32,
        offset: i32,
        instance_count: i32,
    );

    // --- State ---

    /// Selects the active texture unit (`TEXTURE0 + n`).
    fn active_texture(&self, unit: u32);
    /// Binds a texture to a target on the active unit.
    fn bind_texture(&self, target: u32, texture: Option<Self::Texture>);
    /// Binds a buffer to a target.
    fn bind_buffer(&self, target: u32, buffer: Option<Self::Buffer>);
    /// Makes a program current.
    fn use_program(&self, program: Option<Self::Program>);

    // --- Uploads ---

    /// (Re)allocates the store of the buffer bound to `target`.
    fn buffer_data(&self, target: u32, data: BufferData<'_>, usage: u32);
    /// Updates a sub-range of the buffer bound to `target`.
    fn buffer_sub_data(&self, target: u32, offset: i32, data: BufferData<'_>);
    /// Specifies a two-dimensional image for the texture bound to `target`.
    #[allow(clippy::too_many_arguments)]
    fn tex_image_2d(
        &self,
        target: u32,
        level: i32,
        internal_format: i32,
        width: i32,
        height: i32,
        border: i32,
        format: u32,
        pixel_type: u32,
        pixels: Option<&[u8]>,
    );

    // --- Timer queries ---

    /// Creates a query object.
    fn create_query(&self) -> Option<Self::Query>;
    /// Deletes a query object.
    fn delete_query(&self, query: Option<Self::Query>);
    /// Starts `query` on `target` (`TIME_ELAPSED_EXT` for timers).
    fn begin_query(&self, target: u32, query: Self::Query);
    /// Ends the active query on `target`.
    fn end_query(&self, target: u32);
    /// Returns `true` once the GPU has produced the query's result.
    fn query_result_available(&self, query: Self::Query) -> bool;
    /// The query's result in nanoseconds. Only meaningful once available.
    fn query_result(&self, query: Self::Query) -> u64;
    /// Returns `true` if the GPU clock was disturbed since the last check,
    /// invalidating every in-flight timer result.
    fn gpu_disjoint(&self) -> bool;
}
