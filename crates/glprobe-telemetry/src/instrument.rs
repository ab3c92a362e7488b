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

//! The instrumented context: a decorator over any [`GraphicsContext`].
//!
//! Every entry point is forwarded to the inner context unchanged. The
//! observed subset additionally feeds the [`CounterEngine`] (only while it is
//! wrapped) and the [`ResourceTracker`] (always).

use crate::counters::{CounterEngine, WrapOptions};
use crate::resources::ResourceTracker;
use glprobe_core::{
    gl, memory, primitives, BufferData, Capabilities, ContextVersion, GpuHandle, GraphicsContext,
    ResourceKind,
};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Which instanced entry points are counted on this context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstancingApi {
    /// Core `draw*Instanced` (version 2).
    Core,
    /// `draw*InstancedANGLE` (version 1 with `ANGLE_instanced_arrays`).
    Angle,
    /// No instancing API; instanced draws are forwarded uncounted.
    Untracked,
}

/// Which vertex array entry points are tracked on this context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexArrayApi {
    /// Core `createVertexArray` (version 2).
    Core,
    /// `createVertexArrayOES` (version 1 with `OES_vertex_array_object`).
    Oes,
    /// No vertex array objects.
    Unavailable,
}

/// Objects currently bound, so uploads can be attributed to them.
#[derive(Debug)]
struct Bindings {
    active_unit: u32,
    textures: HashMap<(u32, u32), u64>,
    buffers: HashMap<u32, u64>,
}

impl Default for Bindings {
    fn default() -> Self {
        Self {
            active_unit: gl::TEXTURE0,
            textures: HashMap::new(),
            buffers: HashMap::new(),
        }
    }
}

/// Maps an image target to the bind point that owns it.
fn bind_point(target: u32) -> u32 {
    if gl::is_cube_face(target) {
        gl::TEXTURE_CUBE_MAP
    } else {
        target
    }
}

/// A [`GraphicsContext`] that counts calls and tracks resources of `C`.
#[derive(Debug)]
pub struct InstrumentedContext<C: GraphicsContext> {
    inner: C,
    capabilities: Capabilities,
    instancing: InstancingApi,
    vertex_arrays: VertexArrayApi,
    counters: CounterEngine,
    resources: ResourceTracker,
    bindings: Mutex<Bindings>,
}

impl<C: GraphicsContext> InstrumentedContext<C> {
    /// Decorates `inner`. Resource tracking starts immediately; call counting
    /// starts with [`wrap`](Self::wrap).
    pub fn new(inner: C, log_creates: bool) -> Self {
        let capabilities = Capabilities::detect(&inner);
        let instancing = if capabilities.is_version2 {
            InstancingApi::Core
        } else if capabilities.extensions.instanced {
            InstancingApi::Angle
        } else {
            InstancingApi::Untracked
        };
        let vertex_arrays = if capabilities.is_version2 {
            VertexArrayApi::Core
        } else if capabilities.extensions.vao {
            VertexArrayApi::Oes
        } else {
            VertexArrayApi::Unavailable
        };
        log::debug!("Instrumenting context: instancing {instancing:?}, vertex arrays {vertex_arrays:?}");

        Self {
            inner,
            capabilities,
            instancing,
            vertex_arrays,
            counters: CounterEngine::new(),
            resources: ResourceTracker::new(log_creates),
            bindings: Mutex::new(Bindings::default()),
        }
    }

    /// Starts counting calls, replacing any previous options.
    pub fn wrap(&self, options: WrapOptions) {
        self.counters.wrap(options);
    }

    /// Stops counting calls. Resource tracking continues.
    pub fn unwrap(&self) {
        self.counters.unwrap();
    }

    /// The decorated context.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Removes the decorator.
    pub fn into_inner(self) -> C {
        self.inner
    }

    /// Capabilities detected at construction.
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// The instanced entry points counted on this context.
    pub fn instancing_api(&self) -> InstancingApi {
        self.instancing
    }

    /// The vertex array entry points tracked on this context.
    pub fn vertex_array_api(&self) -> VertexArrayApi {
        self.vertex_arrays
    }

    /// The counter engine.
    pub fn counters(&self) -> &CounterEngine {
        &self.counters
    }

    /// The resource tracker.
    pub fn resources(&self) -> &ResourceTracker {
        &self.resources
    }

    /// Creates a vertex array object through whichever API this context has.
    pub fn create_vertex_array_any(&self) -> Option<C::VertexArray> {
        match self.vertex_arrays {
            VertexArrayApi::Core => self.create_vertex_array(),
            VertexArrayApi::Oes => self.create_vertex_array_oes(),
            VertexArrayApi::Unavailable => None,
        }
    }

    /// Deletes a vertex array object through whichever API this context has.
    pub fn delete_vertex_array_any(&self, vertex_array: Option<C::VertexArray>) {
        match self.vertex_arrays {
            VertexArrayApi::Core => self.delete_vertex_array(vertex_array),
            VertexArrayApi::Oes => self.delete_vertex_array_oes(vertex_array),
            VertexArrayApi::Unavailable => {}
        }
    }

    /// Attaches a label to a tracked resource. Returns `false` if `handle`
    /// is not tracked as `kind`.
    pub fn label<H: GpuHandle>(&self, kind: ResourceKind, handle: H, label: &str) -> bool {
        self.resources.set_label(kind, handle.raw(), label)
    }

    fn bindings(&self) -> MutexGuard<'_, Bindings> {
        self.bindings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn track_create<H: GpuHandle>(
        &self,
        kind: ResourceKind,
        handle: Option<H>,
        metadata: BTreeMap<String, Value>,
    ) -> Option<H> {
        if let Some(handle) = handle {
            self.resources.on_create(kind, handle.raw(), metadata);
        }
        handle
    }

    fn track_delete<H: GpuHandle>(&self, kind: ResourceKind, handle: Option<H>) {
        if let Some(handle) = handle {
            self.resources.on_delete(kind, handle.raw());
        }
    }

    fn tracks_vertex_arrays(&self, api: VertexArrayApi) -> bool {
        self.vertex_arrays == api
    }
}

impl<C: GraphicsContext> GraphicsContext for InstrumentedContext<C> {
    type Texture = C::Texture;
    type Buffer = C::Buffer;
    type Shader = C::Shader;
    type Program = C::Program;
    type Framebuffer = C::Framebuffer;
    type Renderbuffer = C::Renderbuffer;
    type VertexArray = C::VertexArray;
    type Query = C::Query;

    fn version(&self) -> ContextVersion {
        self.inner.version()
    }

    fn supports_extension(&self, name: &str) -> bool {
        self.inner.supports_extension(name)
    }

    fn create_texture(&self) -> Option<Self::Texture> {
        let texture = self.inner.create_texture();
        self.track_create(ResourceKind::Texture, texture, BTreeMap::new())
    }

    fn delete_texture(&self, texture: Option<Self::Texture>) {
        if let Some(raw) = texture.map(|t| t.raw()) {
            self.bindings().textures.retain(|_, bound| *bound != raw);
        }
        self.track_delete(ResourceKind::Texture, texture);
        self.inner.delete_texture(texture);
    }

    fn create_buffer(&self) -> Option<Self::Buffer> {
        let buffer = self.inner.create_buffer();
        self.track_create(ResourceKind::Buffer, buffer, BTreeMap::new())
    }

    fn delete_buffer(&self, buffer: Option<Self::Buffer>) {
        if let Some(raw) = buffer.map(|b| b.raw()) {
            self.bindings().buffers.retain(|_, bound| *bound != raw);
        }
        self.track_delete(ResourceKind::Buffer, buffer);
        self.inner.delete_buffer(buffer);
    }

    fn create_shader(&self, shader_type: u32) -> Option<Self::Shader> {
        let shader = self.inner.create_shader(shader_type);
        let mut metadata = BTreeMap::new();
        metadata.insert("type".to_string(), Value::from(shader_type));
        self.track_create(ResourceKind::Shader, shader, metadata)
    }

    fn delete_shader(&self, shader: Option<Self::Shader>) {
        self.track_delete(ResourceKind::Shader, shader);
        self.inner.delete_shader(shader);
    }

    fn create_program(&self) -> Option<Self::Program> {
        let program = self.inner.create_program();
        self.track_create(ResourceKind::Program, program, BTreeMap::new())
    }

    fn delete_program(&self, program: Option<Self::Program>) {
        self.track_delete(ResourceKind::Program, program);
        self.inner.delete_program(program);
    }

    fn create_framebuffer(&self) -> Option<Self::Framebuffer> {
        let framebuffer = self.inner.create_framebuffer();
        self.track_create(ResourceKind::Framebuffer, framebuffer, BTreeMap::new())
    }

    fn delete_framebuffer(&self, framebuffer: Option<Self::Framebuffer>) {
        self.track_delete(ResourceKind::Framebuffer, framebuffer);
        self.inner.delete_framebuffer(framebuffer);
    }

    fn create_renderbuffer(&self) -> Option<Self::Renderbuffer> {
        let renderbuffer = self.inner.create_renderbuffer();
        self.track_create(ResourceKind::Renderbuffer, renderbuffer, BTreeMap::new())
    }

    fn delete_renderbuffer(&self, renderbuffer: Option<Self::Renderbuffer>) {
        self.track_delete(ResourceKind::Renderbuffer, renderbuffer);
        self.inner.delete_renderbuffer(renderbuffer);
    }

    fn create_vertex_array(&self) -> Option<Self::VertexArray> {
        let vertex_array = self.inner.create_vertex_array();
        if self.tracks_vertex_arrays(VertexArrayApi::Core) {
            self.track_create(ResourceKind::VertexArray, vertex_array, BTreeMap::new())
        } else {
            vertex_array
        }
    }

    fn delete_vertex_array(&self, vertex_array: Option<Self::VertexArray>) {
        if self.tracks_vertex_arrays(VertexArrayApi::Core) {
            self.track_delete(ResourceKind::VertexArray, vertex_array);
        }
        self.inner.delete_vertex_array(vertex_array);
    }

    fn create_vertex_array_oes(&self) -> Option<Self::VertexArray> {
        let vertex_array = self.inner.create_vertex_array_oes();
        if self.tracks_vertex_arrays(VertexArrayApi::Oes) {
            self.track_create(ResourceKind::VertexArray, vertex_array, BTreeMap::new())
        } else {
            vertex_array
        }
    }

    fn delete_vertex_array_oes(&self, vertex_array: Option<Self::VertexArray>) {
        if self.tracks_vertex_arrays(VertexArrayApi::Oes) {
            self.track_delete(ResourceKind::VertexArray, vertex_array);
        }
        self.inner.delete_vertex_array_oes(vertex_array);
    }

    fn draw_arrays(&self, mode: u32, first: i32, count: i32) {
        self.counters.on_draw(primitives::estimate(mode, count));
        self.inner.draw_arrays(mode, first, count);
    }

    fn draw_elements(&self, mode: u32, count: i32, element_type: u32, offset: i32) {
        self.counters.on_draw(primitives::estimate(mode, count));
        self.inner.draw_elements(mode, count, element_type, offset);
    }

    fn draw_arrays_instanced(&self, mode: u32, first: i32, count: i32, instance_count: i32) {
        if self.instancing == InstancingApi::Core {
            self.counters
                .on_instanced_draw(primitives::estimate_instanced(mode, count, instance_count));
        }
        self.inner
            .draw_arrays_instanced(mode, first, count, instance_count);
    }

    fn draw_elements_instanced(
        &self,
        mode: u32,
        count: i32,
        element_type: u32,
        offset: i32,
        instance_count: i32,
    ) {
        if self.instancing == InstancingApi::Core {
            self.counters
                .on_instanced_draw(primitives::estimate_instanced(mode, count, instance_count));
        }
        self.inner
            .draw_elements_instanced(mode, count, element_type, offset, instance_count);
    }

    fn draw_arrays_instanced_angle(&self, mode: u32, first: i32, count: i32, instance_count: i32) {
        if self.instancing == InstancingApi::Angle {
            self.counters
                .on_instanced_draw(primitives::estimate_instanced(mode, count, instance_count));
        }
        self.inner
            .draw_arrays_instanced_angle(mode, first, count, instance_count);
    }

    fn draw_elements_instanced_angle(
        &self,
        mode: u32,
        count: i32,
        element_type: u32,
        offset: i32,
        instance_count: i32,
    ) {
        if self.instancing == InstancingApi::Angle {
            self.counters
                .on_instanced_draw(primitives::estimate_instanced(mode, count, instance_count));
        }
        self.inner
            .draw_elements_instanced_angle(mode, count, element_type, offset, instance_count);
    }

    fn active_texture(&self, unit: u32) {
        self.bindings().active_unit = unit;
        self.inner.active_texture(unit);
    }

    fn bind_texture(&self, target: u32, texture: Option<Self::Texture>) {
        self.counters.on_texture_bind(texture.is_some());
        {
            let mut bindings = self.bindings();
            let slot = (bindings.active_unit, bind_point(target));
            match texture {
                Some(texture) => {
                    bindings.textures.insert(slot, texture.raw());
                    self.resources.touch(ResourceKind::Texture, texture.raw());
                }
                None => {
                    bindings.textures.remove(&slot);
                }
            }
        }
        self.inner.bind_texture(target, texture);
    }

    fn bind_buffer(&self, target: u32, buffer: Option<Self::Buffer>) {
        {
            let mut bindings = self.bindings();
            match buffer {
                Some(buffer) => {
                    bindings.buffers.insert(target, buffer.raw());
                    self.resources.touch(ResourceKind::Buffer, buffer.raw());
                }
                None => {
                    bindings.buffers.remove(&target);
                }
            }
        }
        self.inner.bind_buffer(target, buffer);
    }

    fn use_program(&self, program: Option<Self::Program>) {
        let raw = program.map(|p| p.raw());
        self.counters.on_use_program(raw);
        if let Some(raw) = raw {
            self.resources.touch(ResourceKind::Program, raw);
        }
        self.inner.use_program(program);
    }

    fn buffer_data(&self, target: u32, data: BufferData<'_>, usage: u32) {
        self.counters.on_buffer_upload();
        let bound = self.bindings().buffers.get(&target).copied();
        self.resources
            .on_upload(ResourceKind::Buffer, bound, data.byte_len() as u64);
        self.inner.buffer_data(target, data, usage);
    }

    fn buffer_sub_data(&self, target: u32, offset: i32, data: BufferData<'_>) {
        self.counters.on_buffer_upload();
        if let Some(bound) = self.bindings().buffers.get(&target).copied() {
            self.resources.touch(ResourceKind::Buffer, bound);
        }
        self.inner.buffer_sub_data(target, offset, data);
    }

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
    ) {
        let bytes = memory::texture_bytes(width, height, format, pixel_type);
        let bound = {
            let bindings = self.bindings();
            bindings
                .textures
                .get(&(bindings.active_unit, bind_point(target)))
                .copied()
        };
        self.resources.on_upload(ResourceKind::Texture, bound, bytes);
        self.inner.tex_image_2d(
            target,
            level,
            internal_format,
            width,
            height,
            border,
            format,
            pixel_type,
            pixels,
        );
    }

    fn create_query(&self) -> Option<Self::Query> {
        self.inner.create_query()
    }

    fn delete_query(&self, query: Option<Self::Query>) {
        self.inner.delete_query(query);
    }

    fn begin_query(&self, target: u32, query: Self::Query) {
        self.inner.begin_query(target, query);
    }

    fn end_query(&self, target: u32) {
        self.inner.end_query(target);
    }

    fn query_result_available(&self, query: Self::Query) -> bool {
        self.inner.query_result_available(query)
    }

    fn query_result(&self, query: Self::Query) -> u64 {
        self.inner.query_result(query)
    }

    fn gpu_disjoint(&self) -> bool {
        self.inner.gpu_disjoint()
    }
}
