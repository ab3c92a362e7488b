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

//! A headless graphics context.
//!
//! [`HeadlessContext`] renders nothing. It hands out sequential object names,
//! records every call that reaches it, and simulates timer queries with
//! scripted durations, latency and disjoint events. It backs the test suites
//! and the sandbox, where no GPU is available.
//!
//! Query calls only work while a disjoint-timer-query extension is exposed.
//! Withdrawing it makes `create_query` fail and leaves existing results
//! unavailable.

mod calls;
pub mod handles;
mod queries;

pub use calls::GlCall;

use glprobe_core::capabilities::ext;
use glprobe_core::{BufferData, ContextVersion, GraphicsContext, ResourceKind};
use handles::{
    Buffer, Framebuffer, Program, Query, Renderbuffer, Shader, Texture, VertexArray,
};
use queries::QuerySimulator;
use std::collections::{HashMap, HashSet};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Default GPU duration reported by timer queries: 1 ms.
pub const DEFAULT_QUERY_NS: u64 = 1_000_000;

#[derive(Debug)]
struct DriverState {
    calls: Vec<GlCall>,
    recording: bool,
    live: HashMap<u32, ResourceKind>,
    failing_creates: usize,
    queries: QuerySimulator,
}

impl DriverState {
    fn record(&mut self, call: GlCall) {
        if self.recording {
            self.calls.push(call);
        }
    }
}

/// A software context that records calls instead of rendering.
#[derive(Debug)]
pub struct HeadlessContext {
    version: ContextVersion,
    extensions: Mutex<HashSet<String>>,
    next_name: AtomicU32,
    state: Mutex<DriverState>,
}

impl HeadlessContext {
    /// Creates a context of the given version without any extension.
    pub fn new(version: ContextVersion) -> Self {
        Self {
            version,
            extensions: Mutex::new(HashSet::new()),
            next_name: AtomicU32::new(1),
            state: Mutex::new(DriverState {
                calls: Vec::new(),
                recording: true,
                live: HashMap::new(),
                failing_creates: 0,
                queries: QuerySimulator::new(DEFAULT_QUERY_NS, 0),
            }),
        }
    }

    /// A bare version 2 context.
    pub fn webgl2() -> Self {
        Self::new(ContextVersion::WebGl2)
    }

    /// A bare version 1 context.
    pub fn webgl1() -> Self {
        Self::new(ContextVersion::WebGl1)
    }

    /// A version 2 context exposing the usual desktop extensions, GPU timers
    /// included.
    pub fn desktop_webgl2() -> Self {
        Self::webgl2().with_extensions(&[
            ext::EXT_COLOR_BUFFER_FLOAT,
            ext::EXT_COLOR_BUFFER_HALF_FLOAT,
            ext::WEBGL_DEBUG_RENDERER_INFO,
            ext::EXT_DISJOINT_TIMER_QUERY_WEBGL2,
        ])
    }

    /// Adds a supported extension.
    pub fn with_extension(self, name: &str) -> Self {
        self.enable_extension(name);
        self
    }

    /// Adds several supported extensions.
    pub fn with_extensions(self, names: &[&str]) -> Self {
        for name in names {
            self.enable_extension(name);
        }
        self
    }

    /// Sets how many availability checks a query fails before its result
    /// is ready.
    pub fn with_query_latency(self, checks: u32) -> Self {
        self.state().queries.latency = checks;
        self
    }

    /// Sets the duration reported by queries without a scripted result.
    pub fn with_default_query_ns(self, ns: u64) -> Self {
        self.state().queries.default_ns = ns;
        self
    }

    /// Makes an extension available.
    pub fn enable_extension(&self, name: &str) {
        self.extensions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string());
    }

    /// Withdraws an extension, as when a context loses a feature mid-session.
    pub fn disable_extension(&self, name: &str) {
        self.extensions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }

    /// Makes the next `count` create calls fail and return null.
    pub fn fail_next_creates(&self, count: usize) {
        self.state().failing_creates = count;
    }

    /// Queues the duration of the next query to end.
    pub fn push_query_result_ns(&self, ns: u64) {
        self.state().queries.push_result(ns);
    }

    /// Raises the GPU disjoint flag. It is cleared by the next read.
    pub fn raise_disjoint(&self) {
        self.state().queries.raise_disjoint();
    }

    /// Turns the call log on or off. Long benchmarks turn it off.
    pub fn set_recording(&self, recording: bool) {
        self.state().recording = recording;
    }

    /// A copy of the call log.
    pub fn calls(&self) -> Vec<GlCall> {
        self.state().calls.clone()
    }

    /// Empties the call log.
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Number of draw calls that reached the driver.
    pub fn draw_count(&self) -> usize {
        self.state().calls.iter().filter(|c| c.is_draw()).count()
    }

    /// Number of live objects of `kind`.
    pub fn live_objects(&self, kind: ResourceKind) -> usize {
        self.state().live.values().filter(|&&k| k == kind).count()
    }

    /// Number of query objects created and not yet deleted.
    pub fn live_queries(&self) -> usize {
        self.state().queries.live()
    }

    /// Number of query objects deleted so far.
    pub fn deleted_queries(&self) -> u64 {
        self.state().queries.deleted()
    }

    /// Returns `true` if `query` was begun and not ended yet.
    pub fn is_query_running(&self, query: Query) -> bool {
        self.state().queries.is_running(query.name())
    }

    fn state(&self) -> MutexGuard<'_, DriverState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn has_extension(&self, name: &str) -> bool {
        self.extensions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(name)
    }

    fn allocate(&self, kind: ResourceKind) -> Option<NonZeroU32> {
        let mut state = self.state();
        if state.failing_creates > 0 {
            state.failing_creates -= 1;
            state.record(GlCall::Create { kind, name: None });
            return None;
        }
        let name = NonZeroU32::new(self.next_name.fetch_add(1, Ordering::Relaxed))?;
        state.live.insert(name.get(), kind);
        state.record(GlCall::Create {
            kind,
            name: Some(name.get()),
        });
        Some(name)
    }

    fn release(&self, kind: ResourceKind, name: Option<u32>) {
        let mut state = self.state();
        if let Some(name) = name {
            state.live.remove(&name);
        }
        state.record(GlCall::Delete { kind, name });
    }

    fn instancing_extension(&self) -> bool {
        self.has_extension(ext::ANGLE_INSTANCED_ARRAYS)
    }

    fn vao_extension(&self) -> bool {
        self.has_extension(ext::OES_VERTEX_ARRAY_OBJECT)
    }

    fn timer_extension(&self) -> bool {
        self.has_extension(ext::EXT_DISJOINT_TIMER_QUERY_WEBGL2)
            || self.has_extension(ext::EXT_DISJOINT_TIMER_QUERY)
    }
}

impl GraphicsContext for HeadlessContext {
    type Texture = Texture;
    type Buffer = Buffer;
    type Shader = Shader;
    type Program = Program;
    type Framebuffer = Framebuffer;
    type Renderbuffer = Renderbuffer;
    type VertexArray = VertexArray;
    type Query = Query;

    fn version(&self) -> ContextVersion {
        self.version
    }

    fn supports_extension(&self, name: &str) -> bool {
        self.has_extension(name)
    }

    fn create_texture(&self) -> Option<Texture> {
        self.allocate(ResourceKind::Texture).map(Texture)
    }

    fn delete_texture(&self, texture: Option<Texture>) {
        self.release(ResourceKind::Texture, texture.map(Texture::name));
    }

    fn create_buffer(&self) -> Option<Buffer> {
        self.allocate(ResourceKind::Buffer).map(Buffer)
    }

    fn delete_buffer(&self, buffer: Option<Buffer>) {
        self.release(ResourceKind::Buffer, buffer.map(Buffer::name));
    }

    fn create_shader(&self, _shader_type: u32) -> Option<Shader> {
        self.allocate(ResourceKind::Shader).map(Shader)
    }

    fn delete_shader(&self, shader: Option<Shader>) {
        self.release(ResourceKind::Shader, shader.map(Shader::name));
    }

    fn create_program(&self) -> Option<Program> {
        self.allocate(ResourceKind::Program).map(Program)
    }

    fn delete_program(&self, program: Option<Program>) {
        self.release(ResourceKind::Program, program.map(Program::name));
    }

    fn create_framebuffer(&self) -> Option<Framebuffer> {
        self.allocate(ResourceKind::Framebuffer).map(Framebuffer)
    }

    fn delete_framebuffer(&self, framebuffer: Option<Framebuffer>) {
        self.release(ResourceKind::Framebuffer, framebuffer.map(Framebuffer::name));
    }

    fn create_renderbuffer(&self) -> Option<Renderbuffer> {
        self.allocate(ResourceKind::Renderbuffer).map(Renderbuffer)
    }

    fn delete_renderbuffer(&self, renderbuffer: Option<Renderbuffer>) {
        self.release(
            ResourceKind::Renderbuffer,
            renderbuffer.map(Renderbuffer::name),
        );
    }

    fn create_vertex_array(&self) -> Option<VertexArray> {
        if !self.version.is_version2() {
            log::warn!("createVertexArray is not available on a version 1 context");
            return None;
        }
        self.allocate(ResourceKind::VertexArray).map(VertexArray)
    }

    fn delete_vertex_array(&self, vertex_array: Option<VertexArray>) {
        if self.version.is_version2() {
            self.release(ResourceKind::VertexArray, vertex_array.map(VertexArray::name));
        }
    }

    fn create_vertex_array_oes(&self) -> Option<VertexArray> {
        if !self.vao_extension() {
            log::warn!("createVertexArrayOES called without OES_vertex_array_object");
            return None;
        }
        self.allocate(ResourceKind::VertexArray).map(VertexArray)
    }

    fn delete_vertex_array_oes(&self, vertex_array: Option<VertexArray>) {
        if self.vao_extension() {
            self.release(ResourceKind::VertexArray, vertex_array.map(VertexArray::name));
        }
    }

    fn draw_arrays(&self, mode: u32, first: i32, count: i32) {
        self.state().record(GlCall::DrawArrays {
            mode,
            first,
            count,
            instances: None,
        });
    }

    fn draw_elements(&self, mode: u32, count: i32, element_type: u32, offset: i32) {
        self.state().record(GlCall::DrawElements {
            mode,
            count,
            element_type,
            offset,
            instances: None,
        });
    }

    fn draw_arrays_instanced(&self, mode: u32, first: i32, count: i32, instance_count: i32) {
        if !self.version.is_version2() {
            log::warn!("drawArraysInstanced is not available on a version 1 context");
            return;
        }
        self.state().record(GlCall::DrawArrays {
            mode,
            first,
            count,
            instances: Some(instance_count),
        });
    }

    fn draw_elements_instanced(
        &self,
        mode: u32,
        count: i32,
        element_type: u32,
        offset: i32,
        instance_count: i32,
    ) {
        if !self.version.is_version2() {
            log::warn!("drawElementsInstanced is not available on a version 1 context");
            return;
        }
        self.state().record(GlCall::DrawElements {
            mode,
            count,
            element_type,
            offset,
            instances: Some(instance_count),
        });
    }

    fn draw_arrays_instanced_angle(&self, mode: u32, first: i32, count: i32, instance_count: i32) {
        if !self.instancing_extension() {
            log::warn!("drawArraysInstancedANGLE called without ANGLE_instanced_arrays");
            return;
        }
        self.state().record(GlCall::DrawArrays {
            mode,
            first,
            count,
            instances: Some(instance_count),
        });
    }

    fn draw_elements_instanced_angle(
        &self,
        mode: u32,
        count: i32,
        element_type: u32,
        offset: i32,
        instance_count: i32,
    ) {
        if !self.instancing_extension() {
            log::warn!("drawElementsInstancedANGLE called without ANGLE_instanced_arrays");
            return;
        }
        self.state().record(GlCall::DrawElements {
            mode,
            count,
            element_type,
            offset,
            instances: Some(instance_count),
        });
    }

    fn active_texture(&self, unit: u32) {
        self.state().record(GlCall::ActiveTexture(unit));
    }

    fn bind_texture(&self, target: u32, texture: Option<Texture>) {
        self.state().record(GlCall::BindTexture {
            target,
            name: texture.map(Texture::name),
        });
    }

    fn bind_buffer(&self, target: u32, buffer: Option<Buffer>) {
        self.state().record(GlCall::BindBuffer {
            target,
            name: buffer.map(Buffer::name),
        });
    }

    fn use_program(&self, program: Option<Program>) {
        self.state()
            .record(GlCall::UseProgram(program.map(Program::name)));
    }

    fn buffer_data(&self, target: u32, data: BufferData<'_>, usage: u32) {
        self.state().record(GlCall::BufferData {
            target,
            bytes: data.byte_len(),
            usage,
        });
    }

    fn buffer_sub_data(&self, target: u32, offset: i32, data: BufferData<'_>) {
        self.state().record(GlCall::BufferSubData {
            target,
            offset,
            bytes: data.byte_len(),
        });
    }

    fn tex_image_2d(
        &self,
        target: u32,
        level: i32,
        _internal_format: i32,
        width: i32,
        height: i32,
        _border: i32,
        format: u32,
        pixel_type: u32,
        _pixels: Option<&[u8]>,
    ) {
        self.state().record(GlCall::TexImage2d {
            target,
            level,
            width,
            height,
            format,
            pixel_type,
        });
    }

    fn create_query(&self) -> Option<Query> {
        let timers = self.timer_extension();
        let mut state = self.state();
        if !timers {
            state.record(GlCall::CreateQuery(None));
            return None;
        }
        if state.failing_creates > 0 {
            state.failing_creates -= 1;
            state.record(GlCall::CreateQuery(None));
            return None;
        }
        let name = NonZeroU32::new(self.next_name.fetch_add(1, Ordering::Relaxed))?;
        state.queries.create(name.get());
        state.record(GlCall::CreateQuery(Some(name.get())));
        Some(Query(name))
    }

    fn delete_query(&self, query: Option<Query>) {
        let mut state = self.state();
        if let Some(query) = query {
            state.queries.delete(query.name());
        }
        state.record(GlCall::DeleteQuery(query.map(Query::name)));
    }

    fn begin_query(&self, target: u32, query: Query) {
        let timers = self.timer_extension();
        let mut state = self.state();
        if timers {
            state.queries.begin(query.name());
        }
        state.record(GlCall::BeginQuery {
            target,
            name: query.name(),
        });
    }

    fn end_query(&self, target: u32) {
        let timers = self.timer_extension();
        let mut state = self.state();
        if timers {
            state.queries.end();
        }
        state.record(GlCall::EndQuery(target));
    }

    fn query_result_available(&self, query: Query) -> bool {
        self.timer_extension() && self.state().queries.available(query.name())
    }

    fn query_result(&self, query: Query) -> u64 {
        if !self.timer_extension() {
            return 0;
        }
        self.state().queries.result(query.name())
    }

    fn gpu_disjoint(&self) -> bool {
        self.state().queries.take_disjoint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glprobe_core::gl;

    #[test]
    fn test_names_are_sequential_and_non_zero() {
        let ctx = HeadlessContext::webgl2();
        let a = ctx.create_texture().unwrap();
        let b = ctx.create_buffer().unwrap();
        assert_eq!(a.name(), 1);
        assert_eq!(b.name(), 2);
    }

    #[test]
    fn test_failed_creates_return_none() {
        let ctx = HeadlessContext::webgl2();
        ctx.fail_next_creates(1);
        assert!(ctx.create_texture().is_none());
        assert!(ctx.create_texture().is_some());
        assert_eq!(ctx.live_objects(ResourceKind::Texture), 1);
    }

    #[test]
    fn test_calls_are_recorded_in_order() {
        let ctx = HeadlessContext::webgl2();
        ctx.draw_arrays(gl::TRIANGLES, 0, 3);
        ctx.use_program(None);
        assert_eq!(
            ctx.calls(),
            vec![
                GlCall::DrawArrays {
                    mode: gl::TRIANGLES,
                    first: 0,
                    count: 3,
                    instances: None
                },
                GlCall::UseProgram(None),
            ]
        );
    }

    #[test]
    fn test_recording_can_be_disabled() {
        let ctx = HeadlessContext::webgl2();
        ctx.set_recording(false);
        ctx.draw_arrays(gl::TRIANGLES, 0, 3);
        assert_eq!(ctx.draw_count(), 0);
    }

    #[test]
    fn test_angle_draws_need_the_extension() {
        let ctx = HeadlessContext::webgl1();
        ctx.draw_arrays_instanced_angle(gl::TRIANGLES, 0, 3, 2);
        assert_eq!(ctx.draw_count(), 0);

        ctx.enable_extension(ext::ANGLE_INSTANCED_ARRAYS);
        ctx.draw_arrays_instanced_angle(gl::TRIANGLES, 0, 3, 2);
        assert_eq!(ctx.draw_count(), 1);
    }

    #[test]
    fn test_query_lifecycle() {
        let ctx = HeadlessContext::desktop_webgl2().with_default_query_ns(2_500_000);
        let query = ctx.create_query().unwrap();
        ctx.begin_query(gl::TIME_ELAPSED_EXT, query);
        assert!(ctx.is_query_running(query));
        ctx.end_query(gl::TIME_ELAPSED_EXT);

        assert!(ctx.query_result_available(query));
        assert_eq!(ctx.query_result(query), 2_500_000);

        ctx.delete_query(Some(query));
        assert_eq!(ctx.live_queries(), 0);
        assert_eq!(ctx.deleted_queries(), 1);
    }

    #[test]
    fn test_queries_need_the_timer_extension() {
        let ctx = HeadlessContext::webgl2();
        assert!(ctx.create_query().is_none());

        ctx.enable_extension(ext::EXT_DISJOINT_TIMER_QUERY_WEBGL2);
        let query = ctx.create_query().unwrap();
        ctx.begin_query(gl::TIME_ELAPSED_EXT, query);
        ctx.end_query(gl::TIME_ELAPSED_EXT);

        ctx.disable_extension(ext::EXT_DISJOINT_TIMER_QUERY_WEBGL2);
        assert!(!ctx.query_result_available(query));
        assert_eq!(ctx.query_result(query), 0);
        ctx.delete_query(Some(query));
        assert_eq!(ctx.live_queries(), 0);
    }
}
