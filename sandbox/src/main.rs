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

// glprobe Sandbox
// Runs a few rendering workloads against a headless context and prints the
// exported session.
//
// Usage: sandbox [config.json|config.ron]

use anyhow::{Context, Result};
use glprobe_core::{gl, BufferData, GraphicsContext, ResourceKind, TimerKind};
use glprobe_infra::HeadlessContext;
use glprobe_telemetry::{
    format_shader_error, DebugMode, DebugSession, SessionConfig, ShaderStage,
};
use std::collections::BTreeMap;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    color: [f32; 3],
}

const CUBE_VERTICES: usize = 36;

fn cube() -> Vec<Vertex> {
    (0..CUBE_VERTICES)
        .map(|i| {
            let t = i as f32 / CUBE_VERTICES as f32;
            Vertex {
                position: [t, 1.0 - t, 0.5],
                color: [1.0, t, 0.0],
            }
        })
        .collect()
}

type Session = DebugSession<HeadlessContext>;

/// Many small draws sharing one buffer and alternating between two programs.
fn stress(session: &mut Session) {
    let gl = session.gl();
    let vertices = cube();
    let buffer = gl.create_buffer();
    gl.bind_buffer(gl::ARRAY_BUFFER, buffer);
    gl.buffer_data(gl::ARRAY_BUFFER, BufferData::typed(&vertices), gl::STATIC_DRAW);
    let programs = [gl.create_program(), gl.create_program()];

    for frame in 0..30 {
        session.begin_frame();
        let gl = session.gl();
        for i in 0..100 {
            gl.use_program(programs[(i / 50) % 2]);
            gl.draw_arrays(gl::TRIANGLES, 0, CUBE_VERTICES as i32);
        }
        session.end_frame();
        if frame == 0 {
            log::info!("stress: {:?}", session.snapshot().counters);
        }
    }
}

/// One instanced draw replacing a thousand individual ones.
fn instancing(session: &mut Session) {
    session.begin_frame();
    let gl = session.gl();
    let texture = gl.create_texture();
    gl.active_texture(gl::TEXTURE0);
    gl.bind_texture(gl::TEXTURE_2D, texture);
    gl.tex_image_2d(
        gl::TEXTURE_2D,
        0,
        gl::RGBA as i32,
        512,
        512,
        0,
        gl::RGBA,
        gl::UNSIGNED_BYTE,
        None,
    );
    if let Some(texture) = texture {
        session.label_resource(ResourceKind::Texture, texture, "instance atlas");
    }
    gl.draw_arrays_instanced(gl::TRIANGLES, 0, CUBE_VERTICES as i32, 1000);
    session.end_frame();

    let counters = session.snapshot().counters;
    log::info!(
        "instancing: {} draw call(s), {} triangles",
        counters.draw_calls,
        counters.triangles
    );
}

/// Creates resources every frame and only frees half of them.
fn leak(session: &mut Session) {
    for _ in 0..10 {
        session.begin_frame();
        let gl = session.gl();
        let buffers: Vec<_> = (0..4).map(|_| gl.create_buffer()).collect();
        for buffer in &buffers {
            gl.bind_buffer(gl::ARRAY_BUFFER, *buffer);
            gl.buffer_data(gl::ARRAY_BUFFER, BufferData::Size(4096), gl::DYNAMIC_DRAW);
        }
        for buffer in buffers.into_iter().take(2) {
            gl.delete_buffer(buffer);
        }
        session.end_frame();
    }
    let resources = session.resources();
    log::warn!(
        "leak: {} buffers alive, ~{} bytes",
        resources.count(ResourceKind::Buffer),
        resources.est_bytes
    );
}

/// A frame split into timed render passes.
fn post_passes(session: &mut Session) {
    for _ in 0..5 {
        session.begin_frame();
        let gl = session.gl();
        let timers = session.gpu_timers();
        for pass in ["Shadow", "Opaque", "Bloom", "Tonemap"] {
            timers.begin(gl, pass, TimerKind::Pass, BTreeMap::new());
            gl.draw_arrays(gl::TRIANGLE_STRIP, 0, 4);
            timers.end(gl);
            session.push_pass(pass);
        }
        session.inc_custom("fullscreen_quads", 4.0);
        session.end_frame();
    }
    for bottleneck in session.gpu_timers().bottlenecks(3) {
        log::info!("post: {} took {:.3} ms", bottleneck.label, bottleneck.time);
    }
}

fn shader_report() {
    let source = "precision mediump float;\nvoid main() {\n  gl_FragColor = vec4(color, 1.0);\n}";
    let log = "ERROR: 0:3: 'color' : undeclared identifier";
    let report = format_shader_error(source, log, ShaderStage::Fragment);
    log::info!("shader report:\n{}", report.formatted_output);
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => SessionConfig::from_file(&path)
            .with_context(|| format!("loading session config from {path}"))?,
        None => SessionConfig::with_mode(DebugMode::Full),
    };

    let mut session = DebugSession::new(HeadlessContext::desktop_webgl2(), config);
    log::info!("Capabilities: {:?}", session.caps());

    stress(&mut session);
    instancing(&mut session);
    leak(&mut session);
    post_passes(&mut session);
    shader_report();

    println!("{}", session.export_session()?);
    println!("{}", session.gpu_timers().export_timeline()?);
    Ok(())
}
