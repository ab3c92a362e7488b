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

//! Static capability detection for a graphics context.

use crate::context::GraphicsContext;
use serde::{Deserialize, Serialize};

/// Extension names probed by [`Capabilities::detect`].
pub mod ext {
    /// Instanced draws on a version 1 context.
    pub const ANGLE_INSTANCED_ARRAYS: &str = "ANGLE_instanced_arrays";
    /// Vertex array objects on a version 1 context.
    pub const OES_VERTEX_ARRAY_OBJECT: &str = "OES_vertex_array_object";
    /// Multiple render targets on a version 1 context.
    pub const WEBGL_DRAW_BUFFERS: &str = "WEBGL_draw_buffers";
    /// Depth textures on a version 1 context.
    pub const WEBGL_DEPTH_TEXTURE: &str = "WEBGL_depth_texture";
    /// Float color attachments.
    pub const EXT_COLOR_BUFFER_FLOAT: &str = "EXT_color_buffer_float";
    /// Float color attachments, version 1 spelling.
    pub const WEBGL_COLOR_BUFFER_FLOAT: &str = "WEBGL_color_buffer_float";
    /// Half-float color attachments.
    pub const EXT_COLOR_BUFFER_HALF_FLOAT: &str = "EXT_color_buffer_half_float";
    /// Unmasked vendor and renderer strings.
    pub const WEBGL_DEBUG_RENDERER_INFO: &str = "WEBGL_debug_renderer_info";
    /// GPU timer queries on a version 1 context.
    pub const EXT_DISJOINT_TIMER_QUERY: &str = "EXT_disjoint_timer_query";
    /// GPU timer queries on a version 2 context.
    pub const EXT_DISJOINT_TIMER_QUERY_WEBGL2: &str = "EXT_disjoint_timer_query_webgl2";
}

/// Which flavour of GPU timer queries a context offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerTier {
    /// No timer queries; every timing operation degrades to a no-op.
    #[default]
    None,
    /// `EXT_disjoint_timer_query` on a version 1 context.
    Tier1,
    /// `EXT_disjoint_timer_query_webgl2` on a version 2 context.
    Tier2,
}

impl TimerTier {
    /// Returns `true` if GPU timing is possible at all.
    pub fn is_supported(self) -> bool {
        !matches!(self, TimerTier::None)
    }
}

/// Optional features of a context, resolved from core support or extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionSupport {
    /// Instanced draws.
    pub instanced: bool,
    /// Vertex array objects.
    pub vao: bool,
    /// Multiple render targets.
    pub mrt: bool,
    /// Depth textures.
    pub depth_texture: bool,
    /// Float color attachments.
    pub color_buffer_float: bool,
    /// Half-float color attachments.
    pub color_buffer_half_float: bool,
    /// Unmasked vendor and renderer strings.
    pub debug_renderer_info: bool,
    /// GPU timer query flavour.
    pub timer_tier: TimerTier,
}

/// The capability set of a context, computed once and then read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    /// `true` for a version 2 context.
    #[serde(rename = "webgl2")]
    pub is_version2: bool,
    /// Optional feature support.
    #[serde(rename = "ext")]
    pub extensions: ExtensionSupport,
}

impl Capabilities {
    /// Probes `gl` for its API level and extensions.
    ///
    /// Features that are core on version 2 report `true` there regardless of
    /// extensions. The timer tier follows the context version: a version 2
    /// context only accepts the `_webgl2` timer extension.
    pub fn detect<C: GraphicsContext + ?Sized>(gl: &C) -> Self {
        let is_version2 = gl.version().is_version2();
        let has = |name: &str| gl.supports_extension(name);

        let timer_tier = if is_version2 {
            if has(ext::EXT_DISJOINT_TIMER_QUERY_WEBGL2) {
                TimerTier::Tier2
            } else {
                TimerTier::None
            }
        } else if has(ext::EXT_DISJOINT_TIMER_QUERY) {
            TimerTier::Tier1
        } else {
            TimerTier::None
        };

        let capabilities = Self {
            is_version2,
            extensions: ExtensionSupport {
                instanced: is_version2 || has(ext::ANGLE_INSTANCED_ARRAYS),
                vao: is_version2 || has(ext::OES_VERTEX_ARRAY_OBJECT),
                mrt: is_version2 || has(ext::WEBGL_DRAW_BUFFERS),
                depth_texture: is_version2 || has(ext::WEBGL_DEPTH_TEXTURE),
                color_buffer_float: has(ext::EXT_COLOR_BUFFER_FLOAT)
                    || has(ext::WEBGL_COLOR_BUFFER_FLOAT),
                color_buffer_half_float: has(ext::EXT_COLOR_BUFFER_HALF_FLOAT),
                debug_renderer_info: has(ext::WEBGL_DEBUG_RENDERER_INFO),
                timer_tier,
            },
        };
        log::debug!("Detected context capabilities: {capabilities:?}");
        capabilities
    }

    /// Shorthand for `extensions.timer_tier.is_supported()`.
    pub fn gpu_timers(&self) -> bool {
        self.extensions.timer_tier.is_supported()
    }
}
