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

//! Typed object names handed out by the headless context.

use glprobe_core::GpuHandle;
use std::num::NonZeroU32;

macro_rules! headless_handle {
    ($($(#[$doc:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $name(pub NonZeroU32);

            impl $name {
                /// The object name as the driver sees it.
                pub fn name(self) -> u32 {
                    self.0.get()
                }
            }

            impl GpuHandle for $name {
                fn raw(&self) -> u64 {
                    u64::from(self.0.get())
                }
            }
        )*
    };
}

headless_handle!(
    /// A headless texture name.
    Texture,
    /// A headless buffer name.
    Buffer,
    /// A headless shader name.
    Shader,
    /// A headless program name.
    Program,
    /// A headless framebuffer name.
    Framebuffer,
    /// A headless renderbuffer name.
    Renderbuffer,
    /// A headless vertex array name.
    VertexArray,
    /// A headless query name.
    Query,
);
