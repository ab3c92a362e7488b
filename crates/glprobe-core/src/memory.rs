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

//! Conservative GPU memory estimates for uploads.
//!
//! None of these figures are measured. They are what the upload asks the
//! driver to store, ignoring padding, mipmaps and compression.

use crate::gl;

/// Number of channels of an unsized pixel format.
///
/// Unknown formats count as four channels, the RGBA worst case.
pub fn channels(format: u32) -> u64 {
    match format {
        gl::RED | gl::RED_INTEGER | gl::ALPHA | gl::LUMINANCE | gl::DEPTH_COMPONENT => 1,
        gl::RG | gl::RG_INTEGER | gl::LUMINANCE_ALPHA | gl::DEPTH_STENCIL => 2,
        gl::RGB | gl::RGB_INTEGER | gl::SRGB_EXT => 3,
        gl::RGBA | gl::RGBA_INTEGER | gl::SRGB_ALPHA_EXT => 4,
        _ => 4,
    }
}

/// Bytes stored per channel for a component type, or `None` for packed types.
pub fn bytes_per_channel(pixel_type: u32) -> Option<u64> {
    match pixel_type {
        gl::BYTE | gl::UNSIGNED_BYTE => Some(1),
        gl::SHORT | gl::UNSIGNED_SHORT | gl::HALF_FLOAT | gl::HALF_FLOAT_OES => Some(2),
        gl::INT | gl::UNSIGNED_INT | gl::FLOAT => Some(4),
        _ => None,
    }
}

/// Bytes per pixel of a packed type, where the whole pixel shares one word.
fn packed_pixel_bytes(pixel_type: u32) -> Option<u64> {
    match pixel_type {
        gl::UNSIGNED_SHORT_5_6_5 | gl::UNSIGNED_SHORT_4_4_4_4 | gl::UNSIGNED_SHORT_5_5_5_1 => {
            Some(2)
        }
        gl::UNSIGNED_INT_24_8
        | gl::UNSIGNED_INT_2_10_10_10_REV
        | gl::UNSIGNED_INT_10F_11F_11F_REV
        | gl::UNSIGNED_INT_5_9_9_9_REV => Some(4),
        gl::FLOAT_32_UNSIGNED_INT_24_8_REV => Some(8),
        _ => None,
    }
}

/// Conservative bytes per pixel when only the internal format and type are
/// known: RGBA32F for float data, RGBA16F for half floats, RGBA8 otherwise.
pub fn bpp_for(internal_format: u32, pixel_type: u32) -> u64 {
    match internal_format {
        gl::RGBA32F => 16,
        gl::RGB32F => 12,
        gl::RGBA16F => 8,
        gl::RGB16F => 6,
        gl::RGBA8 => 4,
        _ => match pixel_type {
            gl::FLOAT => 16,
            gl::HALF_FLOAT | gl::HALF_FLOAT_OES => 8,
            _ => 4,
        },
    }
}

/// Bytes per pixel for a `(format, type)` upload pair.
pub fn bytes_per_pixel(format: u32, pixel_type: u32) -> u64 {
    if let Some(bytes) = packed_pixel_bytes(pixel_type) {
        return bytes;
    }
    match bytes_per_channel(pixel_type) {
        Some(per_channel) => channels(format) * per_channel,
        None => bpp_for(format, pixel_type),
    }
}

/// Estimated size of a full 2D image upload: `width × height × bpp`.
///
/// Non-positive dimensions yield zero.
pub fn texture_bytes(width: i32, height: i32, format: u32, pixel_type: u32) -> u64 {
    if width <= 0 || height <= 0 {
        return 0;
    }
    (width as u64)
        .saturating_mul(height as u64)
        .saturating_mul(bytes_per_pixel(format, pixel_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgba8_texture_bytes() {
        assert_eq!(
            texture_bytes(512, 512, gl::RGBA, gl::UNSIGNED_BYTE),
            1_048_576
        );
    }

    #[test]
    fn test_channel_classes() {
        assert_eq!(channels(gl::RGB), 3);
        assert_eq!(channels(gl::RGBA), 4);
        assert_eq!(channels(gl::LUMINANCE), 1);
        assert_eq!(channels(gl::ALPHA), 1);
        assert_eq!(channels(gl::LUMINANCE_ALPHA), 2);
        assert_eq!(channels(gl::RG), 2);
        assert_eq!(channels(0xDEAD), 4);
    }

    #[test]
    fn test_component_types() {
        assert_eq!(bytes_per_pixel(gl::RGB, gl::UNSIGNED_BYTE), 3);
        assert_eq!(bytes_per_pixel(gl::RGBA, gl::HALF_FLOAT), 8);
        assert_eq!(bytes_per_pixel(gl::RGBA, gl::HALF_FLOAT_OES), 8);
        assert_eq!(bytes_per_pixel(gl::RGBA, gl::FLOAT), 16);
        assert_eq!(bytes_per_pixel(gl::LUMINANCE, gl::FLOAT), 4);
    }

    #[test]
    fn test_packed_types_ignore_channel_count() {
        assert_eq!(bytes_per_pixel(gl::RGB, gl::UNSIGNED_SHORT_5_6_5), 2);
        assert_eq!(bytes_per_pixel(gl::RGBA, gl::UNSIGNED_SHORT_4_4_4_4), 2);
        assert_eq!(bytes_per_pixel(gl::DEPTH_STENCIL, gl::UNSIGNED_INT_24_8), 4);
    }

    #[test]
    fn test_bpp_fallback() {
        assert_eq!(bpp_for(0, gl::FLOAT), 16);
        assert_eq!(bpp_for(0, gl::HALF_FLOAT_OES), 8);
        assert_eq!(bpp_for(0, gl::UNSIGNED_BYTE), 4);
        assert_eq!(bytes_per_pixel(gl::RGBA, 0xBEEF), 4);
    }

    #[test]
    fn test_degenerate_dimensions() {
        assert_eq!(texture_bytes(0, 512, gl::RGBA, gl::UNSIGNED_BYTE), 0);
        assert_eq!(texture_bytes(512, -1, gl::RGBA, gl::UNSIGNED_BYTE), 0);
    }
}
