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

//! GPU resource records as reported by the resource tracker.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The seven trackable native object categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Texture objects.
    Texture,
    /// Buffer objects.
    Buffer,
    /// Shader objects.
    Shader,
    /// Program objects.
    Program,
    /// Framebuffer objects.
    Framebuffer,
    /// Renderbuffer objects.
    Renderbuffer,
    /// Vertex array objects.
    #[serde(rename = "vao")]
    VertexArray,
}

impl ResourceKind {
    /// An array containing all `ResourceKind` variants.
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::Texture,
        ResourceKind::Buffer,
        ResourceKind::Shader,
        ResourceKind::Program,
        ResourceKind::Framebuffer,
        ResourceKind::Renderbuffer,
        ResourceKind::VertexArray,
    ];

    /// The lowercase name used in exports and logs.
    pub fn name(self) -> &'static str {
        match self {
            ResourceKind::Texture => "texture",
            ResourceKind::Buffer => "buffer",
            ResourceKind::Shader => "shader",
            ResourceKind::Program => "program",
            ResourceKind::Framebuffer => "framebuffer",
            ResourceKind::Renderbuffer => "renderbuffer",
            ResourceKind::VertexArray => "vao",
        }
    }

    /// The three-letter prefix of record ids (`tex_7`).
    pub fn id_prefix(self) -> &'static str {
        &self.name()[..3]
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bookkeeping for one live GPU resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecord {
    /// Kind-prefixed, monotonically assigned id such as `tex_7`.
    pub id: String,
    /// The resource category.
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    /// Bytes attributed to this resource by uploads, if any.
    #[serde(rename = "estBytes", skip_serializing_if = "Option::is_none")]
    pub estimated_bytes: Option<u64>,
    /// Milliseconds since the tracker started, at creation.
    pub created_at: f64,
    /// Milliseconds since the tracker started, at the last bind or upload.
    pub last_used: f64,
    /// An application supplied label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Free-form diagnostics: creation stack, shader stage.
    #[serde(rename = "meta", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// A point-in-time view of the resource registry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSummary {
    /// Live resources per kind. Every kind is present.
    pub by_kind: BTreeMap<ResourceKind, usize>,
    /// Running byte estimate of all uploads minus deleted resources' bytes.
    pub est_bytes: u64,
    /// Live resources in creation order.
    pub list: Vec<ResourceRecord>,
}

impl ResourceSummary {
    /// Live resources of `kind`.
    pub fn count(&self, kind: ResourceKind) -> usize {
        self.by_kind.get(&kind).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_prefixes() {
        let prefixes: Vec<_> = ResourceKind::ALL.iter().map(|k| k.id_prefix()).collect();
        assert_eq!(prefixes, ["tex", "buf", "sha", "pro", "fra", "ren", "vao"]);
    }

    #[test]
    fn test_kind_serializes_as_map_key() {
        let mut by_kind = BTreeMap::new();
        by_kind.insert(ResourceKind::VertexArray, 2usize);
        by_kind.insert(ResourceKind::Texture, 3usize);
        let json = serde_json::to_string(&by_kind).unwrap();
        assert_eq!(json, r#"{"texture":3,"vao":2}"#);
    }

    #[test]
    fn test_record_field_names() {
        let record = ResourceRecord {
            id: "buf_1".to_string(),
            kind: ResourceKind::Buffer,
            estimated_bytes: Some(1024),
            created_at: 1.0,
            last_used: 2.0,
            label: None,
            metadata: BTreeMap::new(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["type"], "buffer");
        assert_eq!(value["estBytes"], 1024);
        assert_eq!(value["createdAt"], 1.0);
        assert!(value.get("label").is_none());
    }
}
