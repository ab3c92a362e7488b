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

//! Errors of the fallible telemetry surfaces.
//!
//! Instrumentation itself never fails; only exporting and configuration do.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while exporting telemetry or loading configuration.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A report could not be serialized.
    #[error("failed to serialize telemetry: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A configuration file has an extension we cannot parse.
    #[error("unsupported configuration format for {path}")]
    UnsupportedFormat {
        /// The offending path.
        path: PathBuf,
    },

    /// Reading or writing a file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}
