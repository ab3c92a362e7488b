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

//! Shader info-log tooling: source concatenation with line mapping, log
//! parsing and annotated error reports.
//!
//! These are pure functions over strings. They never touch a context or the
//! tracking engine.

use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Source lines shown around each error in a report.
const CONTEXT_LINES: usize = 3;
const RULE_WIDTH: usize = 50;

/// One named piece of shader source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceChunk {
    /// File or module name reported back in errors.
    pub file: String,
    /// GLSL code.
    pub code: String,
}

impl SourceChunk {
    /// Creates a chunk.
    pub fn new(file: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            code: code.into(),
        }
    }
}

/// Where one line of concatenated source came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineMapping {
    /// Source-string number set by the chunk's `#line` directive.
    pub source: u32,
    /// Line number the compiler reports for this line.
    pub glsl_line: u32,
    /// Originating file.
    pub file: String,
    /// Line within the originating file.
    pub file_line: u32,
}

/// Concatenated source and its line map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedSource {
    /// The code to hand to the compiler.
    pub code: String,
    /// One entry per non-directive line.
    pub map: Vec<LineMapping>,
}

impl MappedSource {
    /// Looks up the origin of a compiler-reported `(source, line)` pair.
    pub fn resolve(&self, source: u32, glsl_line: u32) -> Option<&LineMapping> {
        self.map
            .iter()
            .find(|m| m.source == source && m.glsl_line == glsl_line)
    }
}

/// Concatenates chunks, resetting the compiler's line counter before each one
/// so errors can be mapped back to files.
///
/// Chunk `i` is preceded by `#line 1 i`, making the compiler report its lines
/// as `i:<line>`. A `#version` directive opening the first chunk must stay the
/// first line of the shader, so it is emitted before the directive, which
/// then resumes at line 2.
pub fn concat_with_line_directives(chunks: &[SourceChunk]) -> MappedSource {
    let mut mapped = MappedSource::default();
    for (index, chunk) in chunks.iter().enumerate() {
        let source = index as u32;
        let lines: Vec<&str> = chunk.code.split('\n').collect();
        let leading = usize::from(
            index == 0
                && lines
                    .first()
                    .is_some_and(|line| line.trim_start().starts_with("#version")),
        );

        for (line_index, line) in lines.iter().enumerate() {
            if line_index == leading {
                // Infallible on String.
                let _ = writeln!(mapped.code, "#line {} {source}", line_index + 1);
            }
            let line_no = line_index as u32 + 1;
            mapped.map.push(LineMapping {
                source,
                glsl_line: line_no,
                file: chunk.file.clone(),
                file_line: line_no,
            });
            mapped.code.push_str(line);
            mapped.code.push('\n');
        }
    }
    mapped
}

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Compilation failed.
    Error,
    /// Diagnostic only.
    Warning,
}

#[derive(Debug)]
struct LogEntry<'a> {
    severity: Severity,
    source: u32,
    line: u32,
    message: &'a str,
    raw: &'a str,
}

/// Parses `ERROR: <source>:<line>: <message>` and `WARNING: ...` lines.
fn parse_entries(log: &str) -> impl Iterator<Item = LogEntry<'_>> {
    log.lines().filter_map(|text| {
        let (severity, start, tag_len) = match (text.find("ERROR:"), text.find("WARNING:")) {
            (Some(at), _) => (Severity::Error, at, "ERROR:".len()),
            (None, Some(at)) => (Severity::Warning, at, "WARNING:".len()),
            (None, None) => return None,
        };
        let mut parts = text[start + tag_len..].splitn(3, ':');
        let source = parts.next()?.trim().parse().ok()?;
        let line = parts.next()?.trim().parse().ok()?;
        let message = parts.next()?.trim();
        Some(LogEntry {
            severity,
            source,
            line,
            message,
            raw: text[start..].trim_end(),
        })
    })
}

/// An error mapped back to its originating file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedError {
    /// Originating file.
    pub file: String,
    /// Line within that file.
    pub line: u32,
    /// Compiler message.
    pub message: String,
    /// The log line the error was parsed from.
    pub raw: String,
}

/// Extracts the errors of a compiler log and maps them through `mapped`.
/// Entries that do not map to a known line are dropped.
pub fn parse_info_log(log: &str, mapped: &MappedSource) -> Vec<ParsedError> {
    parse_entries(log)
        .filter(|entry| entry.severity == Severity::Error)
        .filter_map(|entry| {
            let origin = mapped.resolve(entry.source, entry.line)?;
            Some(ParsedError {
                file: origin.file.clone(),
                line: origin.file_line,
                message: entry.message.to_string(),
                raw: entry.raw.to_string(),
            })
        })
        .collect()
}

/// The stage a shader belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaderStage {
    /// Vertex shader.
    Vertex,
    /// Fragment shader.
    Fragment,
}

impl ShaderStage {
    /// Maps a shader type constant.
    pub fn from_gl(shader_type: u32) -> Option<Self> {
        match shader_type {
            glprobe_core::gl::VERTEX_SHADER => Some(Self::Vertex),
            glprobe_core::gl::FRAGMENT_SHADER => Some(Self::Fragment),
            _ => None,
        }
    }

    /// Lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
        }
    }
}

/// One diagnostic of a shader compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderErrorInfo {
    /// 1-based line in the shader source.
    pub line: u32,
    /// Compiler message.
    pub message: String,
    /// Error or warning.
    #[serde(rename = "type")]
    pub severity: Severity,
    /// Stage of the failing shader.
    pub stage: ShaderStage,
}

/// An annotated compilation report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShaderErrorReport {
    /// Diagnostics in log order.
    pub errors: Vec<ShaderErrorInfo>,
    /// Plain-text report with context around each diagnostic.
    pub formatted_output: String,
    /// The whole source with line numbers.
    pub source_with_line_numbers: String,
}

/// Builds an annotated report from a shader's source and its info log.
pub fn format_shader_error(source: &str, log: &str, stage: ShaderStage) -> ShaderErrorReport {
    let errors: Vec<ShaderErrorInfo> = parse_entries(log)
        .map(|entry| ShaderErrorInfo {
            line: entry.line,
            message: entry.message.to_string(),
            severity: if entry.severity == Severity::Warning
                || entry.message.to_lowercase().contains("warning")
            {
                Severity::Warning
            } else {
                Severity::Error
            },
            stage,
        })
        .collect();

    let lines: Vec<&str> = source.split('\n').collect();
    let source_with_line_numbers = lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{:>4} | {line}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");

    // Writing to a String cannot fail.
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} SHADER COMPILATION FAILED",
        stage.name().to_uppercase()
    );
    let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));

    for (n, error) in errors.iter().enumerate() {
        let tag = match error.severity {
            Severity::Error => "Error",
            Severity::Warning => "Warning",
        };
        let _ = writeln!(
            out,
            "\n{tag} {}/{} at line {}:\n   {}\n",
            n + 1,
            errors.len(),
            error.line,
            error.message
        );

        let Some(target) = (error.line as usize).checked_sub(1) else {
            continue;
        };
        if target >= lines.len() {
            continue;
        }
        let first = target.saturating_sub(CONTEXT_LINES);
        let last = (target + CONTEXT_LINES).min(lines.len() - 1);
        for (i, line) in lines.iter().enumerate().take(last + 1).skip(first) {
            let marker = if i == target { '>' } else { ' ' };
            let _ = writeln!(out, "{marker} {:>4} | {line}", i + 1);
            if i == target {
                let _ = writeln!(out, "{}^^^", " ".repeat(8));
            }
        }
    }
    let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));

    ShaderErrorReport {
        errors,
        formatted_output: out,
        source_with_line_numbers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks() -> Vec<SourceChunk> {
        vec![
            SourceChunk::new("common.glsl", "precision mediump float;\nuniform float uTime;"),
            SourceChunk::new("main.frag", "void main() {\n  gl_FragColor = vec4(x);\n}"),
        ]
    }

    #[test]
    fn test_concat_inserts_directives_and_maps_lines() {
        let mapped = concat_with_line_directives(&chunks());
        assert!(mapped.code.starts_with("#line 1 0\nprecision mediump float;\n"));
        assert!(mapped.code.contains("#line 1 1\nvoid main() {\n"));
        assert_eq!(mapped.map.len(), 5);

        let origin = mapped.resolve(1, 2).expect("mapped");
        assert_eq!(origin.file, "main.frag");
        assert_eq!(origin.file_line, 2);
    }

    #[test]
    fn test_version_directive_stays_first() {
        let chunks = vec![
            SourceChunk::new("header.glsl", "#version 300 es\nprecision highp float;"),
            SourceChunk::new("main.frag", "void main() {}"),
        ];
        let mapped = concat_with_line_directives(&chunks);
        assert!(mapped
            .code
            .starts_with("#version 300 es\n#line 2 0\nprecision highp float;\n"));
        assert!(mapped.code.contains("#line 1 1\nvoid main() {}\n"));

        let origin = mapped.resolve(0, 2).expect("mapped");
        assert_eq!(origin.file, "header.glsl");
        assert_eq!(origin.file_line, 2);
    }

    #[test]
    fn test_parse_info_log_maps_to_files() {
        let mapped = concat_with_line_directives(&chunks());
        let log = "ERROR: 1:2: 'x' : undeclared identifier\n\
                   WARNING: 0:1: precision ignored\n\
                   ERROR: 7:99: out of range\n";
        let errors = parse_info_log(log, &mapped);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].file, "main.frag");
        assert_eq!(errors[0].line, 2);
        assert_eq!(errors[0].message, "'x' : undeclared identifier");
        assert_eq!(errors[0].raw, "ERROR: 1:2: 'x' : undeclared identifier");
    }

    #[test]
    fn test_garbage_log_yields_nothing() {
        let mapped = concat_with_line_directives(&chunks());
        assert!(parse_info_log("", &mapped).is_empty());
        assert!(parse_info_log("ERROR: oops", &mapped).is_empty());
    }

    #[test]
    fn test_format_marks_the_failing_line() {
        let source = "a\nb\nc\nd\ne\nf\ng\nh";
        let log = "ERROR: 0:5: syntax error";
        let report = format_shader_error(source, log, ShaderStage::Fragment);

        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].severity, Severity::Error);
        let out = &report.formatted_output;
        assert!(out.starts_with("FRAGMENT SHADER COMPILATION FAILED"));
        assert!(out.contains("Error 1/1 at line 5:"));
        assert!(out.contains(">    5 | e"));
        assert!(out.contains("     2 | b"));
        assert!(out.contains("     8 | h"));
        assert!(!out.contains("     1 | a"));
    }

    #[test]
    fn test_warnings_are_classified() {
        let log = "WARNING: 0:1: unused\nERROR: 0:2: warning: implicit cast";
        let report = format_shader_error("x\ny", log, ShaderStage::Vertex);
        assert!(report
            .errors
            .iter()
            .all(|e| e.severity == Severity::Warning));
    }

    #[test]
    fn test_out_of_range_line_has_no_context() {
        let report = format_shader_error("x", "ERROR: 0:40: eof", ShaderStage::Vertex);
        assert!(report.formatted_output.contains("at line 40"));
        assert!(!report.formatted_output.contains('>'));
    }

    #[test]
    fn test_numbered_source() {
        let report = format_shader_error("x\ny", "", ShaderStage::Vertex);
        assert_eq!(report.source_with_line_numbers, "   1 | x\n   2 | y");
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_stage_from_gl() {
        use glprobe_core::gl;
        assert_eq!(ShaderStage::from_gl(gl::VERTEX_SHADER), Some(ShaderStage::Vertex));
        assert_eq!(ShaderStage::from_gl(0), None);
    }
}
