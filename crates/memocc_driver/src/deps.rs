//! Dependency discovery through the compiler's own listing mode.
//!
//! The compiler is re-run with the dependency flag appended and prints one
//! make-style rule per output:
//!
//! ```text
//! shader.spv: shader.vert include/common.glsl
//! ```
//!
//! The parser understands whitespace-separated inputs, backslash line
//! continuations, blank lines, and rules with no inputs. Anything else fails
//! the whole listing so the caller can fall back to an uncached compile.

use std::path::{Path, PathBuf};

use memocc_config::Settings;
use tracing::debug;

use crate::compiler::Compiler;
use crate::error::DependencyError;
use crate::invocation::Invocation;

/// One output and the inputs that contribute to it, in listed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEntry {
    /// Output file path.
    pub output: PathBuf,
    /// Input file paths.
    pub inputs: Vec<PathBuf>,
}

/// Ordered mapping from each declared output to its inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyMap {
    entries: Vec<DependencyEntry>,
}

impl DependencyMap {
    /// Builds a map from entries, keeping their order.
    pub fn new(entries: Vec<DependencyEntry>) -> Self {
        Self { entries }
    }

    /// Returns the entries in order.
    pub fn entries(&self) -> &[DependencyEntry] {
        &self.entries
    }

    /// Iterates over the declared outputs.
    pub fn outputs(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(|e| e.output.as_path())
    }

    /// Iterates over every input of every output, in map then list order.
    pub fn inputs(&self) -> impl Iterator<Item = &Path> {
        self.entries
            .iter()
            .flat_map(|e| e.inputs.iter().map(PathBuf::as_path))
    }

    /// Returns the number of outputs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no outputs are declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Folds every entry into a single output that depends on all inputs.
    pub fn collapse(self, output: PathBuf) -> Self {
        let inputs = self.entries.into_iter().flat_map(|e| e.inputs).collect();
        Self {
            entries: vec![DependencyEntry { output, inputs }],
        }
    }
}

/// Parses the text printed by the compiler's dependency-listing mode.
pub fn parse_listing(text: &str) -> Result<DependencyMap, DependencyError> {
    let mut entries = Vec::new();
    let mut pending = String::new();
    let mut start_line = 0;

    for (idx, raw) in text.lines().enumerate() {
        if pending.is_empty() {
            start_line = idx + 1;
        }
        let line = raw.trim_end();
        if let Some(continued) = line.strip_suffix('\\') {
            pending.push_str(continued);
            pending.push(' ');
            continue;
        }
        pending.push_str(line);
        let logical = std::mem::take(&mut pending);
        if let Some(entry) = parse_rule(&logical, start_line)? {
            entries.push(entry);
        }
    }
    if !pending.is_empty() {
        if let Some(entry) = parse_rule(&pending, start_line)? {
            entries.push(entry);
        }
    }

    if entries.is_empty() {
        return Err(DependencyError::Empty);
    }
    Ok(DependencyMap::new(entries))
}

fn parse_rule(line: &str, line_no: usize) -> Result<Option<DependencyEntry>, DependencyError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let unparseable = || DependencyError::Unparseable {
        line_no,
        line: line.to_string(),
    };

    // Split on ": " rather than the first ':' so drive-letter paths survive.
    let (output, inputs) = match line.find(": ") {
        Some(idx) => (&line[..idx], &line[idx + 2..]),
        None => match line.strip_suffix(':') {
            Some(output) => (output, ""),
            None => return Err(unparseable()),
        },
    };
    let output = output.trim();
    if output.is_empty() || output.contains(char::is_whitespace) {
        return Err(unparseable());
    }

    Ok(Some(DependencyEntry {
        output: PathBuf::from(output),
        inputs: inputs.split_whitespace().map(PathBuf::from).collect(),
    }))
}

/// Asks the compiler which inputs each output of `invocation` depends on.
///
/// When the invocation carries none of the compile-only flags the compiler
/// links, and link mode names its product differently from listing mode: the
/// map is collapsed onto the `-o` target if one is given, otherwise onto the
/// configured default output name.
pub fn resolve_dependencies<C: Compiler + ?Sized>(
    compiler: &C,
    invocation: &Invocation,
    settings: &Settings,
) -> Result<DependencyMap, DependencyError> {
    let listing = compiler.capture(&invocation.with_arg(&settings.dependency_flag))?;
    if listing.exit_code != 0 {
        return Err(DependencyError::ExitStatus {
            code: listing.exit_code,
            stderr: String::from_utf8_lossy(&listing.stderr).trim().to_string(),
        });
    }
    let text = String::from_utf8(listing.stdout).map_err(|_| DependencyError::NotUtf8)?;
    let map = parse_listing(&text)?;

    if invocation.has_any_flag(&settings.compile_only_flags) {
        debug!(outputs = map.len(), "compile-only dependency map");
        return Ok(map);
    }
    let output = invocation
        .output_arg()
        .unwrap_or_else(|| PathBuf::from(&settings.default_output));
    debug!(output = %output.display(), "link mode, collapsing dependency map");
    Ok(map.collapse(output))
}
