//! The argument list of one compiler invocation.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// A compiler invocation: the resolved compiler path plus the caller's
/// arguments, kept exactly as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: PathBuf,
    args: Vec<OsString>,
}

impl Invocation {
    /// Creates an invocation of `program` with `args`.
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the compiler path.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Returns the arguments, excluding the program.
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Returns the full argument vector with the program in position 0.
    pub fn argv(&self) -> Vec<&OsStr> {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .collect()
    }

    /// Returns a copy with one more argument appended.
    pub fn with_arg(&self, arg: impl Into<OsString>) -> Self {
        let mut next = self.clone();
        next.args.push(arg.into());
        next
    }

    /// Returns `true` if any argument equals one of `flags` exactly.
    pub fn has_any_flag(&self, flags: &[String]) -> bool {
        self.args
            .iter()
            .any(|arg| flags.iter().any(|flag| arg.as_os_str() == OsStr::new(flag)))
    }

    /// Returns `true` if any argument equals one of `flags` or starts with one.
    ///
    /// Catches flags written with their value joined on, like `-MFdeps.d`.
    pub fn has_any_flag_prefix(&self, flags: &[String]) -> bool {
        self.args.iter().any(|arg| {
            let Some(text) = arg.to_str() else {
                return false;
            };
            flags
                .iter()
                .any(|flag| !flag.is_empty() && text.starts_with(flag.as_str()))
        })
    }

    /// Returns the output file named by `-o <file>` or `-o<file>`.
    ///
    /// The last occurrence wins, as it does for the compiler.
    pub fn output_arg(&self) -> Option<PathBuf> {
        let mut output = None;
        let mut args = self.args.iter();
        while let Some(arg) = args.next() {
            let Some(text) = arg.to_str() else {
                continue;
            };
            if text == "-o" {
                if let Some(next) = args.next() {
                    output = Some(PathBuf::from(next));
                }
            } else if let Some(rest) = text.strip_prefix("-o") {
                output = Some(PathBuf::from(rest));
            }
        }
        output
    }
}
