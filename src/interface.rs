use std::path::{Path, PathBuf};

use crate::error::{RtmlError, RtmlResult};
use crate::signature::Param;

/// Settings for one compile run.
///
/// # Examples
///
/// ```
/// use rtml::CompileOptions;
///
/// let options = CompileOptions::default().with_runtime_path("crate::rt");
/// assert_eq!(options.extension, "rtml");
/// assert_eq!(options.runtime_path, "crate::rt");
/// assert!(options.header);
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompileOptions {
    /// Template file extension, without the dot.
    pub extension: String,
    /// Path of the runtime module as seen from the generated code.
    pub runtime_path: String,
    /// Whether to start the output with an `@generated` comment.
    pub header: bool,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_extension<E: Into<String>>(mut self, extension: E) -> Self {
        self.extension = extension.into();
        self
    }

    #[must_use]
    pub fn with_runtime_path<P: Into<String>>(mut self, runtime_path: P) -> Self {
        self.runtime_path = runtime_path.into();
        self
    }

    #[must_use]
    pub const fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            extension: "rtml".to_string(),
            runtime_path: "::rtml::runtime".to_string(),
            header: true,
        }
    }
}

/// A template source and its path relative to the template root.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateFile {
    pub path: PathBuf,
    pub content: String,
}

impl TemplateFile {
    pub fn new<P: Into<PathBuf>, C: Into<String>>(path: P, content: C) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Reads `root/relative`, keeping `relative` as the template path.
    ///
    /// # Errors
    /// - If the file cannot be read as UTF-8 text.
    pub fn load<P: Into<PathBuf>>(root: &Path, relative: P) -> RtmlResult<Self> {
        let path = relative.into();
        let full = root.join(&path);
        let content = std::fs::read_to_string(&full).map_err(|source| RtmlError::Io {
            path: full,
            source,
        })?;
        Ok(Self { path, content })
    }
}

/// `RtmlInterface` describes a template compiler: pages go in by name or by
/// path, one Rust source unit comes out.
pub trait RtmlInterface {
    /// `add_template` parses `content` and registers it as page `name`.
    ///
    /// # Errors
    /// - If the page name is a duplicate.
    /// - If the page name is empty.
    fn add_template<N: AsRef<str>, C: AsRef<str>>(&mut self, name: N, content: C)
    -> RtmlResult<()>;

    /// `add_file` registers a template under the page name derived from its
    /// path. Files without the template extension are skipped.
    ///
    /// # Errors
    /// - If the path is absolute, leaves the root, or is not UTF-8.
    /// - If the derived page name is a duplicate.
    fn add_file(&mut self, file: &TemplateFile) -> RtmlResult<()>;

    /// `params` returns the parameters a caller must pass to render `page`,
    /// in signature order. Unknown pages have none.
    fn params<N: AsRef<str>>(&self, page: N) -> Vec<Param>;

    /// `compile` generates the Rust source for every registered page.
    fn compile(&self) -> String;
}
