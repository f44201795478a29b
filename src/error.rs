use std::path::PathBuf;

pub type RtmlResult<T> = std::result::Result<T, RtmlError>;

/// Everything the compile pipeline can report.
///
/// Template syntax is never an error: the lexer degrades malformed markup to
/// literal text and the AST builder drops invalid control elements. The only
/// failures left are about the template set itself and reading it.
#[derive(Debug, thiserror::Error)]
pub enum RtmlError {
    #[error("Template already exists: {page_name}")]
    TemplateExists { page_name: String },

    #[error("Template {page_name} generates the same function names as {existing}")]
    PageNameCollision { page_name: String, existing: String },

    #[error("Template path {path:?} does not name a page: {reason}")]
    InvalidTemplatePath { path: PathBuf, reason: &'static str },

    #[error("Failed to read template {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RtmlError {
    pub(crate) fn invalid_path<P: Into<PathBuf>>(path: P, reason: &'static str) -> Self {
        Self::InvalidTemplatePath {
            path: path.into(),
            reason,
        }
    }
}
