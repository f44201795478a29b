use std::collections::BTreeMap;
use std::path::{Component, Path};

use crate::ast::Ast;
use crate::buffer::LineBuffer;
use crate::codegen::{PageContext, identifier, write_page};
use crate::error::{RtmlError, RtmlResult};
use crate::interface::CompileOptions;
use crate::signature::{Param, SignatureCollector};

const HEADER: &str = "// @generated by rtml. Do not edit by hand.\n\n";
const INDENT: &str = "    ";

/// Path of a page's render function relative to the generated unit root.
pub(crate) fn generated_path(page: &str) -> String {
    page.split('/').map(identifier).collect::<Vec<_>>().join("::")
}

/// Canonical form of a page name used in `r-include`/`r-extend`:
/// `/`-separated, no leading `./` or `/`, no file extension.
pub(crate) fn normalize_reference(raw: &str) -> String {
    let cleaned = raw.trim().replace('\\', "/");
    let mut segments: Vec<&str> = cleaned
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect();
    if let Some(last) = segments.last_mut() {
        if let Some((stem, _)) = last.rsplit_once('.') {
            if !stem.is_empty() {
                *last = stem;
            }
        }
    }
    segments.join("/")
}

/// The page name for a template path relative to the template root.
///
/// Returns `Ok(None)` for files without the template extension.
pub(crate) fn page_key(path: &Path, extension: &str) -> RtmlResult<Option<String>> {
    let mut segments = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => {
                let part = part
                    .to_str()
                    .ok_or_else(|| RtmlError::invalid_path(path, "path is not valid UTF-8"))?;
                segments.push(part);
            }
            Component::CurDir => {}
            Component::RootDir | Component::Prefix(_) => {
                return Err(RtmlError::invalid_path(path, "path must be relative"));
            }
            Component::ParentDir => {
                return Err(RtmlError::invalid_path(
                    path,
                    "path must stay inside the template root",
                ));
            }
        }
    }

    let Some(file) = segments.pop() else {
        return Err(RtmlError::invalid_path(path, "path names no file"));
    };
    let Some(stem) = file
        .strip_suffix(extension)
        .and_then(|rest| rest.strip_suffix('.'))
    else {
        return Ok(None);
    };
    if stem.is_empty() {
        return Err(RtmlError::invalid_path(path, "file name has no stem"));
    }
    segments.push(stem);
    Ok(Some(segments.join("/")))
}

/// Pages and sub-namespaces of one directory, in name order.
#[derive(Debug, Default)]
struct Namespace {
    pages: BTreeMap<String, String>,
    children: BTreeMap<String, Namespace>,
}

impl Namespace {
    fn insert(&mut self, page: &str, code: String) {
        let mut segments: Vec<&str> = page.split('/').collect();
        let Some(name) = segments.pop() else {
            return;
        };
        let mut namespace = self;
        for segment in segments {
            namespace = namespace.children.entry(identifier(segment)).or_default();
        }
        namespace.pages.insert(identifier(name), code);
    }

    fn write(&self, depth: usize, out: &mut String) {
        let indent = INDENT.repeat(depth);
        let mut first = true;
        for code in self.pages.values() {
            if !first {
                out.push('\n');
            }
            first = false;
            for line in code.lines() {
                if !line.is_empty() {
                    out.push_str(&indent);
                    out.push_str(line);
                }
                out.push('\n');
            }
        }
        for (name, child) in &self.children {
            if !first {
                out.push('\n');
            }
            first = false;
            out.push_str(&indent);
            out.push_str("pub mod ");
            out.push_str(name);
            out.push_str(" {\n");
            child.write(depth.saturating_add(1), out);
            out.push_str(&indent);
            out.push_str("}\n");
        }
    }
}

/// Generates the code unit for a set of parsed pages: signatures are
/// collected and frozen before any page is written.
pub(crate) fn assemble(
    pages: &BTreeMap<String, Ast>,
    shared: &[Param],
    options: &CompileOptions,
) -> String {
    let _span = tracing::debug_span!("assemble", pages = pages.len()).entered();

    let mut collector = SignatureCollector::default();
    for (page, ast) in pages {
        collector.collect(page, ast, shared);
    }
    let signatures = collector.freeze();

    let mut root = Namespace::default();
    let mut buffer = LineBuffer::default();
    for (page, ast) in pages {
        let mut cx = PageContext::new(page, ast, &signatures, &options.runtime_path);
        let code = write_page(&mut cx, &mut buffer);
        tracing::debug!(page = page.as_str(), bytes = code.len(), "generated page");
        root.insert(page, code);
    }

    let mut out = String::new();
    if options.header {
        out.push_str(HEADER);
    }
    root.write(0, &mut out);
    out
}
