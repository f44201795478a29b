use std::collections::{BTreeMap, BTreeSet};

use crate::ast::{Arguments, Ast, AstNode, NodeId};
use crate::output::normalize_reference;

/// A page parameter, declared with `r-require` or shared by every page.
///
/// # Examples
///
/// ```
/// use rtml::Param;
///
/// let request = Param::new("request", "&Request");
/// let theme = Param::new("theme", "Theme")
///     .with_default("Theme::Light")
///     .overridable();
/// assert_eq!(theme.name, "theme");
/// assert!(request.default.is_none());
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Param {
    pub name: String,
    /// The Rust type, as written.
    pub ty: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub label: Option<String>,
    /// A Rust expression used when no value is passed.
    #[cfg_attr(feature = "serde", serde(default))]
    pub default: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub overridable: bool,
}

impl Param {
    pub fn new<N: Into<String>, T: Into<String>>(name: N, ty: T) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            label: None,
            default: None,
            overridable: false,
        }
    }

    #[must_use]
    pub fn with_label<L: Into<String>>(mut self, label: L) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_default<D: Into<String>>(mut self, default: D) -> Self {
        self.default = Some(default.into());
        self
    }

    #[must_use]
    pub const fn overridable(mut self) -> Self {
        self.overridable = true;
        self
    }

    /// Bound inside the page and never part of its signature.
    pub(crate) const fn is_local(&self) -> bool {
        self.default.is_some() && !self.overridable
    }

    /// Passed as an `Option`, falling back to the default.
    pub(crate) const fn is_optional(&self) -> bool {
        self.default.is_some() && self.overridable
    }

    /// Whether pages including this one must provide the parameter too.
    pub(crate) const fn propagates(&self) -> bool {
        self.default.is_none()
    }
}

/// An include or extend of another page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Edge {
    pub(crate) target: String,
    /// Parameters given explicitly at the call site.
    pub(crate) supplied: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct PageSignature {
    pub(crate) params: Vec<Param>,
    /// Shared parameters every page receives.
    pub(crate) required: Vec<Param>,
    pub(crate) includes: Vec<Edge>,
}

/// First phase: records what each page declares and which pages it uses.
#[derive(Debug, Default)]
pub(crate) struct SignatureCollector {
    pages: BTreeMap<String, PageSignature>,
}

impl SignatureCollector {
    pub(crate) fn collect(&mut self, page: &str, ast: &Ast, shared: &[Param]) {
        let mut signature = PageSignature {
            required: shared.to_vec(),
            ..PageSignature::default()
        };
        collect_branch(ast, &ast.root, &mut signature);
        tracing::debug!(
            page,
            params = signature.params.len(),
            includes = signature.includes.len(),
            "collected page signature"
        );
        self.pages.insert(page.to_string(), signature);
    }

    /// Second phase: resolves every page and freezes the result.
    pub(crate) fn freeze(self) -> Signatures {
        let mut resolver = Resolver {
            pages: &self.pages,
            memo: BTreeMap::new(),
        };
        let mut resolved = BTreeMap::new();
        for page in self.pages.keys() {
            let mut visited = BTreeSet::new();
            let (params, _) = resolver.resolve(page, &mut visited);
            resolved.insert(page.clone(), params);
        }
        Signatures {
            pages: self.pages,
            resolved,
        }
    }
}

fn collect_branch(ast: &Ast, branch: &[NodeId], signature: &mut PageSignature) {
    for node in ast.walk(branch) {
        match node {
            AstNode::Requirement(param) => {
                if !signature.params.iter().any(|p| p.name == param.name) {
                    signature.params.push(param.clone());
                }
            }
            AstNode::Include { name, args, .. } | AstNode::Extend { name, args, .. } => {
                signature.includes.push(Edge {
                    target: normalize_reference(name),
                    supplied: args.iter().map(|(arg, _)| arg.clone()).collect(),
                });
            }
            AstNode::Constant(_)
            | AstNode::SlotDeclare { .. }
            | AstNode::SlotCommand { .. }
            | AstNode::Conditional { .. }
            | AstNode::Loop { .. }
            | AstNode::AttributeModifiers { .. }
            | AstNode::Eval(_)
            | AstNode::Value { .. }
            | AstNode::Assignment { .. }
            | AstNode::EndOfBranch
            | AstNode::Noop => {}
        }
        if let Some(body) = node.body() {
            collect_branch(ast, body, signature);
        }
    }
}

struct Resolver<'p> {
    pages: &'p BTreeMap<String, PageSignature>,
    memo: BTreeMap<String, Vec<Param>>,
}

impl Resolver<'_> {
    /// Resolves one page. The flag is false when an include cycle cut the
    /// result short; such results are not memoised.
    fn resolve(&mut self, page: &str, visited: &mut BTreeSet<String>) -> (Vec<Param>, bool) {
        if let Some(done) = self.memo.get(page) {
            return (done.clone(), true);
        }
        let Some(signature) = self.pages.get(page) else {
            return (Vec::new(), true);
        };
        if !visited.insert(page.to_string()) {
            tracing::trace!(page, "include cycle truncated");
            return (Vec::new(), false);
        }

        let mut params: Vec<Param> = signature
            .params
            .iter()
            .filter(|p| !p.is_local())
            .cloned()
            .collect();
        let mut complete = true;
        for edge in &signature.includes {
            let (inner, inner_complete) = self.resolve(&edge.target, visited);
            complete &= inner_complete;
            for param in inner {
                if param.propagates()
                    && !edge.supplied.contains(&param.name)
                    && !params.iter().any(|p| p.name == param.name)
                {
                    params.push(param);
                }
            }
        }
        for param in &signature.required {
            if !params.iter().any(|p| p.name == param.name) {
                params.push(param.clone());
            }
        }

        visited.remove(page);
        if complete {
            self.memo.insert(page.to_string(), params.clone());
        }
        (params, complete)
    }
}

/// Frozen output of signature resolution, read during code generation.
#[derive(Debug, Default)]
pub(crate) struct Signatures {
    pages: BTreeMap<String, PageSignature>,
    resolved: BTreeMap<String, Vec<Param>>,
}

impl Signatures {
    pub(crate) fn contains(&self, page: &str) -> bool {
        self.pages.contains_key(page)
    }

    /// The page's call signature, in argument order.
    pub(crate) fn resolved(&self, page: &str) -> &[Param] {
        self.resolved.get(page).map_or(&[], Vec::as_slice)
    }

    /// Looks up a variable in scope inside `page`: its own declarations
    /// first (locals included), then its resolved signature.
    fn in_scope(&self, page: &str, name: &str) -> Option<&Param> {
        self.pages
            .get(page)
            .and_then(|signature| signature.params.iter().find(|p| p.name == name))
            .or_else(|| self.resolved(page).iter().find(|p| p.name == name))
    }

    /// Builds the argument list for a call from `caller` into `target`.
    ///
    /// Returns `None` when `target` is not a known page.
    pub(crate) fn call_arguments(
        &self,
        caller: &str,
        target: &str,
        args: &Arguments,
    ) -> Option<Vec<String>> {
        if !self.contains(target) {
            return None;
        }

        let arguments = self
            .resolved(target)
            .iter()
            .map(|param| {
                let wrap = |value: String| {
                    if param.is_optional() {
                        format!("::core::option::Option::Some({value})")
                    } else {
                        value
                    }
                };

                if let Some((_, expr)) = args.iter().find(|(name, _)| *name == param.name) {
                    return wrap(format!("({expr})"));
                }

                match self.in_scope(caller, &param.name) {
                    Some(outer) if outer.ty.trim() == param.ty.trim() => {
                        wrap(format!("::core::clone::Clone::clone(&{})", param.name))
                    }
                    Some(outer) => {
                        tracing::warn!(
                            caller,
                            target,
                            param = param.name.as_str(),
                            expected = param.ty.as_str(),
                            found = outer.ty.as_str(),
                            "parameter type mismatch, not passed through"
                        );
                        fallback(param)
                    }
                    None => {
                        if !param.is_optional() {
                            tracing::warn!(
                                caller,
                                target,
                                param = param.name.as_str(),
                                "no value for parameter"
                            );
                        }
                        fallback(param)
                    }
                }
            })
            .collect();
        Some(arguments)
    }
}

fn fallback(param: &Param) -> String {
    if param.is_optional() {
        "::core::option::Option::None".to_string()
    } else {
        "::core::default::Default::default()".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build;
    use crate::lexer::tokenize;

    fn collector(pages: &[(&str, &str)], shared: &[Param]) -> Signatures {
        let mut collector = SignatureCollector::default();
        for (page, source) in pages {
            let ast = build(tokenize(source));
            collector.collect(page, &ast, shared);
        }
        collector.freeze()
    }

    fn names(params: &[Param]) -> Vec<&str> {
        params.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_own_params_then_included() {
        let signatures = collector(
            &[
                (
                    "page",
                    "<r-require name=\"title\" type=\"&str\"/><r-include name=\"card\"/>",
                ),
                (
                    "card",
                    "<r-require name=\"body\" type=\"&str\"/><r-require name=\"title\" type=\"&str\"/>",
                ),
            ],
            &[],
        );
        assert_eq!(names(signatures.resolved("page")), vec!["title", "body"]);
        assert_eq!(names(signatures.resolved("card")), vec!["body", "title"]);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_shared_params_are_always_last() {
        let shared = [Param::new("request", "&Request")];
        let signatures = collector(
            &[("page", "<r-require name=\"title\" type=\"&str\"/>hi")],
            &shared,
        );
        assert_eq!(names(signatures.resolved("page")), vec!["title", "request"]);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_locals_and_optionals_do_not_propagate() {
        let signatures = collector(
            &[
                ("page", "<r-include name=\"card\"/>"),
                (
                    "card",
                    concat!(
                        "<r-require name=\"size\" type=\"u32\" default=\"3\"/>",
                        "<r-require name=\"theme\" type=\"Theme\" default=\"Theme::Dark\" overridable/>",
                        "<r-require name=\"body\" type=\"&str\"/>",
                    ),
                ),
            ],
            &[],
        );
        assert_eq!(names(signatures.resolved("card")), vec!["theme", "body"]);
        assert_eq!(names(signatures.resolved("page")), vec!["body"]);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_supplied_arguments_do_not_propagate() {
        let signatures = collector(
            &[
                ("page", "<r-include name=\"card\" body=\"'x'\"/>"),
                ("card", "<r-require name=\"body\" type=\"&str\"/>"),
            ],
            &[],
        );
        assert!(signatures.resolved("page").is_empty());
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_include_cycle_terminates() {
        let signatures = collector(
            &[
                (
                    "a",
                    "<r-require name=\"x\" type=\"u8\"/><r-include name=\"b\"/>",
                ),
                (
                    "b",
                    "<r-require name=\"y\" type=\"u8\"/><r-include name=\"a\"/>",
                ),
            ],
            &[],
        );
        assert_eq!(names(signatures.resolved("a")), vec!["x", "y"]);
        assert_eq!(names(signatures.resolved("b")), vec!["y", "x"]);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_self_include_terminates() {
        let signatures = collector(
            &[(
                "tree",
                "<r-require name=\"node\" type=\"&Node\"/><r-include name=\"tree\"/>",
            )],
            &[],
        );
        assert_eq!(names(signatures.resolved("tree")), vec!["node"]);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_first_declared_wins_on_collision() {
        let signatures = collector(
            &[
                (
                    "page",
                    "<r-require name=\"id\" type=\"u32\"/><r-include name=\"card\"/>",
                ),
                ("card", "<r-require name=\"id\" type=\"String\"/>"),
            ],
            &[],
        );
        let resolved = signatures.resolved("page");
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].ty, "u32");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_call_arguments() {
        let signatures = collector(
            &[
                (
                    "page",
                    "<r-require name=\"id\" type=\"u32\"/><r-include name=\"card\"/>",
                ),
                (
                    "card",
                    concat!(
                        "<r-require name=\"id\" type=\"String\"/>",
                        "<r-require name=\"theme\" type=\"Theme\" default=\"Theme::Dark\" overridable/>",
                        "<r-require name=\"title\" type=\"&str\"/>",
                    ),
                ),
            ],
            &[],
        );
        let args = vec![("title".to_string(), "\"Hi\"".to_string())];
        assert_eq!(
            signatures.call_arguments("page", "card", &args),
            Some(vec![
                "::core::default::Default::default()".to_string(),
                "::core::option::Option::None".to_string(),
                "(\"Hi\")".to_string(),
            ])
        );
        assert_eq!(signatures.call_arguments("page", "missing", &args), None);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_matching_params_pass_through() {
        let signatures = collector(
            &[
                (
                    "page",
                    concat!(
                        "<r-require name=\"user\" type=\"&User\"/>",
                        "<r-require name=\"theme\" type=\"Theme\" default=\"Theme::Dark\"/>",
                        "<r-include name=\"card\"/>",
                    ),
                ),
                (
                    "card",
                    concat!(
                        "<r-require name=\"user\" type=\"&User\"/>",
                        "<r-require name=\"theme\" type=\"Theme\" default=\"Theme::Light\" overridable/>",
                    ),
                ),
            ],
            &[],
        );
        assert_eq!(
            signatures.call_arguments("page", "card", &Vec::new()),
            Some(vec![
                "::core::option::Option::Some(::core::clone::Clone::clone(&theme))".to_string(),
                "::core::clone::Clone::clone(&user)".to_string(),
            ])
        );
    }
}
