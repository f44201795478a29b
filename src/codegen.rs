use std::collections::BTreeMap;

use crate::ast::{
    Arguments, Ast, AstNode, AttributeModifier, Condition, ConditionKind, Content, Element,
    ModifierKind, NodeId, SlotCommandKind,
};
use crate::buffer::{Deferred, FlagId, FlagTable, LineBuffer};
use crate::lexer::{AttrValue, QuoteKind, render_attributes};
use crate::output::normalize_reference;
use crate::signature::Signatures;

const KEYWORDS: [&str; 52] = [
    "Self", "abstract", "as", "async", "await", "become", "box", "break", "const", "continue",
    "crate", "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if",
    "impl", "in", "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv",
    "pub", "ref", "return", "self", "static", "struct", "super", "trait", "true", "try", "type",
    "typeof", "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

const ALLOW: &str = "#[allow(unused_variables, unused_mut, unused_parens, unused_braces, clippy::all, reason = \"generated template code\")]";

/// Turns a page or directory name into a Rust identifier.
pub(crate) fn identifier(raw: &str) -> String {
    let mut ident: String = raw
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    if KEYWORDS.contains(&ident.as_str()) {
        ident.push('_');
    }
    ident
}

fn string_literal(text: &str) -> String {
    format!("{text:?}")
}

/// Path from the module of page `from` to the tree function of page `to`.
pub(crate) fn tree_path(from: &str, to: &str) -> String {
    let depth = from.split('/').count().saturating_sub(1);
    let mut path = if depth == 0 {
        "self::".to_string()
    } else {
        "super::".repeat(depth)
    };
    let segments: Vec<&str> = to.split('/').collect();
    if let Some((page, namespaces)) = segments.split_last() {
        for namespace in namespaces {
            path.push_str(&identifier(namespace));
            path.push_str("::");
        }
        path.push_str(&identifier(page));
        path.push_str("_tree");
    }
    path
}

fn render_element(element: &Element, void: bool, out: &mut String) {
    out.push('<');
    out.push_str(&element.name);
    render_attributes(&element.attrs, out);
    out.push_str(if void && element.self_closing { "/>" } else { ">" });
}

/// The text a constant run stands for.
pub(crate) fn render_constant(items: &[Content]) -> String {
    let mut out = String::new();
    for item in items {
        match item {
            Content::Text(text) => out.push_str(text),
            Content::NewLine => out.push('\n'),
            Content::OpenTag(element) => render_element(element, false, &mut out),
            Content::VoidTag(element) => render_element(element, true, &mut out),
            Content::CloseTag(name) => {
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
        }
    }
    out
}

/// Removes the indentation shared by every non-blank line, along with
/// leading and trailing blank lines.
fn dedent(code: &str) -> Vec<String> {
    let lines: Vec<&str> = code.lines().collect();
    let Some(first) = lines.iter().position(|line| !line.trim().is_empty()) else {
        return Vec::new();
    };
    let last = lines
        .iter()
        .rposition(|line| !line.trim().is_empty())
        .unwrap_or(first);
    let lines = lines.get(first..=last).unwrap_or_default();
    let common = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len().saturating_sub(line.trim_start().len()))
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|line| {
            line.get(common..)
                .unwrap_or_else(|| line.trim_start())
                .trim_end()
                .to_string()
        })
        .collect()
}

/// Everything code generation needs to know about the page being written.
pub(crate) struct PageContext<'a> {
    /// Page name, `/`-separated.
    pub(crate) page: &'a str,
    pub(crate) ast: &'a Ast,
    pub(crate) signatures: &'a Signatures,
    /// Path of the runtime module in generated code.
    pub(crate) runtime: &'a str,
    pub(crate) flags: FlagTable,
}

impl<'a> PageContext<'a> {
    pub(crate) fn new(
        page: &'a str,
        ast: &'a Ast,
        signatures: &'a Signatures,
        runtime: &'a str,
    ) -> Self {
        Self {
            page,
            ast,
            signatures,
            runtime,
            flags: FlagTable::default(),
        }
    }
}

/// Writes the statements of one branch. Nested branches get a generator
/// of their own that inherits the tagged flags in scope.
struct Generator<'c, 'a> {
    cx: &'c mut PageContext<'a>,
    buffer: LineBuffer,
    tags: BTreeMap<String, FlagId>,
    /// Flag of the last untagged-reachable condition or loop in this branch.
    last: Option<FlagId>,
}

impl<'a> Generator<'_, 'a> {
    fn nested(&mut self, branch: &'a [NodeId]) -> LineBuffer {
        let child = Generator {
            cx: &mut *self.cx,
            buffer: LineBuffer::default(),
            tags: self.tags.clone(),
            last: None,
        };
        child.generate(branch)
    }

    fn generate(mut self, branch: &'a [NodeId]) -> LineBuffer {
        let ast = self.cx.ast;
        for node in ast.walk(branch) {
            self.node(node);
        }
        self.buffer
    }

    fn is_empty(&self, buffer: &LineBuffer) -> bool {
        buffer.is_empty(&self.cx.flags)
    }

    fn bind(&mut self, tag: Option<&str>, flag: FlagId) {
        self.last = Some(flag);
        if let Some(tag) = tag {
            self.tags.insert(tag.to_string(), flag);
        }
    }

    fn lookup(&self, tag: Option<&str>) -> Option<FlagId> {
        match tag {
            Some(tag) => self.tags.get(tag).copied(),
            None => self.last,
        }
    }

    fn node(&mut self, node: &'a AstNode) {
        match node {
            AstNode::Constant(items) => self.constant(items),
            AstNode::SlotDeclare { name, body } => {
                let name = string_literal(name.as_deref().unwrap_or("default"));
                let inner = self.nested(body);
                if self.is_empty(&inner) {
                    self.buffer.push(format!("__out.slot({name});"));
                } else {
                    self.buffer
                        .push(format!("__out.slot_with_defaults_start({name});"));
                    self.buffer.append(inner, 1);
                    self.buffer
                        .push(format!("__out.slot_with_defaults_end({name});"));
                }
            }
            AstNode::SlotCommand { kind, name, body } => {
                let inner = self.nested(body);
                let replace = matches!(kind, SlotCommandKind::Replace);
                if self.is_empty(&inner) && !replace {
                    return;
                }
                let name = string_literal(name.as_deref().unwrap_or("default"));
                self.buffer
                    .push(format!("__out.select_slot({name}, {replace});"));
                self.buffer.append(inner, 1);
                self.buffer.push("__out.clear();");
            }
            AstNode::Include { name, args, body } => {
                let Some(call) = self.call(name, args) else {
                    return;
                };
                let inner = self.nested(body);
                if self.is_empty(&inner) {
                    self.buffer.push(format!("__out.include({call});"));
                } else {
                    self.buffer
                        .push(format!("__out.include_with_defaults_start({call});"));
                    self.buffer.append(inner, 1);
                    self.buffer.push("__out.include_with_defaults_end();");
                }
            }
            AstNode::Extend {
                name,
                args,
                condition,
            } => {
                let Some(call) = self.call(name, args) else {
                    return;
                };
                let line = format!("__out.extend({call});");
                match condition {
                    Some(condition) => {
                        let mut body = LineBuffer::default();
                        body.push(line);
                        self.conditional(condition, body);
                    }
                    None => self.buffer.push(line),
                }
            }
            AstNode::Conditional { condition, body } => {
                let inner = self.nested(body);
                self.conditional(condition, inner);
            }
            AstNode::Loop {
                source,
                tag,
                item,
                index,
                body,
            } => {
                let inner = self.nested(body);
                let flag = self.cx.flags.declare();
                self.bind(tag.as_deref(), flag);
                self.buffer.defer(Deferred::Declare(flag));
                if self.is_empty(&inner) {
                    self.buffer.defer(Deferred::GuardedSet {
                        flag,
                        check: format!("({source}).into_iter().next().is_some()"),
                    });
                } else {
                    self.buffer.push(format!(
                        "for ({index}, {item}) in ({source}).into_iter().enumerate() {{"
                    ));
                    self.buffer.defer_at(1, Deferred::Set(flag));
                    self.buffer.append(inner, 1);
                    self.buffer.push("}");
                }
            }
            AstNode::AttributeModifiers {
                modifiers,
                target,
                void,
            } => self.attribute_modifiers(modifiers, target, *void),
            AstNode::Requirement(param) => {
                let Some(default) = &param.default else {
                    return;
                };
                if param.is_local() {
                    self.buffer
                        .push(format!("let {}: {} = {default};", param.name, param.ty));
                } else if param.is_optional() {
                    self.buffer.push(format!(
                        "let {name}: {ty} = {name}.unwrap_or_else(|| {default});",
                        name = param.name,
                        ty = param.ty
                    ));
                }
            }
            AstNode::Eval(code) => {
                for line in dedent(code) {
                    self.buffer.push(line);
                }
            }
            AstNode::Value { of, default, escape } => {
                let line = match (default, escape) {
                    (None, true) => format!("__out.value(&({of}));"),
                    (None, false) => format!("__out.raw_value(&({of}));"),
                    (Some(default), true) => format!(
                        "__out.value_or(::core::option::Option::as_ref(&({of})), {});",
                        string_literal(default)
                    ),
                    (Some(default), false) => format!(
                        "__out.raw_value_or(::core::option::Option::as_ref(&({of})), {});",
                        string_literal(default)
                    ),
                };
                self.buffer.push(line);
            }
            AstNode::Assignment { name, expr } => {
                self.buffer.push(format!("let {name} = {expr};"));
            }
            AstNode::EndOfBranch | AstNode::Noop => {}
        }
    }

    fn constant(&mut self, items: &[Content]) {
        let text = render_constant(items);
        let chunks: Vec<&str> = text.split_inclusive('\n').collect();
        match chunks.as_slice() {
            [] => {}
            [single] => self
                .buffer
                .push(format!("__out.text({});", string_literal(single))),
            many => {
                self.buffer.push("__out.text(concat!(");
                for chunk in many {
                    self.buffer
                        .push_at(1, format!("{},", string_literal(chunk)));
                }
                self.buffer.push("));");
            }
        }
    }

    /// Call expression for the tree function of the referenced page, or
    /// `None` when no such page exists.
    fn call(&self, reference: &str, args: &Arguments) -> Option<String> {
        let target = normalize_reference(reference);
        let Some(arguments) = self
            .cx
            .signatures
            .call_arguments(self.cx.page, &target, args)
        else {
            tracing::warn!(
                page = self.cx.page,
                target = target.as_str(),
                "reference to unknown page skipped"
            );
            return None;
        };
        Some(format!(
            "{}({})",
            tree_path(self.cx.page, &target),
            arguments.join(", ")
        ))
    }

    fn conditional(&mut self, condition: &Condition, inner: LineBuffer) {
        let tag = condition.tag.as_deref();
        match condition.kind {
            ConditionKind::If => {
                let flag = self.cx.flags.declare();
                self.bind(tag, flag);
                self.buffer.defer(Deferred::Declare(flag));
                self.guarded(flag, condition.check.clone(), inner);
            }
            ConditionKind::ElseIf => {
                let Some(flag) = self.lookup(tag) else {
                    tracing::warn!(page = self.cx.page, "r-else-if without a preceding r-if");
                    return;
                };
                self.cx.flags.mark_read(flag);
                let check = format!("!{} && ({})", self.cx.flags.variable(flag), condition.check);
                self.guarded(flag, check, inner);
            }
            ConditionKind::Else => {
                let Some(flag) = self.lookup(tag) else {
                    tracing::warn!(page = self.cx.page, "r-else without a preceding r-if");
                    return;
                };
                self.cx.flags.mark_read(flag);
                if !self.is_empty(&inner) {
                    self.buffer
                        .push(format!("if !{} {{", self.cx.flags.variable(flag)));
                    self.buffer.append(inner, 1);
                    self.buffer.push("}");
                }
            }
        }
    }

    /// `if check { flag = true; body }`, reduced to a deferred guarded set
    /// when the body is empty.
    fn guarded(&mut self, flag: FlagId, check: String, inner: LineBuffer) {
        if self.is_empty(&inner) {
            self.buffer.defer(Deferred::GuardedSet { flag, check });
        } else {
            self.buffer.push(format!("if {check} {{"));
            self.buffer.defer_at(1, Deferred::Set(flag));
            self.buffer.append(inner, 1);
            self.buffer.push("}");
        }
    }

    fn attribute_modifiers(&mut self, modifiers: &[AttributeModifier], target: &Element, void: bool) {
        let runtime = self.cx.runtime;
        let mut block = Generator {
            cx: &mut *self.cx,
            buffer: LineBuffer::default(),
            tags: self.tags.clone(),
            last: None,
        };
        block
            .buffer
            .push(format!("let mut __attrs = {runtime}::Attributes::new();"));
        for (name, value) in &target.attrs {
            if let AttrValue::Value { text, quote } = value {
                let quote = match quote {
                    QuoteKind::Double => "Double",
                    QuoteKind::Single => "Single",
                    QuoteKind::None => "Bare",
                };
                block.buffer.push(format!(
                    "__attrs.set_literal({}, {}, {runtime}::Quote::{quote});",
                    string_literal(name),
                    string_literal(text)
                ));
            }
        }
        for (name, value) in &target.attrs {
            if matches!(value, AttrValue::Flag) {
                block
                    .buffer
                    .push(format!("__attrs.flag({});", string_literal(name)));
            }
        }

        for modifier in modifiers {
            let name = string_literal(&modifier.attribute);
            let line = match (modifier.kind, &modifier.value) {
                (ModifierKind::Replace, Some(value)) => format!("__attrs.set({name}, &({value}));"),
                (ModifierKind::Append, Some(value)) => {
                    format!("__attrs.append({name}, &({value}));")
                }
                (ModifierKind::Replace | ModifierKind::Append, None) => {
                    format!("__attrs.flag({name});")
                }
                (ModifierKind::Remove, _) => format!("__attrs.remove({name});"),
            };
            match &modifier.condition {
                Some(condition) => {
                    let mut body = LineBuffer::default();
                    body.push(line);
                    block.conditional(condition, body);
                }
                None => block.buffer.push(line),
            }
        }

        let element = string_literal(&target.name);
        block.buffer.push(if void {
            format!(
                "__out.void_tag({element}, &__attrs, {});",
                target.self_closing
            )
        } else {
            format!("__out.open_tag({element}, &__attrs);")
        });

        let inner = block.buffer;
        self.buffer.push("{");
        self.buffer.append(inner, 1);
        self.buffer.push("}");
    }
}

/// Writes the render and tree functions of one page.
///
/// `buffer` is scratch space reused across pages and is left empty.
pub(crate) fn write_page(cx: &mut PageContext<'_>, buffer: &mut LineBuffer) -> String {
    buffer.clear();
    let ast = cx.ast;
    let runtime = cx.runtime;
    let page = cx.page;

    let generator = Generator {
        cx: &mut *cx,
        buffer: std::mem::take(buffer),
        tags: BTreeMap::new(),
        last: None,
    };
    *buffer = generator.generate(&ast.root);

    let params = cx.signatures.resolved(page);
    let signature = params
        .iter()
        .map(|param| {
            if param.is_optional() {
                format!("{}: ::core::option::Option<{}>", param.name, param.ty)
            } else {
                format!("{}: {}", param.name, param.ty)
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    let names = params
        .iter()
        .map(|param| param.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let function = identifier(page.rsplit('/').next().unwrap_or(page));

    let mut lines = LineBuffer::default();
    lines.push(format!("/// Renders the `{page}` template."));
    let labelled: Vec<_> = params.iter().filter(|p| p.label.is_some()).collect();
    if !labelled.is_empty() {
        lines.push("///");
        for param in labelled {
            lines.push(format!(
                "/// * `{}` - {}",
                param.name,
                param.label.as_deref().unwrap_or_default()
            ));
        }
    }
    lines.push(ALLOW);
    lines.push(format!(
        "pub fn {function}({signature}) -> ::std::string::String {{"
    ));
    lines.push_at(1, format!("{function}_tree({names}).render()"));
    lines.push("}");
    lines.push("");
    lines.push(format!(
        "/// Builds the `{page}` template as a tree, for includes and extends."
    ));
    lines.push(ALLOW);
    lines.push(format!(
        "pub fn {function}_tree({signature}) -> {runtime}::Tree {{"
    ));
    lines.push_at(1, format!("let mut __out = {runtime}::TreeBuilder::new();"));
    lines.append(std::mem::take(buffer), 1);
    lines.push_at(1, "__out.finish()");
    lines.push("}");

    let mut out = String::new();
    lines.write(&cx.flags, 0, &mut out);
    out
}
