use crate::ast::{
    Arguments, Ast, AstNode, AttributeModifier, Condition, ConditionKind, Content, Element,
    ModifierKind, NodeId, SlotCommandKind,
};
use crate::codegen::identifier;
use crate::lexer::{AttrMap, AttrValue, Node, NodeContent, render_node};
use crate::signature::Param;

/// Element names the builder interprets. Any other `r-` name is literal.
const RESERVED: [&str; 12] = [
    "r-include", "r-extend", "r-require", "r-set", "r-unset", "r-var", "r-value", "r-eval",
    "r-slot", "r-block", "r-item", "r-index",
];

/// Attributes that shape control flow and never reach the output.
const CONTROL_ATTRIBUTES: [&str; 7] = [
    "r-if",
    "r-else-if",
    "r-else",
    "r-for-every",
    "r-tag",
    "r-add-to-slot",
    "r-replace-slot",
];

fn is_reserved(name: &str) -> bool {
    RESERVED.contains(&name)
}

/// The text of a valued attribute. Flags have no text.
fn value_of<'m>(attrs: &'m AttrMap, name: &str) -> Option<&'m str> {
    match attrs.get(name) {
        Some(AttrValue::Value { text, .. }) => Some(text.as_str()),
        Some(AttrValue::Flag) | None => None,
    }
}

fn has(attrs: &AttrMap, name: &str) -> bool {
    attrs.contains_key(name)
}

/// `default` and the empty name both address the unnamed slot.
fn slot_name(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|name| !name.is_empty() && *name != "default")
        .map(str::to_string)
}

fn condition(attrs: &AttrMap) -> Option<Condition> {
    let tag = value_of(attrs, "r-tag").map(str::to_string);
    let (kind, check) = if let Some(check) = value_of(attrs, "r-if") {
        (ConditionKind::If, check)
    } else if let Some(check) = value_of(attrs, "r-else-if") {
        (ConditionKind::ElseIf, check)
    } else if has(attrs, "r-else") {
        (ConditionKind::Else, "")
    } else {
        return None;
    };
    Some(Condition {
        kind,
        check: check.to_string(),
        tag,
    })
}

/// Argument expressions: every valued attribute except `name` and `r-*`.
fn arguments(attrs: &AttrMap) -> Arguments {
    attrs
        .iter()
        .filter(|(name, _)| *name != "name" && !name.starts_with("r-"))
        .filter_map(|(name, value)| match value {
            AttrValue::Value { text, .. } => Some((name.clone(), text.clone())),
            AttrValue::Flag => None,
        })
        .collect()
}

#[derive(Debug)]
struct Frame {
    owner: NodeId,
    close_depth: usize,
    /// `(item, index)` variable names when the frame is a loop.
    loop_vars: Option<(String, String)>,
}

#[derive(Debug)]
struct RawEval {
    depth: usize,
    code: String,
}

#[derive(Debug)]
struct Builder {
    ast: Ast,
    stack: Vec<Frame>,
    /// Drop every node deeper than this until the element at it closes.
    ignore_until: Option<usize>,
    raw_eval: Option<RawEval>,
    /// Still inside the leading run where `r-extend`/`r-require` are legal.
    leading: bool,
    extended: bool,
}

impl Builder {
    fn new() -> Self {
        Self {
            ast: Ast::default(),
            stack: Vec::new(),
            ignore_until: None,
            raw_eval: None,
            leading: true,
            extended: false,
        }
    }

    fn current(&self) -> Option<NodeId> {
        self.stack.last().map(|frame| frame.owner)
    }

    fn push_node(&mut self, node: AstNode) -> NodeId {
        let id = self.ast.alloc(node);
        let owner = self.current();
        if let Some(branch) = self.ast.branch_mut(owner) {
            branch.push(id);
        }
        id
    }

    fn push_content(&mut self, content: Content) {
        if !content.is_blank() {
            self.leading = false;
        }
        let last = self.ast.branch(self.current()).last().copied();
        if let Some(last) = last {
            if let Some(AstNode::Constant(items)) = self.ast.get_mut(last) {
                items.push(content);
                return;
            }
        }
        self.push_node(AstNode::Constant(vec![content]));
    }

    fn open_frame(&mut self, node: AstNode, close_depth: usize, loop_vars: Option<(String, String)>) {
        let owner = self.push_node(node);
        self.stack.push(Frame {
            owner,
            close_depth,
            loop_vars,
        });
    }

    /// Closes every frame opened by the element at `depth`.
    fn close_frames(&mut self, depth: usize) {
        while self
            .stack
            .last()
            .is_some_and(|frame| frame.close_depth == depth)
        {
            if let Some(frame) = self.stack.pop() {
                self.end_branch(frame.owner);
            }
        }
    }

    fn end_branch(&mut self, owner: NodeId) {
        let end = self.ast.alloc(AstNode::EndOfBranch);
        if let Some(branch) = self.ast.branch_mut(Some(owner)) {
            branch.push(end);
        }
    }

    fn skip_children(&mut self, depth: usize, void: bool) {
        if !void {
            self.ignore_until = Some(depth);
        }
    }

    fn loop_vars(&self) -> Option<&(String, String)> {
        self.stack.iter().rev().find_map(|frame| frame.loop_vars.as_ref())
    }

    fn feed(&mut self, node: Node) {
        let Node { depth, content } = node;

        if let Some(raw) = &mut self.raw_eval {
            if depth == raw.depth && matches!(content, NodeContent::TagClose { .. }) {
                let code = std::mem::take(&mut raw.code);
                self.raw_eval = None;
                self.push_node(AstNode::Eval(code));
                self.close_frames(depth);
            } else {
                render_node(&content, &mut raw.code);
            }
            return;
        }

        if let Some(limit) = self.ignore_until {
            if depth > limit {
                return;
            }
            self.ignore_until = None;
        }

        match content {
            NodeContent::Text(text) | NodeContent::RawData(text) => {
                self.push_content(Content::Text(text));
            }
            NodeContent::NewLine => self.push_content(Content::NewLine),
            NodeContent::TagOpen { name, attrs } => {
                self.open_element(name, attrs, depth, None);
            }
            NodeContent::TagVoid {
                name,
                attrs,
                self_closing,
            } => self.open_element(name, attrs, depth, Some(self_closing)),
            NodeContent::TagClose { name } => self.close_element(&name, depth),
        }
    }

    /// `void` carries the self-closing flag of void elements.
    fn open_element(&mut self, name: String, attrs: AttrMap, depth: usize, void: Option<bool>) {
        let is_void = void.is_some();
        match name.as_str() {
            "r-extend" => return self.extend(&attrs, depth, is_void),
            "r-require" => return self.require(&attrs, depth, is_void),
            "r-set" | "r-unset" => return self.modifier(&name, &attrs, depth, is_void),
            _ => {}
        }

        self.leading = false;
        self.open_layers(&attrs, depth);

        match name.as_str() {
            "r-include" => match value_of(&attrs, "name") {
                Some(target) => {
                    let node = AstNode::Include {
                        name: target.to_string(),
                        args: arguments(&attrs),
                        body: Vec::new(),
                    };
                    if is_void {
                        self.push_node(node);
                    } else {
                        self.open_frame(node, depth, None);
                    }
                }
                None => {
                    tracing::warn!("r-include without a name dropped");
                    self.push_node(AstNode::Noop);
                    self.skip_children(depth, is_void);
                }
            },
            "r-slot" => {
                let node = AstNode::SlotDeclare {
                    name: slot_name(value_of(&attrs, "name")),
                    body: Vec::new(),
                };
                if is_void {
                    self.push_node(node);
                } else {
                    self.open_frame(node, depth, None);
                }
            }
            "r-block" => {}
            "r-var" => {
                let node = match (value_of(&attrs, "name"), value_of(&attrs, "line")) {
                    (Some(var), Some(line)) => AstNode::Assignment {
                        name: var.to_string(),
                        expr: line.to_string(),
                    },
                    _ => {
                        tracing::warn!("r-var needs both name and line");
                        AstNode::Noop
                    }
                };
                self.push_node(node);
                self.skip_children(depth, is_void);
            }
            "r-value" => {
                let node = match value_of(&attrs, "of") {
                    Some(of) => AstNode::Value {
                        of: of.to_string(),
                        default: value_of(&attrs, "default").map(str::to_string),
                        escape: !has(&attrs, "raw"),
                    },
                    None => {
                        tracing::warn!("r-value without of dropped");
                        AstNode::Noop
                    }
                };
                self.push_node(node);
                self.skip_children(depth, is_void);
            }
            "r-eval" => {
                if let Some(line) = value_of(&attrs, "line") {
                    self.push_node(AstNode::Eval(line.to_string()));
                    self.skip_children(depth, is_void);
                } else if !is_void {
                    self.raw_eval = Some(RawEval {
                        depth,
                        code: String::new(),
                    });
                }
            }
            "r-item" | "r-index" => {
                let node = match self.loop_vars() {
                    Some((item, index)) => AstNode::Value {
                        of: (if name == "r-item" { item } else { index }).clone(),
                        default: None,
                        escape: true,
                    },
                    None => {
                        tracing::warn!(element = name.as_str(), "used outside of a loop");
                        AstNode::Noop
                    }
                };
                self.push_node(node);
                self.skip_children(depth, is_void);
            }
            _ => {
                let mut attrs = attrs;
                attrs.retain(|attr, _| !CONTROL_ATTRIBUTES.contains(&attr.as_str()));
                let element = Element {
                    name,
                    attrs,
                    self_closing: void.unwrap_or(false),
                };
                self.push_content(if is_void {
                    Content::VoidTag(element)
                } else {
                    Content::OpenTag(element)
                });
            }
        }

        if is_void {
            self.close_frames(depth);
        }
    }

    /// Opens the condition, loop and slot-command layers, outermost first.
    fn open_layers(&mut self, attrs: &AttrMap, depth: usize) {
        let condition = condition(attrs);
        let conditional = condition.is_some();
        if let Some(condition) = condition {
            self.open_frame(
                AstNode::Conditional {
                    condition,
                    body: Vec::new(),
                },
                depth,
                None,
            );
        }

        if let Some(source) = value_of(attrs, "r-for-every") {
            let tag = if conditional {
                None
            } else {
                value_of(attrs, "r-tag").map(identifier)
            };
            let (item, index) = match &tag {
                Some(tag) => (tag.clone(), format!("{tag}_index")),
                None => ("item".to_string(), "index".to_string()),
            };
            let vars = (item.clone(), index.clone());
            self.open_frame(
                AstNode::Loop {
                    source: source.to_string(),
                    tag,
                    item,
                    index,
                    body: Vec::new(),
                },
                depth,
                Some(vars),
            );
        }

        let command = if has(attrs, "r-replace-slot") {
            Some((SlotCommandKind::Replace, value_of(attrs, "r-replace-slot")))
        } else if has(attrs, "r-add-to-slot") {
            Some((SlotCommandKind::Add, value_of(attrs, "r-add-to-slot")))
        } else {
            None
        };
        if let Some((kind, name)) = command {
            self.open_frame(
                AstNode::SlotCommand {
                    kind,
                    name: slot_name(name),
                    body: Vec::new(),
                },
                depth,
                None,
            );
        }
    }

    fn close_element(&mut self, name: &str, depth: usize) {
        if !is_reserved(name) {
            self.push_content(Content::CloseTag(name.to_string()));
        }
        self.close_frames(depth);
    }

    fn extend(&mut self, attrs: &AttrMap, depth: usize, void: bool) {
        if !self.leading {
            tracing::warn!("r-extend after page content ignored");
        } else if self.extended {
            tracing::warn!("only the first r-extend of a page is used");
        } else if let Some(target) = value_of(attrs, "name") {
            self.extended = true;
            self.push_node(AstNode::Extend {
                name: target.to_string(),
                args: arguments(attrs),
                condition: condition(attrs),
            });
        } else {
            tracing::warn!("r-extend without a name dropped");
        }
        self.skip_children(depth, void);
    }

    fn require(&mut self, attrs: &AttrMap, depth: usize, void: bool) {
        if !self.leading {
            tracing::warn!("r-require after page content ignored");
        } else if let (Some(name), Some(ty)) = (value_of(attrs, "name"), value_of(attrs, "type")) {
            self.push_node(AstNode::Requirement(Param {
                name: name.to_string(),
                ty: ty.to_string(),
                label: value_of(attrs, "label").map(str::to_string),
                default: value_of(attrs, "default").map(str::to_string),
                overridable: has(attrs, "overridable"),
            }));
        } else {
            tracing::warn!("r-require needs both name and type");
        }
        self.skip_children(depth, void);
    }

    fn modifier(&mut self, element: &str, attrs: &AttrMap, depth: usize, void: bool) {
        self.skip_children(depth, void);
        let Some(attribute) = value_of(attrs, "name") else {
            tracing::warn!(element, "attribute modifier without a name dropped");
            return;
        };
        let kind = if element == "r-unset" {
            ModifierKind::Remove
        } else if has(attrs, "append") {
            ModifierKind::Append
        } else {
            ModifierKind::Replace
        };
        let value = match kind {
            ModifierKind::Remove => None,
            ModifierKind::Append | ModifierKind::Replace => {
                value_of(attrs, "value").map(str::to_string)
            }
        };
        self.attach_modifier(AttributeModifier {
            kind,
            attribute: attribute.to_string(),
            value,
            condition: condition(attrs),
        });
    }

    /// Attaches a modifier to the last element of the writable branch,
    /// looking back over whitespace only.
    fn attach_modifier(&mut self, modifier: AttributeModifier) {
        let owner = self.current();
        let branch = self.ast.branch(owner).to_vec();

        for (position, &id) in branch.iter().enumerate().rev() {
            let found = match self.ast.get(id) {
                AstNode::Constant(items) => {
                    let Some(at) = items.iter().rposition(|c| !c.is_blank()) else {
                        continue;
                    };
                    matches!(
                        items.get(at),
                        Some(Content::OpenTag(_) | Content::VoidTag(_))
                    )
                    .then_some(at)
                }
                AstNode::AttributeModifiers { .. } => {
                    if let Some(AstNode::AttributeModifiers { modifiers, .. }) = self.ast.get_mut(id) {
                        modifiers.push(modifier);
                    }
                    return;
                }
                AstNode::SlotDeclare { .. }
                | AstNode::SlotCommand { .. }
                | AstNode::Include { .. }
                | AstNode::Extend { .. }
                | AstNode::Conditional { .. }
                | AstNode::Loop { .. }
                | AstNode::Requirement(_)
                | AstNode::Eval(_)
                | AstNode::Value { .. }
                | AstNode::Assignment { .. }
                | AstNode::EndOfBranch
                | AstNode::Noop => None,
            };

            let Some(at) = found else { break };
            self.split_constant(owner, position, id, at, modifier);
            return;
        }

        tracing::debug!(
            attribute = modifier.attribute.as_str(),
            "attribute modifier without a preceding element ignored"
        );
    }

    /// Moves the element at `at` of constant `id` into its own
    /// `AttributeModifiers` node, keeping what followed it as a new constant.
    fn split_constant(
        &mut self,
        owner: Option<NodeId>,
        position: usize,
        id: NodeId,
        at: usize,
        modifier: AttributeModifier,
    ) {
        let Some(AstNode::Constant(items)) = self.ast.get_mut(id) else {
            return;
        };
        let tail = items.split_off(at.saturating_add(1));
        let replace = at == 0;
        let (target, void) = match items.pop() {
            Some(Content::OpenTag(element)) => (element, false),
            Some(Content::VoidTag(element)) => (element, true),
            Some(other @ (Content::Text(_) | Content::NewLine | Content::CloseTag(_))) => {
                items.push(other);
                return;
            }
            None => return,
        };

        let mut inserted = vec![self.ast.alloc(AstNode::AttributeModifiers {
            modifiers: vec![modifier],
            target,
            void,
        })];
        if !tail.is_empty() {
            inserted.push(self.ast.alloc(AstNode::Constant(tail)));
        }
        if let Some(branch) = self.ast.branch_mut(owner) {
            let end = position.saturating_add(1);
            let start = if replace { position } else { end };
            if end <= branch.len() {
                branch.splice(start..end, inserted);
            }
        }
    }

    fn finish(mut self) -> Ast {
        if let Some(raw) = self.raw_eval.take() {
            self.push_node(AstNode::Eval(raw.code));
        }
        while let Some(frame) = self.stack.pop() {
            self.end_branch(frame.owner);
        }
        self.ast
    }
}

/// Builds the AST of one template from its lexed nodes.
///
/// Never fails: control elements missing what they need become `Noop` and
/// lose their children.
pub(crate) fn build(nodes: Vec<Node>) -> Ast {
    let mut builder = Builder::new();
    for node in nodes {
        builder.feed(node);
    }
    builder.finish()
}
