use crate::lexer::AttrMap;
use crate::signature::Param;

/// Index of a node inside an [`Ast`] arena.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct NodeId(usize);

/// A literal element as written in the template, minus control attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Element {
    pub(crate) name: String,
    pub(crate) attrs: AttrMap,
    /// Only meaningful for void tags.
    pub(crate) self_closing: bool,
}

/// One item of a literal run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Content {
    Text(String),
    NewLine,
    OpenTag(Element),
    VoidTag(Element),
    CloseTag(String),
}

impl Content {
    /// True for content that produces no visible characters besides whitespace.
    pub(crate) fn is_blank(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::NewLine => true,
            Self::OpenTag(_) | Self::VoidTag(_) | Self::CloseTag(_) => false,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum SlotCommandKind {
    Add,
    Replace,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum ConditionKind {
    If,
    ElseIf,
    Else,
}

/// A condition taken from `r-if` / `r-else-if` / `r-else` (plus `r-tag`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Condition {
    pub(crate) kind: ConditionKind,
    /// The Rust expression to test. Empty for `Else`.
    pub(crate) check: String,
    pub(crate) tag: Option<String>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum ModifierKind {
    Append,
    Replace,
    Remove,
}

/// One `r-set` / `r-unset` applied to an element's attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AttributeModifier {
    pub(crate) kind: ModifierKind,
    pub(crate) attribute: String,
    /// The Rust expression producing the new value; absent for `Remove`.
    pub(crate) value: Option<String>,
    pub(crate) condition: Option<Condition>,
}

/// Argument expressions supplied on an `r-include` / `r-extend` element.
pub(crate) type Arguments = Vec<(String, String)>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AstNode {
    Constant(Vec<Content>),
    SlotDeclare {
        name: Option<String>,
        body: Vec<NodeId>,
    },
    SlotCommand {
        kind: SlotCommandKind,
        name: Option<String>,
        body: Vec<NodeId>,
    },
    Include {
        name: String,
        args: Arguments,
        body: Vec<NodeId>,
    },
    Extend {
        name: String,
        args: Arguments,
        condition: Option<Condition>,
    },
    Conditional {
        condition: Condition,
        body: Vec<NodeId>,
    },
    Loop {
        source: String,
        tag: Option<String>,
        item: String,
        index: String,
        body: Vec<NodeId>,
    },
    AttributeModifiers {
        modifiers: Vec<AttributeModifier>,
        target: Element,
        void: bool,
    },
    Requirement(Param),
    Eval(String),
    Value {
        of: String,
        default: Option<String>,
        escape: bool,
    },
    Assignment {
        name: String,
        expr: String,
    },
    /// Closes the nested body it appears in.
    EndOfBranch,
    Noop,
}

impl AstNode {
    pub(crate) fn body(&self) -> Option<&Vec<NodeId>> {
        match self {
            Self::SlotDeclare { body, .. }
            | Self::SlotCommand { body, .. }
            | Self::Include { body, .. }
            | Self::Conditional { body, .. }
            | Self::Loop { body, .. } => Some(body),
            Self::Constant(_)
            | Self::Extend { .. }
            | Self::AttributeModifiers { .. }
            | Self::Requirement(_)
            | Self::Eval(_)
            | Self::Value { .. }
            | Self::Assignment { .. }
            | Self::EndOfBranch
            | Self::Noop => None,
        }
    }

    pub(crate) fn body_mut(&mut self) -> Option<&mut Vec<NodeId>> {
        match self {
            Self::SlotDeclare { body, .. }
            | Self::SlotCommand { body, .. }
            | Self::Include { body, .. }
            | Self::Conditional { body, .. }
            | Self::Loop { body, .. } => Some(body),
            Self::Constant(_)
            | Self::Extend { .. }
            | Self::AttributeModifiers { .. }
            | Self::Requirement(_)
            | Self::Eval(_)
            | Self::Value { .. }
            | Self::Assignment { .. }
            | Self::EndOfBranch
            | Self::Noop => None,
        }
    }
}

static MISSING: AstNode = AstNode::Noop;

/// The parsed form of one template: an arena of nodes plus the top-level
/// branch. Built once, read once by the code generator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Ast {
    nodes: Vec<AstNode>,
    pub(crate) root: Vec<NodeId>,
}

impl Ast {
    pub(crate) fn alloc(&mut self, node: AstNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub(crate) fn get(&self, id: NodeId) -> &AstNode {
        self.nodes.get(id.0).unwrap_or(&MISSING)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut AstNode> {
        self.nodes.get_mut(id.0)
    }

    /// The nodes of a branch; `None` addresses the root.
    pub(crate) fn branch(&self, owner: Option<NodeId>) -> &[NodeId] {
        match owner {
            None => &self.root,
            Some(id) => self.get(id).body().map_or(&[], Vec::as_slice),
        }
    }

    pub(crate) fn branch_mut(&mut self, owner: Option<NodeId>) -> Option<&mut Vec<NodeId>> {
        match owner {
            None => Some(&mut self.root),
            Some(id) => self.get_mut(id).and_then(AstNode::body_mut),
        }
    }

    /// Iterates the nodes of a branch, stopping at its `EndOfBranch`.
    pub(crate) fn walk<'a>(&'a self, branch: &'a [NodeId]) -> impl Iterator<Item = &'a AstNode> + 'a {
        branch
            .iter()
            .map(|&id| self.get(id))
            .take_while(|node| !matches!(node, AstNode::EndOfBranch))
    }
}
