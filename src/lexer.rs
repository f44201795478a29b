use std::borrow::Cow;
use std::collections::BTreeMap;

/// How an attribute value was quoted in the source.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) enum QuoteKind {
    Single,
    Double,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AttrValue {
    /// An attribute without a value, e.g. `disabled`.
    Flag,
    Value { text: String, quote: QuoteKind },
}

pub(crate) type AttrMap = BTreeMap<String, AttrValue>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NodeContent {
    TagOpen { name: String, attrs: AttrMap },
    TagVoid {
        name: String,
        attrs: AttrMap,
        /// Written as `<x/>`, as opposed to an HTML void or auto-voided tag.
        self_closing: bool,
    },
    TagClose { name: String },
    Text(String),
    /// Text found inside a raw-text element (`script`/`style`).
    RawData(String),
    NewLine,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Node {
    pub(crate) depth: usize,
    pub(crate) content: NodeContent,
}

/// Elements HTML never closes. They are emitted as void tags straight away.
const HTML_VOID_ELEMENTS: [&str; 13] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Elements whose content is not markup. `r-eval` bodies are Rust code.
const RAW_TEXT_ELEMENTS: [&str; 3] = ["script", "style", "r-eval"];

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.' | '@')
}

fn is_html_void(name: &str) -> bool {
    HTML_VOID_ELEMENTS
        .iter()
        .any(|void| void.eq_ignore_ascii_case(name))
}

/// Renders attributes in their canonical order: value-bearing attributes by
/// name, then flags by name. Generated output depends on this ordering.
pub(crate) fn render_attributes(attrs: &AttrMap, out: &mut String) {
    for (name, value) in attrs {
        if let AttrValue::Value { text, quote } = value {
            out.push(' ');
            out.push_str(name);
            out.push('=');
            match quote {
                QuoteKind::Double => {
                    out.push('"');
                    out.push_str(text);
                    out.push('"');
                }
                QuoteKind::Single => {
                    out.push('\'');
                    out.push_str(text);
                    out.push('\'');
                }
                QuoteKind::None => out.push_str(text),
            }
        }
    }
    for (name, value) in attrs {
        if matches!(value, AttrValue::Flag) {
            out.push(' ');
            out.push_str(name);
        }
    }
}

/// Renders a node back into markup.
pub(crate) fn render_node(content: &NodeContent, out: &mut String) {
    match content {
        NodeContent::TagOpen { name, attrs } => {
            out.push('<');
            out.push_str(name);
            render_attributes(attrs, out);
            out.push('>');
        }
        NodeContent::TagVoid {
            name,
            attrs,
            self_closing,
        } => {
            out.push('<');
            out.push_str(name);
            render_attributes(attrs, out);
            out.push_str(if *self_closing { "/>" } else { ">" });
        }
        NodeContent::TagClose { name } => {
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        NodeContent::Text(text) | NodeContent::RawData(text) => out.push_str(text),
        NodeContent::NewLine => out.push('\n'),
    }
}

#[derive(Debug)]
struct PendingTag {
    name: String,
    attrs: AttrMap,
}

impl PendingTag {
    const fn new(name: String) -> Self {
        Self {
            name,
            attrs: BTreeMap::new(),
        }
    }

    fn insert(&mut self, name: String, value: AttrValue) {
        // The first occurrence of a duplicated attribute wins, as in browsers.
        self.attrs.entry(name).or_insert(value);
    }
}

#[derive(Debug, Default)]
enum State {
    #[default]
    Text,
    TagName(String),
    Attrs(PendingTag),
    AttrName(PendingTag, String),
    AttrSep(PendingTag, String),
    AttrValueStart(PendingTag, String),
    AttrValue(PendingTag, String, String, QuoteKind),
    VoidTagEnd(PendingTag),
    CloseTagName(String),
    CloseTagEnd(String),
}

/// Whether the character that drove a transition was used up.
enum Step {
    Next,
    Reprocess,
}

struct RawText {
    name: String,
    /// Same-named elements opened inside the raw element.
    depth: usize,
}

struct Lexer<'a> {
    input: &'a str,
    state: State,
    /// Pending text in the `Text` state.
    text: String,
    /// Byte offset of the `<` that began the tag under construction.
    tag_start: usize,
    depth: usize,
    nodes: Vec<Node>,
    /// Indices into `nodes` of opening tags still waiting for a close.
    open: Vec<usize>,
    raw: Option<RawText>,
}

impl<'a> Lexer<'a> {
    const fn new(input: &'a str) -> Self {
        Lexer {
            input,
            state: State::Text,
            text: String::new(),
            tag_start: 0,
            depth: 0,
            nodes: Vec::new(),
            open: Vec::new(),
            raw: None,
        }
    }

    fn push(&mut self, content: NodeContent) {
        self.nodes.push(Node {
            depth: self.depth,
            content,
        });
    }

    /// Appends literal text, merging it into the previous node when that node
    /// is text of the same kind at the same depth.
    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let raw = self.raw.is_some();
        let depth = self.depth;
        if let Some(last) = self.nodes.last_mut() {
            if last.depth == depth {
                match &mut last.content {
                    NodeContent::Text(existing) if !raw => {
                        existing.push_str(text);
                        return;
                    }
                    NodeContent::RawData(existing) if raw => {
                        existing.push_str(text);
                        return;
                    }
                    NodeContent::Text(_)
                    | NodeContent::RawData(_)
                    | NodeContent::TagOpen { .. }
                    | NodeContent::TagVoid { .. }
                    | NodeContent::TagClose { .. }
                    | NodeContent::NewLine => {}
                }
            }
        }
        let content = if raw {
            NodeContent::RawData(text.to_string())
        } else {
            NodeContent::Text(text.to_string())
        };
        self.push(content);
    }

    /// Like `push_text`, but turns embedded newlines into `NewLine` nodes.
    fn push_literal(&mut self, text: &str) {
        let mut lines = text.split('\n');
        if let Some(first) = lines.next() {
            self.push_text(first);
        }
        for line in lines {
            self.push(NodeContent::NewLine);
            self.push_text(line);
        }
    }

    fn flush_text(&mut self) {
        let text = std::mem::take(&mut self.text);
        self.push_text(&text);
    }

    fn source(&self, end: usize) -> &'a str {
        self.input.get(self.tag_start..end).unwrap_or_default()
    }

    /// Aborts the tag under construction. Everything from its `<` up to (not
    /// including) the character at `at` becomes literal text, and that
    /// character is scanned again as text.
    fn cancel_tag(&mut self, at: usize) -> Step {
        let literal = self.source(at);
        tracing::trace!(literal, "cancelled malformed tag");
        self.push_literal(literal);
        self.state = State::Text;
        Step::Reprocess
    }

    fn step(&mut self, at: usize, c: char) -> Step {
        let end = at.saturating_add(c.len_utf8());
        match std::mem::take(&mut self.state) {
            State::Text => {
                match c {
                    '<' => {
                        self.flush_text();
                        self.tag_start = at;
                        self.state = State::TagName(String::new());
                    }
                    '\n' => {
                        self.flush_text();
                        self.push(NodeContent::NewLine);
                    }
                    _ => self.text.push(c),
                }
                Step::Next
            }
            State::TagName(mut name) => {
                if name.is_empty() {
                    if c == '/' {
                        self.state = State::CloseTagName(name);
                        return Step::Next;
                    }
                    if !c.is_ascii_alphabetic() {
                        return self.cancel_tag(at);
                    }
                }
                if is_name_char(c) {
                    name.push(c);
                    self.state = State::TagName(name);
                } else if c.is_whitespace() {
                    self.state = State::Attrs(PendingTag::new(name));
                } else if c == '>' {
                    self.finish_open(PendingTag::new(name), false, end);
                } else if c == '/' {
                    self.state = State::VoidTagEnd(PendingTag::new(name));
                } else {
                    return self.cancel_tag(at);
                }
                Step::Next
            }
            State::Attrs(tag) => {
                if c.is_whitespace() {
                    self.state = State::Attrs(tag);
                } else if is_name_char(c) {
                    self.state = State::AttrName(tag, c.to_string());
                } else if c == '>' {
                    self.finish_open(tag, false, end);
                } else if c == '/' {
                    self.state = State::VoidTagEnd(tag);
                } else {
                    return self.cancel_tag(at);
                }
                Step::Next
            }
            State::AttrName(mut tag, mut attr) => {
                if is_name_char(c) {
                    attr.push(c);
                    self.state = State::AttrName(tag, attr);
                } else if c == '=' {
                    self.state = State::AttrValueStart(tag, attr);
                } else if c.is_whitespace() {
                    self.state = State::AttrSep(tag, attr);
                } else if c == '>' {
                    tag.insert(attr, AttrValue::Flag);
                    self.finish_open(tag, false, end);
                } else if c == '/' {
                    tag.insert(attr, AttrValue::Flag);
                    self.state = State::VoidTagEnd(tag);
                } else {
                    return self.cancel_tag(at);
                }
                Step::Next
            }
            State::AttrSep(mut tag, attr) => {
                if c.is_whitespace() {
                    self.state = State::AttrSep(tag, attr);
                } else if c == '=' {
                    self.state = State::AttrValueStart(tag, attr);
                } else if is_name_char(c) {
                    tag.insert(attr, AttrValue::Flag);
                    self.state = State::AttrName(tag, c.to_string());
                } else if c == '>' {
                    tag.insert(attr, AttrValue::Flag);
                    self.finish_open(tag, false, end);
                } else if c == '/' {
                    tag.insert(attr, AttrValue::Flag);
                    self.state = State::VoidTagEnd(tag);
                } else {
                    return self.cancel_tag(at);
                }
                Step::Next
            }
            State::AttrValueStart(tag, attr) => {
                match c {
                    '"' => {
                        self.state = State::AttrValue(tag, attr, String::new(), QuoteKind::Double);
                    }
                    '\'' => {
                        self.state = State::AttrValue(tag, attr, String::new(), QuoteKind::Single);
                    }
                    '>' | '/' | '<' | '=' | '`' => return self.cancel_tag(at),
                    _ if c.is_whitespace() => self.state = State::AttrValueStart(tag, attr),
                    _ => {
                        self.state = State::AttrValue(tag, attr, c.to_string(), QuoteKind::None);
                    }
                }
                Step::Next
            }
            State::AttrValue(mut tag, attr, mut value, quote) => {
                match quote {
                    QuoteKind::Double | QuoteKind::Single => {
                        let closing = if quote == QuoteKind::Double { '"' } else { '\'' };
                        if c == closing {
                            tag.insert(attr, AttrValue::Value { text: value, quote });
                            self.state = State::Attrs(tag);
                        } else {
                            value.push(if c == '\n' { ' ' } else { c });
                            self.state = State::AttrValue(tag, attr, value, quote);
                        }
                    }
                    QuoteKind::None => {
                        if c.is_whitespace() {
                            tag.insert(attr, AttrValue::Value { text: value, quote });
                            self.state = State::Attrs(tag);
                        } else if c == '>' {
                            tag.insert(attr, AttrValue::Value { text: value, quote });
                            self.finish_open(tag, false, end);
                        } else if c == '/' {
                            tag.insert(attr, AttrValue::Value { text: value, quote });
                            self.state = State::VoidTagEnd(tag);
                        } else if matches!(c, '"' | '\'' | '<' | '=' | '`') {
                            return self.cancel_tag(at);
                        } else {
                            value.push(c);
                            self.state = State::AttrValue(tag, attr, value, quote);
                        }
                    }
                }
                Step::Next
            }
            State::VoidTagEnd(tag) => {
                if c == '>' {
                    self.finish_open(tag, true, end);
                    Step::Next
                } else {
                    self.cancel_tag(at)
                }
            }
            State::CloseTagName(mut name) => {
                if is_name_char(c) && (!name.is_empty() || c.is_ascii_alphabetic()) {
                    name.push(c);
                    self.state = State::CloseTagName(name);
                    Step::Next
                } else if !name.is_empty() && c == '>' {
                    self.finish_close(name, end);
                    Step::Next
                } else if !name.is_empty() && c.is_whitespace() {
                    self.state = State::CloseTagEnd(name);
                    Step::Next
                } else {
                    self.cancel_tag(at)
                }
            }
            State::CloseTagEnd(name) => {
                if c.is_whitespace() {
                    self.state = State::CloseTagEnd(name);
                    Step::Next
                } else if c == '>' {
                    self.finish_close(name, end);
                    Step::Next
                } else {
                    self.cancel_tag(at)
                }
            }
        }
    }

    fn finish_open(&mut self, tag: PendingTag, self_closing: bool, end: usize) {
        if let Some(raw) = &mut self.raw {
            if !self_closing && raw.name.eq_ignore_ascii_case(&tag.name) {
                raw.depth = raw.depth.saturating_add(1);
            }
            let literal = self.source(end);
            self.push_literal(literal);
            return;
        }

        let PendingTag { name, attrs } = tag;
        if self_closing || is_html_void(&name) {
            self.push(NodeContent::TagVoid {
                name,
                attrs,
                self_closing,
            });
            return;
        }

        if RAW_TEXT_ELEMENTS
            .iter()
            .any(|raw| raw.eq_ignore_ascii_case(&name))
        {
            self.raw = Some(RawText {
                name: name.clone(),
                depth: 0,
            });
        }
        self.open.push(self.nodes.len());
        self.push(NodeContent::TagOpen { name, attrs });
        self.depth = self.depth.saturating_add(1);
    }

    fn finish_close(&mut self, name: String, end: usize) {
        if let Some(raw) = &mut self.raw {
            if !raw.name.eq_ignore_ascii_case(&name) {
                let literal = self.source(end);
                self.push_literal(literal);
                return;
            }
            if raw.depth > 0 {
                raw.depth = raw.depth.saturating_sub(1);
                let literal = self.source(end);
                self.push_literal(literal);
                return;
            }
            self.raw = None;
        }

        let matched = self.open.iter().rposition(|&index| {
            self.nodes.get(index).is_some_and(|node| {
                matches!(&node.content, NodeContent::TagOpen { name: open, .. } if open.eq_ignore_ascii_case(&name))
            })
        });

        let Some(matched) = matched else {
            // Nothing to close: the stray closing tag is just text.
            let literal = self.source(end);
            self.push_literal(literal);
            return;
        };

        while self.open.len() > matched.saturating_add(1) {
            if let Some(index) = self.open.pop() {
                self.convert_to_void(index);
            }
        }
        self.open.pop();
        self.depth = self.depth.saturating_sub(1);
        self.push(NodeContent::TagClose { name });
    }

    /// Turns an unclosed opening tag into a void tag, lifting everything
    /// after it one level up.
    fn convert_to_void(&mut self, index: usize) {
        if let Some(node) = self.nodes.get_mut(index) {
            if let NodeContent::TagOpen { name, attrs } = &mut node.content {
                tracing::trace!(name = name.as_str(), "auto-voided unclosed element");
                node.content = NodeContent::TagVoid {
                    name: std::mem::take(name),
                    attrs: std::mem::take(attrs),
                    self_closing: false,
                };
            }
        }
        for node in self.nodes.iter_mut().skip(index.saturating_add(1)) {
            node.depth = node.depth.saturating_sub(1);
        }
        self.depth = self.depth.saturating_sub(1);
    }

    fn finish(mut self) -> Vec<Node> {
        if !matches!(self.state, State::Text) {
            self.cancel_tag(self.input.len());
        }
        self.flush_text();
        while let Some(index) = self.open.pop() {
            self.convert_to_void(index);
        }
        self.nodes
    }
}

/// Splits template text into depth-annotated nodes.
///
/// This never fails: anything that cannot be read as a tag is kept as text.
/// `\r\n` line endings are normalised to `\n` first.
pub(crate) fn tokenize(input: &str) -> Vec<Node> {
    let input: Cow<'_, str> = if input.contains("\r\n") {
        Cow::Owned(input.replace("\r\n", "\n"))
    } else {
        Cow::Borrowed(input)
    };

    let mut lexer = Lexer::new(&input);
    let mut chars = input.char_indices();
    let mut current = chars.next();
    while let Some((at, c)) = current {
        match lexer.step(at, c) {
            Step::Next => current = chars.next(),
            Step::Reprocess => {}
        }
    }
    lexer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! text {
        ($depth:expr, $data:expr) => {
            Node {
                depth: $depth,
                content: NodeContent::Text($data.to_string()),
            }
        };
    }
    macro_rules! newline {
        ($depth:expr) => {
            Node {
                depth: $depth,
                content: NodeContent::NewLine,
            }
        };
    }
    macro_rules! open {
        ($depth:expr, $name:expr) => {
            Node {
                depth: $depth,
                content: NodeContent::TagOpen {
                    name: $name.to_string(),
                    attrs: AttrMap::new(),
                },
            }
        };
    }
    macro_rules! void {
        ($depth:expr, $name:expr) => {
            void!($depth, $name, false)
        };
        ($depth:expr, $name:expr, $closed:expr) => {
            Node {
                depth: $depth,
                content: NodeContent::TagVoid {
                    name: $name.to_string(),
                    attrs: AttrMap::new(),
                    self_closing: $closed,
                },
            }
        };
    }
    macro_rules! close {
        ($depth:expr, $name:expr) => {
            Node {
                depth: $depth,
                content: NodeContent::TagClose {
                    name: $name.to_string(),
                },
            }
        };
    }

    fn value(text: &str, quote: QuoteKind) -> AttrValue {
        AttrValue::Value {
            text: text.to_string(),
            quote,
        }
    }

    fn render_all(nodes: &[Node]) -> String {
        let mut out = String::new();
        for node in nodes {
            render_node(&node.content, &mut out);
        }
        out
    }

    fn first(nodes: &[Node]) -> &NodeContent {
        &nodes.first().unwrap().content
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_empty_input() {
        assert_eq!(tokenize(""), vec![]);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_plain_text() {
        assert_eq!(tokenize("hello world"), vec![text!(0, "hello world")]);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_newlines_are_explicit_nodes() {
        assert_eq!(
            tokenize("one\ntwo\n"),
            vec![text!(0, "one"), newline!(0), text!(0, "two"), newline!(0)]
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_crlf_is_normalised() {
        assert_eq!(
            tokenize("a\r\nb"),
            vec![text!(0, "a"), newline!(0), text!(0, "b")]
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_nested_depths() {
        assert_eq!(
            tokenize("<div><p>hi</p></div>"),
            vec![
                open!(0, "div"),
                open!(1, "p"),
                text!(2, "hi"),
                close!(1, "p"),
                close!(0, "div"),
            ]
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_void_tags_keep_depth() {
        assert_eq!(
            tokenize("<p><br/><hr>x</p>"),
            vec![
                open!(0, "p"),
                void!(1, "br", true),
                void!(1, "hr"),
                text!(1, "x"),
                close!(0, "p"),
            ]
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_attribute_forms() {
        let nodes = tokenize(r#"<a href="/x" data-y='z' w=1 hidden>"#);
        let NodeContent::TagVoid { attrs, .. } = first(&nodes) else {
            panic!("an unclosed element should be voided at end of input");
        };
        assert_eq!(attrs.get("href"), Some(&value("/x", QuoteKind::Double)));
        assert_eq!(attrs.get("data-y"), Some(&value("z", QuoteKind::Single)));
        assert_eq!(attrs.get("w"), Some(&value("1", QuoteKind::None)));
        assert_eq!(attrs.get("hidden"), Some(&AttrValue::Flag));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_attribute_spacing_around_equals() {
        let nodes = tokenize("<input value = \"a\" />");
        let NodeContent::TagVoid { name, attrs, .. } = first(&nodes) else {
            panic!("expected void tag, got {nodes:?}");
        };
        assert_eq!(name, "input");
        assert_eq!(attrs.get("value"), Some(&value("a", QuoteKind::Double)));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_newline_inside_quotes_becomes_space() {
        let nodes = tokenize("<div title=\"a\nb\"></div>");
        let NodeContent::TagOpen { attrs, .. } = first(&nodes) else {
            panic!("expected open tag, got {nodes:?}");
        };
        assert_eq!(attrs.get("title"), Some(&value("a b", QuoteKind::Double)));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_unquoted_value_stops_at_slash() {
        let nodes = tokenize("<img src=a/>");
        let NodeContent::TagVoid { attrs, .. } = first(&nodes) else {
            panic!("expected void tag, got {nodes:?}");
        };
        assert_eq!(attrs.get("src"), Some(&value("a", QuoteKind::None)));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_first_duplicate_attribute_wins() {
        let nodes = tokenize("<p id=a id=b></p>");
        let NodeContent::TagOpen { attrs, .. } = first(&nodes) else {
            panic!("expected open tag, got {nodes:?}");
        };
        assert_eq!(attrs.get("id"), Some(&value("a", QuoteKind::None)));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_less_than_in_text_is_literal() {
        assert_eq!(tokenize("a < b"), vec![text!(0, "a < b")]);
        assert_eq!(tokenize("1<2>3"), vec![text!(0, "1<2>3")]);
        assert_eq!(tokenize("x <"), vec![text!(0, "x <")]);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_cancelled_tag_reprocesses_offending_char() {
        assert_eq!(
            tokenize("<<b>x</b>"),
            vec![text!(0, "<"), open!(0, "b"), text!(1, "x"), close!(0, "b")]
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_cancelled_tag_before_newline() {
        assert_eq!(
            tokenize("a <b c=\n"),
            vec![text!(0, "a <b c="), newline!(0)]
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_unterminated_tag_at_end_of_input() {
        assert_eq!(
            tokenize("see <div class=\"x"),
            vec![text!(0, "see <div class=\"x")]
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_unclosed_child_is_auto_voided() {
        assert_eq!(
            tokenize("<div><span>text</div>"),
            vec![
                open!(0, "div"),
                void!(1, "span"),
                text!(1, "text"),
                close!(0, "div"),
            ]
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_several_unclosed_children_are_auto_voided() {
        assert_eq!(
            tokenize("<div><span><b>x</div>y"),
            vec![
                open!(0, "div"),
                void!(1, "span"),
                void!(1, "b"),
                text!(1, "x"),
                close!(0, "div"),
                text!(0, "y"),
            ]
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_stray_close_is_literal() {
        // A close with no matching open stays text and voids nothing, so the
        // enclosing `<p>` still closes normally.
        assert_eq!(
            tokenize("<p>a</span>b</p>"),
            vec![open!(0, "p"), text!(1, "a</span>b"), close!(0, "p")]
        );
        assert_eq!(tokenize("</div>x"), vec![text!(0, "</div>x")]);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_unclosed_at_end_is_voided() {
        assert_eq!(
            tokenize("<section>body"),
            vec![void!(0, "section"), text!(0, "body")]
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_script_content_is_raw() {
        let nodes = tokenize("<script>if (a<b) { x = \"</div>\"; }</script>");
        assert_eq!(
            nodes,
            vec![
                open!(0, "script"),
                Node {
                    depth: 1,
                    content: NodeContent::RawData("if (a<b) { x = \"</div>\"; }".to_string()),
                },
                close!(0, "script"),
            ]
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_nested_raw_element_only_outermost_close_exits() {
        let nodes = tokenize("<style><style>a</style>b</style>c");
        assert_eq!(
            nodes,
            vec![
                open!(0, "style"),
                Node {
                    depth: 1,
                    content: NodeContent::RawData("<style>a</style>b".to_string()),
                },
                close!(0, "style"),
                text!(0, "c"),
            ]
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_render_attributes_canonical_order() {
        let nodes = tokenize(r#"<a selected z="1" b='2' c=3>"#);
        let mut out = String::new();
        render_node(first(&nodes), &mut out);
        assert_eq!(out, r#"<a b='2' c=3 z="1" selected>"#);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_void_rendering_keeps_source_form() {
        let input = "<p><br><img src=\"a\"/><span>x</p>";
        assert_eq!(render_all(&tokenize(input)), input);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_eval_body_is_raw() {
        let nodes = tokenize("<r-eval>let v: Vec<String> = a < b;</r-eval>");
        assert_eq!(
            nodes,
            vec![
                open!(0, "r-eval"),
                Node {
                    depth: 1,
                    content: NodeContent::RawData("let v: Vec<String> = a < b;".to_string()),
                },
                close!(0, "r-eval"),
            ]
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_plain_markup_round_trips() {
        let input = "<ul>\n  <li class=\"a\">one &amp; two</li>\n  <li>3 < 4</li>\n</ul>\n";
        assert_eq!(render_all(&tokenize(input)), input);
    }
}
