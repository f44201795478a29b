//! Runtime support for generated template code.
//!
//! Every generated `*_tree` function fills a [`TreeBuilder`] and returns the
//! resulting [`Tree`]. Rendering a tree resolves its slots, includes and
//! extend chain into flat text:
//!
//! ```
//! use rtml::runtime::{Tree, TreeBuilder};
//!
//! fn layout() -> Tree {
//!     let mut out = TreeBuilder::new();
//!     out.text("<main>");
//!     out.slot_with_defaults_start("default");
//!     out.text("nothing here");
//!     out.slot_with_defaults_end("default");
//!     out.text("</main>");
//!     out.finish()
//! }
//!
//! let mut page = TreeBuilder::new();
//! page.extend(layout());
//! page.text("Hello");
//! assert_eq!(page.finish().render(), "<main>Hello</main>");
//! ```

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

/// A slot name. `None` is the unnamed (`default`) slot.
pub type SlotName = Option<&'static str>;

fn slot_key(name: &'static str) -> SlotName {
    let name = name.trim();
    if name.is_empty() || name == "default" {
        None
    } else {
        Some(name)
    }
}

/// Escapes `&`, `<`, `>`, `"` and `'` for use in HTML text and attributes.
pub fn escape_html(input: &str) -> Cow<'_, str> {
    if !input.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len().saturating_add(16));
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// One step of a render tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Text(Cow<'static, str>),
    SlotDeclare(SlotName),
    SlotDeclareWithDefaultsStart(SlotName),
    SlotDeclareWithDefaultsEnd(SlotName),
    Include(Tree),
    /// Starts the override body of an include; ends at `IncludeWithDefaultsEnd`.
    IncludeWithDefaultsStart(Tree),
    IncludeWithDefaultsEnd,
    /// Diverts what follows into the named slot until `Clear`.
    SelectSlot {
        name: SlotName,
        replace: bool,
    },
    Clear,
    Noop,
}

/// Commands plus the tree this one extends, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    commands: Vec<Command>,
    parent: Option<Box<Tree>>,
}

impl Tree {
    pub const fn new(commands: Vec<Command>) -> Self {
        Self {
            commands,
            parent: None,
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent: Self) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn parent(&self) -> Option<&Self> {
        self.parent.as_deref()
    }

    /// Resolves the tree into text. Identical trees render identically.
    pub fn render(self) -> String {
        let mut registry = Registry::new();
        let mut out = String::new();
        registry.resolve_tree(self, &mut out);
        out
    }
}

/// How a literal attribute value was quoted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Quote {
    Double,
    Single,
    Bare,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttributeValue {
    text: String,
    quote: Quote,
}

/// Ordered attributes of an element whose attributes change at render time.
///
/// ```
/// use rtml::runtime::{Attributes, Quote};
///
/// let mut attrs = Attributes::new();
/// attrs.set_literal("class", "btn", Quote::Double);
/// attrs.append("class", &"primary");
/// attrs.flag("disabled");
/// attrs.remove("disabled");
/// assert_eq!(attrs.to_string(), " class=\"btn primary\"");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: Vec<(String, Option<AttributeValue>)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    fn put(&mut self, name: &str, value: Option<AttributeValue>) {
        match self.entries.iter_mut().find(|(existing, _)| existing == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    /// Sets a value exactly as written in the template.
    pub fn set_literal(&mut self, name: &str, text: &str, quote: Quote) {
        self.put(
            name,
            Some(AttributeValue {
                text: text.to_string(),
                quote,
            }),
        );
    }

    pub fn flag(&mut self, name: &str) {
        self.put(name, None);
    }

    /// Sets an escaped, double-quoted value.
    pub fn set<T: Display + ?Sized>(&mut self, name: &str, value: &T) {
        let text = escape_html(&value.to_string()).into_owned();
        self.put(
            name,
            Some(AttributeValue {
                text,
                quote: Quote::Double,
            }),
        );
    }

    /// Appends a space-separated, escaped value, as for `class`.
    pub fn append<T: Display + ?Sized>(&mut self, name: &str, value: &T) {
        let addition = escape_html(&value.to_string()).into_owned();
        if let Some((_, Some(existing))) = self.entries.iter_mut().find(|(n, _)| n == name) {
            if !existing.text.is_empty() {
                existing.text.push(' ');
                existing.text.push_str(&addition);
                if existing.quote == Quote::Bare {
                    existing.quote = Quote::Double;
                }
                return;
            }
        }
        self.put(
            name,
            Some(AttributeValue {
                text: addition,
                quote: Quote::Double,
            }),
        );
    }

    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(existing, _)| existing != name);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn render_into(&self, out: &mut String) {
        for (name, value) in &self.entries {
            out.push(' ');
            out.push_str(name);
            let Some(value) = value else { continue };
            out.push('=');
            match value.quote {
                Quote::Double => {
                    out.push('"');
                    out.push_str(&value.text);
                    out.push('"');
                }
                Quote::Single => {
                    out.push('\'');
                    out.push_str(&value.text);
                    out.push('\'');
                }
                Quote::Bare => out.push_str(&value.text),
            }
        }
    }
}

impl Display for Attributes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut out = String::new();
        self.render_into(&mut out);
        f.write_str(&out)
    }
}

/// Collects the commands of one template invocation.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    commands: Vec<Command>,
    parent: Option<Tree>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Appends literal text, merging it into preceding text.
    pub fn text<T: Into<Cow<'static, str>>>(&mut self, text: T) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        if let Some(Command::Text(last)) = self.commands.last_mut() {
            last.to_mut().push_str(&text);
            return;
        }
        self.push(Command::Text(text));
    }

    /// Appends a value, HTML-escaped.
    pub fn value<T: Display + ?Sized>(&mut self, value: &T) {
        let text = value.to_string();
        self.text(escape_html(&text).into_owned());
    }

    pub fn raw_value<T: Display + ?Sized>(&mut self, value: &T) {
        self.text(value.to_string());
    }

    /// Appends the escaped value, or the literal default when there is none.
    pub fn value_or<T: Display>(&mut self, value: Option<T>, default: &'static str) {
        match value {
            Some(value) => self.value(&value),
            None => self.text(default),
        }
    }

    pub fn raw_value_or<T: Display>(&mut self, value: Option<T>, default: &'static str) {
        match value {
            Some(value) => self.raw_value(&value),
            None => self.text(default),
        }
    }

    pub fn slot(&mut self, name: &'static str) {
        self.push(Command::SlotDeclare(slot_key(name)));
    }

    pub fn slot_with_defaults_start(&mut self, name: &'static str) {
        self.push(Command::SlotDeclareWithDefaultsStart(slot_key(name)));
    }

    pub fn slot_with_defaults_end(&mut self, name: &'static str) {
        self.push(Command::SlotDeclareWithDefaultsEnd(slot_key(name)));
    }

    pub fn include(&mut self, tree: Tree) {
        self.push(Command::Include(tree));
    }

    pub fn include_with_defaults_start(&mut self, tree: Tree) {
        self.push(Command::IncludeWithDefaultsStart(tree));
    }

    pub fn include_with_defaults_end(&mut self) {
        self.push(Command::IncludeWithDefaultsEnd);
    }

    pub fn select_slot(&mut self, name: &'static str, replace: bool) {
        self.push(Command::SelectSlot {
            name: slot_key(name),
            replace,
        });
    }

    pub fn clear(&mut self) {
        self.push(Command::Clear);
    }

    /// Makes `parent` the layout of this tree. The last call wins.
    pub fn extend(&mut self, parent: Tree) {
        self.parent = Some(parent);
    }

    pub fn open_tag(&mut self, name: &str, attrs: &Attributes) {
        let mut tag = String::with_capacity(name.len().saturating_add(2));
        tag.push('<');
        tag.push_str(name);
        attrs.render_into(&mut tag);
        tag.push('>');
        self.text(tag);
    }

    pub fn void_tag(&mut self, name: &str, attrs: &Attributes, self_closing: bool) {
        let mut tag = String::with_capacity(name.len().saturating_add(3));
        tag.push('<');
        tag.push_str(name);
        attrs.render_into(&mut tag);
        tag.push_str(if self_closing { "/>" } else { ">" });
        self.text(tag);
    }

    pub fn finish(self) -> Tree {
        Tree {
            commands: self.commands,
            parent: self.parent.map(Box::new),
        }
    }
}

const fn is_slot_start(command: &Command) -> bool {
    matches!(command, Command::SlotDeclareWithDefaultsStart(_))
}

const fn is_slot_end(command: &Command) -> bool {
    matches!(command, Command::SlotDeclareWithDefaultsEnd(_))
}

const fn is_include_start(command: &Command) -> bool {
    matches!(command, Command::IncludeWithDefaultsStart(_))
}

const fn is_include_end(command: &Command) -> bool {
    matches!(command, Command::IncludeWithDefaultsEnd)
}

/// Takes commands up to the end marker matching an already consumed start.
fn take_region<I: Iterator<Item = Command>>(
    iter: &mut I,
    opens: fn(&Command) -> bool,
    closes: fn(&Command) -> bool,
) -> Vec<Command> {
    let mut depth = 0_usize;
    let mut region = Vec::new();
    for command in iter.by_ref() {
        if closes(&command) {
            if depth == 0 {
                break;
            }
            depth = depth.saturating_sub(1);
        } else if opens(&command) {
            depth = depth.saturating_add(1);
        }
        region.push(command);
    }
    region
}

/// Whitespace-only content does not count as filling a slot.
fn non_blank(commands: Vec<Command>) -> Option<Vec<Command>> {
    let blank = commands.iter().all(|command| match command {
        Command::Text(text) => text.trim().is_empty(),
        Command::Noop => true,
        Command::SlotDeclare(_)
        | Command::SlotDeclareWithDefaultsStart(_)
        | Command::SlotDeclareWithDefaultsEnd(_)
        | Command::Include(_)
        | Command::IncludeWithDefaultsStart(_)
        | Command::IncludeWithDefaultsEnd
        | Command::SelectSlot { .. }
        | Command::Clear => false,
    });
    (!blank).then_some(commands)
}

/// Splits commands into main content and named slot content. Regions inside
/// include-with-defaults bodies belong to that include and pass through.
///
/// Content selected into the unnamed slot stays in place in main content.
/// Replacing the unnamed slot discards the main content captured before it.
fn capture(commands: Vec<Command>) -> (Vec<Command>, BTreeMap<&'static str, Vec<Command>>) {
    let mut main = Vec::new();
    let mut named: BTreeMap<&'static str, Vec<Command>> = BTreeMap::new();
    let mut target: SlotName = None;
    let mut nesting = 0_usize;

    for command in commands {
        if nesting == 0 {
            if let Command::SelectSlot { name, replace } = &command {
                match name {
                    Some(name) => {
                        let bucket = named.entry(*name).or_default();
                        if *replace {
                            bucket.clear();
                        }
                    }
                    None => {
                        if *replace {
                            main.clear();
                        }
                    }
                }
                target = *name;
                continue;
            }
            if matches!(command, Command::Clear) {
                target = None;
                continue;
            }
        }
        if is_include_start(&command) {
            nesting = nesting.saturating_add(1);
        } else if is_include_end(&command) {
            nesting = nesting.saturating_sub(1);
        }
        match target {
            Some(name) => named.entry(name).or_default().push(command),
            None => main.push(command),
        }
    }
    (main, named)
}

#[derive(Debug, Default)]
struct Scope {
    unnamed: Option<Vec<Command>>,
    named: BTreeMap<&'static str, Vec<Command>>,
    /// Names already satisfied, which outer content may not fill again.
    consumed: BTreeSet<&'static str>,
}

/// Slot content available during one render call.
#[derive(Debug)]
struct Registry {
    scopes: Vec<Scope>,
    /// `(scope, name)`: content of that scope or outer ones may not fill
    /// `name` while its own region renders.
    unavailable: Vec<(usize, SlotName)>,
}

impl Registry {
    fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
            unavailable: Vec::new(),
        }
    }

    fn innermost(&self) -> usize {
        self.scopes.len().saturating_sub(1)
    }

    fn is_blocked(&self, scope: usize, name: SlotName) -> bool {
        self.unavailable
            .iter()
            .any(|&(at, blocked)| blocked == name && scope <= at)
    }

    fn block(&mut self, name: SlotName) {
        self.unavailable.push((self.innermost(), name));
    }

    fn unblock(&mut self) {
        self.unavailable.pop();
    }

    /// Takes the content registered for a slot. Named content is searched
    /// from the innermost scope outward, unnamed content only innermost.
    fn take(&mut self, name: SlotName) -> Option<Vec<Command>> {
        let innermost = self.innermost();
        let Some(key) = name else {
            if self.is_blocked(innermost, None) {
                return None;
            }
            return self.scopes.get_mut(innermost)?.unnamed.take();
        };

        for index in (0..=innermost).rev() {
            if self.is_blocked(index, name) {
                continue;
            }
            let scope = self.scopes.get_mut(index)?;
            if scope.consumed.contains(key) {
                return None;
            }
            if let Some(content) = scope.named.remove(key) {
                scope.consumed.insert(key);
                tracing::trace!(slot = key, scope = index, "slot filled");
                return Some(content);
            }
        }
        None
    }

    /// Registers content in the innermost scope. Content already offered by a
    /// descendant wins over its ancestors'.
    fn offer(&mut self, main: Option<Vec<Command>>, captures: BTreeMap<&'static str, Vec<Command>>) {
        let innermost = self.innermost();
        let Some(scope) = self.scopes.get_mut(innermost) else {
            return;
        };
        if let Some(main) = main {
            scope.unnamed = Some(main);
        }
        for (name, content) in captures {
            if !scope.consumed.contains(name) {
                scope.named.entry(name).or_insert(content);
            }
        }
    }

    fn resolve_tree(&mut self, tree: Tree, out: &mut String) {
        let Tree { commands, parent } = tree;
        let (main, captures) = capture(commands);
        match parent {
            Some(parent) => {
                let main = self.substitute(main);
                self.offer(non_blank(main), captures);
                self.resolve_tree(*parent, out);
            }
            None => {
                self.offer(None, captures);
                self.flatten(main, out);
            }
        }
    }

    /// Fills the slot declarations that already have content, keeping the
    /// rest for an ancestor.
    fn substitute(&mut self, commands: Vec<Command>) -> Vec<Command> {
        let mut out = Vec::with_capacity(commands.len());
        let mut iter = commands.into_iter();
        while let Some(command) = iter.next() {
            match command {
                Command::SlotDeclare(name) => match self.take(name) {
                    Some(content) => out.extend(content),
                    None => out.push(Command::SlotDeclare(name)),
                },
                Command::SlotDeclareWithDefaultsStart(name) => {
                    let region = take_region(&mut iter, is_slot_start, is_slot_end);
                    if let Some(content) = self.take(name) {
                        out.extend(content);
                    } else {
                        self.block(name);
                        let region = self.substitute(region);
                        self.unblock();
                        out.push(Command::SlotDeclareWithDefaultsStart(name));
                        out.extend(region);
                        out.push(Command::SlotDeclareWithDefaultsEnd(name));
                    }
                }
                other @ (Command::Text(_)
                | Command::SlotDeclareWithDefaultsEnd(_)
                | Command::Include(_)
                | Command::IncludeWithDefaultsStart(_)
                | Command::IncludeWithDefaultsEnd
                | Command::SelectSlot { .. }
                | Command::Clear
                | Command::Noop) => out.push(other),
            }
        }
        out
    }

    fn flatten(&mut self, commands: Vec<Command>, out: &mut String) {
        let mut iter = commands.into_iter();
        while let Some(command) = iter.next() {
            match command {
                Command::Text(text) => out.push_str(&text),
                Command::SlotDeclare(name) => {
                    if let Some(content) = self.take(name) {
                        self.block(name);
                        self.flatten(content, out);
                        self.unblock();
                    }
                }
                Command::SlotDeclareWithDefaultsStart(name) => {
                    let region = take_region(&mut iter, is_slot_start, is_slot_end);
                    let content = self.take(name).unwrap_or(region);
                    self.block(name);
                    self.flatten(content, out);
                    self.unblock();
                }
                Command::Include(tree) => {
                    self.scopes.push(Scope::default());
                    self.resolve_tree(tree, out);
                    self.scopes.pop();
                }
                Command::IncludeWithDefaultsStart(tree) => {
                    let region = take_region(&mut iter, is_include_start, is_include_end);
                    let (main, captures) = capture(region);
                    let main = self.substitute(main);
                    let named = captures
                        .into_iter()
                        .map(|(name, content)| (name, self.substitute(content)))
                        .collect();
                    self.scopes.push(Scope {
                        unnamed: non_blank(main),
                        named,
                        consumed: BTreeSet::new(),
                    });
                    self.resolve_tree(tree, out);
                    self.scopes.pop();
                }
                Command::SlotDeclareWithDefaultsEnd(_)
                | Command::IncludeWithDefaultsEnd
                | Command::SelectSlot { .. }
                | Command::Clear
                | Command::Noop => {}
            }
        }
    }
}
