const INDENT: &str = "    ";

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct FlagId(usize);

/// A condition flag and whether any later branch reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ConditionTag {
    variable: String,
    read: bool,
}

/// Condition flags of one page. Every page gets a fresh table.
#[derive(Debug, Default)]
pub(crate) struct FlagTable {
    tags: Vec<ConditionTag>,
}

impl FlagTable {
    pub(crate) fn declare(&mut self) -> FlagId {
        let id = FlagId(self.tags.len());
        self.tags.push(ConditionTag {
            variable: format!("__taken_{}", self.tags.len()),
            read: false,
        });
        id
    }

    pub(crate) fn mark_read(&mut self, id: FlagId) {
        if let Some(tag) = self.tags.get_mut(id.0) {
            tag.read = true;
        }
    }

    pub(crate) fn is_read(&self, id: FlagId) -> bool {
        self.tags.get(id.0).is_some_and(|tag| tag.read)
    }

    pub(crate) fn variable(&self, id: FlagId) -> &str {
        self.tags.get(id.0).map_or("__taken", |tag| tag.variable.as_str())
    }
}

/// A line whose text depends on whether its flag ends up being read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Deferred {
    Declare(FlagId),
    Set(FlagId),
    /// Keeps a flag's meaning when the branch that would set it was empty.
    GuardedSet { flag: FlagId, check: String },
}

impl Deferred {
    const fn flag(&self) -> FlagId {
        match self {
            Self::Declare(flag) | Self::Set(flag) | Self::GuardedSet { flag, .. } => *flag,
        }
    }

    fn resolve(&self, flags: &FlagTable) -> Option<String> {
        if !flags.is_read(self.flag()) {
            return None;
        }
        let variable = flags.variable(self.flag());
        Some(match self {
            Self::Declare(_) => format!("let mut {variable} = false;"),
            Self::Set(_) => format!("{variable} = true;"),
            Self::GuardedSet { check, .. } => format!("if {check} {{ {variable} = true; }}"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Code { indent: usize, text: String },
    Deferred { indent: usize, line: Deferred },
}

/// Generated statements of one branch, written out in a second pass once
/// every flag read is known.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    lines: Vec<Line>,
}

impl LineBuffer {
    pub(crate) fn push<T: Into<String>>(&mut self, text: T) {
        self.push_at(0, text);
    }

    pub(crate) fn push_at<T: Into<String>>(&mut self, indent: usize, text: T) {
        self.lines.push(Line::Code {
            indent,
            text: text.into(),
        });
    }

    pub(crate) fn defer(&mut self, line: Deferred) {
        self.defer_at(0, line);
    }

    pub(crate) fn defer_at(&mut self, indent: usize, line: Deferred) {
        self.lines.push(Line::Deferred { indent, line });
    }

    /// Appends a nested buffer one or more levels deeper.
    pub(crate) fn append(&mut self, nested: Self, extra: usize) {
        self.lines
            .extend(nested.lines.into_iter().map(|line| match line {
                Line::Code { indent, text } => Line::Code {
                    indent: indent.saturating_add(extra),
                    text,
                },
                Line::Deferred { indent, line } => Line::Deferred {
                    indent: indent.saturating_add(extra),
                    line,
                },
            }));
    }

    /// True when writing the buffer now would produce no lines.
    pub(crate) fn is_empty(&self, flags: &FlagTable) -> bool {
        self.lines.iter().all(|line| match line {
            Line::Code { .. } => false,
            Line::Deferred { line, .. } => !flags.is_read(line.flag()),
        })
    }

    pub(crate) fn clear(&mut self) {
        self.lines.clear();
    }

    /// Writes every line at `base` plus its own indentation, dropping
    /// deferred lines whose flag nobody reads.
    pub(crate) fn write(&self, flags: &FlagTable, base: usize, out: &mut String) {
        for line in &self.lines {
            let (indent, text) = match line {
                Line::Code { indent, text } => (*indent, text.clone()),
                Line::Deferred { indent, line } => match line.resolve(flags) {
                    Some(text) => (*indent, text),
                    None => continue,
                },
            };
            if text.is_empty() {
                out.push('\n');
                continue;
            }
            for _ in 0..base.saturating_add(indent) {
                out.push_str(INDENT);
            }
            out.push_str(&text);
            out.push('\n');
        }
    }
}
