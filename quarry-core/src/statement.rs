use crate::{Placeholder, SqlBuf};
use std::fmt::{self, Write};

/// One piece of a compiled statement: static text or a deferred value slot.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlFragment {
    Text(String),
    /// Index into the statement's placeholder list.
    Placeholder(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

/// A compiled, reusable statement template: an ordered fragment list plus the
/// placeholder list the fragments refer into.
///
/// The builder appends text freely; fragments split at placeholders and at
/// clause seals. Merging adjacent text fragments is deferred to
/// [`Statement::compact`] so the write path never pays for it.
#[derive(Debug, Clone)]
pub struct Statement {
    kind: StatementKind,
    fragments: Vec<SqlFragment>,
    placeholders: Vec<Placeholder>,
    compacted: bool,
    sealed: bool,
}

impl Statement {
    pub fn new(kind: StatementKind) -> Self {
        Self {
            kind,
            fragments: Vec::new(),
            placeholders: Vec::new(),
            compacted: false,
            sealed: false,
        }
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }
    pub fn fragments(&self) -> &[SqlFragment] {
        &self.fragments
    }
    pub fn placeholders(&self) -> &[Placeholder] {
        &self.placeholders
    }
    pub fn is_compacted(&self) -> bool {
        self.compacted
    }

    /// Close the trailing text fragment so the next write starts a new one.
    /// Clause writers seal at boundaries, keeping fragments clause-grained.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Append a placeholder, returning its index within this statement.
    pub fn push_placeholder(&mut self, placeholder: Placeholder) -> usize {
        let index = self.placeholders.len();
        self.placeholders.push(placeholder);
        self.fragments.push(SqlFragment::Placeholder(index));
        self.sealed = false;
        self.compacted = false;
        index
    }

    /// Merge adjacent text fragments into one. Idempotent: compacting an
    /// already compacted statement leaves the fragment list unchanged.
    pub fn compact(&mut self) {
        if self.compacted {
            return;
        }
        let mut merged: Vec<SqlFragment> = Vec::with_capacity(self.fragments.len());
        for fragment in self.fragments.drain(..) {
            match (merged.last_mut(), fragment) {
                (Some(SqlFragment::Text(last)), SqlFragment::Text(text)) => last.push_str(&text),
                (_, fragment) => merged.push(fragment),
            }
        }
        self.fragments = merged;
        self.compacted = true;
        self.sealed = false;
    }

    /// Append another statement's fragments and placeholders; every appended
    /// placeholder is re-indexed sequentially after the existing ones.
    pub fn append(&mut self, other: &Statement) {
        let offset = self.placeholders.len();
        self.seal();
        for fragment in &other.fragments {
            match fragment {
                SqlFragment::Text(text) => self.fragments.push(SqlFragment::Text(text.clone())),
                SqlFragment::Placeholder(i) => {
                    self.fragments.push(SqlFragment::Placeholder(i + offset))
                }
            }
        }
        self.placeholders.extend(other.placeholders.iter().cloned());
        self.compacted = false;
        self.sealed = false;
    }

    /// Concatenated static text, placeholders skipped. Used for diagnostics
    /// and by scratch renderings that cannot contain placeholders.
    pub fn text(&self) -> String {
        let mut result = String::new();
        for fragment in &self.fragments {
            if let SqlFragment::Text(text) = fragment {
                result.push_str(text);
            }
        }
        result
    }
}

impl SqlBuf for Statement {
    fn push_str(&mut self, value: &str) {
        if value.is_empty() {
            return;
        }
        match self.fragments.last_mut() {
            Some(SqlFragment::Text(last)) if !self.sealed => last.push_str(value),
            _ => {
                self.fragments.push(SqlFragment::Text(value.to_owned()));
                self.sealed = false;
                self.compacted = false;
            }
        }
    }
    fn push(&mut self, value: char) {
        let mut buffer = [0u8; 4];
        self.push_str(value.encode_utf8(&mut buffer));
    }
    fn buf_len(&self) -> usize {
        self.fragments
            .iter()
            .map(|f| match f {
                SqlFragment::Text(text) => text.len(),
                SqlFragment::Placeholder(..) => 1,
            })
            .sum()
    }
}

impl Write for Statement {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        SqlBuf::push_str(self, s);
        Ok(())
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for fragment in &self.fragments {
            match fragment {
                SqlFragment::Text(text) => f.write_str(text)?,
                SqlFragment::Placeholder(i) => write!(f, "{{{}}}", i)?,
            }
        }
        Ok(())
    }
}
