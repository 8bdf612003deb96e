//! Per-file workspace metadata consumed by the cross-file checks.
//!
//! The index owns one [`FileIndexEntry`] per file path, replaced wholesale
//! whenever a file is opened or changed; there is no incremental patching.
//! Entries are independent, so replacement is last-write-wins with no
//! locking concern for callers that analyze documents one at a time. A
//! reverse map from extend target to extending files answers "who inherits
//! from this template" for change propagation.
//!
//! Walking and watching the workspace is the caller's job; [`index_file`] is
//! the one-call-per-file hook an external walker uses to populate the index.

use crate::resolve::resolve_template;
use crate::resolve::FileReader;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use templet_parser::templet::{parse, parse_directive, Range, SourceMap, TokenKind};

/// Everything the cross-file checks need to know about one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileIndexEntry {
    /// Block declarations, first occurrence per name.
    pub blocks: BTreeMap<String, Range>,
    /// Slot declarations, first occurrence per name.
    pub slots: BTreeMap<String, Range>,
    /// Aliases from `<#@ requireAs(path, alias) #>` directives.
    pub require_as: BTreeMap<String, String>,
    /// Resolved `extend` target, when the directive is present and the
    /// target exists.
    pub extends_path: Option<PathBuf>,
}

/// In-memory index keyed by file path.
#[derive(Debug, Default)]
pub struct WorkspaceIndex {
    entries: BTreeMap<PathBuf, FileIndexEntry>,
    extended_by: BTreeMap<PathBuf, BTreeSet<PathBuf>>,
}

impl WorkspaceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entry for a file, keeping the reverse extend map current.
    pub fn insert(&mut self, path: PathBuf, entry: FileIndexEntry) {
        self.remove(&path);
        if let Some(parent) = &entry.extends_path {
            self.extended_by
                .entry(parent.clone())
                .or_default()
                .insert(path.clone());
        }
        self.entries.insert(path, entry);
    }

    pub fn remove(&mut self, path: &Path) {
        if let Some(old) = self.entries.remove(path) {
            if let Some(parent) = old.extends_path {
                if let Some(children) = self.extended_by.get_mut(&parent) {
                    children.remove(path);
                    if children.is_empty() {
                        self.extended_by.remove(&parent);
                    }
                }
            }
        }
    }

    pub fn entry(&self, path: &Path) -> Option<&FileIndexEntry> {
        self.entries.get(path)
    }

    /// Files whose `extend` directive resolves to `path`.
    pub fn extended_by(&self, path: &Path) -> impl Iterator<Item = &PathBuf> {
        self.extended_by.get(path).into_iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build the index entry for one file from its source text.
pub fn index_file(
    path: &Path,
    text: &str,
    roots: &[PathBuf],
    reader: &dyn FileReader,
) -> FileIndexEntry {
    let parsed = parse(text);
    let map = SourceMap::new(text);
    let mut entry = FileIndexEntry::default();

    for token in &parsed.tokens {
        match token.kind {
            TokenKind::BlockStart | TokenKind::SlotStart => {
                let Some(name) = token.name.clone() else { continue };
                let range = map.range(token.span());
                let target = if token.kind == TokenKind::BlockStart {
                    &mut entry.blocks
                } else {
                    &mut entry.slots
                };
                target.entry(name).or_insert(range);
            }
            TokenKind::Directive => {
                let Some(call) = parse_directive(&token.content) else { continue };
                match call.name.as_str() {
                    "requireAs" if call.args.len() == 2 => {
                        entry
                            .require_as
                            .insert(call.args[1].clone(), call.args[0].clone());
                    }
                    "extend" if !call.args.is_empty() => {
                        entry.extends_path =
                            resolve_template(&call.args[0], Some(path), roots, reader);
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    entry
}
