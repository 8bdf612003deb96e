//! Structural and cross-file validation.
//!
//! [`diagnostics`] runs every check over one parsed document and accumulates
//! the results additively. Checks are independent and order-insensitive, and
//! each one runs isolated: a panic inside a single check is caught and that
//! check's output dropped, never the whole pass. Cross-file lookups go
//! through the injected [`DiagnosticsContext`]; a failed filesystem read
//! degrades to "diagnostic not emitted".
//!
//! All reference extraction works on parsed token content, never on raw
//! document text.

use crate::resolve::{resolve_template, FileReader};
use crate::workspace::WorkspaceIndex;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use templet_parser::templet::{
    parse, parse_directive, DirectiveCall, Parsed, Range, SourceMap, Token, TokenKind,
};

static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][\w.-]*$").expect("name pattern compiles"));

static CONTENT_CALL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bcontent\s*\(\s*(['"`])([^'"`]*)['"`]"#).expect("content pattern compiles")
});

static PARTIAL_CALL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bpartial\s*\(\s*[^,()'"`]*,\s*(['"`])([^'"`]*)['"`]"#)
        .expect("partial pattern compiles")
});

/// Diagnostic severity, ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Information => write!(f, "info"),
            Severity::Hint => write!(f, "hint"),
        }
    }
}

/// One finding. Never persisted; recomputed per analysis pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub range: Range,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, range: Range, message: impl Into<String>) -> Self {
        Self {
            severity,
            range,
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.range.start, self.severity, self.message)
    }
}

/// Cross-file collaborators for one diagnostics pass.
pub struct DiagnosticsContext<'a> {
    /// Path of the document under analysis, when it has one.
    pub file: Option<&'a Path>,
    /// Workspace roots used for partial/extend resolution.
    pub roots: &'a [PathBuf],
    /// Per-file metadata maintained by an external indexer.
    pub index: Option<&'a WorkspaceIndex>,
    pub reader: &'a dyn FileReader,
}

impl<'a> DiagnosticsContext<'a> {
    /// Context with no cross-file knowledge; local checks still run.
    pub fn detached(reader: &'a dyn FileReader) -> Self {
        Self {
            file: None,
            roots: &[],
            index: None,
            reader,
        }
    }
}

/// Run every check over one document.
pub fn diagnostics(text: &str, ctx: &DiagnosticsContext) -> Vec<Diagnostic> {
    let parsed = parse(text);
    let pass = Pass {
        text,
        parsed: &parsed,
        map: SourceMap::new(text),
        ctx,
    };

    let checks: &[fn(&Pass) -> Vec<Diagnostic>] = &[
        check_names,
        check_structure,
        check_duplicates,
        check_content_refs,
        check_partials,
        check_directives,
        check_trim_hints,
        check_extend_target,
        check_parent_consistency,
    ];

    let mut out = Vec::new();
    for check in checks {
        // One failing check must not suppress the others.
        if let Ok(found) = catch_unwind(AssertUnwindSafe(|| check(&pass))) {
            out.extend(found);
        }
    }
    out
}

/// Shared state for one pass: parse result, position mapping, collaborators.
struct Pass<'a> {
    text: &'a str,
    parsed: &'a Parsed,
    map: SourceMap<'a>,
    ctx: &'a DiagnosticsContext<'a>,
}

impl Pass<'_> {
    fn token_range(&self, token: &Token) -> Range {
        self.map.range(token.span())
    }

    /// Range of a sub-span inside a token's content.
    fn content_range(&self, token: &Token, start: usize, end: usize) -> Range {
        let base = token.pos + token.start.len();
        self.map.range(base + start..base + end)
    }

    fn directive_calls(&self) -> impl Iterator<Item = (&Token, DirectiveCall)> + '_ {
        self.parsed
            .tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Directive)
            .filter_map(|t| parse_directive(&t.content).map(|call| (t, call)))
    }

    fn extend_directive(&self) -> Option<(&Token, String)> {
        self.directive_calls()
            .find(|(_, call)| call.name == "extend" && !call.args.is_empty())
            .map(|(token, call)| (token, call.args[0].clone()))
    }

    fn resolve(&self, key: &str) -> Option<PathBuf> {
        resolve_template(key, self.ctx.file, self.ctx.roots, self.ctx.reader)
    }

    /// Block names of the resolved extend parent, one level deep. `None`
    /// when there is no extend directive or the target cannot be resolved.
    fn parent_blocks(&self) -> Option<BTreeSet<String>> {
        let (_, target) = self.extend_directive()?;
        let parent = self.resolve(&target)?;
        if let Some(entry) = self.ctx.index.and_then(|index| index.entry(&parent)) {
            return Some(entry.blocks.keys().cloned().collect());
        }
        let source = self.ctx.reader.read(&parent).ok()?;
        let parent_parsed = parse(&source);
        Some(
            parent_parsed
                .block_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
        )
    }

    fn local_blocks(&self) -> BTreeSet<String> {
        self.parsed
            .block_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// `content('name')` references in code/expression tokens, with the
    /// range of the quoted name.
    fn content_refs(&self) -> Vec<(String, Range)> {
        let mut refs = Vec::new();
        for token in &self.parsed.tokens {
            if !matches!(token.kind, TokenKind::Code | TokenKind::Expression) {
                continue;
            }
            for caps in CONTENT_CALL_RE.captures_iter(&token.content) {
                let name = caps.get(2).expect("name group");
                refs.push((
                    name.as_str().to_string(),
                    self.content_range(token, name.start(), name.end()),
                ));
            }
        }
        refs
    }
}

/// Block/slot names must be identifier-like.
fn check_names(pass: &Pass) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for token in &pass.parsed.tokens {
        let kind = match token.kind {
            TokenKind::BlockStart => "block",
            TokenKind::SlotStart => "slot",
            _ => continue,
        };
        let name = token.name.as_deref().unwrap_or_default();
        if !NAME_RE.is_match(name) {
            out.push(
                Diagnostic::new(
                    Severity::Error,
                    pass.token_range(token),
                    format!("Invalid {kind} name: {name}"),
                )
                .with_code("invalid-name"),
            );
        }
    }
    out
}

/// Unmatched `end` tags and unclosed blocks/slots, with full tag ranges.
/// Same stack discipline as the parser's tree pass.
fn check_structure(pass: &Pass) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    let mut stack: Vec<&Token> = Vec::new();
    for token in &pass.parsed.tokens {
        match token.kind {
            TokenKind::BlockStart | TokenKind::SlotStart => stack.push(token),
            TokenKind::BlockEnd => {
                if stack.pop().is_none() {
                    out.push(
                        Diagnostic::new(
                            Severity::Error,
                            pass.token_range(token),
                            "Unmatched end tag",
                        )
                        .with_code("unmatched-end"),
                    );
                }
            }
            _ => {}
        }
    }
    while let Some(opener) = stack.pop() {
        let kind = if opener.kind == TokenKind::BlockStart {
            "block"
        } else {
            "slot"
        };
        out.push(
            Diagnostic::new(
                Severity::Error,
                pass.token_range(opener),
                format!(
                    "Unclosed {kind}: '{}'",
                    opener.name.as_deref().unwrap_or_default()
                ),
            )
            .with_code("unclosed"),
        );
    }
    out
}

/// Repeated declarations of one name, flat per file: nesting scope is
/// intentionally ignored, so the same sub-block name under two different
/// parents still counts as a duplicate.
fn check_duplicates(pass: &Pass) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    let mut seen: HashMap<(TokenKind, &str), usize> = HashMap::new();
    for token in &pass.parsed.tokens {
        let kind = match token.kind {
            TokenKind::BlockStart => "block",
            TokenKind::SlotStart => "slot",
            _ => continue,
        };
        let Some(name) = token.name.as_deref() else { continue };
        let count = seen.entry((token.kind, name)).or_insert(0);
        *count += 1;
        if *count > 1 {
            out.push(
                Diagnostic::new(
                    Severity::Warning,
                    pass.token_range(token),
                    format!("Duplicate {kind} declaration: {name}"),
                )
                .with_code("duplicate-declaration"),
            );
        }
    }
    out
}

/// `content('name')` must reference a declared block, locally or in the
/// extend parent's block set.
fn check_content_refs(pass: &Pass) -> Vec<Diagnostic> {
    let mut known = pass.local_blocks();
    if let Some(parent) = pass.parent_blocks() {
        known.extend(parent);
    }
    pass.content_refs()
        .into_iter()
        .filter(|(name, _)| !known.contains(name))
        .map(|(name, range)| {
            Diagnostic::new(
                Severity::Warning,
                range,
                format!("Unknown block name: {name}"),
            )
            .with_code("unknown-block")
        })
        .collect()
}

/// `partial(ctx, 'key')` must resolve through local aliases, the workspace
/// index, or as a literal path.
fn check_partials(pass: &Pass) -> Vec<Diagnostic> {
    let mut aliases: BTreeMap<String, String> = BTreeMap::new();
    if let Some(entry) = pass
        .ctx
        .file
        .and_then(|file| pass.ctx.index.and_then(|index| index.entry(file)))
    {
        aliases.extend(entry.require_as.clone());
    }
    // Local directives win over indexed metadata.
    for (_, call) in pass.directive_calls() {
        if call.name == "requireAs" && call.args.len() == 2 {
            aliases.insert(call.args[1].clone(), call.args[0].clone());
        }
    }

    let mut out = Vec::new();
    for token in &pass.parsed.tokens {
        if !matches!(token.kind, TokenKind::Code | TokenKind::Expression) {
            continue;
        }
        for caps in PARTIAL_CALL_RE.captures_iter(&token.content) {
            let key = caps.get(2).expect("key group");
            let target = aliases
                .get(key.as_str())
                .cloned()
                .unwrap_or_else(|| key.as_str().to_string());
            if pass.resolve(&target).is_none() {
                out.push(
                    Diagnostic::new(
                        Severity::Warning,
                        pass.content_range(token, key.start(), key.end()),
                        format!("Unresolved partial: {}", key.as_str()),
                    )
                    .with_code("unresolved-partial"),
                );
            }
        }
    }
    out
}

/// Known directive names with their argument arity rules.
fn check_directives(pass: &Pass) -> Vec<Diagnostic> {
    const ZERO_ARG: &[&str] = &[
        "includeMainChunk",
        "useHash",
        "noContent",
        "noSlots",
        "noBlocks",
        "noPartial",
        "noOptions",
        "promise",
        "callback",
    ];

    let mut out = Vec::new();
    for (token, call) in pass.directive_calls() {
        let range = pass.token_range(token);
        let arity_problem = match call.name.as_str() {
            "extend" | "context" | "alias" | "lang" => {
                (call.args.is_empty()).then(|| "expects at least 1 argument")
            }
            "requireAs" => (call.args.len() != 2).then(|| "expects exactly 2 arguments"),
            "deindent" => {
                if call.args.len() > 1 {
                    Some("expects at most 1 argument")
                } else if call.args.first().is_some_and(|a| a.parse::<u32>().is_err()) {
                    Some("expects a numeric argument")
                } else {
                    None
                }
            }
            name if ZERO_ARG.contains(&name) => {
                (!call.args.is_empty()).then(|| "expects no arguments")
            }
            name => {
                out.push(
                    Diagnostic::new(
                        Severity::Warning,
                        range.clone(),
                        format!("Unknown directive: {name}"),
                    )
                    .with_code("unknown-directive"),
                );
                None
            }
        };
        if let Some(problem) = arity_problem {
            out.push(
                Diagnostic::new(
                    Severity::Warning,
                    range,
                    format!("Directive '{}' {problem}", call.name),
                )
                .with_code("directive-arity"),
            );
        }
    }
    out
}

/// Suggest trim-marker variants where surrounding whitespace will leak into
/// the render. Directive and structural tags are intentionally excluded.
fn check_trim_hints(pass: &Pass) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for token in &pass.parsed.tokens {
        if token.kind != TokenKind::Code || !token.start.starts_with("<#") {
            continue;
        }
        if token.column == 1 && !token.trimmed_open() {
            out.push(
                Diagnostic::new(
                    Severity::Hint,
                    pass.token_range(token),
                    "Tag at line start: consider the trimmed opener '<#-'",
                )
                .with_code("trim-left"),
            );
        }
        // The scanner only folds a bare '\n' into `eol`, so look at the
        // source directly to also catch closers followed by "\r\n".
        let tail = &pass.text[token.span().end..];
        let before_break = tail.starts_with('\n') || tail.starts_with("\r\n");
        if before_break && !token.end.is_empty() && !token.trimmed_close() {
            out.push(
                Diagnostic::new(
                    Severity::Hint,
                    pass.token_range(token),
                    "Tag before line break: consider the trimmed closer '-#>'",
                )
                .with_code("trim-right"),
            );
        }
    }
    out
}

/// The `extend` directive's target must exist.
fn check_extend_target(pass: &Pass) -> Vec<Diagnostic> {
    let Some((token, target)) = pass.extend_directive() else {
        return Vec::new();
    };
    if pass.resolve(&target).is_some() {
        return Vec::new();
    }
    vec![Diagnostic::new(
        Severity::Error,
        pass.token_range(token),
        format!("Unresolved extend target: {target}"),
    )
    .with_code("unresolved-extend")]
}

/// For files with a resolved extend parent: content refs must exist in the
/// local-or-parent block set, and local blocks absent from the parent are
/// flagged as introducing a new block rather than overriding one.
fn check_parent_consistency(pass: &Pass) -> Vec<Diagnostic> {
    let Some(parent_blocks) = pass.parent_blocks() else {
        return Vec::new();
    };
    let local = pass.local_blocks();
    let mut out = Vec::new();

    for (name, range) in pass.content_refs() {
        if !local.contains(&name) && !parent_blocks.contains(&name) {
            out.push(
                Diagnostic::new(
                    Severity::Error,
                    range,
                    format!("Block '{name}' not found in this template or its parent"),
                )
                .with_code("parent-block"),
            );
        }
    }

    let mut flagged: BTreeSet<&str> = BTreeSet::new();
    for token in &pass.parsed.tokens {
        if token.kind != TokenKind::BlockStart {
            continue;
        }
        let Some(name) = token.name.as_deref() else { continue };
        if !parent_blocks.contains(name) && flagged.insert(name) {
            out.push(
                Diagnostic::new(
                    Severity::Information,
                    pass.token_range(token),
                    format!("Block '{name}' introduces a new block, it does not override the parent"),
                )
                .with_code("new-block"),
            );
        }
    }
    out
}
