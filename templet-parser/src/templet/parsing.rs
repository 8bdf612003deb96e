//! Parse entry point and block/slot tree construction.
//!
//! Parsing is two passes over bounded input: the scanner produces the flat
//! token stream, then [`process`] replays it with an explicit stack to pair
//! `block`/`slot` openers with `end` closers into a nested [`CodeBlock`]
//! tree. The pass never fails; a `blockEnd` with no open scope and scopes
//! still open at end of input are recorded as [`ParseError`]s while the tree
//! keeps every block that was opened, closed or not.

use crate::templet::scanner;
use crate::templet::token::{ParseError, Token, TokenKind};
use serde::Serialize;

/// Whether a named region was declared with `block` or `slot`. The two parse
/// identically; rendering semantics differ downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockKind {
    Block,
    Slot,
}

impl BlockKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BlockKind::Block => "block",
            BlockKind::Slot => "slot",
        }
    }
}

/// A named, possibly-nested template region.
///
/// Children are kept in declaration order, duplicates included; duplicate
/// detection is a diagnostics concern and must stay observable here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeBlock {
    pub name: String,
    pub kind: BlockKind,
    /// The opener token that created this block.
    pub decl: Token,
    /// The `end` token that closed it, absent for unclosed blocks.
    pub closing: Option<Token>,
    /// Tokens directly inside this block, excluding nested block bodies.
    pub main: Vec<Token>,
    pub blocks: Vec<CodeBlock>,
    pub slots: Vec<CodeBlock>,
}

impl CodeBlock {
    fn open(kind: BlockKind, decl: Token) -> Self {
        Self {
            name: decl.name.clone().unwrap_or_default(),
            kind,
            decl,
            closing: None,
            main: Vec::new(),
            blocks: Vec::new(),
            slots: Vec::new(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closing.is_some()
    }

    /// First nested block with the given name.
    pub fn block(&self, name: &str) -> Option<&CodeBlock> {
        self.blocks.iter().find(|b| b.name == name)
    }

    /// First nested slot with the given name.
    pub fn slot(&self, name: &str) -> Option<&CodeBlock> {
        self.slots.iter().find(|s| s.name == name)
    }
}

/// Result of parsing one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parsed {
    /// Top-level tokens, excluding nested block bodies.
    pub main: Vec<Token>,
    pub blocks: Vec<CodeBlock>,
    pub slots: Vec<CodeBlock>,
    /// Every token in document order, including inside nested blocks.
    pub tokens: Vec<Token>,
    pub errors: Vec<ParseError>,
}

impl Parsed {
    /// First top-level block with the given name.
    pub fn block(&self, name: &str) -> Option<&CodeBlock> {
        self.blocks.iter().find(|b| b.name == name)
    }

    /// First top-level slot with the given name.
    pub fn slot(&self, name: &str) -> Option<&CodeBlock> {
        self.slots.iter().find(|s| s.name == name)
    }

    /// Names of every block declaration anywhere in the file, flat, in
    /// document order, duplicates included.
    pub fn block_names(&self) -> Vec<&str> {
        self.declaration_names(TokenKind::BlockStart)
    }

    /// Names of every slot declaration anywhere in the file, flat.
    pub fn slot_names(&self) -> Vec<&str> {
        self.declaration_names(TokenKind::SlotStart)
    }

    fn declaration_names(&self, kind: TokenKind) -> Vec<&str> {
        self.tokens
            .iter()
            .filter(|t| t.kind == kind)
            .filter_map(|t| t.name.as_deref())
            .collect()
    }
}

/// Parse template text. Total: malformed input degrades to `errors` entries
/// alongside the best-effort result.
pub fn parse(text: &str) -> Parsed {
    process(scanner::scan(text))
}

/// Build the block/slot tree from a flat token stream.
pub fn process(tokens: Vec<Token>) -> Parsed {
    let mut main = Vec::new();
    let mut blocks = Vec::new();
    let mut slots = Vec::new();
    let mut errors = Vec::new();
    let mut stack: Vec<CodeBlock> = Vec::new();

    for token in &tokens {
        match token.kind {
            TokenKind::BlockStart => {
                stack.push(CodeBlock::open(BlockKind::Block, token.clone()));
            }
            TokenKind::SlotStart => {
                stack.push(CodeBlock::open(BlockKind::Slot, token.clone()));
            }
            TokenKind::BlockEnd => match stack.pop() {
                Some(mut frame) => {
                    frame.closing = Some(token.clone());
                    attach(frame, &mut stack, &mut blocks, &mut slots);
                }
                None => errors.push(ParseError {
                    message: "Unmatched end tag".to_string(),
                    pos: token.pos,
                    line: token.line,
                    column: token.column,
                }),
            },
            _ => match stack.last_mut() {
                Some(frame) => frame.main.push(token.clone()),
                None => main.push(token.clone()),
            },
        }
    }

    // Unclosed scopes: report innermost first (stack pop order) and keep
    // each block in the tree anyway.
    while let Some(frame) = stack.pop() {
        errors.push(ParseError {
            message: format!("Unclosed {}: '{}'", frame.kind.as_str(), frame.name),
            pos: frame.decl.pos,
            line: frame.decl.line,
            column: frame.decl.column,
        });
        attach(frame, &mut stack, &mut blocks, &mut slots);
    }

    Parsed {
        main,
        blocks,
        slots,
        tokens,
        errors,
    }
}

fn attach(
    frame: CodeBlock,
    stack: &mut Vec<CodeBlock>,
    root_blocks: &mut Vec<CodeBlock>,
    root_slots: &mut Vec<CodeBlock>,
) {
    let (blocks, slots) = match stack.last_mut() {
        Some(parent) => (&mut parent.blocks, &mut parent.slots),
        None => (root_blocks, root_slots),
    };
    match frame.kind {
        BlockKind::Block => blocks.push(frame),
        BlockKind::Slot => slots.push(frame),
    }
}
