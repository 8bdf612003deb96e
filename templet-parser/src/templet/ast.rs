//! Pure queries over the flat token stream.
//!
//! These drive editor features that must not re-parse: "which scopes are
//! open at the cursor", end-tag synthesis matching the opener's trim style,
//! and opener/closer pairing. Everything here is driven by token order and
//! position only, never by substring scanning of raw text, so adjacent
//! delimiter sequences with no separating text pair correctly.

use crate::templet::token::{Token, TokenKind};

/// A live view of one open block/slot scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenBlock {
    pub name: String,
    /// Index of the opener in the token stream.
    pub index: usize,
    /// Opener used the `<#-` variant.
    pub trimmed_open: bool,
    /// Opener used the `-#>` variant.
    pub trimmed_close: bool,
}

impl OpenBlock {
    fn from_opener(index: usize, token: &Token) -> Self {
        Self {
            name: token.name.clone().unwrap_or_default(),
            index,
            trimmed_open: token.trimmed_open(),
            trimmed_close: token.trimmed_close(),
        }
    }
}

/// Scopes still open just before byte offset `up_to`, outermost first.
pub fn open_blocks_at(tokens: &[Token], up_to: usize) -> Vec<OpenBlock> {
    let mut stack = Vec::new();
    for (index, token) in tokens.iter().enumerate() {
        if token.pos >= up_to {
            break;
        }
        match token.kind {
            TokenKind::BlockStart | TokenKind::SlotStart => {
                stack.push(OpenBlock::from_opener(index, token));
            }
            TokenKind::BlockEnd => {
                stack.pop();
            }
            _ => {}
        }
    }
    stack
}

/// Synthesize the end tag matching an opener's trim markers, so auto-closed
/// scopes keep the author's style.
pub fn build_end_tag(open: &OpenBlock) -> String {
    format!(
        "<#{} end {}#>",
        if open.trimmed_open { "-" } else { "" },
        if open.trimmed_close { "-" } else { "" }
    )
}

/// An opener paired with its closer, both as token indices. `close` is
/// absent for unclosed openers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockPair {
    pub open: usize,
    pub close: Option<usize>,
}

/// Pair every block/slot opener with its `end`, in opener order.
pub fn block_pairs(tokens: &[Token]) -> Vec<BlockPair> {
    let mut pairs = Vec::new();
    let mut stack = Vec::new();
    for (index, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::BlockStart | TokenKind::SlotStart => {
                stack.push(pairs.len());
                pairs.push(BlockPair {
                    open: index,
                    close: None,
                });
            }
            TokenKind::BlockEnd => {
                if let Some(slot) = stack.pop() {
                    pairs[slot].close = Some(index);
                }
            }
            _ => {}
        }
    }
    pairs
}
