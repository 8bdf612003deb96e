//! The templet language: tokens, scanner, block tree, and AST queries.

pub mod ast;
pub mod directive;
pub mod parsing;
pub mod range;
pub mod scanner;
pub mod token;

pub use ast::{block_pairs, build_end_tag, open_blocks_at, BlockPair, OpenBlock};
pub use directive::{parse_directive, DirectiveCall};
pub use parsing::{parse, BlockKind, CodeBlock, Parsed};
pub use range::{Position, Range, SourceMap};
pub use token::{unquote, ParseError, Token, TokenKind};
