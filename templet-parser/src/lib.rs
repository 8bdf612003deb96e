//! # templet-parser
//!
//! Parser library for the templet format: a templating dialect that mixes
//! host text (JS/TS/HTML/Markdown) with delimiter tags (`<# #>`, `#{ }`,
//! `!{ }`, `<#@ #>`, `<* *>`, and the legacy `<% %>` family) and a
//! block/slot inheritance structure.
//!
//! The crate is organized as a two-stage pipeline:
//!
//! 1. Scanning ([`templet::scanner`]) turns raw text into a flat,
//!    position-accurate token stream. The scanner is total: malformed input
//!    never fails, it only degrades (an unterminated tag becomes a token
//!    with an empty closing delimiter).
//! 2. Tree building ([`templet::parsing`]) pairs `block`/`slot` openers with
//!    their `end` tags into a nested [`templet::CodeBlock`] tree and records
//!    recoverable [`templet::ParseError`]s for unmatched or unclosed tags.
//!
//! Every token preserves the exact delimiter text it was matched with, so
//! concatenating `start + content + end` (plus a newline where `eol` is set)
//! over the whole stream reconstructs the input byte for byte. Tooling built
//! on top (formatting, diagnostics, highlighting) depends on this invariant.

pub mod templet;
