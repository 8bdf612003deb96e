//! Token types shared by the scanner, the tree builder, and all tooling.
//!
//! Source Delimiter Preservation
//!
//!     Every token stores the literal delimiter text it was matched with in
//!     `start` and `end`, never a normalized form. Trim markers (`<#-`,
//!     `-#>`) differ per occurrence and both formatting and block pairing
//!     decide behavior from the exact variant used at each site, so this
//!     information must survive the whole pipeline untouched. Concatenating
//!     `start + content + end` (plus `\n` where `eol` is set) across the
//!     stream reconstructs the input exactly.

use serde::Serialize;
use std::fmt;
use std::ops::Range as ByteRange;

/// Kind of a scanned token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenKind {
    /// Plain host text, one token per source line.
    Text,
    /// A `<# ... #>` code tag (or legacy `<% ... %>`).
    Code,
    /// A `#{ ... }` or `!{ ... }` expression (or legacy `<%= ... %>`).
    Expression,
    /// A `<#@ ... #>` template directive.
    Directive,
    /// A `<* ... *>` comment (or legacy `<%# ... %>`).
    Comment,
    /// A `<# block 'name' : #>` opener.
    BlockStart,
    /// A `<# slot 'name' : #>` opener.
    SlotStart,
    /// A `<# end #>` closer, in any trim-marker combination.
    BlockEnd,
}

impl TokenKind {
    /// Structural tokens open or close a block/slot scope.
    pub fn is_structural(self) -> bool {
        matches!(
            self,
            TokenKind::BlockStart | TokenKind::SlotStart | TokenKind::BlockEnd
        )
    }
}

/// One scanned token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub content: String,
    /// Absolute byte offset of the opening delimiter.
    pub pos: usize,
    /// 1-based line of `pos`.
    pub line: usize,
    /// 1-based column of `pos`, in characters.
    pub column: usize,
    /// Literal opening delimiter as matched (empty for text).
    pub start: String,
    /// Literal closing delimiter as matched (empty for text and for
    /// unterminated tags).
    pub end: String,
    /// True when the scan consumed the line terminator following this token.
    pub eol: bool,
    /// Unquoted block/slot label, present on `BlockStart`/`SlotStart` only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Token {
    /// Total source length covered by delimiters and content. The consumed
    /// line terminator, if any, is not included.
    pub fn source_len(&self) -> usize {
        self.start.len() + self.content.len() + self.end.len()
    }

    /// Byte span of the token in the original source.
    pub fn span(&self) -> ByteRange<usize> {
        self.pos..self.pos + self.source_len()
    }

    /// Reconstruct the literal source text of this token.
    pub fn to_source(&self) -> String {
        let mut out =
            String::with_capacity(self.source_len() + usize::from(self.eol));
        out.push_str(&self.start);
        out.push_str(&self.content);
        out.push_str(&self.end);
        if self.eol {
            out.push('\n');
        }
        out
    }

    /// True when the opening delimiter carries the left trim marker.
    pub fn trimmed_open(&self) -> bool {
        self.start.starts_with("<#-")
    }

    /// True when the closing delimiter carries the right trim marker.
    pub fn trimmed_close(&self) -> bool {
        self.end.ends_with("-#>")
    }
}

/// A recoverable parse problem: unmatched `end` or unclosed block/slot.
///
/// Parse errors are data, not failures. The parser always returns its
/// best-effort result alongside these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseError {
    pub message: String,
    pub pos: usize,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}:{}", self.message, self.line, self.column)
    }
}

/// Strip one matching pair of `'`, `"` or backtick quotes.
pub fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        if first == bytes[bytes.len() - 1]
            && matches!(first, b'\'' | b'"' | b'`')
        {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(kind: TokenKind, start: &str, content: &str, end: &str, eol: bool) -> Token {
        Token {
            kind,
            content: content.to_string(),
            pos: 0,
            line: 1,
            column: 1,
            start: start.to_string(),
            end: end.to_string(),
            eol,
            name: None,
        }
    }

    #[test]
    fn source_reconstruction_includes_eol() {
        let code = token(TokenKind::Code, "<#", " x ", "#>", true);
        assert_eq!(code.to_source(), "<# x #>\n");
        assert_eq!(code.span(), 0..7);
    }

    #[test]
    fn unterminated_token_has_empty_end() {
        let code = token(TokenKind::Code, "<#", " x", "", false);
        assert_eq!(code.to_source(), "<# x");
    }

    #[test]
    fn trim_marker_queries_use_literal_delimiters() {
        let trimmed = token(TokenKind::Code, "<#-", " x ", "-#>", false);
        assert!(trimmed.trimmed_open());
        assert!(trimmed.trimmed_close());
        let plain = token(TokenKind::Code, "<#", " x ", "#>", false);
        assert!(!plain.trimmed_open());
        assert!(!plain.trimmed_close());
    }

    #[test]
    fn unquote_strips_one_matching_pair() {
        assert_eq!(unquote("'name'"), "name");
        assert_eq!(unquote("\"name\""), "name");
        assert_eq!(unquote("`name`"), "name");
        assert_eq!(unquote("''"), "");
        assert_eq!(unquote("'mixed\""), "'mixed\"");
        assert_eq!(unquote("plain"), "plain");
        assert_eq!(unquote("'"), "'");
    }
}
