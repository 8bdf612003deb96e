//! Semantic token classification.
//!
//! Pure span mapping from the parsed token stream to a closed highlighting
//! vocabulary: delimiters, structural keywords, quoted block names, comments,
//! and the well-known template helper functions. Arbitrary host-language code
//! is never classified; that belongs to the host language's own grammar.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use templet_parser::templet::{Parsed, SourceMap, Token, TokenKind};

static HELPER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(partial|content|slot|chunkStart|chunkEnd)\b").expect("helper pattern compiles")
});

static QUOTE_CHARS: &[char] = &['\'', '"', '`'];

/// Closed vocabulary of semantic token types, aligned with the standard
/// LSP/TextMate names so editor themes pick them up unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SemanticKind {
    Operator,
    Keyword,
    Macro,
    String,
    Comment,
    Function,
}

impl SemanticKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SemanticKind::Operator => "operator",
            SemanticKind::Keyword => "keyword",
            SemanticKind::Macro => "macro",
            SemanticKind::String => "string",
            SemanticKind::Comment => "comment",
            SemanticKind::Function => "function",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SemanticModifier {
    Declaration,
}

impl SemanticModifier {
    pub fn as_str(self) -> &'static str {
        match self {
            SemanticModifier::Declaration => "declaration",
        }
    }
}

/// One classified span, LSP-style: zero-based line and character, length in
/// characters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuiltToken {
    pub line: u32,
    pub character: u32,
    pub length: u32,
    #[serde(rename = "type")]
    pub kind: SemanticKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub modifiers: Vec<SemanticModifier>,
}

/// Classify one document. Output is sorted by position.
pub fn semantic_tokens(text: &str, parsed: &Parsed) -> Vec<BuiltToken> {
    let mut collector = TokenCollector::new(text);
    for token in &parsed.tokens {
        collector.process(token);
    }
    collector.finish()
}

struct TokenCollector<'a> {
    map: SourceMap<'a>,
    source: &'a str,
    tokens: Vec<BuiltToken>,
}

impl<'a> TokenCollector<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            map: SourceMap::new(source),
            source,
            tokens: Vec::new(),
        }
    }

    fn finish(mut self) -> Vec<BuiltToken> {
        self.tokens
            .sort_by_key(|token| (token.line, token.character));
        self.tokens
    }

    fn process(&mut self, token: &Token) {
        match token.kind {
            TokenKind::Text => {}
            TokenKind::Comment => self.push(
                token.pos,
                token.source_len(),
                SemanticKind::Comment,
                Vec::new(),
            ),
            TokenKind::Directive => self.directive(token),
            TokenKind::Expression => self.expression(token),
            TokenKind::Code => self.helpers(token),
            TokenKind::BlockStart | TokenKind::SlotStart => self.structural_open(token),
            TokenKind::BlockEnd => self.structural_close(token),
        }
    }

    /// `<#@` delimiters as operators, the directive name as a macro.
    fn directive(&mut self, token: &Token) {
        self.delimiters(token);
        let leading = token.content.len() - token.content.trim_start().len();
        let name_len = token.content[leading..]
            .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
            .unwrap_or(token.content.len() - leading);
        if name_len > 0 {
            self.push(
                token.pos + token.start.len() + leading,
                name_len,
                SemanticKind::Macro,
                Vec::new(),
            );
        }
    }

    /// Only the `#{`/`!{`/`}` delimiters; the inner expression stays host
    /// code, apart from helper calls.
    fn expression(&mut self, token: &Token) {
        self.delimiters(token);
        self.helpers(token);
    }

    /// Opening delimiter plus `block`/`slot` keyword, then the quoted name
    /// as a string declaration.
    fn structural_open(&mut self, token: &Token) {
        let keyword = if token.kind == TokenKind::BlockStart {
            "block"
        } else {
            "slot"
        };
        let open_len = token
            .start
            .len()
            .saturating_sub(keyword.len() + 1);
        self.push(token.pos, open_len, SemanticKind::Operator, Vec::new());
        self.push(
            token.pos + token.start.len() - keyword.len(),
            keyword.len(),
            SemanticKind::Keyword,
            Vec::new(),
        );
        if let Some(span) = quoted_span(&token.content) {
            let base = token.pos + token.start.len();
            self.push(
                base + span.start,
                span.len(),
                SemanticKind::String,
                vec![SemanticModifier::Declaration],
            );
        }
        self.close_delimiter(token);
    }

    /// `<# end #>` family: delimiter, `end` keyword, delimiter.
    fn structural_close(&mut self, token: &Token) {
        let open_len = token.start.len().saturating_sub("end".len() + 1);
        self.push(token.pos, open_len, SemanticKind::Operator, Vec::new());
        self.push(
            token.pos + token.start.len() - "end".len(),
            "end".len(),
            SemanticKind::Keyword,
            Vec::new(),
        );
        self.close_delimiter(token);
    }

    /// Well-known helper identifiers inside code content.
    fn helpers(&mut self, token: &Token) {
        let base = token.pos + token.start.len();
        for found in HELPER_RE.find_iter(&token.content) {
            self.push(
                base + found.start(),
                found.len(),
                SemanticKind::Function,
                Vec::new(),
            );
        }
    }

    fn delimiters(&mut self, token: &Token) {
        self.push(token.pos, token.start.len(), SemanticKind::Operator, Vec::new());
        self.close_delimiter(token);
    }

    fn close_delimiter(&mut self, token: &Token) {
        if !token.end.is_empty() {
            self.push(
                token.pos + token.start.len() + token.content.len(),
                token.end.len(),
                SemanticKind::Operator,
                Vec::new(),
            );
        }
    }

    fn push(
        &mut self,
        pos: usize,
        byte_len: usize,
        kind: SemanticKind,
        modifiers: Vec<SemanticModifier>,
    ) {
        if byte_len == 0 {
            return;
        }
        let position = self.map.position(pos);
        let length = self.source[pos..pos + byte_len].chars().count();
        self.tokens.push(BuiltToken {
            line: (position.line - 1) as u32,
            character: (position.column - 1) as u32,
            length: length as u32,
            kind,
            modifiers,
        });
    }
}

/// Byte range of the first quoted literal in a tag's content, quotes
/// included.
fn quoted_span(content: &str) -> Option<std::ops::Range<usize>> {
    let open = content.find(QUOTE_CHARS)?;
    let quote = content[open..].chars().next()?;
    let close = content[open + quote.len_utf8()..].find(quote)?;
    Some(open..open + quote.len_utf8() + close + quote.len_utf8())
}
