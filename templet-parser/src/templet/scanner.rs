//! Delimiter-driven scanner.
//!
//! The scanner walks the source once with an explicit [`Cursor`] (offset,
//! line, column) owned by the scan loop. At every offset it tries the tag
//! states in [`TAG_PRIORITY`] order against the remaining buffer; the first
//! state whose opening delimiter matches wins. The ordering is a contract,
//! not an accident: structural (`<# block`, `<# slot`, `<# end #>`) and
//! directive (`<#@`) forms are declared before the generic `<#` code state so
//! they can never be tokenized as plain code, and the legacy `<%=`/`<%-`
//! forms come before the bare `<%`. A test at the bottom of this file pins
//! the contract.
//!
//! Expression states (`#{ }`, `!{ }`) additionally track a curly-brace
//! balance so object and array literals inside an expression do not
//! terminate it early. This is the only character-class lookahead in the
//! scanner; everything else is prefix matching.
//!
//! The scanner is total. A tag whose closing delimiter never appears keeps
//! collecting content until end of input and is emitted with an empty `end`;
//! callers detect the condition by checking for the missing delimiter.

use crate::templet::token::{unquote, Token, TokenKind};

/// Scanner state identifiers, one per delimiter family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    Comment,
    Directive,
    BlockEnd,
    SlotStart,
    BlockStart,
    Code,
    Expression,
    RawExpression,
    LegacyComment,
    LegacyExpression,
    LegacyCode,
}

/// Declarative description of one tag state.
///
/// `starts` and `ends` are tried in declaration order, so longer variants
/// must be listed before their prefixes (`-#>` before `#>`). `skip` lists
/// delimiter sequences that must not match for this state to apply. `exact`
/// marks states whose `starts` entries are complete tags (the `<# end #>`
/// family) rather than opening delimiters.
#[derive(Debug, Clone, Copy)]
pub struct TagSyntax {
    pub kind: TagKind,
    pub token: TokenKind,
    pub starts: &'static [&'static str],
    pub ends: &'static [&'static str],
    pub skip: &'static [&'static str],
    pub balanced: bool,
    pub exact: bool,
}

/// Tag states in match-priority order. First match wins.
pub const TAG_PRIORITY: &[TagSyntax] = &[
    TagSyntax {
        kind: TagKind::Comment,
        token: TokenKind::Comment,
        starts: &["<*"],
        ends: &["*>"],
        skip: &[],
        balanced: false,
        exact: false,
    },
    TagSyntax {
        kind: TagKind::Directive,
        token: TokenKind::Directive,
        starts: &["<#@"],
        ends: &["-#>", "#>"],
        skip: &[],
        balanced: false,
        exact: false,
    },
    TagSyntax {
        kind: TagKind::BlockEnd,
        token: TokenKind::BlockEnd,
        starts: &["<#- end -#>", "<#- end #>", "<# end -#>", "<# end #>"],
        ends: &["-#>", "#>"],
        skip: &[],
        balanced: false,
        exact: true,
    },
    TagSyntax {
        kind: TagKind::SlotStart,
        token: TokenKind::SlotStart,
        starts: &["<#- slot", "<# slot"],
        ends: &["-#>", "#>"],
        skip: &[],
        balanced: false,
        exact: false,
    },
    TagSyntax {
        kind: TagKind::BlockStart,
        token: TokenKind::BlockStart,
        starts: &["<#- block", "<# block"],
        ends: &["-#>", "#>"],
        skip: &[],
        balanced: false,
        exact: false,
    },
    TagSyntax {
        kind: TagKind::Code,
        token: TokenKind::Code,
        starts: &["<#-", "<#"],
        ends: &["-#>", "#>"],
        skip: &[
            "<#@",
            "<#- block",
            "<# block",
            "<#- slot",
            "<# slot",
            "<#- end -#>",
            "<#- end #>",
            "<# end -#>",
            "<# end #>",
        ],
        balanced: false,
        exact: false,
    },
    TagSyntax {
        kind: TagKind::Expression,
        token: TokenKind::Expression,
        starts: &["#{"],
        ends: &["}"],
        skip: &[],
        balanced: true,
        exact: false,
    },
    TagSyntax {
        kind: TagKind::RawExpression,
        token: TokenKind::Expression,
        starts: &["!{"],
        ends: &["}"],
        skip: &[],
        balanced: true,
        exact: false,
    },
    TagSyntax {
        kind: TagKind::LegacyComment,
        token: TokenKind::Comment,
        starts: &["<%#"],
        ends: &["-%>", "%>"],
        skip: &[],
        balanced: false,
        exact: false,
    },
    TagSyntax {
        kind: TagKind::LegacyExpression,
        token: TokenKind::Expression,
        starts: &["<%=", "<%-"],
        ends: &["-%>", "%>"],
        skip: &[],
        balanced: false,
        exact: false,
    },
    TagSyntax {
        kind: TagKind::LegacyCode,
        token: TokenKind::Code,
        starts: &["<%_", "<%"],
        ends: &["_%>", "-%>", "%>"],
        skip: &["<%#", "<%=", "<%-"],
        balanced: false,
        exact: false,
    },
];

/// Scan position. The scan loop is the single owner; no other state cell
/// exists across the pass.
#[derive(Debug, Clone, Copy)]
struct Cursor {
    offset: usize,
    line: usize,
    column: usize,
}

impl Cursor {
    fn new() -> Self {
        Self {
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    fn bump_char(&mut self, ch: char) {
        self.offset += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }

    fn bump_str(&mut self, consumed: &str) {
        for ch in consumed.chars() {
            self.bump_char(ch);
        }
    }
}

/// Pending run of plain text, flushed when a tag or line terminator is hit.
struct TextRun {
    pos: usize,
    line: usize,
    column: usize,
    content: String,
}

impl TextRun {
    fn begin(cursor: &Cursor) -> Self {
        Self {
            pos: cursor.offset,
            line: cursor.line,
            column: cursor.column,
            content: String::new(),
        }
    }

    fn into_token(self, eol: bool) -> Token {
        Token {
            kind: TokenKind::Text,
            content: self.content,
            pos: self.pos,
            line: self.line,
            column: self.column,
            start: String::new(),
            end: String::new(),
            eol,
            name: None,
        }
    }
}

/// Scan source text into a flat token stream.
pub fn scan(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut cursor = Cursor::new();
    let mut run: Option<TextRun> = None;

    while cursor.offset < text.len() {
        let rest = &text[cursor.offset..];
        if let Some((syntax, start)) = match_tag(rest) {
            if let Some(pending) = run.take() {
                tokens.push(pending.into_token(false));
            }
            tokens.push(scan_tag(text, &mut cursor, syntax, start));
            continue;
        }

        let Some(ch) = rest.chars().next() else { break };
        if run.is_none() {
            run = Some(TextRun::begin(&cursor));
        }
        if ch == '\n' {
            cursor.bump_char(ch);
            if let Some(pending) = run.take() {
                tokens.push(pending.into_token(true));
            }
        } else {
            if let Some(pending) = run.as_mut() {
                pending.content.push(ch);
            }
            cursor.bump_char(ch);
        }
    }

    if let Some(pending) = run.take() {
        tokens.push(pending.into_token(false));
    }
    tokens
}

/// Try every tag state in priority order against the remaining buffer.
fn match_tag(rest: &str) -> Option<(&'static TagSyntax, &'static str)> {
    for syntax in TAG_PRIORITY {
        if syntax.skip.iter().any(|guard| rest.starts_with(guard)) {
            continue;
        }
        if let Some(start) = syntax.starts.iter().find(|s| rest.starts_with(**s)) {
            return Some((syntax, start));
        }
    }
    None
}

fn scan_tag(
    text: &str,
    cursor: &mut Cursor,
    syntax: &TagSyntax,
    matched_start: &str,
) -> Token {
    let pos = cursor.offset;
    let line = cursor.line;
    let column = cursor.column;
    cursor.bump_str(matched_start);

    let (start, content, end) = if syntax.exact {
        split_exact(matched_start, syntax.ends)
    } else {
        let (content, end) = scan_to_end(text, cursor, syntax);
        (matched_start.to_string(), content, end)
    };

    // Consume a trailing line terminator for terminated tags so the
    // surrounding text run does not grow a spurious blank line.
    let mut eol = false;
    if !end.is_empty() && text[cursor.offset..].starts_with('\n') {
        cursor.bump_char('\n');
        eol = true;
    }

    let name = match syntax.token {
        TokenKind::BlockStart | TokenKind::SlotStart => Some(block_label(&content)),
        _ => None,
    };

    Token {
        kind: syntax.token,
        content,
        pos,
        line,
        column,
        start,
        end,
        eol,
        name,
    }
}

/// Collect content until the first accepted end delimiter or end of input.
fn scan_to_end(text: &str, cursor: &mut Cursor, syntax: &TagSyntax) -> (String, String) {
    let content_start = cursor.offset;
    let mut balance = 0usize;
    let mut end = "";

    while cursor.offset < text.len() {
        let rest = &text[cursor.offset..];
        if syntax.balanced {
            let Some(ch) = rest.chars().next() else { break };
            if ch == '{' {
                balance += 1;
                cursor.bump_char(ch);
                continue;
            }
            if ch == '}' && balance > 0 {
                balance -= 1;
                cursor.bump_char(ch);
                continue;
            }
        }
        if let Some(matched) = syntax.ends.iter().find(|e| rest.starts_with(**e)) {
            end = matched;
            break;
        }
        let Some(ch) = rest.chars().next() else { break };
        cursor.bump_char(ch);
    }

    let content = text[content_start..cursor.offset].to_string();
    if !end.is_empty() {
        cursor.bump_str(end);
    }
    (content, end.to_string())
}

/// Split a complete `<# end #>`-family literal into its delimiter parts.
fn split_exact(literal: &str, ends: &[&'static str]) -> (String, String, String) {
    for end in ends {
        if let Some(rest) = literal.strip_suffix(end) {
            let open = rest.trim_end();
            let content = &rest[open.len()..];
            return (open.to_string(), content.to_string(), end.to_string());
        }
    }
    (literal.to_string(), String::new(), String::new())
}

/// Extract the unquoted label from a block/slot opener's content, dropping
/// the trailing colon.
fn block_label(content: &str) -> String {
    let trimmed = content.trim();
    let trimmed = match trimmed.strip_suffix(':') {
        Some(rest) => rest.trim_end(),
        None => trimmed,
    };
    unquote(trimmed).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    fn reconstruct(tokens: &[Token]) -> String {
        tokens.iter().map(Token::to_source).collect()
    }

    #[test]
    fn priority_order_is_pinned() {
        // Structural and directive states must be declared before the
        // generic code state, and the specific legacy forms before `<%`.
        let order: Vec<TagKind> = TAG_PRIORITY.iter().map(|s| s.kind).collect();
        let index = |kind: TagKind| order.iter().position(|k| *k == kind).unwrap();
        assert!(index(TagKind::Directive) < index(TagKind::Code));
        assert!(index(TagKind::BlockEnd) < index(TagKind::Code));
        assert!(index(TagKind::SlotStart) < index(TagKind::Code));
        assert!(index(TagKind::BlockStart) < index(TagKind::Code));
        assert!(index(TagKind::LegacyComment) < index(TagKind::LegacyCode));
        assert!(index(TagKind::LegacyExpression) < index(TagKind::LegacyCode));
    }

    #[test]
    fn longer_delimiters_precede_their_prefixes() {
        for syntax in TAG_PRIORITY {
            for (i, a) in syntax.starts.iter().enumerate() {
                for b in &syntax.starts[i + 1..] {
                    assert!(
                        !b.starts_with(a),
                        "{:?}: start {:?} shadows {:?}",
                        syntax.kind,
                        a,
                        b
                    );
                }
            }
            // End delimiters are matched by suffix in the exact states, so
            // the longer variant must come first there too.
            for (i, a) in syntax.ends.iter().enumerate() {
                for b in &syntax.ends[i + 1..] {
                    assert!(
                        a.len() >= b.len(),
                        "{:?}: end {:?} listed before longer {:?}",
                        syntax.kind,
                        a,
                        b
                    );
                }
            }
        }
    }

    #[test]
    fn scans_plain_text_per_line() {
        let tokens = scan("hello\nworld");
        assert_eq!(kinds(&tokens), vec![TokenKind::Text, TokenKind::Text]);
        assert_eq!(tokens[0].content, "hello");
        assert!(tokens[0].eol);
        assert_eq!(tokens[1].content, "world");
        assert!(!tokens[1].eol);
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[1].pos, 6);
    }

    #[test]
    fn blank_line_becomes_empty_text_token() {
        let tokens = scan("a\n\nb");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].content, "");
        assert!(tokens[1].eol);
    }

    #[test]
    fn structural_tags_beat_generic_code() {
        let tokens = scan("<# block 'a' : #>x<# end #>");
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::BlockStart, TokenKind::Text, TokenKind::BlockEnd]
        );
        assert_eq!(tokens[0].name.as_deref(), Some("a"));
        assert_eq!(tokens[0].start, "<# block");
        assert_eq!(tokens[0].end, "#>");
        assert_eq!(tokens[2].start, "<# end");
        assert_eq!(tokens[2].end, "#>");
    }

    #[test]
    fn directives_are_not_code() {
        let tokens = scan("<#@ extend('base.njs') #>");
        assert_eq!(kinds(&tokens), vec![TokenKind::Directive]);
        assert_eq!(tokens[0].start, "<#@");
    }

    #[test]
    fn trim_marker_variants_are_preserved() {
        let tokens = scan("<#- block 'x' : -#>\n<#- end -#>");
        assert_eq!(tokens[0].start, "<#- block");
        assert_eq!(tokens[0].end, "-#>");
        assert!(tokens[0].eol);
        assert_eq!(tokens[1].start, "<#- end");
        assert_eq!(tokens[1].end, "-#>");
    }

    #[test]
    fn sloppy_end_spacing_scans_as_code() {
        // Only the four exact end forms are structural; anything else is a
        // code tag the formatter may later canonicalize.
        let tokens = scan("<#  end  #>");
        assert_eq!(kinds(&tokens), vec![TokenKind::Code]);
        assert_eq!(tokens[0].content, "  end  ");
    }

    #[test]
    fn expression_tracks_curly_balance() {
        let tokens = scan("#{ {a: {b: 1}} }");
        assert_eq!(kinds(&tokens), vec![TokenKind::Expression]);
        assert_eq!(tokens[0].content, " {a: {b: 1}} ");
        assert_eq!(tokens[0].end, "}");
    }

    #[test]
    fn raw_expression_uses_bang_delimiter() {
        let tokens = scan("!{ x }");
        assert_eq!(kinds(&tokens), vec![TokenKind::Expression]);
        assert_eq!(tokens[0].start, "!{");
    }

    #[test]
    fn code_keeps_unbalanced_braces() {
        let tokens = scan("<# if (a) { #>#<# } #>");
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Code, TokenKind::Text, TokenKind::Code]
        );
        assert_eq!(tokens[0].content, " if (a) { ");
        assert_eq!(tokens[1].content, "#");
        assert_eq!(tokens[2].content, " } ");
    }

    #[test]
    fn unterminated_tag_collects_to_eof() {
        let tokens = scan("before <# never closed");
        assert_eq!(kinds(&tokens), vec![TokenKind::Text, TokenKind::Code]);
        assert_eq!(tokens[1].content, " never closed");
        assert_eq!(tokens[1].end, "");
        assert!(!tokens[1].eol);
    }

    #[test]
    fn unterminated_expression_collects_to_eof() {
        let tokens = scan("#{ {a: 1 ");
        assert_eq!(kinds(&tokens), vec![TokenKind::Expression]);
        assert_eq!(tokens[0].end, "");
    }

    #[test]
    fn comments_span_lines() {
        let tokens = scan("<* one\ntwo *>after");
        assert_eq!(kinds(&tokens), vec![TokenKind::Comment, TokenKind::Text]);
        assert_eq!(tokens[0].content, " one\ntwo ");
        assert_eq!(tokens[1].content, "after");
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn legacy_forms_map_to_modern_kinds() {
        let tokens = scan("<% code %><%= expr %><%# note %><%- raw %>");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Code,
                TokenKind::Expression,
                TokenKind::Comment,
                TokenKind::Expression
            ]
        );
        assert_eq!(tokens[1].start, "<%=");
        assert_eq!(tokens[3].start, "<%-");
    }

    #[test]
    fn tag_consumes_following_newline_as_eol() {
        let tokens = scan("<# a #>\ntext");
        assert_eq!(kinds(&tokens), vec![TokenKind::Code, TokenKind::Text]);
        assert!(tokens[0].eol);
        assert_eq!(tokens[1].pos, 8);
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn carriage_return_stays_in_text_content() {
        let tokens = scan("a\r\nb");
        assert_eq!(tokens[0].content, "a\r");
        assert!(tokens[0].eol);
        assert_eq!(reconstruct(&tokens), "a\r\nb");
    }

    #[test]
    fn reconstruction_is_exact() {
        let source = "x <#@ lang(js) #>\n<# block 'a' : #>\n  #{v} !{raw}\n<# end #>\ntail";
        assert_eq!(reconstruct(&scan(source)), source);
    }

    #[test]
    fn block_label_variants() {
        assert_eq!(block_label(" 'a' : "), "a");
        assert_eq!(block_label(" \"b\":"), "b");
        assert_eq!(block_label(" `c` "), "c");
        assert_eq!(block_label("plain : "), "plain");
    }
}
