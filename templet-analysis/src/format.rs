//! Source-preserving template formatter.
//!
//! The formatter walks the flat token stream in document order and is
//! byte-exact outside a small set of canonicalization points: directives are
//! hoisted to the top, structural tags are rewritten to one canonical
//! spelling, whitespace-only text tokens collapse to a single newline, and
//! blank-line runs are clamped. Every rewrite is a canonicalization, never an
//! insertion, so formatting is idempotent: `format(format(t)) == format(t)`.
//!
//! The inner content of non-structural code tags can be handed to an
//! injectable [`CodeFormatter`]; any collaborator failure keeps the original
//! tag text unchanged.

use std::error::Error;
use std::fmt;
use templet_parser::templet::{Parsed, Token, TokenKind};

/// Host-language tag for code-content formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserTag {
    #[default]
    Html,
    Markdown,
    Typescript,
    Babel,
}

impl ParserTag {
    pub fn as_str(self) -> &'static str {
        match self {
            ParserTag::Html => "html",
            ParserTag::Markdown => "markdown",
            ParserTag::Typescript => "typescript",
            ParserTag::Babel => "babel",
        }
    }
}

impl std::str::FromStr for ParserTag {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "html" => Ok(ParserTag::Html),
            "markdown" => Ok(ParserTag::Markdown),
            "typescript" => Ok(ParserTag::Typescript),
            "babel" => Ok(ParserTag::Babel),
            other => Err(format!("unknown parser tag: {other}")),
        }
    }
}

impl fmt::Display for ParserTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External formatter for the inner content of code tags. May fail; failure
/// means the tag is passed through unchanged.
pub trait CodeFormatter {
    fn format(&self, code: &str, tag: ParserTag) -> Result<String, Box<dyn Error>>;
}

/// Formatting knobs. `indent` is advisory: it is forwarded to whoever
/// constructs the [`CodeFormatter`] collaborator, the walker itself never
/// invents indentation.
pub struct FormatOptions<'a> {
    pub indent: usize,
    pub parser_tag: ParserTag,
    /// Normalize text runs (whitespace-only tokens, blank-line clamping).
    pub text_formatter: bool,
    pub code_formatter: Option<&'a dyn CodeFormatter>,
    /// Maximum consecutive blank lines kept in a text run; negative disables
    /// clamping.
    pub keep_blank_lines: i32,
    /// Identifier of the document being formatted, used by the transient
    /// path guard.
    pub doc_id: Option<&'a str>,
}

impl Default for FormatOptions<'_> {
    fn default() -> Self {
        Self {
            indent: 2,
            parser_tag: ParserTag::Html,
            text_formatter: true,
            code_formatter: None,
            keep_blank_lines: 2,
            doc_id: None,
        }
    }
}

#[derive(Debug)]
pub enum FormatError {
    /// The document identifier looks like a throwaway buffer; refusing to
    /// format it is a deliberate fail-fast guard.
    TransientPath(String),
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::TransientPath(path) => {
                write!(f, "refusing to format transient path: {path}")
            }
        }
    }
}

impl Error for FormatError {}

/// Format one document from its source text and parse result.
pub fn format(text: &str, parsed: &Parsed, options: &FormatOptions) -> Result<String, FormatError> {
    if let Some(doc_id) = options.doc_id {
        if looks_transient(doc_id) {
            return Err(FormatError::TransientPath(doc_id.to_string()));
        }
    }

    let mut out = String::with_capacity(text.len());

    // Directives always come first, one per line, in source order.
    for token in &parsed.tokens {
        if token.kind == TokenKind::Directive {
            out.push_str("<#@");
            out.push_str(&token.content);
            out.push_str("#>\n");
        }
    }

    let mut buffer = String::new();
    for token in &parsed.tokens {
        match token.kind {
            TokenKind::Directive => {}
            TokenKind::Text => {
                if options.text_formatter && token.eol && token.content.trim().is_empty() {
                    // A blank run ending in a terminator collapses to one
                    // newline. Indentation before an inline tag carries no
                    // terminator and is real document text, so it stays.
                    buffer.push('\n');
                } else {
                    buffer.push_str(&token.to_source());
                }
            }
            TokenKind::Expression => {
                // Expressions belong to the surrounding text run and are
                // never reformatted as code.
                buffer.push_str(&token.to_source());
            }
            TokenKind::Comment => {
                flush(&mut buffer, &mut out, options);
                out.push_str(&token.to_source());
            }
            TokenKind::BlockStart | TokenKind::SlotStart | TokenKind::BlockEnd => {
                flush(&mut buffer, &mut out, options);
                out.push_str(&canonical_structural(&structural_command(token)));
                if token.eol {
                    out.push('\n');
                }
            }
            TokenKind::Code => {
                flush(&mut buffer, &mut out, options);
                emit_code(token, options, &mut out);
            }
        }
    }
    flush(&mut buffer, &mut out, options);

    Ok(out)
}

/// A transient or backup buffer we should never rewrite in place.
fn looks_transient(doc_id: &str) -> bool {
    let lowered = doc_id.to_ascii_lowercase();
    lowered.contains("tmp") || lowered.contains("copy")
}

/// Code tags spelled like structural commands are canonicalized instead of
/// being handed to the code formatter. Legacy `<% %>` tags never qualify.
fn structural_shape(token: &Token) -> bool {
    if !token.start.starts_with("<#") {
        return false;
    }
    let trimmed = token.content.trim();
    trimmed == "end" || trimmed.starts_with("block ") || trimmed.starts_with("slot ")
}

fn emit_code(token: &Token, options: &FormatOptions, out: &mut String) {
    if structural_shape(token) {
        out.push_str(&canonical_structural(&token.content));
        if token.eol {
            out.push('\n');
        }
        return;
    }
    if let Some(formatter) = options.code_formatter {
        if let Ok(formatted) = formatter.format(&token.content, options.parser_tag) {
            out.push_str(&token.start);
            out.push_str(&formatted);
            out.push_str(&token.end);
            if token.eol {
                out.push('\n');
            }
            return;
        }
        // Collaborator failed: keep the original bytes.
    }
    out.push_str(&token.to_source());
}

/// Structural tokens keep the `block`/`slot` keyword inside their opening
/// delimiter text; rebuild the full command before canonicalizing.
fn structural_command(token: &Token) -> String {
    match token.kind {
        TokenKind::BlockEnd => "end".to_string(),
        TokenKind::SlotStart => format!("slot {}", token.content),
        _ => format!("block {}", token.content),
    }
}

/// One canonical spelling for structural commands: non-trimmed delimiters,
/// single internal spaces, and a detached trailing colon for openers.
fn canonical_structural(command: &str) -> String {
    let mut words: Vec<String> = command.split_whitespace().map(str::to_string).collect();
    if let Some(last) = words.last_mut() {
        if last != ":" && last.ends_with(':') {
            last.truncate(last.len() - 1);
            words.push(":".to_string());
        }
    }
    let opener = matches!(words.first().map(String::as_str), Some("block" | "slot"));
    if opener && words.last().map(String::as_str) != Some(":") {
        words.push(":".to_string());
    }
    format!("<# {} #>", words.join(" "))
}

/// Flush the accumulated text run, clamping blank-line streaks.
fn flush(buffer: &mut String, out: &mut String, options: &FormatOptions) {
    if buffer.is_empty() {
        return;
    }
    if options.text_formatter && options.keep_blank_lines >= 0 {
        // keep_blank_lines blank lines means keep + 1 consecutive breaks.
        out.push_str(&clamp_breaks(buffer, options.keep_blank_lines as usize + 1));
    } else {
        out.push_str(buffer);
    }
    buffer.clear();
}

/// Limit consecutive line breaks to `max_breaks`, treating `\r\n` as one
/// break.
fn clamp_breaks(run: &str, max_breaks: usize) -> String {
    let mut out = String::with_capacity(run.len());
    let mut streak = 0usize;
    let mut chars = run.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\r' && chars.peek() == Some(&'\n') {
            chars.next();
            streak += 1;
            if streak <= max_breaks {
                out.push_str("\r\n");
            }
        } else if ch == '\n' {
            streak += 1;
            if streak <= max_breaks {
                out.push('\n');
            }
        } else {
            streak = 0;
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use templet_parser::templet::parse;

    fn run(text: &str) -> String {
        run_with(text, &FormatOptions::default())
    }

    fn run_with(text: &str, options: &FormatOptions) -> String {
        let parsed = parse(text);
        format(text, &parsed, options).unwrap()
    }

    #[test]
    fn structural_tags_are_canonicalized() {
        let out = run("<#- block 'x' : -#>\nC\n<#- end -#>");
        assert_eq!(out, "<# block 'x' : #>\nC\n<# end #>");
        assert!(!out.contains("<#-"));
        assert!(!out.contains("-#>"));
    }

    #[test]
    fn opener_colon_gets_its_space() {
        let out = run("<# block 'x': #><# end #>");
        assert_eq!(out, "<# block 'x' : #><# end #>");
    }

    #[test]
    fn sloppy_code_spelled_like_structural_is_normalized() {
        let out = run("<#   block   'x'  :  #>\nbody\n<#  end  #>");
        assert_eq!(out, "<# block 'x' : #>\nbody\n<# end #>");
    }

    #[test]
    fn directives_are_hoisted_in_order() {
        let out = run("hello\n<#@ context 'c' #>\nworld\n<#@ promise #>\n");
        assert_eq!(out, "<#@ context 'c' #>\n<#@ promise #>\nhello\nworld\n");
    }

    #[test]
    fn blank_lines_are_clamped() {
        let options = FormatOptions {
            keep_blank_lines: 1,
            ..FormatOptions::default()
        };
        assert_eq!(run_with("a\n\n\n\n\nb\n", &options), "a\n\nb\n");
    }

    #[test]
    fn negative_keep_disables_clamping() {
        let options = FormatOptions {
            keep_blank_lines: -1,
            ..FormatOptions::default()
        };
        let text = "a\n\n\n\n\nb\n";
        assert_eq!(run_with(text, &options), text);
    }

    #[test]
    fn whitespace_only_lines_collapse_to_one_newline() {
        assert_eq!(run("a\n   \t\nb\n"), "a\n\nb\n");
    }

    #[test]
    fn text_formatter_off_preserves_text_runs() {
        let options = FormatOptions {
            text_formatter: false,
            ..FormatOptions::default()
        };
        let text = "a\n   \n\n\n\n\nb\n";
        assert_eq!(run_with(text, &options), text);
    }

    #[test]
    fn expressions_pass_through_verbatim() {
        let text = "<div>#{ x+1 }!{ raw }</div>\n";
        assert_eq!(run(text), text);
    }

    #[test]
    fn comments_pass_through_verbatim() {
        let text = "a\n<* note\n\n\n\nstill note *>\nb\n";
        assert_eq!(run(text), text);
    }

    #[test]
    fn transient_paths_are_refused() {
        let parsed = parse("x");
        let options = FormatOptions {
            doc_id: Some("/tmp/scratch.njs"),
            ..FormatOptions::default()
        };
        assert!(matches!(
            format("x", &parsed, &options),
            Err(FormatError::TransientPath(_))
        ));
        let options = FormatOptions {
            doc_id: Some("page copy.njs"),
            ..FormatOptions::default()
        };
        assert!(format("x", &parsed, &options).is_err());
    }

    struct Shouting;

    impl CodeFormatter for Shouting {
        fn format(&self, code: &str, _tag: ParserTag) -> Result<String, Box<dyn Error>> {
            Ok(code.to_ascii_uppercase())
        }
    }

    struct Failing;

    impl CodeFormatter for Failing {
        fn format(&self, _code: &str, _tag: ParserTag) -> Result<String, Box<dyn Error>> {
            Err("no thanks".into())
        }
    }

    #[test]
    fn code_formatter_rewrites_inner_content_only() {
        let options = FormatOptions {
            code_formatter: Some(&Shouting),
            ..FormatOptions::default()
        };
        let out = run_with("<# if (a) { #>x<# } #>", &options);
        assert_eq!(out, "<# IF (A) { #>x<# } #>");
    }

    #[test]
    fn failing_code_formatter_keeps_original_bytes() {
        let options = FormatOptions {
            code_formatter: Some(&Failing),
            ..FormatOptions::default()
        };
        let text = "<# if (a) { #>x<# } #>";
        assert_eq!(run_with(text, &options), text);
    }

    #[test]
    fn code_formatter_never_touches_structural_tags() {
        let options = FormatOptions {
            code_formatter: Some(&Shouting),
            ..FormatOptions::default()
        };
        let out = run_with("<# block 'x' : #><# end #>", &options);
        assert_eq!(out, "<# block 'x' : #><# end #>");
    }

    #[test]
    fn formatting_is_idempotent_on_a_mixed_document() {
        let text = concat!(
            "line one\n",
            "<#@ context 'ctx' #>\n",
            "<#- block 'header' : -#>\n",
            "  <h1>#{title}</h1>\n",
            "\n\n\n\n",
            "<#- end -#>\n",
            "<# if (ctx.ok) { #>\n",
            "yes\n",
            "<# } #>\n",
            "<* trailing note *>\n",
        );
        let once = run(text);
        let twice = run(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn inline_indentation_before_a_tag_is_preserved() {
        // Indentation scans as a whitespace-only text token without a
        // terminator; it is document content, not padding.
        let text = "<# if (page.menu) { #>\n  !{page.menu}\n<# } #>\n";
        let once = run(text);
        assert_eq!(once, text);
        assert_eq!(run(&once), once);
    }

    #[test]
    fn crlf_breaks_clamp_as_single_breaks() {
        let options = FormatOptions {
            keep_blank_lines: 0,
            ..FormatOptions::default()
        };
        let out = run_with("a\r\n\r\n\r\nb\r\n", &options);
        assert_eq!(out, "a\r\nb\r\n");
    }
}
