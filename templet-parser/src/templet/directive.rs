//! Directive content parsing.
//!
//! Directive tags are tokenized generically (`<#@ name ...args #>`); this
//! module splits the content into a name plus arguments. The splitter is
//! deliberately permissive: arguments come either as a parenthesized comma
//! list (`requireAs(./partials/menu, menu)`) or whitespace separated
//! (`context 'ctx'`), and surrounding quote characters are stripped either
//! way. Arity and type validation lives with the diagnostics that consume
//! the parsed call.

use crate::templet::token::unquote;

/// One parsed directive invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveCall {
    pub name: String,
    pub args: Vec<String>,
}

/// Parse a directive token's content. Returns `None` when no directive name
/// is present (empty or malformed head).
pub fn parse_directive(content: &str) -> Option<DirectiveCall> {
    let trimmed = content.trim();
    let name_end = trimmed
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(trimmed.len());
    if name_end == 0 {
        return None;
    }
    let name = trimmed[..name_end].to_string();
    let rest = trimmed[name_end..].trim();

    let args = if let Some(after_paren) = rest.strip_prefix('(') {
        let inner = match after_paren.rfind(')') {
            Some(idx) => &after_paren[..idx],
            None => after_paren,
        };
        inner
            .split(',')
            .map(|arg| unquote(arg.trim()).to_string())
            .filter(|arg| !arg.is_empty())
            .collect()
    } else {
        rest.split_whitespace()
            .map(|arg| unquote(arg).to_string())
            .collect()
    };

    Some(DirectiveCall { name, args })
}
