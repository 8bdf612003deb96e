//! Property: for any input, concatenating every token's `start + content +
//! end` (plus a newline where `eol` is set) reconstructs the input exactly.
//! The scanner must be total, so this holds for arbitrary junk as well as
//! for well-formed templates.

use proptest::prelude::*;
use templet_parser::templet::{parse, scanner};

fn reconstruct(text: &str) -> String {
    scanner::scan(text).iter().map(|t| t.to_source()).collect()
}

/// Fragments that compose into template-shaped documents, including
/// pathological adjacency and stray delimiters.
fn fragment() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("plain text ".to_string()),
        Just("\n".to_string()),
        Just("\r\n".to_string()),
        Just("   \n".to_string()),
        Just("<# code() #>".to_string()),
        Just("<#- trimmed -#>".to_string()),
        Just("#{expr}".to_string()),
        Just("#{ {a: {b: 1}} }".to_string()),
        Just("!{raw}".to_string()),
        Just("<#@ extend('base.njs') #>".to_string()),
        Just("<# block 'x' : #>".to_string()),
        Just("<#- slot 'y' : -#>".to_string()),
        Just("<# end #>".to_string()),
        Just("<#- end -#>".to_string()),
        Just("<* comment\nacross lines *>".to_string()),
        Just("<% legacy %>".to_string()),
        Just("<%= legacy_expr %>".to_string()),
        Just("<#".to_string()),
        Just("#>".to_string()),
        Just("}".to_string()),
        Just("#".to_string()),
        Just("<".to_string()),
    ]
}

proptest! {
    #[test]
    fn roundtrips_arbitrary_strings(input in ".*") {
        prop_assert_eq!(reconstruct(&input), input);
    }

    #[test]
    fn roundtrips_template_fragments(parts in proptest::collection::vec(fragment(), 0..24)) {
        let input: String = parts.concat();
        prop_assert_eq!(reconstruct(&input), input.clone());

        // The tree builder keeps the same flat stream.
        let parsed = parse(&input);
        let from_tree: String = parsed.tokens.iter().map(|t| t.to_source()).collect();
        prop_assert_eq!(from_tree, input);
    }

    #[test]
    fn unclosed_errors_match_open_scopes(parts in proptest::collection::vec(fragment(), 0..24)) {
        let input: String = parts.concat();
        let parsed = parse(&input);

        let opens = parsed.tokens.iter().filter(|t| {
            matches!(t.kind, templet_parser::templet::TokenKind::BlockStart
                | templet_parser::templet::TokenKind::SlotStart)
        }).count();
        let closes = parsed.tokens.iter().filter(|t| {
            t.kind == templet_parser::templet::TokenKind::BlockEnd
        }).count();

        let unclosed = parsed.errors.iter()
            .filter(|e| e.message.starts_with("Unclosed"))
            .count();
        let unmatched = parsed.errors.iter()
            .filter(|e| e.message == "Unmatched end tag")
            .count();

        // Stack balance: every surplus opener is unclosed, every surplus
        // closer is unmatched.
        prop_assert_eq!(opens + unmatched, closes + unclosed);
    }
}
