//! Document outline built from the block/slot tree.

use serde::Serialize;
use templet_parser::templet::{CodeBlock, Parsed, Range, SourceMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SymbolKind {
    Block,
    Slot,
}

impl SymbolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Block => "block",
            SymbolKind::Slot => "slot",
        }
    }
}

/// One outline entry. `range` spans opener through closer; `selection_range`
/// is the opener tag alone.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSymbol {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub kind: SymbolKind,
    pub range: Range,
    pub selection_range: Range,
    pub children: Vec<DocumentSymbol>,
}

/// Collect the nested block/slot outline of one document.
pub fn document_symbols(text: &str, parsed: &Parsed) -> Vec<DocumentSymbol> {
    let map = SourceMap::new(text);
    let mut symbols = child_symbols(&parsed.blocks, &parsed.slots, &map);
    symbols.sort_by_key(|symbol| symbol.range.span.start);
    symbols
}

fn child_symbols(
    blocks: &[CodeBlock],
    slots: &[CodeBlock],
    map: &SourceMap,
) -> Vec<DocumentSymbol> {
    let mut symbols: Vec<DocumentSymbol> = blocks
        .iter()
        .map(|block| block_symbol(block, SymbolKind::Block, map))
        .collect();
    symbols.extend(
        slots
            .iter()
            .map(|slot| block_symbol(slot, SymbolKind::Slot, map)),
    );
    symbols.sort_by_key(|symbol| symbol.range.span.start);
    symbols
}

fn block_symbol(block: &CodeBlock, kind: SymbolKind, map: &SourceMap) -> DocumentSymbol {
    let children = child_symbols(&block.blocks, &block.slots, map);
    let end = match &block.closing {
        Some(closing) => closing.span().end,
        // Unclosed blocks collapse to their opener.
        None => block.decl.span().end,
    };
    let detail = match children.len() {
        0 => None,
        n => Some(format!("{n} nested")),
    };
    DocumentSymbol {
        name: block.name.clone(),
        detail,
        kind,
        range: map.range(block.decl.span().start..end),
        selection_range: map.range(block.decl.span()),
        children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use templet_parser::templet::parse;

    fn outline(text: &str) -> Vec<DocumentSymbol> {
        document_symbols(text, &parse(text))
    }

    #[test]
    fn top_level_blocks_become_symbols() {
        let text = "<# block 'a' : #>x<# end #>\n<# slot 'b' : #><# end #>";
        let found = outline(text);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "a");
        assert_eq!(found[0].kind, SymbolKind::Block);
        assert_eq!(found[1].name, "b");
        assert_eq!(found[1].kind, SymbolKind::Slot);
    }

    #[test]
    fn range_spans_opener_through_closer() {
        let found = outline("<# block 'a' : #>body<# end #>");
        assert_eq!(found[0].range.span, 0..30);
        assert_eq!(found[0].selection_range.span, 0..17);
    }

    #[test]
    fn nested_declarations_nest_in_the_outline() {
        let text = concat!(
            "<# block 'outer' : #>\n",
            "<# slot 'inner' : #><# end #>\n",
            "<# end #>\n",
        );
        let found = outline(text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].detail.as_deref(), Some("1 nested"));
        assert_eq!(found[0].children.len(), 1);
        assert_eq!(found[0].children[0].name, "inner");
        assert_eq!(found[0].children[0].kind, SymbolKind::Slot);
    }

    #[test]
    fn unclosed_block_collapses_to_its_opener() {
        let found = outline("<# block 'a' : #>\ndangling");
        assert_eq!(found[0].range.span, 0..17);
        assert!(found[0].children.is_empty());
    }

    #[test]
    fn symbols_come_out_in_document_order() {
        let text = "<# slot 's' : #><# end #><# block 'b' : #><# end #>";
        let found = outline(text);
        assert_eq!(found[0].name, "s");
        assert_eq!(found[1].name, "b");
    }
}
