//! # templet-analysis
//!
//! Editor-grade analysis over parsed templet sources: structural and
//! cross-file diagnostics, the source-preserving formatter, semantic token
//! classification, a block/slot outline, and the thin workspace-index
//! contract the cross-file checks consume.
//!
//! Everything here is a synchronous pure function over in-memory strings and
//! parse results. The only I/O is the best-effort filesystem reads behind
//! the [`resolve::FileReader`] seam, and a failed read always degrades to
//! "diagnostic not emitted" rather than an error.

pub mod diagnostics;
pub mod format;
pub mod resolve;
pub mod semantic;
pub mod symbols;
pub mod workspace;

pub use diagnostics::{diagnostics, Diagnostic, DiagnosticsContext, Severity};
pub use format::{format, CodeFormatter, FormatError, FormatOptions, ParserTag};
pub use resolve::{FileReader, FsReader, TEMPLATE_EXTENSIONS};
pub use semantic::{semantic_tokens, BuiltToken, SemanticKind, SemanticModifier};
pub use symbols::{document_symbols, DocumentSymbol, SymbolKind};
pub use workspace::{index_file, FileIndexEntry, WorkspaceIndex};
