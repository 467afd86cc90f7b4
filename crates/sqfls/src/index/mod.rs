//
// index/mod.rs
//
// Cross-file symbol index
//
// Files are analyzed one at a time by the pipeline; every position it
// produces is mapped back through macro expansion and includes before the
// store sees it. The store reconciles each document's contribution into
// shared global and macro tables.
//

pub mod content;
pub mod debounce;
pub mod include_resolve;
pub mod indexer;
pub mod pipeline;
pub mod position_map;
pub mod prefix;
pub mod store;

pub use content::{DiskReader, FileReader};
pub use debounce::DebounceScheduler;
pub use indexer::{enumerate_files, IndexSummary};
pub use pipeline::{
    analyze_document, FileDiagnostic, IncludeInfo, MacroDefinition, MacroOccurrence, ParseInfo,
    VariableOccurrence,
};
pub use position_map::PositionMapper;
pub use prefix::PrefixIndex;
pub use store::{
    DocumentVariable, GlobalMacro, GlobalVariable, NameOwnershipOracle, NoOwners, SymbolKind,
    SymbolMatch, SymbolStore,
};
