//! Source extraction, reference resolution and graph construction

pub mod attribution;
pub mod builder;
pub mod call_shapes;
pub mod expansion;
pub mod extractor;
pub mod formats;
pub mod header;
pub mod parser;
pub mod resolver;
pub mod shapes;
pub mod skeleton;


#[cfg(test)]
pub mod test_utils;

pub use builder::{AutoModeThreshold, BuildError, BuildOptions, GraphBuilder, build};
pub use extractor::{Extraction, FileCategory, SourceExtractor, Symbol, SymbolKind};
pub use resolver::{resolve, resolve_reference};
