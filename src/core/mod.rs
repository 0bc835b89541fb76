// src/core/mod.rs
pub mod ast;
pub mod state_machine;

mod context_scanner;
mod engine;
mod exporter;
mod parser;

// Language-specific parsers
mod languages;

#[cfg(test)]
pub(crate) mod test_support;

pub use context_scanner::SourceFile;
pub use exporter::{ExportMetadata, FileEntry, GraphDocument, GraphExporter};
pub use languages::{GoParser, LanguageParser};
pub use parser::CodeParser;
pub use state_machine::{MethodDecl, MethodKind, MethodTransition, StateMachineGraph, TransitionTarget};

// Export the main engine
pub use engine::Engine;
