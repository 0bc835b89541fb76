//! Language-specific front-ends
//!
//! Each language gets its own module that converts method bodies into the
//! expression tree and traces the step methods it finds.

mod go;

pub use go::GoParser;

use crate::error::Result;
use super::state_machine::MethodDecl;

/// Trait that all language parsers must implement
pub trait LanguageParser {
    /// Parse source code and trace every step method found in it
    fn parse(&mut self, content: &str, file_path: &std::path::Path) -> Result<Vec<MethodDecl>>;

    /// Get the file extensions this parser handles
    fn file_extensions(&self) -> &[&str];

    /// Get the language name
    fn language_name(&self) -> &str;
}
