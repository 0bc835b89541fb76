// src/core/state_machine/scanner.rs
use crate::core::ast::{Param, Span};
use super::MethodKind;

/// Source-level services the trace needs from the front-end.
///
/// Implementations are queried, never mutated, while a body is traced, so one
/// scanner can serve several traces of the same file.
pub trait SourceScanner {
    /// Verbatim source text of `span`, at most `max_len` characters
    fn excerpt(&self, span: Span, max_len: usize) -> String;

    /// Find the parameter whose declared type is a recognized context type
    fn find_context_arg(&self, params: &[Param]) -> Option<(MethodKind, String)>;
}

/// Rendering budgets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceLimits {
    pub max_condition_len: usize,
    pub max_argument_len: usize,
}

impl Default for TraceLimits {
    fn default() -> Self {
        Self {
            max_condition_len: 40,
            max_argument_len: 20,
        }
    }
}
