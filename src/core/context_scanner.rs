// src/core/context_scanner.rs
use std::collections::BTreeMap;

use super::ast::{ExprKind, Param, Span};
use super::state_machine::{MethodKind, SourceScanner};

/// Source text of one file together with the context type table used to
/// classify step parameters
pub struct SourceFile<'s> {
    source: &'s str,
    context_types: &'s BTreeMap<String, MethodKind>,
}

impl<'s> SourceFile<'s> {
    pub fn new(source: &'s str, context_types: &'s BTreeMap<String, MethodKind>) -> Self {
        Self { source, context_types }
    }
}

impl SourceScanner for SourceFile<'_> {
    /// Whitespace runs are collapsed to a single space
    fn excerpt(&self, span: Span, max_len: usize) -> String {
        let end = span.end.min(self.source.len());
        let start = span.start.min(end);
        let Some(text) = self.source.get(start..end) else {
            return String::new();
        };

        text.split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .chars()
            .take(max_len)
            .collect()
    }

    fn find_context_arg(&self, params: &[Param]) -> Option<(MethodKind, String)> {
        params.iter().find_map(|param| {
            let ty = match &param.ty.kind {
                ExprKind::Star(inner) => inner.as_ref(),
                _ => &param.ty,
            };
            let (_, type_name) = ty.selector_parts();
            let kind = *self.context_types.get(&type_name)?;
            let name = param.names.first()?;
            // an unnamed or blank context parameter cannot be referenced
            (name != "_").then(|| (kind, name.clone()))
        })
    }
}
