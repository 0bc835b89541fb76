// src/core/state_machine/adapter.rs
//! Adapter invocations: `s.adapter.PrepareAsync(ctx, fn).DelayedStart()` and friends.

use super::exec_trace::ExecTrace;
use super::state_update::StateUpdate;

const DELAYED_START: &str = "DelayedStart";
const PREPARE_PREFIX: &str = "Prepare";

/// Wrapping operation derived from the receiver of a `Then*` verb
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Operation {
    pub text: String,
    /// Set when the operation waits for an adapter call
    pub adapter: Option<String>,
}

/// Names split out of an adapter call chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AdapterNames {
    /// `PrepareAsync(ctx)`: from the preparation call down to the marker's receiver
    pub preparation: String,
    /// `s.adapter`: everything above the preparation call
    pub adapter: String,
}

impl<'a> ExecTrace<'a> {
    /// `Name` or `Name(<first arg>)`
    pub(crate) fn format_update_name(&self, su: &StateUpdate<'_>) -> String {
        if su.args.is_empty() && !su.is_call {
            return su.name.clone();
        }
        let args = self.renderer().shorten_args(su.args, self.limits.max_argument_len);
        format!("{}({})", su.name, args)
    }

    /// `links` are ordered leaf first, the way `StateUpdate::ancestry` returns them
    fn join_links(&self, links: &[&StateUpdate<'_>]) -> String {
        let names: Vec<String> = links
            .iter()
            .rev()
            .filter(|su| su.has_name())
            .map(|su| self.format_update_name(su))
            .collect();
        names.join(".")
    }

    /// Describe what a `Then*` verb waits on, given its receiver link
    pub(crate) fn build_operation(&mut self, su: &StateUpdate<'_>) -> Option<Operation> {
        if !su.has_name() {
            return None;
        }

        // context verbs are named bare, without their arguments
        if su.is_context {
            return Some(Operation {
                text: su.name.clone(),
                adapter: None,
            });
        }

        let (marker, suffix) = match su.parent.as_deref() {
            _ if su.name == DELAYED_START => (su, DELAYED_START.to_string()),
            Some(parent) if parent.name == DELAYED_START && su.args.is_empty() => {
                (parent, su.name.clone())
            }
            _ => return None,
        };

        let names = self.extract_adapter_call(marker)?;
        self.md.add_adapter(&names.adapter);
        Some(Operation {
            text: format!("{}.{}", names.preparation, suffix),
            adapter: Some(names.adapter),
        })
    }

    /// Split the chain under a zero-argument marker call into the preparation call
    /// and the adapter it was made on
    pub(crate) fn extract_adapter_call(&self, marker: &StateUpdate<'_>) -> Option<AdapterNames> {
        if !marker.args.is_empty() {
            return None;
        }

        let above = marker.parent.as_deref()?.ancestry();
        let prep_idx = above
            .iter()
            .position(|su| su.is_call && su.name.starts_with(PREPARE_PREFIX))?;

        let adapter = self.join_links(&above[prep_idx + 1..]);
        if adapter.is_empty() {
            return None;
        }

        Some(AdapterNames {
            preparation: self.join_links(&above[..=prep_idx]),
            adapter,
        })
    }

    /// Fire-and-forget adapter calls made as plain statements
    pub(crate) fn record_adapter_call(&mut self, su: &StateUpdate<'_>) {
        if !su.is_call {
            return;
        }
        if let Some(names) = self.extract_adapter_call(su) {
            self.md.add_adapter_call(&su.name, &names.preparation, &names.adapter);
        }
    }
}
