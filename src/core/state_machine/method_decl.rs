// src/core/state_machine/method_decl.rs
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::ast::Param;
use super::SourceScanner;

/// How calls inside a step body are interpreted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MethodKind {
    DeclarationInit,
    Construction,
    Execution,
    Migration,
    #[default]
    Other,
}

impl MethodKind {
    pub fn has_context_arg(&self) -> bool {
        !matches!(self, Self::Other)
    }

    /// Migration handlers receive the state update being adjusted as a second argument
    pub fn has_state_update(&self) -> bool {
        matches!(self, Self::Migration)
    }
}

/// Destination of a transition.
///
/// Serialized as plain strings: `""`, the step name, `<stop>`, `<unknown>`,
/// `DYNAMIC <expr>` or `<Verb>` for unsupported verbs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TransitionTarget {
    /// Remain in (or repeat) the current step
    #[default]
    Stay,
    Step(String),
    Stop,
    Unknown,
    /// Target computed at runtime; carries the condensed expression
    Dynamic(String),
    /// Verb recognized but no longer supported
    Unsupported(String),
}

pub const STOP_MARKER: &str = "<stop>";
pub const UNKNOWN_MARKER: &str = "<unknown>";
pub const DYNAMIC_PREFIX: &str = "DYNAMIC ";

impl TransitionTarget {
    /// Step reference, or `Stay` when the name could not be resolved
    pub fn step(name: String) -> Self {
        if name.is_empty() {
            Self::Stay
        } else {
            Self::Step(name)
        }
    }

    pub fn is_stay(&self) -> bool {
        matches!(self, Self::Stay)
    }

    fn parse(s: &str) -> Self {
        match s {
            "" => Self::Stay,
            STOP_MARKER => Self::Stop,
            UNKNOWN_MARKER => Self::Unknown,
            _ => {
                if let Some(expr) = s.strip_prefix(DYNAMIC_PREFIX) {
                    Self::Dynamic(expr.to_string())
                } else if let Some(verb) = s.strip_prefix('<').and_then(|v| v.strip_suffix('>')) {
                    Self::Unsupported(verb.to_string())
                } else {
                    Self::Step(s.to_string())
                }
            }
        }
    }
}

impl fmt::Display for TransitionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stay => Ok(()),
            Self::Step(name) => f.write_str(name),
            Self::Stop => f.write_str(STOP_MARKER),
            Self::Unknown => f.write_str(UNKNOWN_MARKER),
            Self::Dynamic(expr) => write!(f, "{}{}", DYNAMIC_PREFIX, expr),
            Self::Unsupported(verb) => write!(f, "<{}>", verb),
        }
    }
}

impl Serialize for TransitionTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TransitionTarget {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

/// One edge of the step graph: the effect of one recognized chain link
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodTransition {
    /// Condensed guard text, e.g. `[s.ready]` or `![s.ready]`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Condensed description of the wrapping operation (repeat count, wait, adapter call)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    pub target: TransitionTarget,
    /// Hook used when the machine is migrated while parked at the target
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migration: Option<String>,
    pub inherit_migration: bool,
    /// Fires after an external adapter call completes
    pub delayed_start: bool,
    /// Fires after a sleep or wait condition
    pub wait_transition: bool,
    /// Step that receives this transition's settings instead of the target
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden_propagate: Option<String>,
}

impl MethodTransition {
    pub fn to(target: TransitionTarget) -> Self {
        Self { target, ..Self::default() }
    }

    /// No target, no operation and no guard: carries no information
    pub fn is_meaningless(&self) -> bool {
        self.target.is_stay() && self.operation.is_none() && self.condition.is_none()
    }
}

/// Adapter invoked without waiting for its result (`s.adapter.PrepareNotify(ctx, f).Send()`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterCall {
    /// Name of the starting call (`Send`, `Start`, ...)
    pub kind: String,
    pub call: String,
    pub adapter: String,
}

/// A step of a state machine, declared or synthesized from an inline closure or literal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    pub state_machine: String,
    pub receiver_type: String,
    pub receiver_name: String,
    pub kind: MethodKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_arg: Option<String>,
    pub has_update_slot: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migration: Option<String>,
    pub is_subroutine: bool,
    pub transitions: Vec<MethodTransition>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub sub_steps: Vec<MethodDecl>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty", default)]
    pub adapters: BTreeSet<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub adapter_calls: Vec<AdapterCall>,
}

impl MethodDecl {
    pub fn new(
        state_machine: &str,
        receiver_type: &str,
        receiver_name: &str,
        name: &str,
        kind: MethodKind,
    ) -> Self {
        Self {
            name: name.to_string(),
            state_machine: state_machine.to_string(),
            receiver_type: receiver_type.to_string(),
            receiver_name: receiver_name.to_string(),
            kind,
            ..Self::default()
        }
    }

    /// Identity of the step within its file
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.state_machine, self.name)
    }

    /// Ordinal for the next synthesized sub-step name
    pub fn next_sub_step_ordinal(&self) -> usize {
        self.sub_steps.len() + 1
    }

    /// Append a child step owned by this one, sharing its state machine identity
    pub fn new_sub_step(&mut self, name: &str, kind: MethodKind) -> &mut MethodDecl {
        let md = MethodDecl::new(
            &self.state_machine,
            &self.receiver_type,
            &self.receiver_name,
            name,
            kind,
        );
        let idx = self.sub_steps.len();
        self.sub_steps.push(md);
        &mut self.sub_steps[idx]
    }

    /// Record the context argument and update slot bound by a parameter list
    pub fn bind_params(&mut self, params: &[Param], scanner: &dyn SourceScanner) {
        if self.kind.has_context_arg() {
            if let Some((kind, name)) = scanner.find_context_arg(params) {
                if kind == self.kind {
                    self.context_arg = Some(name);
                }
            }
        }

        let bound: usize = params.iter().map(|p| p.names.len().max(1)).sum();
        self.has_update_slot = self.kind.has_state_update() && bound >= 2;
    }

    /// Append a transition, dropping it when it carries no information.
    /// Returns whether the transition was kept.
    pub fn add_transition(&mut self, transition: MethodTransition) -> bool {
        if transition.is_meaningless() {
            return false;
        }
        self.transitions.push(transition);
        true
    }

    /// Append the implicit self-repeat emitted before a jump target is resolved
    pub fn add_repeat_marker(&mut self, mut transition: MethodTransition) {
        transition.target = TransitionTarget::Stay;
        self.transitions.push(transition);
    }

    pub fn add_adapter(&mut self, adapter: &str) {
        if !adapter.is_empty() {
            self.adapters.insert(adapter.to_string());
        }
    }

    pub fn add_adapter_call(&mut self, kind: &str, call: &str, adapter: &str) {
        self.add_adapter(adapter);
        self.adapter_calls.push(AdapterCall {
            kind: kind.to_string(),
            call: call.to_string(),
            adapter: adapter.to_string(),
        });
    }

    pub fn add_migration(&mut self, migration: Option<String>) {
        if let Some(m) = migration.filter(|m| !m.is_empty()) {
            self.migration = Some(m);
        }
    }

    /// Depth-first search of this step and its sub-steps
    pub fn find(&self, name: &str) -> Option<&MethodDecl> {
        if self.name == name {
            return Some(self);
        }
        self.sub_steps.iter().find_map(|s| s.find(name))
    }

    /// Number of steps in this subtree, including this one
    pub fn step_count(&self) -> usize {
        1 + self.sub_steps.iter().map(|s| s.step_count()).sum::<usize>()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len() + self.sub_steps.iter().map(|s| s.transition_count()).sum::<usize>()
    }
}

/// All steps found in one input file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateMachineGraph {
    pub path: PathBuf,
    pub content_hash: String,
    /// Top-level steps keyed by `StateMachine.step`, in discovery order
    pub methods: IndexMap<String, MethodDecl>,
}

impl StateMachineGraph {
    pub fn new(path: PathBuf, content_hash: String) -> Self {
        Self { path, content_hash, methods: IndexMap::new() }
    }

    /// Register a top-level step. A later declaration with the same identity
    /// replaces the earlier one in place.
    pub fn add_method(&mut self, md: MethodDecl) {
        self.methods.insert(md.qualified_name(), md);
    }

    /// Look up a step by name in any state machine of the file, descending into sub-steps
    pub fn find(&self, name: &str) -> Option<&MethodDecl> {
        self.methods.values().find_map(|md| md.find(name))
    }

    pub fn state_machines(&self) -> BTreeSet<&str> {
        self.methods.values().map(|md| md.state_machine.as_str()).collect()
    }

    pub fn step_count(&self) -> usize {
        self.methods.values().map(|md| md.step_count()).sum()
    }

    pub fn transition_count(&self) -> usize {
        self.methods.values().map(|md| md.transition_count()).sum()
    }
}
