//! smtrace: recovers state machine step graphs from fluent step-builder code.

pub mod config;
pub mod core;
pub mod error;

pub use crate::core::Engine;
pub use crate::error::{Result, SmtraceError};
