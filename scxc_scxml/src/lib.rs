//! The statechart pipeline:
//! hierarchy registry builder, parallel/history analyzer, transition resolver,
//! semantic validator and config synthesizer.
//!
//! Each stage is a pure function of its inputs.
//! Diagnostics are returned as values, never raised,
//! and every stage produces a result for every input.

#![forbid(unsafe_code)]

mod analyzer;
pub mod events;
mod hierarchy;
mod options;
mod resolver;
pub mod synthesizer;
pub mod validator;

pub use analyzer::Analysis;
pub use hierarchy::HierarchyBuilder;
pub use options::{Options, TransitionPolicy};
pub use resolver::{Resolver, Scope};
pub use scxc_core;
pub use synthesizer::{DispatchPlan, SynthesisError, Synthesizer};
pub use validator::Validator;
