//! Data model of the *scxc* statechart compiler:
//! the element tree it consumes, the attribute schema of the vocabulary,
//! the state registry and its auxiliary maps,
//! diagnostics, and the nested machine configuration it produces.

#![forbid(unsafe_code)]

pub mod diagnostic;
pub mod element;
pub mod machine;
pub mod model;
pub mod vocabulary;

pub use diagnostic::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use element::{Attributes, Children, Element, ElementError, Position};
pub use machine::{ActionConfig, MachineConfig, NodeType, OneOrMany, StateConfig, TransitionConfig};
pub use model::{
    Action, DataItem, HistoryKind, HistoryRecord, ParallelRegion, Registry, StateKind, StateNode,
    Transition, TransitionType,
};
