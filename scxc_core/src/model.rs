//! The flat state registry and the auxiliary maps built alongside it.
//!
//! The [`Registry`] is the single source of truth for the hierarchy:
//! every `state`, `parallel`, `final` and `history` element with an id becomes a [`StateNode`],
//! keyed by id, in document pre-order.
//! Each node records its ancestor path and its owned children,
//! where ownership is resolved exactly once per node
//! (a node never appears in two parents' children).
//!
//! [`ParallelRegion`]s and [`HistoryRecord`]s are derived from the registry
//! and never alter it.

use crate::element::Position;
use crate::vocabulary::*;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use smallvec::SmallVec;

/// The kind of a registered state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StateKind {
    /// A `state` without child states.
    Simple,
    /// A `state` with child states.
    Compound,
    /// A `parallel` state, whose children are concurrently active regions.
    Parallel,
    /// A `final` state.
    Final,
    /// A `history` pseudo-state.
    History,
}

/// Subtype of a history pseudo-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryKind {
    /// Remembers the immediate active child of the parent.
    Shallow,
    /// Remembers the full active descendant configuration of the parent.
    Deep,
}

impl HistoryKind {
    /// Parses the value of the `type` attribute.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            HISTORY_SHALLOW => Some(HistoryKind::Shallow),
            HISTORY_DEEP => Some(HistoryKind::Deep),
            _ => None,
        }
    }

    /// The attribute value naming this subtype.
    pub fn as_str(self) -> &'static str {
        match self {
            HistoryKind::Shallow => HISTORY_SHALLOW,
            HistoryKind::Deep => HISTORY_DEEP,
        }
    }
}

/// The `type` of a transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionType {
    /// Does not exit the source state.
    Internal,
    /// Exits and re-enters the source state.
    #[default]
    External,
}

impl TransitionType {
    /// Parses the value of the `type` attribute.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            TRANSITION_INTERNAL => Some(TransitionType::Internal),
            TRANSITION_EXTERNAL => Some(TransitionType::External),
            _ => None,
        }
    }
}

/// An opaque action descriptor, mirroring a piece of executable content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    /// Tag of the executable content, e.g. `raise` or `send`.
    pub kind: String,
    /// Attributes, under their canonical names.
    pub attributes: IndexMap<String, String>,
    /// Character data, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Nested content (branches of `if`, body of `foreach`, params of `send`, ...).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Action>,
}

/// A transition, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    /// Id of the state declaring the transition.
    pub source: String,
    /// Target ids, possibly empty for targetless transitions.
    pub targets: Vec<String>,
    /// Event descriptors, as written.
    pub event: Option<String>,
    /// Guard expression, passed through untouched.
    pub cond: Option<String>,
    /// Internal or external.
    pub kind: TransitionType,
    /// Executable content, in order.
    pub actions: Vec<Action>,
    #[serde(skip)]
    pub position: Option<Position>,
    /// Locator of the `transition` element.
    pub locator: String,
}

impl Transition {
    /// Individual event descriptors (space-separated in the document).
    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.event.iter().flat_map(|event| event.split_whitespace())
    }

    /// Whether the transition is eventless.
    pub fn is_eventless(&self) -> bool {
        self.events().next().is_none()
    }
}

/// A data model item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataItem {
    pub id: String,
    pub expr: Option<String>,
    pub src: Option<String>,
    pub text: Option<String>,
    #[serde(skip)]
    pub position: Option<Position>,
}

/// A registered state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateNode {
    pub id: String,
    pub kind: StateKind,
    /// Declared subtype, only for history pseudo-states.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<HistoryKind>,
    /// Ids of the ancestors, outermost first; empty for root-level states.
    pub parent_path: Vec<String>,
    /// Length of the parent path.
    pub depth: usize,
    /// Owned children, in order; only containers own children.
    pub children: IndexSet<String>,
    /// Child ids as declared, before ownership is resolved.
    pub declared_children: IndexSet<String>,
    pub entry: Vec<Action>,
    pub exit: Vec<Action>,
    /// Whether the parent (or the document, for root-level states) declares this state as initial.
    pub is_initial_of_parent: bool,
    /// Declared initial ids, from the `initial` attribute or the `initial` element.
    pub initial: Vec<String>,
    /// Default target of a history pseudo-state.
    pub default_target: Vec<String>,
    #[serde(skip)]
    pub position: Option<Position>,
    /// Locator of the element that registered this state.
    pub locator: String,
}

impl StateNode {
    /// The ancestor chain ending with the state itself, outermost first.
    pub fn chain(&self) -> SmallVec<[&str; 8]> {
        self.parent_path
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.id.as_str()))
            .collect()
    }

    /// The immediate parent, if any.
    pub fn parent(&self) -> Option<&str> {
        self.parent_path.last().map(String::as_str)
    }
}

/// A concurrently active child of a parallel state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParallelRegion {
    pub region_id: String,
    pub parent_parallel_id: String,
    /// The other regions of the same parallel state.
    pub sibling_regions: Vec<String>,
    /// Number of parallel states enclosing the region, its own parallel included.
    pub nesting_level: usize,
}

/// Coverage of a history pseudo-state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryRecord {
    pub history_id: String,
    /// Subtype after resolution (a shallow history may be promoted to deep).
    pub subtype: HistoryKind,
    /// Subtype as declared.
    pub declared_subtype: HistoryKind,
    /// The parent whose configuration is remembered.
    pub parent: Option<String>,
    /// States covered after overlap resolution.
    pub covered_states: IndexSet<String>,
    pub default_target: Vec<String>,
    /// Only ever set by an execution runtime.
    pub has_stored_configuration: bool,
    pub nesting_level: usize,
}

/// The flat registry of states, transitions and data model items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Registry {
    name: Option<String>,
    initial: Vec<String>,
    states: IndexMap<String, StateNode>,
    parent_of: IndexMap<String, Option<String>>,
    transitions: Vec<Transition>,
    data: Vec<DataItem>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a state, unless one with the same id is already registered.
    ///
    /// Returns whether the state has been registered.
    pub fn register(&mut self, node: StateNode) -> bool {
        if self.states.contains_key(&node.id) {
            false
        } else {
            self.parent_of.insert(node.id.clone(), None);
            self.states.insert(node.id.clone(), node);
            true
        }
    }

    /// Records `child` as declared by `parent`, whether or not `parent` ends up owning it.
    pub fn declare(&mut self, parent: &str, child: &str) {
        if let Some(node) = self.states.get_mut(parent) {
            node.declared_children.insert(child.to_string());
        }
    }

    /// Records `child` as owned by `parent`.
    ///
    /// If `child` was first declared elsewhere,
    /// it is moved below `parent` together with its registered descendants.
    pub fn adopt(&mut self, parent: &str, child: &str) {
        if let Some(owner) = self.parent_of.get_mut(child) {
            *owner = Some(parent.to_string());
        }
        let Some(node) = self.states.get_mut(parent) else {
            return;
        };
        node.children.insert(child.to_string());
        let mut path = node.parent_path.clone();
        path.push(parent.to_string());
        self.relocate(child, path);
    }

    // A move that would nest a state inside itself is left to the cycle checks.
    fn relocate(&mut self, id: &str, path: Vec<String>) {
        if path.iter().any(|ancestor| ancestor == id) {
            return;
        }
        let Some(node) = self.states.get_mut(id) else {
            return;
        };
        if node.parent_path == path {
            return;
        }
        node.depth = path.len();
        let mut from = std::mem::replace(&mut node.parent_path, path.clone());
        from.push(id.to_string());
        let mut to = path;
        to.push(id.to_string());
        for node in self.states.values_mut() {
            if node.parent_path.starts_with(&from) {
                let rest = node.parent_path.split_off(from.len());
                node.parent_path = to.iter().cloned().chain(rest).collect();
                node.depth = node.parent_path.len();
            }
        }
    }

    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    pub fn set_initial(&mut self, initial: Vec<String>) {
        self.initial = initial;
    }

    pub fn push_transition(&mut self, transition: Transition) {
        self.transitions.push(transition);
    }

    pub fn push_data(&mut self, data: DataItem) {
        self.data.push(data);
    }

    /// Marks a registered state as the declared initial state of its parent.
    pub fn mark_initial_of_parent(&mut self, id: &str) {
        if let Some(node) = self.states.get_mut(id) {
            node.is_initial_of_parent = true;
        }
    }

    /// The `name` attribute of the document.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The initial ids declared by the document.
    pub fn initial(&self) -> &[String] {
        &self.initial
    }

    pub fn get(&self, id: &str) -> Option<&StateNode> {
        self.states.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.states.contains_key(id)
    }

    /// Registered states, in document pre-order.
    pub fn states(&self) -> impl Iterator<Item = &StateNode> {
        self.states.values()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// The owning parent of a registered state, `None` for root-level states.
    pub fn parent_of(&self, id: &str) -> Option<&str> {
        self.parent_of.get(id).and_then(Option::as_deref)
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn data(&self) -> &[DataItem] {
        &self.data
    }

    /// States without ancestors, in document order.
    pub fn root_states(&self) -> impl Iterator<Item = &StateNode> {
        self.states.values().filter(|node| node.depth == 0)
    }

    /// Non-history states whose parent path is exactly `path`.
    pub fn immediate_child_states(&self, path: &[String]) -> IndexSet<String> {
        self.states
            .values()
            .filter(|node| node.kind != StateKind::History && node.parent_path == path)
            .map(|node| node.id.clone())
            .collect()
    }

    /// Non-history states whose parent path starts with `path`.
    pub fn descendant_states(&self, path: &[String]) -> IndexSet<String> {
        self.states
            .values()
            .filter(|node| node.kind != StateKind::History && node.parent_path.starts_with(path))
            .map(|node| node.id.clone())
            .collect()
    }

    /// Ancestors of the given state, closest first.
    pub fn ancestors<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a str> + use<'a> {
        self.states
            .get(id)
            .into_iter()
            .flat_map(|node| node.parent_path.iter().rev().map(String::as_str))
    }

    /// Whether `id` is a proper descendant of `ancestor`.
    pub fn is_descendant(&self, id: &str, ancestor: &str) -> bool {
        self.states
            .get(id)
            .is_some_and(|node| node.parent_path.iter().any(|a| a == ancestor))
    }

    /// Transitions declared by the given state, in document order.
    pub fn transitions_from<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Transition> {
        self.transitions.iter().filter(move |t| t.source == id)
    }
}
