//! Builder of the state [`Registry`] out of an element tree.
//!
//! The tree is walked once, depth-first and in pre-order:
//! every `state`, `parallel`, `final` and `history` element with an id is registered
//! as soon as it is visited, with the path of identified ancestors leading to it.
//!
//! Ownership is assigned after recursing into a container (post-order):
//! the container claims those of its child ids that no deeper container has claimed yet.
//! A global claimed set ensures each id is owned by at most one parent,
//! even when the same id is declared more than once.
//! Containers without an id cannot own anything,
//! so their claimable ids are handed up to the nearest identified ancestor.

use hashbrown::HashSet;
use indexmap::IndexSet;
use log::{info, trace};
use scxc_core::element::child_locator;
use scxc_core::vocabulary::*;
use scxc_core::*;

/// Builds a [`Registry`] out of an element tree.
#[derive(Debug, Default)]
pub struct HierarchyBuilder {
    registry: Registry,
    claimed: HashSet<String>,
    diagnostics: Diagnostics,
}

impl HierarchyBuilder {
    /// Walks the tree rooted at `root` and returns the registry together with the diagnostics found.
    ///
    /// Never fails: elements that cannot be registered are reported and skipped,
    /// but their subtrees are still walked.
    pub fn build(root: &Element) -> (Registry, Diagnostics) {
        info!(target: "hierarchy", "building registry of <{}>", root.name());
        let mut builder = HierarchyBuilder::default();
        builder.registry.set_name(root.attribute(ATTR_NAME).map(String::from));
        builder.registry.set_initial(split_ids(root.attribute(ATTR_INITIAL)));

        let locator = format!("/{}", root.name());
        let mut path = Vec::new();
        for (index, child) in root.children() {
            let child_locator = child_locator(&locator, child.name(), index);
            match child.name() {
                TAG_STATE | TAG_PARALLEL | TAG_FINAL | TAG_HISTORY => {
                    // Root-level states are owned by nobody.
                    builder.visit_state(child, &child_locator, &mut path);
                }
                TAG_DATAMODEL => builder.visit_datamodel(child),
                _ => {}
            }
        }

        builder.mark_initials();
        info!(
            target: "hierarchy",
            "registered {} states and {} transitions",
            builder.registry.len(),
            builder.registry.transitions().len()
        );
        (builder.registry, builder.diagnostics)
    }

    // Returns the ids the enclosing container may claim.
    fn visit_state(
        &mut self,
        element: &Element,
        locator: &str,
        path: &mut Vec<String>,
    ) -> Vec<String> {
        let tag = element.name();
        let Some(id) = element.attribute(ATTR_ID).map(String::from) else {
            self.diagnostics.emit(
                Diagnostic::error(
                    DiagnosticKind::Structural,
                    format!("<{tag}> at {locator} is missing required 'id' attribute"),
                )
                .at(element.position()),
            );
            // Walk the subtree anyway and hand its ids to the enclosing container.
            return self.visit_content(element, None, locator, path);
        };
        trace!(target: "hierarchy", "visit <{tag}> '{id}' at {locator}");

        let node = state_node(element, &id, locator, path);
        if !self.registry.register(node) {
            trace!(target: "hierarchy", "'{id}' is already registered, merging");
        }

        path.push(id.clone());
        let claimable = self.visit_content(element, Some(&id), locator, path);
        path.pop();

        for child in claimable {
            if child == id {
                continue;
            }
            self.registry.declare(&id, &child);
            if !self.claimed.contains(&child) {
                trace!(target: "hierarchy", "'{id}' claims '{child}'");
                self.registry.adopt(&id, &child);
                self.claimed.insert(child);
            }
        }
        vec![id]
    }

    fn visit_content(
        &mut self,
        element: &Element,
        id: Option<&str>,
        locator: &str,
        path: &mut Vec<String>,
    ) -> Vec<String> {
        let mut claimable = Vec::new();
        for (index, child) in element.children() {
            let child_locator = child_locator(locator, child.name(), index);
            match child.name() {
                TAG_STATE | TAG_PARALLEL | TAG_FINAL | TAG_HISTORY => {
                    claimable.extend(self.visit_state(child, &child_locator, path));
                }
                // History default transitions are structural and recorded on the node.
                TAG_TRANSITION if element.name() != TAG_HISTORY => {
                    if let Some(source) = id {
                        self.visit_transition(source, child, child_locator);
                    }
                }
                TAG_DATAMODEL => self.visit_datamodel(child),
                _ => {}
            }
        }
        claimable
    }

    fn visit_transition(&mut self, source: &str, element: &Element, locator: String) {
        let transition = Transition {
            source: source.to_string(),
            targets: split_ids(element.attribute(ATTR_TARGET)),
            event: element.attribute(ATTR_EVENT).map(String::from),
            cond: element.attribute(ATTR_COND).map(String::from),
            kind: element
                .attribute(ATTR_TYPE)
                .and_then(TransitionType::parse)
                .unwrap_or_default(),
            actions: actions(element),
            position: element.position(),
            locator,
        };
        trace!(
            target: "hierarchy",
            "transition '{}' -> {:?} on {:?}",
            transition.source,
            transition.targets,
            transition.event
        );
        self.registry.push_transition(transition);
    }

    fn visit_datamodel(&mut self, element: &Element) {
        for data in element.children_named(TAG_DATA) {
            // Data items without id are reported by the validator.
            if let Some(id) = data.attribute(ATTR_ID) {
                self.registry.push_data(DataItem {
                    id: id.to_string(),
                    expr: data.attribute(ATTR_EXPR).map(String::from),
                    src: data.attribute(ATTR_SRC).map(String::from),
                    text: data.text().map(String::from),
                    position: data.position(),
                });
            }
        }
    }

    fn mark_initials(&mut self) {
        let mut initials: Vec<String> = self
            .registry
            .initial()
            .iter()
            .filter(|id| self.registry.contains(id) && self.registry.parent_of(id).is_none())
            .cloned()
            .collect();
        for node in self.registry.states() {
            initials.extend(
                node.initial
                    .iter()
                    .filter(|id| self.registry.parent_of(id) == Some(node.id.as_str()))
                    .cloned(),
            );
        }
        for id in initials {
            self.registry.mark_initial_of_parent(&id);
        }
    }
}

fn state_node(element: &Element, id: &str, locator: &str, path: &[String]) -> StateNode {
    let tag = element.name();
    let kind = match tag {
        TAG_PARALLEL => StateKind::Parallel,
        TAG_FINAL => StateKind::Final,
        TAG_HISTORY => StateKind::History,
        _ if [TAG_STATE, TAG_PARALLEL, TAG_FINAL]
            .iter()
            .any(|child| element.children_named(child).next().is_some()) =>
        {
            StateKind::Compound
        }
        _ => StateKind::Simple,
    };
    let history = (kind == StateKind::History).then(|| {
        element
            .attribute(ATTR_TYPE)
            .and_then(HistoryKind::parse)
            .unwrap_or(HistoryKind::Shallow)
    });
    let initial = if element.has_attribute(ATTR_INITIAL) {
        split_ids(element.attribute(ATTR_INITIAL))
    } else {
        element
            .children_named(TAG_INITIAL)
            .flat_map(|initial| initial.children_named(TAG_TRANSITION))
            .flat_map(|transition| split_ids(transition.attribute(ATTR_TARGET)))
            .collect()
    };
    let default_target = if kind == StateKind::History {
        element
            .children_named(TAG_TRANSITION)
            .flat_map(|transition| split_ids(transition.attribute(ATTR_TARGET)))
            .collect()
    } else {
        Vec::new()
    };
    StateNode {
        id: id.to_string(),
        kind,
        history,
        parent_path: path.to_vec(),
        depth: path.len(),
        children: IndexSet::new(),
        declared_children: IndexSet::new(),
        entry: element.children_named(TAG_ONENTRY).flat_map(actions).collect(),
        exit: element.children_named(TAG_ONEXIT).flat_map(actions).collect(),
        is_initial_of_parent: false,
        initial,
        default_target,
        position: element.position(),
        locator: locator.to_string(),
    }
}

/// Splits a space-separated list of ids.
pub(crate) fn split_ids(value: Option<&str>) -> Vec<String> {
    value
        .map(|value| value.split_whitespace().map(String::from).collect())
        .unwrap_or_default()
}

/// Collects the executable content of an element as action descriptors.
fn actions(element: &Element) -> Vec<Action> {
    element
        .children()
        .map(|(_, child)| Action {
            kind: child.name().to_string(),
            attributes: child
                .attribute_names()
                .into_iter()
                .filter_map(|name| {
                    child
                        .attribute(name)
                        .map(|value| (name.to_string(), value.to_string()))
                })
                .collect(),
            text: child.text().map(String::from),
            children: actions(child),
        })
        .collect()
}
