//! Scope computation for transitions.
//!
//! The scope of a transition from a source to a target is given by their least common ancestor (LCA):
//! the states to exit are the ancestors of the source strictly below the LCA (innermost first),
//! and the states to enter are the ancestors of the target strictly below the LCA (outermost first).
//!
//! Whether a cross-hierarchy transition (one whose endpoints have different parents) is accepted
//! depends on the [`TransitionPolicy`].
//! Regardless of the policy, the scope must be legal:
//! it cannot exit a parallel state with a region in the middle of an internal transition
//! on the same event, and it cannot enter a history state that has nothing to restore.

use crate::events;
use crate::options::TransitionPolicy;
use indexmap::IndexMap;
use log::{debug, info};
use scxc_core::*;
use serde::Serialize;

/// The scope of a transition towards one of its targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scope {
    pub source: String,
    pub target: String,
    /// Whether source and target have different parents.
    pub is_cross_hierarchy: bool,
    /// The least common ancestor, if any.
    pub common_ancestor: Option<String>,
    /// States exited, innermost first.
    pub exit_states: Vec<String>,
    /// States entered, outermost first.
    pub enter_states: Vec<String>,
}

/// Resolves transitions against a registry.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    registry: &'a Registry,
    histories: &'a IndexMap<String, HistoryRecord>,
    policy: TransitionPolicy,
}

impl<'a> Resolver<'a> {
    pub fn new(
        registry: &'a Registry,
        histories: &'a IndexMap<String, HistoryRecord>,
        policy: TransitionPolicy,
    ) -> Self {
        Self {
            registry,
            histories,
            policy,
        }
    }

    /// Resolves every transition of the registry.
    pub fn resolve_all(&self) -> (Vec<Scope>, Diagnostics) {
        info!(
            target: "resolver",
            "resolving {} transitions ({:?})",
            self.registry.transitions().len(),
            self.policy
        );
        let mut diagnostics = Diagnostics::new();
        let scopes: Vec<Scope> = self
            .registry
            .transitions()
            .iter()
            .flat_map(|transition| self.resolve(transition, &mut diagnostics))
            .collect();
        let crossing = scopes.iter().filter(|scope| scope.is_cross_hierarchy).count();
        info!(target: "resolver", "{} scopes, {crossing} cross-hierarchy", scopes.len());
        (scopes, diagnostics)
    }

    /// Resolves a transition, one scope per registered target.
    ///
    /// Targets that are not registered are skipped:
    /// dangling references are reported by the validator.
    pub fn resolve(&self, transition: &Transition, diagnostics: &mut Diagnostics) -> Vec<Scope> {
        let mut scopes = Vec::new();
        for target in &transition.targets {
            let Some(scope) = self.scope(transition, target) else {
                continue;
            };
            debug!(
                target: "resolver",
                "{} -> {}: lca {:?}, exit {:?}, enter {:?}",
                scope.source,
                scope.target,
                scope.common_ancestor,
                scope.exit_states,
                scope.enter_states
            );
            if scope.is_cross_hierarchy && self.policy == TransitionPolicy::SameParentOnly {
                diagnostics.emit(
                    Diagnostic::error(
                        DiagnosticKind::HierarchyPolicy,
                        format!(
                            "transition {} from '{}' to '{}' crosses hierarchy boundaries (common ancestor {}, exits [{}], enters [{}]); source and target must share the same parent",
                            transition.locator,
                            scope.source,
                            scope.target,
                            scope.common_ancestor.as_deref().unwrap_or("<document>"),
                            scope.exit_states.join(", "),
                            scope.enter_states.join(", "),
                        ),
                    )
                    .at(transition.position),
                );
            }
            self.check_parallel_exits(transition, &scope, diagnostics);
            self.check_history_entry(transition, &scope, diagnostics);
            scopes.push(scope);
        }
        scopes
    }

    /// Computes the scope of a transition towards the given target.
    pub fn scope(&self, transition: &Transition, target: &str) -> Option<Scope> {
        let source = self.registry.get(&transition.source)?;
        let target = self.registry.get(target)?;
        let source_chain = source.chain();
        let target_chain = target.chain();

        let mut shared = source_chain
            .iter()
            .zip(target_chain.iter())
            .take_while(|(a, b)| a == b)
            .count();
        let nested = shared == source_chain.len().min(target_chain.len());
        let keeps_source =
            transition.kind == TransitionType::Internal && shared == source_chain.len();
        // An external transition between a state and itself or one of its descendants
        // exits and re-enters that state.
        if nested && !keeps_source {
            shared -= 1;
        }
        let common_ancestor = shared.checked_sub(1).map(|idx| source_chain[idx].to_string());

        Some(Scope {
            source: source.id.clone(),
            target: target.id.clone(),
            is_cross_hierarchy: self.registry.parent_of(&source.id)
                != self.registry.parent_of(&target.id),
            common_ancestor,
            exit_states: source_chain[shared..]
                .iter()
                .rev()
                .map(|id| id.to_string())
                .collect(),
            enter_states: target_chain[shared..]
                .iter()
                .map(|id| id.to_string())
                .collect(),
        })
    }

    // A region of an exited parallel state declaring an internal transition
    // on an overlapping event is considered to have that transition in flight.
    fn check_parallel_exits(
        &self,
        transition: &Transition,
        scope: &Scope,
        diagnostics: &mut Diagnostics,
    ) {
        for parallel in scope.exit_states.iter().filter(|id| {
            self.registry
                .get(id)
                .is_some_and(|node| node.kind == StateKind::Parallel)
        }) {
            let in_flight = self.registry.transitions().iter().find(|other| {
                !std::ptr::eq(*other, transition)
                    && other.kind == TransitionType::Internal
                    && self.registry.is_descendant(&other.source, parallel)
                    && events_overlap(transition, other)
            });
            if let Some(other) = in_flight {
                let region = self
                    .registry
                    .get(&other.source)
                    .and_then(|node| {
                        node.chain()
                            .iter()
                            .skip_while(|id| **id != parallel.as_str())
                            .nth(1)
                            .map(|id| id.to_string())
                    })
                    .unwrap_or_else(|| other.source.clone());
                diagnostics.emit(
                    Diagnostic::error(
                        DiagnosticKind::HierarchyPolicy,
                        format!(
                            "transition {} exits parallel state '{parallel}' while region '{region}' may be taking internal transition {}",
                            transition.locator, other.locator
                        ),
                    )
                    .at(transition.position),
                );
            }
        }
    }

    fn check_history_entry(
        &self,
        transition: &Transition,
        scope: &Scope,
        diagnostics: &mut Diagnostics,
    ) {
        let Some(history) = self.histories.get(&scope.target) else {
            return;
        };
        if !history.has_stored_configuration && history.default_target.is_empty() {
            diagnostics.emit(
                Diagnostic::error(
                    DiagnosticKind::HierarchyPolicy,
                    format!(
                        "transition {} enters history state '{}', which has neither a stored configuration nor a default target",
                        transition.locator, history.history_id
                    ),
                )
                .at(transition.position),
            );
        }
    }
}

fn events_overlap(a: &Transition, b: &Transition) -> bool {
    a.is_eventless()
        || b.is_eventless()
        || a.events().any(|x| b.events().any(|y| events::overlap(x, y)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analysis;
    use crate::hierarchy::HierarchyBuilder;

    fn state(id: &str) -> Element {
        Element::new("state").with_attribute("id", id)
    }

    fn transition(event: &str, target: &str) -> Element {
        Element::new("transition")
            .with_attribute("event", event)
            .with_attribute("target", target)
    }

    // Root > A > {A1, A2}, Root > B
    fn three_levels() -> Element {
        Element::new("scxml").with_attribute("initial", "Root").with_child(
            state("Root")
                .with_attribute("initial", "A")
                .with_child(
                    state("A")
                        .with_attribute("initial", "A1")
                        .with_child(state("A1").with_child(transition("go", "B")))
                        .with_child(state("A2").with_child(transition("next", "A1"))),
                )
                .with_child(state("B")),
        )
    }

    fn resolve(root: &Element, policy: TransitionPolicy) -> (Vec<Scope>, Vec<Diagnostic>) {
        let (registry, _) = HierarchyBuilder::build(root);
        let (analysis, _) = Analysis::analyze(&registry);
        let (scopes, diagnostics) =
            Resolver::new(&registry, &analysis.histories, policy).resolve_all();
        (scopes, diagnostics.finish())
    }

    #[test]
    fn least_common_ancestor() {
        let (scopes, _) = resolve(&three_levels(), TransitionPolicy::LcaScoped);
        let scope = &scopes[0];
        assert_eq!(scope.source, "A1");
        assert_eq!(scope.target, "B");
        assert!(scope.is_cross_hierarchy);
        assert_eq!(scope.common_ancestor.as_deref(), Some("Root"));
        assert_eq!(scope.exit_states, ["A1", "A"]);
        assert_eq!(scope.enter_states, ["B"]);
    }

    #[test]
    fn siblings() {
        let (scopes, diagnostics) = resolve(&three_levels(), TransitionPolicy::SameParentOnly);
        let scope = &scopes[1];
        assert!(!scope.is_cross_hierarchy);
        assert_eq!(scope.common_ancestor.as_deref(), Some("A"));
        assert_eq!(scope.exit_states, ["A2"]);
        assert_eq!(scope.enter_states, ["A1"]);
        // Only 'A1 -> B' violates the policy.
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message().contains("exits [A1, A]"));
    }

    #[test]
    fn self_transitions() {
        let root = Element::new("scxml").with_child(
            state("s")
                .with_child(transition("again", "s"))
                .with_child(
                    Element::new("transition")
                        .with_attribute("event", "stay")
                        .with_attribute("target", "s")
                        .with_attribute("type", "internal"),
                ),
        );
        let (scopes, diagnostics) = resolve(&root, TransitionPolicy::SameParentOnly);
        assert!(diagnostics.is_empty());
        assert_eq!(scopes[0].common_ancestor, None);
        assert_eq!(scopes[0].exit_states, ["s"]);
        assert_eq!(scopes[0].enter_states, ["s"]);
        assert_eq!(scopes[1].common_ancestor.as_deref(), Some("s"));
        assert!(scopes[1].exit_states.is_empty());
    }

    #[test]
    fn parallel_exit_with_internal_transition_in_flight() {
        let root = Element::new("scxml").with_attribute("initial", "p").with_child(
            Element::new("parallel")
                .with_attribute("id", "p")
                .with_child(state("r1").with_child(transition("abort", "done")))
                .with_child(
                    state("r2").with_child(
                        Element::new("transition")
                            .with_attribute("event", "abort.now")
                            .with_attribute("target", "r2")
                            .with_attribute("type", "internal"),
                    ),
                ),
        )
        .with_child(Element::new("final").with_attribute("id", "done"));
        let (_, diagnostics) = resolve(&root, TransitionPolicy::LcaScoped);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message().contains("exits parallel state 'p'"));
        assert!(diagnostics[0].message().contains("region 'r2'"));
    }

    #[test]
    fn empty_history_entry() {
        let root = Element::new("scxml").with_child(
            state("s")
                .with_attribute("initial", "a")
                .with_child(Element::new("history").with_attribute("id", "h"))
                .with_child(state("a").with_child(transition("back", "h"))),
        );
        let (_, diagnostics) = resolve(&root, TransitionPolicy::SameParentOnly);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message().contains("enters history state 'h'"));
    }
}
