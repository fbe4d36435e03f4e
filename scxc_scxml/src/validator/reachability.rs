use super::{Check, Context};
use hashbrown::HashSet;
use log::trace;
use scxc_core::*;
use std::collections::VecDeque;

/// States that can never be entered.
///
/// The reachable set is seeded with the initial states of the document
/// (or its first state, if it declares none) and with the declared initial states of every state,
/// then grown to a fixpoint:
/// entering a parallel state enters all its regions,
/// entering a history state enters its default target,
/// and a transition can fire once its source, or one of the source's descendants, has been entered.
#[derive(Debug, Clone, Copy)]
pub struct Reachability;

impl Check for Reachability {
    fn name(&self) -> &'static str {
        "reachability"
    }

    fn check(&self, cx: &Context<'_>, diagnostics: &mut Diagnostics) {
        let registry = cx.registry;
        let reachable = reachable(registry);
        for node in registry.states().filter(|node| !reachable.contains(node.id.as_str())) {
            diagnostics.emit(
                Diagnostic::warning(
                    DiagnosticKind::Structural,
                    format!("state '{}' is unreachable", node.id),
                )
                .at(node.position),
            );
        }
    }
}

/// Ids of the states that can be entered.
pub(crate) fn reachable(registry: &Registry) -> HashSet<&str> {
    let mut seeds: Vec<&str> = registry.initial().iter().map(String::as_str).collect();
    if seeds.is_empty() {
        seeds.extend(registry.root_states().next().map(|node| node.id.as_str()));
    }
    seeds.extend(
        registry
            .states()
            .flat_map(|node| node.initial.iter().map(String::as_str)),
    );

    let mut reachable = HashSet::new();
    // States with an entered descendant, or entered themselves.
    let mut active = HashSet::new();
    let mut queue: VecDeque<&str> = seeds.into_iter().collect();
    let mut fired = vec![false; registry.transitions().len()];
    loop {
        while let Some(id) = queue.pop_front() {
            let Some(node) = registry.get(id) else {
                continue;
            };
            if !reachable.insert(node.id.as_str()) {
                continue;
            }
            trace!(target: "validator", "'{id}' is reachable");
            active.insert(node.id.as_str());
            active.extend(node.parent_path.iter().map(String::as_str));
            match node.kind {
                StateKind::Parallel => queue.extend(
                    node.children
                        .iter()
                        .filter(|child| {
                            registry
                                .get(child)
                                .is_some_and(|child| child.kind != StateKind::History)
                        })
                        .map(String::as_str),
                ),
                StateKind::History => {
                    queue.extend(node.default_target.iter().map(String::as_str))
                }
                _ => {}
            }
        }

        for (transition, fired) in registry.transitions().iter().zip(fired.iter_mut()) {
            if !*fired && active.contains(transition.source.as_str()) {
                *fired = true;
                queue.extend(transition.targets.iter().map(String::as_str));
            }
        }
        if queue.is_empty() {
            break reachable;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::HierarchyBuilder;
    use crate::options::Options;

    fn state(id: &str) -> Element {
        Element::new("state").with_attribute("id", id)
    }

    fn transition(event: &str, target: &str) -> Element {
        Element::new("transition")
            .with_attribute("event", event)
            .with_attribute("target", target)
    }

    fn run(root: &Element) -> Vec<Diagnostic> {
        let (registry, _) = HierarchyBuilder::build(root);
        let options = Options::default();
        let mut diagnostics = Diagnostics::new();
        Reachability.check(
            &Context {
                root,
                registry: &registry,
                options: &options,
            },
            &mut diagnostics,
        );
        diagnostics.finish()
    }

    #[test]
    fn unreferenced_state() {
        let root = Element::new("scxml")
            .with_attribute("initial", "a")
            .with_child(state("a").with_child(transition("go", "b")))
            .with_child(state("b"))
            .with_child(state("orphan"));
        let diagnostics = run(&root);
        assert_eq!(diagnostics.len(), 1);
        assert!(!diagnostics[0].is_error());
        assert_eq!(diagnostics[0].message(), "state 'orphan' is unreachable");
    }

    #[test]
    fn transitions_of_ancestors_fire() {
        // 'p' is only entered through its initial child 'p1',
        // but its transition still fires.
        let root = Element::new("scxml")
            .with_attribute("initial", "p1")
            .with_child(
                state("p")
                    .with_attribute("initial", "p1")
                    .with_child(state("p1"))
                    .with_child(transition("out", "q")),
            )
            .with_child(state("q"));
        let (registry, _) = HierarchyBuilder::build(&root);
        let reachable = reachable(&registry);
        assert!(reachable.contains("q"));
        assert!(!reachable.contains("p"));
    }

    #[test]
    fn regions_and_history_defaults() {
        let root = Element::new("scxml")
            .with_child(
                Element::new("parallel")
                    .with_attribute("id", "p")
                    .with_child(state("r1"))
                    .with_child(state("r2").with_child(transition("back", "h"))),
            )
            .with_child(
                state("s")
                    .with_attribute("initial", "s1")
                    .with_child(
                        Element::new("history")
                            .with_attribute("id", "h")
                            .with_child(Element::new("transition").with_attribute("target", "s2")),
                    )
                    .with_child(state("s1"))
                    .with_child(state("s2")),
            );
        let diagnostics = run(&root);
        // 's' itself is never targeted.
        let messages: Vec<_> = diagnostics.iter().map(Diagnostic::message).collect();
        assert_eq!(messages, ["state 's' is unreachable"]);
    }
}
