use hashbrown::HashSet;
use indexmap::{IndexMap, IndexSet};
use log::{trace, warn};
use scxc_core::*;

fn coverage(registry: &Registry, parent_path: &[String], subtype: HistoryKind) -> IndexSet<String> {
    match subtype {
        HistoryKind::Shallow => registry.immediate_child_states(parent_path),
        HistoryKind::Deep => registry.descendant_states(parent_path),
    }
}

pub(super) fn histories(
    registry: &Registry,
    diagnostics: &mut Diagnostics,
) -> IndexMap<String, HistoryRecord> {
    let mut histories = IndexMap::new();
    // History ids grouped by the scope they remember.
    let mut scopes: IndexMap<&[String], Vec<String>> = IndexMap::new();

    for node in registry.states().filter(|node| node.kind == StateKind::History) {
        let Some(parent) = node.parent() else {
            diagnostics.emit(
                Diagnostic::error(
                    DiagnosticKind::Structural,
                    format!("history state '{}' has no parent state to remember", node.id),
                )
                .at(node.position),
            );
            continue;
        };
        let subtype = node.history.unwrap_or(HistoryKind::Shallow);
        let covered_states = coverage(registry, &node.parent_path, subtype);
        trace!(
            target: "analyzer",
            "{} history '{}' covers {} states",
            subtype.as_str(),
            node.id,
            covered_states.len()
        );
        histories.insert(
            node.id.clone(),
            HistoryRecord {
                history_id: node.id.clone(),
                subtype,
                declared_subtype: subtype,
                parent: Some(parent.to_string()),
                covered_states,
                default_target: node.default_target.clone(),
                has_stored_configuration: false,
                nesting_level: node.depth,
            },
        );
        scopes
            .entry(node.parent_path.as_slice())
            .or_default()
            .push(node.id.clone());
    }

    for (scope, siblings) in scopes.iter().filter(|(_, siblings)| siblings.len() > 1) {
        resolve_siblings(registry, scope, siblings, &mut histories, diagnostics);
    }
    check_default_cycles(registry, diagnostics);
    histories
}

fn resolve_siblings(
    registry: &Registry,
    scope: &[String],
    siblings: &[String],
    histories: &mut IndexMap<String, HistoryRecord>,
    diagnostics: &mut Diagnostics,
) {
    let parent = scope.last().map(String::as_str).unwrap_or_default();
    let deep = siblings
        .iter()
        .find(|id| histories.get(*id).is_some_and(|h| h.subtype == HistoryKind::Deep))
        .cloned();
    if let Some(deep) = deep {
        for id in siblings {
            let Some(record) = histories.get_mut(id) else {
                continue;
            };
            if record.subtype == HistoryKind::Shallow {
                record.subtype = HistoryKind::Deep;
                record.covered_states = coverage(registry, scope, HistoryKind::Deep);
                let position = registry.get(id).and_then(|node| node.position);
                diagnostics.emit(
                    Diagnostic::warning(
                        DiagnosticKind::Structural,
                        format!(
                            "shallow history '{id}' is promoted to deep, as deep history '{deep}' remembers the same state '{parent}'"
                        ),
                    )
                    .at(position),
                );
            }
        }
    }

    // Deeper histories take precedence, then smaller ids.
    let mut ranked: Vec<(usize, &str)> = siblings
        .iter()
        .filter_map(|id| histories.get(id).map(|h| (h.nesting_level, id.as_str())))
        .collect();
    ranked.sort_by(|(level_a, id_a), (level_b, id_b)| level_b.cmp(level_a).then(id_a.cmp(id_b)));

    let mut covered: IndexMap<String, String> = IndexMap::new();
    for (_, id) in ranked {
        let Some(record) = histories.get_mut(id) else {
            continue;
        };
        let mut pruned = Vec::new();
        record.covered_states.retain(|state| {
            if let Some(winner) = covered.get(state) {
                pruned.push((state.clone(), winner.clone()));
                false
            } else {
                true
            }
        });
        for state in &record.covered_states {
            covered.insert(state.clone(), id.to_string());
        }
        if let Some((_, winner)) = pruned.first() {
            let position = registry.get(id).and_then(|node| node.position);
            diagnostics.emit(
                Diagnostic::warning(
                    DiagnosticKind::Structural,
                    format!(
                        "history '{id}' overlaps with history '{winner}'; {} shared states are remembered by '{winner}' only",
                        pruned.len()
                    ),
                )
                .at(position),
            );
        }
    }
}

/// Follows default targets through history states,
/// reporting each cycle once.
fn check_default_cycles(registry: &Registry, diagnostics: &mut Diagnostics) {
    let mut done: HashSet<&str> = HashSet::new();
    let mut reported: HashSet<Vec<&str>> = HashSet::new();
    for node in registry.states().filter(|node| node.kind == StateKind::History) {
        let mut chain: IndexSet<&str> = IndexSet::new();
        follow(registry, &node.id, &mut chain, &mut done, &mut reported, diagnostics);
    }
}

fn follow<'a>(
    registry: &'a Registry,
    id: &'a str,
    chain: &mut IndexSet<&'a str>,
    done: &mut HashSet<&'a str>,
    reported: &mut HashSet<Vec<&'a str>>,
    diagnostics: &mut Diagnostics,
) {
    if done.contains(id) {
        return;
    }
    if let Some(start) = chain.get_index_of(id) {
        let cycle: Vec<&str> = chain.iter().skip(start).copied().collect();
        let mut members = cycle.clone();
        members.sort_unstable();
        if reported.insert(members) {
            let description = cycle
                .iter()
                .chain(cycle.first())
                .copied()
                .collect::<Vec<_>>()
                .join(" -> ");
            warn!(target: "analyzer", "circular history default {description}");
            let position = registry.get(id).and_then(|node| node.position);
            diagnostics.emit(
                Diagnostic::error(
                    DiagnosticKind::Topological,
                    format!("circular history default target: {description}"),
                )
                .at(position),
            );
        }
        return;
    }
    let Some(node) = registry.get(id).filter(|node| node.kind == StateKind::History) else {
        return;
    };
    chain.insert(id);
    for target in &node.default_target {
        follow(registry, target, chain, done, reported, diagnostics);
    }
    chain.pop();
    done.insert(id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::HierarchyBuilder;

    fn history(id: &str, subtype: &str, target: Option<&str>) -> Element {
        let history = Element::new("history")
            .with_attribute("id", id)
            .with_attribute("type", subtype);
        match target {
            Some(target) => {
                history.with_child(Element::new("transition").with_attribute("target", target))
            }
            None => history,
        }
    }

    fn state(id: &str) -> Element {
        Element::new("state").with_attribute("id", id)
    }

    fn build(root: &Element) -> (IndexMap<String, HistoryRecord>, Vec<Diagnostic>) {
        let (registry, _) = HierarchyBuilder::build(root);
        let mut diagnostics = Diagnostics::new();
        let histories = histories(&registry, &mut diagnostics);
        (histories, diagnostics.finish())
    }

    #[test]
    fn shallow_and_deep_coverage() {
        let root = Element::new("scxml").with_child(
            state("p")
                .with_attribute("initial", "a")
                .with_child(history("hs", "shallow", Some("a")))
                .with_child(state("a").with_attribute("initial", "a1").with_child(state("a1")))
                .with_child(state("b")),
        );
        let (histories, diagnostics) = build(&root);
        assert!(diagnostics.is_empty());
        let hs = &histories["hs"];
        assert_eq!(hs.parent.as_deref(), Some("p"));
        assert_eq!(hs.covered_states.iter().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(hs.default_target, ["a"]);
        assert!(!hs.has_stored_configuration);

        let root = Element::new("scxml").with_child(
            state("p")
                .with_attribute("initial", "a")
                .with_child(history("hd", "deep", None))
                .with_child(state("a").with_attribute("initial", "a1").with_child(state("a1")))
                .with_child(state("b")),
        );
        let (histories, _) = build(&root);
        assert_eq!(
            histories["hd"].covered_states.iter().collect::<Vec<_>>(),
            ["a", "a1", "b"]
        );
    }

    #[test]
    fn mixed_siblings_are_disjoint() {
        let root = Element::new("scxml").with_child(
            state("p")
                .with_attribute("initial", "a")
                .with_child(history("h1", "shallow", None))
                .with_child(history("h2", "deep", None))
                .with_child(state("a").with_attribute("initial", "a1").with_child(state("a1"))),
        );
        let (histories, diagnostics) = build(&root);
        let h1 = &histories["h1"];
        let h2 = &histories["h2"];
        assert_eq!(h1.subtype, HistoryKind::Deep);
        assert_eq!(h1.declared_subtype, HistoryKind::Shallow);
        assert!(h1.covered_states.is_disjoint(&h2.covered_states));
        assert!(diagnostics.iter().all(|d| !d.is_error()));
        assert!(diagnostics.iter().any(|d| d.message().contains("promoted to deep")));
    }

    #[test]
    fn root_level_history() {
        let root = Element::new("scxml").with_child(history("h", "shallow", None));
        let (histories, diagnostics) = build(&root);
        assert!(histories.is_empty());
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].is_error());
    }

    #[test]
    fn circular_defaults() {
        let root = Element::new("scxml").with_child(
            state("p")
                .with_attribute("initial", "s")
                .with_child(history("ha", "shallow", Some("hb")))
                .with_child(history("hb", "shallow", Some("ha")))
                .with_child(state("s")),
        );
        let (histories, diagnostics) = build(&root);
        let errors: Vec<_> = diagnostics.iter().filter(|d| d.is_error()).collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message().contains("circular history default target"));
        // Left as declared.
        assert_eq!(histories["ha"].default_target, ["hb"]);
    }
}
