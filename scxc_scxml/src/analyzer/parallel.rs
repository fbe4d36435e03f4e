use hashbrown::HashSet;
use indexmap::{IndexMap, IndexSet};
use log::{trace, warn};
use scxc_core::*;

pub(super) fn regions(
    registry: &Registry,
    diagnostics: &mut Diagnostics,
) -> IndexMap<String, ParallelRegion> {
    let mut regions = IndexMap::new();
    for parallel in registry.states().filter(|node| node.kind == StateKind::Parallel) {
        let members: Vec<&str> = parallel
            .children
            .iter()
            .filter(|id| registry.get(id).is_some_and(|node| node.kind != StateKind::History))
            .map(String::as_str)
            .collect();
        match members.as_slice() {
            [] => diagnostics.emit(
                Diagnostic::error(
                    DiagnosticKind::Structural,
                    format!("parallel state '{}' has no regions", parallel.id),
                )
                .at(parallel.position),
            ),
            [single] => diagnostics.emit(
                Diagnostic::warning(
                    DiagnosticKind::Structural,
                    format!(
                        "parallel state '{}' has a single region '{single}'",
                        parallel.id
                    ),
                )
                .at(parallel.position),
            ),
            _ => {}
        }

        let nesting_level = 1 + parallel
            .parent_path
            .iter()
            .filter(|id| registry.get(id).is_some_and(|node| node.kind == StateKind::Parallel))
            .count();
        for &region in &members {
            trace!(target: "analyzer", "region '{region}' of '{}'", parallel.id);
            regions.insert(
                region.to_string(),
                ParallelRegion {
                    region_id: region.to_string(),
                    parent_parallel_id: parallel.id.clone(),
                    sibling_regions: members
                        .iter()
                        .filter(|&&sibling| sibling != region)
                        .map(|sibling| sibling.to_string())
                        .collect(),
                    nesting_level,
                },
            );
        }
    }
    regions
}

/// Walks the ownership graph looking for nested parallel states.
///
/// Every node has at most one owner,
/// so each connected component of the graph holds at most one cycle,
/// and a depth-first search reports it exactly once.
pub(super) fn check_nesting(registry: &Registry, diagnostics: &mut Diagnostics) {
    let mut walk = NestingWalk {
        registry,
        diagnostics,
        done: HashSet::new(),
        reported: HashSet::new(),
        chain: IndexSet::new(),
        enclosing: Vec::new(),
    };
    for node in registry.states() {
        walk.visit(&node.id);
    }
}

struct NestingWalk<'a> {
    registry: &'a Registry,
    diagnostics: &'a mut Diagnostics,
    done: HashSet<&'a str>,
    // Cycles already reported, by sorted membership.
    reported: HashSet<Vec<&'a str>>,
    // Ids on the current branch, outermost first.
    chain: IndexSet<&'a str>,
    // Parallel states on the current branch, outermost first.
    enclosing: Vec<&'a str>,
}

impl<'a> NestingWalk<'a> {
    fn visit(&mut self, id: &'a str) {
        if self.done.contains(id) {
            return;
        }
        if let Some(start) = self.chain.get_index_of(id) {
            let cycle: Vec<&str> = self.chain.iter().skip(start).copied().collect();
            self.report_cycle(cycle);
            return;
        }
        let Some(node) = self.registry.get(id) else {
            return;
        };

        self.chain.insert(id);
        let is_parallel = node.kind == StateKind::Parallel;
        if is_parallel {
            self.check_collisions(node);
            self.enclosing.push(id);
        }
        for child in &node.children {
            self.visit(child);
        }
        if is_parallel {
            self.enclosing.pop();
        }
        self.chain.pop();
        self.done.insert(id);
    }

    fn report_cycle(&mut self, cycle: Vec<&'a str>) {
        let parallel = cycle.iter().find(|id| {
            self.registry
                .get(id)
                .is_some_and(|node| node.kind == StateKind::Parallel)
        });
        // Cycles without parallel states are reported while lowering.
        let Some(parallel) = parallel.copied() else {
            return;
        };
        let mut members = cycle.clone();
        members.sort_unstable();
        if !self.reported.insert(members) {
            return;
        }
        let description = cycle
            .iter()
            .chain(cycle.first())
            .copied()
            .collect::<Vec<_>>()
            .join(" -> ");
        warn!(target: "analyzer", "circular parallel dependency {description}");
        let position = self.registry.get(parallel).and_then(|node| node.position);
        self.diagnostics.emit(
            Diagnostic::error(
                DiagnosticKind::Topological,
                format!("circular parallel dependency: {description}"),
            )
            .at(position),
        );
    }

    // Region ids declared by a nested parallel state that are also declared by an enclosing one.
    fn check_collisions(&mut self, nested: &StateNode) {
        for &outer in &self.enclosing {
            let Some(outer) = self.registry.get(outer) else {
                continue;
            };
            for region in nested
                .declared_children
                .intersection(&outer.declared_children)
            {
                self.diagnostics.emit(
                    Diagnostic::warning(
                        DiagnosticKind::Structural,
                        format!(
                            "region '{region}' of parallel state '{}' collides with a region of enclosing parallel state '{}'",
                            nested.id, outer.id
                        ),
                    )
                    .at(nested.position),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::HierarchyBuilder;

    fn state(tag: &str, id: &str) -> Element {
        Element::new(tag).with_attribute("id", id)
    }

    #[test]
    fn regions_and_nesting_levels() {
        let root = Element::new("scxml").with_child(
            state("parallel", "p")
                .with_child(state("state", "r1"))
                .with_child(
                    state("state", "r2").with_attribute("initial", "q").with_child(
                        state("parallel", "q")
                            .with_child(state("state", "q1"))
                            .with_child(state("state", "q2")),
                    ),
                ),
        );
        let (registry, _) = HierarchyBuilder::build(&root);
        let mut diagnostics = Diagnostics::new();
        let regions = regions(&registry, &mut diagnostics);
        assert!(diagnostics.is_empty());
        assert_eq!(regions.len(), 4);
        let r1 = &regions["r1"];
        assert_eq!(r1.parent_parallel_id, "p");
        assert_eq!(r1.sibling_regions, ["r2"]);
        assert_eq!(r1.nesting_level, 1);
        assert_eq!(regions["q2"].nesting_level, 2);
        assert_eq!(regions["q2"].sibling_regions, ["q1"]);
    }

    #[test]
    fn region_counts() {
        let root = Element::new("scxml")
            .with_child(state("parallel", "empty"))
            .with_child(state("parallel", "lonely").with_child(state("state", "only")));
        let (registry, _) = HierarchyBuilder::build(&root);
        let mut diagnostics = Diagnostics::new();
        regions(&registry, &mut diagnostics);
        let diagnostics = diagnostics.finish();
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics[0].is_error());
        assert!(diagnostics[0].message().contains("'empty' has no regions"));
        assert!(!diagnostics[1].is_error());
        assert!(diagnostics[1].message().contains("single region 'only'"));
    }

    #[test]
    fn circular_parallel_is_reported_once() {
        // 'p1' is redeclared inside its own region.
        let root = Element::new("scxml").with_child(
            state("parallel", "p1")
                .with_child(state("state", "r").with_child(
                    state("parallel", "p1").with_child(state("state", "s")),
                ))
                .with_child(state("state", "t")),
        );
        let (registry, _) = HierarchyBuilder::build(&root);
        let mut diagnostics = Diagnostics::new();
        check_nesting(&registry, &mut diagnostics);
        let errors: Vec<_> = diagnostics.errors().collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message().contains("circular parallel dependency"));
    }

    #[test]
    fn region_collision_is_a_warning() {
        // Both parallel states declare 'x'; the nested one owns it.
        let root = Element::new("scxml").with_child(
            state("parallel", "outer")
                .with_child(
                    state("state", "a").with_attribute("initial", "inner").with_child(
                        state("parallel", "inner")
                            .with_child(state("state", "x"))
                            .with_child(state("state", "y")),
                    ),
                )
                .with_child(state("state", "x")),
        );
        let (registry, _) = HierarchyBuilder::build(&root);
        let mut diagnostics = Diagnostics::new();
        check_nesting(&registry, &mut diagnostics);
        assert!(!diagnostics.has_errors());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(registry.parent_of("x"), Some("inner"));
    }
}
