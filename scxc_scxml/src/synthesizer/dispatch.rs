//! Static planning of event distribution through parallel states.
//!
//! When an event reaches an active parallel state,
//! every region gets a chance to handle it, outermost regions first.
//! A region handles the event if one of its states declares a matching transition;
//! states inside a nested parallel state belong to the nested regions,
//! which are planned after the enclosing ones and only once.
//! If no region can handle the event, it bubbles up
//! to the closest non-parallel ancestor that can.

use super::priority;
use crate::analyzer::Analysis;
use crate::events;
use hashbrown::HashSet;
use indexmap::IndexSet;
use log::trace;
use scxc_core::*;
use serde::Serialize;
use std::collections::VecDeque;

/// A transition that may handle an event within a region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub source: String,
    pub locator: String,
    pub targets: Vec<String>,
    pub conditioned: bool,
    pub internal: bool,
    /// Depth of the source state.
    pub depth: usize,
}

/// The candidates of a region, by decreasing priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionPlan {
    pub region: String,
    pub parallel: String,
    pub nesting_level: usize,
    pub candidates: Vec<Candidate>,
}

/// How an event is distributed through a parallel state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchPlan {
    pub parallel: String,
    pub event: String,
    /// Regions, outermost first.
    pub regions: Vec<RegionPlan>,
    /// The ancestor handling the event when no region does.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bubble_up: Option<String>,
}

impl DispatchPlan {
    /// Whether some region handles the event.
    pub fn is_handled(&self) -> bool {
        self.regions.iter().any(|region| !region.candidates.is_empty())
    }
}

/// Plans every event named by transitions inside every parallel state.
pub(super) fn plans(registry: &Registry, analysis: &Analysis) -> Vec<DispatchPlan> {
    let mut plans = Vec::new();
    for parallel in registry.states().filter(|node| node.kind == StateKind::Parallel) {
        let events: IndexSet<&str> = registry
            .transitions()
            .iter()
            .filter(|t| registry.is_descendant(&t.source, &parallel.id))
            .flat_map(Transition::events)
            .filter(|event| *event != "*")
            .map(|event| event.strip_suffix(".*").unwrap_or(event))
            .collect();
        plans.extend(events.into_iter().map(|event| plan(registry, analysis, &parallel.id, event)));
    }
    plans
}

/// Plans the distribution of `event` through the parallel state `parallel`.
pub fn plan(registry: &Registry, analysis: &Analysis, parallel: &str, event: &str) -> DispatchPlan {
    let mut handled: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = analysis
        .regions_of(parallel)
        .map(|r| r.region_id.as_str())
        .collect();
    let mut regions = Vec::new();

    while let Some(region) = queue.pop_front() {
        if !handled.insert(region) {
            continue;
        }
        let Some(record) = analysis.regions.get(region) else {
            continue;
        };
        let mut states = Vec::new();
        let mut nested = Vec::new();
        collect(registry, region, &mut states, &mut nested, &mut HashSet::new());
        for nested in nested {
            queue.extend(analysis.regions_of(nested).map(|r| r.region_id.as_str()));
        }

        let mut candidates: Vec<&Transition> = registry
            .transitions()
            .iter()
            .filter(|t| states.contains(&t.source.as_str()) && handles(t, event))
            .collect();
        candidates.sort_by_key(|t| {
            let depth = registry.get(&t.source).map_or(0, |node| node.depth);
            (priority(t), std::cmp::Reverse(depth))
        });
        trace!(
            target: "synthesizer",
            "region '{region}' has {} candidates for '{event}'",
            candidates.len()
        );
        regions.push(RegionPlan {
            region: region.to_string(),
            parallel: record.parent_parallel_id.clone(),
            nesting_level: record.nesting_level,
            candidates: candidates
                .into_iter()
                .map(|t| Candidate {
                    source: t.source.clone(),
                    locator: t.locator.clone(),
                    targets: t.targets.clone(),
                    conditioned: t.cond.is_some(),
                    internal: t.kind == TransitionType::Internal,
                    depth: registry.get(&t.source).map_or(0, |node| node.depth),
                })
                .collect(),
        });
    }

    let mut plan = DispatchPlan {
        parallel: parallel.to_string(),
        event: event.to_string(),
        regions,
        bubble_up: None,
    };
    if !plan.is_handled() {
        plan.bubble_up = registry
            .ancestors(parallel)
            .filter(|id| registry.get(id).is_some_and(|a| a.kind != StateKind::Parallel))
            .find(|id| registry.transitions_from(id).any(|t| handles(t, event)))
            .map(str::to_string);
    }
    plan
}

fn handles(transition: &Transition, event: &str) -> bool {
    transition.events().any(|descriptor| events::matches(descriptor, event))
}

// States of a region, stopping at nested parallel states, whose regions are planned separately.
fn collect<'a>(
    registry: &'a Registry,
    id: &'a str,
    states: &mut Vec<&'a str>,
    nested: &mut Vec<&'a str>,
    seen: &mut HashSet<&'a str>,
) {
    if !seen.insert(id) {
        return;
    }
    let Some(node) = registry.get(id) else {
        return;
    };
    states.push(node.id.as_str());
    if node.kind == StateKind::Parallel {
        nested.push(node.id.as_str());
        return;
    }
    for child in &node.children {
        collect(registry, child, states, nested, seen);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::HierarchyBuilder;

    fn state(id: &str) -> Element {
        Element::new("state").with_attribute("id", id)
    }

    fn transition(event: &str, target: &str) -> Element {
        Element::new("transition")
            .with_attribute("event", event)
            .with_attribute("target", target)
    }

    fn parallel(id: &str) -> Element {
        Element::new("parallel").with_attribute("id", id)
    }

    // top > p > { r1 > q > { q1, q2 }, r2 }
    fn document() -> Element {
        Element::new("scxml").with_attribute("initial", "top").with_child(
            state("top")
                .with_attribute("initial", "p")
                .with_child(transition("reset", "top"))
                .with_child(
                    parallel("p")
                        .with_child(
                            state("r1").with_attribute("initial", "q").with_child(
                                parallel("q")
                                    .with_child(state("q1").with_child(transition("tick", "q1")))
                                    .with_child(state("q2").with_child(
                                        transition("tick.fast", "q2")
                                            .with_attribute("cond", "fast"),
                                    )),
                            ),
                        )
                        .with_child(
                            state("r2")
                                .with_child(transition("tick", "r2"))
                                .with_child(
                                    transition("tick", "r2").with_attribute("type", "internal"),
                                ),
                        ),
                ),
        )
    }

    fn setup(root: &Element) -> (Registry, Analysis) {
        let (registry, _) = HierarchyBuilder::build(root);
        let (analysis, _) = Analysis::analyze(&registry);
        (registry, analysis)
    }

    #[test]
    fn outermost_regions_first() {
        let (registry, analysis) = setup(&document());
        let plan = plan(&registry, &analysis, "p", "tick.fast");
        let order: Vec<_> = plan.regions.iter().map(|r| r.region.as_str()).collect();
        assert_eq!(order, ["r1", "r2", "q1", "q2"]);
        assert!(plan.regions[0].candidates.is_empty());
        assert_eq!(plan.regions[1].candidates.len(), 2);
        // Internal before external.
        assert!(plan.regions[1].candidates[0].internal);
        assert_eq!(plan.regions[2].candidates.len(), 1);
        assert!(plan.regions[3].candidates[0].conditioned);
        assert_eq!(plan.bubble_up, None);
    }

    #[test]
    fn unhandled_events_bubble_up() {
        let (registry, analysis) = setup(&document());
        let plan = plan(&registry, &analysis, "p", "reset");
        assert!(!plan.is_handled());
        assert_eq!(plan.bubble_up.as_deref(), Some("top"));
    }

    #[test]
    fn plans_cover_every_event() {
        let (registry, analysis) = setup(&document());
        let plans = plans(&registry, &analysis);
        let keys: Vec<_> = plans
            .iter()
            .map(|plan| (plan.parallel.as_str(), plan.event.as_str()))
            .collect();
        assert_eq!(keys, [("p", "tick"), ("p", "tick.fast"), ("q", "tick"), ("q", "tick.fast")]);
    }
}
