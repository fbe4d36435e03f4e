//! Lowering of the registry into a nested [`MachineConfig`].
//!
//! Every root-level state becomes a top-level node,
//! and every owned child is nested under its owner.
//! Transitions are attached to their source, keyed by event descriptor,
//! or listed under `always` when eventless.
//!
//! Lowering is total: if it fails, the failure is reported as a diagnostic
//! and a minimal single-state machine is returned instead.

mod dispatch;

pub use dispatch::{Candidate, DispatchPlan, RegionPlan};

use crate::analyzer::Analysis;
use crate::options::Options;
use hashbrown::HashSet;
use indexmap::IndexMap;
use log::{error, info, trace};
use scxc_core::*;
use serde_json::Value;
use std::cmp::Reverse;
use thiserror::Error;

const DEFAULT_MACHINE_ID: &str = "machine";

/// The error type for failures while lowering the registry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SynthesisError {
    /// A reference to a state that is not registered.
    #[error("state '{0}' is referenced but not registered")]
    UnknownState(String),
    /// A state that (transitively) owns itself.
    #[error("state '{0}' is nested inside itself")]
    CyclicOwnership(String),
    /// The initial state of a compound state is not among its descendants.
    #[error("initial state '{1}' of '{0}' is not one of its descendants")]
    InitialNotDescendant(String, String),
    /// There is no root-level state to build the machine around.
    #[error("there is no top-level state to build the machine around")]
    NoAnchor,
}

/// Lowers a registry into a [`MachineConfig`].
#[derive(Debug, Clone, Copy)]
pub struct Synthesizer<'a> {
    registry: &'a Registry,
    analysis: &'a Analysis,
    options: &'a Options,
}

impl<'a> Synthesizer<'a> {
    pub fn new(registry: &'a Registry, analysis: &'a Analysis, options: &'a Options) -> Self {
        Self {
            registry,
            analysis,
            options,
        }
    }

    /// Lowers the registry, falling back to a minimal machine on failure.
    pub fn synthesize(&self, diagnostics: &mut Diagnostics) -> MachineConfig {
        info!(target: "synthesizer", "lowering {} states", self.registry.len());
        match self.try_synthesize() {
            Ok(machine) => {
                info!(target: "synthesizer", "lowered {} top-level states", machine.states.len());
                machine
            }
            Err(err) => {
                error!(target: "synthesizer", "lowering failed: {err}");
                diagnostics.emit(Diagnostic::error(
                    DiagnosticKind::Structural,
                    format!(
                        "cannot synthesize the machine: {err}; falling back to a single '{}' state",
                        self.options.fallback_state
                    ),
                ));
                self.fallback()
            }
        }
    }

    /// Lowers the registry.
    pub fn try_synthesize(&self) -> Result<MachineConfig, SynthesisError> {
        let roots: Vec<&StateNode> = self
            .registry
            .states()
            .filter(|node| self.registry.parent_of(&node.id).is_none())
            .collect();
        let first = roots.first().ok_or(SynthesisError::NoAnchor)?;

        let initial = match self.registry.initial().first() {
            Some(id) => {
                let node = self.node(id)?;
                node.parent_path.first().unwrap_or(&node.id).clone()
            }
            None => first.id.clone(),
        };

        let anchored = self.anchored_ids();
        let mut visiting = HashSet::new();
        let mut states = IndexMap::new();
        for root in roots {
            states.insert(root.id.clone(), self.lower(root, &anchored, &mut visiting)?);
        }

        Ok(MachineConfig {
            id: self.machine_id(),
            initial: Some(initial),
            states,
            context: self.context(),
        })
    }

    /// The machine returned when lowering fails.
    pub fn fallback(&self) -> MachineConfig {
        let state = self.options.fallback_state.clone();
        MachineConfig {
            id: self.machine_id(),
            initial: Some(state.clone()),
            states: IndexMap::from([(state, StateConfig::new(NodeType::Atomic))]),
            context: self.context(),
        }
    }

    /// Static dispatch plans of every parallel state, one per event handled in its regions.
    pub fn dispatch_plans(&self) -> Vec<DispatchPlan> {
        dispatch::plans(self.registry, self.analysis)
    }

    fn machine_id(&self) -> String {
        self.options
            .machine_id
            .as_deref()
            .or(self.registry.name())
            .unwrap_or(DEFAULT_MACHINE_ID)
            .to_string()
    }

    fn node(&self, id: &str) -> Result<&'a StateNode, SynthesisError> {
        self.registry
            .get(id)
            .ok_or_else(|| SynthesisError::UnknownState(id.to_string()))
    }

    fn is_sibling(&self, source: &str, target: &str) -> bool {
        self.registry.parent_of(source) == self.registry.parent_of(target)
    }

    // Ids that are targeted by non-sibling references, and so need an explicit id.
    fn anchored_ids(&self) -> HashSet<&'a str> {
        let transitions = self
            .registry
            .transitions()
            .iter()
            .flat_map(|t| t.targets.iter().map(move |target| (t.source.as_str(), target.as_str())));
        let defaults = self
            .registry
            .states()
            .flat_map(|node| {
                node.default_target
                    .iter()
                    .map(move |target| (node.id.as_str(), target.as_str()))
            });
        transitions
            .chain(defaults)
            .filter(|(source, target)| !self.is_sibling(source, target))
            .map(|(_, target)| target)
            .collect()
    }

    fn lower_target(&self, source: &str, target: &str) -> Result<String, SynthesisError> {
        self.node(target)?;
        if self.is_sibling(source, target) {
            Ok(target.to_string())
        } else {
            Ok(format!("#{target}"))
        }
    }

    fn lower_targets(
        &self,
        source: &str,
        targets: &[String],
    ) -> Result<Option<OneOrMany<String>>, SynthesisError> {
        let targets = targets
            .iter()
            .map(|target| self.lower_target(source, target))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(OneOrMany::from_vec(targets))
    }

    fn lower(
        &self,
        node: &'a StateNode,
        anchored: &HashSet<&'a str>,
        visiting: &mut HashSet<&'a str>,
    ) -> Result<StateConfig, SynthesisError> {
        if !visiting.insert(node.id.as_str()) {
            return Err(SynthesisError::CyclicOwnership(node.id.clone()));
        }
        trace!(target: "synthesizer", "lowering '{}'", node.id);

        let kind = match node.kind {
            StateKind::Simple if node.children.is_empty() => NodeType::Atomic,
            StateKind::Simple | StateKind::Compound => NodeType::Compound,
            StateKind::Parallel => NodeType::Parallel,
            StateKind::Final => NodeType::Final,
            StateKind::History => NodeType::History,
        };
        let mut config = StateConfig::new(kind);
        if anchored.contains(node.id.as_str()) {
            config.id = Some(node.id.clone());
        }
        config.entry = node.entry.iter().map(ActionConfig::from).collect();
        config.exit = node.exit.iter().map(ActionConfig::from).collect();

        match kind {
            NodeType::History => {
                let subtype = self
                    .analysis
                    .histories
                    .get(&node.id)
                    .map(|record| record.subtype)
                    .or(node.history)
                    .unwrap_or(HistoryKind::Shallow);
                config.history = Some(subtype);
                config.target = self.lower_targets(&node.id, &node.default_target)?;
            }
            NodeType::Compound => {
                config.initial = self.lower_initial(node)?;
            }
            _ => {}
        }

        for child in &node.children {
            let child = self.node(child)?;
            config
                .states
                .insert(child.id.clone(), self.lower(child, anchored, visiting)?);
        }

        self.lower_transitions(node, &mut config)?;
        visiting.remove(node.id.as_str());
        Ok(config)
    }

    // The direct child on the path to the declared initial state.
    fn lower_initial(&self, node: &StateNode) -> Result<Option<String>, SynthesisError> {
        let Some(initial) = node.initial.first() else {
            // Reported by the validator; enter the first child instead.
            return Ok(node
                .children
                .iter()
                .find(|child| {
                    self.registry
                        .get(child)
                        .is_some_and(|c| c.kind != StateKind::History)
                })
                .cloned());
        };
        let target = self.node(initial)?;
        let child = target
            .chain()
            .iter()
            .skip_while(|id| **id != node.id.as_str())
            .nth(1)
            .map(|id| id.to_string());
        match child {
            Some(child) if node.children.contains(&child) => Ok(Some(child)),
            _ => Err(SynthesisError::InitialNotDescendant(
                node.id.clone(),
                initial.clone(),
            )),
        }
    }

    fn lower_transitions(
        &self,
        node: &StateNode,
        config: &mut StateConfig,
    ) -> Result<(), SynthesisError> {
        let mut by_event: IndexMap<&str, Vec<(&Transition, TransitionConfig)>> = IndexMap::new();
        for transition in self.registry.transitions_from(&node.id) {
            let lowered = TransitionConfig {
                target: self.lower_targets(&node.id, &transition.targets)?,
                guard: transition.cond.clone(),
                actions: transition.actions.iter().map(ActionConfig::from).collect(),
                internal: transition.kind == TransitionType::Internal,
            };
            if transition.is_eventless() {
                config.always.push(lowered);
            } else {
                for event in transition.events() {
                    by_event
                        .entry(event)
                        .or_default()
                        .push((transition, lowered.clone()));
                }
            }
        }
        for (event, mut transitions) in by_event {
            transitions.sort_by_key(|(transition, _)| priority(transition));
            let transitions = transitions.into_iter().map(|(_, lowered)| lowered).collect();
            if let Some(transitions) = OneOrMany::from_vec(transitions) {
                config.on.insert(event.to_string(), transitions);
            }
        }
        Ok(())
    }

    fn context(&self) -> IndexMap<String, Value> {
        let mut context = IndexMap::new();
        for data in self.registry.data() {
            let value = match (&data.expr, &data.text) {
                (Some(source), _) | (None, Some(source)) => literal(source),
                (None, None) => Value::Null,
            };
            context.insert(data.id.clone(), value);
        }
        context
    }
}

/// Sort key putting conditioned transitions before unconditioned ones,
/// then internal before external ones.
/// The sort is stable, so ties keep document order.
pub(crate) fn priority(transition: &Transition) -> (Reverse<bool>, Reverse<bool>) {
    (
        Reverse(transition.cond.is_some()),
        Reverse(transition.kind == TransitionType::Internal),
    )
}

// Parses a JSON literal, keeping the raw expression otherwise.
fn literal(source: &str) -> Value {
    serde_json::from_str(source.trim()).unwrap_or_else(|_| Value::String(source.to_string()))
}
