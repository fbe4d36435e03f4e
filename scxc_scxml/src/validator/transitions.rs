use super::{Check, Context, walk};
use crate::events::is_valid_descriptor;
use scxc_core::vocabulary::*;
use scxc_core::*;

/// Transition and history types, event descriptors,
/// and the target of internal transitions.
#[derive(Debug, Clone, Copy)]
pub struct TransitionSyntax;

impl Check for TransitionSyntax {
    fn name(&self) -> &'static str {
        "transition-syntax"
    }

    fn check(&self, cx: &Context<'_>, diagnostics: &mut Diagnostics) {
        walk(cx.root, |element, locator| match element.name() {
            TAG_TRANSITION => {
                if let Some(kind) = element.attribute(ATTR_TYPE) {
                    if TransitionType::parse(kind).is_none() {
                        diagnostics.emit(
                            Diagnostic::error(
                                DiagnosticKind::Structural,
                                format!(
                                    "invalid type '{kind}' of transition at {locator}, expected '{TRANSITION_INTERNAL}' or '{TRANSITION_EXTERNAL}'"
                                ),
                            )
                            .at(element.position()),
                        );
                    }
                }
                if let Some(event) = element.attribute(ATTR_EVENT) {
                    for descriptor in event.split_whitespace().filter(|d| !is_valid_descriptor(d)) {
                        diagnostics.emit(
                            Diagnostic::error(
                                DiagnosticKind::Structural,
                                format!(
                                    "invalid event descriptor '{descriptor}' in transition at {locator}"
                                ),
                            )
                            .at(element.position()),
                        );
                    }
                }
            }
            TAG_HISTORY => {
                if let Some(kind) = element.attribute(ATTR_TYPE) {
                    if HistoryKind::parse(kind).is_none() {
                        diagnostics.emit(
                            Diagnostic::error(
                                DiagnosticKind::Structural,
                                format!(
                                    "invalid type '{kind}' of history at {locator}, expected '{HISTORY_SHALLOW}' or '{HISTORY_DEEP}'"
                                ),
                            )
                            .at(element.position()),
                        );
                    }
                }
            }
            _ => {}
        });

        for transition in cx.registry.transitions() {
            if transition.kind == TransitionType::Internal
                && !transition.targets.is_empty()
                && transition.targets.iter().any(|target| *target != transition.source)
            {
                diagnostics.emit(
                    Diagnostic::error(
                        DiagnosticKind::Structural,
                        format!(
                            "internal transition {} of '{}' must target only its own state",
                            transition.locator, transition.source
                        ),
                    )
                    .at(transition.position),
                );
            }
        }
    }
}
