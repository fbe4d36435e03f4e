use super::{Check, Context};
use scxc_core::*;

/// References to states that do not exist, or are not where they should be.
#[derive(Debug, Clone, Copy)]
pub struct References;

impl Check for References {
    fn name(&self) -> &'static str {
        "references"
    }

    fn check(&self, cx: &Context<'_>, diagnostics: &mut Diagnostics) {
        let registry = cx.registry;
        for id in registry.initial().iter().filter(|id| !registry.contains(id)) {
            diagnostics.emit(
                Diagnostic::error(
                    DiagnosticKind::Referential,
                    format!("initial state '{id}' of the document does not exist"),
                )
                .at(cx.root.position()),
            );
        }

        for transition in registry.transitions() {
            for target in transition.targets.iter().filter(|id| !registry.contains(id)) {
                diagnostics.emit(
                    Diagnostic::error(
                        DiagnosticKind::Referential,
                        format!(
                            "transition {} of '{}' targets unknown state '{target}'",
                            transition.locator, transition.source
                        ),
                    )
                    .at(transition.position),
                );
            }
        }

        for node in registry.states() {
            for initial in &node.initial {
                let message = if !registry.contains(initial) {
                    format!("initial state '{initial}' of '{}' does not exist", node.id)
                } else if !registry.is_descendant(initial, &node.id) {
                    format!(
                        "initial state '{initial}' of '{0}' is not a descendant of '{0}'",
                        node.id
                    )
                } else {
                    continue;
                };
                diagnostics.emit(
                    Diagnostic::error(DiagnosticKind::Referential, message).at(node.position),
                );
            }
            for target in node.default_target.iter().filter(|id| !registry.contains(id)) {
                diagnostics.emit(
                    Diagnostic::error(
                        DiagnosticKind::Referential,
                        format!("default target '{target}' of history '{}' does not exist", node.id),
                    )
                    .at(node.position),
                );
            }
        }
    }
}
