use super::{Check, Context, walk};
use indexmap::IndexMap;
use scxc_core::vocabulary::*;
use scxc_core::*;

/// Ids declared more than once.
///
/// Duplicate state ids are errors.
/// Duplicate data ids are only warnings, as the later definition overrides the earlier one.
#[derive(Debug, Clone, Copy)]
pub struct DuplicateIds;

impl Check for DuplicateIds {
    fn name(&self) -> &'static str {
        "duplicate-ids"
    }

    fn check(&self, cx: &Context<'_>, diagnostics: &mut Diagnostics) {
        let mut states: IndexMap<&str, String> = IndexMap::new();
        let mut data: IndexMap<&str, String> = IndexMap::new();
        walk(cx.root, |element, locator| {
            let Some(id) = element.attribute(ATTR_ID) else {
                return;
            };
            if STATE_TAGS.contains(&element.name()) {
                if let Some(first) = states.get(id) {
                    diagnostics.emit(
                        Diagnostic::error(
                            DiagnosticKind::Structural,
                            format!("duplicate state id '{id}' at {locator}, first declared at {first}"),
                        )
                        .at(element.position()),
                    );
                } else {
                    states.insert(id, locator.to_string());
                }
            } else if element.name() == TAG_DATA {
                if let Some(first) = data.get(id) {
                    diagnostics.emit(
                        Diagnostic::warning(
                            DiagnosticKind::Structural,
                            format!(
                                "data '{id}' at {locator} overrides the definition at {first}"
                            ),
                        )
                        .at(element.position()),
                    );
                } else {
                    data.insert(id, locator.to_string());
                }
            }
        });
    }
}

/// Compound states must declare their initial state.
#[derive(Debug, Clone, Copy)]
pub struct CompoundInitial;

impl Check for CompoundInitial {
    fn name(&self) -> &'static str {
        "compound-initial"
    }

    fn check(&self, cx: &Context<'_>, diagnostics: &mut Diagnostics) {
        for node in cx
            .registry
            .states()
            .filter(|node| node.kind == StateKind::Compound && node.initial.is_empty())
        {
            diagnostics.emit(
                Diagnostic::error(
                    DiagnosticKind::Structural,
                    format!(
                        "compound state '{}' must declare an initial state, with an 'initial' attribute or an <initial> element",
                        node.id
                    ),
                )
                .at(node.position),
            );
        }
    }
}
