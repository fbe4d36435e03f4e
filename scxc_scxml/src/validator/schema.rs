use super::{Check, Context, walk};
use scxc_core::vocabulary::*;
use scxc_core::*;

/// The closest candidate within `max_distance`, the first one on ties.
fn suggest<'a>(name: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|candidate| (strsim::levenshtein(name, candidate), *candidate))
        .filter(|(distance, _)| *distance <= max_distance)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate)
}

/// Unknown attributes and elements, with "did you mean" suggestions.
#[derive(Debug, Clone, Copy)]
pub struct Schema;

impl Check for Schema {
    fn name(&self) -> &'static str {
        "schema"
    }

    fn check(&self, cx: &Context<'_>, diagnostics: &mut Diagnostics) {
        let max_distance = cx.options.suggestion_distance;
        walk(cx.root, |element, locator| {
            let tag = element.name();
            if is_foreign_tag(tag) {
                return;
            }
            let Some(allowed) = allowed_attributes(tag) else {
                if cx.options.warn_unknown_elements {
                    let hint = suggest(tag, TAGS, max_distance)
                        .map(|s| format!("; did you mean <{s}>?"))
                        .unwrap_or_default();
                    diagnostics.emit(
                        Diagnostic::warning(
                            DiagnosticKind::Schema,
                            format!("unknown element <{tag}> at {locator}{hint}"),
                        )
                        .at(element.position()),
                    );
                }
                return;
            };
            for attribute in element.attribute_names() {
                if allowed.contains(&attribute) || is_foreign_attribute(attribute) {
                    continue;
                }
                let hint = suggest(attribute, allowed, max_distance)
                    .map(|s| format!("; did you mean '{s}'?"))
                    .unwrap_or_default();
                diagnostics.emit(
                    Diagnostic::error(
                        DiagnosticKind::Schema,
                        format!("unknown attribute '{attribute}' on <{tag}> at {locator}{hint}"),
                    )
                    .at(element.position()),
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;

    fn run(root: &Element, options: &Options) -> Vec<Diagnostic> {
        let registry = Registry::new();
        let mut diagnostics = Diagnostics::new();
        Schema.check(
            &Context {
                root,
                registry: &registry,
                options,
            },
            &mut diagnostics,
        );
        diagnostics.finish()
    }

    #[test]
    fn closest_candidate() {
        let candidates = [ATTR_ID, ATTR_INITIAL, ATTR_NAME];
        assert_eq!(suggest("inital", &candidates, 2), Some(ATTR_INITIAL));
        assert_eq!(suggest("nme", &candidates, 2), Some(ATTR_NAME));
        assert_eq!(suggest("flavour", &candidates, 2), None);
        // Ties go to the first candidate.
        assert_eq!(suggest("x", &["a", "b"], 1), Some("a"));
    }

    #[test]
    fn typo_suggestion() {
        let root = Element::new("scxml").with_child(
            Element::new("state")
                .with_attribute("id", "a")
                .with_attribute("@_inital", "b"),
        );
        let diagnostics = run(&root, &Options::default());
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].is_error());
        assert_eq!(
            diagnostics[0].message(),
            "unknown attribute 'inital' on <state> at /scxml/state[0]; did you mean 'initial'?"
        );
    }

    #[test]
    fn no_suggestion_beyond_threshold() {
        let root = Element::new("scxml").with_attribute("flavour", "x");
        let diagnostics = run(&root, &Options::default());
        assert_eq!(diagnostics.len(), 1);
        assert!(!diagnostics[0].message().contains("did you mean"));
    }

    #[test]
    fn foreign_names_are_accepted() {
        let root = Element::new("scxml")
            .with_attribute("xmlns:conf", "urn:conf")
            .with_attribute("conf:priority", "1")
            .with_child(Element::new("conf:bt").with_attribute("whatever", "x"));
        assert!(run(&root, &Options::default()).is_empty());
    }

    #[test]
    fn unknown_elements() {
        let root = Element::new("scxml").with_child(Element::new("stat"));
        let diagnostics = run(&root, &Options::default());
        assert_eq!(diagnostics.len(), 1);
        assert!(!diagnostics[0].is_error());
        assert!(diagnostics[0].message().ends_with("did you mean <state>?"));

        let options = Options {
            warn_unknown_elements: false,
            ..Options::default()
        };
        assert!(run(&root, &options).is_empty());
    }
}
