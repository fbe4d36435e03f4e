use super::{Check, Context, walk};
use scxc_core::vocabulary::*;
use scxc_core::*;

/// Required attributes of every element, with a remediation hint.
#[derive(Debug, Clone, Copy)]
pub struct RequiredAttributes;

impl Check for RequiredAttributes {
    fn name(&self) -> &'static str {
        "required-attributes"
    }

    fn check(&self, cx: &Context<'_>, diagnostics: &mut Diagnostics) {
        walk(cx.root, |element, locator| {
            let tag = element.name();
            let mut report = |missing: String| {
                diagnostics.emit(
                    Diagnostic::error(
                        DiagnosticKind::Structural,
                        format!(
                            "<{tag}> at {locator} is missing required attribute {missing}: {}",
                            remediation(tag)
                        ),
                    )
                    .at(element.position()),
                );
            };
            for requirement in required_attributes(tag) {
                let satisfied = match requirement {
                    Requirement::All(attribute) => element.has_attribute(attribute),
                    Requirement::AnyOf(attributes) => {
                        attributes.iter().any(|attribute| element.has_attribute(attribute))
                    }
                };
                if !satisfied {
                    report(requirement.describe());
                }
            }
            if tag == TAG_TRANSITION
                && !element.has_attribute(ATTR_TARGET)
                && element.attribute(ATTR_TYPE) != Some(TRANSITION_INTERNAL)
            {
                report(Requirement::All(ATTR_TARGET).describe());
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;

    fn run(root: &Element) -> Vec<Diagnostic> {
        let registry = Registry::new();
        let options = Options::default();
        let mut diagnostics = Diagnostics::new();
        RequiredAttributes.check(
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
    fn executable_content() {
        let root = Element::new("scxml").with_child(
            Element::new("state").with_attribute("id", "s").with_child(
                Element::new("onentry")
                    .with_child(Element::new("send").with_attribute("eventexpr", "'e'"))
                    .with_child(Element::new("raise"))
                    .with_child(Element::new("foreach").with_attribute("array", "xs"))
                    .with_child(Element::new("if")),
            ),
        );
        let diagnostics = run(&root);
        let messages: Vec<_> = diagnostics.iter().map(Diagnostic::message).collect();
        assert_eq!(messages.len(), 3, "{messages:?}");
        assert!(messages[0].starts_with("<raise> at /scxml/state[0]/onentry[0]/raise[0]"));
        assert!(messages[1].contains("'item'"));
        assert!(messages[2].contains("'cond'"));
    }

    #[test]
    fn transition_target() {
        let root = Element::new("scxml").with_child(
            Element::new("state")
                .with_attribute("id", "s")
                .with_child(Element::new("transition").with_attribute("event", "a"))
                .with_child(
                    Element::new("transition")
                        .with_attribute("event", "b")
                        .with_attribute("type", "internal"),
                ),
        );
        let diagnostics = run(&root);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].message(),
            "<transition> at /scxml/state[0]/transition[0] is missing required attribute 'target': add a 'target' attribute, or declare type=\"internal\""
        );
    }

    #[test]
    fn data_without_id() {
        let root = Element::new("scxml")
            .with_child(
                Element::new("datamodel")
                    .with_child(Element::new("data").with_attribute("expr", "1")),
            );
        let diagnostics = run(&root);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message().contains("'id'"));
    }
}
