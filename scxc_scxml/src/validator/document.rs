use super::{Check, Context};
use scxc_core::vocabulary::*;
use scxc_core::*;

/// Root element, version and namespace.
#[derive(Debug, Clone, Copy)]
pub struct DocumentRoot;

impl Check for DocumentRoot {
    fn name(&self) -> &'static str {
        "document-root"
    }

    fn check(&self, cx: &Context<'_>, diagnostics: &mut Diagnostics) {
        let root = cx.root;
        let position = root.position();
        if root.name() != TAG_SCXML {
            diagnostics.emit(
                Diagnostic::error(
                    DiagnosticKind::Structural,
                    format!("root element must be <{TAG_SCXML}>, found <{}>", root.name()),
                )
                .at(position),
            );
        }
        if let Some(version) = root.attribute(ATTR_VERSION) {
            if version != SCXML_VERSION {
                diagnostics.emit(
                    Diagnostic::error(
                        DiagnosticKind::Structural,
                        format!("unsupported version '{version}', expected '{SCXML_VERSION}'"),
                    )
                    .at(position),
                );
            }
        }
        if let Some(namespace) = root.attribute(ATTR_XMLNS) {
            if namespace != SCXML_NAMESPACE {
                diagnostics.emit(
                    Diagnostic::warning(
                        DiagnosticKind::Structural,
                        format!("unexpected namespace '{namespace}', expected '{SCXML_NAMESPACE}'"),
                    )
                    .at(position),
                );
            }
        }
        let has_states = STATE_TAGS
            .iter()
            .any(|tag| root.children_named(tag).next().is_some());
        if !has_states && !root.has_attribute(ATTR_INITIAL) {
            diagnostics.emit(
                Diagnostic::error(
                    DiagnosticKind::Structural,
                    "document declares neither states nor an initial state",
                )
                .at(position),
            );
        }
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
        DocumentRoot.check(
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
    fn well_formed_root() {
        let root = Element::new("scxml")
            .with_attribute("xmlns", SCXML_NAMESPACE)
            .with_attribute("version", "1.0")
            .with_child(Element::new("final").with_attribute("id", "done"));
        assert!(run(&root).is_empty());
    }

    #[test]
    fn wrong_root() {
        let diagnostics = run(&Element::new("statechart").with_attribute("initial", "a"));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message().contains("found <statechart>"));
    }

    #[test]
    fn version_and_namespace() {
        let root = Element::new("scxml")
            .with_attribute("@_version", "2.0")
            .with_attribute("xmlns", "urn:other")
            .with_attribute("initial", "a");
        let diagnostics = run(&root);
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics[0].is_error());
        assert!(!diagnostics[1].is_error());
    }

    #[test]
    fn empty_document() {
        let diagnostics = run(&Element::new("scxml"));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].is_error());
    }
}
