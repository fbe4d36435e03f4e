//! Semantic validation of a document and its registry.
//!
//! Validation is table-driven: a [`Validator`] runs a list of independent [`Check`]s in order,
//! each appending diagnostics to the same collector.
//! No check ever stops the others.

mod attributes;
mod document;
mod reachability;
mod references;
mod schema;
mod structure;
mod transitions;

use crate::options::Options;
use log::{debug, info};
use scxc_core::element::child_locator;
use scxc_core::vocabulary::{TAG_CONTENT, allowed_attributes, is_foreign_tag};
use scxc_core::{Diagnostic, Diagnostics, Element, Registry};

pub use attributes::RequiredAttributes;
pub use document::DocumentRoot;
pub use reachability::Reachability;
pub use references::References;
pub use schema::Schema;
pub use structure::{CompoundInitial, DuplicateIds};
pub use transitions::TransitionSyntax;

/// What a [`Check`] can look at.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    pub root: &'a Element,
    pub registry: &'a Registry,
    pub options: &'a Options,
}

/// A single validation rule.
pub trait Check {
    /// Short name, for logging.
    fn name(&self) -> &'static str;

    /// Appends a diagnostic for every violation found.
    fn check(&self, cx: &Context<'_>, diagnostics: &mut Diagnostics);
}

/// Runs a list of [`Check`]s.
pub struct Validator {
    checks: Vec<Box<dyn Check>>,
}

impl Default for Validator {
    /// The full list of checks.
    fn default() -> Self {
        Validator::empty()
            .with_check(DocumentRoot)
            .with_check(Schema)
            .with_check(RequiredAttributes)
            .with_check(DuplicateIds)
            .with_check(References)
            .with_check(CompoundInitial)
            .with_check(TransitionSyntax)
            .with_check(Reachability)
    }
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.checks.iter().map(|check| check.name()))
            .finish()
    }
}

impl Validator {
    /// A validator without checks.
    pub fn empty() -> Self {
        Validator { checks: Vec::new() }
    }

    /// Appends a check, to be run after the ones already added.
    pub fn with_check(mut self, check: impl Check + 'static) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    /// Runs every check, appending to `diagnostics`.
    pub fn run(&self, cx: &Context<'_>, diagnostics: &mut Diagnostics) {
        info!(target: "validator", "running {} checks", self.checks.len());
        for check in &self.checks {
            let before = diagnostics.len();
            check.check(cx, diagnostics);
            debug!(
                target: "validator",
                "{}: {} diagnostics",
                check.name(),
                diagnostics.len() - before
            );
        }
    }

    /// Runs every check and returns the deduplicated diagnostics.
    pub fn validate(
        &self,
        root: &Element,
        registry: &Registry,
        options: &Options,
    ) -> Vec<Diagnostic> {
        let mut diagnostics = Diagnostics::new();
        self.run(
            &Context {
                root,
                registry,
                options,
            },
            &mut diagnostics,
        );
        diagnostics.finish()
    }
}

/// Visits the element tree in pre-order, together with the locator of each element.
///
/// Does not descend into foreign or unknown elements, nor into `content`,
/// except for the root, whose tag is checked on its own.
pub(crate) fn walk<'a, F>(root: &'a Element, mut visit: F)
where
    F: FnMut(&'a Element, &str),
{
    fn go<'a, F>(element: &'a Element, locator: &str, visit: &mut F)
    where
        F: FnMut(&'a Element, &str),
    {
        visit(element, locator);
        let name = element.name();
        if is_foreign_tag(name) || name == TAG_CONTENT || allowed_attributes(name).is_none() {
            return;
        }
        for (index, child) in element.children() {
            go(child, &child_locator(locator, child.name(), index), visit);
        }
    }
    let locator = format!("/{}", root.name());
    visit(root, &locator);
    for (index, child) in root.children() {
        go(child, &child_locator(&locator, child.name(), index), &mut visit);
    }
}
