//! *scxc* validates hierarchical statechart documents (SCXML)
//! and lowers them into nested state machine configurations.
//!
//! The input is the element tree produced by an external parser (see [`Element`]),
//! possibly in its JSON rendering (see [`load`]).
//! A conversion runs the whole pipeline:
//!
//! 1. the hierarchy registry is built out of the tree;
//! 2. parallel regions and history coverage are analyzed;
//! 3. transitions are resolved to their scope;
//! 4. the document is validated;
//! 5. the registry is lowered into a [`MachineConfig`].
//!
//! ```
//! let root = scxc::load(r#"{
//!     "scxml": {
//!         "@_version": "1.0",
//!         "@_initial": "idle",
//!         "state": [
//!             { "@_id": "idle", "transition": { "@_event": "start", "@_target": "active" } },
//!             { "@_id": "active" }
//!         ]
//!     }
//! }"#).expect("well-formed element tree");
//! let conversion = scxc::convert(&root, &scxc::Options::default());
//! assert!(conversion.is_valid());
//! assert!(conversion.machine.states.contains_key("active"));
//! ```

#![forbid(unsafe_code)]

use anyhow::Context;
use indexmap::IndexMap;
use log::{error, info, warn};
use serde::Serialize;

pub use scxc_core;
pub use scxc_core::{
    Diagnostic, DiagnosticKind, Element, HistoryRecord, MachineConfig, ParallelRegion, Registry,
    Severity,
};
pub use scxc_scxml;
pub use scxc_scxml::{DispatchPlan, Options, Scope, TransitionPolicy};

use scxc_core::Diagnostics;
use scxc_scxml::validator::Context as ValidationContext;
use scxc_scxml::{Analysis, HierarchyBuilder, Resolver, Synthesizer, Validator};

/// Everything produced by a conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversion {
    pub registry: Registry,
    /// Regions of parallel states, keyed by region id.
    pub regions: IndexMap<String, ParallelRegion>,
    /// History records, keyed by history id.
    pub histories: IndexMap<String, HistoryRecord>,
    /// Scopes of the transitions, one per registered target.
    pub scopes: Vec<Scope>,
    /// Static event distribution through parallel states.
    pub dispatch: Vec<DispatchPlan>,
    /// Deduplicated diagnostics, in the order they were found.
    pub diagnostics: Vec<Diagnostic>,
    pub machine: MachineConfig,
}

impl Conversion {
    /// Whether no error has been found.
    pub fn is_valid(&self) -> bool {
        !self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// The error diagnostics.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    /// The warning diagnostics.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }

    /// Renders the whole conversion as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Runs the whole pipeline on the tree rooted at `root`.
///
/// Never fails: problems are reported as diagnostics,
/// and a fallback machine is produced if lowering is not possible.
pub fn convert(root: &Element, options: &Options) -> Conversion {
    info!(target: "convert", "converting <{}>", root.name());
    let (registry, mut diagnostics) = HierarchyBuilder::build(root);

    let (analysis, found) = Analysis::analyze(&registry);
    diagnostics.extend(found);

    let (scopes, found) =
        Resolver::new(&registry, &analysis.histories, options.policy).resolve_all();
    diagnostics.extend(found);

    Validator::default().run(
        &ValidationContext {
            root,
            registry: &registry,
            options,
        },
        &mut diagnostics,
    );

    let synthesizer = Synthesizer::new(&registry, &analysis, options);
    let machine = synthesizer.synthesize(&mut diagnostics);
    let dispatch = synthesizer.dispatch_plans();

    let diagnostics = finish(diagnostics);
    let Analysis { regions, histories } = analysis;
    Conversion {
        registry,
        regions,
        histories,
        scopes,
        dispatch,
        diagnostics,
        machine,
    }
}

fn finish(diagnostics: Diagnostics) -> Vec<Diagnostic> {
    let diagnostics = diagnostics.finish();
    for diagnostic in &diagnostics {
        if diagnostic.is_error() {
            error!(target: "convert", "{diagnostic}");
        } else {
            warn!(target: "convert", "{diagnostic}");
        }
    }
    let errors = diagnostics.iter().filter(|d| d.is_error()).count();
    info!(
        target: "convert",
        "conversion completed with {errors} errors and {} warnings",
        diagnostics.len() - errors
    );
    diagnostics
}

/// Reads an element tree from its JSON rendering.
pub fn load(json: &str) -> anyhow::Result<Element> {
    let value: serde_json::Value =
        serde_json::from_str(json).context("element tree is not valid JSON")?;
    let root = Element::from_json(&value).context("malformed element tree")?;
    Ok(root)
}
