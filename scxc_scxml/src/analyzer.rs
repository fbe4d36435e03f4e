//! Analysis of parallel regions and history coverage.
//!
//! The analyzer only reads the [`Registry`]:
//! it derives the region map and the history map alongside it,
//! reporting malformed parallel states, circular parallel dependencies,
//! and overlapping or circular history pseudo-states.

mod history;
mod parallel;

use indexmap::IndexMap;
use log::info;
use scxc_core::{Diagnostics, HistoryRecord, ParallelRegion, Registry};

/// Region and history maps derived from a [`Registry`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Analysis {
    /// Regions, keyed by region id.
    pub regions: IndexMap<String, ParallelRegion>,
    /// History records, keyed by history id.
    pub histories: IndexMap<String, HistoryRecord>,
}

impl Analysis {
    /// Analyzes the registry, returning the derived maps together with the diagnostics found.
    pub fn analyze(registry: &Registry) -> (Analysis, Diagnostics) {
        info!(target: "analyzer", "analyzing {} states", registry.len());
        let mut diagnostics = Diagnostics::new();
        let regions = parallel::regions(registry, &mut diagnostics);
        parallel::check_nesting(registry, &mut diagnostics);
        let histories = history::histories(registry, &mut diagnostics);
        info!(
            target: "analyzer",
            "found {} regions and {} history states",
            regions.len(),
            histories.len()
        );
        (Analysis { regions, histories }, diagnostics)
    }

    /// Regions of the given parallel state, in order.
    pub fn regions_of<'a>(&'a self, parallel: &'a str) -> impl Iterator<Item = &'a ParallelRegion> {
        self.regions
            .values()
            .filter(move |region| region.parent_parallel_id == parallel)
    }
}
