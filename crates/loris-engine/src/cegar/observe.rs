//! Debug observation hooks for a running loop.

use crate::ars::{AbstractPath, Ars};
use crate::domain::Precision;
use crate::system::System;

/// Callbacks fired at the loop's interesting moments. All methods default
/// to no-ops so an observer implements only what it cares about.
pub trait LoopObserver {
    /// After the checker finishes growing the reachability structure.
    fn on_ars(&mut self, sys: &System, ars: &Ars) {
        let _ = (sys, ars);
    }

    /// When the checker reports an abstract counterexample.
    fn on_counterexample(&mut self, sys: &System, ars: &Ars, path: &AbstractPath) {
        let _ = (sys, ars, path);
    }

    /// After a refinement round grows the precision.
    fn on_precision(&mut self, prec: &Precision) {
        let _ = prec;
    }
}

/// Observer that logs reachability-structure snapshots through `tracing`.
#[derive(Debug, Default)]
pub struct SnapshotDump;

impl LoopObserver for SnapshotDump {
    fn on_ars(&mut self, sys: &System, ars: &Ars) {
        tracing::debug!(nodes = ars.len(), "reachability structure\n{}", ars.render(sys));
    }

    fn on_counterexample(&mut self, sys: &System, ars: &Ars, path: &AbstractPath) {
        let steps: Vec<String> = path
            .actions
            .iter()
            .map(|a| sys.describe_action(*a))
            .collect();
        let _ = ars;
        tracing::debug!(len = path.actions.len(), "abstract counterexample: {}", steps.join("; "));
    }

    fn on_precision(&mut self, prec: &Precision) {
        tracing::debug!(size = prec.len(), "precision now {prec}");
    }
}
