//! The `WaveformBackend` port: a parsed waveform source that the facade
//! queries without knowing which concrete format backs it.
//!
//! A backend owns the parsed waveform file and answers point/range queries
//! over raw transitions. The facade in [`super::WaveformDb`] wraps a backend
//! with the handle-indexed signal cache; backends themselves stay dumb and
//! synchronous so they're trivial to fake in tests.

use std::collections::HashMap;

use crate::errors::WaveScoutResult;
use crate::types::{SignalHandle, Time};
use crate::value::RawValue;

/// One transition in a signal's value history.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub time: Time,
    pub value: RawValue,
}

/// A named scope/variable node in the design hierarchy, as exposed to the
/// (out-of-scope) browser pane and to handle lookup by path.
#[derive(Debug, Clone, PartialEq)]
pub enum HierarchyEntry {
    Scope { name: String, children: Vec<HierarchyEntry> },
    Variable { name: String, handle: SignalHandle, bit_width: u32 },
}

/// Query result for a single point in time: the value active at that time,
/// plus the time of the next transition, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalQueryResult {
    pub value: RawValue,
    pub next_time: Option<Time>,
}

/// Port over a parsed waveform source. `WaveformDb` is the sole consumer;
/// nothing above the DB layer talks to a backend directly.
pub trait WaveformBackend: Send + Sync {
    /// Top of the design hierarchy.
    fn hierarchy(&self) -> &HierarchyEntry;

    /// Resolves a dot-separated hierarchical path to a handle.
    fn find_handle_by_path(&self, path: &str) -> Option<SignalHandle>;

    /// Bit width of a signal, needed by the value parser.
    fn bit_width(&self, handle: SignalHandle) -> Option<u32>;

    /// The value active at `time` and the time of the following transition,
    /// or `None` if `handle` is unknown.
    fn query_signal(&self, handle: SignalHandle, time: Time) -> WaveScoutResult<SignalQueryResult>;

    /// All transitions for a signal in `[start, end]`, inclusive. Used by
    /// the analog renderer's range queries and by full-history
    /// export/debugging.
    fn transitions(&self, handle: SignalHandle, start: Time, end: Time) -> WaveScoutResult<Vec<Transition>>;

    /// The maximum valid time recorded anywhere in the waveform.
    fn max_time(&self) -> Time;

    /// The file's declared timescale.
    fn timescale(&self) -> crate::types::Timescale;

    /// Every timestamp at which any signal transitions, strictly increasing.
    /// Drives the ruler's tick placement and "snap to next transition"
    /// navigation.
    fn time_table(&self) -> Vec<Time>;

    /// Every handle paired with every hierarchical path that resolves to
    /// it. A handle appears more than once in the design hierarchy when two
    /// VCD identifiers alias the same underlying variable; the default
    /// implementation walks [`Self::hierarchy`] to recover that grouping,
    /// so a backend only needs to override this if it tracks aliasing more
    /// directly than its own hierarchy tree.
    fn iter_handles_and_vars(&self) -> Vec<(SignalHandle, Vec<String>)> {
        let mut by_handle: HashMap<SignalHandle, Vec<String>> = HashMap::new();
        collect_paths(self.hierarchy(), "", &mut by_handle);
        by_handle.into_iter().collect()
    }
}

fn collect_paths(entry: &HierarchyEntry, prefix: &str, out: &mut HashMap<SignalHandle, Vec<String>>) {
    match entry {
        HierarchyEntry::Scope { name, children } => {
            let next_prefix = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}.{name}")
            };
            for child in children {
                collect_paths(child, &next_prefix, out);
            }
        }
        HierarchyEntry::Variable { name, handle, .. } => {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}.{name}")
            };
            out.entry(*handle).or_default().push(path);
        }
    }
}
