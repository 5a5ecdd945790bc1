//! Waveform DB Facade: the sole entry point the rest of the core uses
//! to read waveform data. Wraps a [`backend::WaveformBackend`] with the
//! handle-indexed [`cache::SignalCache`], so callers never see backend-
//! specific decode cost after the first touch.

pub mod backend;
pub mod cache;
pub mod vcd_backend;

use std::path::Path;

use crate::config::BackendChoice;
use crate::errors::WaveScoutResult;
use crate::types::{SignalHandle, Time, Timescale};
use backend::{HierarchyEntry, SignalQueryResult, Transition, WaveformBackend};
use cache::SignalCache;

pub struct WaveformDb {
    backend: Box<dyn WaveformBackend>,
    cache: SignalCache,
}

impl WaveformDb {
    pub fn new(backend: Box<dyn WaveformBackend>) -> Self {
        Self {
            backend,
            cache: SignalCache::new(),
        }
    }

    /// Opens a waveform file using the backend selected by `choice`.
    pub fn open(path: &Path, choice: BackendChoice) -> WaveScoutResult<Self> {
        let backend: Box<dyn WaveformBackend> = match choice {
            BackendChoice::Vcd => Box::new(vcd_backend::load_vcd_file(path)?),
        };
        Ok(Self::new(backend))
    }

    pub fn hierarchy(&self) -> &HierarchyEntry {
        self.backend.hierarchy()
    }

    pub fn find_handle_by_path(&self, path: &str) -> Option<SignalHandle> {
        self.backend.find_handle_by_path(path)
    }

    pub fn bit_width(&self, handle: SignalHandle) -> Option<u32> {
        self.backend.bit_width(handle)
    }

    pub fn max_time(&self) -> Time {
        self.backend.max_time()
    }

    pub fn timescale(&self) -> Timescale {
        self.backend.timescale()
    }

    /// Point query, used directly by the sampling pipeline; not
    /// cached itself since the sampling loop already walks transitions one
    /// at a time and a full-range decode would be wasted work for a single
    /// point.
    pub fn query_signal(&self, handle: SignalHandle, time: Time) -> WaveScoutResult<SignalQueryResult> {
        self.backend.query_signal(handle, time)
    }

    /// Full decode of a signal's transitions in `[start, end]`, coalesced
    /// across concurrent callers via the single-flight cache. Used by the
    /// analog renderer's range queries.
    ///
    /// The cache keys only on handle, not range, so the first caller's range
    /// decides what's cached; widening a later query re-decodes. Acceptable
    /// since range queries in practice request the same full-signal range
    /// repeatedly (one per repaint) rather than varying windows.
    pub fn get_signal(&self, handle: SignalHandle, start: Time, end: Time) -> WaveScoutResult<Vec<Transition>> {
        let backend = &self.backend;
        let decoded = self
            .cache
            .get_or_decode(handle, || backend.transitions(handle, start, end))?;
        Ok((*decoded.transitions).clone())
    }

    pub fn invalidate(&self, handle: SignalHandle) {
        self.cache.invalidate(handle);
    }

    /// Every timestamp at which any signal transitions, used by the
    /// ruler and by "snap to next transition" navigation.
    pub fn get_time_table(&self) -> Vec<Time> {
        self.backend.time_table()
    }

    /// Every handle paired with the hierarchical paths that alias to it.
    pub fn iter_handles_and_vars(&self) -> Vec<(SignalHandle, Vec<String>)> {
        self.backend.iter_handles_and_vars()
    }

    /// Convenience point-query returning only the active value, for callers
    /// that don't need the next-transition time `query_signal` also
    /// returns.
    pub fn sample(&self, handle: SignalHandle, time: Time) -> WaveScoutResult<crate::value::RawValue> {
        Ok(self.query_signal(handle, time)?.value)
    }

    pub fn is_signal_cached(&self, handle: SignalHandle) -> bool {
        self.cache.contains(handle)
    }

    pub fn clear_signal_cache(&self) {
        self.cache.clear();
    }

    /// Decodes `handles` ahead of time so later `get_signal` calls hit the
    /// cache. `multithreaded` fans the decode out across `std::thread::scope`
    /// since the backend is `Send + Sync` and the cache is single-flight per
    /// handle; sequential decode is simpler and fine for small selections.
    pub fn preload_signals(&self, handles: &[SignalHandle], multithreaded: bool) {
        let max_time = self.max_time();
        let decode_one = |handle: SignalHandle| {
            let _ = self.get_signal(handle, 0, max_time);
        };
        if multithreaded && handles.len() > 1 {
            std::thread::scope(|scope| {
                for &handle in handles {
                    scope.spawn(move || decode_one(handle));
                }
            });
        } else {
            for &handle in handles {
                decode_one(handle);
            }
        }
    }
}

#[cfg(test)]
pub mod test_support {
    //! In-memory fake backend for fixture-free tests, used by the
    //! sampling/controller/canvas test modules in addition to this one.

    use super::backend::*;
    use crate::errors::{DataError, WaveScoutError, WaveScoutResult};
    use crate::types::{SignalHandle, Time, Timescale};
    use crate::value::RawValue;
    use std::collections::HashMap;

    pub struct FakeBackend {
        pub hierarchy: HierarchyEntry,
        pub signals: HashMap<SignalHandle, (u32, Vec<(Time, RawValue)>)>,
        pub max_time: Time,
        pub timescale: Timescale,
    }

    impl FakeBackend {
        pub fn single_signal(handle: SignalHandle, bit_width: u32, transitions: Vec<(Time, RawValue)>) -> Self {
            let max_time = transitions.last().map(|(t, _)| *t).unwrap_or(0);
            let mut signals = HashMap::new();
            signals.insert(handle, (bit_width, transitions));
            Self {
                hierarchy: HierarchyEntry::Scope {
                    name: "top".to_string(),
                    children: vec![HierarchyEntry::Variable {
                        name: "sig".to_string(),
                        handle,
                        bit_width,
                    }],
                },
                signals,
                max_time,
                timescale: Timescale::default(),
            }
        }
    }

    impl WaveformBackend for FakeBackend {
        fn hierarchy(&self) -> &HierarchyEntry {
            &self.hierarchy
        }

        fn find_handle_by_path(&self, _path: &str) -> Option<SignalHandle> {
            self.signals.keys().next().copied()
        }

        fn bit_width(&self, handle: SignalHandle) -> Option<u32> {
            self.signals.get(&handle).map(|(w, _)| *w)
        }

        fn query_signal(&self, handle: SignalHandle, time: Time) -> WaveScoutResult<SignalQueryResult> {
            let (_, transitions) = self
                .signals
                .get(&handle)
                .ok_or_else(|| WaveScoutError::Data(DataError::UnknownHandle(handle)))?;
            let idx = match transitions.binary_search_by_key(&time, |(t, _)| *t) {
                Ok(i) => i,
                Err(0) => {
                    return Ok(SignalQueryResult {
                        value: RawValue::Undefined,
                        next_time: transitions.first().map(|(t, _)| *t),
                    })
                }
                Err(i) => i - 1,
            };
            Ok(SignalQueryResult {
                value: transitions[idx].1.clone(),
                next_time: transitions.get(idx + 1).map(|(t, _)| *t),
            })
        }

        fn transitions(&self, handle: SignalHandle, start: Time, end: Time) -> WaveScoutResult<Vec<Transition>> {
            let (_, transitions) = self
                .signals
                .get(&handle)
                .ok_or_else(|| WaveScoutError::Data(DataError::UnknownHandle(handle)))?;
            Ok(transitions
                .iter()
                .filter(|(t, _)| *t >= start && *t <= end)
                .map(|(t, v)| Transition { time: *t, value: v.clone() })
                .collect())
        }

        fn max_time(&self) -> Time {
            self.max_time
        }

        fn timescale(&self) -> Timescale {
            self.timescale
        }

        fn time_table(&self) -> Vec<Time> {
            let mut times: Vec<Time> = self
                .signals
                .values()
                .flat_map(|(_, transitions)| transitions.iter().map(|(t, _)| *t))
                .collect();
            times.sort_unstable();
            times.dedup();
            times
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::FakeBackend;
    use super::*;
    use crate::value::RawValue;

    #[test]
    fn facade_caches_across_calls() {
        let backend = FakeBackend::single_signal(
            1,
            8,
            vec![(0, RawValue::Bits(0, 8)), (10, RawValue::Bits(1, 8))],
        );
        let db = WaveformDb::new(Box::new(backend));
        let first = db.get_signal(1, 0, 100).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(db.max_time(), 10);
        // Second call hits the cache; result should be identical.
        let second = db.get_signal(1, 0, 100).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn point_query_returns_active_value() {
        let backend = FakeBackend::single_signal(
            1,
            8,
            vec![(0, RawValue::Bits(0, 8)), (10, RawValue::Bits(1, 8))],
        );
        let db = WaveformDb::new(Box::new(backend));
        let result = db.query_signal(1, 5).unwrap();
        assert_eq!(result.value, RawValue::Bits(0, 8));
        assert_eq!(result.next_time, Some(10));
    }

    #[test]
    fn sample_returns_only_the_value() {
        let backend = FakeBackend::single_signal(1, 8, vec![(0, RawValue::Bits(0, 8)), (10, RawValue::Bits(1, 8))]);
        let db = WaveformDb::new(Box::new(backend));
        assert_eq!(db.sample(1, 10).unwrap(), RawValue::Bits(1, 8));
    }

    #[test]
    fn time_table_is_sorted_and_deduplicated() {
        let backend = FakeBackend::single_signal(1, 8, vec![(0, RawValue::Bits(0, 8)), (10, RawValue::Bits(1, 8))]);
        let db = WaveformDb::new(Box::new(backend));
        assert_eq!(db.get_time_table(), vec![0, 10]);
    }

    #[test]
    fn preload_then_cached() {
        let backend = FakeBackend::single_signal(1, 8, vec![(0, RawValue::Bits(0, 8))]);
        let db = WaveformDb::new(Box::new(backend));
        assert!(!db.is_signal_cached(1));
        db.preload_signals(&[1], true);
        assert!(db.is_signal_cached(1));
        db.clear_signal_cache();
        assert!(!db.is_signal_cached(1));
    }

    #[test]
    fn iter_handles_and_vars_reports_the_signal_path() {
        let backend = FakeBackend::single_signal(1, 8, vec![(0, RawValue::Bits(0, 8))]);
        let db = WaveformDb::new(Box::new(backend));
        let entries = db.iter_handles_and_vars();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, 1);
        assert_eq!(entries[0].1, vec!["top.sig".to_string()]);
    }
}
