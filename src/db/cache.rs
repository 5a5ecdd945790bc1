//! Single-flight signal cache: concurrent decode requests for the same
//! handle coalesce to one decode rather than each re-walking the trace.
//!
//! Shares the `Arc<Mutex<..>>` sharing pattern used for load-progress
//! reporting elsewhere in the crate, generalized from a single counter to a
//! per-handle decode cache shared across threads.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::db::backend::Transition;
use crate::types::SignalHandle;

/// A decoded signal: its full transition list, cached after first decode.
#[derive(Debug, Clone)]
pub struct DecodedSignal {
    pub transitions: Arc<Vec<Transition>>,
}

/// Thread-safe cache mapping handle to decoded signal. A `Mutex<HashMap>` is
/// enough here: the backend's `transitions()` call is the expensive step,
/// and holding the lock across that call makes concurrent requests for the
/// same handle block on each other rather than both decoding (the
/// single-flight property), at the cost of serializing unrelated handles too
/// — acceptable since waveform decode is I/O/CPU bound, not contended on in
/// the hot render path once warm.
#[derive(Debug, Default)]
pub struct SignalCache {
    inner: Mutex<HashMap<SignalHandle, DecodedSignal>>,
}

impl SignalCache {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached decode for `handle`, computing and storing it via
    /// `decode` on a miss. Concurrent callers for the same handle serialize
    /// on the cache lock rather than decoding twice.
    pub fn get_or_decode<F>(&self, handle: SignalHandle, decode: F) -> crate::errors::WaveScoutResult<DecodedSignal>
    where
        F: FnOnce() -> crate::errors::WaveScoutResult<Vec<Transition>>,
    {
        let mut guard = self.inner.lock().expect("signal cache mutex poisoned");
        if let Some(existing) = guard.get(&handle) {
            return Ok(existing.clone());
        }
        let transitions = decode()?;
        let decoded = DecodedSignal {
            transitions: Arc::new(transitions),
        };
        guard.insert(handle, decoded.clone());
        Ok(decoded)
    }

    pub fn invalidate(&self, handle: SignalHandle) {
        self.inner.lock().expect("signal cache mutex poisoned").remove(&handle);
    }

    pub fn clear(&self) {
        self.inner.lock().expect("signal cache mutex poisoned").clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("signal cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, handle: SignalHandle) -> bool {
        self.inner.lock().expect("signal cache mutex poisoned").contains_key(&handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::RawValue;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn second_get_does_not_redecode() {
        let cache = SignalCache::new();
        let decode_calls = AtomicUsize::new(0);
        let decode = || {
            decode_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Transition {
                time: 0,
                value: RawValue::Bits(1, 1),
            }])
        };
        cache.get_or_decode(1, decode).unwrap();
        let decode_calls_2 = AtomicUsize::new(0);
        cache
            .get_or_decode(1, || {
                decode_calls_2.fetch_add(1, Ordering::SeqCst);
                Ok(vec![])
            })
            .unwrap();
        assert_eq!(decode_calls.load(Ordering::SeqCst), 1);
        assert_eq!(decode_calls_2.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn invalidate_forces_redecode() {
        let cache = SignalCache::new();
        cache
            .get_or_decode(5, || Ok(vec![]))
            .unwrap();
        assert_eq!(cache.len(), 1);
        cache.invalidate(5);
        assert!(cache.is_empty());
    }
}
