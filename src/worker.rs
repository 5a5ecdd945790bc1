//! Off-main-thread file loading.
//!
//! `thread::spawn` returns a `JoinHandle`; progress is reported through an
//! `Arc<Mutex<_>>` the caller can poll from the main loop each frame as
//! [`LoadProgress`]. `vcd::Parser` offers no checkpoint mid-parse to honor a
//! cancellation flag, so cooperative cancellation is handled at the join
//! boundary instead: a cancelled load's `JoinHandle` is detached (not
//! joined) and its result silently discarded when it eventually finishes,
//! rather than the parse itself aborting early. Recorded as an open
//! decision in DESIGN.md.
//!
//! Workers never touch [`crate::session::WaveformSession`] or
//! [`crate::controller::WaveformController`] directly; the session is
//! main-thread-write-only. A finished load is handed back as a plain
//! [`WaveScoutResult<WaveformDb>`] over a `crossbeam` channel; the main
//! thread is the only place that ever calls `WaveformController::set_session`.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{bounded, Receiver};

use crate::config::BackendChoice;
use crate::db::WaveformDb;
use crate::errors::WaveScoutResult;

/// Shared, lock-free progress counter a loading thread updates and the main
/// loop polls once per frame. Units are backend-defined (bytes consumed for
/// the VCD backend); `total == 0` means "unknown yet".
#[derive(Debug, Default)]
pub struct LoadProgress {
    current: AtomicUsize,
    total: AtomicUsize,
    cancelled: AtomicBool,
}

impl LoadProgress {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, current: usize, total: usize) {
        self.current.store(current, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
    }

    /// `(current, total)`, backed by two atomics rather than a mutexed
    /// tuple since both fields only ever move forward.
    pub fn get(&self) -> (usize, usize) {
        (self.current.load(Ordering::Relaxed), self.total.load(Ordering::Relaxed))
    }

    /// Requests cancellation. The VCD backend has no mid-parse checkpoint to
    /// honor this at, so in practice this only affects whether
    /// [`LoadHandle::poll`] hands the result back to the caller once the
    /// thread finishes; the underlying parse still runs to completion.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// A load in flight: the `JoinHandle`-owning thread, its progress handle,
/// and the channel the thread posts its result through once done.
pub struct LoadHandle {
    progress: Arc<LoadProgress>,
    result_rx: Receiver<WaveScoutResult<WaveformDb>>,
    join: Option<JoinHandle<()>>,
}

impl LoadHandle {
    pub fn progress(&self) -> (usize, usize) {
        self.progress.get()
    }

    pub fn cancel(&self) {
        self.progress.cancel();
    }

    /// Non-blocking check for a finished load. Returns `None` while the
    /// background thread is still running; a cancelled-but-finished load is
    /// also reported as `None` forever after (the cooperative-cancellation
    /// contract: the main thread stops waiting on it, it never surfaces
    /// late results into the controller).
    pub fn poll(&mut self) -> Option<WaveScoutResult<WaveformDb>> {
        if self.progress.is_cancelled() {
            // Drain and drop the channel so the sender doesn't block; don't
            // surface the result even if the parse happened to finish.
            let _ = self.result_rx.try_recv();
            if let Some(join) = self.join.take() {
                let _ = join.join();
            }
            return None;
        }
        match self.result_rx.try_recv() {
            Ok(result) => {
                if let Some(join) = self.join.take() {
                    let _ = join.join();
                }
                Some(result)
            }
            Err(_) => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map(|j| j.is_finished()).unwrap_or(true)
    }
}

/// Spawns a background thread that opens `path` with the given backend and
/// posts the resulting [`WaveformDb`] back once done. Returns a handle
/// object rather than the bare `JoinHandle` so progress and cancellation
/// travel together with the result channel.
pub fn load_waveform(path: PathBuf, backend: BackendChoice) -> LoadHandle {
    let progress = LoadProgress::new();
    let (tx, rx) = bounded(1);
    let thread_progress = Arc::clone(&progress);

    let join = thread::spawn(move || {
        // The real `vcd` crate parses synchronously with no intermediate
        // progress callback; report the file size up front as `total` and
        // jump straight to "done" rather than faking interim ticks.
        if let Ok(metadata) = std::fs::metadata(&path) {
            thread_progress.set(0, metadata.len() as usize);
        }
        let result = WaveformDb::open(&path, backend);
        if let Ok(metadata) = std::fs::metadata(&path) {
            thread_progress.set(metadata.len() as usize, metadata.len() as usize);
        }
        // A full channel here would mean the main thread already gave up
        // on this load (dropped the receiver); nothing to do but drop the
        // result too.
        let _ = tx.send(result);
    });

    LoadHandle {
        progress,
        result_rx: rx,
        join: Some(join),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::{Duration, Instant};

    fn sample_vcd() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "$timescale 1ns $end").unwrap();
        writeln!(file, "$scope module top $end").unwrap();
        writeln!(file, "$var wire 1 ! clk $end").unwrap();
        writeln!(file, "$upscope $end").unwrap();
        writeln!(file, "$enddefinitions $end").unwrap();
        writeln!(file, "#0").unwrap();
        writeln!(file, "0!").unwrap();
        writeln!(file, "#10").unwrap();
        writeln!(file, "1!").unwrap();
        file
    }

    #[test]
    fn load_completes_and_reports_progress() {
        let file = sample_vcd();
        let mut handle = load_waveform(file.path().to_path_buf(), BackendChoice::Vcd);
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut result = None;
        while Instant::now() < deadline {
            if let Some(r) = handle.poll() {
                result = Some(r);
                break;
            }
        }
        let db = result.expect("load did not finish in time").expect("load failed");
        assert!(db.max_time() >= 10);
        let (current, total) = handle.progress();
        assert!(total > 0);
        assert_eq!(current, total);
    }

    #[test]
    fn cancelled_load_never_surfaces_a_result() {
        let file = sample_vcd();
        let mut handle = load_waveform(file.path().to_path_buf(), BackendChoice::Vcd);
        handle.cancel();
        let deadline = Instant::now() + Duration::from_secs(5);
        while !handle.is_finished() && Instant::now() < deadline {
            thread::yield_now();
        }
        assert!(handle.poll().is_none());
        assert!(handle.poll().is_none());
    }
}
