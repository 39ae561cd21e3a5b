//! Accumulated wall-clock time per named phase

use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default)]
struct PhaseStats {
    total: Duration,
    calls: usize,
}

/// Times closures under a phase name (`record`, `playback`, ...).
#[derive(Debug, Default)]
pub struct PhaseProfiler {
    phases: HashMap<String, PhaseStats>,
}

impl PhaseProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f`, adding its elapsed time to `name`.
    pub fn time_phase<F, R>(&mut self, name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        let stats = self.phases.entry(name.to_owned()).or_default();
        stats.total += elapsed;
        stats.calls += 1;
        result
    }

    /// Total time spent in `name` across all calls.
    pub fn timing(&self, name: &str) -> Duration {
        self.phases.get(name).map_or(Duration::ZERO, |s| s.total)
    }

    pub fn calls(&self, name: &str) -> usize {
        self.phases.get(name).map_or(0, |s| s.calls)
    }

    pub fn reset(&mut self) {
        self.phases.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Duration)> {
        self.phases.iter().map(|(name, s)| (name.as_str(), s.total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_accumulate_calls_and_time() {
        let mut profiler = PhaseProfiler::new();
        let a = profiler.time_phase("record", || {
            std::thread::sleep(Duration::from_millis(2));
            1
        });
        let b = profiler.time_phase("record", || 2);
        assert_eq!(a + b, 3);
        assert_eq!(profiler.calls("record"), 2);
        assert!(profiler.timing("record") >= Duration::from_millis(2));
        assert_eq!(profiler.timing("playback"), Duration::ZERO);
    }

    #[test]
    fn reset_forgets_every_phase() {
        let mut profiler = PhaseProfiler::new();
        profiler.time_phase("playback", || ());
        profiler.reset();
        assert_eq!(profiler.iter().count(), 0);
        assert_eq!(profiler.calls("playback"), 0);
    }
}
