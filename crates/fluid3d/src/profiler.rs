//! Per-stage call counts and timings, owned by the simulation.

use std::fmt::Write as _;
use std::time::{Duration, Instant};

/// Pipeline stage being timed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Diffuse,
    Project,
    Advect,
    Voxelize,
    /// One full `step()`
    Step,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Diffuse,
        Stage::Project,
        Stage::Advect,
        Stage::Voxelize,
        Stage::Step,
    ];

    fn slot(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::Diffuse => "diffuse",
            Stage::Project => "project",
            Stage::Advect => "advect",
            Stage::Voxelize => "voxelize",
            Stage::Step => "step",
        }
    }
}

/// Accumulated timings for one stage.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StageStats {
    pub calls: u64,
    pub total: Duration,
    pub last: Duration,
}

impl StageStats {
    pub fn mean(&self) -> Duration {
        if self.calls == 0 {
            Duration::ZERO
        } else {
            self.total.div_f64(self.calls as f64)
        }
    }
}

/// Rolling average calculator for smoothing step times
#[derive(Clone, Debug)]
pub struct RollingAverage {
    values: Vec<f32>,
    capacity: usize,
}

impl RollingAverage {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: f32) {
        if self.capacity == 0 {
            return;
        }
        if self.values.len() >= self.capacity {
            self.values.remove(0);
        }
        self.values.push(value);
    }

    pub fn average(&self) -> f32 {
        if self.values.is_empty() {
            0.0
        } else {
            self.values.iter().sum::<f32>() / self.values.len() as f32
        }
    }
}

/// Owned profiling context for one simulation.
#[derive(Clone, Debug)]
pub struct StepProfiler {
    enabled: bool,
    stats: [StageStats; Stage::ALL.len()],
    step_ms: RollingAverage,
}

impl Default for StepProfiler {
    fn default() -> Self {
        Self::new()
    }
}

impl StepProfiler {
    pub fn new() -> Self {
        Self {
            enabled: true,
            stats: [StageStats::default(); Stage::ALL.len()],
            step_ms: RollingAverage::new(60),
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Start timing. `None` when profiling is off.
    #[inline]
    pub fn start(&self) -> Option<Instant> {
        self.enabled.then(Instant::now)
    }

    /// Record a stage started by [`StepProfiler::start`].
    #[inline]
    pub fn finish(&mut self, stage: Stage, start: Option<Instant>) {
        if let Some(start) = start {
            self.record(stage, start.elapsed());
        }
    }

    pub fn record(&mut self, stage: Stage, elapsed: Duration) {
        let stats = &mut self.stats[stage.slot()];
        stats.calls += 1;
        stats.total += elapsed;
        stats.last = elapsed;

        if stage == Stage::Step {
            self.step_ms.push(elapsed.as_secs_f32() * 1000.0);
        }
    }

    pub fn stats(&self, stage: Stage) -> StageStats {
        self.stats[stage.slot()]
    }

    /// Mean of the most recent step times, in milliseconds.
    pub fn recent_step_ms(&self) -> f32 {
        self.step_ms.average()
    }

    pub fn reset(&mut self) {
        self.stats = [StageStats::default(); Stage::ALL.len()];
        self.step_ms = RollingAverage::new(60);
    }

    /// One line per stage that has been called.
    pub fn format_summary(&self) -> String {
        let mut out = String::new();
        for stage in Stage::ALL {
            let s = self.stats(stage);
            if s.calls == 0 {
                continue;
            }
            let _ = writeln!(
                out,
                "{:<9} calls={:<6} total={:>9.3}ms mean={:>7.3}ms",
                stage.name(),
                s.calls,
                s.total.as_secs_f64() * 1000.0,
                s.mean().as_secs_f64() * 1000.0,
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accumulates() {
        let mut p = StepProfiler::new();
        p.record(Stage::Advect, Duration::from_millis(2));
        p.record(Stage::Advect, Duration::from_millis(4));

        let s = p.stats(Stage::Advect);
        assert_eq!(s.calls, 2);
        assert_eq!(s.total, Duration::from_millis(6));
        assert_eq!(s.last, Duration::from_millis(4));
        assert!(s.mean().abs_diff(Duration::from_millis(3)) <= Duration::from_nanos(1));
        assert_eq!(p.stats(Stage::Diffuse).calls, 0);
    }

    #[test]
    fn test_mean_with_more_calls_than_u32() {
        let stats = StageStats {
            calls: u32::MAX as u64 + 1,
            total: Duration::from_secs(1 << 32),
            last: Duration::from_secs(1),
        };
        assert!(stats.mean().abs_diff(Duration::from_secs(1)) <= Duration::from_micros(1));
        assert_eq!(StageStats::default().mean(), Duration::ZERO);
    }

    #[test]
    fn test_disabled_profiler_records_nothing() {
        let mut p = StepProfiler::new();
        p.set_enabled(false);
        let start = p.start();
        assert!(start.is_none());
        p.finish(Stage::Step, start);
        assert_eq!(p.stats(Stage::Step).calls, 0);
    }

    #[test]
    fn test_summary_lists_called_stages() {
        let mut p = StepProfiler::new();
        p.record(Stage::Project, Duration::from_micros(500));
        let summary = p.format_summary();
        assert!(summary.contains("project"));
        assert!(!summary.contains("voxelize"));
    }

    #[test]
    fn test_rolling_average_window() {
        let mut avg = RollingAverage::new(2);
        avg.push(1.0);
        avg.push(3.0);
        avg.push(5.0);
        assert_eq!(avg.average(), 4.0);
    }
}
