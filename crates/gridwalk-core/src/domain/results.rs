//! Per-run statistics: replication outcomes accumulated into a summary.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::params::SimulationParameters;

/// Histogram bin upper bounds for successful replications, in steps.
///
/// Bin 0 holds runs home in at most 20 steps, bin 1 at most 50, bin 2 at most
/// 100, and bin 3 everything longer.
pub const BIN_BOUNDS: [u32; 3] = [20, 50, 100];

/// Accumulates the outcome of each replication in one simulation run.
///
/// Reset at every START; fed once per completed replication; summarized only
/// after the whole run finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Results {
    /// Parameters of the run being aggregated, echoed into the summary.
    pub params: SimulationParameters,
    /// Replications requested for this run.
    pub reps_total: u32,
    /// Replications that reached the origin within the step budget.
    pub success_count: u32,
    /// Replications that exhausted `k_max` without reaching the origin.
    pub fail_count: u32,
    /// Sum of step counts over successful replications.
    pub sum_steps_success: u64,
    /// Fewest steps any successful replication took. `u32::MAX` until the
    /// first success so any real count lowers it.
    pub min_steps: u32,
    /// Most steps any successful replication took.
    pub max_steps: u32,
    /// Step-count histogram over successful replications.
    pub bins: [u32; 4],
}

impl Results {
    /// A fresh aggregator for a run of `params.reps` replications.
    pub fn new(params: &SimulationParameters) -> Self {
        Results {
            params: *params,
            reps_total: params.reps,
            success_count: 0,
            fail_count: 0,
            sum_steps_success: 0,
            min_steps: u32::MAX,
            max_steps: 0,
            bins: [0; 4],
        }
    }

    /// Picks the histogram bin for a successful replication's step count.
    fn bin_for(steps: u32) -> usize {
        if steps <= BIN_BOUNDS[0] {
            0
        } else if steps <= BIN_BOUNDS[1] {
            1
        } else if steps <= BIN_BOUNDS[2] {
            2
        } else {
            3
        }
    }

    /// Records one completed replication.
    pub fn record(&mut self, steps: u32, success: bool) {
        if success {
            self.success_count += 1;
            self.sum_steps_success += steps as u64;
            self.min_steps = self.min_steps.min(steps);
            self.max_steps = self.max_steps.max(steps);
            self.bins[Self::bin_for(steps)] += 1;
        } else {
            self.fail_count += 1;
        }
    }

    /// Read-only summary of the run so far.
    pub fn report(&self) -> RunSummary {
        let completed = self.success_count + self.fail_count;
        let success_pct = if completed > 0 {
            self.success_count as f64 * 100.0 / completed as f64
        } else {
            0.0
        };
        let steps = if self.success_count > 0 {
            Some(StepStats {
                mean: self.sum_steps_success as f64 / self.success_count as f64,
                min: self.min_steps,
                max: self.max_steps,
            })
        } else {
            None
        };
        RunSummary {
            params: self.params,
            reps_total: self.reps_total,
            success_count: self.success_count,
            fail_count: self.fail_count,
            success_pct,
            steps,
            bins: self.bins,
        }
    }
}

/// Step-count statistics over successful replications.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepStats {
    pub mean: f64,
    pub min: u32,
    pub max: u32,
}

/// Snapshot summary of one run, suitable for logging or display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Parameters the run was started with.
    pub params: SimulationParameters,
    pub reps_total: u32,
    pub success_count: u32,
    pub fail_count: u32,
    pub success_pct: f64,
    /// `None` when no replication succeeded.
    pub steps: Option<StepStats>,
    pub bins: [u32; 4],
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "grid {}x{}, k_max {}, p(up/down/left/right) {}/{}/{}/{}%",
            self.params.width,
            self.params.height,
            self.params.k_max,
            self.params.p_up,
            self.params.p_down,
            self.params.p_left,
            self.params.p_right
        )?;
        writeln!(
            f,
            "replications: {} ({} succeeded, {} failed, {:.1}% success)",
            self.reps_total, self.success_count, self.fail_count, self.success_pct
        )?;
        match &self.steps {
            Some(s) => writeln!(
                f,
                "steps to origin: mean {:.2}, min {}, max {}",
                s.mean, s.min, s.max
            )?,
            None => writeln!(f, "steps to origin: n/a (no successful replication)")?,
        }
        write!(
            f,
            "histogram: <=20: {}  <=50: {}  <=100: {}  >100: {}",
            self.bins[0], self.bins[1], self.bins[2], self.bins[3]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SimulationParameters {
        SimulationParameters {
            width: 10,
            height: 10,
            k_max: 200,
            reps: 5,
            seed: 42,
            p_up: 25,
            p_down: 25,
            p_left: 25,
            p_right: 25,
        }
    }

    #[test]
    fn test_new_aggregator_starts_empty() {
        let r = Results::new(&params());
        assert_eq!(r.reps_total, 5);
        assert_eq!(r.success_count, 0);
        assert_eq!(r.fail_count, 0);
        assert_eq!(r.min_steps, u32::MAX);
        assert_eq!(r.max_steps, 0);
        assert_eq!(r.bins, [0; 4]);
    }

    #[test]
    fn test_first_success_sets_min_and_max() {
        let mut r = Results::new(&params());
        r.record(37, true);
        assert_eq!(r.min_steps, 37);
        assert_eq!(r.max_steps, 37);
        assert_eq!(r.sum_steps_success, 37);
    }

    #[test]
    fn test_histogram_bin_boundaries() {
        let mut r = Results::new(&params());
        for steps in [1, 20, 21, 50, 51, 100, 101, 5000] {
            r.record(steps, true);
        }
        assert_eq!(r.bins, [2, 2, 2, 2]);
    }

    #[test]
    fn test_failures_touch_only_fail_count() {
        let mut r = Results::new(&params());
        r.record(200, false);
        r.record(200, false);
        assert_eq!(r.fail_count, 2);
        assert_eq!(r.success_count, 0);
        assert_eq!(r.bins, [0; 4]);
        assert_eq!(r.min_steps, u32::MAX);
        assert_eq!(r.sum_steps_success, 0);
    }

    #[test]
    fn test_bins_partition_successes() {
        let mut r = Results::new(&params());
        r.record(10, true);
        r.record(45, true);
        r.record(99, true);
        r.record(200, false);
        r.record(130, true);
        let bin_sum: u32 = r.bins.iter().sum();
        assert_eq!(bin_sum, r.success_count);
        assert_eq!(r.success_count + r.fail_count, r.reps_total);
    }

    #[test]
    fn test_report_mean_min_max() {
        let mut r = Results::new(&params());
        r.record(10, true);
        r.record(30, true);
        r.record(200, false);
        let summary = r.report();
        let steps = summary.steps.expect("has successes");
        assert!((steps.mean - 20.0).abs() < f64::EPSILON);
        assert_eq!(steps.min, 10);
        assert_eq!(steps.max, 30);
        assert!((summary.success_pct - 2.0 * 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_report_with_no_successes_omits_step_stats() {
        let mut r = Results::new(&params());
        r.record(200, false);
        let summary = r.report();
        assert!(summary.steps.is_none());
        assert_eq!(summary.success_pct, 0.0);
    }

    #[test]
    fn test_summary_display_mentions_counts_and_bins() {
        let mut r = Results::new(&params());
        r.record(15, true);
        r.record(200, false);
        let text = r.report().to_string();
        assert!(text.contains("grid 10x10"));
        assert!(text.contains("1 succeeded"));
        assert!(text.contains("1 failed"));
        assert!(text.contains("<=20: 1"));
    }
}
