//! Simulation run parameters and their validation rules.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A parameter set that violates the acceptance rules for a START request.
///
/// Rejection is wholesale: a request that fails any rule is discarded without
/// applying any of its fields.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamError {
    /// Grid dimensions below 2 leave no room to walk.
    #[error("grid {dimension} must be at least 2, got {value}")]
    GridTooSmall {
        dimension: &'static str,
        value: i32,
    },

    /// A step budget of zero would end every replication before it starts.
    #[error("k_max must be at least 1")]
    ZeroStepBudget,

    /// At least one replication is required.
    #[error("reps must be at least 1")]
    ZeroReplications,

    /// The four direction percentages must sum to exactly 100.
    #[error("direction percentages must sum to 100, got {sum}")]
    BadPercentSum { sum: u32 },
}

/// Parameters for one simulation run, exactly as carried by a START message.
///
/// Field order matches the packed 24-byte wire layout; see the codec module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationParameters {
    /// Grid width in cells, ≥ 2.
    pub width: i32,
    /// Grid height in cells, ≥ 2.
    pub height: i32,
    /// Step budget per replication, ≥ 1.
    pub k_max: u32,
    /// Number of replications, ≥ 1.
    pub reps: u32,
    /// RNG seed; 0 asks the server to pick a time-derived seed.
    pub seed: u32,
    /// Percentage weight for moving up (towards row 0).
    pub p_up: u8,
    /// Percentage weight for moving down.
    pub p_down: u8,
    /// Percentage weight for moving left (towards column 0).
    pub p_left: u8,
    /// Percentage weight for moving right.
    pub p_right: u8,
}

impl SimulationParameters {
    /// Sum of the four direction percentages.
    pub fn percent_sum(&self) -> u32 {
        self.p_up as u32 + self.p_down as u32 + self.p_left as u32 + self.p_right as u32
    }

    /// Checks every acceptance rule; the first violated rule is reported.
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.width < 2 {
            return Err(ParamError::GridTooSmall {
                dimension: "width",
                value: self.width,
            });
        }
        if self.height < 2 {
            return Err(ParamError::GridTooSmall {
                dimension: "height",
                value: self.height,
            });
        }
        if self.k_max == 0 {
            return Err(ParamError::ZeroStepBudget);
        }
        if self.reps == 0 {
            return Err(ParamError::ZeroReplications);
        }
        let sum = self.percent_sum();
        if sum != 100 {
            return Err(ParamError::BadPercentSum { sum });
        }
        Ok(())
    }

    /// The cell every replication starts from: the centre of the grid.
    pub fn start_cell(&self) -> (i32, i32) {
        (self.width / 2, self.height / 2)
    }
}
