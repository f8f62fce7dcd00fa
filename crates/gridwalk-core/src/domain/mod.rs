//! Pure simulation domain: validated run parameters, the weighted random
//! walk over a toroidal grid, and the per-run statistics aggregator.
//!
//! Nothing in this module touches the network; the server's walk engine and
//! the protocol codec are both built on these types.

pub mod params;
pub mod results;
pub mod walk;

pub use params::{ParamError, SimulationParameters};
pub use results::{Results, RunSummary, StepStats};
pub use walk::{sample_direction, wrap, Direction, WalkRng, WalkState};
