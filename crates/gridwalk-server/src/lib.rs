//! Gridwalk simulation server library.
//!
//! The server accepts a single active client session, runs weighted
//! random-walk simulations on request, and streams per-step STATE messages
//! back over the connection. Three long-lived workers share one session
//! record:
//!
//! ```text
//! serve()        -- accept loop, admits new connections
//! control loop   -- per-connection, handles START / QUIT / disconnect
//! run_engine()   -- walk engine, advances the active simulation
//! ```

pub mod config;
pub mod engine;
pub mod session;

pub use config::{ConfigError, ServerConfig};
pub use engine::run_engine;
pub use session::{serve, ServerState};
