//! The walk engine: a long-lived worker that advances the active simulation.
//!
//! The engine idles until a session enters the simulating phase, then runs
//! the requested replications one step at a time. Every step is computed
//! under the session lock, but the STATE frame is sent outside it so a slow
//! client cannot stall the control path. The epoch captured when the run
//! begins guards every access: if the session is replaced or torn down
//! mid-run, the engine aborts without emitting DONE.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use gridwalk_core::domain::walk::sample_direction;
use gridwalk_core::{send_message, SimulationParameters, StateUpdate, WalkMessage, WalkState};

use crate::session::{ServerState, SessionPhase};

/// Upper bound on how long the idle engine waits before re-checking for a
/// run. A wakeup lost between the check and the wait costs at most this much.
const IDLE_POLL: Duration = Duration::from_millis(100);

type SharedWriter = Arc<Mutex<OwnedWriteHalf>>;

/// Runs the walk engine until server shutdown.
pub async fn run_engine(state: Arc<ServerState>) {
    loop {
        if !state.running.load(Ordering::Relaxed) {
            debug!("walk engine stopping");
            return;
        }

        let simulating = {
            let guard = state.session.lock().await;
            matches!(
                guard.as_ref(),
                Some(s) if s.phase == SessionPhase::Simulating
            )
        };
        if !simulating {
            let _ = tokio::time::timeout(IDLE_POLL, state.sim_wakeup.notified()).await;
            continue;
        }

        run_simulation(&state).await;
    }
}

/// Executes one full run (all replications) for the currently active session.
async fn run_simulation(state: &ServerState) {
    let Some((epoch, params)) = snapshot_run(state).await else {
        return;
    };

    for rep in 1..=params.reps {
        if !begin_replication(state, epoch, rep).await {
            return;
        }

        loop {
            let Some((writer, update, rep_finished)) = advance_step(state, epoch, &params).await
            else {
                return;
            };

            if !stream_state(state, epoch, &writer, update).await {
                return;
            }
            if rep_finished {
                break;
            }
            tokio::time::sleep(state.step_delay).await;
        }
    }

    finish_run(state, epoch).await;
}

/// Captures the run's epoch and parameters, or `None` if no run is active.
async fn snapshot_run(state: &ServerState) -> Option<(u64, SimulationParameters)> {
    let guard = state.session.lock().await;
    let session = guard.as_ref()?;
    if session.phase != SessionPhase::Simulating {
        return None;
    }
    let run = session.run.as_ref()?;
    Some((session.epoch, run.params))
}

/// Resets the walker for replication `rep`. Returns false if the run is gone.
async fn begin_replication(state: &ServerState, epoch: u64, rep: u32) -> bool {
    let mut guard = state.session.lock().await;
    let Some(session) = guard.as_mut() else {
        return false;
    };
    if session.epoch != epoch
        || session.phase != SessionPhase::Simulating
        || !state.running.load(Ordering::Relaxed)
    {
        return false;
    }
    let Some(run) = session.run.as_mut() else {
        return false;
    };
    run.walk = WalkState::begin(&run.params);
    run.rep = rep;
    true
}

/// Takes one walk step under the lock.
///
/// Samples a direction, moves with wraparound, and if the step ended the
/// replication (origin reached or step budget exhausted) records the outcome
/// into the aggregator. Returns the writer captured under the lock, the STATE
/// update to stream, and whether the replication is over; `None` means the
/// run was aborted (QUIT, disconnect, or replacement).
async fn advance_step(
    state: &ServerState,
    epoch: u64,
    params: &SimulationParameters,
) -> Option<(SharedWriter, StateUpdate, bool)> {
    let mut guard = state.session.lock().await;
    let session = guard.as_mut()?;
    if session.epoch != epoch
        || session.phase != SessionPhase::Simulating
        || !state.running.load(Ordering::Relaxed)
    {
        return None;
    }
    let run = session.run.as_mut()?;

    let draw = run.rng.draw_percent();
    let dir = sample_direction(params, draw);
    run.walk.advance(dir, params);

    let update = StateUpdate {
        x: run.walk.x,
        y: run.walk.y,
        step: run.walk.step,
        rep: run.rep,
        reps_total: params.reps,
    };

    let success = run.walk.at_origin();
    let rep_finished = success || run.walk.step >= params.k_max;
    if rep_finished {
        run.results.record(run.walk.step, success);
    }

    Some((Arc::clone(&session.writer), update, rep_finished))
}

/// Sends one STATE frame outside the lock. Returns false on transport
/// failure, in which case the session is torn down.
async fn stream_state(
    state: &ServerState,
    epoch: u64,
    writer: &SharedWriter,
    update: StateUpdate,
) -> bool {
    let mut w = writer.lock().await;
    if let Err(e) = send_message(&mut *w, &WalkMessage::State(update)).await {
        warn!("failed to stream STATE: {e}; dropping session");
        drop(w);
        state.clear_session(epoch).await;
        return false;
    }
    true
}

/// Emits DONE, logs the run summary, and returns the session to idle.
async fn finish_run(state: &ServerState, epoch: u64) {
    let finished = {
        let mut guard = state.session.lock().await;
        match guard.as_mut() {
            Some(session) if session.epoch == epoch => {
                session.phase = SessionPhase::Idle;
                session
                    .run
                    .take()
                    .map(|run| (Arc::clone(&session.writer), run.results.report()))
            }
            _ => None,
        }
    };

    let Some((writer, summary)) = finished else {
        return;
    };
    info!("run complete\n{summary}");

    let mut w = writer.lock().await;
    if let Err(e) = send_message(&mut *w, &WalkMessage::Done).await {
        warn!("failed to send DONE: {e}; dropping session");
        drop(w);
        state.clear_session(epoch).await;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
