//! Session management: the accept loop, the handshake, and the per-connection
//! control-message loop.
//!
//! The server holds at most one active session. A new connection that
//! completes the handshake unconditionally replaces the current session; the
//! replaced connection is closed and its control loop exits. QUIT is not
//! scoped to the session: it stops the walk engine, closes the connection,
//! and unblocks the accept loop so the whole process can shut down.
//!
//! Locking rule: every cross-worker field lives in the [`Session`] record
//! behind one mutex. Anything used outside the lock (the write half above
//! all) is captured under the lock first, since a concurrent replacement can
//! invalidate it at any time.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, warn};

use gridwalk_core::{
    recv_message, send_message, Results, SimulationParameters, WalkMessage, WalkRng, WalkState,
};

// ── Session record ────────────────────────────────────────────────────────────

/// Where the active session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Handshake done, waiting for START.
    Idle,
    /// A simulation run is in progress.
    Simulating,
}

/// Everything the walk engine needs for the run in progress.
pub struct ActiveRun {
    pub params: SimulationParameters,
    pub rng: WalkRng,
    pub walk: WalkState,
    /// 1-based index of the replication currently stepping.
    pub rep: u32,
    pub results: Results,
}

impl ActiveRun {
    pub(crate) fn new(params: SimulationParameters) -> Self {
        ActiveRun {
            params,
            rng: WalkRng::for_run(params.seed),
            walk: WalkState::begin(&params),
            rep: 0,
            results: Results::new(&params),
        }
    }
}

/// The single active session.
pub struct Session {
    /// Write half of the connection, shared with the walk engine.
    pub writer: Arc<Mutex<OwnedWriteHalf>>,
    pub peer: SocketAddr,
    /// Monotonic id distinguishing this session from any it replaced. The
    /// engine checks it before touching session state so a stale run can
    /// never write into a newer session.
    pub epoch: u64,
    pub phase: SessionPhase,
    pub run: Option<ActiveRun>,
    /// Signalled when this session is replaced, so its control loop exits
    /// even if the old client never sends another byte.
    closed: Arc<Notify>,
}

impl Session {
    pub(crate) fn new(writer: OwnedWriteHalf, peer: SocketAddr, epoch: u64) -> Self {
        Session {
            writer: Arc::new(Mutex::new(writer)),
            peer,
            epoch,
            phase: SessionPhase::Idle,
            run: None,
            closed: Arc::new(Notify::new()),
        }
    }

    fn close_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.closed)
    }
}

// ── Shared server state ───────────────────────────────────────────────────────

/// State shared by the accept loop, the control loops, and the walk engine.
pub struct ServerState {
    /// The single session slot. `None` between sessions.
    pub session: Mutex<Option<Session>>,
    /// Server-wide run flag, cleared by QUIT or Ctrl-C.
    pub running: AtomicBool,
    /// Wakes the walk engine when a run starts.
    pub sim_wakeup: Notify,
    /// Wakes the accept loop (and anything else blocked) at shutdown.
    pub shutdown: Notify,
    /// Pause between walk steps.
    pub step_delay: Duration,
    epoch_counter: AtomicU64,
}

impl ServerState {
    pub fn new(step_delay: Duration) -> Arc<Self> {
        Arc::new(ServerState {
            session: Mutex::new(None),
            running: AtomicBool::new(true),
            sim_wakeup: Notify::new(),
            shutdown: Notify::new(),
            step_delay,
            epoch_counter: AtomicU64::new(0),
        })
    }

    /// Stops the server: clears the run flag and wakes every blocked worker.
    pub fn initiate_shutdown(&self) {
        self.running.store(false, Ordering::Relaxed);
        self.sim_wakeup.notify_waiters();
        self.shutdown.notify_waiters();
    }

    /// Clears the session slot if it still belongs to `epoch`. Dropping the
    /// record drops this side's handles, closing the connection.
    pub async fn clear_session(&self, epoch: u64) {
        let mut guard = self.session.lock().await;
        if matches!(guard.as_ref(), Some(s) if s.epoch == epoch) {
            *guard = None;
        }
    }
}

// ── Accept loop ───────────────────────────────────────────────────────────────

/// Runs the accept loop until shutdown is signalled.
///
/// Each accepted connection gets its own task for the handshake and control
/// loop; the session slot itself stays behind the shared mutex.
pub async fn serve(listener: TcpListener, state: Arc<ServerState>) {
    // Register for the shutdown signal before the first accept so a QUIT
    // arriving while a connection is being admitted is not lost.
    let shutdown = state.shutdown.notified();
    tokio::pin!(shutdown);
    shutdown.as_mut().enable();

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!("inbound connection from {peer}");
                    let state = Arc::clone(&state);
                    tokio::spawn(async move {
                        handle_connection(state, stream, peer).await;
                    });
                }
                Err(e) => warn!("accept failed: {e}"),
            },
            _ = shutdown.as_mut() => break,
        }
    }
    info!("listener closed");
}

// ── Per-connection control loop ───────────────────────────────────────────────

async fn handle_connection(state: Arc<ServerState>, stream: TcpStream, peer: SocketAddr) {
    let (mut reader, mut writer) = stream.into_split();

    // Handshake: the very first message must be HELLO. Anything else closes
    // this connection without touching a session that may be running.
    match recv_message(&mut reader).await {
        Ok(WalkMessage::Hello(greeting)) => {
            debug!("HELLO from {peer}: {greeting:?}");
        }
        Ok(other) => {
            warn!("{peer} sent {:?} before HELLO; closing", other.message_type());
            return;
        }
        Err(e) => {
            warn!("handshake with {peer} failed: {e}");
            return;
        }
    }
    if let Err(e) = send_message(&mut writer, &WalkMessage::HelloAck).await {
        warn!("failed to send HELLO_ACK to {peer}: {e}");
        return;
    }

    let (epoch, closed) = install_session(&state, writer, peer).await;
    info!("session established with {peer}");

    control_loop(&state, &mut reader, peer, epoch, &closed).await;
}

/// Installs a fresh session in the slot, replacing and closing any prior one.
async fn install_session(
    state: &ServerState,
    writer: OwnedWriteHalf,
    peer: SocketAddr,
) -> (u64, Arc<Notify>) {
    let epoch = state.epoch_counter.fetch_add(1, Ordering::Relaxed) + 1;
    let session = Session::new(writer, peer, epoch);
    let closed = session.close_signal();

    let replaced = {
        let mut guard = state.session.lock().await;
        guard.replace(session)
    };
    if let Some(old) = replaced {
        info!("replacing session with {}; closing it", old.peer);
        old.closed.notify_waiters();
        // `old` is dropped here, which drops this side's write half.
    }

    (epoch, closed)
}

async fn control_loop(
    state: &ServerState,
    reader: &mut OwnedReadHalf,
    peer: SocketAddr,
    epoch: u64,
    closed: &Notify,
) {
    // The close signal is fired with `notify_waiters`, which only reaches
    // already-registered waiters. Register once up front so a replacement
    // that lands while a message is being processed is not lost.
    let notified = closed.notified();
    tokio::pin!(notified);
    notified.as_mut().enable();

    loop {
        let msg = tokio::select! {
            msg = recv_message(reader) => msg,
            _ = notified.as_mut() => {
                debug!("control loop for {peer} exiting: session replaced");
                return;
            }
        };

        match msg {
            Ok(WalkMessage::Start(params)) => handle_start(state, epoch, params).await,
            Ok(WalkMessage::Quit) => {
                info!("QUIT from {peer}; shutting down server");
                state.clear_session(epoch).await;
                state.initiate_shutdown();
                return;
            }
            Ok(other) => {
                warn!("ignoring unexpected {:?} from {peer}", other.message_type());
            }
            Err(e) => {
                if e.is_disconnect() {
                    info!("{peer} disconnected");
                } else {
                    warn!("protocol error from {peer}: {e}; closing connection");
                }
                state.clear_session(epoch).await;
                return;
            }
        }
    }
}

/// Handles a START request for the session identified by `epoch`.
///
/// Invalid parameters are rejected wholesale: the message is discarded with a
/// diagnostic, nothing else changes, and the connection stays open. The
/// protocol has no NACK, so the client sees silence.
async fn handle_start(state: &ServerState, epoch: u64, params: SimulationParameters) {
    if let Err(e) = params.validate() {
        warn!("rejecting START: {e}");
        return;
    }

    let mut guard = state.session.lock().await;
    let Some(session) = guard.as_mut() else {
        return;
    };
    if session.epoch != epoch {
        return;
    }
    if session.phase == SessionPhase::Simulating {
        warn!("ignoring START: a simulation is already running");
        return;
    }

    info!(
        "starting run: {}x{} grid, k_max {}, {} replications, seed {}",
        params.width, params.height, params.k_max, params.reps, params.seed
    );
    session.run = Some(ActiveRun::new(params));
    session.phase = SessionPhase::Simulating;
    drop(guard);

    state.sim_wakeup.notify_one();
}

// ── Tests ─────────────────────────────────────────────────────────────────────
