//! End-to-end tests for the gridwalk server.
//!
//! Each test binds a listener on an ephemeral loopback port, runs the real
//! accept loop and walk engine, and drives the wire protocol from the client
//! side using the shared framing helpers. Step pacing is set to zero so runs
//! complete quickly.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use gridwalk_core::protocol::messages::{MessageType, MAX_PAYLOAD};
use gridwalk_core::{
    recv_message, send_message, SimulationParameters, StateUpdate, WalkMessage,
};
use gridwalk_server::{run_engine, serve, ServerState};

const RECV_TIMEOUT: Duration = Duration::from_secs(10);

fn reference_params() -> SimulationParameters {
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

async fn spawn_server() -> (SocketAddr, Arc<ServerState>, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");

    let state = ServerState::new(Duration::from_millis(0));

    let serve_state = Arc::clone(&state);
    let serve_handle = tokio::spawn(async move {
        serve(listener, serve_state).await;
    });
    let engine_state = Arc::clone(&state);
    tokio::spawn(async move {
        run_engine(engine_state).await;
    });

    (addr, state, serve_handle)
}

async fn connect_and_handshake(addr: SocketAddr) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    send_message(&mut stream, &WalkMessage::Hello("test-client".to_string()))
        .await
        .expect("send HELLO");
    let reply = timeout(RECV_TIMEOUT, recv_message(&mut stream))
        .await
        .expect("handshake must not hang")
        .expect("handshake reply must decode");
    assert_eq!(reply, WalkMessage::HelloAck, "handshake must be acknowledged");
    stream
}

/// Reads STATE frames until DONE and returns them.
async fn collect_run(stream: &mut TcpStream) -> Vec<StateUpdate> {
    let mut updates = Vec::new();
    loop {
        let msg = timeout(RECV_TIMEOUT, recv_message(stream))
            .await
            .expect("server must keep streaming")
            .expect("frame must decode");
        match msg {
            WalkMessage::State(u) => updates.push(u),
            WalkMessage::Done => return updates,
            other => panic!("unexpected message mid-run: {other:?}"),
        }
    }
}

// ── Full-run behaviour ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_full_run_streams_ordered_states_then_done() {
    let (addr, state, _serve) = spawn_server().await;
    let mut client = connect_and_handshake(addr).await;

    let params = reference_params();
    send_message(&mut client, &WalkMessage::Start(params))
        .await
        .expect("send START");

    let updates = collect_run(&mut client).await;
    assert!(!updates.is_empty());

    // STATE frames arrive in increasing (rep, step) order with steps counting
    // up from 1 within each replication.
    let mut expected_rep = 1u32;
    let mut expected_step = 1u32;
    for u in &updates {
        if u.rep != expected_rep {
            assert_eq!(u.rep, expected_rep + 1, "replications must be sequential");
            expected_rep = u.rep;
            expected_step = 1;
        }
        assert_eq!(u.step, expected_step);
        expected_step += 1;

        assert!(u.x >= 0 && u.x < params.width, "x out of grid: {}", u.x);
        assert!(u.y >= 0 && u.y < params.height, "y out of grid: {}", u.y);
        assert!(u.step <= params.k_max, "step budget exceeded");
        assert_eq!(u.reps_total, params.reps);
    }
    assert_eq!(expected_rep, params.reps, "all replications must run");

    // Each replication's final frame is either the origin or the step cap.
    for rep in 1..=params.reps {
        let last = updates
            .iter()
            .filter(|u| u.rep == rep)
            .last()
            .expect("every replication emits at least one frame");
        assert!(
            (last.x == 0 && last.y == 0) || last.step == params.k_max,
            "replication {rep} ended at ({}, {}) on step {}",
            last.x,
            last.y,
            last.step
        );
    }

    state.initiate_shutdown();
}

#[tokio::test]
async fn test_same_seed_produces_identical_trajectories() {
    let (addr, state, _serve) = spawn_server().await;
    let mut client = connect_and_handshake(addr).await;

    let params = reference_params();
    send_message(&mut client, &WalkMessage::Start(params))
        .await
        .expect("send first START");
    let first = collect_run(&mut client).await;

    // After DONE the session is idle again and accepts another run.
    send_message(&mut client, &WalkMessage::Start(params))
        .await
        .expect("send second START");
    let second = collect_run(&mut client).await;

    assert_eq!(first, second, "a fixed seed must reproduce the trajectory");

    state.initiate_shutdown();
}

#[tokio::test]
async fn test_invalid_start_is_discarded_and_session_stays_usable() {
    let (addr, state, _serve) = spawn_server().await;
    let mut client = connect_and_handshake(addr).await;

    // Percentages sum to 99: silently rejected, no reply of any kind.
    let bad = SimulationParameters {
        p_right: 24,
        ..reference_params()
    };
    send_message(&mut client, &WalkMessage::Start(bad))
        .await
        .expect("send invalid START");

    let silence = timeout(Duration::from_millis(300), recv_message(&mut client)).await;
    assert!(silence.is_err(), "invalid START must produce no response");

    // The same connection still accepts a valid START afterwards.
    send_message(&mut client, &WalkMessage::Start(reference_params()))
        .await
        .expect("send valid START");
    let updates = collect_run(&mut client).await;
    assert!(!updates.is_empty());

    state.initiate_shutdown();
}

// ── Session lifecycle ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_new_handshake_replaces_running_session() {
    let (addr, state, _serve) = spawn_server().await;
    let mut first = connect_and_handshake(addr).await;

    // A run long enough that it is still in flight when the second client
    // arrives: full weight on down never reaches the origin from the centre.
    let long_run = SimulationParameters {
        k_max: 1_000_000,
        reps: 1,
        p_up: 0,
        p_down: 100,
        p_left: 0,
        p_right: 0,
        ..reference_params()
    };
    send_message(&mut first, &WalkMessage::Start(long_run))
        .await
        .expect("send START");

    // Wait for the stream to be flowing before replacing the session.
    let msg = timeout(RECV_TIMEOUT, recv_message(&mut first))
        .await
        .expect("run must start")
        .expect("frame must decode");
    assert!(matches!(msg, WalkMessage::State(_)));

    let mut second = connect_and_handshake(addr).await;

    // The first connection is closed. Frames already buffered in the socket
    // may still drain, but the stream must end in a disconnect and never a
    // DONE for the aborted run.
    loop {
        match timeout(RECV_TIMEOUT, recv_message(&mut first))
            .await
            .expect("first connection must be closed promptly")
        {
            Ok(WalkMessage::State(_)) => continue,
            Ok(WalkMessage::Done) => panic!("aborted run must not emit DONE"),
            Ok(other) => panic!("unexpected message: {other:?}"),
            Err(e) => {
                assert!(e.is_disconnect(), "expected disconnect, got {e}");
                break;
            }
        }
    }

    // The replacement session is fully functional.
    send_message(&mut second, &WalkMessage::Start(reference_params()))
        .await
        .expect("send START on new session");
    let updates = collect_run(&mut second).await;
    assert!(!updates.is_empty());

    state.initiate_shutdown();
}

#[tokio::test]
async fn test_disconnect_mid_run_leaves_server_accepting() {
    let (addr, state, _serve) = spawn_server().await;
    let mut client = connect_and_handshake(addr).await;

    let long_run = SimulationParameters {
        k_max: 1_000_000,
        reps: 1,
        p_up: 0,
        p_down: 100,
        p_left: 0,
        p_right: 0,
        ..reference_params()
    };
    send_message(&mut client, &WalkMessage::Start(long_run))
        .await
        .expect("send START");
    let msg = timeout(RECV_TIMEOUT, recv_message(&mut client))
        .await
        .expect("run must start")
        .expect("frame must decode");
    assert!(matches!(msg, WalkMessage::State(_)));

    drop(client);

    // The server stays up and a fresh session works end to end.
    let mut next = connect_and_handshake(addr).await;
    send_message(&mut next, &WalkMessage::Start(reference_params()))
        .await
        .expect("send START after disconnect");
    let updates = collect_run(&mut next).await;
    assert!(!updates.is_empty());

    state.initiate_shutdown();
}

#[tokio::test]
async fn test_quit_shuts_down_whole_server() {
    let (addr, _state, serve_handle) = spawn_server().await;
    let mut client = connect_and_handshake(addr).await;

    send_message(&mut client, &WalkMessage::Quit)
        .await
        .expect("send QUIT");

    // The accept loop must exit, not just this session.
    timeout(RECV_TIMEOUT, serve_handle)
        .await
        .expect("accept loop must stop after QUIT")
        .expect("serve task must not panic");

    // The server side of the connection is gone.
    let end = timeout(RECV_TIMEOUT, recv_message(&mut client))
        .await
        .expect("connection must close");
    assert!(end.is_err());
}

#[tokio::test]
async fn test_quit_during_simulation_halts_stream_and_server() {
    let (addr, _state, serve_handle) = spawn_server().await;
    let mut client = connect_and_handshake(addr).await;

    let long_run = SimulationParameters {
        k_max: 1_000_000,
        reps: 1,
        p_up: 0,
        p_down: 100,
        p_left: 0,
        p_right: 0,
        ..reference_params()
    };
    send_message(&mut client, &WalkMessage::Start(long_run))
        .await
        .expect("send START");
    let msg = timeout(RECV_TIMEOUT, recv_message(&mut client))
        .await
        .expect("run must start")
        .expect("frame must decode");
    assert!(matches!(msg, WalkMessage::State(_)));

    send_message(&mut client, &WalkMessage::Quit)
        .await
        .expect("send QUIT");

    timeout(RECV_TIMEOUT, serve_handle)
        .await
        .expect("accept loop must stop after QUIT")
        .expect("serve task must not panic");

    // Already-buffered frames may drain, but the stream must end in a
    // disconnect and the aborted run must not produce a DONE.
    loop {
        match timeout(RECV_TIMEOUT, recv_message(&mut client))
            .await
            .expect("connection must close after QUIT")
        {
            Ok(WalkMessage::State(_)) => continue,
            Ok(WalkMessage::Done) => panic!("aborted run must not emit DONE"),
            Ok(other) => panic!("unexpected message: {other:?}"),
            Err(e) => {
                assert!(e.is_disconnect(), "expected disconnect, got {e}");
                break;
            }
        }
    }
}

// ── Protocol violations ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_non_hello_first_message_closes_only_that_connection() {
    let (addr, state, _serve) = spawn_server().await;

    let mut rude = TcpStream::connect(addr).await.expect("connect");
    send_message(&mut rude, &WalkMessage::Start(reference_params()))
        .await
        .expect("send START before HELLO");
    let end = timeout(RECV_TIMEOUT, recv_message(&mut rude))
        .await
        .expect("connection must close");
    assert!(end.is_err(), "server must not answer an unopened session");

    // A well-behaved client right after is unaffected.
    let mut polite = connect_and_handshake(addr).await;
    send_message(&mut polite, &WalkMessage::Start(reference_params()))
        .await
        .expect("send START");
    let updates = collect_run(&mut polite).await;
    assert!(!updates.is_empty());

    state.initiate_shutdown();
}

#[tokio::test]
async fn test_oversized_frame_closes_connection() {
    let (addr, state, _serve) = spawn_server().await;
    let mut client = connect_and_handshake(addr).await;

    // Hand-rolled header declaring more payload than any receiver accepts.
    let mut frame = Vec::new();
    frame.extend_from_slice(&(MessageType::Hello as u32).to_be_bytes());
    frame.extend_from_slice(&((MAX_PAYLOAD as u32) + 1).to_be_bytes());
    client.write_all(&frame).await.expect("write raw header");

    let end = timeout(RECV_TIMEOUT, recv_message(&mut client))
        .await
        .expect("connection must close");
    assert!(end.is_err(), "oversized frame must terminate the session");

    state.initiate_shutdown();
}
