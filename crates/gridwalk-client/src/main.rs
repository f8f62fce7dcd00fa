//! Gridwalk client entry point.
//!
//! Interactive menu over stdin; simulation events are printed as they stream
//! in from the server. Takes optional host and port arguments, defaulting to
//! `127.0.0.1:5555`.

use std::io::Write;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use gridwalk_client::{
    parse_bounded, parse_choice, ClientConnection, ClientConnectionConfig, ClientEvent,
    MenuChoice,
};
use gridwalk_core::SimulationParameters;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "127.0.0.1".to_string());
    let port = match args.next() {
        Some(p) => p.parse::<u16>()?,
        None => 5555,
    };

    let conn = Arc::new(ClientConnection::new(ClientConnectionConfig {
        server_addr: format!("{host}:{port}"),
        ..ClientConnectionConfig::default()
    }));

    loop {
        let line = tokio::task::spawn_blocking(read_menu_choice).await?;
        let Some(line) = line else {
            // EOF on stdin behaves like choosing quit.
            quit(&conn).await;
            break;
        };
        match parse_choice(&line) {
            Some(MenuChoice::NewSimulation) => {
                let params = tokio::task::spawn_blocking(prompt_parameters).await?;
                let Some(params) = params else {
                    quit(&conn).await;
                    break;
                };
                if ensure_connected(&conn).await {
                    if let Err(e) = conn.send_start(params).await {
                        println!("[client] failed to send START: {e}");
                    } else {
                        println!(
                            "[client] START sent (W={} H={} K={} reps={} seed={})",
                            params.width, params.height, params.k_max, params.reps, params.seed
                        );
                    }
                }
            }
            Some(MenuChoice::ConnectOnly) => {
                ensure_connected(&conn).await;
            }
            Some(MenuChoice::Quit) => {
                quit(&conn).await;
                break;
            }
            None => println!("Unknown choice."),
        }
    }

    Ok(())
}

/// Connects and starts the event printer if not already connected.
/// Returns true when a connection is available.
async fn ensure_connected(conn: &Arc<ClientConnection>) -> bool {
    if conn.is_connected().await {
        return true;
    }
    match conn.connect().await {
        Ok(events) => {
            println!("[client] connected + handshake OK");
            spawn_event_printer(events);
            true
        }
        Err(e) => {
            println!("[client] connect failed: {e}");
            false
        }
    }
}

async fn quit(conn: &Arc<ClientConnection>) {
    if conn.is_connected().await {
        if let Err(e) = conn.send_quit().await {
            println!("[client] failed to send QUIT: {e}");
        }
    }
}

fn spawn_event_printer(mut events: mpsc::Receiver<ClientEvent>) {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                ClientEvent::State(u) => {
                    println!(
                        "rep={}/{} step={} pos=({},{})",
                        u.rep, u.reps_total, u.step, u.x, u.y
                    );
                }
                ClientEvent::Done => {
                    println!("\n[client] simulation finished; back to menu");
                }
                ClientEvent::Disconnected => {
                    println!("\n[client] disconnected from server");
                }
            }
        }
    });
}

// ── Blocking stdin prompts ────────────────────────────────────────────────────

/// Prints the menu and reads one line. `None` means EOF.
fn read_menu_choice() -> Option<String> {
    println!("\n=== MENU ===");
    println!("1) New simulation");
    println!("2) Connect to a running server");
    println!("3) Quit");
    print!("Choice: ");
    read_line()
}

/// Prompts for all simulation parameters, re-asking until each answer is
/// valid and the percentages sum to 100. `None` means EOF.
fn prompt_parameters() -> Option<SimulationParameters> {
    loop {
        let width = prompt_number("Grid width W", 2, 2000, 10)? as i32;
        let height = prompt_number("Grid height H", 2, 2000, 10)? as i32;
        let k_max = prompt_number("Max steps K", 1, 1_000_000, 200)? as u32;
        let reps = prompt_number("Replications R", 1, 1_000_000, 5)? as u32;
        let seed = prompt_number("Seed (0=auto)", 0, u32::MAX as i64, 0)? as u32;
        let p_up = prompt_number("P(up) %", 0, 100, 25)? as u8;
        let p_down = prompt_number("P(down) %", 0, 100, 25)? as u8;
        let p_left = prompt_number("P(left) %", 0, 100, 25)? as u8;
        let p_right = prompt_number("P(right) %", 0, 100, 25)? as u8;

        let params = SimulationParameters {
            width,
            height,
            k_max,
            reps,
            seed,
            p_up,
            p_down,
            p_left,
            p_right,
        };
        match params.validate() {
            Ok(()) => return Some(params),
            Err(e) => println!("Invalid parameters: {e}. Try again."),
        }
    }
}

/// Prompts for one bounded integer, re-asking on bad input. `None` means EOF.
fn prompt_number(prompt: &str, min: i64, max: i64, default: i64) -> Option<i64> {
    loop {
        print!("{prompt} [{min}..{max}] (enter={default}): ");
        let line = read_line()?;
        match parse_bounded(&line, min, max, default) {
            Ok(value) => return Some(value),
            Err(e) => println!("{e}"),
        }
    }
}

/// Reads one line from stdin. `None` means EOF.
fn read_line() -> Option<String> {
    std::io::stdout().flush().ok();
    let mut line = String::new();
    match std::io::stdin().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line),
    }
}
