//! `mb` — command-line harness for the mood board core.
//!
//! ```text
//! mb [--config PATH] --gather W H [SX SY]   < board.json > board.json
//! mb [--config PATH] --focus  W H [SX SY]   < board.json > board.json
//! mb [--config PATH] --demo [N]
//! ```
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`.

use mb_core::layout::{self, Viewport};
use mb_core::{Board, BoardConfig, Connection};
use mb_editor::{PastePayload, Workspace};
use mb_tasks::{EchoGenerator, GenerationKind, MemoryCache};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const USAGE: &str = "usage: mb [--config PATH] (--gather W H [SX SY] | --focus W H [SX SY] | --demo [N])";

/// A 1×1 transparent PNG, pasted by the demo.
const DEMO_IMAGE: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();

    // ── `--config PATH` (anywhere on the line) ──────────────────────────
    let config = match args.iter().position(|a| a == "--config") {
        Some(at) => {
            let Some(path) = args.get(at + 1).cloned() else {
                fail("--config", "missing path");
            };
            args.drain(at..at + 2);
            match BoardConfig::load(Path::new(&path)) {
                Ok(config) => config,
                Err(e) => fail("--config", e),
            }
        }
        None => BoardConfig::default(),
    };

    match args.first().map(String::as_str) {
        // ── `mb --gather` / `mb --focus` ────────────────────────────────
        // Reads a board (JSON array of cards) from stdin, writes the
        // re-laid-out board to stdout.
        Some(flag @ ("--gather" | "--focus")) => {
            let viewport = match parse_viewport(&args[1..]) {
                Ok(viewport) => viewport,
                Err(e) => fail(flag, e),
            };
            let board = read_board(flag);
            let out = if flag == "--gather" {
                layout::gather(&board, &viewport, config.gather)
            } else {
                layout::focus(&board, &viewport)
            };
            print_board(flag, &out);
        }

        // ── `mb --demo [N]` ─────────────────────────────────────────────
        // Scripted session against the offline echo provider.
        Some("--demo") => {
            let count = match args.get(1).map(|n| n.parse::<usize>()) {
                None => 3,
                Some(Ok(n)) => n,
                Some(Err(e)) => fail("--demo", format!("bad count: {e}")),
            };
            demo(config, count).await;
        }

        _ => {
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    }
}

fn fail(flag: &str, e: impl std::fmt::Display) -> ! {
    eprintln!("mb {flag} error: {e}");
    eprintln!("{USAGE}");
    std::process::exit(1);
}

/// `W H [SX SY]` → viewport.
fn parse_viewport(args: &[String]) -> Result<Viewport, String> {
    let numbers = args
        .iter()
        .map(|a| a.parse::<f32>().map_err(|e| format!("'{a}': {e}")))
        .collect::<Result<Vec<f32>, String>>()?;
    match numbers.as_slice() {
        [w, h] => Ok(Viewport::new(*w, *h)),
        [w, h, sx, sy] => Ok(Viewport::new(*w, *h).scrolled(*sx, *sy)),
        _ => Err(format!("expected W H [SX SY], got {} number(s)", numbers.len())),
    }
}

fn read_board(flag: &str) -> Board {
    let mut text = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut text) {
        fail(flag, format!("failed to read stdin: {e}"));
    }
    match serde_json::from_str(&text) {
        Ok(board) => board,
        Err(e) => fail(flag, format!("invalid board: {e}")),
    }
}

fn print_board(flag: &str, board: &Board) {
    match serde_json::to_string_pretty(board) {
        Ok(json) => println!("{json}"),
        Err(e) => fail(flag, e),
    }
}

async fn demo(config: BoardConfig, count: usize) {
    let separator = config.status_separator.clone();
    let mut ws = Workspace::new(
        config,
        Connection::new("echo", "demo"),
        Arc::new(EchoGenerator {
            count,
            delay: Duration::from_millis(150),
        }),
        Arc::new(MemoryCache::new()),
    );
    ws.set_viewport(Viewport::default());

    let _status = ws.progress().subscribe(move |counters| {
        println!("status: {}", counters.status_text(&separator));
    });

    if let Err(e) = ws.paste(vec![PastePayload::Image {
        data_url: DEMO_IMAGE.to_string(),
    }]) {
        fail("--demo", e);
    }
    ws.store().select_all();
    println!("pasted 1 image");

    let task = match ws.generate(GenerationKind::Image, "variations on the pasted image") {
        Ok(task) => task,
        Err(e) => fail("--demo", e),
    };
    log::info!("demo: submitted task {task}");
    ws.queue().wait_idle().await;

    for record in ws.queue().records() {
        println!("task {} ({}): {:?}", record.id, record.name, record.status);
    }
    print_board("--demo", &ws.store().read());
}
