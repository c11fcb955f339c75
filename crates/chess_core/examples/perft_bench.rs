//! Perft timing and divide output.
//!
//! Usage:
//!   cargo run --release --example perft_bench -p chess_core -- [depth] [fen]
//!   cargo run --release --example perft_bench -p chess_core -- divide 4 "<fen>"

use std::env;
use std::time::{Duration, Instant};

use chess_core::{FenError, Position, perft, perft_divide};

const SUITE: &[(&str, &str)] = &[
    ("Start", "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"),
    ("Kiwipete", "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq -"),
    ("Rook ending", "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - -"),
    ("Promotions", "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq -"),
    ("Discovered", "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ -"),
];

fn nps(nodes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 { nodes as f64 / secs } else { 0.0 }
}

fn main() -> Result<(), FenError> {
    let args: Vec<String> = env::args().skip(1).collect();

    if args.first().map(String::as_str) == Some("divide") {
        let depth = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(3);
        let mut pos = match args.get(2) {
            Some(fen) => Position::from_fen(fen)?,
            None => Position::startpos(),
        };
        let mut total = 0;
        for (mv, nodes) in perft_divide(&mut pos, depth) {
            println!("{mv}: {nodes}");
            total += nodes;
        }
        println!("\nNodes searched: {total}");
        return Ok(());
    }

    let depth: u8 = args.first().and_then(|s| s.parse().ok()).unwrap_or(5);
    let positions: Vec<(&str, &str)> = match args.get(1) {
        Some(fen) => vec![("Custom", fen.as_str())],
        None => SUITE.to_vec(),
    };

    let mut total_nodes = 0u64;
    let mut total_time = Duration::ZERO;
    for (name, fen) in positions {
        let mut pos = Position::from_fen(fen)?;
        let start = Instant::now();
        let nodes = perft(&mut pos, depth);
        let elapsed = start.elapsed();
        total_nodes += nodes;
        total_time += elapsed;
        println!(
            "{name:.<20} {nodes:>12} nodes in {elapsed:>8.3?} ({:>10.0} nps)",
            nps(nodes, elapsed)
        );
    }
    println!(
        "TOTAL: {total_nodes} nodes in {total_time:.3?} ({:.0} nps)",
        nps(total_nodes, total_time)
    );
    Ok(())
}
