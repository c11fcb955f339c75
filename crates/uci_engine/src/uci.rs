//! UCI session: command parsing, the background search thread and output.

use std::io::{BufRead, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::Result;
use chess_core::{
    perft_divide, set_position_from_uci, Clock, Color, Engine, Position, SearchLimits,
    TimeControl,
};
use classical_engine::{ClassicalEngine, SearchConfig, SearchReport};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Write one protocol line and flush it.
fn send<W: Write>(out: &Mutex<W>, line: &str) {
    let mut out = lock(out);
    if let Err(e) = writeln!(out, "{line}").and_then(|_| out.flush()) {
        log::warn!("failed to write '{line}': {e}");
    }
}

pub fn format_info(report: &SearchReport) -> String {
    let mut line = format!(
        "info depth {} seldepth {} score {} nodes {} nps {} hashfull {} time {}",
        report.depth,
        report.seldepth,
        report.score,
        report.nodes,
        report.nps,
        report.hashfull,
        report.elapsed.as_millis()
    );
    if !report.pv.is_empty() {
        line.push_str(" pv");
        for mv in &report.pv {
            line.push(' ');
            line.push_str(&mv.to_string());
        }
    }
    line
}

/// Name and value of `setoption name <name...> [value <value...>]`.
pub fn parse_setoption(args: &[&str]) -> Option<(String, String)> {
    let name_at = args.iter().position(|&a| a == "name")?;
    let value_at = args.iter().position(|&a| a == "value").unwrap_or(args.len());
    if value_at < name_at {
        return None;
    }
    let name = args[name_at + 1..value_at].join(" ");
    let value = args.get(value_at + 1..).map(|v| v.join(" ")).unwrap_or_default();
    (!name.is_empty()).then_some((name, value))
}

/// Search limits for a `go` command, reading the clock of `side`.
pub fn parse_go(args: &[&str], side: Color) -> SearchLimits {
    let mut limits = SearchLimits::default();
    let mut time_left = None;
    let mut increment = Duration::ZERO;
    let mut moves_to_go = None;

    let ms = |v: Option<&&str>| v.and_then(|v| v.parse::<u64>().ok()).map(Duration::from_millis);
    let (our_time, our_inc) = match side {
        Color::White => ("wtime", "winc"),
        Color::Black => ("btime", "binc"),
    };

    let mut tokens = args.iter();
    while let Some(&token) = tokens.next() {
        match token {
            "infinite" => limits.infinite = true,
            "depth" => limits.depth = tokens.next().and_then(|v| v.parse().ok()),
            "nodes" => limits.nodes = tokens.next().and_then(|v| v.parse().ok()),
            "movetime" => limits.move_time = ms(tokens.next()),
            "movestogo" => moves_to_go = tokens.next().and_then(|v| v.parse().ok()),
            t if t == our_time => time_left = ms(tokens.next()),
            t if t == our_inc => increment = ms(tokens.next()).unwrap_or_default(),
            "wtime" | "btime" | "winc" | "binc" => {
                tokens.next();
            }
            other => log::debug!("ignoring go token '{other}'"),
        }
    }

    if let Some(time_left) = time_left {
        limits.clock = Some(Clock {
            time_left,
            increment,
            moves_to_go,
        });
    }
    limits
}

struct RunningSearch {
    stop: TimeControl,
    handle: JoinHandle<()>,
}

/// One UCI conversation over `out`.
pub struct UciSession<W: Write + Send + 'static> {
    engine: Arc<Mutex<ClassicalEngine>>,
    out: Arc<Mutex<W>>,
    pos: Position,
    search: Option<RunningSearch>,
}

impl<W: Write + Send + 'static> UciSession<W> {
    pub fn new(mut engine: ClassicalEngine, out: W) -> Self {
        let out = Arc::new(Mutex::new(out));
        let info_out = Arc::clone(&out);
        engine.set_reporter(Some(Arc::new(move |report: &SearchReport| {
            send(&info_out, &format_info(report));
        })));
        Self {
            engine: Arc::new(Mutex::new(engine)),
            out,
            pos: Position::startpos(),
            search: None,
        }
    }

    /// Read commands until `quit` or end of input.
    pub fn run<R: BufRead>(&mut self, input: R) -> Result<()> {
        for line in input.lines() {
            if !self.handle(&line?) {
                break;
            }
        }
        self.stop_search();
        Ok(())
    }

    /// Handle one command line; `false` means quit.
    pub fn handle(&mut self, line: &str) -> bool {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some((&cmd, args)) = parts.split_first() else {
            return true;
        };
        match cmd {
            "uci" => self.cmd_uci(),
            "isready" => send(&self.out, "readyok"),
            "setoption" => self.cmd_setoption(args),
            "ucinewgame" => {
                self.stop_search();
                lock(&self.engine).new_game();
                self.pos = Position::startpos();
            }
            "position" => {
                if let Err(e) = set_position_from_uci(&mut self.pos, args) {
                    log::warn!("ignoring position command: {e}");
                }
            }
            "go" => self.cmd_go(args),
            "stop" => self.stop_search(),
            "perft" => self.cmd_perft(args),
            "d" => send(&self.out, &self.pos.to_string()),
            "quit" => {
                self.stop_search();
                return false;
            }
            _ => log::warn!("unknown command '{line}'"),
        }
        true
    }

    fn cmd_uci(&self) {
        let engine = lock(&self.engine);
        let config = engine.config();
        send(&self.out, &format!("id name {}", engine.name()));
        send(&self.out, &format!("id author {}", engine.author()));
        send(
            &self.out,
            &format!(
                "option name Threads type spin default {} min 1 max {}",
                config.threads,
                SearchConfig::MAX_THREADS
            ),
        );
        send(
            &self.out,
            &format!(
                "option name Hash type spin default {} min 1 max {}",
                config.hash_mb,
                SearchConfig::MAX_HASH_MB
            ),
        );
        send(&self.out, "option name Clear Hash type button");
        send(&self.out, "uciok");
    }

    fn cmd_setoption(&mut self, args: &[&str]) {
        let Some((name, value)) = parse_setoption(args) else {
            log::warn!("malformed setoption: {}", args.join(" "));
            return;
        };
        if self.is_searching() {
            log::warn!("ignoring setoption {name} during search");
            return;
        }
        if !lock(&self.engine).set_option(&name, &value) {
            log::warn!("unknown or invalid option '{name}' = '{value}'");
        }
    }

    fn cmd_go(&mut self, args: &[&str]) {
        if self.is_searching() {
            log::warn!("ignoring go while a search is running");
            return;
        }
        self.reap_search();

        let limits = parse_go(args, self.pos.side_to_move());
        let stop = limits.time_control.clone();
        let engine = Arc::clone(&self.engine);
        let out = Arc::clone(&self.out);
        let pos = self.pos.clone();

        let spawned = thread::Builder::new()
            .name("uci-search".to_string())
            .spawn(move || {
                let result = lock(&engine).search(&pos, limits);
                let best = result.best_move.map_or_else(|| "0000".to_string(), |m| m.to_string());
                send(&out, &format!("bestmove {best}"));
            });
        match spawned {
            Ok(handle) => self.search = Some(RunningSearch { stop, handle }),
            Err(e) => {
                log::warn!("could not start search thread: {e}");
                send(&self.out, "bestmove 0000");
            }
        }
    }

    fn cmd_perft(&mut self, args: &[&str]) {
        let Some(depth) = args.first().and_then(|d| d.parse::<u8>().ok()) else {
            log::warn!("perft needs a depth");
            return;
        };
        let started = Instant::now();
        let mut pos = self.pos.clone();
        let divide = perft_divide(&mut pos, depth);
        let total: u64 = divide.iter().map(|(_, n)| n).sum();
        for (mv, nodes) in &divide {
            send(&self.out, &format!("{mv}: {nodes}"));
        }
        send(&self.out, &format!("Nodes searched: {total}"));
        log::info!("perft {depth}: {total} nodes in {:?}", started.elapsed());
    }

    fn is_searching(&self) -> bool {
        self.search.as_ref().is_some_and(|s| !s.handle.is_finished())
    }

    /// Wait for the current search to finish on its own.
    fn reap_search(&mut self) {
        if let Some(search) = self.search.take() {
            if search.handle.join().is_err() {
                log::warn!("search thread panicked");
            }
        }
    }

    fn stop_search(&mut self) {
        if let Some(search) = &self.search {
            search.stop.stop();
        }
        self.reap_search();
    }
}

impl<W: Write + Send + 'static> Drop for UciSession<W> {
    fn drop(&mut self) {
        self.stop_search();
    }
}

#[cfg(test)]
#[path = "uci_tests.rs"]
mod uci_tests;
