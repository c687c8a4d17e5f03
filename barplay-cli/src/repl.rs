//! Interactive replay loop.
//!
//! Input lines and autoplay ticks arrive on one channel, so the session is
//! only ever touched by the loop thread. The autoplay timer is restarted
//! whenever the playback generation moves and dropped when playback stops.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use barplay_core::domain::Trade;
use barplay_core::engine::{ReplaySession, TickOutcome, TpSlConfig};
use barplay_core::export::{export_equity_csv, export_trades_csv, export_trades_json};
use barplay_core::replay::{AutoplayTimer, Tick};

use crate::commands::{self, Command, HELP};
use crate::report;

/// Everything the loop reacts to.
#[derive(Debug)]
pub enum Event {
    Line(String),
    Eof,
    Tick(Tick),
}

impl From<Tick> for Event {
    fn from(tick: Tick) -> Self {
        Event::Tick(tick)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Run until `quit` or end of input.
pub fn run<R, W>(session: &mut ReplaySession, input: R, out: &mut W) -> Result<()>
where
    R: BufRead + Send + 'static,
    W: Write,
{
    let (tx, rx) = mpsc::channel();
    spawn_reader(input, tx.clone())?;
    let mut timer: Option<AutoplayTimer> = None;

    writeln!(out, "{}", report::status_line(session))?;
    writeln!(out, "type 'help' for commands")?;

    while let Ok(event) = rx.recv() {
        match event {
            Event::Tick(tick) => match session.on_tick(tick) {
                TickOutcome::Ignored => {}
                TickOutcome::Advanced(advance) => {
                    writeln!(out, "{}", report::advance(session, &advance))?;
                }
                TickOutcome::Finished(advance) => {
                    writeln!(out, "{}", report::advance(session, &advance))?;
                    writeln!(out, "end of data: autoplay stopped")?;
                }
            },
            Event::Line(line) => match commands::parse(&line) {
                Ok(None) => {}
                Ok(Some(command)) => match execute(session, command, out) {
                    Ok(Flow::Quit) => break,
                    Ok(Flow::Continue) => {}
                    Err(e) => writeln!(out, "error: {e:#}")?,
                },
                Err(e) => writeln!(out, "error: {e}")?,
            },
            Event::Eof => break,
        }
        out.flush()?;
        sync_timer(session, &mut timer, &tx)?;
    }

    if let Some(timer) = timer.take() {
        timer.cancel();
    }
    Ok(())
}

/// Apply one command to the session, writing any feedback to `out`.
///
/// Rejected trades are reported, not returned as errors; `Err` is reserved
/// for failed file writes.
pub fn execute<W: Write>(session: &mut ReplaySession, command: Command, out: &mut W) -> Result<Flow> {
    match command {
        Command::Step(delta) => {
            let advance = session.step_by(delta);
            writeln!(out, "{}", report::advance(session, &advance))?;
        }
        Command::Seek(index) => {
            let advance = session.seek(index);
            writeln!(out, "{}", report::advance(session, &advance))?;
        }
        Command::Reset => {
            let advance = session.rewind();
            writeln!(out, "{}", report::advance(session, &advance))?;
        }
        Command::Open(side) => match session.open_position(side) {
            Ok(position) => writeln!(
                out,
                "opened {} @ {} ({})",
                position.side.label(),
                position.entry_price,
                position.entry_label
            )?,
            Err(e) => writeln!(out, "rejected: {e}")?,
        },
        Command::Close => match session.close_position() {
            Ok(trade) => writeln!(out, "closed: {}", report::trade_line(&trade))?,
            Err(e) => writeln!(out, "rejected: {e}")?,
        },
        Command::TogglePlay => match session.toggle_play() {
            Ok(true) => writeln!(
                out,
                "playing, one bar every {} ms",
                session.playback().interval().as_millis()
            )?,
            Ok(false) => writeln!(out, "paused")?,
            Err(e) => writeln!(out, "rejected: {e}")?,
        },
        Command::Speed(ms) => {
            session.set_interval(Duration::from_millis(ms));
            writeln!(out, "autoplay interval set to {ms} ms")?;
        }
        Command::TakeProfit(pips) => {
            let closed = session.set_take_profit(pips);
            thresholds_changed(session.tp_sl(), closed, out)?;
        }
        Command::StopLoss(pips) => {
            let closed = session.set_stop_loss(pips);
            thresholds_changed(session.tp_sl(), closed, out)?;
        }
        Command::Status => writeln!(out, "{}", report::status_line(session))?,
        Command::Stats => writeln!(out, "{}", report::stats(&session.stats()))?,
        Command::Trades => writeln!(out, "{}", report::trade_table(session.ledger().as_slice()))?,
        Command::Save(path) => match session.snapshot() {
            Some(snapshot) => {
                snapshot
                    .save(&path)
                    .with_context(|| format!("failed to save snapshot to {}", path.display()))?;
                writeln!(out, "snapshot saved to {}", path.display())?;
            }
            None => writeln!(out, "nothing to save: no data loaded")?,
        },
        Command::Export(path) => {
            for written in export_ledger(session.ledger().as_slice(), &path)? {
                writeln!(out, "wrote {}", written.display())?;
            }
        }
        Command::Help => writeln!(out, "{HELP}")?,
        Command::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

fn thresholds_changed<W: Write>(tp_sl: &TpSlConfig, closed: Option<Trade>, out: &mut W) -> Result<()> {
    let show = |v: Option<f64>| v.map_or_else(|| "off".to_string(), |p| format!("{p} pips"));
    writeln!(out, "TP {} / SL {}", show(tp_sl.take_profit()), show(tp_sl.stop_loss()))?;
    if let Some(trade) = closed {
        writeln!(
            out,
            "auto-closed by {}: {}",
            trade.close_reason.label(),
            report::trade_line(&trade)
        )?;
    }
    Ok(())
}

/// Write the ledger to `path`. A `.json` path gets the trade list as JSON;
/// anything else gets the trade tape CSV plus an `_equity.csv` sibling.
pub fn export_ledger(trades: &[Trade], path: &Path) -> Result<Vec<PathBuf>> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        write_file(path, &export_trades_json(trades)?)?;
        return Ok(vec![path.to_path_buf()]);
    }

    write_file(path, &export_trades_csv(trades)?)?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "trades".to_string());
    let equity_path = path.with_file_name(format!("{stem}_equity.csv"));
    write_file(&equity_path, &export_equity_csv(trades)?)?;
    Ok(vec![path.to_path_buf(), equity_path])
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

/// Keep exactly one timer alive while playing, matching the current generation.
fn sync_timer(
    session: &ReplaySession,
    timer: &mut Option<AutoplayTimer>,
    tx: &Sender<Event>,
) -> Result<()> {
    let playback = session.playback();
    let current = timer.as_ref().map(AutoplayTimer::generation);
    if playback.is_playing() && current == Some(playback.generation()) {
        return Ok(());
    }
    if let Some(old) = timer.take() {
        old.cancel();
    }
    if playback.is_playing() {
        let fresh = AutoplayTimer::spawn(playback, tx.clone())
            .context("failed to start autoplay timer")?;
        *timer = Some(fresh);
    }
    Ok(())
}

/// Forward input lines to the loop. The thread is detached: a blocked read
/// on a terminal cannot be interrupted, and it ends with the process.
fn spawn_reader<R: BufRead + Send + 'static>(input: R, tx: Sender<Event>) -> Result<()> {
    thread::Builder::new()
        .name("input".into())
        .spawn(move || {
            for line in input.lines() {
                let Ok(line) = line else { break };
                if tx.send(Event::Line(line)).is_err() {
                    return;
                }
            }
            let _ = tx.send(Event::Eof);
        })
        .context("failed to start input thread")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use barplay_core::config::ReplayConfig;
    use barplay_core::data::{ingest_table, IngestOptions, Normalizer, RawTable};
    use std::io::Cursor;
    use std::sync::Arc;

    fn session() -> ReplaySession {
        let text = "Open,High,Low,Close\n\
                    100,100,100,100\n\
                    101.2,101.2,101.2,101.2\n\
                    100.7,100.7,100.7,100.7\n\
                    103.5,103.5,103.5,103.5\n";
        let table = RawTable::parse(text).unwrap();
        let dataset =
            ingest_table(table, &Normalizer::with_timezone(chrono::Utc), &IngestOptions::default()).unwrap();
        let mut session = ReplaySession::new(&ReplayConfig::default());
        session.replace_dataset(Arc::new(dataset));
        session
    }

    fn run_script(session: &mut ReplaySession, script: &str) -> String {
        let mut out = Vec::new();
        run(session, Cursor::new(script.to_string()), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn scripted_trades() {
        let mut s = session();
        let out = run_script(&mut s, "long\nn\nclose\nshort\nn\nclose\nstats\nquit\nlong\n");
        assert!(out.contains("opened LONG @ 100"));
        assert!(out.contains("closed: LONG"));
        assert!(out.contains("Trades:     2"));
        assert_eq!(s.ledger().len(), 2);
        assert!(!s.position().is_open(), "input after quit is not processed");
    }

    #[test]
    fn rejections_are_reported() {
        let mut s = session();
        let out = run_script(&mut s, "close\nlong\nlong\nbogus\n");
        assert!(out.contains("rejected: no open position to close"));
        assert!(out.contains("rejected: a LONG position is already open"));
        assert!(out.contains("error: unknown command 'bogus'"));
    }

    #[test]
    fn threshold_closes_immediately() {
        let mut s = session();
        let out = run_script(&mut s, "long\nseek 3\ntp 30\n");
        assert!(out.contains("auto-closed by TP"));
        assert_eq!(s.ledger().len(), 1);
    }

    #[test]
    fn autoplay_runs_to_the_end() {
        let mut s = session();
        s.set_interval(Duration::from_millis(2));
        let (tx, rx) = mpsc::channel();
        let mut timer = None;
        let mut out = Vec::new();

        execute(&mut s, Command::TogglePlay, &mut out).unwrap();
        sync_timer(&s, &mut timer, &tx).unwrap();
        while s.playback().is_playing() {
            if let Ok(Event::Tick(tick)) = rx.recv_timeout(Duration::from_secs(5)) {
                s.on_tick(tick);
            }
            sync_timer(&s, &mut timer, &tx).unwrap();
        }
        assert!(timer.is_none());
        assert_eq!(s.current_index(), Some(3));
    }

    #[test]
    fn export_writes_csv_pair_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session();
        run_script(&mut s, "long\nn\nclose\n");

        let written = export_ledger(s.ledger().as_slice(), &dir.path().join("out/trades.csv")).unwrap();
        assert_eq!(written.len(), 2);
        assert!(dir.path().join("out/trades_equity.csv").exists());

        let json_path = dir.path().join("trades.json");
        export_ledger(s.ledger().as_slice(), &json_path).unwrap();
        let trades: Vec<Trade> =
            serde_json::from_str(&std::fs::read_to_string(json_path).unwrap()).unwrap();
        assert_eq!(trades.len(), 1);
    }
}
