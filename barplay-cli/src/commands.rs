//! Line commands for the replay loop.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use barplay_core::domain::Side;

/// Bars moved by `ff` / `rw`.
pub const BATCH_STEP: i64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Step(i64),
    Seek(i64),
    Reset,
    Open(Side),
    Close,
    TogglePlay,
    Speed(u64),
    TakeProfit(f64),
    StopLoss(f64),
    Status,
    Stats,
    Trades,
    Save(PathBuf),
    Export(PathBuf),
    Help,
    Quit,
}

pub const HELP: &str = "\
navigation: n/next  p/prev  ff (+10)  rw (-10)  seek N  reset
trading:    long  short  close  tp PIPS  sl PIPS   (0 disables)
autoplay:   play (toggle)  speed MS
reports:    status  stats  trades
files:      save FILE (snapshot)  export FILE (.json or .csv)
            help  quit";

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();
    if let Some(extra) = words.next() {
        bail!("unexpected argument '{extra}'");
    }

    let command = match (head.to_ascii_lowercase().as_str(), arg) {
        ("n" | "next", None) => Command::Step(1),
        ("p" | "prev", None) => Command::Step(-1),
        ("ff", None) => Command::Step(BATCH_STEP),
        ("rw", None) => Command::Step(-BATCH_STEP),
        ("seek", Some(n)) => Command::Seek(number(n)?),
        ("reset", None) => Command::Reset,
        ("long" | "buy", None) => Command::Open(Side::Long),
        ("short" | "sell", None) => Command::Open(Side::Short),
        ("close", None) => Command::Close,
        ("play" | "pause", None) => Command::TogglePlay,
        ("speed", Some(ms)) => {
            let ms: u64 = number(ms)?;
            if ms == 0 {
                bail!("speed must be at least 1 ms");
            }
            Command::Speed(ms)
        }
        ("tp", Some(pips)) => Command::TakeProfit(pips_arg(pips)?),
        ("sl", Some(pips)) => Command::StopLoss(pips_arg(pips)?),
        ("status" | "s", None) => Command::Status,
        ("stats", None) => Command::Stats,
        ("trades", None) => Command::Trades,
        ("save", Some(path)) => Command::Save(PathBuf::from(path)),
        ("export", Some(path)) => Command::Export(PathBuf::from(path)),
        ("help" | "?", None) => Command::Help,
        ("q" | "quit" | "exit", None) => Command::Quit,
        (
            "seek" | "speed" | "tp" | "sl" | "save" | "export",
            None,
        ) => bail!("'{head}' needs an argument"),
        (_, Some(_)) if is_known(head) => bail!("'{head}' takes no argument"),
        _ => bail!("unknown command '{head}' (try 'help')"),
    };
    Ok(Some(command))
}

fn is_known(word: &str) -> bool {
    matches!(
        word.to_ascii_lowercase().as_str(),
        "n" | "next" | "p" | "prev" | "ff" | "rw" | "reset" | "long" | "buy" | "short" | "sell"
            | "close" | "play" | "pause" | "status" | "s" | "stats" | "trades" | "help" | "?"
            | "q" | "quit" | "exit"
    )
}

fn number<T: std::str::FromStr>(text: &str) -> Result<T> {
    text.parse()
        .map_err(|_| anyhow!("'{text}' is not a valid number"))
}

fn pips_arg(text: &str) -> Result<f64> {
    let pips: f64 = number(text)?;
    if !pips.is_finite() {
        bail!("'{text}' is not a finite pip value");
    }
    Ok(pips)
}
