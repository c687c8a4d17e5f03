//! Text reports printed by the CLI. Everything here returns a `String` so
//! the replay loop decides where output goes.

use barplay_core::data::Dataset;
use barplay_core::domain::{PositionState, Trade};
use barplay_core::engine::{Advance, ReplaySession};
use barplay_core::metrics::{one_decimal, PerformanceStats};

pub fn ingest_summary(dataset: &Dataset) -> String {
    let report = &dataset.report;
    let mut out = String::new();
    out.push_str("=== Dataset ===\n");
    out.push_str(&format!("Delimiter:      {}\n", report.delimiter.label()));
    out.push_str(&format!("Columns:        {}\n", report.header.join(" | ")));
    out.push_str(&format!("Data rows:      {}\n", report.total_rows));
    if report.retained_rows < report.total_rows {
        out.push_str(&format!(
            "Retained:       {} (oldest {} beyond the cap skipped)\n",
            report.retained_rows,
            report.total_rows - report.retained_rows
        ));
    }
    out.push_str(&format!("Dropped:        {}\n", report.dropped_rows));
    out.push_str(&format!("Bars:           {}\n", dataset.len()));
    if let (Some(first), Some(last)) = (dataset.bars.get(0), dataset.bars.last()) {
        out.push_str(&format!("Range:          {} .. {}\n", first.label, last.label));
    }
    out.push_str(&format!("Fingerprint:    {}\n", dataset.fingerprint));
    if !report.preview.is_empty() {
        out.push_str(&format!("\n--- Preview ({} rows) ---\n", report.preview.len()));
        for row in &report.preview {
            out.push_str(&format!("{}\n", row.join(" | ")));
        }
    }
    out
}

/// One-line cursor and position status.
pub fn status_line(session: &ReplaySession) -> String {
    let Some(bar) = session.current_bar() else {
        return "no data loaded".to_string();
    };
    let index = session.current_index().unwrap_or(0);
    let mut out = format!(
        "[{}/{} {:>5.1}%] {}  O {} H {} L {} C {}",
        index + 1,
        session.bars().len(),
        session.progress_pct(),
        bar.label,
        bar.open,
        bar.high,
        bar.low,
        bar.close,
    );
    if let PositionState::Open(position) = session.position() {
        let pips = session.unrealized_pips().unwrap_or(0.0);
        out.push_str(&format!(
            "  | {} @ {} ({:+.1} pips)",
            position.side.label(),
            position.entry_price,
            pips
        ));
    }
    if session.playback().is_playing() {
        out.push_str(&format!(
            "  | playing every {} ms",
            session.playback().interval().as_millis()
        ));
    }
    out
}

pub fn trade_line(trade: &Trade) -> String {
    format!(
        "{:<5} {} @ {} -> {} @ {}  {:+.1} pips  [{}]",
        trade.side.label(),
        trade.entry_label,
        trade.entry_price,
        trade.exit_label,
        trade.exit_price,
        trade.pips,
        trade.close_reason.label(),
    )
}

pub fn trade_table(trades: &[Trade]) -> String {
    if trades.is_empty() {
        return "no closed trades".to_string();
    }
    let mut out = String::new();
    for (i, trade) in trades.iter().enumerate() {
        out.push_str(&format!("{:>3}. {}\n", i + 1, trade_line(trade)));
    }
    out.pop();
    out
}

/// Status after a cursor move, plus the automatic close if one happened.
pub fn advance(session: &ReplaySession, advance: &Advance) -> String {
    let mut out = status_line(session);
    if let Some(trade) = &advance.auto_closed {
        out.push_str(&format!(
            "\nauto-closed by {}: {}",
            trade.close_reason.label(),
            trade_line(trade)
        ));
    }
    out
}

pub fn stats(stats: &PerformanceStats) -> String {
    let mut out = format!("=== Performance ===\n{stats}");
    if !stats.equity_curve.is_empty() {
        let curve: Vec<String> = stats.equity_curve.iter().map(|v| one_decimal(*v)).collect();
        out.push_str(&format!("\nCurve:      {}", curve.join(" ")));
    }
    out
}
