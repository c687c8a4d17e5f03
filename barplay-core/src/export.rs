//! Ledger export: trade tape CSV, equity curve CSV and JSON.

use thiserror::Error;

use crate::domain::Trade;
use crate::metrics::equity_curve;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to flush CSV writer: {0}")]
    Flush(String),

    #[error("CSV output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Export closed trades as CSV, one row per trade in ledger order.
///
/// Columns: side, entry_index, entry_label, entry_price, exit_index,
/// exit_label, exit_price, pips, close_reason
pub fn export_trades_csv(trades: &[Trade]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "side",
        "entry_index",
        "entry_label",
        "entry_price",
        "exit_index",
        "exit_label",
        "exit_price",
        "pips",
        "close_reason",
    ])?;

    for t in trades {
        wtr.write_record([
            t.side.label(),
            &t.entry_index.to_string(),
            &t.entry_label,
            &t.entry_price.to_string(),
            &t.exit_index.to_string(),
            &t.exit_label,
            &t.exit_price.to_string(),
            &format!("{:.1}", t.pips),
            t.close_reason.label(),
        ])?;
    }

    finish(wtr)
}

/// Export the cumulative pips curve, one row per trade (1-based).
pub fn export_equity_csv(trades: &[Trade]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["trade", "cumulative_pips"])?;
    for (i, equity) in equity_curve(trades).iter().enumerate() {
        wtr.write_record([&(i + 1).to_string(), &format!("{equity:.1}")])?;
    }
    finish(wtr)
}

pub fn export_trades_json(trades: &[Trade]) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(trades)?)
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let data = wtr
        .into_inner()
        .map_err(|e| ExportError::Flush(e.error().to_string()))?;
    Ok(String::from_utf8(data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CloseReason, Side};

    fn sample_trade() -> Trade {
        Trade {
            side: Side::Short,
            entry_index: 3,
            entry_label: "2024.01.02 10:15".into(),
            entry_price: 1.2345,
            exit_index: 9,
            exit_label: "2024.01.02 10:45".into(),
            exit_price: 1.2245,
            pips: 0.1,
            close_reason: CloseReason::TakeProfit,
        }
    }

    #[test]
    fn csv_trades_header_and_row() {
        let csv = export_trades_csv(&[sample_trade()]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "side,entry_index,entry_label,entry_price,exit_index,exit_label,exit_price,pips,close_reason"
        );
        assert_eq!(
            lines[1],
            "SHORT,3,2024.01.02 10:15,1.2345,9,2024.01.02 10:45,1.2245,0.1,TP"
        );
    }

    #[test]
    fn csv_empty_trades() {
        let csv = export_trades_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn csv_quotes_labels_with_commas() {
        let mut trade = sample_trade();
        trade.entry_label = "2024,01,02".into();
        let csv = export_trades_csv(&[trade]).unwrap();
        assert!(csv.contains("\"2024,01,02\""));
    }

    #[test]
    fn csv_equity_is_cumulative() {
        let mut a = sample_trade();
        a.pips = 12.0;
        let mut b = sample_trade();
        b.pips = -5.0;
        let csv = export_equity_csv(&[a, b]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines, vec!["trade,cumulative_pips", "1,12.0", "2,7.0"]);
    }

    #[test]
    fn json_lists_trades() {
        let json = export_trades_json(&[sample_trade()]).unwrap();
        let parsed: Vec<Trade> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, vec![sample_trade()]);
        assert!(json.contains("\"close_reason\""));
    }
}
