//! Delimited text → header + rows of trimmed cells.
//!
//! No quoting rules apply: every delimiter byte splits a cell. Blank lines are
//! skipped everywhere, including before the header.

use super::delimiter::Delimiter;
use super::ingest::IngestError;

/// A delimited text payload split into cells.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub delimiter: Delimiter,
}

impl RawTable {
    /// Split `text` into a header and data rows.
    ///
    /// Fails only if the payload has no non-blank line at all.
    pub fn parse(text: &str) -> Result<Self, IngestError> {
        let first = text
            .lines()
            .find(|line| !line.trim().is_empty())
            .ok_or(IngestError::EmptyPayload)?;
        let delimiter = Delimiter::detect(first);

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter.as_byte())
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let mut lines: Vec<Vec<String>> = Vec::new();
        for record in reader.records() {
            let record = record?;
            // Whitespace-only line. With tab as delimiter the tabs themselves
            // are whitespace, so any all-empty record is blank.
            let blank = record.iter().all(str::is_empty)
                && (record.len() == 1 || delimiter == Delimiter::Tab);
            if blank {
                continue;
            }
            lines.push(record.iter().map(str::to_owned).collect());
        }

        let mut lines = lines.into_iter();
        let header = lines.next().ok_or(IngestError::EmptyPayload)?;
        Ok(Self {
            header,
            rows: lines.collect(),
            delimiter,
        })
    }

    /// Number of data rows, before any cap is applied.
    pub fn total_rows(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_semicolon_file_with_blank_lines() {
        let text = "\n  \nDate;Time;Open;High;Low;Close\r\n2024.01.02; 10:00 ;1;2;0.5;1.5\r\n\r\n2024.01.02;10:05;1.5;2;1;1.8\n";
        let table = RawTable::parse(text).unwrap();
        assert_eq!(table.delimiter, Delimiter::Semicolon);
        assert_eq!(table.header, vec!["Date", "Time", "Open", "High", "Low", "Close"]);
        assert_eq!(table.total_rows(), 2);
        assert_eq!(table.rows[0][1], "10:00");
        assert_eq!(table.rows[1][5], "1.8");
    }

    #[test]
    fn quotes_are_ordinary_characters() {
        let table = RawTable::parse("a,b\n\"x,y\"\n").unwrap();
        assert_eq!(table.rows[0], vec!["\"x", "y\""]);
    }

    #[test]
    fn tab_file_skips_tab_only_lines() {
        let table = RawTable::parse("Date\tClose\n\t\n2024.01.02\t1.5\n").unwrap();
        assert_eq!(table.delimiter, Delimiter::Tab);
        assert_eq!(table.total_rows(), 1);
    }

    #[test]
    fn ragged_rows_are_kept() {
        let table = RawTable::parse("Date,Open,High,Low,Close\n2024.01.02,1\n").unwrap();
        assert_eq!(table.rows[0].len(), 2);
    }

    #[test]
    fn header_only_has_no_rows() {
        let table = RawTable::parse("Date,Close\n").unwrap();
        assert_eq!(table.total_rows(), 0);
    }

    #[test]
    fn empty_payload_rejected() {
        assert!(matches!(RawTable::parse(""), Err(IngestError::EmptyPayload)));
        assert!(matches!(RawTable::parse(" \n\t\n"), Err(IngestError::EmptyPayload)));
    }
}
