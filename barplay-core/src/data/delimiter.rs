//! Cell delimiter detection for delimited price files.

use serde::{Deserialize, Serialize};

/// Cell separator of a price file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delimiter {
    Semicolon,
    Tab,
    Comma,
}

impl Delimiter {
    /// Guess the delimiter from the header line.
    ///
    /// Priority is fixed: `;`, then tab, then `,` as fallback. This is a
    /// heuristic: a semicolon file whose header also contains a tab, or a
    /// comma file with a stray `;` in a column name, is misclassified.
    /// Existing files depend on this exact order, so it must not be reordered.
    pub fn detect(line: &str) -> Self {
        if line.contains(';') {
            Delimiter::Semicolon
        } else if line.contains('\t') {
            Delimiter::Tab
        } else {
            Delimiter::Comma
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Delimiter::Semicolon => b';',
            Delimiter::Tab => b'\t',
            Delimiter::Comma => b',',
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Delimiter::Semicolon => ";",
            Delimiter::Tab => "\\t",
            Delimiter::Comma => ",",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semicolon_wins() {
        assert_eq!(Delimiter::detect("Date;Time;Open"), Delimiter::Semicolon);
        assert_eq!(Delimiter::detect("Date;Time\tOpen,High"), Delimiter::Semicolon);
    }

    #[test]
    fn tab_before_comma() {
        assert_eq!(Delimiter::detect("Date\tTime\tOpen"), Delimiter::Tab);
        assert_eq!(Delimiter::detect("Date\tTime,Open"), Delimiter::Tab);
    }

    #[test]
    fn comma_is_fallback() {
        assert_eq!(Delimiter::detect("Date,Time,Open"), Delimiter::Comma);
        assert_eq!(Delimiter::detect("close"), Delimiter::Comma);
    }
}
