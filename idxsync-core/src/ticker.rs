//! Ticker symbol forms.
//!
//! A symbol read from the ticker list is the *raw* form. Provider lookups use
//! the *suffixed* form (exchange code appended, e.g. `BBCA.JK`), and every
//! persisted record is keyed by the *clean* form (suffix stripped).

use std::fmt;

/// Exchange suffix for the Indonesia Stock Exchange on Yahoo Finance.
pub const DEFAULT_SUFFIX: &str = ".JK";

/// A ticker symbol with its exchange suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ticker {
    raw: String,
    clean: String,
    suffix: String,
}

impl Ticker {
    /// Build a ticker from a raw symbol and exchange suffix.
    ///
    /// Surrounding whitespace is trimmed. A raw symbol that already ends in
    /// `suffix` is accepted; the suffix is never doubled.
    pub fn new(raw: &str, suffix: &str) -> Self {
        let raw = raw.trim().to_string();
        let clean = clean_symbol(&raw, suffix).to_string();
        Self {
            raw,
            clean,
            suffix: suffix.to_string(),
        }
    }

    /// Ticker with the default `.JK` suffix.
    pub fn idx(raw: &str) -> Self {
        Self::new(raw, DEFAULT_SUFFIX)
    }

    /// The symbol as it appeared in the input.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Storage key: the symbol without the exchange suffix.
    pub fn clean(&self) -> &str {
        &self.clean
    }

    /// Provider lookup symbol: clean form plus suffix.
    pub fn suffixed(&self) -> String {
        format!("{}{}", self.clean, self.suffix)
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.suffixed())
    }
}

/// Strip an exchange suffix from a symbol, if present.
pub fn clean_symbol<'a>(symbol: &'a str, suffix: &str) -> &'a str {
    if suffix.is_empty() {
        return symbol;
    }
    symbol.strip_suffix(suffix).unwrap_or(symbol)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forms_of_plain_symbol() {
        let t = Ticker::idx("BBCA");
        assert_eq!(t.raw(), "BBCA");
        assert_eq!(t.clean(), "BBCA");
        assert_eq!(t.suffixed(), "BBCA.JK");
    }

    #[test]
    fn already_suffixed_symbol_is_not_doubled() {
        let t = Ticker::idx("TLKM.JK");
        assert_eq!(t.clean(), "TLKM");
        assert_eq!(t.suffixed(), "TLKM.JK");
    }

    #[test]
    fn whitespace_is_trimmed() {
        let t = Ticker::new("  ASII \n", ".JK");
        assert_eq!(t.raw(), "ASII");
        assert_eq!(t.suffixed(), "ASII.JK");
    }

    #[test]
    fn empty_suffix_leaves_symbol_alone() {
        let t = Ticker::new("AAPL", "");
        assert_eq!(t.clean(), "AAPL");
        assert_eq!(t.suffixed(), "AAPL");
        assert_eq!(clean_symbol("AAPL", ""), "AAPL");
    }

    #[test]
    fn display_uses_provider_form() {
        assert_eq!(Ticker::idx("BBRI").to_string(), "BBRI.JK");
    }
}
