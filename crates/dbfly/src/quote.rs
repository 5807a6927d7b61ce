//! Identifier quoting for SQL fragments.
//!
//! SQL identifiers cannot be passed as bind parameters, so the generators
//! build statements with identifiers interpolated directly. The [`Quoter`]
//! wraps identifiers in dialect-specific delimiters according to a
//! reservation strategy fixed at construction time.
//!
//! The quoter operates on whole SQL fragments, not single identifiers: it
//! scans word-by-word (splitting on spaces and `.`), strips a pre-existing
//! quote pair from each word, and re-wraps only the words the strategy
//! reserves. Qualified names (`a.b`) quote each part separately and the word
//! after an `AS` keyword starts a fresh identifier. The wildcard `*` is
//! never quoted.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Quote mark accepted as "already quoted" regardless of dialect.
pub const COMMON_QUOTE_MARK: u8 = b'`';

/// When identifiers are wrapped in dialect delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotePolicy {
    /// Every identifier is delimited.
    #[default]
    Always,
    /// No identifier is delimited.
    Never,
    /// Only identifiers in the dialect's reserved-word set are delimited.
    ReservedOnly,
}

/// Reservation strategy resolved from a [`QuotePolicy`] at construction.
#[derive(Debug, Clone)]
pub enum Reserved {
    /// Every word is treated as reserved.
    Always,
    /// No word is treated as reserved.
    Never,
    /// Words are reserved when they appear in the set (stored uppercase).
    Words(HashSet<String>),
}

impl Reserved {
    fn is_reserved(&self, word: &str) -> bool {
        match self {
            Reserved::Always => true,
            Reserved::Never => false,
            Reserved::Words(words) => words.contains(word.to_uppercase().as_str()),
        }
    }
}

/// Quotes identifiers inside SQL fragments with a delimiter pair.
#[derive(Debug, Clone)]
pub struct Quoter {
    prefix: u8,
    suffix: u8,
    reserved: Reserved,
}

impl Quoter {
    /// Create a quoter from a delimiter pair and reservation strategy.
    pub fn new(prefix: u8, suffix: u8, reserved: Reserved) -> Self {
        Self {
            prefix,
            suffix,
            reserved,
        }
    }

    /// A quoter with no delimiters writes every word bare.
    pub fn is_empty(&self) -> bool {
        self.prefix == 0 && self.suffix == 0
    }

    /// Quote a fragment into a new string.
    pub fn quote(&self, value: &str) -> String {
        let mut buf = String::with_capacity(value.len() + 2);
        self.quote_to(&mut buf, value);
        buf
    }

    /// Quote a fragment into a growing buffer.
    pub fn quote_to(&self, buf: &mut String, value: &str) {
        let bytes = value.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            let start = find_start(bytes, i);
            if start > i {
                buf.push_str(&value[i..start]);
            }
            if start == bytes.len() {
                return;
            }
            let end = find_word(bytes, start);
            self.quote_word_to(buf, &value[start..end]);
            i = end;
        }
    }

    /// Quote and join a list of identifiers with a separator.
    pub fn join(&self, items: &[String], sep: &str) -> String {
        let mut buf = String::new();
        self.join_to(&mut buf, items, sep);
        buf
    }

    /// Quote and join into a growing buffer.
    pub fn join_to(&self, buf: &mut String, items: &[String], sep: &str) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                buf.push_str(sep);
            }
            self.quote_to(buf, item.trim());
        }
    }

    /// Strip one layer of delimiters from a quoted (possibly qualified) name.
    ///
    /// Delimiter characters are removed only at the string boundaries and
    /// around `.` separators; interior occurrences are kept.
    pub fn trim(&self, value: &str) -> String {
        if value.len() < 2 {
            return value.to_string();
        }
        let prefix = self.prefix as char;
        let suffix = self.suffix as char;
        let chars: Vec<char> = value.chars().collect();
        let mut out = String::with_capacity(value.len());
        for i in 0..chars.len() {
            let c = chars[i];
            let strip = (i == 0 && c == prefix)
                || (i == chars.len() - 1 && c == suffix)
                || (c == suffix && i + 1 < chars.len() && chars[i + 1] == '.')
                || (c == prefix && i > 0 && chars[i - 1] == '.');
            if !strip {
                out.push(c);
            }
        }
        out
    }

    fn quote_word_to(&self, buf: &mut String, word: &str) {
        let bytes = word.as_bytes();
        let already_quoted = bytes.len() >= 2
            && ((bytes[0] == COMMON_QUOTE_MARK && bytes[bytes.len() - 1] == COMMON_QUOTE_MARK)
                || (bytes[0] == self.prefix && bytes[bytes.len() - 1] == self.suffix));
        let real = if already_quoted {
            &word[1..word.len() - 1]
        } else {
            word
        };

        if self.is_empty() {
            buf.push_str(real);
            return;
        }

        let wrap = real != "*" && self.reserved.is_reserved(real);
        if wrap {
            buf.push(self.prefix as char);
        }
        buf.push_str(real);
        if wrap {
            buf.push(self.suffix as char);
        }
    }
}

/// Find the end of the word beginning at `start` (exclusive).
fn find_word(value: &[u8], start: usize) -> usize {
    for j in start..value.len() {
        if value[j] == b'.' || value[j] == b' ' {
            return j;
        }
    }
    value.len()
}

/// Find the start of the next word at or after `start`.
///
/// Skips a `.` qualifier separator and runs of spaces. A case-insensitive
/// `AS` keyword between spaces is passed over so the alias that follows is
/// treated as a new identifier.
fn find_start(value: &[u8], start: usize) -> usize {
    if value[start] == b'.' {
        return start + 1;
    }
    if value[start] != b' ' {
        return start;
    }

    let mut k = match (start..value.len()).find(|&j| value[j] != b' ') {
        Some(j) => j,
        None => return value.len(),
    };
    if k + 1 < value.len()
        && value[k].eq_ignore_ascii_case(&b'a')
        && value[k + 1].eq_ignore_ascii_case(&b's')
        && (k + 2 == value.len() || value[k + 2] == b' ')
    {
        k += 2;
    }

    for j in k..value.len() {
        if value[j] != b' ' {
            return j;
        }
    }
    value.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn always() -> Quoter {
        Quoter::new(b'`', b'`', Reserved::Always)
    }

    fn never() -> Quoter {
        Quoter::new(b'`', b'`', Reserved::Never)
    }

    fn reserved_only(words: &[&str]) -> Quoter {
        Quoter::new(
            b'"',
            b'"',
            Reserved::Words(words.iter().map(|w| w.to_uppercase()).collect()),
        )
    }

    #[test]
    fn test_quote_always() {
        assert_eq!(always().quote("select"), "`select`");
        assert_eq!(always().quote("name"), "`name`");
    }

    #[test]
    fn test_quote_never() {
        assert_eq!(never().quote("select"), "select");
    }

    #[test]
    fn test_quote_reserved_only() {
        let q = reserved_only(&["order", "select"]);
        assert_eq!(q.quote("id"), "id");
        assert_eq!(q.quote("order"), "\"order\"");
        assert_eq!(q.quote("ORDER"), "\"ORDER\"");
    }

    #[test]
    fn test_quote_qualified_name() {
        assert_eq!(always().quote("schema.table"), "`schema`.`table`");
    }

    #[test]
    fn test_quote_as_alias() {
        assert_eq!(always().quote("a.b AS c"), "`a`.`b` AS `c`");
        assert_eq!(always().quote("a.b as c"), "`a`.`b` as `c`");
    }

    #[test]
    fn test_quote_word_starting_with_as() {
        assert_eq!(always().quote("t assignee"), "`t` `assignee`");
    }

    #[test]
    fn test_quote_strips_existing_pair() {
        assert_eq!(always().quote("`name`"), "`name`");
        let q = Quoter::new(b'[', b']', Reserved::Always);
        assert_eq!(q.quote("[name]"), "[name]");
        assert_eq!(q.quote("`name`"), "[name]");
    }

    #[test]
    fn test_quote_star_untouched() {
        assert_eq!(always().quote("*"), "*");
        assert_eq!(always().quote("t.*"), "`t`.*");
    }

    #[test]
    fn test_quote_empty_quoter() {
        let q = Quoter::new(0, 0, Reserved::Always);
        assert_eq!(q.quote("select"), "select");
    }

    #[test]
    fn test_join() {
        let quoted = always().join(
            &["a".to_string(), " b".to_string(), "c ".to_string()],
            ", ",
        );
        assert_eq!(quoted, "`a`, `b`, `c`");
    }

    #[test]
    fn test_trim() {
        assert_eq!(always().trim("`name`"), "name");
        assert_eq!(always().trim("`a`.`b`"), "a.b");
        assert_eq!(always().trim("name"), "name");
        assert_eq!(always().trim("`"), "`");
    }

    #[test]
    fn test_quote_to_preserves_spacing() {
        let mut buf = String::new();
        always().quote_to(&mut buf, "a  b");
        assert_eq!(buf, "`a`  `b`");
    }
}
