//! SQL script splitting and column type rendering.

use crate::node::DataType;

/// Split a free-form SQL script into individual statements.
///
/// Single left-to-right pass tracking three pieces of state: whether the
/// scanner is inside a single-quoted string, whether it is inside a `--`
/// line comment, and a running count of `"` characters. A `;` ends a
/// statement only outside strings and comments and while the double-quote
/// count is even. The parity rule does not distinguish a real quoted
/// identifier from a stray `"`, which is the compatible behavior, not an
/// oversight. Line comments are dropped entirely, `\r` is always dropped,
/// statements are trimmed and empty statements discarded.
pub fn split_sql_statements(script: &str) -> Vec<String> {
    let chars: Vec<char> = script.chars().collect();
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut in_comment = false;
    let mut quote_counter: usize = 0;

    fn flush(statements: &mut Vec<String>, current: &mut String) {
        let statement = current.trim();
        if !statement.is_empty() {
            statements.push(statement.to_string());
        }
        current.clear();
    }

    let mut pos = 0;
    while pos < chars.len() {
        let ch = chars[pos];
        if ch == ';' && !in_string && !in_comment && quote_counter % 2 == 0 {
            flush(&mut statements, &mut current);
        } else {
            let mut skip = false;
            match ch {
                '\'' => {
                    if !in_comment {
                        in_string = !in_string;
                    }
                }
                '"' => {
                    if !in_comment && !in_string {
                        quote_counter += 1;
                    }
                }
                '-' => {
                    if !in_string && !in_comment && pos + 1 < chars.len() && chars[pos + 1] == '-'
                    {
                        pos += 1;
                        in_comment = true;
                    }
                }
                '\r' => {
                    skip = true;
                }
                '\n' => {
                    if in_comment {
                        in_comment = false;
                        skip = true;
                    }
                }
                _ => {}
            }
            if !skip && !in_comment {
                current.push(ch);
            }
        }
        pos += 1;
    }
    flush(&mut statements, &mut current);

    statements
}

/// Render a physical column type, appending a length or precision suffix
/// where the logical type takes one.
///
/// `VARCHAR`/`CHAR` get `(max_length)`, `DECIMAL` gets `(max_length)` or
/// `(max_length, scale)`; every other type is emitted as mapped.
pub fn column_type(
    data_type: DataType,
    physical: &str,
    max_length: u32,
    numeric_scale: u32,
) -> String {
    match data_type {
        DataType::Varchar | DataType::Char => format!("{}({})", physical, max_length),
        DataType::Decimal => {
            if numeric_scale > 0 {
                format!("{}({}, {})", physical, max_length, numeric_scale)
            } else {
                format!("{}({})", physical, max_length)
            }
        }
        _ => physical.to_string(),
    }
}

/// Escape a remark literal by doubling embedded single quotes.
pub fn escape_remarks(remarks: &str) -> String {
    remarks.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_basic() {
        let statements = split_sql_statements("SELECT 1; SELECT 2;");
        assert_eq!(statements, vec!["SELECT 1", "SELECT 2"]);
    }

    #[test]
    fn test_split_semicolon_in_string_and_comment() {
        let statements =
            split_sql_statements("INSERT INTO t VALUES('a;b'); -- c;d\nDELETE FROM t;");
        assert_eq!(
            statements,
            vec!["INSERT INTO t VALUES('a;b')", "DELETE FROM t"]
        );
    }

    #[test]
    fn test_split_comment_dropped() {
        let statements = split_sql_statements("-- leading comment\nSELECT 1;");
        assert_eq!(statements, vec!["SELECT 1"]);
    }

    #[test]
    fn test_split_double_quote_parity() {
        // Odd quote count suppresses the separator until the pair closes.
        let statements = split_sql_statements("SELECT \"a;b\" FROM t; SELECT 2;");
        assert_eq!(statements, vec!["SELECT \"a;b\" FROM t", "SELECT 2"]);
    }

    #[test]
    fn test_split_carriage_returns_dropped() {
        let statements = split_sql_statements("SELECT 1;\r\nSELECT 2;\r\n");
        assert_eq!(statements, vec!["SELECT 1", "SELECT 2"]);
    }

    #[test]
    fn test_split_no_trailing_separator() {
        let statements = split_sql_statements("SELECT 1");
        assert_eq!(statements, vec!["SELECT 1"]);
    }

    #[test]
    fn test_split_discards_empty_statements() {
        let statements = split_sql_statements(" ; ;;\n;SELECT 1;");
        assert_eq!(statements, vec!["SELECT 1"]);
    }

    #[test]
    fn test_split_double_dash_inside_string() {
        let statements = split_sql_statements("INSERT INTO t VALUES('--x'); SELECT 1;");
        assert_eq!(statements, vec!["INSERT INTO t VALUES('--x')", "SELECT 1"]);
    }

    #[test]
    fn test_column_type_varchar() {
        assert_eq!(
            column_type(DataType::Varchar, "VARCHAR", 100, 0),
            "VARCHAR(100)"
        );
    }

    #[test]
    fn test_column_type_decimal() {
        assert_eq!(
            column_type(DataType::Decimal, "DECIMAL", 10, 2),
            "DECIMAL(10, 2)"
        );
        assert_eq!(
            column_type(DataType::Decimal, "DECIMAL", 10, 0),
            "DECIMAL(10)"
        );
    }

    #[test]
    fn test_column_type_plain() {
        assert_eq!(column_type(DataType::Int, "INTEGER", 0, 0), "INTEGER");
        assert_eq!(column_type(DataType::Timestamp, "DATETIME", 0, 0), "DATETIME");
    }

    #[test]
    fn test_escape_remarks() {
        assert_eq!(escape_remarks("it's"), "it''s");
        assert_eq!(escape_remarks("plain"), "plain");
    }
}
