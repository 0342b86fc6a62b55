//! CSV tokenizer for catalog exports.
//!
//! Turns raw CSV text into an ordered list of [`RawRow`]s keyed by the
//! header line.
//!
//! # Algorithm
//!
//! 1. Drop a leading UTF-8 byte order mark, then split the text on `\n`.
//!    The first line is the header line.
//! 2. Header names are split on `,` and each one is trimmed and stripped of
//!    one surrounding `"` on each side.
//! 3. Every following line that is non-blank after trimming is scanned one
//!    character at a time. Each `"` toggles the in-quotes flag wherever it
//!    appears in the field, `""` inside quotes is a literal `"`, and `,`
//!    separates fields only outside quotes.
//! 4. Field values are trimmed and zipped positionally against the headers.
//!    Missing trailing fields become `""`; extra fields are dropped.
//!
//! Quoted fields cannot span physical lines. A raw newline inside quotes
//! ends the record at that point and the remainder is read as a new line.

use crate::models::RawRow;

/// Tokenize a complete CSV document into rows.
///
/// Returns an empty list for empty input or header-only input.
pub fn parse_csv(text: &str) -> Vec<RawRow> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text.split('\n');
    let headers = match lines.next() {
        Some(line) => parse_header(line),
        None => return Vec::new(),
    };

    lines
        .filter(|line| !line.trim().is_empty())
        .map(|line| zip_row(&headers, split_fields(line)))
        .collect()
}

/// Split the header line into column names.
pub fn parse_header(line: &str) -> Vec<String> {
    line.split(',')
        .map(|h| strip_quotes(h.trim()).to_string())
        .collect()
}

/// Split one data line into trimmed, unquoted field values.
///
/// An unterminated quote runs to the end of the line.
pub fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                chars.next();
                field.push('"');
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(field.trim().to_string());
                field.clear();
            }
            _ => field.push(c),
        }
    }
    fields.push(field.trim().to_string());
    fields
}

fn zip_row(headers: &[String], values: Vec<String>) -> RawRow {
    let mut values = values.into_iter();
    let mut row = RawRow::new();
    for header in headers {
        row.insert(header.as_str(), values.next().unwrap_or_default());
    }
    row
}

fn strip_quotes(s: &str) -> &str {
    let s = s.strip_prefix('"').unwrap_or(s);
    s.strip_suffix('"').unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_count_and_key_set_match_header() {
        let text = "Name,Slug,Categories\nMug,mug,Kitchen\n\nPlate,plate\n   \nBowl,bowl,Kitchen,extra\n\n";
        let rows = parse_csv(text);
        assert_eq!(rows.len(), 3);
        for row in &rows {
            assert_eq!(
                row.headers().collect::<Vec<_>>(),
                vec!["Name", "Slug", "Categories"]
            );
        }
    }

    #[test]
    fn test_missing_trailing_fields_are_empty() {
        let rows = parse_csv("Name,Slug,Categories\nPlate,plate");
        assert_eq!(rows[0].get("Categories"), Some(""));
    }

    #[test]
    fn test_extra_fields_are_dropped() {
        let rows = parse_csv("Name,Slug\nBowl,bowl,surplus,more");
        assert_eq!(rows[0].len(), 2);
        assert_eq!(rows[0].get("Slug"), Some("bowl"));
    }

    #[test]
    fn test_quoted_comma_is_one_field() {
        let fields = split_fields(r#"Mug,"a,b",c"#);
        assert_eq!(fields, vec!["Mug", "a,b", "c"]);
    }

    #[test]
    fn test_doubled_quote_unescapes() {
        let fields = split_fields(r#""a""b",x"#);
        assert_eq!(fields, vec![r#"a"b"#, "x"]);
    }

    #[test]
    fn test_empty_quoted_field() {
        let fields = split_fields(r#"a,"",b"#);
        assert_eq!(fields, vec!["a", "", "b"]);
    }

    #[test]
    fn test_unterminated_quote_runs_to_end_of_line() {
        let fields = split_fields(r#"Mug,"a, b"#);
        assert_eq!(fields, vec!["Mug", "a, b"]);
    }

    #[test]
    fn test_space_before_quote_still_quotes() {
        let rows = parse_csv("Name,Slug,Categories\nMug, \"a,b\",Kitchen\n");
        assert_eq!(rows[0].get("Slug"), Some("a,b"));
        assert_eq!(rows[0].get("Categories"), Some("Kitchen"));
    }

    #[test]
    fn test_mid_field_quote_toggles_quoting() {
        let fields = split_fields(r#"Frame 5"x7, oak",mug"#);
        assert_eq!(fields, vec!["Frame 5x7, oak", "mug"]);
    }

    #[test]
    fn test_byte_order_mark_is_dropped() {
        let rows = parse_csv("\u{feff}Name,Slug\nMug,mug\n");
        assert_eq!(rows[0].headers().collect::<Vec<_>>(), vec!["Name", "Slug"]);
        assert_eq!(rows[0].get("Name"), Some("Mug"));
    }

    #[test]
    fn test_header_quotes_stripped() {
        let headers = parse_header(r#""Name", "Slug" ,Featured?"#);
        assert_eq!(headers, vec!["Name", "Slug", "Featured?"]);
    }

    #[test]
    fn test_crlf_line_endings() {
        let rows = parse_csv("Name,Slug\r\nMug,mug\r\n\r\n");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("Slug"), Some("mug"));
        assert_eq!(rows[0].headers().collect::<Vec<_>>(), vec!["Name", "Slug"]);
    }

    #[test]
    fn test_header_only_and_empty_input() {
        assert!(parse_csv("Name,Slug\n").is_empty());
        assert!(parse_csv("").is_empty());
    }

    #[test]
    fn test_repeated_header_last_wins() {
        let rows = parse_csv("Name,Name\nfirst,second");
        assert_eq!(rows[0].len(), 1);
        assert_eq!(rows[0].get("Name"), Some("second"));
    }

    #[test]
    fn test_quoted_newline_is_not_joined() {
        // Multi-line quoted values are not supported; each physical line is a record.
        let rows = parse_csv("Name,Description\nMug,\"line one\nline two\"");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Description"), Some("line one"));
        assert_eq!(rows[1].get("Name"), Some("line two"));
    }
}
