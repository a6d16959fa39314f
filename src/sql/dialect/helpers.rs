//! Shared helpers for dialect implementations.

/// Quote an identifier with double quotes (ANSI style).
///
/// Embedded double quotes are escaped by doubling.
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote an identifier with backticks (BigQuery style).
///
/// Embedded backticks are escaped by doubling.
pub fn quote_backtick(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

/// Format a boolean as a true/false literal.
pub fn format_bool_literal(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}
