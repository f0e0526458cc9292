// file: src/utils/shell.rs
// version: 1.0.0
// guid: 3c1f7a2e-58d4-4b6e-9a0f-2d7e41c9b8a5

//! Quoting helpers for commands handed to `bash -c` and `psql`

/// Quote a value for safe interpolation into a POSIX shell command line
pub fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,".contains(c))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Escape a value for use inside a double-quoted shell word
///
/// Only `\`, `"`, `$` and backtick are special there, so surrounding text
/// such as `$PATH` keeps expanding.
pub fn double_quote_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '"' | '$' | '`') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Quote a SQL string literal
pub fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Quote a SQL identifier
pub fn sql_ident(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}
