//! Quoting for CMake bracket-free string arguments.

use std::path::Path;

use crate::util::fs::to_posix_string;

/// Quote `s` as a CMake quoted argument.
pub fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '$' => out.push_str("\\$"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Quote a filesystem path, normalizing separators to `/`.
pub fn quote_path(path: impl AsRef<Path>) -> String {
    quote_string(&to_posix_string(path.as_ref()))
}
