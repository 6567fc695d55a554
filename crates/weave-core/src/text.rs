//! Small text helpers shared by the renderer and completion components.

use std::borrow::Cow;

/// Convert `\r\n` and lone `\r` line endings to `\n`.
///
/// Borrows when the input already uses `\n` only.
pub fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

/// Append `delimiter` unless `text` already ends with it.
pub fn ensure_trailing(text: &str, delimiter: &str) -> String {
    if delimiter.is_empty() || text.ends_with(delimiter) {
        text.to_string()
    } else {
        format!("{text}{delimiter}")
    }
}

/// Remove a single trailing `delimiter`, if present.
pub fn strip_trailing<'a>(text: &'a str, delimiter: &str) -> &'a str {
    if delimiter.is_empty() {
        return text;
    }
    text.strip_suffix(delimiter).unwrap_or(text)
}

/// Whether `text` starts with a shebang (`#!`) line.
#[must_use]
pub fn is_shebang(text: &str) -> bool {
    text.starts_with("#!")
}
