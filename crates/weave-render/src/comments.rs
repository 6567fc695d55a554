//! Line-comment markers per editor language.
//!
//! The combined layout writes context into the prefix, so it has to be
//! commented out in the document's own language.

/// Opening and closing comment markers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommentMarker {
    /// Written before the line.
    pub start: &'static str,
    /// Written after the line; empty for line comments.
    pub end: &'static str,
}

const SLASHES: CommentMarker = CommentMarker { start: "//", end: "" };
const HASH: CommentMarker = CommentMarker { start: "#", end: "" };
const DASHES: CommentMarker = CommentMarker { start: "--", end: "" };
const PERCENT: CommentMarker = CommentMarker { start: "%", end: "" };
const SEMICOLON: CommentMarker = CommentMarker { start: ";", end: "" };
const QUOTE: CommentMarker = CommentMarker { start: "'", end: "" };
const BANG: CommentMarker = CommentMarker { start: "!", end: "" };
const HTML: CommentMarker = CommentMarker { start: "<!--", end: "-->" };
const BLOCK: CommentMarker = CommentMarker { start: "/*", end: "*/" };

/// Marker for `language_id`, falling back to `//`.
#[must_use]
pub fn comment_marker(language_id: &str) -> CommentMarker {
    match language_id {
        "python" | "ruby" | "shellscript" | "perl" | "r" | "yaml" | "toml" | "dockerfile"
        | "makefile" | "elixir" | "powershell" | "coffeescript" | "julia" | "cmake" | "nim"
        | "crystal" | "graphql" | "tcl" => HASH,
        "sql" | "lua" | "haskell" | "elm" | "ada" | "vhdl" => DASHES,
        "latex" | "tex" | "matlab" | "erlang" | "prolog" => PERCENT,
        "clojure" | "lisp" | "scheme" | "racket" | "ini" => SEMICOLON,
        "vb" => QUOTE,
        "fortran" | "fortran-modern" => BANG,
        "html" | "xml" | "markdown" | "svg" | "vue" => HTML,
        "css" => BLOCK,
        _ => SLASHES,
    }
}

/// Comment out every line of `text`, keeping line endings.
///
/// Blank lines get the bare start marker.
#[must_use]
pub fn comment_lines(text: &str, language_id: &str) -> String {
    let marker = comment_marker(language_id);
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    for segment in text.split_inclusive('\n') {
        let (line, newline) = match segment.strip_suffix('\n') {
            Some(line) => (line, "\n"),
            None => (segment, ""),
        };
        out.push_str(marker.start);
        if !line.is_empty() {
            out.push(' ');
            out.push_str(line);
        }
        if !marker.end.is_empty() {
            out.push(' ');
            out.push_str(marker.end);
        }
        out.push_str(newline);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_slashes() {
        assert_eq!(comment_lines("a\nb\n", "typescript"), "// a\n// b\n");
        assert_eq!(comment_marker("unknown-lang"), SLASHES);
    }

    #[test]
    fn hash_languages() {
        assert_eq!(comment_lines("import os\n", "python"), "# import os\n");
        assert_eq!(comment_marker("yaml").start, "#");
    }

    #[test]
    fn blank_lines_get_bare_marker() {
        assert_eq!(comment_lines("a\n\nb", "rust"), "// a\n//\n// b");
    }

    #[test]
    fn closing_markers() {
        assert_eq!(comment_lines("note\n", "html"), "<!-- note -->\n");
        assert_eq!(comment_lines("x", "css"), "/* x */");
    }

    #[test]
    fn empty_text_stays_empty() {
        assert_eq!(comment_lines("", "python"), "");
    }
}
