//! Markup scrubbing for indexed FTS text.
//!
//! Mirror population strips markup from indexed text columns so search
//! terms match prose rather than tag soup. The scrub is lossy and
//! one-directional; source rows are never modified.

use std::sync::LazyLock;

use regex::Regex;

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("static regex must compile"));

/// Strips markup tags, decodes the common HTML entities, and collapses
/// runs of whitespace into single spaces.
///
/// # Examples
///
/// ```
/// use relmap_sqlite::sanitize::scrub_markup;
///
/// assert_eq!(scrub_markup("<b>bold</b> move"), "bold move");
/// assert_eq!(scrub_markup("a &amp; b"), "a & b");
/// ```
pub fn scrub_markup(text: &str) -> String {
    let stripped = TAG_RE.replace_all(text, " ");

    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");

    let mut out = String::with_capacity(decoded.len());
    let mut last_was_space = true;
    for c in decoded.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_tags() {
        assert_eq!(scrub_markup("<b>bold</b>"), "bold");
        assert_eq!(
            scrub_markup("<p>one</p><p>two</p>"),
            "one two"
        );
    }

    #[test]
    fn test_decodes_entities() {
        assert_eq!(scrub_markup("fish &amp; chips"), "fish & chips");
        assert_eq!(scrub_markup("1 &lt; 2 &gt; 0"), "1 < 2 > 0");
        assert_eq!(scrub_markup("it&#39;s &quot;fine&quot;"), "it's \"fine\"");
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(scrub_markup("  a \n\t b  "), "a b");
        assert_eq!(scrub_markup("x&nbsp;&nbsp;y"), "x y");
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(scrub_markup("already clean"), "already clean");
        assert_eq!(scrub_markup(""), "");
    }
}
