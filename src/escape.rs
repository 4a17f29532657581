use aho_corasick::AhoCorasick;
use once_cell::sync::Lazy;

// Built once, shared across threads
static XML_ESCAPER: Lazy<Option<AhoCorasick>> =
    Lazy::new(|| AhoCorasick::new(["&", "<", ">", "\"", "'"]).ok());

const REPLACEMENTS: [&str; 5] = ["&amp;", "&lt;", "&gt;", "&quot;", "&apos;"];

/// Escape XML special characters for use in attribute values and text.
///
/// # Examples
///
/// ```
/// use opcpack::escape::escape_xml;
/// assert_eq!(escape_xml("a & b"), "a &amp; b");
/// assert_eq!(escape_xml("<t a=\"1\"/>"), "&lt;t a=&quot;1&quot;/&gt;");
/// ```
#[inline]
pub fn escape_xml(s: &str) -> String {
    match XML_ESCAPER.as_ref() {
        Some(escaper) => escaper.replace_all(s, &REPLACEMENTS),
        None => s
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&apos;"),
    }
}
