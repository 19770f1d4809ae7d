use std::borrow::Cow;

/// Line-protocol metacharacters in measurement names, tag keys, tag values
/// and field keys.
pub const KEY_METACHARACTERS: &[char] = &[' ', ',', '='];

/// Prefix every occurrence of a character from `to_escape` with a backslash.
///
/// Single pass; the backslash itself is never escaped, so escaping an
/// already escaped string escapes the metacharacters again.
pub fn escape<'a>(text: &'a str, to_escape: &[char]) -> Cow<'a, str> {
    if !text.contains(to_escape) {
        return Cow::Borrowed(text);
    }

    let mut escaped = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        if to_escape.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    Cow::Owned(escaped)
}

/// Escape a measurement name, tag key, tag value or field key.
pub fn escape_key(text: &str) -> Cow<'_, str> {
    escape(text, KEY_METACHARACTERS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untouched_text_is_borrowed() {
        assert!(matches!(escape_key("plain"), Cow::Borrowed("plain")));
    }

    #[test]
    fn test_metacharacters_escaped() {
        assert_eq!(escape_key("luke skywalker"), "luke\\ skywalker");
        assert_eq!(escape_key("a,b=c"), "a\\,b\\=c");
    }

    #[test]
    fn test_only_requested_characters() {
        assert_eq!(escape("a b,c", &[',']), "a b\\,c");
        assert_eq!(escape("say \"hi\"", &['"']), "say \\\"hi\\\"");
    }

    #[test]
    fn test_backslash_not_escaped() {
        assert_eq!(escape_key("C:\\tmp dir"), "C:\\tmp\\ dir");
    }
}
