use url::Url;

/// Parse an absolute URI.
///
/// `Url::parse` already refuses references without a scheme since there is no base to resolve
/// them against; the explicit check keeps that guarantee independent of the parser.
pub(super) fn parse(s: &str) -> Option<Url> {
    let url = Url::parse(s).ok()?;
    if url.scheme().is_empty() {
        return None;
    }
    Some(url)
}

/// Return the lower-cased RFC 3986 scheme of `s`, if it has one.
pub(super) fn scheme(s: &str) -> Option<String> {
    let end = s.find(':')?;
    let scheme = &s[..end];
    let mut chars = scheme.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return None,
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.') {
        return None;
    }
    Some(scheme.to_ascii_lowercase())
}
