/// Strip a leading `http://` or `https://` (exact lowercase spelling).
pub fn strip_web_scheme(url: &str) -> Option<&str> {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
}

/// Prefix test shared by every rule kind.
///
/// The URL matches when it is `http` or `https`, `://`, an optional `www.`,
/// and then starts with `prefix` literally. Nothing is required after the
/// prefix, so `a.com/page` also matches `a.com/pages` and `a.com/page/2`.
/// Click interception relies on this looser match to catch redirector
/// variants of a blocked link.
pub fn matches_prefix(url: &str, prefix: &str) -> bool {
    let Some(rest) = strip_web_scheme(url) else {
        return false;
    };
    rest.starts_with(prefix)
        || rest
            .strip_prefix("www.")
            .is_some_and(|rest| rest.starts_with(prefix))
}
