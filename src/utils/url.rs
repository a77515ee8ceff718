// src/utils/url.rs

//! URL manipulation utilities.

use regex::Regex;

/// Drop a leading `http://` or `https://`.
///
/// # Examples
/// ```
/// use lottery_harvester::utils::url::strip_scheme;
///
/// assert_eq!(strip_scheme("https://example.com/a"), "example.com/a");
/// ```
pub fn strip_scheme(url: &str) -> &str {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url)
}

/// Pattern matching result-page paths: prefix, uppercase code, numeric draw id.
pub fn result_path_regex(prefix: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r"{}([A-Z]+)-(\d+)", regex::escape(prefix)))
}

/// Lottery code embedded in a result-page URL.
pub fn lottery_code(url: &str, pattern: &Regex) -> Option<String> {
    pattern
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Strip fragment and trailing slash so that equivalent links dedupe.
pub fn normalize(url: &str) -> String {
    let without_fragment = url.split('#').next().unwrap_or(url);
    without_fragment.trim_end_matches('/').to_string()
}
