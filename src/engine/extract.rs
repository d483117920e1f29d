use std::collections::BTreeMap;
use regex::bytes::Regex;
use tracing::debug;

/// Apply a `search` pattern to a response body and return its named captures
/// from the first match.
///
/// Returns `None` when the pattern does not compile, does not match, or has
/// no named groups. A named group that did not take part in the match is
/// captured as an empty string.
pub fn extract_captures(pattern: &str, body: &[u8]) -> Option<BTreeMap<String, String>> {
    let re = match Regex::new(pattern) {
        Ok(re) => re,
        Err(e) => {
            debug!(pattern = %pattern, error = %e, "Search pattern does not compile");
            return None;
        }
    };

    let names: Vec<&str> = re.capture_names().flatten().collect();
    if names.is_empty() {
        return None;
    }

    let caps = re.captures(body)?;
    let captured = names.into_iter()
        .map(|name| {
            let text = caps.name(name)
                .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned())
                .unwrap_or_default();
            (name.to_string(), text)
        })
        .collect();
    Some(captured)
}
