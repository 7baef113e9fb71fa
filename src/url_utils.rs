//! URL canonicalization so equivalent addresses deduplicate to one frontier entry.

use std::collections::BTreeMap;
use url::Url;

/// Query parameters that only carry per-visitor session state.
const SESSION_PARAMS: &[&str] = &["jsessionid", "phpsessid", "aspsessionid"];

/// Canonicalize an absolute URL.
pub fn canonicalize_url(url: &str) -> Option<String> {
    canonicalize(url, None)
}

/// Resolve `reference` against `base` and return its canonical absolute form.
///
/// Returns `None` when the result has no host or any stage fails to parse.
/// The output is a fixed point: canonicalizing it again yields the same string.
pub fn canonicalize(reference: &str, base: Option<&str>) -> Option<String> {
    let resolved = resolve(reference, base)?;

    let host = resolved
        .host_str()
        .filter(|host| !host.is_empty())?
        .to_ascii_lowercase();
    let scheme = resolved.scheme().to_ascii_lowercase();
    let path = normalize_path(resolved.path())?;
    let query = resolved.query().map(canonical_query).unwrap_or_default();
    let port = resolved
        .port()
        .filter(|port| Some(*port) != default_port(&scheme));

    let mut canonical =
        String::with_capacity(scheme.len() + host.len() + path.len() + query.len() + 10);
    canonical.push_str(&scheme);
    canonical.push_str("://");
    canonical.push_str(&host);
    if let Some(port) = port {
        canonical.push(':');
        canonical.push_str(&port.to_string());
    }
    canonical.push_str(&path);
    if !query.is_empty() {
        canonical.push('?');
        canonical.push_str(&query);
    }

    Some(canonical)
}

fn resolve(reference: &str, base: Option<&str>) -> Option<Url> {
    let reference = reference.trim();
    match base.map(str::trim).filter(|base| !base.is_empty()) {
        Some(base) => Url::parse(base).ok()?.join(reference).ok(),
        None => Url::parse(reference).ok(),
    }
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" | "ws" => Some(80),
        "https" | "wss" => Some(443),
        "ftp" => Some(21),
        _ => None,
    }
}

fn normalize_path(raw: &str) -> Option<String> {
    if has_malformed_escape(raw) {
        return None;
    }

    let mut path = remove_dot_segments(&raw.replace('\\', "/"));

    while path.contains("//") {
        path = path.replace("//", "/");
    }

    while path.starts_with("/../") {
        path.replace_range(..3, "");
    }

    let path = path.trim();
    if path.is_empty() {
        return Some("/".to_string());
    }

    Some(
        path.replace("%7E", "~")
            .replace("%7e", "~")
            .replace(' ', "%20"),
    )
}

/// Drop `.` segments and fold `..` into the preceding segment.
///
/// A `..` with nothing left to fold against is kept, which is what leaves
/// `/../` prefixes behind for `normalize_path` to strip.
fn remove_dot_segments(path: &str) -> String {
    let absolute = path.starts_with('/');
    let body = if absolute { &path[1..] } else { path };

    let segments: Vec<&str> = body.split('/').collect();
    let last = segments.len() - 1;
    let mut kept: Vec<&str> = Vec::with_capacity(segments.len());

    for (index, segment) in segments.iter().enumerate() {
        match *segment {
            "." => {}
            ".." => match kept.last() {
                Some(top) if *top != ".." => {
                    kept.pop();
                }
                _ => kept.push(".."),
            },
            other => kept.push(other),
        }

        if index == last && matches!(*segment, "." | "..") {
            kept.push("");
        }
    }

    let mut normalized = String::with_capacity(path.len());
    if absolute {
        normalized.push('/');
    }
    normalized.push_str(&kept.join("/"));
    normalized
}

/// Parse, sort, filter and re-encode a raw query string.
///
/// Names are encoded before they are keyed so that `%61` and `a` collide and
/// sort the same way on every pass. Duplicate names keep the last value.
fn canonical_query(raw: &str) -> String {
    let mut params: BTreeMap<String, String> = BTreeMap::new();

    for pair in raw.split('&').filter(|pair| !pair.is_empty()) {
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        params.insert(encode_component(name), encode_component(value));
    }

    params
        .into_iter()
        .filter(|(name, _)| !is_session_param(name))
        .map(|(name, value)| {
            if value.is_empty() {
                name
            } else {
                format!("{}={}", name, value)
            }
        })
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join("&")
}

fn is_session_param(name: &str) -> bool {
    SESSION_PARAMS
        .iter()
        .any(|session| name.eq_ignore_ascii_case(session))
}

/// RFC 3986 encoding of one query component.
///
/// A literal `+` is data, not a space. Components with broken escapes are
/// left alone rather than guessed at.
fn encode_component(raw: &str) -> String {
    let escaped = raw.replace('+', "%2B");
    if has_malformed_escape(&escaped) {
        return escaped;
    }

    let decoded = urlencoding::decode_binary(escaped.as_bytes());
    urlencoding::encode(&String::from_utf8_lossy(&decoded)).into_owned()
}

fn has_malformed_escape(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.iter().enumerate().any(|(index, &byte)| {
        byte == b'%'
            && !(bytes.get(index + 1).is_some_and(u8::is_ascii_hexdigit)
                && bytes.get(index + 2).is_some_and(u8::is_ascii_hexdigit))
    })
}
