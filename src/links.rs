//! Small URL helpers: origins, the `page` query parameter, and percent-encoding.

use crate::constants::PAGE_QUERY_PARAM;

/// `scheme://authority` of an absolute URL, or `None` for relative URLs.
pub fn origin(url: &str) -> Option<&str> {
    let scheme_end = url.find("://")?;
    let scheme = &url[..scheme_end];
    if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+') {
        return None;
    }
    let rest = &url[scheme_end + 3..];
    let authority_len = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    Some(&url[..scheme_end + 3 + authority_len])
}

pub fn is_absolute(url: &str) -> bool {
    origin(url).is_some()
}

/// Whether `link` stays on the origin of `current`. Relative links always do,
/// protocol-relative ones (`//host/..`) never do.
pub fn is_same_origin(link: &str, current: &str) -> bool {
    if link.starts_with("//") {
        return false;
    }
    match (origin(link), origin(current)) {
        (None, _) => true,
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        (Some(_), None) => false,
    }
}

/// Path, query and fragment of a URL (everything after the origin).
pub fn path_and_query(url: &str) -> &str {
    match origin(url) {
        Some(origin) => {
            let rest = &url[origin.len()..];
            if rest.is_empty() { "/" } else { rest }
        }
        None => url,
    }
}

/// Split a URL into (before `?`, query without `?`, fragment including `#`).
fn split_query(url: &str) -> (&str, Option<&str>, &str) {
    let (main, fragment) = match url.find('#') {
        Some(pos) => url.split_at(pos),
        None => (url, ""),
    };
    match main.find('?') {
        Some(pos) => (&main[..pos], Some(&main[pos + 1..]), fragment),
        None => (main, None, fragment),
    }
}

/// Value of query parameter `name`, percent-decoded.
pub fn query_param(url: &str, name: &str) -> Option<String> {
    let (_, query, _) = split_query(url);
    query?.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        (percent_decode(key) == name).then(|| percent_decode(value))
    })
}

/// Set query parameter `name` to `value`, keeping every other parameter, their
/// order, and the fragment.
pub fn with_query_param(url: &str, name: &str, value: &str) -> String {
    let (base, query, fragment) = split_query(url);
    let encoded = format!("{}={}", percent_encode(name), percent_encode(value));

    let mut pairs: Vec<String> = Vec::new();
    let mut replaced = false;
    for pair in query.unwrap_or("").split('&').filter(|p| !p.is_empty()) {
        let key = pair.split_once('=').map(|(k, _)| k).unwrap_or(pair);
        if percent_decode(key) == name {
            if !replaced {
                pairs.push(encoded.clone());
                replaced = true;
            }
        } else {
            pairs.push(pair.to_string());
        }
    }
    if !replaced {
        pairs.push(encoded);
    }

    format!("{}?{}{}", base, pairs.join("&"), fragment)
}

/// 1-based page number from the `page` query parameter, if numeric.
pub fn page_number_from_url(url: &str) -> Option<usize> {
    query_param(url, PAGE_QUERY_PARAM)?.trim().parse().ok()
}

/// `url` with its `page` parameter set to `page_number`.
pub fn url_with_page(url: &str, page_number: usize) -> String {
    with_query_param(url, PAGE_QUERY_PARAM, &page_number.to_string())
}

/// Percent-encode everything outside the unreserved set used by
/// `encodeURIComponent`.
pub fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// Decode `%XX` escapes and `+` as space. Malformed escapes are kept verbatim.
pub fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(decoded) => {
                        out.push(decoded);
                        i += 3;
                        continue;
                    }
                    None => out.push(b'%'),
                }
            }
            b'+' => out.push(b' '),
            other => out.push(other),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Product search URL for a SKU.
pub fn search_url(search_path: &str, sku: &str) -> String {
    format!("{}?search={}", search_path, percent_encode(sku))
}
