//! Canonical request construction.
//!
//! The canonical request is a standardized string laying out the
//! components used in the SigV4 signing algorithm. It is useful for
//! quickly comparing inputs to find signature mismatches and unintended
//! variances.

use std::collections::BTreeMap;

use percent_encoding::utf8_percent_encode;
use smithy_rt_core::transport::{Request, Uri};
use smithy_rt_core::utils::{COMPONENT_ENCODE_SET, PATH_ENCODE_SET};

/// Payload hash sentinel for unsigned payloads over TLS.
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// SHA-256 of the empty byte string, used when a request has no body.
pub const EMPTY_SHA256_HASH: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

const HEADERS_EXCLUDED_FROM_SIGNING: [&str; 7] = [
    "accept",
    "accept-encoding",
    "authorization",
    "connection",
    "expect",
    "user-agent",
    "x-amzn-trace-id",
];

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

/// Removes dot segments from a path per RFC 3986 section 5.2.4.
///
/// Optionally removes consecutive slashes, true by default for the encoded
/// canonical form.
#[must_use]
pub fn remove_dot_segments(path: &str, remove_consecutive_slashes: bool) -> String {
    let mut output: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        if segment == "." {
            continue;
        } else if segment != ".." {
            output.push(segment);
        } else if !output.is_empty() {
            output.pop();
        }
    }
    if path.starts_with('/') && output.first().is_none_or(|first| !first.is_empty()) {
        output.insert(0, "");
    }
    if !output.is_empty() && (path.ends_with("/.") || path.ends_with("/..")) {
        output.push("");
    }
    let mut result = output.join("/");
    if remove_consecutive_slashes {
        while result.contains("//") {
            result = result.replace("//", "/");
        }
    }
    result
}

/// Line 2 of the canonical request: the canonical path.
#[must_use]
pub(crate) fn canonical_path(path: Option<&str>, uri_encode_path: bool) -> String {
    let path = match path {
        Some(path) if !path.is_empty() => path,
        _ => "/",
    };
    if uri_encode_path {
        let normalized = remove_dot_segments(path, true);
        utf8_percent_encode(&normalized, PATH_ENCODE_SET).to_string()
    } else {
        remove_dot_segments(path, false)
    }
}

/// Line 3 of the canonical request: the canonical query string.
///
/// Pairs are percent-encoded with no safe characters and sorted
/// lexicographically by their encoded forms.
#[must_use]
pub(crate) fn canonical_query(query: Option<&str>) -> String {
    let Some(query) = query else {
        return String::new();
    };
    let mut pairs: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
        .map(|(key, value)| {
            (
                utf8_percent_encode(&key, COMPONENT_ENCODE_SET).to_string(),
                utf8_percent_encode(&value, COMPONENT_ENCODE_SET).to_string(),
            )
        })
        .collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// The signable headers of a request, keyed by lowercased name in sorted
/// order, with each value trimmed, internal whitespace runs collapsed, and
/// multiple values joined by commas.
///
/// A `host` header is synthesized from the destination when absent,
/// omitting the port when it matches the scheme default.
#[must_use]
pub(crate) fn normalized_signing_fields(request: &Request) -> BTreeMap<String, String> {
    let mut normalized = BTreeMap::new();
    for field in &request.fields {
        let name = field.name().to_ascii_lowercase();
        if HEADERS_EXCLUDED_FROM_SIGNING.contains(&name.as_str()) {
            continue;
        }
        let value = field
            .values()
            .iter()
            .map(|value| collapse_whitespace(value))
            .collect::<Vec<_>>()
            .join(",");
        normalized.insert(name, value);
    }
    if !normalized.contains_key("host") {
        normalized.insert("host".to_string(), normalize_host_field(&request.destination));
    }
    normalized
}

/// Lines 4 and 5 of the canonical request as a pair: the canonical header
/// block (each line `name:value\n`) and the `;`-joined signed header names.
#[must_use]
pub(crate) fn canonical_fields(fields: &BTreeMap<String, String>) -> (String, String) {
    let mut block = String::new();
    for (name, value) in fields {
        block.push_str(name);
        block.push(':');
        block.push_str(value);
        block.push('\n');
    }
    let signed = fields.keys().cloned().collect::<Vec<_>>().join(";");
    (block, signed)
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn normalize_host_field(uri: &Uri) -> String {
    let uri = match uri.port() {
        Some(port) if default_port(uri.scheme()) == Some(port) => uri.with_port(None),
        _ => uri.clone(),
    };
    uri.netloc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use smithy_rt_core::transport::Field;

    #[test]
    fn dot_segments_are_removed() {
        assert_eq!(remove_dot_segments("/a/b/../c", true), "/a/c");
        assert_eq!(remove_dot_segments("/a/./b", true), "/a/b");
        assert_eq!(remove_dot_segments("/a/b/..", true), "/a/");
        assert_eq!(remove_dot_segments("/../a", true), "/a");
    }

    #[test]
    fn dot_segment_removal_is_idempotent() {
        let inputs = ["/a/b/../c", "/a//b/./../c/.", "//a//", "/.."];
        for input in inputs {
            let once = remove_dot_segments(input, true);
            assert_eq!(remove_dot_segments(&once, true), once);
        }
    }

    #[test]
    fn consecutive_slashes_are_kept_when_requested() {
        assert_eq!(remove_dot_segments("//a//b", false), "//a//b");
        assert_eq!(remove_dot_segments("//a//b", true), "/a/b");
    }

    #[test]
    fn empty_path_canonicalizes_to_root() {
        assert_eq!(canonical_path(None, true), "/");
        assert_eq!(canonical_path(Some(""), true), "/");
    }

    #[test]
    fn path_encoding_preserves_slashes() {
        assert_eq!(canonical_path(Some("/a b/c"), true), "/a%20b/c");
        // Already-encoded sequences are encoded again per SigV4.
        assert_eq!(canonical_path(Some("/a%2Fb"), true), "/a%252Fb");
    }

    #[test]
    fn query_pairs_are_sorted_by_encoded_form() {
        assert_eq!(
            canonical_query(Some("b=2&a=1&a=0")),
            "a=0&a=1&b=2"
        );
        assert_eq!(canonical_query(Some("key=a b")), "key=a%20b");
        assert_eq!(canonical_query(None), "");
    }

    #[test]
    fn host_is_synthesized_with_default_port_elided() {
        let uri = Uri::builder()
            .scheme("https")
            .host("example.com")
            .port(443)
            .path("/")
            .build()
            .unwrap();
        let request = Request::new("GET", uri);
        let fields = normalized_signing_fields(&request);
        assert_eq!(fields.get("host"), Some(&"example.com".to_string()));
    }

    #[test]
    fn non_default_port_is_kept() {
        let uri = Uri::builder()
            .scheme("https")
            .host("example.com")
            .port(8443)
            .build()
            .unwrap();
        let request = Request::new("GET", uri);
        let fields = normalized_signing_fields(&request);
        assert_eq!(fields.get("host"), Some(&"example.com:8443".to_string()));
    }

    #[test]
    fn excluded_headers_are_not_signed() {
        let uri = Uri::builder().host("example.com").build().unwrap();
        let mut request = Request::new("GET", uri);
        request
            .fields
            .set_field(Field::with_values("User-Agent", ["smithy-rt"]));
        request
            .fields
            .set_field(Field::with_values("X-Custom", ["  a   b  "]));
        let fields = normalized_signing_fields(&request);
        assert!(!fields.contains_key("user-agent"));
        assert_eq!(fields.get("x-custom"), Some(&"a b".to_string()));
    }

    #[test]
    fn header_block_is_sorted_and_terminated() {
        let mut fields = BTreeMap::new();
        fields.insert("host".to_string(), "example.com".to_string());
        fields.insert("x-amz-date".to_string(), "20150830T123600Z".to_string());
        let (block, signed) = canonical_fields(&fields);
        assert_eq!(block, "host:example.com\nx-amz-date:20150830T123600Z\n");
        assert_eq!(signed, "host;x-amz-date");
    }
}
