//! Small shared utilities: canonical float rendering and URL encoding.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters percent-encoded when encoding a single URI component.
///
/// Everything except RFC 3986 unreserved characters is encoded.
pub const COMPONENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Characters percent-encoded when encoding a URI path, preserving `/`.
pub const PATH_ENCODE_SET: &AsciiSet = &COMPONENT_ENCODE_SET.remove(b'/');

/// Percent-encode a single URI component, encoding `/`.
#[must_use]
pub fn url_encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT_ENCODE_SET).to_string()
}

/// Percent-encode a URI path, preserving `/`.
#[must_use]
pub fn url_encode_path(value: &str) -> String {
    utf8_percent_encode(value, PATH_ENCODE_SET).to_string()
}

/// Render a float the way Smithy protocols expect.
///
/// Non-finite values use the specified `NaN`/`Infinity` spellings; finite
/// values keep a trailing `.0` so integral floats stay distinguishable from
/// integers.
#[must_use]
pub fn serialize_float(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value.is_sign_positive() {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        };
    }
    let mut buffer = ryu::Buffer::new();
    buffer.format(value).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_rendering() {
        assert_eq!(serialize_float(1.0), "1.0");
        assert_eq!(serialize_float(0.25), "0.25");
        assert_eq!(serialize_float(f64::NAN), "NaN");
        assert_eq!(serialize_float(f64::INFINITY), "Infinity");
        assert_eq!(serialize_float(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn component_encoding() {
        assert_eq!(url_encode_component("a/b c"), "a%2Fb%20c");
        assert_eq!(url_encode_path("a/b c"), "a/b%20c");
        assert_eq!(url_encode_component("a-b._~"), "a-b._~");
    }
}
