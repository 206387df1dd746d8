//! Header list splitting and query string assembly.

use smithy_rt_core::SerdeError;
use smithy_rt_core::utils::url_encode_component;

/// Splits a header value into a list of strings.
///
/// The format is based on RFC 9110's list production (section 5.6.1) with
/// the quoted-string production from section 5.6.4: one or more elements
/// surrounded by optional whitespace and separated by commas. Elements may
/// be quoted with double quotes to contain leading or trailing whitespace,
/// commas, or double quotes; inside quotes a value may be escaped with a
/// backslash. Empty elements are ignored.
///
/// If the list is known to contain unquoted IMF-fixdate timestamps, set
/// `handle_unquoted_http_date` so the list isn't split on the commas inside
/// the timestamps.
pub fn split_header(given: &str, handle_unquoted_http_date: bool) -> Result<Vec<String>, SerdeError> {
    let chars: Vec<char> = given.chars().collect();
    let mut result = Vec::new();

    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_whitespace() {
            // Skip any leading space.
            i += 1;
        } else if chars[i] == '"' {
            // Grab the contents of the quoted value and append it.
            let (entry, next) = consume_until(&chars, i + 1, '"', Some('\\'), false);
            result.push(entry);

            if next > chars.len() || chars[next - 1] != '"' {
                return Err(SerdeError::Deserialization(format!(
                    "invalid header list syntax: expected end quote but reached \
                     end of value: `{given}`"
                )));
            }
            i = next;

            // Skip until the next comma.
            let (excess, next) = consume_until(&chars, i, ',', None, false);
            if !excess.trim().is_empty() {
                return Err(SerdeError::Deserialization(format!(
                    "invalid header list syntax: found content after end-quote: \
                     `{excess}` in `{given}`"
                )));
            }
            i = next;
        } else {
            let (entry, next) = consume_until(&chars, i, ',', None, handle_unquoted_http_date);
            let stripped = entry.trim();
            if !stripped.is_empty() {
                result.push(stripped.to_string());
            }
            i = next;
        }
    }

    Ok(result)
}

/// Slice from `start_index` until `end_char`, resolving `escape_char`
/// escapes.
///
/// When `skip_first` is set the first instance of the end character is
/// consumed rather than split on, which supports unquoted IMF-fixdate
/// timestamps.
fn consume_until(
    given: &[char],
    start_index: usize,
    end_char: char,
    escape_char: Option<char>,
    skip_first: bool,
) -> (String, usize) {
    let mut should_skip = skip_first;
    let mut end_index = start_index;
    let mut result = String::new();
    let mut escaped = false;
    while end_index < given.len() {
        let ch = given[end_index];
        if escaped {
            result.push(ch);
            escaped = false;
        } else if escape_char == Some(ch) {
            escaped = true;
        } else if ch == end_char {
            if should_skip {
                result.push(ch);
                should_skip = false;
            } else {
                break;
            }
        } else {
            result.push(ch);
        }
        end_index += 1;
    }
    (result, end_index + 1)
}

/// Join query parameter key-value pairs onto an optional literal prefix.
///
/// The prefix holds the query defaults from the operation's URI pattern
/// and is emitted first; keys and values are percent-encoded.
#[must_use]
pub fn join_query_params(params: &[(String, Option<String>)], prefix: &str) -> String {
    let mut query = prefix.to_string();
    for (key, value) in params {
        if !query.is_empty() {
            query.push('&');
        }
        match value {
            Some(value) => {
                query.push_str(&url_encode_component(key));
                query.push('=');
                query.push_str(value);
            }
            None => query.push_str(&url_encode_component(key)),
        }
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use smithy_rt_core::transport::Field;

    #[test]
    fn splits_plain_lists() {
        assert_eq!(split_header("a, b, c", false).unwrap(), ["a", "b", "c"]);
        assert_eq!(split_header("a,,b", false).unwrap(), ["a", "b"]);
    }

    #[test]
    fn splits_quoted_values() {
        assert_eq!(
            split_header("\"a,b\", c", false).unwrap(),
            ["a,b", "c"]
        );
        assert_eq!(
            split_header("\"say \\\"hi\\\"\", plain", false).unwrap(),
            ["say \"hi\"", "plain"]
        );
    }

    #[test]
    fn rejects_unterminated_quotes() {
        assert!(split_header("\"unterminated", false).is_err());
        assert!(split_header("\"a\" trailing, b", false).is_err());
    }

    #[test]
    fn splits_unquoted_http_dates() {
        let given = "Sun, 30 Aug 2015 12:36:00 GMT, Mon, 31 Aug 2015 12:36:00 GMT";
        assert_eq!(
            split_header(given, true).unwrap(),
            [
                "Sun, 30 Aug 2015 12:36:00 GMT",
                "Mon, 31 Aug 2015 12:36:00 GMT"
            ]
        );
    }

    #[test]
    fn splitting_inverts_field_rendering() {
        let field = Field::with_values("x", ["a,b", "c"]);
        let rendered = field.as_string();
        assert_eq!(rendered, "\"a,b\", c");
        assert_eq!(split_header(&rendered, false).unwrap(), ["a,b", "c"]);
    }

    #[test]
    fn joins_query_params_after_pattern_defaults() {
        let params = vec![
            ("color".to_string(), Some("blue".to_string())),
            ("flag".to_string(), None),
        ];
        assert_eq!(
            join_query_params(&params, "type=daily"),
            "type=daily&color=blue&flag"
        );
        assert_eq!(join_query_params(&[], ""), "");
    }
}
