use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use smithy_rt_core::SerdeError;

static GREEDY_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+)\+\}").expect("valid regex"));

/// A formattable URI path pattern.
///
/// The pattern may contain normal labels (`{label}`) or greedy labels
/// (`{label+}`). Normal labels forbid path separators, greedy labels allow
/// them.
#[derive(Debug, Clone)]
pub struct PathPattern {
    pattern: String,
    greedy_labels: HashSet<String>,
}

impl PathPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let greedy_labels = GREEDY_LABEL_RE
            .captures_iter(&pattern)
            .map(|captures| captures[1].to_string())
            .collect();
        PathPattern {
            pattern,
            greedy_labels,
        }
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// True if the named label allows path separators.
    #[must_use]
    pub fn is_greedy(&self, label: &str) -> bool {
        self.greedy_labels.contains(label)
    }

    /// Interpolate label values into the pattern.
    ///
    /// Pattern literals are preserved. Refuses a non-greedy label whose
    /// value contains `/` and refuses to produce a path containing `//`.
    pub fn format(&self, params: &HashMap<String, String>) -> Result<String, SerdeError> {
        for (key, value) in params {
            if value.contains('/') && !self.is_greedy(key) {
                return Err(SerdeError::Serialization(format!(
                    "non-greedy label `{key}` must not contain path separators"
                )));
            }
        }

        let mut result = self.pattern.replace("+}", "}");
        for (key, value) in params {
            result = result.replace(&format!("{{{key}}}"), value);
        }
        if result.contains('{') {
            return Err(SerdeError::Serialization(format!(
                "path pattern `{}` has unbound labels: `{result}`",
                self.pattern
            )));
        }
        if result.contains("//") {
            return Err(SerdeError::Serialization(format!(
                "path must not contain empty segments, but was `{result}`"
            )));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn detects_greedy_labels() {
        let pattern = PathPattern::new("/{bucket}/{key+}");
        assert!(!pattern.is_greedy("bucket"));
        assert!(pattern.is_greedy("key"));
    }

    #[test]
    fn formats_labels() {
        let pattern = PathPattern::new("/forecast/{city}/today");
        let path = pattern.format(&params(&[("city", "anvik")])).unwrap();
        assert_eq!(path, "/forecast/anvik/today");
    }

    #[test]
    fn greedy_labels_keep_separators() {
        let pattern = PathPattern::new("/{label+}");
        let path = pattern.format(&params(&[("label", "a/b/c")])).unwrap();
        assert_eq!(path, "/a/b/c");
    }

    #[test]
    fn non_greedy_labels_reject_separators() {
        let pattern = PathPattern::new("/{label}");
        assert!(pattern.format(&params(&[("label", "a/b/c")])).is_err());
    }

    #[test]
    fn empty_segments_are_rejected() {
        let pattern = PathPattern::new("/{label+}/tail");
        assert!(pattern.format(&params(&[("label", "a/")])).is_err());
    }

    #[test]
    fn unbound_labels_are_rejected() {
        let pattern = PathPattern::new("/{present}/{missing}");
        assert!(pattern.format(&params(&[("present", "x")])).is_err());
    }
}
