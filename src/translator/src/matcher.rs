//! Label matcher to Cloud Monitoring filter clause compilation
//!
//! Equality matchers compile to a comparison against a quoted literal:
//!
//! ```text
//! {__name__="cpu/usage"}            → metric.type="cpu/usage"
//! {metric_labels_zone!="us-east1"}  → metric.labels.zone!="us-east1"
//! ```
//!
//! Regex matchers have no backend equivalent. Their pattern text is
//! classified into one of the backend's string predicates instead:
//!
//! | pattern          | predicate                 |
//! |------------------|---------------------------|
//! | `a\|b\|c`        | `one_of("a", "b", "c")`   |
//! | `prefix.*`       | `starts_with("prefix")`   |
//! | `.*suffix`       | `ends_with("suffix")`     |
//! | anything else    | `has_substring("...")`    |
//!
//! This is a heuristic: patterns are not interpreted as regular expressions.

use std::borrow::Cow;
use std::fmt;

use crate::filter::FilterClause;
use crate::types::{LabelMatcher, MatcherOp};

/// Reserved label carrying the metric name
pub const METRIC_NAME_LABEL: &str = "__name__";

/// Label namespace for metric-scoped labels
pub const METRIC_LABELS_PREFIX: &str = "metric_labels_";

/// Label namespace for resource-scoped labels
pub const RESOURCE_LABELS_PREFIX: &str = "resource_labels_";

const METRIC_TYPE_FIELD: &str = "metric.type";
const METRIC_LABELS_FIELD: &str = "metric.labels.";
const RESOURCE_LABELS_FIELD: &str = "resource.labels.";

const WILDCARD: &str = ".*";

/// Backend string predicate a regex pattern is folded into
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringPredicate<'a> {
    OneOf(Vec<&'a str>),
    StartsWith(&'a str),
    EndsWith(&'a str),
    HasSubstring(&'a str),
}

impl<'a> StringPredicate<'a> {
    /// Classify a regex pattern. Order matters: `a|b.*` is an alternation.
    pub fn classify(pattern: &'a str) -> Self {
        if pattern.contains('|') {
            Self::OneOf(pattern.split('|').collect())
        } else if let Some(prefix) = pattern.strip_suffix(WILDCARD) {
            Self::StartsWith(prefix)
        } else if let Some(suffix) = pattern.strip_prefix(WILDCARD) {
            Self::EndsWith(suffix)
        } else {
            Self::HasSubstring(pattern)
        }
    }
}

impl fmt::Display for StringPredicate<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OneOf(values) => {
                let args: Vec<String> = values.iter().map(|v| quote(v)).collect();
                write!(f, "one_of({})", args.join(", "))
            }
            Self::StartsWith(prefix) => write!(f, "starts_with({})", quote(prefix)),
            Self::EndsWith(suffix) => write!(f, "ends_with({})", quote(suffix)),
            Self::HasSubstring(substring) => write!(f, "has_substring({})", quote(substring)),
        }
    }
}

/// Map a Prometheus label name to a backend filter field
pub fn label_to_field(name: &str) -> Cow<'_, str> {
    if name == METRIC_NAME_LABEL {
        Cow::Borrowed(METRIC_TYPE_FIELD)
    } else if let Some(key) = name.strip_prefix(METRIC_LABELS_PREFIX) {
        Cow::Owned(format!("{METRIC_LABELS_FIELD}{key}"))
    } else if let Some(key) = name.strip_prefix(RESOURCE_LABELS_PREFIX) {
        Cow::Owned(format!("{RESOURCE_LABELS_FIELD}{key}"))
    } else {
        Cow::Borrowed(name)
    }
}

/// Backend comparison operator for a matcher kind
pub fn comparison_operator(op: MatcherOp) -> &'static str {
    if op.is_negated() { "!=" } else { "=" }
}

/// Double-quote a filter literal, escaping `\` and `"`
pub fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Compile one label matcher into a backend filter clause
pub fn compile_matcher(matcher: &LabelMatcher) -> FilterClause {
    let field = label_to_field(&matcher.name);
    let operator = comparison_operator(matcher.op);

    let rhs = if matcher.op.is_regex() {
        StringPredicate::classify(&matcher.value).to_string()
    } else {
        quote(&matcher.value)
    };

    FilterClause::new(format!("{field}{operator}{rhs}"))
}

/// Compile every matcher of a query, preserving matcher order
pub fn compile_matchers(matchers: &[LabelMatcher]) -> Vec<FilterClause> {
    matchers.iter().map(compile_matcher).collect()
}
