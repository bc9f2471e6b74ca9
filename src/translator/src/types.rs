//! Query-side types for remote_read translation
//!
//! These mirror the Prometheus remote_read query model after it has been
//! lifted off the protobuf wire representation.

use common::prompb;

use crate::error::TranslationError;

/// Label matcher types matching Prometheus semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherOp {
    /// Exact string match (=)
    Equal,
    /// Not equal (!=)
    NotEqual,
    /// Regex match (=~)
    RegexMatch,
    /// Regex not match (!~)
    RegexNotMatch,
}

impl MatcherOp {
    pub fn is_regex(&self) -> bool {
        matches!(self, Self::RegexMatch | Self::RegexNotMatch)
    }

    pub fn is_negated(&self) -> bool {
        matches!(self, Self::NotEqual | Self::RegexNotMatch)
    }
}

impl std::fmt::Display for MatcherOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Equal => write!(f, "="),
            Self::NotEqual => write!(f, "!="),
            Self::RegexMatch => write!(f, "=~"),
            Self::RegexNotMatch => write!(f, "!~"),
        }
    }
}

/// A single label matcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMatcher {
    /// Label name
    pub name: String,
    /// Match operation
    pub op: MatcherOp,
    /// Value or pattern to match against
    pub value: String,
}

impl LabelMatcher {
    pub fn new(name: impl Into<String>, op: MatcherOp, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            op,
            value: value.into(),
        }
    }

    /// Create a new equality matcher
    pub fn equal(name: &str, value: &str) -> Self {
        Self::new(name, MatcherOp::Equal, value)
    }

    /// Create a new not-equal matcher
    pub fn not_equal(name: &str, value: &str) -> Self {
        Self::new(name, MatcherOp::NotEqual, value)
    }

    /// Create a new regex matcher
    pub fn regex_match(name: &str, pattern: &str) -> Self {
        Self::new(name, MatcherOp::RegexMatch, pattern)
    }

    /// Create a new regex not-match matcher
    pub fn regex_not_match(name: &str, pattern: &str) -> Self {
        Self::new(name, MatcherOp::RegexNotMatch, pattern)
    }
}

impl std::fmt::Display for LabelMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{:?}", self.name, self.op, self.value)
    }
}

impl TryFrom<&prompb::LabelMatcher> for LabelMatcher {
    type Error = TranslationError;

    fn try_from(matcher: &prompb::LabelMatcher) -> Result<Self, Self::Error> {
        use prompb::label_matcher::Type;

        let op = match Type::try_from(matcher.r#type) {
            Ok(Type::Eq) => MatcherOp::Equal,
            Ok(Type::Neq) => MatcherOp::NotEqual,
            Ok(Type::Re) => MatcherOp::RegexMatch,
            Ok(Type::Nre) => MatcherOp::RegexNotMatch,
            Err(_) => {
                return Err(TranslationError::UnsupportedMatcher(format!(
                    "unknown matcher type {} for label '{}'",
                    matcher.r#type, matcher.name
                )));
            }
        };

        Ok(Self::new(matcher.name.clone(), op, matcher.value.clone()))
    }
}

/// One remote_read query: matchers plus an inclusive millisecond time range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub matchers: Vec<LabelMatcher>,
    /// Start timestamp (milliseconds since epoch)
    pub start_time_ms: i64,
    /// End timestamp (milliseconds since epoch)
    pub end_time_ms: i64,
}

impl Query {
    pub fn new(matchers: Vec<LabelMatcher>, start_time_ms: i64, end_time_ms: i64) -> Self {
        Self {
            matchers,
            start_time_ms,
            end_time_ms,
        }
    }
}

impl TryFrom<&prompb::Query> for Query {
    type Error = TranslationError;

    fn try_from(query: &prompb::Query) -> Result<Self, Self::Error> {
        let matchers = query
            .matchers
            .iter()
            .map(LabelMatcher::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(
            matchers,
            query.start_timestamp_ms,
            query.end_timestamp_ms,
        ))
    }
}
