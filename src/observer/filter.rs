//! URL Pattern Filter: the set of patterns a listener is keyed to.

use url::Url;

use super::pattern::{MatchPattern, PatternError};

/// An immutable set of match patterns. A URL passes when any pattern
/// matches it; an empty filter passes nothing.
#[derive(Debug, Clone, Default)]
pub struct UrlFilter {
    patterns: Vec<MatchPattern>,
}

impl UrlFilter {
    pub fn new(patterns: Vec<MatchPattern>) -> Self {
        Self { patterns }
    }

    /// Compile every pattern, failing on the first invalid one.
    pub fn compile<I, S>(patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| MatchPattern::parse(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn matches(&self, url: &Url) -> bool {
        self.patterns.iter().any(|p| p.matches(url))
    }

    /// The first pattern matching `url`, for logging.
    pub fn matching_pattern(&self, url: &Url) -> Option<&MatchPattern> {
        self.patterns.iter().find(|p| p.matches(url))
    }

    pub fn patterns(&self) -> &[MatchPattern] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_pattern_matches() {
        let filter = UrlFilter::compile([
            "https://example.service/*",
            "http://127.0.0.1:9000/api/*",
        ])
        .unwrap();

        assert!(filter.matches(&Url::parse("https://example.service/ut").unwrap()));
        assert!(filter.matches(&Url::parse("http://127.0.0.1:9000/api/v2").unwrap()));
        assert!(!filter.matches(&Url::parse("http://127.0.0.1:9000/health").unwrap()));

        let hit = filter
            .matching_pattern(&Url::parse("http://127.0.0.1:9000/api/v2").unwrap())
            .unwrap();
        assert_eq!(hit.as_str(), "http://127.0.0.1:9000/api/*");
    }

    #[test]
    fn test_empty_filter_matches_nothing() {
        let filter = UrlFilter::default();
        assert!(filter.is_empty());
        assert!(!filter.matches(&Url::parse("https://example.service/").unwrap()));
    }

    #[test]
    fn test_compile_reports_bad_pattern() {
        let err = UrlFilter::compile(["https://ok.test/*", "nope"]).unwrap_err();
        assert_eq!(err, PatternError::MissingSeparator("nope".into()));
    }
}
