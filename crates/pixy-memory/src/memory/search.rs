use std::fs;
use std::path::PathBuf;

use regex::Regex;
use tracing::warn;

use super::regex_safety::{compile_case_insensitive, RegexSafetyValidator};

/// Keywords and/or regex patterns to look for in daily notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Literal terms, matched whole-word and case-insensitively.
    pub keywords: Vec<String>,
    /// Regex patterns, screened by [`RegexSafetyValidator`] and matched
    /// case-insensitively.
    pub regex_patterns: Vec<String>,
    pub max_results: usize,
}

impl SearchQuery {
    /// Build a query; blank terms are discarded.
    pub fn new<K, P>(keywords: K, regex_patterns: P, max_results: usize) -> Self
    where
        K: IntoIterator,
        K::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            keywords: non_blank(keywords),
            regex_patterns: non_blank(regex_patterns),
            max_results,
        }
    }

    pub fn keywords<K>(keywords: K, max_results: usize) -> Self
    where
        K: IntoIterator,
        K::Item: Into<String>,
    {
        Self::new(keywords, Vec::<String>::new(), max_results)
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty() && self.regex_patterns.is_empty()
    }

    /// Human-readable list of the searched terms: the keywords when any were
    /// given, otherwise the patterns.
    pub fn describe_terms(&self) -> String {
        if self.keywords.is_empty() {
            self.regex_patterns.join(", ")
        } else {
            self.keywords.join(", ")
        }
    }
}

fn non_blank<I>(items: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    items
        .into_iter()
        .map(Into::into)
        .filter(|item: &String| !item.trim().is_empty())
        .collect()
}

/// How a single search term is matched against a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchStrategy {
    /// Escaped literal anchored on word boundaries.
    Keyword(String),
    /// Caller-supplied regex that passed the safety screen.
    Pattern(String),
}

#[derive(Debug, Clone)]
struct LineMatcher {
    strategy: MatchStrategy,
    regex: Regex,
}

/// Compiled matchers in registration order: keywords first, then patterns.
#[derive(Debug, Clone, Default)]
pub struct MatcherSet {
    matchers: Vec<LineMatcher>,
}

impl MatcherSet {
    /// Compile every usable term of `query`. Unsafe or invalid patterns are
    /// dropped without failing the query.
    pub fn compile(query: &SearchQuery, validator: &RegexSafetyValidator) -> Self {
        let mut matchers = Vec::with_capacity(query.keywords.len() + query.regex_patterns.len());

        for keyword in &query.keywords {
            let source = format!(r"\b{}\b", regex::escape(keyword));
            match compile_case_insensitive(&source) {
                Ok(regex) => matchers.push(LineMatcher {
                    strategy: MatchStrategy::Keyword(keyword.clone()),
                    regex,
                }),
                Err(error) => {
                    warn!(keyword = keyword.as_str(), error = %error, "dropping keyword");
                }
            }
        }

        for pattern in &query.regex_patterns {
            if let Some(regex) = validator.compile(pattern) {
                matchers.push(LineMatcher {
                    strategy: MatchStrategy::Pattern(pattern.clone()),
                    regex,
                });
            }
        }

        Self { matchers }
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn strategies(&self) -> impl Iterator<Item = &MatchStrategy> {
        self.matchers.iter().map(|matcher| &matcher.strategy)
    }

    /// The first matcher, in registration order, that hits `line`.
    pub fn first_match(&self, line: &str) -> Option<&MatchStrategy> {
        self.matchers
            .iter()
            .find(|matcher| matcher.regex.is_match(line))
            .map(|matcher| &matcher.strategy)
    }
}

/// One matched line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// File name of the daily note, e.g. `2024-03-01.md`.
    pub file_name: String,
    /// Matched line without trailing whitespace.
    pub line: String,
}

/// Matches in newest-file-first, top-to-bottom order, capped at the
/// requested maximum.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResult {
    pub hits: Vec<SearchHit>,
    /// Daily files that were eligible for the search.
    pub files_available: usize,
    /// Set when the memory directory exists but could not be listed.
    pub listing_error: Option<String>,
}

impl SearchResult {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }
}

/// Scan `files` in order and collect matching lines until `max_results`
/// is reached. Unreadable files are skipped.
pub fn scan_files(files: &[PathBuf], matchers: &MatcherSet, max_results: usize) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    if matchers.is_empty() || max_results == 0 {
        return hits;
    }

    for path in files {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!(path = %path.display(), error = %error, "skipping unreadable memory file");
                continue;
            }
        };
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content = String::from_utf8_lossy(&bytes);

        for line in content.lines() {
            if matchers.first_match(line).is_none() {
                continue;
            }
            hits.push(SearchHit {
                file_name: file_name.clone(),
                line: line.trim_end().to_string(),
            });
            if hits.len() >= max_results {
                return hits;
            }
        }
    }

    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_drops_blank_terms_and_describes_keywords_first() {
        let query = SearchQuery::new(vec!["tea", "  "], vec!["(cof|tea)"], 5);
        assert_eq!(query.keywords, vec!["tea"]);
        assert_eq!(query.describe_terms(), "tea");

        let query = SearchQuery::new(Vec::<String>::new(), vec!["a.b", "c+d"], 5);
        assert_eq!(query.describe_terms(), "a.b, c+d");

        assert!(SearchQuery::new(vec![""], vec![" "], 5).is_empty());
    }

    #[test]
    fn matcher_set_registers_keywords_before_patterns_and_drops_unsafe() {
        let query = SearchQuery::new(vec!["c++"], vec!["(a+)+", "vol+ey", "[unclosed"], 10);
        let matchers = MatcherSet::compile(&query, &RegexSafetyValidator::new());

        let strategies = matchers.strategies().cloned().collect::<Vec<_>>();
        assert_eq!(
            strategies,
            vec![
                MatchStrategy::Keyword("c++".to_string()),
                MatchStrategy::Pattern("vol+ey".to_string()),
            ]
        );
    }

    #[test]
    fn keywords_match_whole_words_case_insensitively() {
        let query = SearchQuery::keywords(vec!["Rust"], 10);
        let matchers = MatcherSet::compile(&query, &RegexSafetyValidator::new());

        assert!(matchers.first_match("learning RUST today").is_some());
        assert!(matchers.first_match("rust.").is_some());
        assert!(matchers.first_match("trusty tools").is_none());
        assert!(matchers.first_match("rusty").is_none());
    }

    #[test]
    fn keyword_special_characters_are_literal() {
        let query = SearchQuery::keywords(vec!["v1.2"], 10);
        let matchers = MatcherSet::compile(&query, &RegexSafetyValidator::new());

        assert!(matchers.first_match("shipped v1.2 today").is_some());
        assert!(matchers.first_match("shipped v1x2 today").is_none());
    }

    #[test]
    fn scan_skips_unreadable_files_and_keeps_going() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("2024-01-03.md");
        let newer = dir.path().join("2024-01-02.md");
        let older = dir.path().join("2024-01-01.md");
        fs::write(&newer, "- tea with Ann\n- lunch\n").expect("write note");
        fs::write(&older, "- more tea\n").expect("write note");

        let matchers = MatcherSet::compile(
            &SearchQuery::keywords(vec!["tea"], 10),
            &RegexSafetyValidator::new(),
        );
        let hits = scan_files(&[missing, newer, older], &matchers, 10);

        assert_eq!(
            hits,
            vec![
                SearchHit {
                    file_name: "2024-01-02.md".to_string(),
                    line: "- tea with Ann".to_string(),
                },
                SearchHit {
                    file_name: "2024-01-01.md".to_string(),
                    line: "- more tea".to_string(),
                },
            ]
        );
    }
}
