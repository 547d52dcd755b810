//! Screening of caller-supplied regular expressions.
//!
//! The checks are heuristics, not a bound on matching cost. They reject
//! nested-quantifier and huge-repetition shapes plus anything that does not
//! compile. Compiled programs are capped by [`COMPILED_SIZE_LIMIT`].

use std::fmt::{Display, Formatter};
use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};
use tracing::warn;

/// Longest pattern accepted, in characters.
pub const MAX_PATTERN_LEN: usize = 500;

/// Upper bound on the compiled program size of an accepted pattern.
pub const COMPILED_SIZE_LIMIT: usize = 1 << 20;

/// Why a pattern was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsafePattern {
    TooLong { len: usize },
    NestedQuantifier { shape: &'static str },
    LargeRepetition,
    Invalid { message: String },
}

impl Display for UnsafePattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooLong { len } => {
                write!(f, "pattern too long: {len} chars (max {MAX_PATTERN_LEN})")
            }
            Self::NestedQuantifier { shape } => write!(f, "nested quantifiers {shape}"),
            Self::LargeRepetition => f.write_str("very large repetitions {N,}"),
            Self::Invalid { message } => write!(f, "invalid pattern: {message}"),
        }
    }
}

struct DangerousShape {
    detector: Regex,
    shape: &'static str,
}

fn nested_quantifier_shapes() -> &'static [DangerousShape] {
    static SHAPES: OnceLock<Vec<DangerousShape>> = OnceLock::new();
    SHAPES.get_or_init(|| {
        [
            (r"\([^)]*\+[^)]*\)\+", "(x+)+"),
            (r"\([^)]*\*[^)]*\)\*", "(x*)*"),
            (r"\([^)]*\*[^)]*\)\+", "(x*)+"),
            (r"\([^)]*\+[^)]*\)\*", "(x+)*"),
        ]
        .into_iter()
        .filter_map(|(source, shape)| {
            Regex::new(source)
                .ok()
                .map(|detector| DangerousShape { detector, shape })
        })
        .collect()
    })
}

fn large_repetition() -> Option<&'static Regex> {
    static DETECTOR: OnceLock<Option<Regex>> = OnceLock::new();
    DETECTOR
        .get_or_init(|| Regex::new(r"\{\d{3,}").ok())
        .as_ref()
}

/// Stateless screen for caller-supplied search patterns.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexSafetyValidator;

impl RegexSafetyValidator {
    pub fn new() -> Self {
        Self
    }

    /// `true` when `pattern` passed every check.
    pub fn validate(&self, pattern: &str) -> bool {
        self.compile(pattern).is_some()
    }

    /// Run the shape checks and a trial compilation, reporting the first
    /// failed check.
    pub fn check(&self, pattern: &str) -> Result<Regex, UnsafePattern> {
        let len = pattern.chars().count();
        if len > MAX_PATTERN_LEN {
            return Err(UnsafePattern::TooLong { len });
        }

        if let Some(shape) = nested_quantifier_shapes()
            .iter()
            .find(|shape| shape.detector.is_match(pattern))
        {
            return Err(UnsafePattern::NestedQuantifier { shape: shape.shape });
        }

        if large_repetition().is_some_and(|detector| detector.is_match(pattern)) {
            return Err(UnsafePattern::LargeRepetition);
        }

        compile_case_insensitive(pattern).map_err(|error| UnsafePattern::Invalid {
            message: error.to_string(),
        })
    }

    /// Compiled case-insensitive regex for a safe pattern; rejected patterns
    /// are logged and yield `None`.
    pub fn compile(&self, pattern: &str) -> Option<Regex> {
        match self.check(pattern) {
            Ok(regex) => Some(regex),
            Err(reason) => {
                warn!(pattern, reason = %reason, "rejected regex pattern");
                None
            }
        }
    }
}

pub(crate) fn compile_case_insensitive(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .size_limit(COMPILED_SIZE_LIMIT)
        .build()
}
