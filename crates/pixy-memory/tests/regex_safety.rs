use pixy_memory::memory::regex_safety::MAX_PATTERN_LEN;
use pixy_memory::{RegexSafetyValidator, UnsafePattern};

#[test]
fn nested_quantifier_shapes_are_rejected() {
    let validator = RegexSafetyValidator::new();
    for pattern in ["(a+)+", "(a*)*", "(a*)+", "(a+)*", "(x|ab+)+$", "^(\\w+\\s?)*$"] {
        assert!(!validator.validate(pattern), "{pattern} should be unsafe");
    }
    assert!(matches!(
        validator.check("(a+)+"),
        Err(UnsafePattern::NestedQuantifier { shape: "(x+)+" })
    ));
}

#[test]
fn large_repetition_counts_are_rejected() {
    let validator = RegexSafetyValidator::new();
    assert!(!validator.validate("a{123,}"));
    assert!(!validator.validate("a{100}"));
    assert!(!validator.validate("x{1000,2000}"));
    assert!(validator.validate("a{2,99}"));
    assert!(matches!(
        validator.check("a{123,}"),
        Err(UnsafePattern::LargeRepetition)
    ));
}

#[test]
fn pattern_length_limit_is_inclusive() {
    let validator = RegexSafetyValidator::new();
    let at_limit = "a".repeat(MAX_PATTERN_LEN);
    let over_limit = "a".repeat(MAX_PATTERN_LEN + 1);

    assert!(validator.validate(&at_limit));
    assert_eq!(
        validator.check(&over_limit).map(|_| ()),
        Err(UnsafePattern::TooLong {
            len: MAX_PATTERN_LEN + 1
        })
    );
}

#[test]
fn invalid_patterns_are_rejected_without_panicking() {
    let validator = RegexSafetyValidator::new();
    assert!(!validator.validate("[unclosed"));
    assert!(!validator.validate("(missing"));
    let reason = validator
        .check("[unclosed")
        .map(|_| ())
        .expect_err("unclosed class should fail");
    assert!(reason.to_string().starts_with("invalid pattern:"));
}

#[test]
fn common_search_patterns_are_accepted_and_case_insensitive() {
    let validator = RegexSafetyValidator::new();
    for pattern in [
        "(volleyball|basketball)",
        "Python [23]\\..+",
        "(ticket|price).*\\$\\d+",
        "meet(ing)?s?",
    ] {
        assert!(validator.validate(pattern), "{pattern} should be safe");
    }

    let regex = validator
        .compile("(ticket|price).*\\$\\d+")
        .expect("pattern should compile");
    assert!(regex.is_match("TICKET cost was $45"));
    assert!(validator.compile("(a+)+").is_none());
}
