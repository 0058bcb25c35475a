/*! End-to-end tests for the public API. */

use itertools::Itertools;
use pretty_assertions::assert_eq;

use crate::{compile, RegexpBuilder, Status};

macro_rules! assert_groups {
    ($re:expr, $text:expr, $groups:expr) => {{
        let re = compile($re).unwrap();
        let m = re.find($text).expect("pattern should match");
        let groups: Vec<Option<std::ops::Range<usize>>> =
            (1..=re.group_count()).map(|i| m.group(i)).collect();
        assert_eq!($groups, groups, "regexp: {}, text: {:?}", $re, $text);
    }};
}

#[test]
fn simple_find() {
    let re = compile("abc").unwrap();
    let m = re.find("xxabcyy").unwrap();
    assert_eq!(m.range(), 2..5);
    assert_eq!(m.len(), 3);
    assert!(!m.is_empty());
    assert!(re.find("xyz").is_none());
}

#[test]
fn find_at() {
    let re = compile("a+").unwrap();
    assert_eq!(re.find_at("aabaa", 1).unwrap().range(), 1..2);
    assert_eq!(re.find_at("aabaa", 2).unwrap().range(), 3..5);
    assert!(re.find_at("aa", 3).is_none());
}

#[test]
fn subexpression_capture() {
    assert_groups!("(a)(b)", "ab", vec![Some(0..1), Some(1..2)]);

    let re = compile("(a)(b)").unwrap();
    let m = re.find("ab").unwrap();
    assert_eq!(m.range(), 0..2);
    assert_eq!(m.group(0), Some(0..2));
    assert_eq!(m.group_count(), 2);
    assert_eq!(m.group(3), None);
}

#[test]
fn untaken_alternation_branch_does_not_participate() {
    assert_groups!("(a)|(b)", "b", vec![None, Some(0..1)]);
    assert_groups!("(a)|(b)", "a", vec![Some(0..1), None]);
}

#[test]
fn nested_groups() {
    assert_groups!("((a)b)", "ab", vec![Some(0..2), Some(0..1)]);
    assert_groups!("(a(b))c", "abc", vec![Some(0..2), Some(1..2)]);
}

#[test]
fn greediness_across_groups() {
    // Longest-overall wins; the second group still gets its mandatory
    // character.
    assert_groups!("(a*)(a)", "aa", vec![Some(0..1), Some(1..2)]);
}

#[test]
fn repeated_group_spans_whole_extent() {
    // A repetition applied to a group moves the group's closing state,
    // so the reported span covers all iterations.
    assert_groups!("(a)+", "aa", vec![Some(0..2)]);
    assert_groups!("(ab)*", "abab", vec![Some(0..4)]);
    assert_groups!("(a+)+", "aaa", vec![Some(0..3)]);
}

#[test]
fn bypassed_optional_group_reports_empty_span() {
    // A group under `?`/`*` that matches zero occurrences reports an
    // empty span at the bypass position; its bounding states lie on the
    // accepted path.
    assert_groups!("(a)(b)?", "a", vec![Some(0..1), Some(1..1)]);
    assert_groups!("(ab)*", "xy", vec![Some(0..0)]);
}

#[test]
fn leftmost_longest() {
    let re = compile("a|ab").unwrap();
    let m = re.find("xaby").unwrap();
    assert_eq!(m.range(), 1..3);
}

#[test]
fn find_iter() {
    let re = compile("a+").unwrap();
    let spans = re
        .find_iter(b"aab aaa")
        .map(|m| (m.start(), m.end()))
        .collect_vec();
    assert_eq!(spans, vec![(0, 2), (4, 7)]);
}

#[test]
fn find_iter_empty_matches() {
    let re = compile("b*").unwrap();
    let spans = re
        .find_iter(b"ab")
        .map(|m| (m.start(), m.end()))
        .collect_vec();
    assert_eq!(spans, vec![(0, 0), (1, 2), (2, 2)]);
}

#[test]
fn byte_oriented() {
    let re = compile(".").unwrap();
    let m = re.find([0xff_u8].as_slice()).unwrap();
    assert_eq!(m.range(), 0..1);
}

#[test]
fn case_insensitive() {
    let re = RegexpBuilder::new().case_insensitive(true).build("abc").unwrap();
    assert!(re.is_match("xABCy"));
    assert!(re.is_match("abc"));
    assert!(!re.is_match("abd"));

    let re =
        RegexpBuilder::new().case_insensitive(true).build("[a-c]+").unwrap();
    assert_eq!(re.find("AbC").unwrap().range(), 0..3);

    // Negated sets are case-closed before the complement is taken.
    let re =
        RegexpBuilder::new().case_insensitive(true).build("[^a]").unwrap();
    assert!(!re.is_match("A"));
    assert!(re.is_match("b"));
}

#[test]
fn accessors() {
    let re = compile("(a)(b)(c)").unwrap();
    assert_eq!(re.pattern(), "(a)(b)(c)");
    assert_eq!(re.status(), Status::Ok);
    assert_eq!(re.group_count(), 3);
}

#[test]
fn compile_errors() {
    let err = compile("a(b").unwrap_err();
    assert_eq!(err.status(), Status::UnmatchedParenthesis);
    assert_eq!(err.offset(), 1);

    let err = compile("a{2,3}").unwrap_err();
    assert_eq!(err.status(), Status::NotSupported);

    let err = compile("[z-a]").unwrap_err();
    assert_eq!(err.status(), Status::BadCharRange);

    let err = compile("").unwrap_err();
    assert_eq!(err.status(), Status::BadPattern);

    assert_eq!(
        err.to_string(),
        "invalid regular expression at pattern offset 0"
    );
}

#[test]
fn shared_across_threads() {
    let re = compile("(a|b)+c").unwrap();
    std::thread::scope(|scope| {
        for text in ["abc", "aabbc", "bac"] {
            let re = &re;
            scope.spawn(move || {
                assert!(re.is_match(text));
            });
        }
    });
}

#[test]
fn match_again_on_extracted_span() {
    // A reported span, searched in isolation, is accepted as the same
    // full match.
    let re = compile("[a-z]+[0-9]").unwrap();
    let text = "__abc1__";
    let m = re.find(text).unwrap();
    let slice = &text[m.range()];
    let again = re.find(slice).unwrap();
    assert_eq!(again.range(), 0..slice.len());
}
