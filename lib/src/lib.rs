/*! An extended-POSIX regular expression engine written in Rust from scratch.

Patterns are compiled with a recursive-descent parser into a
nondeterministic finite automaton using [Thompson's construction][1], and
executed by a backtracking-free work-queue algorithm implementing the
POSIX *leftmost-longest* rule: among all matches the one starting earliest
in the input wins, and among matches sharing that start the longest wins.
Parenthesized subexpressions are captured and their spans reported.

The engine works on bytes. Bracket expressions like `[a-z]` compare their
endpoints as unsigned byte values; `.` matches any single byte.

Deliberately unsupported constructs — POSIX character classes
(`[:alpha:]`), collating symbols, equivalence classes, and brace-counted
repetition (`{m,n}`) — are recognized by the grammar and rejected with
[`Status::NotSupported`] rather than silently matching the wrong thing.
Back-references are not part of the grammar.

# Example

```rust
let re = erex::compile("(a|b)c+").unwrap();

let m = re.find("xbcc").unwrap();
assert_eq!(m.range(), 1..4);
assert_eq!(m.group(1), Some(1..2));

assert!(erex::compile("a{2,3}").is_err());
```

[1]: https://en.wikipedia.org/wiki/Thompson%27s_construction
*/

#![deny(missing_docs)]

pub use errors::CompileError;
pub use errors::Status;

mod errors;
mod nfa;
mod symbols;

#[cfg(test)]
mod tests;

use std::fmt;
use std::ops::Range;

use crate::nfa::compiler::Compiler;
use crate::nfa::matcher::{Found, Matcher};
use crate::nfa::Program;

/// Compiles a regular expression with default options.
///
/// Convenience for [`Regexp::new`].
pub fn compile(pattern: &str) -> Result<Regexp, CompileError> {
    Regexp::new(pattern)
}

/// Builds [`Regexp`] values with non-default options.
///
/// ```rust
/// let re = erex::RegexpBuilder::new()
///     .case_insensitive(true)
///     .build("abc")
///     .unwrap();
///
/// assert!(re.is_match("xABCy"));
/// ```
#[derive(Default)]
pub struct RegexpBuilder {
    case_insensitive: bool,
}

impl RegexpBuilder {
    /// Creates a builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles patterns as case-insensitive ones: ASCII letters match
    /// both cases, in literals and in bracket expressions.
    pub fn case_insensitive(mut self, yes: bool) -> Self {
        self.case_insensitive = yes;
        self
    }

    /// Compiles `pattern` with the configured options.
    pub fn build(&self, pattern: &str) -> Result<Regexp, CompileError> {
        let program = Compiler::new(pattern.as_bytes())
            .case_insensitive(self.case_insensitive)
            .compile()?;
        Ok(Regexp { pattern: pattern.to_string(), program })
    }
}

/// A compiled regular expression.
///
/// A `Regexp` is immutable once built and can be shared freely across
/// threads; every search allocates its own scratch state. Compilation
/// errors are reported by [`Regexp::new`] — a live `Regexp` is always a
/// valid automaton, which is why [`Regexp::status`] always reports
/// [`Status::Ok`].
pub struct Regexp {
    pattern: String,
    program: Program,
}

impl Regexp {
    /// Compiles `pattern` with default options.
    pub fn new(pattern: &str) -> Result<Self, CompileError> {
        RegexpBuilder::new().build(pattern)
    }

    /// The source pattern this `Regexp` was compiled from.
    #[inline]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The compile status. Always [`Status::Ok`] for a live value; the
    /// failure statuses travel inside [`CompileError`].
    #[inline]
    pub fn status(&self) -> Status {
        Status::Ok
    }

    /// Number of parenthesized subexpressions in the pattern.
    #[inline]
    pub fn group_count(&self) -> usize {
        self.program.group_count() - 1
    }

    /// Returns true if the pattern matches anywhere in `haystack`.
    pub fn is_match(&self, haystack: impl AsRef<[u8]>) -> bool {
        self.find(haystack).is_some()
    }

    /// Finds the leftmost-longest match in `haystack`.
    pub fn find(&self, haystack: impl AsRef<[u8]>) -> Option<Match> {
        self.find_at(haystack, 0)
    }

    /// Finds the leftmost-longest match in `haystack` starting at or
    /// after byte offset `start`. Returns `None` when `start` is past
    /// the end of `haystack`.
    pub fn find_at(
        &self,
        haystack: impl AsRef<[u8]>,
        start: usize,
    ) -> Option<Match> {
        let found =
            Matcher::new(&self.program).search(haystack.as_ref(), start)?;
        Some(Match::new(found, self.group_count()))
    }

    /// Returns an iterator over all non-overlapping matches in
    /// `haystack`, leftmost first.
    pub fn find_iter<'r, 'h>(&'r self, haystack: &'h [u8]) -> Matches<'r, 'h> {
        Matches { regexp: self, haystack, at: 0 }
    }
}

impl fmt::Debug for Regexp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Regexp({})", self.pattern)?;
        fmt::Display::fmt(&self.program, f)
    }
}

/// A successful match: the overall span plus one span per parenthesized
/// subexpression.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Match {
    start: usize,
    end: usize,
    groups: Vec<Option<(usize, usize)>>,
}

impl Match {
    fn new(found: Found, groups: usize) -> Self {
        let spans = (0..groups)
            .map(|g| match (found.caps[2 * g], found.caps[2 * g + 1]) {
                (Some(s), Some(e)) if s <= e => Some((s, e)),
                _ => None,
            })
            .collect();
        Self { start: found.start, end: found.end, groups: spans }
    }

    /// Byte offset where the match starts.
    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Byte offset one past the end of the match.
    #[inline]
    pub fn end(&self) -> usize {
        self.end
    }

    /// Length of the match in bytes. Zero-length matches are legal, for
    /// instance `a?` matching the empty string.
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// True if the match is zero-length.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The matched byte range.
    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// The byte range matched by subexpression `index`, counted by the
    /// position of its opening parenthesis, starting at 1. Index 0 is
    /// the whole match. `None` when the index is out of range or the
    /// group did not participate in the match, for instance inside an
    /// untaken alternation branch.
    pub fn group(&self, index: usize) -> Option<Range<usize>> {
        if index == 0 {
            return Some(self.range());
        }
        self.groups
            .get(index - 1)
            .copied()
            .flatten()
            .map(|(start, end)| start..end)
    }

    /// Number of subexpressions the pattern defines, participating in
    /// this match or not.
    #[inline]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

/// Iterator over the non-overlapping matches of a pattern, created by
/// [`Regexp::find_iter`].
///
/// After a zero-length match the iterator advances one byte, so iteration
/// always terminates.
pub struct Matches<'r, 'h> {
    regexp: &'r Regexp,
    haystack: &'h [u8],
    at: usize,
}

impl Iterator for Matches<'_, '_> {
    type Item = Match;

    fn next(&mut self) -> Option<Match> {
        if self.at > self.haystack.len() {
            return None;
        }
        let m = self.regexp.find_at(self.haystack, self.at)?;
        self.at = if m.is_empty() { m.end() + 1 } else { m.end() };
        Some(m)
    }
}
