/*! A recursive-descent compiler that translates extended-POSIX regular
expressions into an NFA, using [Thompson's construction][1].

The grammar, top to bottom:

```text
ere           := branch ("|" branch)*
branch        := expression+
expression    := token repeat?
token         := literal | "." | "^" | "$" | "(" ere ")" | bracketExpression
repeat        := "*" | "+" | "?" | "{" count ("," count?)? "}"
bracketExpression := "[" "^"? bracketList "]"
```

Each grammar rule emits its states into the shared arena and returns the
`(start, end)` pair bounding the fragment it built. Fragments obey two
conventions that make concatenation free: a fragment's entry state is the
first state it allocated, and its only exit is a fall-through from its end
state to whatever state is allocated next. Sequential tokens therefore
chain together through monotonically increasing indices with no explicit
wiring.

Repetitions cannot place a branching state *before* an already-emitted
fragment without relocating it, which would invalidate indices. Instead
the entry state is cloned to the arena tail and the original slot is
rewritten into the branch, so every index handed out so far keeps meaning
"the entry of this fragment". `a+` is compiled as a copy of the fragment
followed by a starred clone, i.e. one mandatory occurrence then zero or
more.

Brace-counted repetition is parsed but deliberately unimplemented, as are
POSIX character classes, collating symbols and equivalence classes; they
all surface as [`Status::NotSupported`] rather than silently matching the
wrong thing.

[1]: https://en.wikipedia.org/wiki/Thompson%27s_construction
*/

#[cfg(feature = "logging")]
use log::*;

use crate::errors::{CompileError, Status};
use crate::nfa::cursor::Cursor;
use crate::nfa::{Anchor, Node, NodeStore, Program, StateId, NONE};
use crate::symbols::SymbolSets;

/// Characters that lose their special meaning when escaped with `\`.
const METACHARACTERS: &[u8] = br"^$.[]()|*+?{}\";

/// POSIX character class names, recognized inside `[: :]` but rejected
/// with [`Status::NotSupported`]. Anything else in that position is a
/// [`Status::BadCharClassType`].
const CLASS_NAMES: &[&[u8]] = &[
    b"alnum", b"alpha", b"blank", b"cntrl", b"digit", b"graph", b"lower",
    b"print", b"punct", b"space", b"upper", b"xdigit",
];

/// `(start, end)` state pair bounding an emitted fragment.
type Frag = (StateId, StateId);

/// Compiles one pattern into a [`Program`].
pub(crate) struct Compiler<'p> {
    cursor: Cursor<'p>,
    nodes: NodeStore,
    subexprs: Vec<(StateId, StateId)>,
    sets: SymbolSets,
    /// Number of `(` seen without their matching `)`. Decides whether a
    /// `)` closes a group or is an ordinary character.
    open_parens: u32,
    case_insensitive: bool,
}

impl<'p> Compiler<'p> {
    /// Creates a compiler for the given pattern.
    pub fn new(pattern: &'p [u8]) -> Self {
        Self {
            cursor: Cursor::new(pattern),
            nodes: NodeStore::new(),
            subexprs: Vec::new(),
            sets: SymbolSets::new(),
            open_parens: 0,
            case_insensitive: false,
        }
    }

    /// Compiles the pattern as a case-insensitive one. ASCII letters in
    /// literals and bracket expressions match both cases.
    pub fn case_insensitive(mut self, yes: bool) -> Self {
        self.case_insensitive = yes;
        self
    }

    /// Runs the parse and returns the compiled automaton. Any error
    /// aborts compilation immediately; no partial automaton escapes.
    pub fn compile(mut self) -> Result<Program, CompileError> {
        let entry = self.emit_eps()?;
        self.subexprs.push((entry, NONE));
        self.ere()?;
        // The top level consumes the whole pattern: `|` always starts
        // another branch and a stray `)` is an ordinary character.
        debug_assert!(self.cursor.current().is_none());
        let marker = self.push(Node::marker())?;
        self.subexprs[0] = (entry, marker);

        #[cfg(feature = "logging")]
        debug!(
            "compiled {} states, {} symbol sets, {} subexpressions",
            self.nodes.len(),
            self.sets.len(),
            self.subexprs.len() - 1,
        );

        Ok(Program::new(
            self.nodes,
            self.subexprs,
            self.sets,
            entry,
            marker,
        ))
    }

    /// `ere := branch ("|" branch)*`
    ///
    /// Alternation is right-nested: each `|` allocates a bridge state
    /// (carrying the finished branch to the merge point) and a fresh
    /// entry whose `next1`/`next2` fan out to the next branch and to the
    /// alternatives after it.
    fn ere(&mut self) -> Result<Frag, CompileError> {
        let first = self.emit_eps()?;
        let mut entry = first;
        let mut bridges = Vec::new();
        self.branch()?;
        while let Some(b'|') = self.cursor.current() {
            self.cursor.advance();
            let bridge = self.emit_eps()?;
            bridges.push(bridge);
            let next_entry = self.emit_eps()?;
            self.nodes[entry].next2 = next_entry;
            entry = next_entry;
            self.branch()?;
        }
        let merge = self.emit_eps()?;
        for bridge in bridges {
            self.nodes[bridge].next1 = merge;
        }
        Ok((first, merge))
    }

    /// `branch := expression+`
    ///
    /// Concatenation needs no wiring: each expression's end state falls
    /// through to the next expression's entry.
    fn branch(&mut self) -> Result<Frag, CompileError> {
        let (start, mut end) = self.expression()?;
        loop {
            match self.cursor.current() {
                None | Some(b'|') => break,
                Some(b')') if self.open_parens > 0 => break,
                Some(_) => end = self.expression()?.1,
            }
        }
        Ok((start, end))
    }

    /// `expression := token repeat?`
    fn expression(&mut self) -> Result<Frag, CompileError> {
        let (frag, group) = self.token()?;
        let repeated = match self.cursor.current() {
            Some(b'*') => {
                self.cursor.advance();
                Some(self.make_star(frag)?)
            }
            Some(b'+') => {
                self.cursor.advance();
                Some(self.make_plus(frag)?)
            }
            Some(b'?') => {
                self.cursor.advance();
                Some(self.make_question(frag)?)
            }
            Some(b'{') => return Err(self.brace_repeat()),
            _ => None,
        };
        match repeated {
            Some(frag) => {
                if let Some(b'*' | b'+' | b'?' | b'{') = self.cursor.current()
                {
                    return Err(CompileError::new(
                        Status::BadRepeat,
                        self.cursor.position(),
                    ));
                }
                // A repetition around a group moves the group's closing
                // state; the subexpression table tracks it in place.
                if let Some(group) = group {
                    self.subexprs[group as usize].1 = frag.1;
                }
                Ok(frag)
            }
            None => Ok(frag),
        }
    }

    /// `token := literal | "." | "^" | "$" | "(" ere ")" | bracket`
    ///
    /// Returns the fragment plus the subexpression index when the token
    /// was a parenthesized group, so the caller can keep the group's
    /// table entry in sync with any repetition applied to it.
    fn token(&mut self) -> Result<(Frag, Option<u32>), CompileError> {
        let off = self.cursor.position();
        match self.cursor.current() {
            None => {
                // Only reachable from an empty branch (`a|`, `(|a)`) or
                // a group cut short by the end of the pattern.
                let status = if self.open_parens > 0 {
                    Status::UnmatchedParenthesis
                } else {
                    Status::BadPattern
                };
                Err(CompileError::new(status, off))
            }
            Some(b'*' | b'+' | b'?' | b'{') => {
                Err(CompileError::new(Status::BadRepeat, off))
            }
            // An empty branch: `|a`, `a||b`, `()`.
            Some(b'|') => Err(CompileError::new(Status::BadPattern, off)),
            Some(b')') if self.open_parens > 0 => {
                Err(CompileError::new(Status::BadPattern, off))
            }
            Some(b'.') => {
                self.cursor.advance();
                let id = self.nodes.next_id();
                let id = self.push(Node::any(id + 1))?;
                Ok(((id, id), None))
            }
            Some(b'^') => {
                self.cursor.advance();
                let id = self.nodes.next_id();
                let id = self.push(Node::anchor(Anchor::Front, id + 1))?;
                Ok(((id, id), None))
            }
            Some(b'$') => {
                self.cursor.advance();
                let id = self.nodes.next_id();
                let id = self.push(Node::anchor(Anchor::Back, id + 1))?;
                Ok(((id, id), None))
            }
            Some(b'[') => Ok((self.bracket()?, None)),
            Some(b'(') => {
                self.cursor.advance();
                self.open_parens += 1;
                let group = self.subexprs.len() as u32;
                self.subexprs.push((self.nodes.next_id(), NONE));
                let frag = self.ere()?;
                if self.cursor.current() != Some(b')') {
                    return Err(CompileError::new(
                        Status::UnmatchedParenthesis,
                        off,
                    ));
                }
                self.cursor.advance();
                self.open_parens -= 1;
                self.subexprs[group as usize] = frag;
                Ok((frag, Some(group)))
            }
            Some(b'\\') => {
                self.cursor.advance();
                match self.cursor.current() {
                    None => Err(CompileError::new(
                        Status::TrailingBackslash,
                        off,
                    )),
                    Some(c) if METACHARACTERS.contains(&c) => {
                        self.cursor.advance();
                        Ok((self.emit_literal(c)?, None))
                    }
                    Some(_) => {
                        Err(CompileError::new(Status::BadPattern, off))
                    }
                }
            }
            // Note: this arm also picks up `)` when no group is open,
            // which POSIX treats as an ordinary character.
            Some(c) => {
                self.cursor.advance();
                Ok((self.emit_literal(c)?, None))
            }
        }
    }

    /// `bracketExpression := "[" "^"? bracketList "]"`
    fn bracket(&mut self) -> Result<Frag, CompileError> {
        let open = self.cursor.position();
        self.cursor.advance();
        self.sets.begin();
        let mut negated = false;
        if self.cursor.current() == Some(b'^') {
            negated = true;
            self.cursor.advance();
        }
        // A `]` in first position is an ordinary member.
        if self.cursor.current() == Some(b']') {
            self.sets.add_byte(b']');
            self.cursor.advance();
        }
        loop {
            let lo = match self.cursor.current() {
                None => {
                    return Err(CompileError::new(
                        Status::UnmatchedBracket,
                        open,
                    ))
                }
                Some(b']') => {
                    self.cursor.advance();
                    break;
                }
                Some(c) => c,
            };
            if lo == b'[' {
                if let Some(delim @ (b':' | b'.' | b'=')) =
                    self.cursor.lookahead()
                {
                    return Err(self.bracket_class(delim));
                }
            }
            let range_off = self.cursor.position();
            self.cursor.advance();
            if self.cursor.current() == Some(b'-') {
                let dash = self.cursor.position();
                self.cursor.advance();
                match self.cursor.current() {
                    // `[a-]` — the dash is an ordinary member; back out
                    // and let the next iteration pick it up.
                    Some(b']') => {
                        self.cursor.seek(dash);
                        self.sets.add_byte(lo);
                    }
                    None => {
                        return Err(CompileError::new(
                            Status::UnmatchedBracket,
                            open,
                        ))
                    }
                    Some(hi) => {
                        self.cursor.advance();
                        self.sets
                            .add_range(lo, hi)
                            .map_err(|s| CompileError::new(s, range_off))?;
                    }
                }
            } else {
                self.sets.add_byte(lo);
            }
        }
        if self.case_insensitive {
            self.sets.close_over_ascii_case();
        }
        if negated {
            self.sets.negate();
        }
        let set = self.sets.freeze();
        let id = self.nodes.next_id();
        let id = self.push(Node::class(set, id + 1))?;
        Ok((id, id))
    }

    /// Parses `[:name:]`, `[.sym.]` or `[=equiv=]` far enough to decide
    /// which error to report. All three are recognized and rejected.
    fn bracket_class(&mut self, delim: u8) -> CompileError {
        let off = self.cursor.position();
        self.cursor.advance();
        self.cursor.advance();
        let name_start = self.cursor.position();
        loop {
            match self.cursor.current() {
                None => {
                    return CompileError::new(Status::UnmatchedBracket, off)
                }
                Some(c)
                    if c == delim
                        && self.cursor.lookahead() == Some(b']') =>
                {
                    let name =
                        self.cursor.span(name_start, self.cursor.position());
                    let status = if delim == b':'
                        && !CLASS_NAMES.contains(&name)
                    {
                        Status::BadCharClassType
                    } else {
                        Status::NotSupported
                    };
                    return CompileError::new(status, off);
                }
                Some(_) => self.cursor.advance(),
            }
        }
    }

    /// Parses `{m}`, `{m,}` or `{m,n}`. Counted repetition is recognized
    /// but unimplemented, so a well-formed interval still fails, with
    /// [`Status::NotSupported`].
    fn brace_repeat(&mut self) -> CompileError {
        let off = self.cursor.position();
        self.cursor.advance();
        let min = self.number();
        let max = if self.cursor.current() == Some(b',') {
            self.cursor.advance();
            self.number()
        } else {
            min
        };
        match self.cursor.current() {
            None => return CompileError::new(Status::UnmatchedBrace, off),
            Some(b'}') => self.cursor.advance(),
            Some(_) => return CompileError::new(Status::BadBrace, off),
        }
        match (min, max) {
            (None, _) => CompileError::new(Status::BadBrace, off),
            (Some(lo), Some(hi)) if hi < lo => {
                CompileError::new(Status::BadBrace, off)
            }
            _ => CompileError::new(Status::NotSupported, off),
        }
    }

    /// Consumes a run of decimal digits. `None` if there is none.
    fn number(&mut self) -> Option<u32> {
        let mut value: u32 = 0;
        let mut digits = 0;
        while let Some(c @ b'0'..=b'9') = self.cursor.current() {
            value = value.saturating_mul(10).saturating_add((c - b'0') as u32);
            digits += 1;
            self.cursor.advance();
        }
        if digits > 0 {
            Some(value)
        } else {
            None
        }
    }

    /// Kleene star: zero or more occurrences of `frag`.
    ///
    /// The fragment's entry is cloned to the arena tail and the original
    /// slot becomes a branch that either enters the loop body (via the
    /// clone) or bypasses it to a fresh exit state. The fragment's end
    /// gets a back-edge to the branch, closing the loop.
    fn make_star(&mut self, (start, end): Frag) -> Result<Frag, CompileError> {
        let entry = self.nodes[start].clone();
        let relocated = self.push(entry)?;
        let loop_end = if start == end { relocated } else { end };
        self.nodes[loop_end].next1 = start;
        let exit = self.emit_eps()?;
        self.nodes[start] = Node::branch(relocated, exit);
        Ok((start, exit))
    }

    /// `a+` — a copy of the fragment followed by a starred clone: one
    /// mandatory occurrence, then zero or more.
    fn make_plus(&mut self, (start, end): Frag) -> Result<Frag, CompileError> {
        let clone = self.clone_fragment(start, end)?;
        let (_, exit) = self.make_star(clone)?;
        Ok((start, exit))
    }

    /// `a?` — a branch around the fragment with no back-edge: enter once
    /// or skip.
    fn make_question(
        &mut self,
        (start, end): Frag,
    ) -> Result<Frag, CompileError> {
        let entry = self.nodes[start].clone();
        let relocated = self.push(entry)?;
        let exit = self.emit_eps()?;
        let tail = if start == end { relocated } else { end };
        self.nodes[tail].next1 = exit;
        self.nodes[start] = Node::branch(relocated, exit);
        Ok((start, exit))
    }

    /// Appends a copy of the fragment `start..=end` and returns the
    /// copy's bounds. Successor indices are shifted by the relocation
    /// distance; a fragment never references states outside itself other
    /// than the fall-through one past its end, so the shift is total.
    fn clone_fragment(
        &mut self,
        start: StateId,
        end: StateId,
    ) -> Result<Frag, CompileError> {
        let offset = self.nodes.next_id() - start;
        for id in start..=end {
            let mut node = self.nodes[id].clone();
            debug_assert!((start..=end + 1).contains(&node.next1));
            node.next1 += offset;
            if node.next2 != NONE {
                debug_assert!((start..=end + 1).contains(&node.next2));
                node.next2 += offset;
            }
            self.push(node)?;
        }
        Ok((start + offset, end + offset))
    }

    /// Emits a single-byte literal state. Under case folding an ASCII
    /// letter becomes a two-member symbol set instead.
    fn emit_literal(&mut self, byte: u8) -> Result<Frag, CompileError> {
        let id = self.nodes.next_id();
        let id = if self.case_insensitive && byte.is_ascii_alphabetic() {
            self.sets.begin();
            self.sets.add_byte(byte.to_ascii_lowercase());
            self.sets.add_byte(byte.to_ascii_uppercase());
            let set = self.sets.freeze();
            self.push(Node::class(set, id + 1))?
        } else {
            self.push(Node::literal(byte, id + 1))?
        };
        Ok((id, id))
    }

    /// Emits an epsilon connector that falls through to the next state
    /// allocated after it.
    fn emit_eps(&mut self) -> Result<StateId, CompileError> {
        let id = self.nodes.next_id();
        self.push(Node::epsilon(id + 1))
    }

    fn push(&mut self, node: Node) -> Result<StateId, CompileError> {
        self.nodes
            .push(node)
            .map_err(|status| CompileError::new(status, self.cursor.position()))
    }
}
