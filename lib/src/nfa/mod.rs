/*! The NFA representation shared by the compiler and the matcher.

A compiled pattern is a [nondeterministic finite automaton][1] stored as a
flat, append-only arena of [`Node`]s. States reference their successors by
index, never by pointer, so the automaton's graph can contain the cycles
produced by `*` and `+` without any ownership cycles in the data model.
Indices are stable: the compiler only ever appends nodes, so a forward
reference emitted early in compilation remains valid for the lifetime of
the program.

[1]: https://en.wikipedia.org/wiki/Nondeterministic_finite_automaton
*/

use std::fmt::{Display, Formatter};

use rustc_hash::FxHashMap;

use crate::errors::Status;
use crate::symbols::SymbolSets;

pub(crate) mod compiler;
pub(crate) mod cursor;
pub(crate) mod matcher;


/// Index of a state in the node arena.
pub(crate) type StateId = u32;

/// Sentinel for an unused successor slot.
pub(crate) const NONE: StateId = StateId::MAX;

/// Maximum number of states in one automaton. Exceeding this during
/// compilation is reported as [`Status::OutOfMemory`].
pub(crate) const MAX_STATES: usize = 1 << 16;

/// A zero-width positional assertion.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub(crate) enum Anchor {
    /// `^` — only valid at offset zero of the searched text.
    Front,
    /// `$` — only valid at the end of the searched text.
    Back,
}

/// One automaton state.
///
/// A node with `input == None` and no symbol set, match-any flag or anchor
/// is an epsilon state: it consumes nothing and transfers control to
/// `next1` (and to `next2` when that slot is in use, which makes the node
/// a branching point). Every other node consumes exactly one input byte
/// and transfers control to `next1`; `next2` is present for uniform
/// storage but unused.
#[derive(Clone, Debug)]
pub(crate) struct Node {
    /// The byte that fires this state's transition; `None` for epsilon.
    pub input: Option<u8>,
    /// Primary successor.
    pub next1: StateId,
    /// Secondary successor, [`NONE`] unless this is a branching point.
    pub next2: StateId,
    /// Symbol-set table index for class-matching states.
    pub set: Option<u32>,
    /// True for the `.` wildcard.
    pub match_any: bool,
    /// Positional constraint for `^` and `$` states.
    pub anchor: Option<Anchor>,
}

impl Node {
    fn empty(next1: StateId) -> Self {
        Self {
            input: None,
            next1,
            next2: NONE,
            set: None,
            match_any: false,
            anchor: None,
        }
    }

    /// An epsilon connector.
    pub fn epsilon(next1: StateId) -> Self {
        Self::empty(next1)
    }

    /// An epsilon branching point with two live successors.
    pub fn branch(next1: StateId, next2: StateId) -> Self {
        Self { next2, ..Self::empty(next1) }
    }

    /// A state that consumes one specific byte.
    pub fn literal(byte: u8, next1: StateId) -> Self {
        Self { input: Some(byte), ..Self::empty(next1) }
    }

    /// A state that consumes any byte belonging to a symbol set.
    pub fn class(set: u32, next1: StateId) -> Self {
        Self { set: Some(set), ..Self::empty(next1) }
    }

    /// The `.` wildcard: consumes any byte.
    pub fn any(next1: StateId) -> Self {
        Self { match_any: true, ..Self::empty(next1) }
    }

    /// A zero-width anchor state.
    pub fn anchor(anchor: Anchor, next1: StateId) -> Self {
        Self { anchor: Some(anchor), ..Self::empty(next1) }
    }

    /// The trailing non-accepting marker state. Reaching it at match time
    /// means the automaton has accepted the input consumed so far.
    pub fn marker() -> Self {
        Self::empty(NONE)
    }

    /// True if traversing this state consumes one byte of input.
    #[inline]
    pub fn consumes(&self) -> bool {
        self.input.is_some() || self.set.is_some() || self.match_any
    }
}

/// The append-only arena holding an automaton's states.
pub(crate) struct NodeStore {
    nodes: Vec<Node>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// The index the next pushed node will receive.
    #[inline]
    pub fn next_id(&self) -> StateId {
        self.nodes.len() as StateId
    }

    /// Appends a node, enforcing the state-count cap.
    pub fn push(&mut self, node: Node) -> Result<StateId, Status> {
        if self.nodes.len() >= MAX_STATES {
            return Err(Status::OutOfMemory);
        }
        let id = self.next_id();
        self.nodes.push(node);
        Ok(id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

impl std::ops::Index<StateId> for NodeStore {
    type Output = Node;

    #[inline]
    fn index(&self, id: StateId) -> &Node {
        &self.nodes[id as usize]
    }
}

impl std::ops::IndexMut<StateId> for NodeStore {
    #[inline]
    fn index_mut(&mut self, id: StateId) -> &mut Node {
        &mut self.nodes[id as usize]
    }
}

impl Display for NodeStore {
    /// Renders the arena one state per line, in a form meant for tests
    /// and debugging:
    ///
    /// ```text
    /// 00000: EPS -> 1
    /// 00001: SPLIT -> 2, 4
    /// 00002: LIT 0x61 -> 3
    /// ```
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        for (id, node) in self.nodes.iter().enumerate() {
            write!(f, "{:05}: ", id)?;
            if let Some(byte) = node.input {
                writeln!(f, "LIT {:#04x} -> {}", byte, node.next1)?;
            } else if let Some(set) = node.set {
                writeln!(f, "CLASS({}) -> {}", set, node.next1)?;
            } else if node.match_any {
                writeln!(f, "ANY -> {}", node.next1)?;
            } else if let Some(anchor) = node.anchor {
                let name = match anchor {
                    Anchor::Front => "BOL",
                    Anchor::Back => "EOL",
                };
                writeln!(f, "{} -> {}", name, node.next1)?;
            } else if node.next1 == NONE {
                writeln!(f, "MARKER")?;
            } else if node.next2 != NONE {
                writeln!(f, "SPLIT -> {}, {}", node.next1, node.next2)?;
            } else {
                writeln!(f, "EPS -> {}", node.next1)?;
            }
        }
        Ok(())
    }
}

/// A compiled automaton: the node arena plus the subexpression table and
/// the symbol-set table, all immutable after compilation. Safe to share
/// across threads; every search allocates its own scratch state.
pub(crate) struct Program {
    pub nodes: NodeStore,
    /// `(start, end)` state pair per subexpression; entry 0 is the whole
    /// pattern.
    pub subexprs: Vec<(StateId, StateId)>,
    pub sets: SymbolSets,
    /// The leading epsilon state wrapping the whole pattern.
    pub start: StateId,
    /// The trailing non-accepting marker state.
    pub marker: StateId,
    group_starts: FxHashMap<StateId, u32>,
    group_ends: FxHashMap<StateId, u32>,
}

impl Program {
    pub fn new(
        nodes: NodeStore,
        subexprs: Vec<(StateId, StateId)>,
        sets: SymbolSets,
        start: StateId,
        marker: StateId,
    ) -> Self {
        let mut group_starts = FxHashMap::default();
        let mut group_ends = FxHashMap::default();
        for (group, &(s, e)) in subexprs.iter().enumerate().skip(1) {
            group_starts.insert(s, group as u32);
            group_ends.insert(e, group as u32);
        }
        Self { nodes, subexprs, sets, start, marker, group_starts, group_ends }
    }

    /// The subexpression whose span opens at this state, if any.
    #[inline]
    pub fn group_start(&self, state: StateId) -> Option<u32> {
        self.group_starts.get(&state).copied()
    }

    /// The subexpression whose span closes at this state, if any.
    #[inline]
    pub fn group_end(&self, state: StateId) -> Option<u32> {
        self.group_ends.get(&state).copied()
    }

    /// Number of subexpression table entries, including entry 0 for the
    /// whole pattern.
    #[inline]
    pub fn group_count(&self) -> usize {
        self.subexprs.len()
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.nodes, f)
    }
}
