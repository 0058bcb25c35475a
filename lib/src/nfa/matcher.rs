/*! Executes a compiled automaton against a search string.

The matcher simulates the NFA with a double-ended work queue instead of
backtracking. Epsilon moves are pushed to the *front* of the queue and
processed eagerly, so the full epsilon closure at the current input
position is explored before any more input is consumed; moves that consume
a byte are pushed to the *back*, behind a [`Job::Scan`] guard that marks
the boundary between input positions. Each queue entry carries its own
capture record, so the spans reported for subexpressions always come from
the one thread that produced the winning match.

Two bit rows — one per input position in flight — record which states are
already queued, so an epsilon cycle produced by `*` or `+` cannot enqueue
the same state twice in one round and the simulation always terminates.
The rows are swapped whenever the scan guard is processed, the same way a
Pike-style VM swaps its current and next thread sets between bytes.

Disambiguation follows the POSIX leftmost-longest rule. Reaching the
program's marker state means the input consumed so far is an accepted
match, but the matcher keeps draining the queue because a thread still in
flight may extend the match further; the candidate is only replaced by a
strictly longer one. If no candidate exists once the queue runs dry, the
trial start offset advances by one and the simulation restarts, so an
earlier starting position always beats a longer match found later.
*/

use std::collections::VecDeque;
use std::mem;

use bitvec::vec::BitVec;
use smallvec::{smallvec, SmallVec};

#[cfg(feature = "logging")]
use log::*;

use crate::nfa::{Anchor, Program, StateId, NONE};

/// Start/end offsets recorded per subexpression, two slots per group.
pub(crate) type CaptureSlots = SmallVec<[Option<usize>; 8]>;

/// A successful search: the overall span plus the capture record of the
/// thread that produced it.
pub(crate) struct Found {
    pub start: usize,
    pub end: usize,
    pub caps: CaptureSlots,
}

/// One entry in the work queue.
enum Job {
    /// All epsilon moves at the current position are exhausted; read one
    /// more input symbol.
    Scan,
    /// Try `state` with the input at `pos`.
    Visit { state: StateId, pos: usize, caps: CaptureSlots },
}

/// Runs a [`Program`] over input text.
///
/// The matcher owns the scratch state for one search at a time; the
/// program itself is shared and immutable. Concurrent searches over the
/// same program each need their own `Matcher`.
pub(crate) struct Matcher<'r> {
    program: &'r Program,
    queue: VecDeque<Job>,
    /// States already queued at the current input position.
    queued: BitVec,
    /// States already queued at the next input position.
    queued_next: BitVec,
}

impl<'r> Matcher<'r> {
    pub fn new(program: &'r Program) -> Self {
        let states = program.nodes.len();
        Self {
            program,
            queue: VecDeque::new(),
            queued: BitVec::repeat(false, states),
            queued_next: BitVec::repeat(false, states),
        }
    }

    /// Finds the leftmost-longest match in `text` at or after byte
    /// offset `start`.
    pub fn search(&mut self, text: &[u8], start: usize) -> Option<Found> {
        if start > text.len() {
            return None;
        }
        for trial in start..=text.len() {
            #[cfg(feature = "logging")]
            trace!("trying match at offset {}", trial);
            if let Some((end, caps)) = self.try_at(text, trial) {
                return Some(Found { start: trial, end, caps });
            }
        }
        None
    }

    /// Runs the automaton with the match pinned to start at `trial`.
    /// Returns the longest accepted end offset and its capture record.
    fn try_at(
        &mut self,
        text: &[u8],
        trial: usize,
    ) -> Option<(usize, CaptureSlots)> {
        let slots = 2 * (self.program.group_count() - 1);

        self.queue.clear();
        self.queued.fill(false);
        self.queued_next.fill(false);

        self.enqueue_front(self.program.start, trial, smallvec![None; slots]);
        self.queue.push_back(Job::Scan);

        let mut best: Option<(usize, CaptureSlots)> = None;

        while let Some(job) = self.queue.pop_front() {
            let (state, pos, mut caps) = match job {
                Job::Scan => {
                    if self.queue.is_empty() {
                        break;
                    }
                    mem::swap(&mut self.queued, &mut self.queued_next);
                    self.queued_next.fill(false);
                    self.queue.push_back(Job::Scan);
                    continue;
                }
                Job::Visit { state, pos, caps } => (state, pos, caps),
            };

            if let Some(group) = self.program.group_start(state) {
                let slot = 2 * (group as usize - 1);
                // First entry into the group wins; later visits are the
                // loop header of a repetition re-entering it.
                if caps[slot].is_none() {
                    caps[slot] = Some(pos);
                }
            }
            if let Some(group) = self.program.group_end(state) {
                caps[2 * (group as usize - 1) + 1] = Some(pos);
            }

            if state == self.program.marker {
                // Accepted, but a pending thread may still extend the
                // match. Only a strictly longer candidate replaces the
                // current one.
                match &best {
                    Some((end, _)) if *end >= pos => {}
                    _ => best = Some((pos, caps)),
                }
                continue;
            }

            let node = &self.program.nodes[state];
            if node.consumes() {
                let matched = match text.get(pos) {
                    Some(&b) => {
                        if node.match_any {
                            true
                        } else if let Some(set) = node.set {
                            self.program.sets.member(set, b)
                        } else {
                            node.input == Some(b)
                        }
                    }
                    None => false,
                };
                if matched {
                    self.enqueue_back(node.next1, pos + 1, caps);
                }
            } else if let Some(anchor) = node.anchor {
                let holds = match anchor {
                    Anchor::Front => pos == 0,
                    Anchor::Back => pos == text.len(),
                };
                if holds {
                    self.enqueue_front(node.next1, pos, caps);
                }
            } else {
                // Epsilon state; `next1` is pushed last so it is
                // explored first.
                if node.next2 != NONE {
                    self.enqueue_front(node.next2, pos, caps.clone());
                }
                self.enqueue_front(node.next1, pos, caps);
            }
        }

        best
    }

    #[inline]
    fn enqueue_front(&mut self, state: StateId, pos: usize, caps: CaptureSlots) {
        debug_assert_ne!(state, NONE);
        if !self.queued[state as usize] {
            self.queued.set(state as usize, true);
            self.queue.push_front(Job::Visit { state, pos, caps });
        }
    }

    #[inline]
    fn enqueue_back(&mut self, state: StateId, pos: usize, caps: CaptureSlots) {
        debug_assert_ne!(state, NONE);
        if !self.queued_next[state as usize] {
            self.queued_next.set(state as usize, true);
            self.queue.push_back(Job::Visit { state, pos, caps });
        }
    }
}
