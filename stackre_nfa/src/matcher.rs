use crate::nfa::{CompactAutomaton, StateId};
use std::collections::HashSet;
use std::ops::Range;

/// One occurrence of a pattern: `length` bytes starting at byte `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Match {
    pub offset: usize,
    pub length: usize,
}

impl Match {
    pub fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    pub fn range(&self) -> Range<usize> {
        self.offset..self.end()
    }

    /// The matched text. Matches always start and end on character
    /// boundaries of the text they were found in.
    pub fn as_str<'h>(&self, haystack: &'h str) -> &'h str {
        &haystack[self.range()]
    }
}

/// One live branch of the search from a single start offset.
#[derive(Debug, Clone, Copy)]
struct PartialMatch {
    state: StateId,
    length: usize,
}

/// A matcher that runs a compact automaton against input by depth-first
/// backtracking from every start offset.
///
/// Epsilon cycles (from repeating something that can match nothing, like
/// `(a?)*`) would let the search spin forever without consuming input. Every
/// such cycle contains at least one guard point. Entering a guard point over
/// an epsilon edge is allowed once per consumed length and start offset;
/// a second entry would only repeat work already on the stack.
pub struct Matcher<'a> {
    nfa: &'a CompactAutomaton,
    guard_points: Vec<bool>,
}

impl<'a> Matcher<'a> {
    /// Create a new matcher for the given automaton
    pub fn new(nfa: &'a CompactAutomaton) -> Self {
        Self {
            guard_points: find_guard_points(nfa),
            nfa,
        }
    }

    /// Whether `id` closes an epsilon cycle
    pub fn is_guard_point(&self, id: StateId) -> bool {
        self.guard_points[id]
    }

    /// Find every match in the input.
    ///
    /// No overlap or duplicate filtering happens: each (offset, length) pair
    /// is reported once per distinct path that reaches the final state with
    /// it, minus paths cut short by the cycle guard.
    pub fn find_all(&self, input: &str) -> Vec<Match> {
        let mut matches = Vec::new();
        let mut cache = SearchCache::new(self.nfa);
        for (offset, _) in input.char_indices() {
            self.search_at(input.as_bytes(), offset, &mut cache, |m| {
                matches.push(m);
                true
            });
        }
        matches
    }

    /// Find the leftmost match, preferring the longest one at that offset
    pub fn find(&self, input: &str) -> Option<Match> {
        let mut cache = SearchCache::new(self.nfa);
        for (offset, _) in input.char_indices() {
            let mut longest: Option<Match> = None;
            self.search_at(input.as_bytes(), offset, &mut cache, |m| {
                if longest.map_or(true, |l| m.length > l.length) {
                    longest = Some(m);
                }
                true
            });
            if longest.is_some() {
                return longest;
            }
        }
        None
    }

    /// Check if the pattern occurs anywhere in the input
    pub fn is_match(&self, input: &str) -> bool {
        let mut found = false;
        let mut cache = SearchCache::new(self.nfa);
        for (offset, _) in input.char_indices() {
            self.search_at(input.as_bytes(), offset, &mut cache, |_| {
                found = true;
                false
            });
            if found {
                return true;
            }
        }
        false
    }

    /// Explores every path from `offset`, handing each match to `on_match`
    /// until it returns `false`.
    fn search_at<F: FnMut(Match) -> bool>(
        &self,
        text: &[u8],
        offset: usize,
        cache: &mut SearchCache,
        mut on_match: F,
    ) {
        // Guards only hold for the offset they were recorded at.
        cache.reset(&self.guard_points);
        let initial = self.nfa.initial();
        if self.guard_points[initial] {
            cache.guards[initial].insert(0);
        }
        cache.paths.push(PartialMatch {
            state: initial,
            length: 0,
        });

        while let Some(current) = cache.paths.pop() {
            if current.state == self.nfa.final_state()
                && !on_match(Match::new(offset, current.length))
            {
                return;
            }

            let position = offset + current.length;
            if position > text.len() {
                continue;
            }
            let rest = &text[position..];

            for edge in self.nfa.transitions(current.state) {
                let length = current.length + edge.label.len();
                if !edge.is_epsilon() && !rest.starts_with(&edge.label) {
                    continue;
                }
                if self.guard_points[edge.target] {
                    let fresh = cache.guards[edge.target].insert(length);
                    if !fresh && edge.is_epsilon() {
                        log!(log::trace!(
                            "z{} -> z{} would revisit a cycle at length {}, dropping this path",
                            current.state,
                            edge.target,
                            length
                        ));
                        continue;
                    }
                }
                cache.paths.push(PartialMatch {
                    state: edge.target,
                    length,
                });
            }
        }
    }
}

/// Per-search scratch space, reused across start offsets.
struct SearchCache {
    // Lengths at which each guard point was entered from the current offset.
    guards: Vec<HashSet<usize>>,
    paths: Vec<PartialMatch>,
}

impl SearchCache {
    fn new(nfa: &CompactAutomaton) -> Self {
        Self {
            guards: vec![HashSet::new(); nfa.state_count()],
            paths: Vec::new(),
        }
    }

    fn reset(&mut self, guard_points: &[bool]) {
        self.paths.clear();
        for (seen, &is_guard) in self.guards.iter_mut().zip(guard_points) {
            if is_guard {
                seen.clear();
            }
        }
    }
}

/// Marks the target of every epsilon edge that closes a cycle of epsilon
/// edges, found as back edges of a depth-first walk over the epsilon
/// transitions. The walk starts at the initial state and then at every state
/// not yet reached, so cycles behind consuming transitions are found too.
fn find_guard_points(nfa: &CompactAutomaton) -> Vec<bool> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Unvisited,
        Active,
        Finished,
    }

    let count = nfa.state_count();
    let mut marks = vec![Mark::Unvisited; count];
    let mut guard_points = vec![false; count];
    let mut stack: Vec<(StateId, usize)> = Vec::new();

    for root in std::iter::once(nfa.initial()).chain(0..count) {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        marks[root] = Mark::Active;
        stack.push((root, 0));

        while let Some(frame) = stack.last_mut() {
            let (state, edge) = *frame;
            let transitions = nfa.transitions(state);
            if edge == transitions.len() {
                marks[state] = Mark::Finished;
                stack.pop();
                continue;
            }
            frame.1 += 1;

            let transition = &transitions[edge];
            if !transition.is_epsilon() {
                continue;
            }
            match marks[transition.target] {
                Mark::Unvisited => {
                    marks[transition.target] = Mark::Active;
                    stack.push((transition.target, 0));
                }
                Mark::Active => guard_points[transition.target] = true,
                Mark::Finished => {}
            }
        }
    }

    guard_points
}

/// Finds every match of `nfa` in `input`
pub fn find_all(input: &str, nfa: &CompactAutomaton) -> Vec<Match> {
    Matcher::new(nfa).find_all(input)
}
