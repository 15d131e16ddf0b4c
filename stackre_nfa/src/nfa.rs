use std::fmt;

/// A state ID in the automaton. IDs are dense and assigned in creation order.
pub type StateId = usize;

/// The ID of the initial state of every automaton
pub const INITIAL: StateId = 0;
/// The ID of the final state of every automaton
pub const FINAL: StateId = 1;

/// A labeled edge. An empty label is an epsilon transition that consumes no
/// input; any other label matches exactly its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub label: Vec<u8>,
    pub target: StateId,
}

impl Transition {
    /// Create a transition matching `label` exactly
    pub fn bytes(label: &[u8], target: StateId) -> Self {
        Transition {
            label: label.to_vec(),
            target,
        }
    }

    /// Create an epsilon transition
    pub fn epsilon(target: StateId) -> Self {
        Transition {
            label: Vec::new(),
            target,
        }
    }

    pub fn is_epsilon(&self) -> bool {
        self.label.is_empty()
    }
}

/// A state and the transitions leaving it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub id: StateId,
    pub transitions: Vec<Transition>,
}

/// The automaton as the compiler grows it: an append-only arena of states
/// addressed by ID. States are never removed, only gain transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Automaton {
    states: Vec<State>,
}

impl Automaton {
    /// Create an automaton holding only its initial and final state
    pub fn new() -> Self {
        let mut automaton = Self { states: Vec::new() };
        automaton.add_state();
        automaton.add_state();
        automaton
    }

    /// Add a new state and return its ID
    pub fn add_state(&mut self) -> StateId {
        let id = self.states.len();
        self.states.push(State {
            id,
            transitions: Vec::new(),
        });
        id
    }

    /// Connect two states with a transition matching `label`
    pub fn connect(&mut self, from: StateId, to: StateId, label: &[u8]) {
        if to >= self.states.len() {
            panic!("no state z{} to connect z{} to", to, from);
        }
        log!(log::debug!(
            "adding connection from z{} to z{} matching {:?}",
            from,
            to,
            String::from_utf8_lossy(label)
        ));
        match self.states.get_mut(from) {
            Some(state) => state.transitions.push(Transition::bytes(label, to)),
            None => panic!("no state z{} to connect from", from),
        }
    }

    /// Connect two states with an epsilon transition
    pub fn connect_empty(&mut self, from: StateId, to: StateId) {
        self.connect(from, to, &[]);
    }

    pub fn initial(&self) -> StateId {
        INITIAL
    }

    pub fn final_state(&self) -> StateId {
        FINAL
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn state(&self, id: StateId) -> &State {
        &self.states[id]
    }

    /// Flattens the automaton into its index-addressed matching form.
    ///
    /// The traversal walks every state reachable from the initial state
    /// once. IDs are already dense, so each state lands at its own ID and
    /// no renumbering happens. The automaton is consumed.
    pub fn compact(self) -> CompactAutomaton {
        let count = self.states.len();
        let mut seen = vec![false; count];
        let mut compacted: Vec<CompactState> = (0..count).map(|_| CompactState::default()).collect();
        let mut stack = vec![INITIAL];
        seen[INITIAL] = true;

        let mut states = self.states;
        while let Some(id) = stack.pop() {
            let transitions = std::mem::take(&mut states[id].transitions);
            for transition in &transitions {
                if !seen[transition.target] {
                    seen[transition.target] = true;
                    stack.push(transition.target);
                }
            }
            compacted[id] = CompactState {
                transitions: transitions
                    .into_iter()
                    .map(|t| CompactTransition {
                        label: t.label.into_boxed_slice(),
                        target: t.target,
                    })
                    .collect(),
            };
        }

        CompactAutomaton {
            states: compacted.into_boxed_slice(),
            initial: INITIAL,
            final_state: FINAL,
        }
    }
}

impl Default for Automaton {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&CompactAutomaton> for Automaton {
    /// Expands a compact automaton back into the growable form.
    fn from(compact: &CompactAutomaton) -> Self {
        let states = compact
            .states
            .iter()
            .enumerate()
            .map(|(id, state)| State {
                id,
                transitions: state
                    .transitions
                    .iter()
                    .map(|t| Transition::bytes(&t.label, t.target))
                    .collect(),
            })
            .collect();
        Automaton { states }
    }
}

/// A transition in the compact form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactTransition {
    pub label: Box<[u8]>,
    pub target: StateId,
}

impl CompactTransition {
    pub fn is_epsilon(&self) -> bool {
        self.label.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompactState {
    pub transitions: Box<[CompactTransition]>,
}

/// The immutable, index-addressed automaton the matcher runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactAutomaton {
    states: Box<[CompactState]>,
    initial: StateId,
    final_state: StateId,
}

impl CompactAutomaton {
    pub fn initial(&self) -> StateId {
        self.initial
    }

    pub fn final_state(&self) -> StateId {
        self.final_state
    }

    pub fn states(&self) -> &[CompactState] {
        &self.states
    }

    pub fn transitions(&self, id: StateId) -> &[CompactTransition] {
        &self.states[id].transitions
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }
}

impl fmt::Display for CompactAutomaton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "initial: z{}", self.initial)?;
        writeln!(f, "final: z{}", self.final_state)?;
        for (id, state) in self.states.iter().enumerate() {
            write!(f, "z{}:", id)?;
            if state.transitions.is_empty() {
                writeln!(f)?;
                continue;
            }
            for (i, t) in state.transitions.iter().enumerate() {
                let sep = if i == 0 { " " } else { ", " };
                if t.is_epsilon() {
                    write!(f, "{}-> z{} ε", sep, t.target)?;
                } else {
                    write!(f, "{}-> z{} {:?}", sep, t.target, String::from_utf8_lossy(&t.label))?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_has_initial_and_final() {
        let nfa = Automaton::new();
        assert_eq!(nfa.state_count(), 2);
        assert_eq!(nfa.initial(), 0);
        assert_eq!(nfa.final_state(), 1);
    }

    #[test]
    fn test_compact_preserves_layout() {
        // z0 -a-> z2 -ε-> z1, z2 -ε-> z0
        let mut nfa = Automaton::new();
        let s = nfa.add_state();
        nfa.connect(0, s, b"a");
        nfa.connect_empty(s, 1);
        nfa.connect_empty(s, 0);

        let compact = nfa.compact();
        assert_eq!(compact.state_count(), 3);
        assert_eq!(compact.initial(), 0);
        assert_eq!(compact.final_state(), 1);
        assert_eq!(&*compact.transitions(0)[0].label, b"a");
        assert_eq!(compact.transitions(0)[0].target, 2);
        assert_eq!(compact.transitions(2).len(), 2);
        assert!(compact.transitions(2).iter().all(CompactTransition::is_epsilon));
        assert!(compact.transitions(1).is_empty());
    }

    #[test]
    fn test_recompact_is_isomorphic() {
        let mut nfa = Automaton::new();
        let a = nfa.add_state();
        let b = nfa.add_state();
        nfa.connect(0, a, b"x");
        nfa.connect_empty(a, b);
        nfa.connect(b, a, "é".as_bytes());
        nfa.connect_empty(b, 1);

        let once = nfa.compact();
        let twice = Automaton::from(&once).compact();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_display() {
        let mut nfa = Automaton::new();
        let s = nfa.add_state();
        nfa.connect(0, s, b"ab");
        nfa.connect_empty(s, 1);

        let dump = nfa.compact().to_string();
        assert_eq!(dump, "initial: z0\nfinal: z1\nz0: -> z2 \"ab\"\nz1:\nz2: -> z1 ε\n");
    }

    #[test]
    #[should_panic(expected = "no state z7")]
    fn test_connect_missing_state() {
        let mut nfa = Automaton::new();
        nfa.connect_empty(0, 7);
    }
}
