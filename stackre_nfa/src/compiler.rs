use crate::{
    nfa::{Automaton, StateId},
    parser::{TokenKind, TokenStream},
    stack::Stack,
};

/// Compiler that turns a validated token stream into an `Automaton` in one
/// left-to-right pass.
///
/// No syntax tree is built. Three parallel stacks carry all the nesting
/// information instead:
///
/// * `path_starts`: the top is the state the next transition leaves from.
/// * `group_stops`: the top is the exit state of the innermost open group.
/// * `path_lengths`: the top counts the `path_starts` entries pushed at the
///   current nesting level since the level (or its latest alternative)
///   began.
///
/// Every repeatable operand occupies exactly two `path_starts` slots, an
/// anchor followed by the state the operand ends in. A single literal unit
/// gets a fresh anchor reached by epsilon, and a closed group collapses to
/// its entry and exit state. A repetition operator therefore always finds
/// its operand two slots down, and its skip and loop edges never touch a
/// state shared with a neighbouring operand or alternative.
///
/// The token stream must come from the tokenizer. Malformed input is a
/// logic error and panics.
pub struct Compiler {
    nfa: Automaton,
    path_starts: Stack<StateId>,
    group_stops: Stack<StateId>,
    path_lengths: Stack<usize>,
}

impl Compiler {
    /// Create a new compiler
    pub fn new() -> Self {
        let nfa = Automaton::new();
        Self {
            path_starts: Stack::with_bottom(nfa.initial()),
            group_stops: Stack::with_bottom(nfa.final_state()),
            path_lengths: Stack::with_bottom(0),
            nfa,
        }
    }

    /// Compile the token stream, consuming both the compiler and the tokens
    pub fn compile(mut self, tokens: TokenStream) -> Automaton {
        let mut idx = 0;
        while idx < tokens.len() {
            self.trace_stacks();
            let kind = tokens.tokens()[idx].kind();
            match kind {
                TokenKind::Literal => {
                    idx += self.compile_literal_run(&tokens, idx);
                    continue;
                }
                TokenKind::GroupOpen => self.compile_group_open(),
                TokenKind::GroupClose => self.compile_group_close(),
                TokenKind::Alternator => self.compile_alternator(),
                TokenKind::RepeatZeroOrOne
                | TokenKind::RepeatZeroOrMore
                | TokenKind::RepeatOneOrMore => {
                    let operand = idx.checked_sub(1).and_then(|i| tokens.kind(i));
                    self.compile_repetition(kind, operand);
                }
                TokenKind::Escape | TokenKind::Whitespace => {
                    panic!("{} token at index {} of a cleaned token stream", kind, idx)
                }
            }
            idx += 1;
        }

        // The whole pattern is one implicit group ending in the final state.
        if self.group_stops.len() != 1 {
            panic!("{} groups still open at the end of the token stream", self.group_stops.len() - 1);
        }
        self.nfa
            .connect_empty(self.path_starts.top(), self.group_stops.top());
        self.nfa
    }

    /// Emits the literal run starting at token `start` and returns how many
    /// tokens it covered.
    fn compile_literal_run(&mut self, tokens: &TokenStream, start: usize) -> usize {
        let mut end = start;
        while tokens.kind(end) == Some(TokenKind::Literal) {
            end += 1;
        }
        let repeated = tokens.kind(end).map_or(false, TokenKind::is_repetition);

        // The unit right before a repetition operator is its operand and
        // must stay a segment of its own.
        let len = end - start;
        if repeated && len > 1 {
            self.emit_literal(tokens.bytes(start..end - 1));
            return len - 1;
        }
        if repeated {
            let anchor = self.nfa.add_state();
            self.nfa.connect_empty(self.path_starts.top(), anchor);
            self.push_path(anchor);
        }
        self.emit_literal(tokens.bytes(start..end));
        len
    }

    fn emit_literal(&mut self, label: &[u8]) {
        let state = self.nfa.add_state();
        self.nfa.connect(self.path_starts.top(), state, label);
        self.push_path(state);
    }

    fn compile_group_open(&mut self) {
        let entry = self.nfa.add_state();
        let exit = self.nfa.add_state();
        self.nfa.connect_empty(self.path_starts.top(), entry);
        self.push_path(entry);
        self.group_stops.push(exit);
        self.path_lengths.push(0);
    }

    fn compile_group_close(&mut self) {
        if self.group_stops.len() < 2 {
            panic!("group close without an open group");
        }
        let exit = self.group_stops.pop();
        self.nfa.connect_empty(self.path_starts.top(), exit);

        // Collapse the group's inner path so that only its entry is left,
        // then continue from the exit.
        let inner = self.path_lengths.pop();
        self.path_starts.pop_n(inner);
        self.push_path(exit);
    }

    fn compile_alternator(&mut self) {
        self.nfa
            .connect_empty(self.path_starts.top(), self.group_stops.top());
        let emitted = self.path_lengths.top();
        self.path_starts.pop_n(emitted);
        self.path_lengths.replace_top(0);
    }

    fn compile_repetition(&mut self, kind: TokenKind, operand: Option<TokenKind>) {
        match operand {
            Some(TokenKind::Literal) | Some(TokenKind::GroupClose) => {}
            other => panic!("{} applied to {:?}, which is not a repeatable operand", kind, other),
        }
        if self.path_lengths.top() < 2 {
            panic!("{} has no operand at the current nesting level", kind);
        }

        let current = self.path_starts.top();
        let anchor = self.path_starts.back(2);
        match kind {
            TokenKind::RepeatZeroOrOne => self.nfa.connect_empty(anchor, current),
            TokenKind::RepeatOneOrMore => self.nfa.connect_empty(current, anchor),
            TokenKind::RepeatZeroOrMore => {
                self.nfa.connect_empty(anchor, current);
                self.nfa.connect_empty(current, anchor);
            }
            _ => unreachable!("{} is not a repetition operator", kind),
        }
    }

    fn push_path(&mut self, state: StateId) {
        self.path_starts.push(state);
        let emitted = self.path_lengths.top();
        self.path_lengths.replace_top(emitted + 1);
    }

    fn trace_stacks(&self) {
        log!(log::trace!(
            "path_starts={:?} group_stops={:?} path_lengths={:?}",
            self.path_starts.iter().collect::<Vec<_>>(),
            self.group_stops.iter().collect::<Vec<_>>(),
            self.path_lengths.iter().collect::<Vec<_>>()
        ));
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nfa::{State, Transition};
    use crate::parser::tokenize;

    fn compile(pattern: &str) -> Automaton {
        Compiler::new().compile(tokenize(pattern).unwrap())
    }

    fn edges(state: &State) -> Vec<(StateId, &str)> {
        state
            .transitions
            .iter()
            .map(|t: &Transition| (t.target, std::str::from_utf8(&t.label).unwrap()))
            .collect()
    }

    #[test]
    fn test_literal_run_is_one_transition() {
        let nfa = compile("abc");
        assert_eq!(nfa.state_count(), 3);
        assert_eq!(edges(nfa.state(0)), vec![(2, "abc")]);
        assert_eq!(edges(nfa.state(2)), vec![(1, "")]);
    }

    #[test]
    fn test_repetition_operand_is_split_off() {
        // z0 -a-> z2 -ε-> z3 -b-> z4 -c-> z5 -ε-> z1, loop z4 -ε-> z3
        let nfa = compile("ab+c");
        assert_eq!(nfa.state_count(), 6);
        assert_eq!(edges(nfa.state(0)), vec![(2, "a")]);
        assert_eq!(edges(nfa.state(2)), vec![(3, "")]);
        assert_eq!(edges(nfa.state(3)), vec![(4, "b")]);
        assert_eq!(edges(nfa.state(4)), vec![(3, ""), (5, "c")]);
        assert_eq!(edges(nfa.state(5)), vec![(1, "")]);
    }

    #[test]
    fn test_optional_and_star_edges() {
        let nfa = compile("a?");
        assert_eq!(edges(nfa.state(2)), vec![(3, "a"), (3, "")]);

        let nfa = compile("a*");
        assert_eq!(edges(nfa.state(2)), vec![(3, "a"), (3, "")]);
        assert_eq!(edges(nfa.state(3)), vec![(2, ""), (1, "")]);
    }

    #[test]
    fn test_alternation_restarts_from_level_entry() {
        let nfa = compile("a|ab");
        assert_eq!(edges(nfa.state(0)), vec![(2, "a"), (3, "ab")]);
        assert_eq!(edges(nfa.state(2)), vec![(1, "")]);
        assert_eq!(edges(nfa.state(3)), vec![(1, "")]);
    }

    #[test]
    fn test_group_repetition_uses_entry_and_exit() {
        // z2/z3 are the group's entry and exit.
        let nfa = compile("(a|b)*c");
        assert_eq!(edges(nfa.state(0)), vec![(2, "")]);
        assert_eq!(edges(nfa.state(2)), vec![(4, "a"), (5, "b"), (3, "")]);
        assert_eq!(edges(nfa.state(4)), vec![(3, "")]);
        assert_eq!(edges(nfa.state(5)), vec![(3, "")]);
        assert_eq!(edges(nfa.state(3)), vec![(2, ""), (6, "c")]);
        assert_eq!(edges(nfa.state(6)), vec![(1, "")]);
    }

    #[test]
    fn test_nested_groups() {
        let nfa = compile("(a(b)*c)");
        // Outer group z2/z3, inner group z5/z6.
        assert_eq!(edges(nfa.state(4)), vec![(5, "")]);
        assert_eq!(edges(nfa.state(5)), vec![(7, "b"), (6, "")]);
        assert_eq!(edges(nfa.state(6)), vec![(5, ""), (8, "c")]);
        assert_eq!(edges(nfa.state(8)), vec![(3, "")]);
        assert_eq!(edges(nfa.state(3)), vec![(1, "")]);
    }

    #[test]
    #[should_panic(expected = "not a repeatable operand")]
    fn test_unvalidated_stream_panics() {
        // The tokenizer never lets an alternator precede a repetition.
        let mut compiler = Compiler::new();
        compiler.compile_repetition(TokenKind::RepeatZeroOrMore, Some(TokenKind::Alternator));
    }
}
