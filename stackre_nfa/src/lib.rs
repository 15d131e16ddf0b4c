//! Stack-driven Thompson NFA construction for a small regex dialect
//!
//! The dialect has literals, groups `( )`, alternation `|` and the
//! repetition operators `?`, `*` and `+`. A backslash makes the next unit
//! literal, ASCII whitespace is ignored unless escaped.
//!
//! Matching runs through four stages, each consuming the output of the one
//! before:
//!
//! 1. [`parser::Tokenizer`] validates the pattern against an adjacency
//!    grammar and produces a cleaned [`parser::TokenStream`].
//! 2. [`compiler::Compiler`] turns the tokens into an [`nfa::Automaton`] in a
//!    single pass, without building a syntax tree.
//! 3. [`nfa::Automaton::compact`] flattens the automaton into the
//!    index-addressed [`nfa::CompactAutomaton`].
//! 4. [`matcher::Matcher`] reports every `(offset, length)` pair the
//!    automaton accepts, starting from each character boundary of the text.
//!
//! ```
//! use stackre_nfa::compile_and_match;
//!
//! let matches = compile_and_match("ab+c", "xabbcy").unwrap();
//! assert_eq!(matches.len(), 1);
//! assert_eq!((matches[0].offset, matches[0].length), (1, 4));
//! ```

// Forwards to the `log` crate when the `logging` feature is enabled and
// expands to nothing otherwise. Must stay above the module declarations.
macro_rules! log {
    ($($tt:tt)*) => {
        #[cfg(feature = "logging")]
        {
            $($tt)*
        }
    }
}

pub mod compiler;
pub mod matcher;
pub mod nfa;
pub mod parser;
pub mod stack;

pub use compiler::Compiler;
pub use matcher::{Match, Matcher};
pub use nfa::{Automaton, CompactAutomaton, StateId};
pub use parser::{TokenKind, TokenStream, Tokenizer};

use std::fmt;

/// The result of validating a pattern
pub type ParseResult<T> = Result<T, GrammarError>;

/// A pattern rejected by the tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarError {
    kind: GrammarErrorKind,
    offset: usize,
}

/// The reasons a pattern can be rejected
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GrammarErrorKind {
    /// `current` may not directly follow `previous`. At the start of a
    /// pattern `previous` is `GroupOpen`.
    ForbiddenAdjacency {
        previous: TokenKind,
        current: TokenKind,
    },
    /// A `)` with no open group
    UnmatchedClose,
    /// The pattern ended with `open` groups still open
    UnclosedGroup { open: u32 },
    /// The pattern ended right after a `\`
    DanglingEscape,
    /// The pattern ended with `|`, which leaves the last alternative empty
    TrailingAlternator,
    /// The pattern holds nothing but whitespace
    EmptyPattern,
    /// A `\u{...}` escape that is not 1 to 6 hex digits naming a Unicode
    /// scalar value
    InvalidUnicodeEscape,
    /// Groups nest deeper than the tokenizer allows
    NestLimitExceeded { limit: u32 },
}

impl GrammarError {
    pub fn new(kind: GrammarErrorKind, offset: usize) -> Self {
        Self { kind, offset }
    }

    pub fn kind(&self) -> &GrammarErrorKind {
        &self.kind
    }

    /// The byte offset into the raw pattern where the error was detected.
    /// Errors found at the end of the pattern point one past its last byte.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            GrammarErrorKind::ForbiddenAdjacency { previous, current } => write!(
                f,
                "{} may not follow {} (offset {})",
                current, previous, self.offset
            ),
            GrammarErrorKind::UnmatchedClose => {
                write!(f, "unmatched group close (offset {})", self.offset)
            }
            GrammarErrorKind::UnclosedGroup { open } => {
                write!(f, "{} group(s) left open at end of pattern", open)
            }
            GrammarErrorKind::DanglingEscape => {
                write!(f, "escape at offset {} has nothing to escape", self.offset)
            }
            GrammarErrorKind::TrailingAlternator => {
                write!(f, "alternation at end of pattern has no right-hand side")
            }
            GrammarErrorKind::EmptyPattern => write!(f, "empty pattern"),
            GrammarErrorKind::InvalidUnicodeEscape => {
                write!(f, "invalid unicode escape (offset {})", self.offset)
            }
            GrammarErrorKind::NestLimitExceeded { limit } => write!(
                f,
                "groups nest deeper than the limit of {} (offset {})",
                limit, self.offset
            ),
        }
    }
}

impl std::error::Error for GrammarError {}

/// Tokenizes and validates `pattern` with the default configuration.
pub fn tokenize(pattern: &str) -> ParseResult<TokenStream> {
    parser::tokenize(pattern)
}

/// Builds the automaton for a validated token stream.
pub fn generate(tokens: TokenStream) -> Automaton {
    Compiler::new().compile(tokens)
}

/// Flattens `automaton` into its matching form.
pub fn compact(automaton: Automaton) -> CompactAutomaton {
    automaton.compact()
}

/// Runs the whole pipeline up to the compact automaton.
pub fn compile(pattern: &str) -> ParseResult<CompactAutomaton> {
    Ok(compact(generate(tokenize(pattern)?)))
}

/// Finds every match of `pattern` in `text`. Only grammar errors are
/// reported; a valid pattern always produces a (possibly empty) list.
pub fn compile_and_match(pattern: &str, text: &str) -> ParseResult<Vec<Match>> {
    let nfa = compile(pattern)?;
    Ok(matcher::find_all(text, &nfa))
}
