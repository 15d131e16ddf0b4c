use std::fmt;
use std::iter::Peekable;
use std::ops::Range;
use std::str::CharIndices;

use crate::{GrammarError, GrammarErrorKind, ParseResult};

/// The deepest group nesting a `Tokenizer` accepts unless told otherwise.
pub const DEFAULT_NEST_LIMIT: u32 = 250;

/// The syntactic category of one unit of pattern text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    GroupOpen,
    GroupClose,
    RepeatZeroOrOne,
    RepeatZeroOrMore,
    RepeatOneOrMore,
    Alternator,
    /// Consumed while tokenizing, never part of a `TokenStream`.
    Escape,
    Literal,
    /// Consumed while tokenizing, never part of a `TokenStream`.
    Whitespace,
}

impl TokenKind {
    const COUNT: usize = 9;

    /// Maps a pattern unit to its kind. While an escape is active every unit
    /// is a literal.
    pub fn classify(unit: char, escape_active: bool) -> TokenKind {
        if escape_active {
            return TokenKind::Literal;
        }
        match unit {
            '(' => TokenKind::GroupOpen,
            ')' => TokenKind::GroupClose,
            '?' => TokenKind::RepeatZeroOrOne,
            '*' => TokenKind::RepeatZeroOrMore,
            '+' => TokenKind::RepeatOneOrMore,
            '|' => TokenKind::Alternator,
            '\\' => TokenKind::Escape,
            c if c.is_ascii_whitespace() => TokenKind::Whitespace,
            _ => TokenKind::Literal,
        }
    }

    pub fn is_repetition(self) -> bool {
        matches!(
            self,
            TokenKind::RepeatZeroOrOne | TokenKind::RepeatZeroOrMore | TokenKind::RepeatOneOrMore
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            TokenKind::GroupOpen => "Group::open",
            TokenKind::GroupClose => "Group::close",
            TokenKind::RepeatZeroOrOne => "Repeat::zero_or_one",
            TokenKind::RepeatZeroOrMore => "Repeat::zero_or_more",
            TokenKind::RepeatOneOrMore => "Repeat::one_or_more",
            TokenKind::Alternator => "Alternator",
            TokenKind::Escape => "Escape",
            TokenKind::Literal => "Literal",
            TokenKind::Whitespace => "Whitespace",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `GRAMMAR_BLOCKLIST[previous][current]` is set when a token of kind
/// `current` may not directly follow one of kind `previous`. The first token
/// of a pattern is checked against a virtual `GroupOpen`, so the rules for
/// the start of a pattern are the rules just inside a group.
const GRAMMAR_BLOCKLIST: [[bool; TokenKind::COUNT]; TokenKind::COUNT] = grammar_blocklist();

const fn grammar_blocklist() -> [[bool; TokenKind::COUNT]; TokenKind::COUNT] {
    use TokenKind::*;

    let mut table = [[false; TokenKind::COUNT]; TokenKind::COUNT];
    let repetitions = [RepeatZeroOrOne, RepeatZeroOrMore, RepeatOneOrMore];

    table[GroupOpen as usize][GroupClose as usize] = true;
    table[GroupOpen as usize][Alternator as usize] = true;
    table[Alternator as usize][GroupClose as usize] = true;
    table[Alternator as usize][Alternator as usize] = true;

    let mut i = 0;
    while i < repetitions.len() {
        let rep = repetitions[i] as usize;
        table[GroupOpen as usize][rep] = true;
        table[Alternator as usize][rep] = true;
        let mut j = 0;
        while j < repetitions.len() {
            table[rep][repetitions[j] as usize] = true;
            j += 1;
        }
        i += 1;
    }
    table
}

/// Whether a token of kind `current` may directly follow one of kind
/// `previous`.
pub fn is_allowed(previous: TokenKind, current: TokenKind) -> bool {
    !GRAMMAR_BLOCKLIST[previous as usize][current as usize]
}

/// One accepted token. Its `span` indexes the cleaned pattern bytes of the
/// `TokenStream` that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    kind: TokenKind,
    span: Range<usize>,
}

impl Token {
    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn span(&self) -> Range<usize> {
        self.span.clone()
    }
}

/// A validated token sequence together with the cleaned pattern bytes.
///
/// Whitespace and escape markers are gone from both, and escapes are
/// resolved to the bytes they stand for. Tokens cover the cleaned bytes
/// contiguously and in order, so a run of adjacent literal tokens always
/// maps to one contiguous slice of `cleaned`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenStream {
    tokens: Vec<Token>,
    cleaned: Vec<u8>,
}

impl TokenStream {
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn cleaned(&self) -> &[u8] {
        &self.cleaned
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn kind(&self, index: usize) -> Option<TokenKind> {
        self.tokens.get(index).map(Token::kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = TokenKind> + '_ {
        self.tokens.iter().map(Token::kind)
    }

    /// The cleaned bytes covered by the tokens in `range`.
    pub fn bytes(&self, range: Range<usize>) -> &[u8] {
        let tokens = &self.tokens[range];
        match (tokens.first(), tokens.last()) {
            (Some(first), Some(last)) => &self.cleaned[first.span.start..last.span.end],
            _ => &[],
        }
    }
}

/// Converts pattern text into a `TokenStream`, rejecting every pattern the
/// adjacency grammar does not allow before any automaton is built.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    nest_limit: u32,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            nest_limit: DEFAULT_NEST_LIMIT,
        }
    }

    /// Sets the deepest group nesting that is accepted.
    pub fn nest_limit(mut self, limit: u32) -> Self {
        self.nest_limit = limit;
        self
    }

    pub fn tokenize(&self, pattern: &str) -> ParseResult<TokenStream> {
        let mut state = TokenizerState::new(pattern.len());
        let mut units = pattern.char_indices().peekable();

        while let Some((offset, unit)) = units.next() {
            let current = TokenKind::classify(unit, state.escape_active);
            if current == TokenKind::Whitespace {
                continue;
            }

            let previous = state.previous();
            if current == TokenKind::GroupClose && state.open_groups == 0 {
                return Err(GrammarError::new(GrammarErrorKind::UnmatchedClose, offset));
            }
            if !is_allowed(previous, current) {
                return Err(GrammarError::new(
                    GrammarErrorKind::ForbiddenAdjacency { previous, current },
                    offset,
                ));
            }

            match current {
                TokenKind::Escape => {
                    state.escape_active = true;
                    state.escape_offset = offset;
                    continue;
                }
                TokenKind::GroupOpen => {
                    state.open_groups += 1;
                    if state.open_groups > self.nest_limit {
                        return Err(GrammarError::new(
                            GrammarErrorKind::NestLimitExceeded {
                                limit: self.nest_limit,
                            },
                            offset,
                        ));
                    }
                }
                TokenKind::GroupClose => state.open_groups -= 1,
                _ => {}
            }

            if state.escape_active {
                state.escape_active = false;
                let escape_offset = state.escape_offset;
                unescape(unit, &mut units, &mut state.cleaned)
                    .ok_or_else(|| GrammarError::new(GrammarErrorKind::InvalidUnicodeEscape, escape_offset))?;
                state.seal(current);
            } else {
                let mut buf = [0; 4];
                state
                    .cleaned
                    .extend_from_slice(unit.encode_utf8(&mut buf).as_bytes());
                state.seal(current);
            }
        }

        state.finish(pattern.len())
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Tokenizes `pattern` with the default configuration.
pub fn tokenize(pattern: &str) -> ParseResult<TokenStream> {
    Tokenizer::new().tokenize(pattern)
}

struct TokenizerState {
    tokens: Vec<Token>,
    cleaned: Vec<u8>,
    // Start of the token currently being written into `cleaned`.
    token_start: usize,
    escape_active: bool,
    escape_offset: usize,
    open_groups: u32,
}

impl TokenizerState {
    fn new(capacity: usize) -> Self {
        Self {
            tokens: Vec::with_capacity(capacity),
            cleaned: Vec::with_capacity(capacity),
            token_start: 0,
            escape_active: false,
            escape_offset: 0,
            open_groups: 0,
        }
    }

    fn previous(&self) -> TokenKind {
        self.tokens
            .last()
            .map_or(TokenKind::GroupOpen, Token::kind)
    }

    /// Records a token covering everything appended to `cleaned` since the
    /// previous token.
    fn seal(&mut self, kind: TokenKind) {
        let end = self.cleaned.len();
        self.tokens.push(Token {
            kind,
            span: self.token_start..end,
        });
        self.token_start = end;
    }

    fn finish(self, pattern_len: usize) -> ParseResult<TokenStream> {
        if self.escape_active {
            return Err(GrammarError::new(GrammarErrorKind::DanglingEscape, self.escape_offset));
        }
        if self.open_groups != 0 {
            return Err(GrammarError::new(
                GrammarErrorKind::UnclosedGroup {
                    open: self.open_groups,
                },
                pattern_len,
            ));
        }
        match self.tokens.last().map(Token::kind) {
            None => return Err(GrammarError::new(GrammarErrorKind::EmptyPattern, pattern_len)),
            Some(TokenKind::Alternator) => {
                return Err(GrammarError::new(GrammarErrorKind::TrailingAlternator, pattern_len))
            }
            Some(_) => {}
        }

        log!(log::debug!(
            "cleaned pattern: {:?}",
            String::from_utf8_lossy(&self.cleaned)
        ));
        log!(log::trace!(
            "tokens: {:?}",
            self.tokens.iter().map(Token::kind).collect::<Vec<_>>()
        ));

        Ok(TokenStream {
            tokens: self.tokens,
            cleaned: self.cleaned,
        })
    }
}

/// Appends the bytes an escaped `unit` stands for. Returns `None` for a
/// malformed `\u{...}` sequence.
fn unescape(unit: char, rest: &mut Peekable<CharIndices<'_>>, out: &mut Vec<u8>) -> Option<()> {
    let reserved = match unit {
        '0' => Some(b'\0'),
        'a' => Some(0x07),
        'b' => Some(0x08),
        't' => Some(b'\t'),
        'n' => Some(b'\n'),
        'v' => Some(0x0b),
        'f' => Some(0x0c),
        'r' => Some(b'\r'),
        _ => None,
    };
    if let Some(byte) = reserved {
        out.push(byte);
        return Some(());
    }

    let mut buf = [0; 4];
    if unit == 'u' && rest.peek().map(|&(_, c)| c) == Some('{') {
        rest.next();
        let mut digits = String::new();
        loop {
            match rest.next() {
                Some((_, '}')) => break,
                Some((_, c)) if c.is_ascii_hexdigit() && digits.len() < 6 => digits.push(c),
                _ => return None,
            }
        }
        let scalar = u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32)?;
        out.extend_from_slice(scalar.encode_utf8(&mut buf).as_bytes());
        return Some(());
    }

    out.extend_from_slice(unit.encode_utf8(&mut buf).as_bytes());
    Some(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(pattern: &str) -> Vec<TokenKind> {
        tokenize(pattern).unwrap().kinds().collect()
    }

    fn error_kind(pattern: &str) -> GrammarErrorKind {
        tokenize(pattern).unwrap_err().kind().clone()
    }

    #[test]
    fn test_tokenize_simple() {
        use TokenKind::*;

        assert_eq!(
            kinds("ab*(c|d)+"),
            vec![
                Literal,
                Literal,
                RepeatZeroOrMore,
                GroupOpen,
                Literal,
                Alternator,
                Literal,
                GroupClose,
                RepeatOneOrMore,
            ]
        );
    }

    #[test]
    fn test_whitespace_is_dropped() {
        let stream = tokenize(" a b\t(c )\n").unwrap();
        assert_eq!(stream.cleaned(), b"ab(c)");
        assert!(stream.kinds().all(|k| k != TokenKind::Whitespace));
        // Whitespace must not hide an empty group from the grammar.
        assert_eq!(
            error_kind("( )"),
            GrammarErrorKind::ForbiddenAdjacency {
                previous: TokenKind::GroupOpen,
                current: TokenKind::GroupClose,
            }
        );
    }

    #[test]
    fn test_escapes() {
        let stream = tokenize(r"\(\*\ \\").unwrap();
        assert_eq!(stream.cleaned(), b"(* \\");
        assert!(stream.kinds().all(|k| k == TokenKind::Literal));
        assert_eq!(stream.len(), 4);

        let stream = tokenize(r"a\tb\nc\0").unwrap();
        assert_eq!(stream.cleaned(), b"a\tb\nc\0");

        // Unknown sequences keep the escaped unit itself.
        let stream = tokenize(r"\q\.").unwrap();
        assert_eq!(stream.cleaned(), b"q.");
    }

    #[test]
    fn test_unicode_escape() {
        let stream = tokenize(r"x\u{e9}+").unwrap();
        assert_eq!(stream.cleaned(), "xé+".as_bytes());
        assert_eq!(stream.tokens()[1].span(), 1..3);
        assert_eq!(stream.kind(2), Some(TokenKind::RepeatOneOrMore));

        // Without a brace it is just an escaped 'u'.
        assert_eq!(tokenize(r"\u").unwrap().cleaned(), b"u");

        assert_eq!(error_kind(r"\u{}"), GrammarErrorKind::InvalidUnicodeEscape);
        assert_eq!(error_kind(r"\u{d800}"), GrammarErrorKind::InvalidUnicodeEscape);
        assert_eq!(error_kind(r"\u{1234567}"), GrammarErrorKind::InvalidUnicodeEscape);
        assert_eq!(error_kind(r"\u{12"), GrammarErrorKind::InvalidUnicodeEscape);
    }

    #[test]
    fn test_multibyte_units() {
        let stream = tokenize("ñé*").unwrap();
        assert_eq!(stream.len(), 3);
        assert_eq!(stream.tokens()[1].span(), 2..4);
        assert_eq!(stream.bytes(0..2), "ñé".as_bytes());
    }

    #[test]
    fn test_rejections() {
        use GrammarErrorKind::*;
        use TokenKind::*;

        assert_eq!(error_kind("(a"), UnclosedGroup { open: 1 });
        assert_eq!(error_kind(")"), UnmatchedClose);
        assert_eq!(error_kind("a)"), UnmatchedClose);
        assert_eq!(error_kind("a|"), TrailingAlternator);
        assert_eq!(error_kind("a\\"), DanglingEscape);
        assert_eq!(error_kind(""), EmptyPattern);
        assert_eq!(error_kind("  "), EmptyPattern);
        assert_eq!(
            error_kind("a**"),
            ForbiddenAdjacency {
                previous: RepeatZeroOrMore,
                current: RepeatZeroOrMore,
            }
        );
        assert_eq!(
            error_kind("*a"),
            ForbiddenAdjacency {
                previous: GroupOpen,
                current: RepeatZeroOrMore,
            }
        );
        assert_eq!(
            error_kind("a|+"),
            ForbiddenAdjacency {
                previous: Alternator,
                current: RepeatOneOrMore,
            }
        );
        assert_eq!(
            error_kind("(a|)"),
            ForbiddenAdjacency {
                previous: Alternator,
                current: GroupClose,
            }
        );
        assert_eq!(
            error_kind("a||b"),
            ForbiddenAdjacency {
                previous: Alternator,
                current: Alternator,
            }
        );
        assert_eq!(
            error_kind("(?)"),
            ForbiddenAdjacency {
                previous: GroupOpen,
                current: RepeatZeroOrOne,
            }
        );
    }

    #[test]
    fn test_error_offsets() {
        assert_eq!(tokenize("ab**").unwrap_err().offset(), 3);
        assert_eq!(tokenize("é)").unwrap_err().offset(), 2);
        assert_eq!(tokenize("(ab").unwrap_err().offset(), 3);
        assert_eq!(tokenize(r"ab\").unwrap_err().offset(), 2);
    }

    #[test]
    fn test_nest_limit() {
        let tokenizer = Tokenizer::new().nest_limit(2);
        assert!(tokenizer.tokenize("((a))").is_ok());
        assert_eq!(
            tokenizer.tokenize("(((a)))").unwrap_err().kind(),
            &GrammarErrorKind::NestLimitExceeded { limit: 2 }
        );
    }

    #[test]
    fn test_grammar_table() {
        use TokenKind::*;

        assert!(is_allowed(GroupClose, RepeatZeroOrMore));
        assert!(is_allowed(Literal, Alternator));
        assert!(is_allowed(RepeatOneOrMore, GroupClose));
        assert!(!is_allowed(RepeatZeroOrOne, RepeatOneOrMore));
        assert!(!is_allowed(GroupOpen, GroupClose));
    }
}
