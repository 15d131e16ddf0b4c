/*!
This crate compiles a small regular expression dialect into a Thompson NFA
and reports every place the pattern matches in a text.

The dialect knows literals, groups `( )`, alternation `|` and the repetition
operators `?` (zero or one), `*` (zero or more) and `+` (one or more). A
backslash makes the following unit literal and decodes the usual control
escapes (`\n`, `\t`, `\0`, ...) as well as `\u{HEX}`. Unescaped ASCII
whitespace in a pattern is ignored.

# Example

```
use stackre::Regex;

let re = Regex::new("a(b|c)+d").unwrap();
let found: Vec<&str> = re
    .find_all("abd acbd ad")
    .iter()
    .map(|m| m.as_str("abd acbd ad"))
    .collect();
assert_eq!(found, vec!["abd", "acbd"]);
```

# Match policy

The search explores every path through the automaton, so the same
`(offset, length)` pair can be reached more than once and a single start
offset can produce matches of several lengths. By default all of them are
reported. [`RegexBuilder::match_policy`] selects a filtered view instead:

```
use stackre::{MatchPolicy, RegexBuilder};

let re = RegexBuilder::new("a|ab")
    .match_policy(MatchPolicy::Longest)
    .build()
    .unwrap();
let m = re.find_all("ab");
assert_eq!((m[0].offset, m[0].length), (0, 2));
assert_eq!(m.len(), 1);
```

# Crate features

* **logging** - Emits tokenizer, construction and search traces through the
  `log` crate. Enabled by default.
*/

#![deny(missing_docs)]

use std::fmt;

pub use stackre_nfa::{GrammarError, GrammarErrorKind, Match};

use stackre_nfa::{matcher::Matcher, parser::Tokenizer, CompactAutomaton};

/// An error that occurred while building a `Regex`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The pattern does not follow the grammar of the dialect.
    Grammar(GrammarError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Grammar(err) => write!(f, "regex parse error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Grammar(err) => Some(err),
        }
    }
}

impl From<GrammarError> for Error {
    fn from(err: GrammarError) -> Error {
        Error::Grammar(err)
    }
}

/// Which of the matches the search finds are handed to the caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Every match, in search order, including repeats of the same pair.
    #[default]
    All,
    /// Every distinct `(offset, length)` pair, sorted.
    Unique,
    /// The longest match at each start offset, sorted by offset.
    Longest,
}

impl MatchPolicy {
    fn apply(self, mut matches: Vec<Match>) -> Vec<Match> {
        match self {
            MatchPolicy::All => {}
            MatchPolicy::Unique => {
                matches.sort();
                matches.dedup();
            }
            MatchPolicy::Longest => {
                // Sorting puts the longest match of each offset last.
                matches.sort();
                matches.reverse();
                matches.dedup_by_key(|m| m.offset);
                matches.reverse();
            }
        }
        matches
    }
}

/// A compiled pattern.
#[derive(Clone, Debug)]
pub struct Regex {
    pattern: String,
    nfa: CompactAutomaton,
    policy: MatchPolicy,
}

impl Regex {
    /// Compiles `pattern` with the default configuration.
    pub fn new(pattern: &str) -> Result<Regex, Error> {
        RegexBuilder::new(pattern).build()
    }

    /// Returns a builder for configuring how `pattern` is compiled.
    pub fn builder(pattern: &str) -> RegexBuilder {
        RegexBuilder::new(pattern)
    }

    /// Returns every match in `haystack`, filtered by this regex's
    /// [`MatchPolicy`].
    pub fn find_all(&self, haystack: &str) -> Vec<Match> {
        let matches = Matcher::new(&self.nfa).find_all(haystack);
        self.policy.apply(matches)
    }

    /// Returns the leftmost match in `haystack`. Among the matches starting
    /// there, the longest one wins.
    pub fn find(&self, haystack: &str) -> Option<Match> {
        Matcher::new(&self.nfa).find(haystack)
    }

    /// Returns true if the pattern matches anywhere in `haystack`.
    pub fn is_match(&self, haystack: &str) -> bool {
        Matcher::new(&self.nfa).is_match(haystack)
    }

    /// Returns the pattern this regex was compiled from.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Returns the compiled automaton. Its `Display` output lists every
    /// state and transition.
    pub fn automaton(&self) -> &CompactAutomaton {
        &self.nfa
    }

    /// Returns the policy applied by [`Regex::find_all`].
    pub fn match_policy(&self) -> MatchPolicy {
        self.policy
    }
}

impl fmt::Display for Regex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Regex {
    type Err = Error;

    fn from_str(pattern: &str) -> Result<Regex, Error> {
        Regex::new(pattern)
    }
}

/// Configures and builds a [`Regex`].
#[derive(Clone, Debug)]
pub struct RegexBuilder {
    pattern: String,
    tokenizer: Tokenizer,
    policy: MatchPolicy,
}

impl RegexBuilder {
    /// Creates a builder with the default configuration for `pattern`.
    pub fn new(pattern: &str) -> RegexBuilder {
        RegexBuilder {
            pattern: pattern.to_string(),
            tokenizer: Tokenizer::new(),
            policy: MatchPolicy::default(),
        }
    }

    /// Sets how deeply groups may nest before the pattern is rejected.
    pub fn nest_limit(&mut self, limit: u32) -> &mut RegexBuilder {
        self.tokenizer = self.tokenizer.clone().nest_limit(limit);
        self
    }

    /// Sets which matches [`Regex::find_all`] reports.
    pub fn match_policy(&mut self, policy: MatchPolicy) -> &mut RegexBuilder {
        self.policy = policy;
        self
    }

    /// Compiles the pattern.
    pub fn build(&self) -> Result<Regex, Error> {
        let tokens = self.tokenizer.tokenize(&self.pattern)?;
        let nfa = stackre_nfa::compact(stackre_nfa::generate(tokens));
        Ok(Regex {
            pattern: self.pattern.clone(),
            nfa,
            policy: self.policy,
        })
    }
}

/// Finds every match of `pattern` in `text`, exactly as the search reaches
/// them.
pub fn compile_and_match(pattern: &str, text: &str) -> Result<Vec<Match>, Error> {
    Ok(Regex::new(pattern)?.find_all(text))
}
