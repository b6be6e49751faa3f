//! Pipeline spec strings.
//!
//! A spec is `key1[=value1]|key2[=value2]|...`. Tokens keep their order,
//! which is the order stages run in. `|` and `=` are reserved; there is no
//! escaping.
//!
//! ```
//! use daedalus_pipeline::PipelineSpec;
//!
//! let spec = PipelineSpec::parse("a=1| b = 2 |c");
//! let pairs: Vec<_> = spec.iter().map(|t| (t.key.as_str(), t.value.as_str())).collect();
//! assert_eq!(pairs, [("a", "1"), ("b", "2"), ("c", "")]);
//! ```

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Token standing for "the base spec" in an inheriting spec.
pub const ELLIPSIS: &str = "...";

/// One `key[=value]` token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    /// Stage kind, e.g. `req` or `auth`. Empty for an empty token.
    pub key: String,
    /// Stage configuration. Empty when no `=` was given.
    pub value: String,
}

impl Token {
    /// Creates a token.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    fn parse(raw: &str) -> Self {
        match raw.split_once('=') {
            Some((key, value)) => Self::new(key.trim(), value.trim()),
            None => Self::new(raw.trim(), ""),
        }
    }

    /// True for the `...` inheritance marker.
    pub fn is_ellipsis(&self) -> bool {
        self.key == ELLIPSIS && self.value.is_empty()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value.is_empty() {
            f.write_str(&self.key)
        } else {
            write!(f, "{}={}", self.key, self.value)
        }
    }
}

/// An ordered list of tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineSpec {
    tokens: Vec<Token>,
}

impl PipelineSpec {
    /// Parses a spec string. Never fails: malformed tokens surface at
    /// resolution time.
    ///
    /// An empty or all-whitespace string yields an empty spec.
    pub fn parse(spec: &str) -> Self {
        if spec.trim().is_empty() {
            return Self::default();
        }
        Self {
            tokens: spec.split('|').map(Token::parse).collect(),
        }
    }

    /// Builds a spec from tokens.
    pub fn from_tokens(tokens: impl IntoIterator<Item = Token>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
        }
    }

    /// The tokens in order.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Iterates over the tokens.
    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    /// Number of tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// True when there are no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// True if the spec contains a `...` token.
    pub fn inherits(&self) -> bool {
        self.tokens.iter().any(Token::is_ellipsis)
    }

    /// Merges this spec into `base`.
    ///
    /// An empty spec is `base`. Without `...` the spec stands alone.
    /// Otherwise a cursor walks `base`:
    ///
    /// - a token before any `...` is kept and advances the cursor by one,
    ///   never past the end of `base`;
    /// - a token right after `...` whose key occurs in `base` pulls in the
    ///   base tokens from the cursor up to that key, then replaces the base
    ///   token with itself; the cursor moves past it;
    /// - a token right after `...` whose key is not in `base` is appended;
    /// - a trailing `...` pulls in the rest of `base`.
    ///
    /// ```
    /// use daedalus_pipeline::PipelineSpec;
    ///
    /// let base = PipelineSpec::parse("req|auth=jwt|handle|rsp");
    /// let route = PipelineSpec::parse("...|handle|rsp=json@general");
    /// assert_eq!(route.inherit(&base).to_string(), "req|auth=jwt|handle|rsp=json@general");
    /// ```
    #[must_use]
    pub fn inherit(&self, base: &PipelineSpec) -> PipelineSpec {
        if self.is_empty() {
            return base.clone();
        }
        if !self.inherits() {
            return self.clone();
        }

        let mut merged = Vec::with_capacity(base.len() + self.len());
        let mut cursor = 0;
        let mut follow = false;
        for token in &self.tokens {
            if token.is_ellipsis() {
                follow = true;
                continue;
            }
            if follow {
                let found = base.tokens[cursor..]
                    .iter()
                    .position(|b| b.key == token.key)
                    .map(|offset| cursor + offset);
                if let Some(idx) = found {
                    merged.extend_from_slice(&base.tokens[cursor..idx]);
                    cursor = idx + 1;
                }
                merged.push(token.clone());
            } else {
                merged.push(token.clone());
                cursor = (cursor + 1).min(base.len());
            }
            follow = false;
        }
        if follow && cursor < base.len() {
            merged.extend_from_slice(&base.tokens[cursor..]);
        }
        PipelineSpec { tokens: merged }
    }
}

impl FromStr for PipelineSpec {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for PipelineSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            write!(f, "{token}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a PipelineSpec {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}
