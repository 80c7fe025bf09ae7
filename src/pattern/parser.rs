// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F.

//! Recursive descent parser for gesture pattern strings.
//!
//! Parses patterns like `d1(m1*)u1` or `d1/^key-/(d2|m1+)` into a list of
//! [`Expression`] nodes that the automaton compiler consumes.

use std::fmt;

use thiserror::Error;

use crate::common::symbol::{ActionKind, SymbolKey};

/// Target pattern used when an action has no `/.../` part: any element.
pub const DEFAULT_TARGET: &str = ".*";

/// Deepest group nesting accepted by the parser.
pub const MAX_NESTING: usize = 128;

/// Largest number of automaton states a pattern may unroll to.
///
/// Repetition counts multiply through nesting, so `((d1{1000}){1000}){1000}`
/// is short but would expand to a billion states.
pub const MAX_STATES: u64 = 100_000;

/// Repetition bounds applied to an action or group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Modifier {
    /// Minimum number of repetitions.
    pub min: u32,
    /// Maximum number of repetitions, `None` if unbounded.
    pub max: Option<u32>,
}

impl Modifier {
    /// Exactly once; the implicit modifier.
    pub const ONCE: Self = Self::between(1, 1);
    /// `?`
    pub const OPTIONAL: Self = Self::between(0, 1);
    /// `*`
    pub const ZERO_OR_MORE: Self = Self {
        min: 0,
        max: None,
    };
    /// `+`
    pub const ONE_OR_MORE: Self = Self {
        min: 1,
        max: None,
    };

    /// `{min,max}`. Callers must ensure `min <= max`.
    #[must_use]
    pub const fn between(min: u32, max: u32) -> Self {
        debug_assert!(min <= max);
        Self {
            min,
            max: Some(max),
        }
    }

    /// `{n}`
    #[must_use]
    pub const fn exactly(n: u32) -> Self {
        Self::between(n, n)
    }

    /// Returns true if the maximum is unbounded.
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.max.is_none()
    }
}

impl Default for Modifier {
    fn default() -> Self {
        Self::ONCE
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (0, None) => write!(f, "*"),
            (1, None) => write!(f, "+"),
            // Not expressible in pattern syntax
            (min, None) => write!(f, "{{{min},}}"),
            (min, Some(max)) => write!(f, "{{{min},{max}}}"),
        }
    }
}

/// A single action: one touch phase on one local input, on a matching target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    /// Touch phase.
    pub kind: ActionKind,
    /// Gesture-local input id, `>= 1`.
    pub local_id: u32,
    /// Regular expression source matched (unanchored) against the target id.
    pub target: String,
    /// Repetition bounds.
    pub modifier: Modifier,
}

impl Action {
    /// Transition key this action compiles to.
    #[must_use]
    pub const fn key(&self) -> SymbolKey {
        SymbolKey::new(self.kind, self.local_id)
    }
}

/// A parenthesized sequence of expressions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Name used to tag compiled states; unnamed groups are numbered.
    pub name: Option<String>,
    /// Expressions matched in order.
    pub children: Vec<Expression>,
    /// Repetition bounds applied to the whole sequence.
    pub modifier: Modifier,
}

/// A node of the pattern syntax tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    /// `d1/target/{n,m}`
    Action(Action),
    /// `(...){n,m}`
    Group(Group),
    /// `a|b|c`: at least two alternatives, no modifier of its own.
    Options(Vec<Expression>),
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Action(action) => write!(
                f,
                "{}/{}/{}",
                action.key(),
                action.target,
                action.modifier
            ),
            Self::Group(group) => {
                write!(f, "(")?;
                for child in &group.children {
                    write!(f, "{child}")?;
                }
                write!(f, "){}", group.modifier)
            }
            Self::Options(options) => {
                for (i, option) in options.iter().enumerate() {
                    if i > 0 {
                        write!(f, "|")?;
                    }
                    write!(f, "{option}")?;
                }
                Ok(())
            }
        }
    }
}

impl Expression {
    /// Upper bound on the raw automaton states this expression unrolls to,
    /// or `None` on overflow.
    fn state_bound(&self) -> Option<u64> {
        match self {
            Self::Action(action) => Some(u64::from(copies(action.modifier)?)),
            Self::Group(group) => {
                let pass = group.children.iter().try_fold(1u64, |acc, child| {
                    acc.checked_add(child.state_bound()?)?.checked_add(1)
                })?;
                pass.checked_mul(u64::from(copies(group.modifier)?))?
                    .checked_add(1)
            }
            Self::Options(options) => options
                .iter()
                .try_fold(0u64, |acc, option| acc.checked_add(option.state_bound()?)),
        }
    }
}

/// Copies made when unrolling `modifier`: one per allowed repetition, plus
/// the looping copy when unbounded.
fn copies(modifier: Modifier) -> Option<u32> {
    match modifier.max {
        Some(max) => Some(max.max(1)),
        None => modifier.min.checked_add(1),
    }
}

/// Reason a pattern was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum PatternErrorKind {
    /// An action started with something other than `d`, `m` or `u`.
    #[error("expected action kind 'd', 'm' or 'u', got '{0}'")]
    InvalidActionKind(char),
    /// The pattern ended where an action or group was required.
    #[error("expected action or group, got end of pattern")]
    UnexpectedEnd,
    /// An action kind was not followed by digits.
    #[error("expected local input id after action kind")]
    MissingLocalId,
    /// An action referred to local input `0`.
    #[error("local input id must be >= 1")]
    ZeroLocalId,
    /// A number did not fit in 32 bits.
    #[error("number overflow in pattern")]
    NumberOverflow,
    /// A `/` opening a target pattern was never closed.
    #[error("unterminated target pattern, expected closing '/'")]
    UnterminatedTarget,
    /// A `(` was never closed.
    #[error("unclosed group, expected ')'")]
    UnclosedGroup,
    /// A `)` appeared outside of any group.
    #[error("unexpected ')' without matching '('")]
    UnmatchedClose,
    /// A specific character was required.
    #[error("expected '{0}'")]
    Expected(char),
    /// A `{...}` modifier was not of the form `{n}` or `{n,m}`.
    #[error("malformed repetition modifier: {0}")]
    MalformedModifier(&'static str),
    /// A `{n,m}` modifier with `n > m`.
    #[error("repetition minimum {min} exceeds maximum {max}")]
    InvertedBounds {
        /// Parsed minimum.
        min: u32,
        /// Parsed maximum.
        max: u32,
    },
    /// Groups nested deeper than [`MAX_NESTING`].
    #[error("groups nested deeper than {}", MAX_NESTING)]
    NestingTooDeep,
    /// Repetitions unroll to more than [`MAX_STATES`] states.
    #[error("pattern expands to more than {} states", MAX_STATES)]
    TooManyStates,
}

/// Error returned when pattern parsing fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("pattern error at position {position}: {kind}")]
#[non_exhaustive]
pub struct PatternError {
    /// What went wrong.
    pub kind: PatternErrorKind,
    /// Byte offset in the input where the error occurred.
    pub position: usize,
}

/// Parses a gesture pattern into its top-level expressions.
///
/// An empty pattern parses to an empty list.
///
/// # Errors
///
/// Returns [`PatternError`] if the pattern is malformed, nests groups deeper
/// than [`MAX_NESTING`] or unrolls to more than [`MAX_STATES`] states. No
/// partial result is produced; the whole pattern must be rejected.
///
/// # Examples
///
/// ```
/// use gestures::pattern::parser::{parse_gesture, Expression};
///
/// let expressions = parse_gesture("d1(m1*)u1").unwrap();
/// assert_eq!(expressions.len(), 3);
/// assert!(matches!(expressions[1], Expression::Group(_)));
/// ```
pub fn parse_gesture(input: &str) -> Result<Vec<Expression>, PatternError> {
    Parser::new(input).parse()
}

struct Parser<'a> {
    text: &'a str,
    input: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    const fn new(text: &'a str) -> Self {
        Self {
            text,
            input: text.as_bytes(),
            pos: 0,
            depth: 0,
        }
    }

    fn parse(&mut self) -> Result<Vec<Expression>, PatternError> {
        let mut expressions = Vec::new();
        // Start state, end state and the top group's own start
        let mut states: u64 = 3;
        while let Some(c) = self.peek() {
            if c == b')' {
                return self.error(PatternErrorKind::UnmatchedClose);
            }
            let start = self.pos;
            let expression = self.parse_expression()?;
            states = expression
                .state_bound()
                .and_then(|n| states.checked_add(n)?.checked_add(1))
                .filter(|&n| n <= MAX_STATES)
                .ok_or(PatternError {
                    kind: PatternErrorKind::TooManyStates,
                    position: start,
                })?;
            expressions.push(expression);
        }
        Ok(expressions)
    }

    /// Parses a group or action, or a `|`-separated list of them.
    fn parse_expression(&mut self) -> Result<Expression, PatternError> {
        let mut options = vec![self.parse_group_or_action()?];
        while self.peek() == Some(b'|') {
            self.advance();
            options.push(self.parse_group_or_action()?);
        }
        if options.len() == 1 {
            Ok(options.remove(0))
        } else {
            Ok(Expression::Options(options))
        }
    }

    fn parse_group_or_action(&mut self) -> Result<Expression, PatternError> {
        match self.peek() {
            Some(b'(') => self.parse_group(),
            Some(_) => self.parse_action(),
            None => self.error(PatternErrorKind::UnexpectedEnd),
        }
    }

    fn parse_group(&mut self) -> Result<Expression, PatternError> {
        let open = self.pos;
        self.expect(b'(')?;
        if self.depth == MAX_NESTING {
            return Err(PatternError {
                kind: PatternErrorKind::NestingTooDeep,
                position: open,
            });
        }
        self.depth += 1;
        let mut children = Vec::new();
        loop {
            match self.peek() {
                Some(b')') => {
                    self.advance();
                    break;
                }
                Some(_) => children.push(self.parse_expression()?),
                None => {
                    return Err(PatternError {
                        kind: PatternErrorKind::UnclosedGroup,
                        position: open,
                    })
                }
            }
        }
        self.depth -= 1;
        let modifier = self.parse_modifier()?;
        Ok(Expression::Group(Group {
            name: None,
            children,
            modifier,
        }))
    }

    fn parse_action(&mut self) -> Result<Expression, PatternError> {
        let kind = match self.peek() {
            Some(c) => match ActionKind::from_pattern_char(c) {
                Some(kind) => kind,
                None => return self.error(PatternErrorKind::InvalidActionKind(char::from(c))),
            },
            None => return self.error(PatternErrorKind::UnexpectedEnd),
        };
        self.advance();

        let id_start = self.pos;
        let local_id = match self.parse_number()? {
            Some(0) => {
                return Err(PatternError {
                    kind: PatternErrorKind::ZeroLocalId,
                    position: id_start,
                })
            }
            Some(id) => id,
            None => return self.error(PatternErrorKind::MissingLocalId),
        };

        let target = if self.peek() == Some(b'/') {
            self.parse_target()?
        } else {
            DEFAULT_TARGET.to_string()
        };
        let modifier = self.parse_modifier()?;

        Ok(Expression::Action(Action {
            kind,
            local_id,
            target,
            modifier,
        }))
    }

    /// Parses `/.../`, returning the raw text between the slashes.
    ///
    /// A `/` preceded by an odd number of consecutive backslashes is escaped
    /// and belongs to the target. Escapes are kept verbatim for the regex.
    fn parse_target(&mut self) -> Result<String, PatternError> {
        let open = self.pos;
        self.expect(b'/')?;
        let start = self.pos;
        let mut backslashes = 0usize;
        loop {
            match self.peek() {
                Some(b'\\') => backslashes += 1,
                Some(b'/') if backslashes % 2 == 0 => break,
                Some(_) => backslashes = 0,
                None => {
                    return Err(PatternError {
                        kind: PatternErrorKind::UnterminatedTarget,
                        position: open,
                    })
                }
            }
            self.advance();
        }
        // Both ends sit on ASCII bytes, so these are char boundaries.
        let target = self.text[start..self.pos].to_string();
        self.advance();
        Ok(target)
    }

    /// Parses an optional modifier. Anything that does not start a modifier
    /// (including end of input) is the implicit `{1,1}` and is not consumed.
    fn parse_modifier(&mut self) -> Result<Modifier, PatternError> {
        let modifier = match self.peek() {
            Some(b'+') => Modifier::ONE_OR_MORE,
            Some(b'*') => Modifier::ZERO_OR_MORE,
            Some(b'?') => Modifier::OPTIONAL,
            Some(b'{') => return self.parse_bounds(),
            _ => return Ok(Modifier::ONCE),
        };
        self.advance();
        Ok(modifier)
    }

    fn parse_bounds(&mut self) -> Result<Modifier, PatternError> {
        let start = self.pos;
        self.expect(b'{')?;
        let Some(min) = self.parse_number()? else {
            return self.error(PatternErrorKind::MalformedModifier(
                "expected unsigned integer",
            ));
        };
        match self.peek() {
            Some(b'}') => {
                self.advance();
                Ok(Modifier::exactly(min))
            }
            Some(b',') => {
                self.advance();
                let Some(max) = self.parse_number()? else {
                    return self.error(PatternErrorKind::MalformedModifier(
                        "expected unsigned integer",
                    ));
                };
                if self.peek() != Some(b'}') {
                    return self.error(PatternErrorKind::MalformedModifier("expected '}'"));
                }
                self.advance();
                if min > max {
                    return Err(PatternError {
                        kind: PatternErrorKind::InvertedBounds { min, max },
                        position: start,
                    });
                }
                Ok(Modifier::between(min, max))
            }
            _ => self.error(PatternErrorKind::MalformedModifier("expected ',' or '}'")),
        }
    }

    /// Parses a run of ASCII digits. Returns `None` if there is none.
    fn parse_number(&mut self) -> Result<Option<u32>, PatternError> {
        let start = self.pos;
        let mut num: u32 = 0;
        let mut digits = 0;
        while let Some(c) = self.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            num = num
                .checked_mul(10)
                .and_then(|n| n.checked_add(u32::from(c - b'0')))
                .ok_or(PatternError {
                    kind: PatternErrorKind::NumberOverflow,
                    position: start,
                })?;
            digits += 1;
            self.advance();
        }
        Ok((digits > 0).then_some(num))
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn expect(&mut self, expected: u8) -> Result<(), PatternError> {
        if self.peek() == Some(expected) {
            self.advance();
            Ok(())
        } else {
            self.error(PatternErrorKind::Expected(char::from(expected)))
        }
    }

    fn error<T>(&self, kind: PatternErrorKind) -> Result<T, PatternError> {
        Err(PatternError {
            kind,
            position: self.pos,
        })
    }
}
