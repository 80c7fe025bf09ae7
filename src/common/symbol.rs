// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F.

//! The symbol alphabet consumed by gesture automata.
//!
//! A driver reports raw [`TouchEvent`]s carrying an opaque, platform-stable
//! touch identifier. Each match instance rewrites that identifier into a small
//! instance-local id before building the [`Symbol`] it feeds its automaton, so
//! the same physical contact may be `1` in one instance and `2` in another.

use std::fmt;

/// Opaque identifier of a physical contact, stable for the contact's lifetime.
pub type TouchId = u64;

/// The phase of a touch contact an action matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActionKind {
    /// Contact begins (`d`).
    Press,
    /// Contact moves (`m`).
    Move,
    /// Contact ends (`u`).
    Release,
}

impl ActionKind {
    /// Parses the single-character kind used in gesture patterns.
    #[must_use]
    pub const fn from_pattern_char(c: u8) -> Option<Self> {
        match c {
            b'd' => Some(Self::Press),
            b'm' => Some(Self::Move),
            b'u' => Some(Self::Release),
            _ => None,
        }
    }

    /// Returns the character this kind is written as in a pattern.
    #[must_use]
    pub const fn pattern_char(self) -> char {
        match self {
            Self::Press => 'd',
            Self::Move => 'm',
            Self::Release => 'u',
        }
    }

    /// Maps a DOM-style touch event type to an action kind.
    ///
    /// Cancelled and departed contacts are reported as releases. Returns `None`
    /// for event types that carry no touch phase.
    #[must_use]
    pub fn from_touch_event_type(event_type: &str) -> Option<Self> {
        match event_type {
            "touchstart" => Some(Self::Press),
            "touchmove" => Some(Self::Move),
            "touchend" | "touchcancel" | "touchleave" => Some(Self::Release),
            _ => None,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pattern_char())
    }
}

/// Transition-table key: an action kind on an instance-local input slot.
///
/// Displays as it is written in a pattern, e.g. `d1` or `m2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolKey {
    /// Touch phase.
    pub kind: ActionKind,
    /// Instance-local input slot, always `>= 1`.
    pub local_id: u32,
}

impl SymbolKey {
    /// Creates a key for `kind` on local slot `local_id`.
    #[must_use]
    pub const fn new(kind: ActionKind, local_id: u32) -> Self {
        Self { kind, local_id }
    }
}

impl fmt::Display for SymbolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind, self.local_id)
    }
}

/// One observed event, reduced to what an automaton transition looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol<'a> {
    /// Kind and instance-local slot.
    pub key: SymbolKey,
    /// Identifier of the element under the contact.
    pub target: &'a str,
}

impl<'a> Symbol<'a> {
    /// Creates a symbol.
    #[must_use]
    pub const fn new(kind: ActionKind, local_id: u32, target: &'a str) -> Self {
        Self {
            key: SymbolKey::new(kind, local_id),
            target,
        }
    }
}

/// A raw event as reported by the driver collaborator.
///
/// The driver is responsible for choosing `kind` from its platform event type
/// and for resolving `target` (e.g. by hit-testing the contact position).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TouchEvent {
    /// Touch phase.
    pub kind: ActionKind,
    /// Platform identifier of the contact.
    pub touch_id: TouchId,
    /// Identifier of the element under or owning the contact.
    pub target: String,
}

impl TouchEvent {
    /// Creates a touch event.
    #[must_use]
    pub fn new(kind: ActionKind, touch_id: TouchId, target: impl Into<String>) -> Self {
        Self {
            kind,
            touch_id,
            target: target.into(),
        }
    }

    /// Shorthand for a [`ActionKind::Press`] event.
    #[must_use]
    pub fn press(touch_id: TouchId, target: impl Into<String>) -> Self {
        Self::new(ActionKind::Press, touch_id, target)
    }

    /// Shorthand for a [`ActionKind::Move`] event.
    #[must_use]
    pub fn moved(touch_id: TouchId, target: impl Into<String>) -> Self {
        Self::new(ActionKind::Move, touch_id, target)
    }

    /// Shorthand for a [`ActionKind::Release`] event.
    #[must_use]
    pub fn release(touch_id: TouchId, target: impl Into<String>) -> Self {
        Self::new(ActionKind::Release, touch_id, target)
    }
}
