// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F.

//! # `gestures` — Multi-Touch Gesture Expressions
//!
//! Recognizes multi-touch input sequences described by a small pattern
//! language, the way regular expressions recognize strings.
//!
//! ## Components
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`pattern::parser`] | Pattern text to AST of actions, groups and options |
//! | [`pattern::compiler`] | AST to automaton with epsilon links and unrolled repetition |
//! | [`pattern::pruner`] | Epsilon elimination, including through loops |
//! | [`pattern::automaton`] | Immutable compiled gesture and its step function |
//! | [`engine`] | Live match instances driven by touch events |
//! | [`common`] | Symbols, touch events and local id allocation |
//!
//! ## Example
//!
//! ```
//! use gestures::{Engine, Notification, Outcome, TouchEvent};
//!
//! let mut engine = Engine::new();
//! let pinch = engine.register("d1d2(m1|m2)+((u1u2)|(u2u1))").unwrap();
//!
//! let mut last = Vec::new();
//! for event in [
//!     TouchEvent::press(10, "map"),
//!     TouchEvent::press(11, "map"),
//!     TouchEvent::moved(10, "map"),
//!     TouchEvent::moved(11, "map"),
//!     TouchEvent::release(11, "map"),
//!     TouchEvent::release(10, "map"),
//! ] {
//!     last = engine.handle(&event);
//! }
//! assert!(last.contains(&Notification::Terminated {
//!     instance: gestures::InstanceId(0),
//!     gesture: pinch,
//!     outcome: Outcome::Accepted,
//! }));
//! ```

pub mod common;
pub mod engine;
pub mod pattern;

pub use common::symbol::{ActionKind, Symbol, SymbolKey, TouchEvent, TouchId};
pub use engine::{Engine, EngineConfig, GestureId, InstanceId, Notification, Outcome};
pub use pattern::automaton::Automaton;
pub use pattern::compiler::GroupId;
pub use pattern::parser::{parse_gesture, Expression, PatternError, PatternErrorKind};
