// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F.

//! Gesture pattern language: parsing and compilation to automata.
//!
//! Patterns describe touch sequences the way regular expressions describe
//! strings, with touch actions in place of characters.
//!
//! # Pattern Syntax
//!
//! ```text
//! dN          press of contact N (N >= 1, local to the gesture)
//! mN          move of contact N
//! uN          release of contact N
//! xN/re/      action whose target identifier contains a match of `re`
//! (...)       group
//! a|b         alternatives
//! ?  *  +     repeat 0-1, 0 or more, 1 or more times
//! {n}  {n,m}  repeat exactly n, or between n and m times
//! ```
//!
//! A target defaults to `.*`. Inside a target, `\/` is a literal slash.
//!
//! # Pipeline
//!
//! [`parser::parse_gesture`] builds the AST, [`compiler::compile`] turns it
//! into an automaton with epsilon links, and [`pruner::prune`] removes them.
//! [`automaton::Automaton::compile`] runs all three.

pub mod automaton;
pub mod compiler;
#[cfg(feature = "dot")]
mod dot;
pub mod parser;
pub mod pruner;
