// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F.

//! Thompson-style construction of the raw gesture automaton.
//!
//! Every expression is compiled between a given *entry* and *end* state.
//! Repetitions are unrolled: `min` mandatory copies, then either a loop
//! (unbounded) or `max - min` optional copies, each of which may complete
//! into `end` through an epsilon link. The result still contains epsilon
//! links and is only an intermediate form; see [`super::pruner`].

use std::collections::BTreeMap;
use std::fmt;

use crate::common::symbol::SymbolKey;
use crate::pattern::parser::{Action, Expression, Modifier};

/// Index of a state in an automaton's state arena.
pub type StateId = usize;

/// Name of the implicit group wrapping a whole pattern.
pub const TOP_GROUP: &str = "top";

/// Tag identifying which group produced a state.
///
/// A successful transition reports the tags of the states it left, which tells
/// the caller which part of the gesture advanced.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupId {
    /// The automaton's initial state.
    Start,
    /// The single completion state of the raw automaton.
    End,
    /// A named group, e.g. [`TOP_GROUP`].
    Named(String),
    /// An unnamed group, numbered in order of appearance from 0.
    Numbered(u32),
}

impl GroupId {
    /// Returns true for the implicit whole-pattern group.
    #[must_use]
    pub fn is_top(&self) -> bool {
        matches!(self, Self::Named(name) if name == TOP_GROUP)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::End => write!(f, "end"),
            Self::Named(name) => write!(f, "{name}"),
            Self::Numbered(n) => write!(f, "{n}"),
        }
    }
}

/// Symbol key → target pattern source → destination states.
pub type TransitionTable = BTreeMap<SymbolKey, BTreeMap<String, Vec<StateId>>>;

/// A state of the raw automaton.
#[derive(Debug, Clone)]
pub struct RawState {
    /// Group that produced this state.
    pub group: GroupId,
    /// Symbol-guarded transitions.
    pub transitions: TransitionTable,
    /// States this one completes into without consuming input.
    pub epsilons: Vec<StateId>,
}

impl RawState {
    fn new(group: GroupId) -> Self {
        Self {
            group,
            transitions: TransitionTable::new(),
            epsilons: Vec::new(),
        }
    }
}

/// Automaton with epsilon links, as produced by [`compile`].
#[derive(Debug, Clone)]
pub struct RawAutomaton {
    /// State arena.
    pub states: Vec<RawState>,
    /// Initial state, tagged [`GroupId::Start`].
    pub initial: StateId,
    /// Completion state, tagged [`GroupId::End`].
    pub end: StateId,
    /// Number of numbered groups.
    pub group_count: u32,
}

/// Compiles a parsed pattern into a raw automaton.
///
/// The expressions are wrapped in the implicit [`TOP_GROUP`] with modifier
/// `{1,1}`. Never fails; parser output is already bounded by
/// [`MAX_STATES`](crate::pattern::parser::MAX_STATES) and
/// [`MAX_NESTING`](crate::pattern::parser::MAX_NESTING).
pub fn compile(expressions: &[Expression]) -> RawAutomaton {
    let mut compiler = Compiler::default();
    let initial = compiler.add_state(GroupId::Start);
    let end = compiler.add_state(GroupId::End);
    compiler.compile_group(initial, end, Some(TOP_GROUP), expressions, Modifier::ONCE);
    RawAutomaton {
        states: compiler.states,
        initial,
        end,
        group_count: compiler.next_group,
    }
}

#[derive(Default)]
struct Compiler {
    states: Vec<RawState>,
    next_group: u32,
}

impl Compiler {
    fn add_state(&mut self, group: GroupId) -> StateId {
        self.states.push(RawState::new(group));
        self.states.len() - 1
    }

    fn link(&mut self, from: StateId, to: StateId) {
        let epsilons = &mut self.states[from].epsilons;
        if !epsilons.contains(&to) {
            epsilons.push(to);
        }
    }

    fn add_transition(&mut self, from: StateId, key: SymbolKey, target: &str, to: StateId) {
        let destinations = self.states[from]
            .transitions
            .entry(key)
            .or_default()
            .entry(target.to_string())
            .or_default();
        if !destinations.contains(&to) {
            destinations.push(to);
        }
    }

    fn group_id(&mut self, name: Option<&str>) -> GroupId {
        if let Some(name) = name {
            GroupId::Named(name.to_string())
        } else {
            let n = self.next_group;
            self.next_group += 1;
            GroupId::Numbered(n)
        }
    }

    fn compile_expression(&mut self, entry: StateId, end: StateId, expression: &Expression) {
        match expression {
            Expression::Action(action) => self.compile_action(entry, end, action),
            Expression::Group(group) => self.compile_group(
                entry,
                end,
                group.name.as_deref(),
                &group.children,
                group.modifier,
            ),
            Expression::Options(options) => {
                // Fan out from and back into the same pair of states
                for option in options {
                    self.compile_expression(entry, end, option);
                }
            }
        }
    }

    fn compile_action(&mut self, entry: StateId, end: StateId, action: &Action) {
        let group = self.states[end].group.clone();
        let key = action.key();
        let target = action.target.as_str();
        let Modifier { min, max } = action.modifier;

        let mut current = entry;
        for _ in 0..min {
            let next = self.add_state(group.clone());
            self.add_transition(current, key, target, next);
            current = next;
        }

        match max {
            None => {
                // `entry` may be shared with sibling alternatives, so a
                // zero-minimum loop gets a state of its own.
                if min == 0 {
                    let looping = self.add_state(group);
                    self.link(current, looping);
                    current = looping;
                }
                self.link(current, end);
                self.add_transition(current, key, target, current);
            }
            Some(max) => {
                self.link(current, end);
                for _ in min..max {
                    let next = self.add_state(group.clone());
                    self.add_transition(current, key, target, next);
                    self.link(next, end);
                    current = next;
                }
            }
        }
    }

    fn compile_group(
        &mut self,
        entry: StateId,
        end: StateId,
        name: Option<&str>,
        children: &[Expression],
        modifier: Modifier,
    ) {
        let group = self.group_id(name);
        let start = self.add_state(group.clone());
        self.link(entry, start);

        let mut current = start;
        for _ in 0..modifier.min {
            current = self.compile_pass(current, &group, children);
        }
        self.link(current, end);

        match modifier.max {
            None => {
                // One more pass that can either finish or start over
                let pass_end = self.compile_pass(current, &group, children);
                self.link(pass_end, end);
                self.link(pass_end, current);
            }
            Some(max) => {
                for _ in modifier.min..max {
                    current = self.compile_pass(current, &group, children);
                    self.link(current, end);
                }
            }
        }
    }

    /// Compiles one pass over `children` starting at `from`, returning the
    /// state the pass ends in.
    fn compile_pass(&mut self, from: StateId, group: &GroupId, children: &[Expression]) -> StateId {
        let mut current = from;
        for child in children {
            let next = self.add_state(group.clone());
            self.compile_expression(current, next, child);
            current = next;
        }
        current
    }
}
