// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F.

//! The compiled, epsilon-free gesture automaton.
//!
//! An [`Automaton`] is immutable once built and is shared by every match
//! instance of its gesture. Matching a symbol against a set of states is a
//! pure function: [`Automaton::transition`].

use std::collections::BTreeMap;

use log::{debug, warn};
use regex::Regex;

use crate::common::symbol::{Symbol, SymbolKey};
use crate::pattern::compiler::{compile, GroupId, StateId};
use crate::pattern::parser::{parse_gesture, Expression, PatternError};
use crate::pattern::pruner::prune;

/// A target pattern together with its compiled regex.
///
/// Matching is an unanchored search: `/btn/` matches a target named
/// `"ok-btn-1"`. A source that is not a valid regex never matches.
#[derive(Debug, Clone)]
pub struct TargetMatcher {
    source: String,
    regex: Option<Regex>,
}

impl TargetMatcher {
    /// Compiles `source`, logging and recording a failure instead of
    /// returning it.
    #[must_use]
    pub fn new(source: &str) -> Self {
        let regex = match Regex::new(source) {
            Ok(regex) => Some(regex),
            Err(e) => {
                warn!("target pattern /{source}/ is not a valid regex and will never match: {e}");
                None
            }
        };
        Self {
            source: source.to_string(),
            regex,
        }
    }

    /// The pattern text as written in the gesture.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns false if the source failed to compile.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.regex.is_some()
    }

    /// Unanchored match against a target identifier.
    #[must_use]
    pub fn is_match(&self, target: &str) -> bool {
        self.regex.as_ref().is_some_and(|r| r.is_match(target))
    }
}

/// One target-guarded entry of a state's transition table.
#[derive(Debug, Clone)]
pub struct Edge {
    pub(crate) target: TargetMatcher,
    pub(crate) destinations: Vec<StateId>,
}

impl Edge {
    /// Guard on the symbol's target.
    #[must_use]
    pub const fn target(&self) -> &TargetMatcher {
        &self.target
    }

    /// States entered when the guard matches, without duplicates.
    #[must_use]
    pub fn destinations(&self) -> &[StateId] {
        &self.destinations
    }
}

/// A resolved automaton state.
#[derive(Debug, Clone)]
pub struct State {
    pub(crate) group: GroupId,
    pub(crate) transitions: BTreeMap<SymbolKey, Vec<Edge>>,
    pub(crate) is_final: bool,
}

impl State {
    /// Tag of the group this state was produced by.
    #[must_use]
    pub const fn group(&self) -> &GroupId {
        &self.group
    }

    /// Outgoing transitions by symbol key, in target order.
    #[must_use]
    pub const fn transitions(&self) -> &BTreeMap<SymbolKey, Vec<Edge>> {
        &self.transitions
    }

    /// Returns true if the gesture may end in this state.
    #[must_use]
    pub const fn is_final(&self) -> bool {
        self.is_final
    }

    /// Returns true if no transitions leave this state.
    #[must_use]
    pub fn is_accepting(&self) -> bool {
        self.transitions.is_empty()
    }
}

/// Result of feeding one symbol to a set of states.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Step {
    /// Destination states, ascending and without duplicates.
    pub states: Vec<StateId>,
    /// Groups of the states that had a matching transition, in first-match
    /// order and without duplicates.
    pub groups: Vec<GroupId>,
}

impl Step {
    /// Returns true if the symbol matched nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// A compiled gesture pattern.
#[derive(Debug, Clone)]
pub struct Automaton {
    states: Vec<State>,
    group_count: u32,
    rejected_targets: Vec<String>,
}

impl Automaton {
    /// Parses and compiles a gesture pattern.
    ///
    /// # Example
    ///
    /// ```
    /// use gestures::common::symbol::{ActionKind, Symbol};
    /// use gestures::pattern::automaton::Automaton;
    ///
    /// let tap = Automaton::compile("d1u1").unwrap();
    /// let step = tap.transition(&[tap.initial()], &Symbol::new(ActionKind::Press, 1, "button"));
    /// assert!(!step.is_empty());
    /// ```
    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        let expressions = parse_gesture(pattern)?;
        let automaton = Self::from_expressions(&expressions);
        debug!(
            "compiled gesture {pattern:?}: {} states, {} groups",
            automaton.len(),
            automaton.group_count
        );
        Ok(automaton)
    }

    /// Compiles an already parsed pattern.
    ///
    /// Trees built by hand rather than by [`parse_gesture`] are not checked
    /// against [`MAX_STATES`](crate::pattern::parser::MAX_STATES).
    #[must_use]
    pub fn from_expressions(expressions: &[Expression]) -> Self {
        prune(compile(expressions))
    }

    pub(crate) const fn from_parts(
        states: Vec<State>,
        group_count: u32,
        rejected_targets: Vec<String>,
    ) -> Self {
        Self {
            states,
            group_count,
            rejected_targets,
        }
    }

    /// The initial state. Always `0`.
    #[must_use]
    pub const fn initial(&self) -> StateId {
        0
    }

    /// Returns the state with the given id, if any.
    #[must_use]
    pub fn state(&self, id: StateId) -> Option<&State> {
        self.states.get(id)
    }

    /// All states, indexed by [`StateId`].
    #[must_use]
    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// Number of states.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Always false: the initial state exists even for the empty pattern.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Number of unnamed groups in the pattern.
    #[must_use]
    pub const fn group_count(&self) -> u32 {
        self.group_count
    }

    /// Target patterns that failed to compile as regexes, sorted.
    #[must_use]
    pub fn rejected_targets(&self) -> &[String] {
        &self.rejected_targets
    }

    /// Feeds `symbol` to every state in `states`.
    ///
    /// Unknown state ids are ignored.
    #[must_use]
    pub fn transition(&self, states: &[StateId], symbol: &Symbol<'_>) -> Step {
        let mut step = Step::default();
        for state in states.iter().filter_map(|&id| self.states.get(id)) {
            let Some(edges) = state.transitions.get(&symbol.key) else {
                continue;
            };
            for edge in edges {
                if !edge.target.is_match(symbol.target) {
                    continue;
                }
                step.states.extend_from_slice(&edge.destinations);
                if !step.groups.contains(&state.group) {
                    step.groups.push(state.group.clone());
                }
            }
        }
        step.states.sort_unstable();
        step.states.dedup();
        step
    }

    /// Returns true if no state in `states` has an outgoing transition.
    #[must_use]
    pub fn is_exhausted(&self, states: &[StateId]) -> bool {
        states
            .iter()
            .filter_map(|&id| self.states.get(id))
            .all(State::is_accepting)
    }

    /// Returns true if any state in `states` is final.
    #[must_use]
    pub fn contains_final(&self, states: &[StateId]) -> bool {
        states
            .iter()
            .filter_map(|&id| self.states.get(id))
            .any(State::is_final)
    }

    /// Runs a whole symbol sequence from the initial state and reports
    /// whether it ends in a final state.
    #[must_use]
    pub fn accepts<'a, I>(&self, symbols: I) -> bool
    where
        I: IntoIterator<Item = Symbol<'a>>,
    {
        let mut current = vec![self.initial()];
        for symbol in symbols {
            current = self.transition(&current, &symbol).states;
            if current.is_empty() {
                return false;
            }
        }
        self.contains_final(&current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::symbol::ActionKind;
    use crate::pattern::compiler::TOP_GROUP;
    use crate::pattern::parser::PatternErrorKind;

    fn press(id: u32, target: &str) -> Symbol<'_> {
        Symbol::new(ActionKind::Press, id, target)
    }

    fn moved(id: u32, target: &str) -> Symbol<'_> {
        Symbol::new(ActionKind::Move, id, target)
    }

    fn release(id: u32, target: &str) -> Symbol<'_> {
        Symbol::new(ActionKind::Release, id, target)
    }

    #[test]
    fn test_single_press_one_step() {
        let a = Automaton::compile("d1").unwrap();
        let step = a.transition(&[a.initial()], &press(1, "anything"));
        assert_eq!(step.states.len(), 1);
        assert!(a.is_exhausted(&step.states));
        assert!(a.contains_final(&step.states));
        assert_eq!(step.groups, vec![GroupId::Start]);
    }

    #[test]
    fn test_wrong_symbol_is_empty() {
        let a = Automaton::compile("d1").unwrap();
        assert!(a.transition(&[a.initial()], &press(2, "x")).is_empty());
        assert!(a.transition(&[a.initial()], &moved(1, "x")).is_empty());
    }

    #[test]
    fn test_move_star_stays_alive() {
        let a = Automaton::compile("m1*").unwrap();
        let mut current = vec![a.initial()];
        for _ in 0..10 {
            current = a.transition(&current, &moved(1, "t")).states;
            assert!(!current.is_empty());
            assert!(!a.is_exhausted(&current));
            assert!(a.contains_final(&current));
        }
    }

    #[test]
    fn test_options_share_acceptance() {
        let a = Automaton::compile("(d1|d2)").unwrap();
        for id in [1, 2] {
            let step = a.transition(&[a.initial()], &press(id, "t"));
            assert!(!step.is_empty());
            assert!(a.is_exhausted(&step.states));
            assert!(a.contains_final(&step.states));
        }
        assert!(a.transition(&[a.initial()], &press(3, "t")).is_empty());
    }

    #[test]
    fn test_target_is_unanchored() {
        let a = Automaton::compile("d1/btn/").unwrap();
        assert!(a.accepts([press(1, "ok-btn-1")]));
        assert!(a.accepts([press(1, "btn")]));
        assert!(!a.accepts([press(1, "button")]));
    }

    #[test]
    fn test_anchors_in_target_are_honored() {
        let a = Automaton::compile("d1/^btn$/").unwrap();
        assert!(a.accepts([press(1, "btn")]));
        assert!(!a.accepts([press(1, "ok-btn")]));
    }

    #[test]
    fn test_invalid_regex_never_matches() {
        let a = Automaton::compile("d1/(/|d1/ok/").unwrap();
        assert_eq!(a.rejected_targets(), &["(".to_string()]);
        assert!(!a.accepts([press(1, "(")]));
        assert!(a.accepts([press(1, "ok")]));
    }

    #[test]
    fn test_tap_sequence() {
        let a = Automaton::compile("d1m1*u1").unwrap();
        assert!(a.accepts([press(1, "t"), release(1, "t")]));
        assert!(a.accepts([press(1, "t"), moved(1, "t"), moved(1, "t"), release(1, "t")]));
        assert!(!a.accepts([press(1, "t"), moved(1, "t")]));
        assert!(!a.accepts([moved(1, "t")]));
    }

    #[test]
    fn test_bounded_repetition() {
        let a = Automaton::compile("(d1u1){2,3}").unwrap();
        let tap = [press(1, "t"), release(1, "t")];
        let taps = |n: usize| tap.iter().cycle().take(n * 2).cloned().collect::<Vec<_>>();
        assert!(!a.accepts(taps(1)));
        assert!(a.accepts(taps(2)));
        assert!(a.accepts(taps(3)));
        assert!(!a.accepts(taps(4)));
    }

    #[test]
    fn test_groups_follow_the_states_left() {
        // The state reached by d1 belongs to the top group; the states inside
        // the loop belong to group 0.
        let a = Automaton::compile("d1(m1)+u1").unwrap();
        let top = GroupId::Named(TOP_GROUP.to_string());

        let step = a.transition(&[a.initial()], &press(1, "t"));
        assert_eq!(step.groups, vec![GroupId::Start]);
        let step = a.transition(&step.states, &moved(1, "t"));
        assert_eq!(step.groups, vec![top.clone()]);
        let step = a.transition(&step.states, &moved(1, "t"));
        assert_eq!(step.groups, vec![GroupId::Numbered(0)]);
        let step = a.transition(&step.states, &release(1, "t"));
        assert_eq!(step.groups, vec![GroupId::Numbered(0)]);
        assert!(a.contains_final(&step.states));

        let end = a.state(step.states[0]).unwrap();
        assert_eq!(end.group(), &top);
        assert!(end.is_accepting());
    }

    #[test]
    fn test_groups_reported_in_first_match_order() {
        let a = Automaton::compile("d1(m1)+u1").unwrap();
        let top = GroupId::Named(TOP_GROUP.to_string());
        let in_top = a.transition(&[a.initial()], &press(1, "t")).states;
        let in_loop = a.transition(&in_top, &moved(1, "t")).states;
        assert_eq!(a.state(in_top[0]).unwrap().group(), &top);
        assert_eq!(a.state(in_loop[0]).unwrap().group(), &GroupId::Numbered(0));

        let both = [in_loop[0], in_top[0]];
        let step = a.transition(&both, &moved(1, "t"));
        assert_eq!(step.groups, vec![GroupId::Numbered(0), top.clone()]);
        let step = a.transition(&[in_top[0], in_loop[0]], &moved(1, "t"));
        assert_eq!(step.groups, vec![top, GroupId::Numbered(0)]);
        // Only the state inside the loop can release
        let step = a.transition(&both, &release(1, "t"));
        assert_eq!(step.groups, vec![GroupId::Numbered(0)]);
    }

    #[test]
    fn test_state_lookup() {
        let a = Automaton::compile("d1").unwrap();
        assert_eq!(a.state(a.initial()).unwrap().group(), &GroupId::Start);
        assert!(a.state(a.len()).is_none());
    }

    #[test]
    fn test_duplicate_and_unknown_states_ignored() {
        let a = Automaton::compile("d1").unwrap();
        let step = a.transition(&[0, 0, 999], &press(1, "t"));
        assert_eq!(step.states.len(), 1);
        assert_eq!(step.groups.len(), 1);
    }

    #[test]
    fn test_compile_error_propagates() {
        assert!(Automaton::compile("(d1").is_err());
        assert!(Automaton::compile("x1").is_err());
        let err = Automaton::compile("((d1{1000}){1000}){1000}").unwrap_err();
        assert_eq!(err.kind, PatternErrorKind::TooManyStates);
        let err = Automaton::compile("d1{4294967295}").unwrap_err();
        assert_eq!(err.kind, PatternErrorKind::TooManyStates);
    }

    #[test]
    fn test_empty_pattern_accepts_nothing_but_empty() {
        let a = Automaton::compile("").unwrap();
        assert_eq!(a.len(), 1);
        assert!(!a.is_empty());
        assert!(a.accepts(std::iter::empty()));
        assert!(!a.accepts([press(1, "t")]));
    }
}
