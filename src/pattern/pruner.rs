// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F.

//! Epsilon elimination for raw gesture automata.
//!
//! Each state absorbs the transition tables of every state it completes into
//! (its epsilon successors, resolved first), so that matching only ever has to
//! follow symbol-guarded transitions.
//!
//! # Cycles
//!
//! Unbounded groups close a loop with an epsilon back edge. A successor that
//! is still being resolved when it is reached again cannot be absorbed yet;
//! instead a pending link is recorded on both sides. When the in-progress
//! state finishes, its table is merged into every state waiting on it. A state
//! that absorbs an incomplete table inherits the pending links of that table,
//! so every state ends up with the union over its whole epsilon closure.

use std::collections::{BTreeSet, HashMap, VecDeque};

use log::debug;

use crate::pattern::automaton::{Automaton, Edge, State, TargetMatcher};
use crate::pattern::compiler::{RawAutomaton, StateId, TransitionTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// A state being resolved, with the epsilon successors it still has to visit.
struct Frame {
    id: StateId,
    epsilons: Vec<StateId>,
    next: usize,
}

struct Pruner {
    raw: RawAutomaton,
    finals: Vec<bool>,
    marks: Vec<Mark>,
    /// `waiters[p]`: states to receive `p`'s table once `p` is done.
    waiters: Vec<Vec<StateId>>,
    /// `owes[s]`: in-progress states whose final table `s` is still missing.
    owes: Vec<BTreeSet<StateId>>,
}

/// Eliminates every epsilon link of `raw`, returning the immutable automaton.
///
/// Unreachable states are dropped and state ids compacted; the initial state
/// becomes state `0`. Target patterns are compiled to regexes here, once per
/// distinct source.
pub fn prune(raw: RawAutomaton) -> Automaton {
    let count = raw.states.len();
    let mut finals = vec![false; count];
    if let Some(end) = finals.get_mut(raw.end) {
        *end = true;
    }
    let mut pruner = Pruner {
        raw,
        finals,
        marks: vec![Mark::Unvisited; count],
        waiters: vec![Vec::new(); count],
        owes: vec![BTreeSet::new(); count],
    };

    pruner.resolve(pruner.raw.initial);
    for id in 0..count {
        if pruner.marks[id] == Mark::Unvisited {
            pruner.resolve(id);
        }
    }

    pruner.into_automaton()
}

impl Pruner {
    fn enter(&mut self, id: StateId) -> Frame {
        self.marks[id] = Mark::InProgress;
        Frame {
            id,
            epsilons: std::mem::take(&mut self.raw.states[id].epsilons),
            next: 0,
        }
    }

    /// Depth-first resolution of `root` and every unvisited state it
    /// completes into.
    fn resolve(&mut self, root: StateId) {
        let mut stack = vec![self.enter(root)];
        while let Some(frame) = stack.last_mut() {
            if let Some(&succ) = frame.epsilons.get(frame.next) {
                frame.next += 1;
                let id = frame.id;
                if succ == id {
                    continue;
                }
                match self.marks[succ] {
                    Mark::Unvisited => stack.push(self.enter(succ)),
                    Mark::Done => self.absorb(id, succ),
                    Mark::InProgress => self.wait_for(id, succ),
                }
            } else {
                let id = frame.id;
                stack.pop();
                self.finish(id);
                if let Some(parent) = stack.last() {
                    self.absorb(parent.id, id);
                }
            }
        }
    }

    fn finish(&mut self, id: StateId) {
        self.marks[id] = Mark::Done;
        self.owes[id].remove(&id);
        for waiter in std::mem::take(&mut self.waiters[id]) {
            self.owes[waiter].remove(&id);
            if waiter != id {
                self.absorb(waiter, id);
            }
        }
    }

    /// Records that `waiter` needs `pending`'s table once it is complete.
    fn wait_for(&mut self, waiter: StateId, pending: StateId) {
        if self.owes[waiter].insert(pending) {
            self.waiters[pending].push(waiter);
        }
    }

    /// Unions `from`'s transitions and finality into `into`.
    fn absorb(&mut self, into: StateId, from: StateId) {
        let table = self.raw.states[from].transitions.clone();
        merge_tables(&mut self.raw.states[into].transitions, table);
        self.finals[into] |= self.finals[from];

        let inherited: Vec<StateId> = self.owes[from]
            .iter()
            .copied()
            .filter(|&pending| pending != into)
            .collect();
        for pending in inherited {
            self.wait_for(into, pending);
        }
    }

    fn into_automaton(self) -> Automaton {
        let Self { raw, finals, .. } = self;

        // Breadth-first renumbering of the states reachable from the start
        let mut new_ids: HashMap<StateId, StateId> = HashMap::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([raw.initial]);
        new_ids.insert(raw.initial, 0);
        while let Some(id) = queue.pop_front() {
            order.push(id);
            for destinations in raw.states[id].transitions.values().flat_map(|t| t.values()) {
                for &dest in destinations {
                    if !new_ids.contains_key(&dest) {
                        new_ids.insert(dest, new_ids.len());
                        queue.push_back(dest);
                    }
                }
            }
        }

        let mut matchers: HashMap<String, TargetMatcher> = HashMap::new();
        let mut states = Vec::with_capacity(order.len());
        for &id in &order {
            let raw_state = &raw.states[id];
            let transitions = raw_state
                .transitions
                .iter()
                .map(|(&key, targets)| {
                    let edges: Vec<Edge> = targets
                        .iter()
                        .map(|(source, destinations)| Edge {
                            target: matchers
                                .entry(source.clone())
                                .or_insert_with(|| TargetMatcher::new(source))
                                .clone(),
                            destinations: destinations.iter().map(|d| new_ids[d]).collect(),
                        })
                        .collect();
                    (key, edges)
                })
                .collect();
            states.push(State {
                group: raw_state.group.clone(),
                transitions,
                is_final: finals[id],
            });
        }

        let mut rejected_targets: Vec<String> = matchers
            .into_values()
            .filter(|m| !m.is_valid())
            .map(|m| m.source().to_string())
            .collect();
        rejected_targets.sort();

        debug!(
            "pruned gesture automaton: {} of {} states reachable, {} groups",
            states.len(),
            raw.states.len(),
            raw.group_count
        );

        Automaton::from_parts(states, raw.group_count, rejected_targets)
    }
}

/// Unions `from` into `into`, keeping destination lists free of duplicates.
fn merge_tables(into: &mut TransitionTable, from: TransitionTable) {
    for (key, targets) in from {
        let into_targets = into.entry(key).or_default();
        for (target, destinations) in targets {
            let into_destinations = into_targets.entry(target).or_default();
            for dest in destinations {
                if !into_destinations.contains(&dest) {
                    into_destinations.push(dest);
                }
            }
        }
    }
}
