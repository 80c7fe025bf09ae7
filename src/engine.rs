// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F.

//! Runtime matching of registered gestures against a live touch stream.
//!
//! The [`Engine`] owns the compiled gestures and every in-flight match
//! instance. Each event is first fed to the live instances, then offered to
//! every gesture as a possible start of a new instance. Instances created by
//! an event are therefore never advanced by that same event.
//!
//! # Lifecycle
//!
//! ```text
//! created ──► alive ──► terminated
//! ```
//!
//! An instance terminates as soon as its state set is exhausted: empty, or
//! made only of states without outgoing transitions. Its [`Outcome`] is
//! [`Outcome::Accepted`] if the gesture was complete either before or after
//! the terminating event.

use std::fmt;
use std::sync::Arc;

use log::{debug, trace, warn};

use crate::common::local_ids::LocalIds;
use crate::common::symbol::{ActionKind, Symbol, TouchEvent};
use crate::pattern::automaton::Automaton;
use crate::pattern::compiler::{GroupId, StateId};
use crate::pattern::parser::PatternError;

/// Default cap on simultaneously live instances.
pub const DEFAULT_MAX_INSTANCES: usize = 1024;

/// Engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct EngineConfig {
    /// Activations beyond this many live instances are skipped.
    pub max_instances: usize,
}

impl EngineConfig {
    /// Returns the default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_instances: DEFAULT_MAX_INSTANCES,
        }
    }

    /// Sets the live instance cap.
    #[must_use]
    pub const fn with_max_instances(mut self, max_instances: usize) -> Self {
        self.max_instances = max_instances;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle of a registered gesture, in registration order from 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GestureId(pub usize);

impl fmt::Display for GestureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gesture#{}", self.0)
    }
}

/// Identifier of a match instance, unique for the engine's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceId(pub u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instance#{}", self.0)
    }
}

/// How a terminated instance ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The touch sequence matched the whole gesture.
    Accepted,
    /// The touch sequence diverged from the gesture.
    Rejected,
}

/// Lifecycle event reported by [`Engine::handle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A gesture started matching.
    Created {
        /// New instance.
        instance: InstanceId,
        /// Gesture being matched.
        gesture: GestureId,
    },
    /// An event moved the instance forward through the given groups.
    Advanced {
        /// Instance that advanced.
        instance: InstanceId,
        /// Gesture being matched.
        gesture: GestureId,
        /// Groups with a matching transition, in first-match order.
        groups: Vec<GroupId>,
    },
    /// The instance ended and was dropped.
    Terminated {
        /// Instance that ended.
        instance: InstanceId,
        /// Gesture that was being matched.
        gesture: GestureId,
        /// Whether the gesture was recognized.
        outcome: Outcome,
    },
}

impl Notification {
    /// The instance this notification is about.
    #[must_use]
    pub const fn instance(&self) -> InstanceId {
        match self {
            Self::Created { instance, .. }
            | Self::Advanced { instance, .. }
            | Self::Terminated { instance, .. } => *instance,
        }
    }

    /// The gesture of the instance.
    #[must_use]
    pub const fn gesture(&self) -> GestureId {
        match self {
            Self::Created { gesture, .. }
            | Self::Advanced { gesture, .. }
            | Self::Terminated { gesture, .. } => *gesture,
        }
    }
}

/// A live match of one gesture.
#[derive(Debug, Clone)]
pub struct Instance {
    id: InstanceId,
    gesture: GestureId,
    automaton: Arc<Automaton>,
    states: Vec<StateId>,
    local_ids: LocalIds,
}

impl Instance {
    /// Instance identifier.
    #[must_use]
    pub const fn id(&self) -> InstanceId {
        self.id
    }

    /// Gesture being matched.
    #[must_use]
    pub const fn gesture(&self) -> GestureId {
        self.gesture
    }

    /// Current state set, ascending.
    #[must_use]
    pub fn states(&self) -> &[StateId] {
        &self.states
    }

    /// Contacts currently bound to local ids.
    #[must_use]
    pub const fn local_ids(&self) -> &LocalIds {
        &self.local_ids
    }

    /// Feeds one event, pushing notifications. Returns false once the
    /// instance has terminated.
    fn advance(&mut self, event: &TouchEvent, out: &mut Vec<Notification>) -> bool {
        let local_id = self.local_ids.get_or_assign(event.touch_id);
        if event.kind == ActionKind::Release {
            self.local_ids.release(event.touch_id);
        }
        let symbol = Symbol::new(event.kind, local_id, &event.target);
        self.apply(&symbol, out)
    }

    fn apply(&mut self, symbol: &Symbol<'_>, out: &mut Vec<Notification>) -> bool {
        let was_final = self.automaton.contains_final(&self.states);
        let step = self.automaton.transition(&self.states, symbol);
        trace!(
            "{} ({}): {}/{}/ -> {:?}",
            self.id,
            self.gesture,
            symbol.key,
            symbol.target,
            step.states
        );

        if !step.groups.is_empty() {
            out.push(Notification::Advanced {
                instance: self.id,
                gesture: self.gesture,
                groups: step.groups,
            });
        }
        self.states = step.states;

        if !self.automaton.is_exhausted(&self.states) {
            return true;
        }
        let outcome = if was_final || self.automaton.contains_final(&self.states) {
            Outcome::Accepted
        } else {
            Outcome::Rejected
        };
        debug!("{} ({}) terminated: {outcome:?}", self.id, self.gesture);
        out.push(Notification::Terminated {
            instance: self.id,
            gesture: self.gesture,
            outcome,
        });
        false
    }
}

/// Matches registered gestures against a stream of touch events.
///
/// # Example
///
/// ```
/// use gestures::common::symbol::TouchEvent;
/// use gestures::engine::{Engine, Notification, Outcome};
///
/// let mut engine = Engine::new();
/// let tap = engine.register("d1/button/u1").unwrap();
///
/// engine.handle(&TouchEvent::press(7, "button"));
/// let done = engine.handle(&TouchEvent::release(7, "button"));
/// assert!(matches!(
///     done.last(),
///     Some(Notification::Terminated { gesture, outcome: Outcome::Accepted, .. }) if *gesture == tap
/// ));
/// ```
#[derive(Debug, Default)]
pub struct Engine {
    config: EngineConfig,
    gestures: Vec<Arc<Automaton>>,
    instances: Vec<Instance>,
    next_instance: u64,
}

impl Engine {
    /// Creates an engine with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine with the given configuration.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compiles and registers a gesture pattern.
    pub fn register(&mut self, pattern: &str) -> Result<GestureId, PatternError> {
        let automaton = Automaton::compile(pattern)?;
        Ok(self.register_automaton(Arc::new(automaton)))
    }

    /// Registers an already compiled gesture. The same automaton may be
    /// registered several times; each registration matches independently.
    pub fn register_automaton(&mut self, automaton: Arc<Automaton>) -> GestureId {
        let id = GestureId(self.gestures.len());
        debug!("registered {id} with {} states", automaton.len());
        self.gestures.push(automaton);
        id
    }

    /// Returns a registered gesture's automaton.
    #[must_use]
    pub fn gesture(&self, id: GestureId) -> Option<&Arc<Automaton>> {
        self.gestures.get(id.0)
    }

    /// Number of registered gestures.
    #[must_use]
    pub fn gesture_count(&self) -> usize {
        self.gestures.len()
    }

    /// Live instances, oldest first.
    #[must_use]
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// Processes one touch event.
    ///
    /// Live instances advance first, in creation order; then every gesture
    /// whose initial state accepts the event as local id `1` starts a new
    /// instance. Notifications for one instance always come in
    /// `Created`, `Advanced`, `Terminated` order.
    pub fn handle(&mut self, event: &TouchEvent) -> Vec<Notification> {
        let mut out = Vec::new();

        let mut live = std::mem::take(&mut self.instances);
        live.retain_mut(|instance| instance.advance(event, &mut out));
        self.instances = live;

        self.activate(event, &mut out);
        out
    }

    /// Processes the changed touches of one platform event, in order.
    pub fn handle_batch<'a, I>(&mut self, events: I) -> Vec<Notification>
    where
        I: IntoIterator<Item = &'a TouchEvent>,
    {
        events
            .into_iter()
            .flat_map(|event| self.handle(event))
            .collect()
    }

    /// Drops a live instance without reporting it. Returns false if no such
    /// instance is live.
    pub fn cancel(&mut self, id: InstanceId) -> bool {
        let before = self.instances.len();
        self.instances.retain(|instance| instance.id != id);
        let cancelled = self.instances.len() != before;
        if cancelled {
            debug!("{id} cancelled");
        }
        cancelled
    }

    /// Drops every live instance.
    pub fn reset(&mut self) {
        debug!("dropping {} live instances", self.instances.len());
        self.instances.clear();
    }

    fn activate(&mut self, event: &TouchEvent, out: &mut Vec<Notification>) {
        let symbol = Symbol::new(event.kind, 1, &event.target);
        for (index, automaton) in self.gestures.iter().enumerate() {
            let initial = [automaton.initial()];
            if automaton.transition(&initial, &symbol).is_empty() {
                continue;
            }
            let gesture = GestureId(index);
            if self.instances.len() >= self.config.max_instances {
                warn!(
                    "{gesture} not started: {} instances already live",
                    self.instances.len()
                );
                continue;
            }

            let id = InstanceId(self.next_instance);
            self.next_instance += 1;
            let mut local_ids = LocalIds::with_activating(event.touch_id);
            if event.kind == ActionKind::Release {
                local_ids.release(event.touch_id);
            }
            let mut instance = Instance {
                id,
                gesture,
                automaton: Arc::clone(automaton),
                states: initial.to_vec(),
                local_ids,
            };
            debug!("{id} created for {gesture} by touch {}", event.touch_id);
            out.push(Notification::Created {
                instance: id,
                gesture,
            });
            if instance.apply(&symbol, out) {
                self.instances.push(instance);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[ctor::ctor]
    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn engine(patterns: &[&str]) -> Engine {
        let mut engine = Engine::new();
        for pattern in patterns {
            engine.register(pattern).unwrap();
        }
        engine
    }

    fn terminated(notifications: &[Notification]) -> Vec<(GestureId, Outcome)> {
        notifications
            .iter()
            .filter_map(|n| match n {
                Notification::Terminated {
                    gesture, outcome, ..
                } => Some((*gesture, *outcome)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_single_press_matches_in_one_step() {
        let mut engine = engine(&["d1"]);
        let out = engine.handle(&TouchEvent::press(42, "x"));
        assert_eq!(out.len(), 3);
        assert!(matches!(out[0], Notification::Created { .. }));
        assert!(matches!(&out[1], Notification::Advanced { groups, .. } if groups == &[GroupId::Start]));
        assert_eq!(terminated(&out), vec![(GestureId(0), Outcome::Accepted)]);
        assert!(engine.instances().is_empty());
    }

    #[test]
    fn test_move_star_stays_alive() {
        let mut engine = engine(&["m1*"]);
        let out = engine.handle(&TouchEvent::moved(1, "x"));
        assert!(terminated(&out).is_empty());
        for _ in 0..5 {
            let out = engine.handle(&TouchEvent::moved(1, "x"));
            // The live instance advances, and a fresh one starts each time
            assert!(terminated(&out).is_empty());
        }
        assert_eq!(engine.instances().len(), 6);
    }

    #[test]
    fn test_complete_gesture_accepted_when_diverging() {
        let mut engine = engine(&["m1*"]);
        engine.handle(&TouchEvent::moved(1, "x"));
        let out = engine.handle(&TouchEvent::press(2, "x"));
        assert_eq!(terminated(&out), vec![(GestureId(0), Outcome::Accepted)]);
    }

    #[test]
    fn test_options_both_accepted() {
        let mut engine = engine(&["(d1|d2)"]);
        // d2 can never start an instance: the activating touch is always 1
        let out = engine.handle(&TouchEvent::press(5, "x"));
        assert_eq!(terminated(&out), vec![(GestureId(0), Outcome::Accepted)]);
    }

    #[test]
    fn test_second_touch_gets_local_id_two() {
        let mut engine = engine(&["d1d2u2u1"]);
        engine.handle(&TouchEvent::press(100, "x"));
        let out = engine.handle(&TouchEvent::press(200, "x"));
        assert!(terminated(&out).is_empty());
        let instance = &engine.instances()[0];
        assert_eq!(instance.local_ids().get(100), Some(1));
        assert_eq!(instance.local_ids().get(200), Some(2));

        engine.handle(&TouchEvent::release(200, "x"));
        assert_eq!(engine.instances()[0].local_ids().get(200), None);
        let out = engine.handle(&TouchEvent::release(100, "x"));
        assert_eq!(terminated(&out), vec![(GestureId(0), Outcome::Accepted)]);
    }

    #[test]
    fn test_released_slot_reused() {
        // The third touch begins after the second ended, so it is d2 again
        let mut engine = engine(&["d1d2u2d2u2u1"]);
        engine.handle(&TouchEvent::press(1, "x"));
        engine.handle(&TouchEvent::press(2, "x"));
        engine.handle(&TouchEvent::release(2, "x"));
        let out = engine.handle(&TouchEvent::press(3, "x"));
        assert!(terminated(&out).is_empty());
        assert_eq!(engine.instances()[0].local_ids().get(3), Some(2));
        engine.handle(&TouchEvent::release(3, "x"));
        let out = engine.handle(&TouchEvent::release(1, "x"));
        assert_eq!(terminated(&out), vec![(GestureId(0), Outcome::Accepted)]);
    }

    #[test]
    fn test_divergence_rejected() {
        let mut engine = engine(&["d1m1u1"]);
        engine.handle(&TouchEvent::press(1, "x"));
        let out = engine.handle(&TouchEvent::release(1, "x"));
        assert_eq!(terminated(&out), vec![(GestureId(0), Outcome::Rejected)]);
        assert!(engine.instances().is_empty());
    }

    #[test]
    fn test_target_guard() {
        let mut engine = engine(&["d1/button/u1/button/"]);
        assert!(engine.handle(&TouchEvent::press(1, "canvas")).is_empty());
        engine.handle(&TouchEvent::press(2, "ok-button"));
        let out = engine.handle(&TouchEvent::release(2, "ok-button"));
        assert_eq!(terminated(&out), vec![(GestureId(0), Outcome::Accepted)]);
    }

    #[test]
    fn test_new_instance_not_advanced_by_its_own_event() {
        let mut engine = engine(&["d1d2"]);
        let out = engine.handle(&TouchEvent::press(1, "x"));
        assert_eq!(out.len(), 2);
        assert_eq!(engine.instances()[0].states().len(), 1);
        // Second press advances the first instance and starts another
        let out = engine.handle(&TouchEvent::press(2, "x"));
        let first = engine.instances().first().map(Instance::id);
        assert_eq!(terminated(&out), vec![(GestureId(0), Outcome::Accepted)]);
        assert!(matches!(out.last(), Some(Notification::Advanced { .. })));
        assert_eq!(first, Some(InstanceId(1)));
    }

    #[test]
    fn test_notification_order_per_instance() {
        let mut engine = engine(&["d1", "d1u1"]);
        let out = engine.handle(&TouchEvent::press(1, "x"));
        let ids: Vec<InstanceId> = out.iter().map(Notification::instance).collect();
        assert_eq!(
            ids,
            vec![InstanceId(0), InstanceId(0), InstanceId(0), InstanceId(1), InstanceId(1)]
        );
        assert_eq!(out[3].gesture(), GestureId(1));
    }

    #[test]
    fn test_release_activation_frees_slot() {
        let mut engine = engine(&["u1d1"]);
        engine.handle(&TouchEvent::release(9, "x"));
        assert!(engine.instances()[0].local_ids().is_empty());
        let out = engine.handle(&TouchEvent::press(10, "x"));
        assert_eq!(terminated(&out), vec![(GestureId(0), Outcome::Accepted)]);
    }

    #[test]
    fn test_cancel_and_reset() {
        let mut engine = engine(&["d1u1"]);
        engine.handle(&TouchEvent::press(1, "x"));
        engine.handle(&TouchEvent::press(2, "x"));
        let ids: Vec<InstanceId> = engine.instances().iter().map(Instance::id).collect();
        assert_eq!(ids.len(), 1);

        assert!(engine.cancel(ids[0]));
        assert!(!engine.cancel(ids[0]));
        assert!(engine.instances().is_empty());

        engine.handle(&TouchEvent::press(3, "x"));
        assert_eq!(engine.instances().len(), 1);
        engine.reset();
        assert!(engine.instances().is_empty());
        assert!(engine.handle(&TouchEvent::release(3, "x")).is_empty());
    }

    #[test]
    fn test_instance_cap() {
        let mut engine = Engine::with_config(EngineConfig::new().with_max_instances(2));
        engine.register("m1*").unwrap();
        for _ in 0..5 {
            engine.handle(&TouchEvent::moved(1, "x"));
        }
        assert_eq!(engine.instances().len(), 2);
    }

    #[test]
    fn test_invalid_target_never_matches() {
        let mut engine = engine(&["d1/(/"]);
        assert!(engine.handle(&TouchEvent::press(1, "(")).is_empty());
        assert_eq!(
            engine.gesture(GestureId(0)).unwrap().rejected_targets(),
            &["(".to_string()]
        );
    }

    #[test]
    fn test_shared_automaton_registered_twice() {
        let mut engine = Engine::new();
        let automaton = Arc::new(Automaton::compile("d1").unwrap());
        let a = engine.register_automaton(Arc::clone(&automaton));
        let b = engine.register_automaton(automaton);
        assert_ne!(a, b);
        let out = engine.handle(&TouchEvent::press(1, "x"));
        assert_eq!(
            terminated(&out),
            vec![(a, Outcome::Accepted), (b, Outcome::Accepted)]
        );
    }

    #[test]
    fn test_register_error() {
        let mut engine = Engine::new();
        assert!(engine.register("d0").is_err());
        assert_eq!(engine.gesture_count(), 0);
    }

    #[test]
    fn test_handle_batch_in_order() {
        let mut engine = engine(&["d1d2"]);
        let out = engine.handle_batch(&[TouchEvent::press(1, "x"), TouchEvent::press(2, "x")]);
        assert_eq!(terminated(&out), vec![(GestureId(0), Outcome::Accepted)]);
    }

    #[test]
    fn test_advanced_reports_groups() {
        let mut engine = engine(&["d1(m1)+u1"]);
        let advanced = |out: &[Notification]| -> Vec<Vec<GroupId>> {
            out.iter()
                .filter_map(|n| match n {
                    Notification::Advanced { groups, .. } => Some(groups.clone()),
                    _ => None,
                })
                .collect()
        };
        let top = GroupId::Named("top".to_string());

        let out = engine.handle(&TouchEvent::press(1, "x"));
        assert_eq!(advanced(&out), vec![vec![GroupId::Start]]);
        let out = engine.handle(&TouchEvent::moved(1, "x"));
        assert_eq!(advanced(&out), vec![vec![top]]);
        let out = engine.handle(&TouchEvent::moved(1, "x"));
        assert_eq!(advanced(&out), vec![vec![GroupId::Numbered(0)]]);
        let out = engine.handle(&TouchEvent::release(1, "x"));
        assert_eq!(advanced(&out), vec![vec![GroupId::Numbered(0)]]);
        assert_eq!(terminated(&out), vec![(GestureId(0), Outcome::Accepted)]);
    }
}
