// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F.

//! Instance-local input slot allocation.
//!
//! Patterns refer to contacts by small integers (`d1`, `m2`), while platforms
//! report arbitrary identifiers. Every match instance keeps its own mapping:
//! the activating contact is slot `1`, each newly seen contact takes the lowest
//! free slot, and a released contact's slot becomes free for the next one.

use std::collections::HashMap;

use super::symbol::TouchId;

/// Slot allocator mapping external touch identifiers to local ids.
///
/// Slot `0` is never handed out.
#[derive(Debug, Clone, Default)]
pub struct LocalIds {
    by_touch: HashMap<TouchId, u32>,
    /// `in_use[i]` is set while slot `i` is bound. Index 0 stays `false`.
    in_use: Vec<bool>,
}

impl LocalIds {
    /// Creates an allocator with `activating` bound to slot `1`.
    #[must_use]
    pub fn with_activating(activating: TouchId) -> Self {
        let mut ids = Self::default();
        ids.by_touch.insert(activating, 1);
        ids.in_use = vec![false, true];
        ids
    }

    /// Returns the slot bound to `touch`, binding the lowest free one if the
    /// touch has not been seen yet.
    pub fn get_or_assign(&mut self, touch: TouchId) -> u32 {
        if let Some(&local) = self.by_touch.get(&touch) {
            return local;
        }
        let local = self.lowest_free();
        let idx = local as usize;
        if idx >= self.in_use.len() {
            self.in_use.resize(idx + 1, false);
        }
        self.in_use[idx] = true;
        self.by_touch.insert(touch, local);
        local
    }

    /// Unbinds `touch`, returning the slot it held.
    pub fn release(&mut self, touch: TouchId) -> Option<u32> {
        let local = self.by_touch.remove(&touch)?;
        if let Some(slot) = self.in_use.get_mut(local as usize) {
            *slot = false;
        }
        Some(local)
    }

    /// Returns the slot bound to `touch` without assigning one.
    #[must_use]
    pub fn get(&self, touch: TouchId) -> Option<u32> {
        self.by_touch.get(&touch).copied()
    }

    /// Number of currently bound contacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_touch.len()
    }

    /// Returns true if no contact is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_touch.is_empty()
    }

    fn lowest_free(&self) -> u32 {
        self.in_use
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, used)| !**used)
            .map_or_else(|| self.in_use.len().max(1), |(i, _)| i) as u32
    }
}
