//! Storage for native objects that cannot be shared between contexts
//! (vertex arrays, program pipelines).
//!
//! Most applications render on the main context only, so its entry lives
//! in a dedicated slot that is checked before the map.

use std::collections::hash_map::Entry;
use rustc_hash::FxHashMap;
use crate::driver::ContextId;

pub(crate) struct PerContext<T> {
    main: Option<(ContextId, T)>,
    others: FxHashMap<ContextId, T>,
}

impl<T> Default for PerContext<T> {
    fn default() -> Self {
        Self { main: None, others: FxHashMap::default() }
    }
}

impl<T> PerContext<T> {
    pub fn get_mut(&mut self, context: ContextId) -> Option<&mut T> {
        if let Some((id, value)) = &mut self.main {
            if *id == context {
                return Some(value);
            }
        }
        self.others.get_mut(&context)
    }

    /// Insert the entry of `context`; `is_main` routes it to the fast slot
    pub fn insert(&mut self, context: ContextId, is_main: bool, value: T) -> &mut T {
        if is_main {
            &mut self.main.insert((context, value)).1
        } else {
            match self.others.entry(context) {
                Entry::Occupied(mut slot) => {
                    slot.insert(value);
                    slot.into_mut()
                }
                Entry::Vacant(slot) => slot.insert(value),
            }
        }
    }

    pub fn remove(&mut self, context: ContextId) -> Option<T> {
        if matches!(&self.main, Some((id, _)) if *id == context) {
            return self.main.take().map(|(_, value)| value);
        }
        self.others.remove(&context)
    }

    pub fn drain(&mut self) -> Vec<(ContextId, T)> {
        let mut all: Vec<(ContextId, T)> = self.others.drain().collect();
        if let Some(main) = self.main.take() {
            all.push(main);
        }
        all
    }

    pub fn len(&self) -> usize {
        self.others.len() + usize::from(self.main.is_some())
    }
}

#[cfg(test)]
#[path = "per_context_tests.rs"]
mod tests;
