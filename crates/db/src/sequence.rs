//! Monotonic identifiers scoped to one store.

use serde::{Deserialize, Serialize};

/// Hands out strictly increasing identifiers starting at zero.
///
/// Every store owns its own generators so that two stores never share a counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceGenerator {
    next: u64,
}

impl SequenceGenerator {
    /// Creates a generator whose first identifier is `start`.
    pub const fn starting_at(start: u64) -> Self {
        Self { next: start }
    }

    /// Returns the next identifier.
    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next = self
            .next
            .checked_add(1)
            .expect("sequence space must not be exhausted");

        id
    }

    /// The identifier that the next call to [`Self::next_id`] returns.
    pub const fn peek(&self) -> u64 {
        self.next
    }
}
