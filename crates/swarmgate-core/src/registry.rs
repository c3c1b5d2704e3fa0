// crates/swarmgate-core/src/registry.rs
// ============================================================================
// Module: Swarmgate Message Registry
// Description: Direction-scoped handler registration and table merging.
// Purpose: Build the effective handler table handed to the transport.
// Dependencies: std
// ============================================================================

//! ## Overview
//! [`MessageRegistry`] collects externally registered handlers keyed by
//! (direction, name). At role initialization the role's default table is
//! merged with the registry's overrides via [`MessageRegistry::build`].
//! Invariants:
//! - `build` is pure: defaults ∪ overrides, overrides win on name collision,
//!   no other entry is dropped, and neither input is mutated.
//! - Registering the same (direction, name) twice replaces the earlier entry;
//!   the same name may exist under both directions.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::identifiers::MessageName;
use crate::interfaces::MessageHandler;
use crate::message::Direction;

// ============================================================================
// SECTION: Handler Entry
// ============================================================================

/// Handler plus its acknowledgement requirement.
#[derive(Clone)]
pub struct HandlerEntry {
    /// Handler invoked for the message.
    pub handler: Arc<dyn MessageHandler>,
    /// Whether the transport must acknowledge delivery.
    pub ack_required: bool,
}

impl HandlerEntry {
    /// Creates a handler entry.
    #[must_use]
    pub fn new(handler: Arc<dyn MessageHandler>, ack_required: bool) -> Self {
        Self {
            handler,
            ack_required,
        }
    }

    /// Returns true when both entries share the same handler instance and flag.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.handler, &other.handler) && self.ack_required == other.ack_required
    }
}

impl fmt::Debug for HandlerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerEntry").field("ack_required", &self.ack_required).finish()
    }
}

// ============================================================================
// SECTION: Handler Table
// ============================================================================

/// Flat name → handler table installed on a transport.
#[derive(Debug, Clone, Default)]
pub struct HandlerTable {
    /// Entries keyed by message name.
    entries: BTreeMap<MessageName, HandlerEntry>,
}

impl HandlerTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an entry, returning the previous one.
    pub fn insert(
        &mut self,
        name: impl Into<MessageName>,
        handler: Arc<dyn MessageHandler>,
        ack_required: bool,
    ) -> Option<HandlerEntry> {
        self.entries.insert(name.into(), HandlerEntry::new(handler, ack_required))
    }

    /// Returns the entry for a message name.
    #[must_use]
    pub fn get(&self, name: &MessageName) -> Option<&HandlerEntry> {
        self.entries.get(name)
    }

    /// Returns true when the table has an entry for the name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&MessageName::new(name))
    }

    /// Returns the registered message names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &MessageName> {
        self.entries.keys()
    }

    /// Iterates entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&MessageName, &HandlerEntry)> {
        self.entries.iter()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true when both tables hold the same names bound to the same
    /// handler instances and flags.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self.entries.iter().all(|(name, entry)| {
                other.entries.get(name).is_some_and(|candidate| entry.same_as(candidate))
            })
    }
}

// ============================================================================
// SECTION: Message Registry
// ============================================================================

/// Externally registered handler overrides, scoped by direction.
#[derive(Debug, Clone, Default)]
pub struct MessageRegistry {
    /// Per-direction override tables.
    directions: BTreeMap<Direction, HandlerTable>,
}

impl MessageRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the handler for a direction and name.
    pub fn register(
        &mut self,
        direction: Direction,
        name: impl Into<MessageName>,
        handler: Arc<dyn MessageHandler>,
        ack_required: bool,
    ) {
        self.directions.entry(direction).or_default().insert(name, handler, ack_required);
    }

    /// Returns the overrides registered for one direction.
    #[must_use]
    pub fn direction(&self, direction: Direction) -> HandlerTable {
        self.directions.get(&direction).cloned().unwrap_or_default()
    }

    /// Flattens the overrides for the given directions into one table.
    ///
    /// Directions are applied in the order given; a name registered under
    /// several of them resolves to the last direction's entry.
    #[must_use]
    pub fn overrides_for(&self, directions: &[Direction]) -> HandlerTable {
        let mut table = HandlerTable::new();
        for direction in directions {
            if let Some(entries) = self.directions.get(direction) {
                for (name, entry) in entries.iter() {
                    table.entries.insert(name.clone(), entry.clone());
                }
            }
        }
        table
    }

    /// Removes every registered override.
    pub fn clear(&mut self) {
        self.directions.clear();
    }

    /// Returns true when no overrides are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.directions.values().all(HandlerTable::is_empty)
    }

    /// Merges defaults with overrides into the effective handler table.
    #[must_use]
    pub fn build(defaults: &HandlerTable, overrides: &HandlerTable) -> HandlerTable {
        let mut effective = defaults.clone();
        for (name, entry) in overrides.iter() {
            effective.entries.insert(name.clone(), entry.clone());
        }
        effective
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
