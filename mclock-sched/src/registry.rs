//! Client registry.
//!
//! Maps client IDs to dense indices into an arena of entries. Entries are
//! never removed, so an index stays valid for the scheduler's lifetime.

use std::collections::{HashMap, VecDeque};

use mclock_core::ClientId;

use crate::error::{SchedError, SchedResult};
use crate::tag::{ClientTag, SelectionMode};

/// A registered client: its tag, its pending tokens, and dispatch counters.
#[derive(Debug)]
pub struct ClientEntry<T> {
    /// Deadline tag state.
    pub tag: ClientTag,

    /// Pending tokens in enqueue order.
    pub queue: VecDeque<T>,

    /// Dispatches admitted by the reservation series.
    pub reservation_dispatches: u64,

    /// Dispatches admitted by the proportional series.
    pub proportional_dispatches: u64,
}

impl<T> ClientEntry<T> {
    #[allow(clippy::missing_const_for_fn)] // VecDeque::new() is not const.
    fn new(tag: ClientTag) -> Self {
        Self {
            tag,
            queue: VecDeque::new(),
            reservation_dispatches: 0,
            proportional_dispatches: 0,
        }
    }

    /// Records one dispatch admitted by `mode`.
    pub const fn record_dispatch(&mut self, mode: SelectionMode) {
        match mode {
            SelectionMode::Reservation => self.reservation_dispatches += 1,
            SelectionMode::Proportional => self.proportional_dispatches += 1,
        }
    }

    /// Total dispatches for this client.
    #[must_use]
    pub const fn dispatches(&self) -> u64 {
        self.reservation_dispatches + self.proportional_dispatches
    }
}

/// Arena of client entries indexed by registration order.
#[derive(Debug)]
pub struct ClientRegistry<T> {
    index: HashMap<ClientId, usize>,
    entries: Vec<ClientEntry<T>>,
}

impl<T> ClientRegistry<T> {
    /// Creates a registry with room for `capacity` clients.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            index: HashMap::with_capacity(capacity),
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Returns the index of a registered client.
    #[must_use]
    pub fn lookup(&self, client_id: ClientId) -> Option<usize> {
        self.index.get(&client_id).copied()
    }

    /// Appends a new client and returns its index.
    ///
    /// The caller checks with [`Self::lookup`] first; registering the same ID
    /// twice would orphan the earlier entry.
    pub fn insert(&mut self, tag: ClientTag) -> usize {
        let index = self.entries.len();
        debug_assert!(!self.index.contains_key(&tag.client_id()));
        self.index.insert(tag.client_id(), index);
        self.entries.push(ClientEntry::new(tag));
        index
    }

    /// Returns the entry at `index`.
    ///
    /// # Errors
    ///
    /// Returns `SchedError::UnknownClient` if no client was registered there.
    pub fn get(&self, index: usize) -> SchedResult<&ClientEntry<T>> {
        self.entries
            .get(index)
            .ok_or(SchedError::UnknownClient { index })
    }

    /// Returns the entry at `index` mutably.
    ///
    /// # Errors
    ///
    /// Returns `SchedError::UnknownClient` if no client was registered there.
    pub fn get_mut(&mut self, index: usize) -> SchedResult<&mut ClientEntry<T>> {
        self.entries
            .get_mut(index)
            .ok_or(SchedError::UnknownClient { index })
    }

    /// Returns the entry for a client ID.
    #[must_use]
    pub fn by_id(&self, client_id: ClientId) -> Option<&ClientEntry<T>> {
        self.lookup(client_id).and_then(|index| self.entries.get(index))
    }

    /// Iterates over tags in registry order.
    pub fn tags(&self) -> impl Iterator<Item = &ClientTag> {
        self.entries.iter().map(|entry| &entry.tag)
    }

    /// Iterates mutably over tags in registry order.
    pub fn tags_mut(&mut self) -> impl Iterator<Item = &mut ClientTag> {
        self.entries.iter_mut().map(|entry| &mut entry.tag)
    }

    /// Iterates over entries in registry order.
    pub fn iter(&self) -> impl Iterator<Item = &ClientEntry<T>> {
        self.entries.iter()
    }

    /// Returns the number of registered clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether no client has registered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
