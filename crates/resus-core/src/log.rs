//! Append-only event log of the current case.

use std::collections::BTreeMap;

use crate::events::{Event, EventId, EventKind, Stamp};

#[derive(Debug, Default, Clone)]
pub struct EventLog {
    events: Vec<Event>,
    next_id: u64,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new event. Never fails and never validates `kind`.
    pub fn append(&mut self, kind: EventKind, stamp: Stamp) -> &Event {
        self.next_id += 1;
        let event = Event {
            id: EventId(self.next_id),
            kind,
            timestamp: stamp.at,
            offset_secs: stamp.offset_secs,
        };
        tracing::debug!(id = event.id.0, offset = event.offset_secs, kind = ?event.kind, "event appended");
        self.events.push(event);
        &self.events[self.events.len() - 1]
    }

    /// All events, oldest first.
    pub fn all(&self) -> &[Event] {
        &self.events
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Event> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, id: EventId) -> Option<&Event> {
        self.events.iter().find(|e| e.id == id)
    }

    pub fn last(&self) -> Option<&Event> {
        self.events.last()
    }

    /// Most recent event satisfying `predicate`.
    pub fn last_matching<P>(&self, mut predicate: P) -> Option<&Event>
    where
        P: FnMut(&Event) -> bool,
    {
        self.events.iter().rev().find(|&e| predicate(e))
    }

    pub fn count_matching<P>(&self, mut predicate: P) -> usize
    where
        P: FnMut(&Event) -> bool,
    {
        self.events.iter().filter(|&e| predicate(e)).count()
    }

    /// Drop every event. Ids keep increasing so a stale id never aliases a new event.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Number of doses per medication name.
    pub fn medication_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for event in &self.events {
            if let EventKind::Medication { name, .. } = &event.kind {
                *counts.entry(name.clone()).or_insert(0) += 1;
            }
        }
        counts
    }
}
