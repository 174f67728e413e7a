// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use indexmap::IndexMap;

use crate::{LinkedDataEntry, SheetRow, TimelineEvent, TimelineField, TimelineId};

const FIRST_TIMELINE_ID: i64 = 1;
const NO_SHEET: &str = "None";

/// Ordered collection of timeline events. Iteration follows key-insertion
/// order, which is also the export order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineStore {
    events: IndexMap<TimelineId, TimelineEvent>,
    next_id: i64,
}

impl Default for TimelineStore {
    fn default() -> Self {
        Self {
            events: IndexMap::new(),
            next_id: FIRST_TIMELINE_ID,
        }
    }
}

impl TimelineStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a blank event and returns its id.
    pub fn create(&mut self) -> TimelineId {
        let id = TimelineId::new(self.next_id);
        self.next_id += 1;
        self.events.insert(id, TimelineEvent::default());
        id
    }

    pub fn get(&self, id: TimelineId) -> Option<&TimelineEvent> {
        self.events.get(&id)
    }

    pub fn contains(&self, id: TimelineId) -> bool {
        self.events.contains_key(&id)
    }

    pub fn update(&mut self, id: TimelineId, field: TimelineField, value: impl Into<String>) -> bool {
        match self.events.get_mut(&id) {
            Some(event) => {
                event.set(field, value);
                true
            }
            None => false,
        }
    }

    /// Removes the event. Remaining events keep their relative order.
    pub fn delete(&mut self, id: TimelineId) -> Option<TimelineEvent> {
        self.events.shift_remove(&id)
    }

    pub fn replace_linked_data(
        &mut self,
        id: TimelineId,
        entries: Vec<LinkedDataEntry>,
        standard: Option<String>,
    ) -> bool {
        match self.events.get_mut(&id) {
            Some(event) => {
                event.linked_data = entries;
                event.standard = standard;
                true
            }
            None => false,
        }
    }

    /// Removes the entry at `index` from the event's linked data.
    pub fn remove_linked_entry(&mut self, id: TimelineId, index: usize) -> Option<LinkedDataEntry> {
        let event = self.events.get_mut(&id)?;
        (index < event.linked_data.len()).then(|| event.linked_data.remove(index))
    }

    pub fn reset_linked_data(&mut self, id: TimelineId) -> bool {
        self.replace_linked_data(id, Vec::new(), None)
    }

    /// Replaces every event, keying them by position. Ids handed out later stay
    /// above every id assigned here.
    pub fn replace_all(&mut self, events: Vec<TimelineEvent>) {
        self.events = events
            .into_iter()
            .enumerate()
            .map(|(index, event)| (TimelineId::new(index as i64), event))
            .collect();
        self.next_id = self.next_id.max(self.events.len() as i64);
    }

    pub fn iter(&self) -> impl Iterator<Item = (TimelineId, &TimelineEvent)> {
        self.events.iter().map(|(id, event)| (*id, event))
    }

    pub fn ids(&self) -> Vec<TimelineId> {
        self.events.keys().copied().collect()
    }

    pub fn values(&self) -> impl Iterator<Item = &TimelineEvent> {
        self.events.values()
    }

    pub fn position(&self, id: TimelineId) -> Option<usize> {
        self.events.get_index_of(&id)
    }

    pub fn id_at(&self, index: usize) -> Option<TimelineId> {
        self.events.get_index(index).map(|(id, _)| *id)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn next_id(&self) -> TimelineId {
        TimelineId::new(self.next_id)
    }

    /// Rows in the `{time, event, sheet}` shape, where `sheet` names the event
    /// id when it carries linked data.
    pub fn sheet_rows(&self) -> Vec<SheetRow> {
        self.iter()
            .map(|(id, event)| SheetRow {
                time: event.time.clone(),
                event: event.event.clone(),
                sheet: if event.has_linked_data() {
                    id.to_string()
                } else {
                    NO_SHEET.to_owned()
                },
            })
            .collect()
    }
}
