//! Calendar records and the uid-keyed collection the evaluator consumes.
//!
//! Records are kept exactly as the feed supplied them: a record missing its
//! start or end, or with `start > end`, is stored as given and simply never
//! yields a [`BlockWindow`] (in the first case) or yields an inverted one (in
//! the second). Nothing here "repairs" feed data.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::window::BlockWindow;

/// The record type of a calendar component.
///
/// Only [`RecordKind::Event`] (an iCalendar `VEVENT`) can block promotions.
/// Every other component type (todos, journals, alarms, free/busy) is carried
/// as [`RecordKind::Other`] with its component name and is ignored by the
/// evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordKind {
    Event,
    Other(String),
}

impl RecordKind {
    /// Map an iCalendar component name (`VEVENT`, `VTODO`, ...) to a kind.
    pub fn from_component_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("VEVENT") || name.eq_ignore_ascii_case("event") {
            RecordKind::Event
        } else {
            RecordKind::Other(name.to_ascii_lowercase())
        }
    }

    pub fn is_event(&self) -> bool {
        matches!(self, RecordKind::Event)
    }
}

impl From<String> for RecordKind {
    fn from(value: String) -> Self {
        RecordKind::from_component_name(&value)
    }
}

impl From<RecordKind> for String {
    fn from(kind: RecordKind) -> Self {
        kind.to_string()
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Event => f.write_str("event"),
            RecordKind::Other(name) => f.write_str(name),
        }
    }
}

/// One record from a calendar feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Human-readable label (`SUMMARY`). Empty when the feed omits it.
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    pub kind: RecordKind,
    /// Informational only; never consulted when deciding a block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

impl CalendarEvent {
    /// An event record with both bounds present.
    pub fn new(summary: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            summary: summary.into(),
            start: Some(start),
            end: Some(end),
            kind: RecordKind::Event,
            last_modified: None,
        }
    }

    /// The blocking window of this record, if it can block at all.
    ///
    /// Returns `None` for non-event kinds and for events missing either bound.
    pub fn window(&self) -> Option<BlockWindow> {
        if !self.kind.is_event() {
            return None;
        }
        Some(BlockWindow::new(self.start?, self.end?))
    }
}

/// Feed records keyed by their feed-assigned uid.
///
/// Iteration follows insertion order, which is document order when the
/// collection comes from [`crate::ics::parse_calendar`]. Inserting a uid that
/// is already present replaces the record in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventCollection {
    entries: Vec<(String, CalendarEvent)>,
    /// uid → position in `entries`.
    index: HashMap<String, usize>,
}

impl EventCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, returning the one it replaced if the uid was taken.
    pub fn insert(&mut self, uid: impl Into<String>, event: CalendarEvent) -> Option<CalendarEvent> {
        let uid = uid.into();
        match self.index.get(&uid) {
            Some(&position) => Some(std::mem::replace(&mut self.entries[position].1, event)),
            None => {
                self.index.insert(uid.clone(), self.entries.len());
                self.entries.push((uid, event));
                None
            }
        }
    }

    pub fn get(&self, uid: &str) -> Option<&CalendarEvent> {
        self.index
            .get(uid)
            .and_then(|&position| self.entries.get(position))
            .map(|(_, event)| event)
    }

    pub fn contains_uid(&self, uid: &str) -> bool {
        self.get(uid).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CalendarEvent)> {
        self.entries.iter().map(|(uid, event)| (uid.as_str(), event))
    }

    /// Only the records that can block: events with both bounds present.
    pub fn windows(&self) -> impl Iterator<Item = (&str, &CalendarEvent, BlockWindow)> {
        self.iter()
            .filter_map(|(uid, event)| event.window().map(|window| (uid, event, window)))
    }

    /// A copy holding only `VEVENT` records, whatever their bounds.
    pub fn events_only(&self) -> EventCollection {
        self.iter()
            .filter(|(_, event)| event.kind.is_event())
            .map(|(uid, event)| (uid.to_string(), event.clone()))
            .collect()
    }
}

impl FromIterator<(String, CalendarEvent)> for EventCollection {
    fn from_iter<I: IntoIterator<Item = (String, CalendarEvent)>>(iter: I) -> Self {
        let mut collection = EventCollection::new();
        for (uid, event) in iter {
            collection.insert(uid, event);
        }
        collection
    }
}

impl Serialize for EventCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (uid, event) in &self.entries {
            map.serialize_entry(uid, event)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for EventCollection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CollectionVisitor;

        impl<'de> Visitor<'de> for CollectionVisitor {
            type Value = EventCollection;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of uid to calendar record")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut collection = EventCollection::new();
                while let Some((uid, event)) = access.next_entry::<String, CalendarEvent>()? {
                    collection.insert(uid, event);
                }
                Ok(collection)
            }
        }

        deserializer.deserialize_map(CollectionVisitor)
    }
}
