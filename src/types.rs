//! Domain types held by the storage slots.
//!
//! The storage layer treats its values as JSON-like data: context and
//! settings are generic JSON structures, pending events carry a small
//! typed envelope with an opaque payload.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// App/device/OS/network metadata, deeply nested and always partial.
///
/// Updates are combined with [`deep_merge`](crate::merge::deep_merge) so
/// values written by one producer survive unrelated updates from another.
pub type Context = Value;

/// Per-plugin configuration, keyed by plugin/destination name.
///
/// Each value is opaque to the storage layer. Updates replace whole
/// top-level entries (see [`shallow_merge`](crate::merge::shallow_merge)).
pub type Settings = Map<String, Value>;

/// Kind of analytics event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Track,
    Identify,
    Screen,
    Group,
    Alias,
}

/// An analytics event awaiting delivery.
///
/// Only `message_id` is meaningful to the storage layer (removal matches
/// on it); everything else rides along opaquely in `payload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentEvent {
    /// Unique id assigned when the event was created.
    pub message_id: String,
    /// Event kind.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Event name, for kinds that carry one (track/screen).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    /// Remaining event fields, preserved verbatim.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl SegmentEvent {
    /// Create an event with no extra payload.
    pub fn new(
        message_id: impl Into<String>,
        event_type: EventType,
        event: impl Into<String>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            event_type,
            event: Some(event.into()),
            payload: Map::new(),
        }
    }
}
