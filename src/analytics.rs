use serde::Serialize;

/// An analytics event reporting that a visitor was shown a variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackEvent {
    /// Event name, see [`ClientConfig::event_name`](crate::ClientConfig::event_name).
    pub event: String,
    /// Event properties: caller-supplied properties plus `experiment` and `variant`.
    pub properties: serde_json::Map<String, serde_json::Value>,
    /// Caller-supplied sink options, passed through untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Value>,
}

/// A sink receiving assignment reports, e.g. a Segment-style `track` call.
pub trait AnalyticsSink {
    /// Send the event.
    ///
    /// # Errors
    ///
    /// This method should not return errors and should not panic. Delivery is fire-and-forget;
    /// failures should be handled internally within the implementation.
    ///
    /// # Notes
    ///
    /// This method is called before returning the variant to the caller, so it should not block.
    fn track(&self, event: TrackEvent);
}

impl<T: Fn(TrackEvent)> AnalyticsSink for T {
    fn track(&self, event: TrackEvent) {
        self(event);
    }
}
