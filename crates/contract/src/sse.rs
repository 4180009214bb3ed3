//! Server-sent-events framing for envelope streams
//!
//! `GET /stream` delivers one envelope per event in the `data` field. This
//! module only frames and unframes text; connections are the embedder's
//! business.

use crate::envelope::{Envelope, EnvelopeBody};
use crate::error::ContractError;

/// One decoded event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub id: Option<String>,
    pub data: String,
}

/// Line-oriented text/event-stream decoder
#[derive(Debug, Default)]
pub struct EventDecoder {
    event: Option<String>,
    id: Option<String>,
    data: Vec<String>,
}

impl EventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line (without its terminator); returns an event when a blank line completes one
    pub fn push_line(&mut self, line: &str) -> Option<SseEvent> {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => self.data.push(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            "id" if !value.contains('\0') => self.id = Some(value.to_string()),
            // retry and unknown fields carry nothing for envelope consumers
            _ => {}
        }
        None
    }

    /// Flush a trailing event left unterminated at end of input
    pub fn finish(&mut self) -> Option<SseEvent> {
        self.dispatch()
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent {
            event,
            // the last event id persists across events
            id: self.id.clone(),
            data,
        })
    }
}

/// Render an envelope as one SSE event named after its kind
pub fn encode_event<B: EnvelopeBody>(envelope: &Envelope<B>) -> Result<String, ContractError> {
    let data = serde_json::to_string(envelope)?;
    Ok(format!("event: {}\ndata: {}\n\n", envelope.kind(), data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{ActionBody, ActionEnvelope, AgentEnvelope};
    use crate::fields::NonEmptyString;
    use crate::schema::EnvelopeSchema;

    fn decode_all(text: &str) -> Vec<SseEvent> {
        let mut decoder = EventDecoder::new();
        let mut events: Vec<SseEvent> = text.lines().filter_map(|l| decoder.push_line(l)).collect();
        events.extend(decoder.finish());
        events
    }

    #[test]
    fn test_decodes_events_and_skips_comments() {
        let events = decode_all(": keep-alive\n\nevent: progress\ndata: {\"a\":1}\n\ndata:{\"b\":2}\r\n\r\n");

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event.as_deref(), Some("progress"));
        assert_eq!(events[0].data, "{\"a\":1}");
        assert_eq!(events[1].event, None);
        assert_eq!(events[1].data, "{\"b\":2}");
    }

    #[test]
    fn test_joins_multiline_data() {
        let events = decode_all("data: {\ndata: \"x\": 1\ndata: }\n\n");
        assert_eq!(events[0].data, "{\n\"x\": 1\n}");
    }

    #[test]
    fn test_finish_flushes_trailing_event() {
        let mut decoder = EventDecoder::new();
        assert!(decoder.push_line("id: 7").is_none());
        assert!(decoder.push_line("data: tail").is_none());

        let event = decoder.finish().unwrap();
        assert_eq!(event.data, "tail");
        assert_eq!(event.id.as_deref(), Some("7"));
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn test_blank_line_without_data_dispatches_nothing() {
        let mut decoder = EventDecoder::new();
        decoder.push_line("event: ping");
        assert!(decoder.push_line("").is_none());
        // the pending event name does not leak into the next event
        decoder.push_line("data: x");
        assert_eq!(decoder.push_line("").unwrap().event, None);
    }

    #[test]
    fn test_encoded_event_decodes_to_valid_envelope() {
        let envelope = ActionEnvelope::new(
            NonEmptyString::new("run-9").unwrap(),
            ActionBody::new("search", serde_json::json!({"query": "q"})),
        );
        let text = encode_event(&envelope).unwrap();
        assert!(text.starts_with("event: action\ndata: "));

        let events = decode_all(&text);
        assert_eq!(events.len(), 1);
        let parsed = EnvelopeSchema::shared()
            .unwrap()
            .parse_str(&events[0].data)
            .unwrap();
        assert_eq!(parsed, AgentEnvelope::from(envelope));
    }
}
