use serde_json::{json, Value};

use crate::event::StreamEvent;

/// One-shot latch guarding the single-terminal-event invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TerminalLatch {
    Open,
    Closed,
}

/// Incremental decoder for the gateway's event-stream wire format.
///
/// Records are separated by a blank line; `event:` lines name the record,
/// `data:` lines accumulate its payload (newline-joined when split across
/// lines). The decoder buffers raw bytes so multi-byte characters split
/// across chunk reads reassemble correctly, and never holds more than one
/// incomplete record.
#[derive(Debug)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    current_event: Option<String>,
    current_data: String,
    latch: TerminalLatch,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            current_event: None,
            current_data: String::new(),
            latch: TerminalLatch::Open,
        }
    }

    /// Feeds one transport chunk, emitting every event completed by it.
    pub fn feed(&mut self, chunk: &[u8], emit: &mut dyn FnMut(StreamEvent)) {
        self.buffer.extend_from_slice(chunk);
        while let Some(pos) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line_bytes: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line_bytes[..pos]);
            let line = line.trim_end_matches('\r');
            self.accept_line(line, emit);
        }
    }

    /// Flushes a trailing unterminated record at end of stream. Streams are
    /// not guaranteed to end with a blank-line separator.
    pub fn finish(&mut self, emit: &mut dyn FnMut(StreamEvent)) {
        if !self.buffer.is_empty() {
            let tail = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&tail);
            let line = line.trim_end_matches('\r').to_string();
            if !line.is_empty() {
                self.accept_line(&line, emit);
            }
        }
        if !self.current_data.trim().is_empty() {
            self.dispatch(emit);
        }
    }

    fn accept_line(&mut self, line: &str, emit: &mut dyn FnMut(StreamEvent)) {
        if line.is_empty() {
            self.dispatch(emit);
            return;
        }

        if let Some(event) = line.strip_prefix("event:") {
            self.current_event = Some(event.trim().to_string());
            return;
        }

        if let Some(data) = line.strip_prefix("data:") {
            if !self.current_data.is_empty() {
                self.current_data.push('\n');
            }
            self.current_data.push_str(data.trim());
        }
        // id:, retry:, and comment lines carry nothing this layer consumes.
    }

    fn dispatch(&mut self, emit: &mut dyn FnMut(StreamEvent)) {
        let wire_event = self.current_event.take();
        let data = std::mem::take(&mut self.current_data);
        let data = data.trim();
        if data.is_empty() {
            return;
        }

        // Malformed payloads degrade to a plain-content record, never a
        // decoder failure.
        let payload: Value = serde_json::from_str(data)
            .unwrap_or_else(|_| json!({ "content": data }));

        let effective = effective_event_name(wire_event.as_deref(), &payload);
        let Some(event) = StreamEvent::from_wire(&effective, &payload) else {
            return;
        };

        if event.is_terminal() {
            if self.latch == TerminalLatch::Closed {
                return;
            }
            self.latch = TerminalLatch::Closed;
        }

        emit(event);
    }
}

/// Resolves the effective event name: the wire-level `event:` field wins
/// unless it is absent or the generic `message` placeholder, in which case
/// the payload's own `event` field is consulted.
fn effective_event_name(wire_event: Option<&str>, payload: &Value) -> String {
    match wire_event {
        Some(name) if !name.is_empty() && name != "message" => name.to_string(),
        _ => payload
            .get("event")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::SseDecoder;
    use crate::event::StreamEvent;

    fn collect(frames: &[&[u8]], finish: bool) -> Vec<StreamEvent> {
        let mut decoder = SseDecoder::new();
        let mut events = Vec::new();
        for frame in frames {
            decoder.feed(frame, &mut |event| events.push(event));
        }
        if finish {
            decoder.finish(&mut |event| events.push(event));
        }
        events
    }

    #[test]
    fn dispatches_delta_then_chunk_in_wire_order_before_terminal() {
        let events = collect(
            &[concat!(
                "event: delta\n",
                "data: {\"text\":\"Hel\"}\n",
                "\n",
                "event: chunk\n",
                "data: {\"content\":\"Hello\"}\n",
                "\n",
                "event: final\n",
                "data: {\"content\":\"Hello.\"}\n",
                "\n",
            )
            .as_bytes()],
            true,
        );

        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0],
            StreamEvent::Delta {
                text: "Hel".to_string()
            }
        );
        assert_eq!(
            events[1],
            StreamEvent::Chunk {
                cumulative_text: "Hello".to_string()
            }
        );
        assert!(matches!(events[2], StreamEvent::Final(_)));
    }

    #[test]
    fn functional_final_wins_over_later_end() {
        let events = collect(
            &[concat!(
                "event: final\n",
                "data: {\"content\":\"rich\"}\n",
                "\n",
                "event: end\n",
                "data: {\"content\":\"plain\"}\n",
                "\n",
            )
            .as_bytes()],
            true,
        );

        let terminals: Vec<_> = events.iter().filter(|event| event.is_terminal()).collect();
        assert_eq!(terminals.len(), 1);
        match terminals[0] {
            StreamEvent::Final(payload) => assert_eq!(payload.content, "rich"),
            other => panic!("unexpected terminal {other:?}"),
        }
    }

    #[test]
    fn end_alone_still_terminates_minimal_backends() {
        let events = collect(
            &[b"event: end\ndata: {\"content\":\"done\"}\n\n" as &[u8]],
            true,
        );
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], StreamEvent::End(payload) if payload.content == "done"));
    }

    #[test]
    fn resolves_effective_event_from_payload_when_wire_name_is_generic() {
        let events = collect(
            &[concat!(
                "event: message\n",
                "data: {\"event\":\"status\",\"stage\":\"planning\"}\n",
                "\n",
                "data: {\"event\":\"delta\",\"text\":\"a\"}\n",
                "\n",
            )
            .as_bytes()],
            true,
        );

        assert_eq!(
            events,
            vec![
                StreamEvent::Status {
                    stage: "planning".to_string()
                },
                StreamEvent::Delta {
                    text: "a".to_string()
                },
            ]
        );
    }

    #[test]
    fn unknown_events_are_ignored_for_forward_compatibility() {
        let events = collect(
            &[b"event: telemetry\ndata: {\"latencyMs\":12}\n\nevent: delta\ndata: {\"text\":\"x\"}\n\n"
                as &[u8]],
            true,
        );
        assert_eq!(
            events,
            vec![StreamEvent::Delta {
                text: "x".to_string()
            }]
        );
    }

    #[test]
    fn malformed_payload_is_wrapped_not_dropped() {
        let events = collect(&[b"event: final\ndata: not json at all\n\n" as &[u8]], true);
        assert_eq!(events.len(), 1);
        match &events[0] {
            StreamEvent::Final(payload) => assert_eq!(payload.content, "not json at all"),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn multi_line_data_payloads_are_newline_joined() {
        // A JSON string cannot span raw lines, so multi-line payloads arrive
        // as unparseable text and degrade to a content record.
        let events = collect(
            &[b"event: final\ndata: first half\ndata: second half\n\n" as &[u8]],
            true,
        );
        match &events[0] {
            StreamEvent::Final(payload) => {
                assert_eq!(payload.content, "first half\nsecond half");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn regression_utf8_split_across_chunks_reassembles() {
        let record = "event: delta\ndata: {\"text\":\"héllo\"}\n\n".as_bytes();
        let split = record
            .iter()
            .position(|byte| *byte == 0xC3)
            .expect("two-byte sequence")
            + 1; // split inside the é sequence
        assert!(std::str::from_utf8(&record[..split]).is_err());

        let events = collect(&[&record[..split], &record[split..]], true);
        assert_eq!(
            events,
            vec![StreamEvent::Delta {
                text: "héllo".to_string()
            }]
        );
    }

    #[test]
    fn regression_trailing_unterminated_record_is_flushed() {
        let events = collect(
            &[b"event: final\ndata: {\"content\":\"no separator\"}" as &[u8]],
            true,
        );
        assert_eq!(events.len(), 1);
        assert!(
            matches!(&events[0], StreamEvent::Final(payload) if payload.content == "no separator")
        );
    }

    #[test]
    fn crlf_line_endings_are_tolerated() {
        let events = collect(
            &[b"event: delta\r\ndata: {\"text\":\"a\"}\r\n\r\n" as &[u8]],
            true,
        );
        assert_eq!(
            events,
            vec![StreamEvent::Delta {
                text: "a".to_string()
            }]
        );
    }
}
