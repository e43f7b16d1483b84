//! Server-sent events decoding for streamed provider responses.
//!
//! Chunks arrive at arbitrary byte boundaries, so a line (or a multibyte
//! character) may be split across two of them. [`SseDecoder`] buffers partial
//! lines and yields one payload per complete event.

/// Incremental `text/event-stream` decoder.
///
/// Only `data:` fields are surfaced. Multiple `data:` lines in one event are
/// joined with `\n`; comments and `event:`/`id:`/`retry:` fields are dropped.
#[derive(Debug, Default)]
pub struct SseDecoder {
    line: String,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, returning every event payload it completed.
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        self.line.push_str(chunk);
        let mut events = Vec::new();
        // Lines end in CRLF, LF or a bare CR.
        while let Some(pos) = self.line.find(['\r', '\n']) {
            let bytes = self.line.as_bytes();
            let end = if bytes[pos] == b'\r' {
                match bytes.get(pos + 1) {
                    Some(b'\n') => pos + 2,
                    Some(_) => pos + 1,
                    // The LF of a CRLF may still be in the next chunk.
                    None => break,
                }
            } else {
                pos + 1
            };
            let line: String = self.line.drain(..end).collect();
            self.handle_line(&line[..pos], &mut events);
        }
        events
    }

    /// Flush whatever is buffered once the stream has ended.
    pub fn finish(&mut self) -> Vec<String> {
        let mut events = Vec::new();
        let rest = std::mem::take(&mut self.line);
        let rest = rest.trim_end_matches('\r');
        if !rest.is_empty() {
            self.handle_line(rest, &mut events);
        }
        self.dispatch(&mut events);
        events
    }

    fn handle_line(&mut self, line: &str, events: &mut Vec<String>) {
        if line.is_empty() {
            self.dispatch(events);
            return;
        }
        if line.starts_with(':') {
            return;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field == "data" {
            self.data.push(value.to_string());
        }
    }

    fn dispatch(&mut self, events: &mut Vec<String>) {
        if !self.data.is_empty() {
            events.push(self.data.join("\n"));
            self.data.clear();
        }
    }
}

/// Carry-over state for turning byte chunks into valid UTF-8 text.
///
/// Bytes of a character cut off at the end of a chunk are held back until
/// the next chunk completes them. Invalid sequences are replaced.
#[derive(Debug, Default)]
pub(crate) struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    pub(crate) fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut text = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(valid) => {
                    text.push_str(valid);
                    self.pending.clear();
                    return text;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        Some(invalid) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + invalid);
                        }
                        None => {
                            self.pending.drain(..valid);
                            return text;
                        }
                    }
                }
            }
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_event() {
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.push("data: {\"a\":1}\n\n"), vec!["{\"a\":1}"]);
    }

    #[test]
    fn test_line_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push("data: {\"delta\":").is_empty());
        assert!(decoder.push("{\"text\":\"Hi\"}}\r\n").is_empty());
        assert_eq!(decoder.push("\r\n"), vec!["{\"delta\":{\"text\":\"Hi\"}}"]);
    }

    #[test]
    fn test_several_events_in_one_chunk() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push("data: one\n\ndata: two\n\ndata: [DONE]\n\n");
        assert_eq!(events, vec!["one", "two", "[DONE]"]);
    }

    #[test]
    fn test_ignores_event_and_comment_lines() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(
            ": keep-alive\nevent: content_block_delta\nid: 7\ndata: {\"x\":true}\n\n",
        );
        assert_eq!(events, vec!["{\"x\":true}"]);
    }

    #[test]
    fn test_multiline_data_joined() {
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.push("data: a\ndata: b\n\n"), vec!["a\nb"]);
    }

    #[test]
    fn test_data_without_space() {
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.push("data:tight\n\n"), vec!["tight"]);
    }

    #[test]
    fn test_finish_flushes_unterminated_event() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push("data: tail").is_empty());
        assert_eq!(decoder.finish(), vec!["tail"]);
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn test_utf8_carry_across_chunks() {
        let bytes = "héllo".as_bytes();
        let mut carry = Utf8Carry::default();
        // 'é' is two bytes; cut between them.
        assert_eq!(carry.decode(&bytes[..2]), "h");
        assert_eq!(carry.decode(&bytes[2..]), "éllo");
    }

    #[test]
    fn test_bare_cr_line_endings() {
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.push("data: a\r\rdata: b\r\r"), vec!["a"]);
        assert_eq!(decoder.finish(), vec!["b"]);
    }

    #[test]
    fn test_crlf_split_between_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push("data: x\r").is_empty());
        assert_eq!(decoder.push("\n\r\n"), vec!["x"]);
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn test_utf8_invalid_byte_then_cut_character() {
        let mut carry = Utf8Carry::default();
        // 0xff is invalid; 'é' (0xc3 0xa9) is cut after its first byte.
        assert_eq!(carry.decode(&[b'a', 0xff, b'b', 0xc3]), "a\u{fffd}b");
        assert_eq!(carry.decode(&[0xa9, b'!']), "é!");
    }

    #[test]
    fn test_utf8_invalid_bytes_replaced() {
        let mut carry = Utf8Carry::default();
        assert_eq!(carry.decode(&[b'a', 0xff, b'b']), "a\u{fffd}b");
    }
}
