//! Incremental `text/event-stream` decoder.

use std::time::Duration;

/// One dispatched server-sent event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
    /// The `event:` field, if the server named the event.
    pub event: Option<String>,
    /// The `id:` field, used to recognise replays after a reconnect.
    pub id: Option<String>,
    /// All `data:` lines joined with `\n`.
    pub data: String,
    /// The `retry:` field, the server's preferred reconnect delay.
    pub retry: Option<Duration>,
}

/// Longest line the decoder buffers before discarding it.
const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Turns arbitrary byte chunks into complete [`SseFrame`]s.
///
/// Chunks may split lines (and UTF-8 sequences) anywhere; incomplete input
/// is buffered until the next call. Lines end with `\n` or `\r\n`. A line
/// longer than 1 MiB is dropped together with the frame it
/// belongs to.
///
/// `retry:` and `id:` also take effect for frames without data, which are
/// otherwise not dispatched. Read them with [`take_retry`](Self::take_retry)
/// and [`last_event_id`](Self::last_event_id).
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    /// Bytes at the start of `buffer` already known to hold no newline.
    scanned: usize,
    /// Skipping the tail of an oversized line.
    discarding: bool,
    pending: SseFrame,
    has_data: bool,
    started: bool,
    last_event_id: Option<String>,
    retry: Option<Duration>,
}

impl SseDecoder {
    /// Creates an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a decoder that continues from `last_event_id`, as after a
    /// reconnect.
    pub fn resume(last_event_id: Option<String>) -> Self {
        Self {
            last_event_id,
            ..Self::default()
        }
    }

    /// Feeds one chunk and returns every frame it completed, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        let mut consumed = 0;
        let mut scan_from = self.scanned;
        while let Some(offset) = self.buffer[scan_from..].iter().position(|b| *b == b'\n') {
            let end = scan_from + offset;
            if self.discarding {
                self.discarding = false;
            } else {
                let mut line = &self.buffer[consumed..end];
                if let Some(stripped) = line.strip_suffix(b"\r") {
                    line = stripped;
                }
                if !self.started {
                    self.started = true;
                    if let Some(stripped) = line.strip_prefix("\u{feff}".as_bytes()) {
                        line = stripped;
                    }
                }
                let line = String::from_utf8_lossy(line).into_owned();
                if let Some(frame) = self.process_line(&line) {
                    frames.push(frame);
                }
            }
            consumed = end + 1;
            scan_from = consumed;
        }
        self.buffer.drain(..consumed);
        self.scanned = self.buffer.len();

        if self.buffer.len() > MAX_LINE_BYTES {
            tracing::debug!(
                buffered = self.buffer.len(),
                limit = MAX_LINE_BYTES,
                "discarding oversized event stream line"
            );
            self.buffer.clear();
            self.scanned = 0;
            self.discarding = true;
            self.pending = SseFrame::default();
            self.has_data = false;
        }
        frames
    }

    /// The id of the last completed frame, with or without data. An empty
    /// `id:` resets it.
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    /// Returns the newest `retry:` value not yet taken.
    pub fn take_retry(&mut self) -> Option<Duration> {
        self.retry.take()
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
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
            "data" => {
                if self.has_data {
                    self.pending.data.push('\n');
                }
                self.pending.data.push_str(value);
                self.has_data = true;
            }
            "event" => self.pending.event = Some(value.to_string()),
            "id" if !value.contains('\0') => self.pending.id = Some(value.to_string()),
            "retry" => {
                if let Ok(ms) = value.parse::<u64>() {
                    let retry = Duration::from_millis(ms);
                    self.pending.retry = Some(retry);
                    self.retry = Some(retry);
                }
            }
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let mut frame = std::mem::take(&mut self.pending);
        let had_data = std::mem::replace(&mut self.has_data, false);

        if let Some(id) = frame.id.take() {
            if id.is_empty() {
                self.last_event_id = None;
            } else {
                self.last_event_id = Some(id.clone());
                frame.id = Some(id);
            }
        }

        if had_data {
            Some(frame)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_single_frame() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"data: {\"type\":\"notification\"}\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "{\"type\":\"notification\"}");
        assert_eq!(frames[0].id, None);
    }

    #[test]
    fn joins_multiline_data() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"data: first\ndata:second\n\n");
        assert_eq!(frames[0].data, "first\nsecond");
    }

    #[test]
    fn handles_chunks_split_mid_line() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"id: 7\r\nda").is_empty());
        assert!(decoder.feed(b"ta: hel").is_empty());
        let frames = decoder.feed(b"lo\r\n\r\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "hello");
        assert_eq!(frames[0].id.as_deref(), Some("7"));
    }

    #[test]
    fn handles_utf8_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        let bytes = "data: manutenção\n\n".as_bytes();
        let split = bytes.iter().position(|b| *b == 0xc3).unwrap() + 1;
        assert!(decoder.feed(&bytes[..split]).is_empty());
        let frames = decoder.feed(&bytes[split..]);
        assert_eq!(frames[0].data, "manutenção");
    }

    #[test]
    fn ignores_comments_and_empty_events() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b": keep-alive\n\nevent: ping\n\n");
        assert!(frames.is_empty());
    }

    #[test]
    fn records_event_and_retry_fields() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"retry: 2500\nevent: update\ndata: x\n\n");
        assert_eq!(frames[0].event.as_deref(), Some("update"));
        assert_eq!(frames[0].retry, Some(Duration::from_millis(2500)));
    }

    #[test]
    fn fields_do_not_leak_into_next_frame() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"id: 1\nevent: a\ndata: x\n\ndata: y\n\n");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].id, None);
        assert_eq!(frames[1].event, None);
    }

    #[test]
    fn strips_leading_byte_order_mark() {
        let mut decoder = SseDecoder::new();
        let mut input = "\u{feff}".as_bytes().to_vec();
        input.extend_from_slice(b"data: z\n\n");
        let frames = decoder.feed(&input);
        assert_eq!(frames[0].data, "z");
    }

    #[test]
    fn retry_without_data_is_kept() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"retry: 10000\n\n").is_empty());
        assert_eq!(decoder.take_retry(), Some(Duration::from_millis(10_000)));
        assert_eq!(decoder.take_retry(), None);
    }

    #[test]
    fn id_without_data_updates_last_event_id() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"id: 42\n\n").is_empty());
        assert_eq!(decoder.last_event_id(), Some("42"));

        let frames = decoder.feed(b"data: x\n\n");
        assert_eq!(frames[0].id, None);
        assert_eq!(decoder.last_event_id(), Some("42"));

        decoder.feed(b"id\n\n");
        assert_eq!(decoder.last_event_id(), None);
    }

    #[test]
    fn resumed_decoder_keeps_previous_id_until_a_new_one() {
        let mut decoder = SseDecoder::resume(Some("a1".to_string()));
        decoder.feed(b": keep-alive\n\ndata: y\n\n");
        assert_eq!(decoder.last_event_id(), Some("a1"));
        decoder.feed(b"id: a2\ndata: z\n\n");
        assert_eq!(decoder.last_event_id(), Some("a2"));
    }

    #[test]
    fn oversized_line_is_dropped_and_decoding_resumes() {
        let mut decoder = SseDecoder::new();
        let mut big = b"data: ".to_vec();
        big.resize(MAX_LINE_BYTES + 16, b'a');
        assert!(decoder.feed(&big).is_empty());
        assert!(decoder.buffer.is_empty());

        let frames = decoder.feed(b"aaaa\n\ndata: ok\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "ok");
    }

    #[test]
    fn long_line_across_many_chunks_is_scanned_once() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: ").is_empty());
        for _ in 0..100 {
            assert!(decoder.feed(b"xxxxxxxxxx").is_empty());
            assert_eq!(decoder.scanned, decoder.buffer.len());
        }
        let frames = decoder.feed(b"\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data.len(), 1000);
    }
}
