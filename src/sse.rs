//! Incremental decoder for the hub's Server-Sent-Events channel.
//!
//! The hub pushes live updates over `GET /events` as SSE frames: named
//! events with a JSON data payload, keep-alive comment lines, and the
//! occasional unnamed `message` frame. This decoder turns raw transport
//! chunks into [`SseFrame`]s, carrying line state across chunk
//! boundaries and tolerating CRLF line endings.
//!
//! A control frame such as `clear_history` may arrive with an event
//! name and no data payload at all, so a frame is emitted when its
//! terminating blank line arrives and it carries *either* a name or
//! data.

/// One decoded Server-Sent Event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// Event name from the `event:` field; `None` for unnamed frames.
    pub event: Option<String>,
    /// Payload from the `data:` field(s); multiple lines joined with `\n`.
    pub data: String,
    /// Frame id from the `id:` field, if the device sent one.
    pub id: Option<String>,
}

/// Incremental SSE frame decoder.
///
/// Feed transport chunks via [`push`](Self::push); frames are returned
/// as their terminating blank line arrives. Call
/// [`flush`](Self::flush) at stream end for a trailing unterminated
/// frame.
#[derive(Debug, Default)]
pub struct SseDecoder {
    line: String,
    event: Option<String>,
    data_lines: Vec<String>,
    id: Option<String>,
}

impl SseDecoder {
    /// Create a new decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a chunk of bytes, returning every frame it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        let text = String::from_utf8_lossy(chunk);
        let mut frames = Vec::new();
        for ch in text.chars() {
            if ch == '\n' {
                let line = std::mem::take(&mut self.line);
                let line = line.strip_suffix('\r').unwrap_or(&line);
                if let Some(frame) = self.take_line(line) {
                    frames.push(frame);
                }
            } else {
                self.line.push(ch);
            }
        }
        frames
    }

    /// Flush a trailing frame that was never terminated by a blank line.
    pub fn flush(&mut self) -> Option<SseFrame> {
        if !self.line.is_empty() {
            let line = std::mem::take(&mut self.line);
            let line = line.strip_suffix('\r').unwrap_or(&line);
            self.take_line(line);
        }
        self.build()
    }

    /// Process one complete line; a blank line closes the frame.
    fn take_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.build();
        }
        // keep-alive comment
        if line.starts_with(':') {
            return None;
        }
        if let Some((field, value)) = split_field(line) {
            match field {
                "data" => self.data_lines.push(value.to_string()),
                "event" => self.event = Some(value.to_string()),
                "id" => self.id = Some(value.to_string()),
                // retry and unknown fields are transport concerns
                _ => {}
            }
        }
        None
    }

    /// Build the pending frame and reset, if anything accumulated.
    fn build(&mut self) -> Option<SseFrame> {
        if self.event.is_none() && self.data_lines.is_empty() {
            return None;
        }
        let frame = SseFrame {
            event: self.event.take(),
            data: self.data_lines.join("\n"),
            id: self.id.take(),
        };
        self.data_lines.clear();
        Some(frame)
    }
}

/// Split a line into `(field, value)`, stripping the single optional
/// space after the colon.
fn split_field(line: &str) -> Option<(&str, &str)> {
    let colon = line.find(':')?;
    let field = &line[..colon];
    let value = &line[colon + 1..];
    Some((field, value.strip_prefix(' ').unwrap_or(value)))
}
