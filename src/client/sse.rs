/// Incremental Server-Sent Events decoder
///
/// Bytes arrive in arbitrary chunks; frames are emitted once their blank-line
/// terminator has been seen. Lines may end in `\n` or `\r\n`.
use crate::errors::SseError;
use crate::relay::RelayEvent;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
    pub retry_ms: Option<u64>,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
    event: Option<String>,
    last_id: Option<String>,
    retry_ms: Option<u64>,
    started: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and collect every frame it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(end) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=end).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }

            let mut text = String::from_utf8_lossy(&line).into_owned();
            if !self.started {
                self.started = true;
                if let Some(stripped) = text.strip_prefix('\u{feff}') {
                    text = stripped.to_string();
                }
            }

            if let Some(frame) = self.process_line(&text) {
                frames.push(frame);
            }
        }
        frames
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        // Comment (keep-alive)
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
            "id" if !value.contains('\0') => self.last_id = Some(value.to_string()),
            "retry" => {
                if let Ok(ms) = value.parse::<u64>() {
                    self.retry_ms = Some(ms);
                }
            }
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        if self.data.is_empty() {
            self.event = None;
            return None;
        }

        let frame = SseFrame {
            event: self.event.take(),
            data: self.data.join("\n"),
            id: self.last_id.clone(),
            retry_ms: self.retry_ms,
        };
        self.data.clear();
        Some(frame)
    }
}

/// Decode the JSON payload of a frame into a relay event
pub fn parse_event(frame: &SseFrame) -> Result<RelayEvent, SseError> {
    serde_json::from_str(&frame.data).map_err(|e| SseError::InvalidPayload(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"type\":\"conn").is_empty());
        assert!(decoder.push(b"ection\",\"message\":\"hi\"}\n").is_empty());

        let frames = decoder.push(b"\ndata: second\n\n");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].data, r#"{"type":"connection","message":"hi"}"#);
        assert_eq!(frames[1].data, "second");
        assert_eq!(parse_event(&frames[0]).unwrap().kind(), "connection");
    }

    #[test]
    fn test_comments_crlf_and_multiline() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(
            b"\xEF\xBB\xBF: keep-alive\r\n\r\nevent: ping\r\nid: 7\r\ndata: a\r\ndata:b\r\nretry: 3000\r\n\r\n",
        );

        assert_eq!(
            frames,
            vec![SseFrame {
                event: Some("ping".to_string()),
                data: "a\nb".to_string(),
                id: Some("7".to_string()),
                retry_ms: Some(3000),
            }]
        );
    }

    #[test]
    fn test_multibyte_character_split() {
        let mut decoder = SseDecoder::new();
        let bytes = "data: Ünïcode\n\n".as_bytes();
        assert!(decoder.push(&bytes[..7]).is_empty());
        let frames = decoder.push(&bytes[7..]);
        assert_eq!(frames[0].data, "Ünïcode");
    }

    #[test]
    fn test_invalid_payload() {
        let frame = SseFrame {
            data: "not json".to_string(),
            ..SseFrame::default()
        };
        assert!(matches!(parse_event(&frame), Err(SseError::InvalidPayload(_))));
    }
}
