//! MJPEG stream splitting
//!
//! IP camera apps serve `multipart/x-mixed-replace` bodies where every part is
//! a complete JPEG. Instead of parsing part headers the splitter scans for the
//! JPEG start (`FF D8`) and end (`FF D9`) markers, which also copes with
//! cameras that send bare concatenated JPEGs.

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];

/// Default cap on buffered bytes while waiting for an end marker
const DEFAULT_MAX_BUFFER: usize = 16 * 1024 * 1024;

/// Incremental splitter turning stream chunks into JPEG payloads
#[derive(Debug)]
pub struct MjpegSplitter {
    buffer: Vec<u8>,
    max_buffer: usize,
}

impl Default for MjpegSplitter {
    fn default() -> Self {
        Self::new()
    }
}

impl MjpegSplitter {
    pub fn new() -> Self {
        Self::with_max_buffer(DEFAULT_MAX_BUFFER)
    }

    pub fn with_max_buffer(max_buffer: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_buffer,
        }
    }

    /// Bytes currently held back waiting for more data
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Feed a chunk and return every JPEG completed by it, oldest first
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();

        loop {
            let Some(start) = find_marker(&self.buffer, SOI, 0) else {
                // Keep a trailing 0xFF, it may be the first half of a start marker
                let keep = usize::from(self.buffer.last() == Some(&0xFF));
                let cut = self.buffer.len() - keep;
                self.buffer.drain(..cut);
                break;
            };

            let Some(end) = find_marker(&self.buffer, EOI, start + SOI.len()) else {
                self.buffer.drain(..start);
                if self.buffer.len() > self.max_buffer {
                    // No end marker within the cap: the stream is garbage, resync
                    self.buffer.clear();
                }
                break;
            };

            let frame_end = end + EOI.len();
            frames.push(self.buffer[start..frame_end].to_vec());
            self.buffer.drain(..frame_end);
        }

        frames
    }

    /// Drop any partial frame (used after a reconnect)
    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

fn find_marker(haystack: &[u8], marker: [u8; 2], from: usize) -> Option<usize> {
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(2)
        .position(|w| w == marker)
        .map(|pos| pos + from)
}
