//! Reassembly of newline-delimited records from arbitrary transport chunks

/// Accumulates body bytes and hands out complete lines.
///
/// A record may be split over any number of chunks, and a chunk may carry
/// any number of records. Blank lines are dropped and a trailing `\r` is
/// stripped.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    /// Append a chunk and return every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if let Some(line) = normalize(line) {
                lines.push(line);
            }
        }
        lines
    }

    /// Whatever is left once the body has ended without a final newline.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        normalize(std::mem::take(&mut self.buffer))
    }
}

fn normalize(mut line: Vec<u8>) -> Option<Vec<u8>> {
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    if line.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        Some(line)
    }
}
