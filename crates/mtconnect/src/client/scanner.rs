// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reassembles XML documents from a chunked sample stream.
//!
//! Agents stream `multipart/x-mixed-replace` bodies:
//!
//! ```text
//! --BOUNDARY\r\n
//! Content-type: text/xml\r\n
//! Content-length: 1234\r\n
//! \r\n
//! <?xml version="1.0"?><MTConnectStreams>...</MTConnectStreams>\r\n
//! --BOUNDARY\r\n
//! ...
//! ```
//!
//! Chunk boundaries fall anywhere. The scanner buffers bytes until a full
//! `<?xml ... </MTConnectXxx>` span is present and yields it. Text between
//! documents may only be multipart framing; anything else is malformed.

use thiserror::Error;

const XML_DECL: &[u8] = b"<?xml";
const ROOT_PREFIX: &str = "MTConnect";

/// Stream framing errors.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Malformed stream content: {0:?}")]
    Malformed(String),

    #[error("Unexpected root element <{0}> in stream")]
    UnexpectedRoot(String),

    #[error("Stream buffer exceeded {limit} bytes without a complete document")]
    Overflow { limit: usize },

    #[error("Stream ended inside a document ({0} bytes pending)")]
    Truncated(usize),

    #[error("Document is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Incremental document extractor.
#[derive(Debug)]
pub struct DocumentScanner {
    buffer: Vec<u8>,
    max_buffer: usize,
}

impl DocumentScanner {
    /// Create a scanner that holds at most `max_buffer` pending bytes.
    pub fn new(max_buffer: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_buffer,
        }
    }

    /// Append a chunk read from the response body.
    ///
    /// The buffer limit is enforced by [`next_document`](Self::next_document)
    /// once complete documents have been taken out.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Bytes buffered but not yet returned.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Extract the next complete document, if one is buffered.
    ///
    /// Partial documents stay buffered for the next call. A partial document
    /// larger than the buffer limit is an overflow.
    pub fn next_document(&mut self) -> Result<Option<String>, ScanError> {
        let document = self.extract()?;
        if document.is_none() && self.buffer.len() > self.max_buffer {
            return Err(ScanError::Overflow {
                limit: self.max_buffer,
            });
        }
        Ok(document)
    }

    fn extract(&mut self) -> Result<Option<String>, ScanError> {
        let Some(start) = find(&self.buffer, XML_DECL, 0) else {
            // Only complete lines can be judged; keep a partial tail.
            let complete = self
                .buffer
                .iter()
                .rposition(|&b| b == b'\n')
                .map(|i| i + 1)
                .unwrap_or(0);
            let keep_tail = partial_decl_len(&self.buffer);
            let judged = complete.min(self.buffer.len() - keep_tail);
            check_framing(&self.buffer[..judged])?;
            self.buffer.drain(..judged);
            return Ok(None);
        };

        check_framing(&self.buffer[..start])?;

        let Some((root, root_pos)) = root_element(&self.buffer, start + XML_DECL.len())? else {
            return Ok(None);
        };

        let closing = format!("</{}>", root);
        let Some(end) = find(&self.buffer, closing.as_bytes(), root_pos) else {
            return Ok(None);
        };
        let end = end + closing.len();

        let document: Vec<u8> = self.buffer[start..end].to_vec();
        self.buffer.drain(..end);
        Ok(Some(String::from_utf8(document)?))
    }

    /// Check what is left once the stream has ended.
    pub fn finish(&mut self) -> Result<(), ScanError> {
        if find(&self.buffer, XML_DECL, 0).is_some() {
            return Err(ScanError::Truncated(self.buffer.len()));
        }
        check_framing(&self.buffer)?;
        self.buffer.clear();
        Ok(())
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() || needle.len() > haystack.len() - from {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// Length of a trailing prefix of `<?xml` at the end of `buf`.
fn partial_decl_len(buf: &[u8]) -> usize {
    (1..XML_DECL.len())
        .rev()
        .find(|&n| buf.len() >= n && buf[buf.len() - n..] == XML_DECL[..n])
        .unwrap_or(0)
}

/// Locate the root element after the XML declaration, skipping processing
/// instructions and comments. `Ok(None)` means more bytes are needed.
fn root_element(buf: &[u8], from: usize) -> Result<Option<(String, usize)>, ScanError> {
    let mut pos = from;
    loop {
        let Some(lt) = buf[pos..].iter().position(|&b| b == b'<').map(|p| p + pos) else {
            return Ok(None);
        };
        let rest = &buf[lt..];
        if rest.starts_with(b"<?") {
            match find(buf, b"?>", lt) {
                Some(end) => pos = end + 2,
                None => return Ok(None),
            }
            continue;
        }
        if rest.starts_with(b"<!--") {
            match find(buf, b"-->", lt) {
                Some(end) => pos = end + 3,
                None => return Ok(None),
            }
            continue;
        }
        if rest.len() < 4 && b"<!--".starts_with(rest) {
            return Ok(None);
        }

        let name_end = rest[1..]
            .iter()
            .position(|&b| b.is_ascii_whitespace() || b == b'>' || b == b'/')
            .map(|p| p + 1);
        let Some(name_end) = name_end else {
            return Ok(None);
        };
        let name = String::from_utf8_lossy(&rest[1..name_end]).into_owned();
        let local = name.rsplit(':').next().unwrap_or(&name);
        if !local.starts_with(ROOT_PREFIX) {
            return Err(ScanError::UnexpectedRoot(name));
        }
        return Ok(Some((name, lt)));
    }
}

/// Text between documents must be multipart framing: blank lines, boundary
/// lines, or part headers.
fn check_framing(bytes: &[u8]) -> Result<(), ScanError> {
    let text = String::from_utf8_lossy(bytes);
    for line in text.split('\n') {
        let line = line.trim();
        if line.is_empty() || line.starts_with("--") || is_part_header(line) {
            continue;
        }
        let snippet: String = line.chars().take(64).collect();
        return Err(ScanError::Malformed(snippet));
    }
    Ok(())
}

fn is_part_header(line: &str) -> bool {
    match line.split_once(':') {
        Some((name, _)) => {
            !name.is_empty()
                && name
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        }
        None => false,
    }
}
