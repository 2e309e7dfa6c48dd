//! JSON message codec.
//!
//! A message is one JSON document of at most [`MAX_MESSAGE_SIZE`] bytes.
//! Streams carry one message per line:
//!
//! ```text
//! {"protocol_version":"1","request_id":"a","payload":{"type":"ping"}}\n
//! {"protocol_version":"1","request_id":"b","payload":{"type":"list_meetings"}}\n
//! ```

use std::io::{BufRead, Read, Write};

use serde::{Serialize, de::DeserializeOwned};

use crate::MAX_MESSAGE_SIZE;
use crate::error::{ProtocolError, ProtocolResult};
use crate::types::{Envelope, Request};

fn check_size(size: usize) -> ProtocolResult<()> {
    if size > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size,
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(())
}

/// Encodes a message to compact JSON bytes.
///
/// # Example
///
/// ```rust
/// use campusmeet_protocol::{encode_message, Request, Envelope};
///
/// let envelope = Envelope::request("req-1", Request::Ping);
/// let bytes = encode_message(&envelope).unwrap();
/// assert!(!bytes.contains(&b'\n'));
/// ```
pub fn encode_message<T: Serialize>(message: &T) -> ProtocolResult<Vec<u8>> {
    let json = serde_json::to_vec(message)?;
    check_size(json.len())?;
    Ok(json)
}

/// Decodes a message from JSON bytes, ignoring surrounding whitespace.
pub fn decode_message<T: DeserializeOwned>(data: &[u8]) -> ProtocolResult<T> {
    check_size(data.len())?;
    let json = data.trim_ascii();
    if json.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    Ok(serde_json::from_slice(json)?)
}

/// Decodes a request envelope, checking the protocol version before the
/// payload so that requests from other versions are reported as such.
pub fn decode_request(data: &[u8]) -> ProtocolResult<Envelope<Request>> {
    let envelope: Envelope<serde_json::Value> = decode_message(data)?;
    if !envelope.is_compatible() {
        return Err(ProtocolError::UnsupportedVersion(envelope.protocol_version));
    }
    let payload = serde_json::from_value(envelope.payload)?;
    Ok(Envelope {
        protocol_version: envelope.protocol_version,
        request_id: envelope.request_id,
        payload,
    })
}

/// Reads newline-delimited messages from a buffered stream.
pub struct LineReader<R> {
    reader: R,
}

impl<R: BufRead> LineReader<R> {
    /// Creates a new LineReader wrapping the given reader.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Reads the next non-blank line, without its terminator.
    ///
    /// Returns `Ok(None)` at end of stream.
    pub fn read_line(&mut self) -> ProtocolResult<Option<Vec<u8>>> {
        let limit = u64::try_from(MAX_MESSAGE_SIZE).unwrap_or(u64::MAX).saturating_add(1);
        loop {
            let mut line = Vec::new();
            let read = self
                .reader
                .by_ref()
                .take(limit)
                .read_until(b'\n', &mut line)?;
            if read == 0 {
                return Ok(None);
            }
            if line.last() == Some(&b'\n') {
                line.pop();
            }
            check_size(line.len())?;
            if line.trim_ascii().is_empty() {
                continue;
            }
            return Ok(Some(line));
        }
    }

    /// Reads and decodes the next message.
    pub fn read_message<T: DeserializeOwned>(&mut self) -> ProtocolResult<Option<T>> {
        match self.read_line()? {
            Some(line) => Ok(Some(decode_message(&line)?)),
            None => Ok(None),
        }
    }
}

/// Writes newline-delimited messages to a stream.
pub struct LineWriter<W> {
    writer: W,
}

impl<W: Write> LineWriter<W> {
    /// Creates a new LineWriter wrapping the given writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes a single message followed by a newline.
    pub fn write_message<T: Serialize>(&mut self, message: &T) -> ProtocolResult<()> {
        let mut data = encode_message(message)?;
        data.push(b'\n');
        self.writer.write_all(&data)?;
        Ok(())
    }

    /// Flushes the underlying writer.
    pub fn flush(&mut self) -> ProtocolResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}
